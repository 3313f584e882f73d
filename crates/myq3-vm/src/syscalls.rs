// syscalls.rs — numeric selector tables for the three modules
//
// These numbers are the ABI with the compiled game binaries; they are
// never reordered. Each module also exports entry-point numbers the
// host passes as args[0] of Vm::call.

// ============================================================
// Game module imports
// ============================================================

pub const G_PRINT: i32 = 0;
pub const G_ERROR: i32 = 1;
pub const G_MILLISECONDS: i32 = 2;
pub const G_CVAR_REGISTER: i32 = 3;
pub const G_CVAR_UPDATE: i32 = 4;
pub const G_CVAR_SET: i32 = 5;
pub const G_CVAR_VARIABLE_INTEGER_VALUE: i32 = 6;
pub const G_CVAR_VARIABLE_STRING_BUFFER: i32 = 7;
pub const G_ARGC: i32 = 8;
pub const G_ARGV: i32 = 9;
pub const G_FS_FOPEN_FILE: i32 = 10;
pub const G_FS_READ: i32 = 11;
pub const G_FS_WRITE: i32 = 12;
pub const G_FS_FCLOSE_FILE: i32 = 13;
pub const G_SEND_CONSOLE_COMMAND: i32 = 14;
pub const G_LOCATE_GAME_DATA: i32 = 15;
pub const G_DROP_CLIENT: i32 = 16;
pub const G_SEND_SERVER_COMMAND: i32 = 17;
pub const G_SET_CONFIGSTRING: i32 = 18;
pub const G_GET_CONFIGSTRING: i32 = 19;
pub const G_GET_USERINFO: i32 = 20;
pub const G_SET_USERINFO: i32 = 21;
pub const G_GET_SERVERINFO: i32 = 22;
pub const G_SET_BRUSH_MODEL: i32 = 23;
pub const G_TRACE: i32 = 24;
pub const G_POINT_CONTENTS: i32 = 25;
pub const G_IN_PVS: i32 = 26;
pub const G_IN_PVS_IGNORE_PORTALS: i32 = 27;
pub const G_ADJUST_AREA_PORTAL_STATE: i32 = 28;
pub const G_AREAS_CONNECTED: i32 = 29;
pub const G_LINKENTITY: i32 = 30;
pub const G_UNLINKENTITY: i32 = 31;
pub const G_ENTITIES_IN_BOX: i32 = 32;
pub const G_ENTITY_CONTACT: i32 = 33;
pub const G_BOT_ALLOCATE_CLIENT: i32 = 34;
pub const G_BOT_FREE_CLIENT: i32 = 35;
pub const G_GET_USERCMD: i32 = 36;
pub const G_GET_ENTITY_TOKEN: i32 = 37;
pub const G_FS_GETFILELIST: i32 = 38;
pub const G_DEBUG_POLYGON_CREATE: i32 = 39;
pub const G_DEBUG_POLYGON_DELETE: i32 = 40;
pub const G_REAL_TIME: i32 = 41;
pub const G_SNAPVECTOR: i32 = 42;
pub const G_TRACECAPSULE: i32 = 43;
pub const G_ENTITY_CONTACTCAPSULE: i32 = 44;
pub const G_FS_SEEK: i32 = 45;

// math / memory traps
pub const G_MEMSET: i32 = 100;
pub const G_MEMCPY: i32 = 101;
pub const G_STRNCPY: i32 = 102;
pub const G_SIN: i32 = 103;
pub const G_COS: i32 = 104;
pub const G_ATAN2: i32 = 105;
pub const G_SQRT: i32 = 106;
pub const G_MATRIX_MULTIPLY: i32 = 107;
pub const G_ANGLE_VECTORS: i32 = 108;
pub const G_PERPENDICULAR_VECTOR: i32 = 109;
pub const G_FLOOR: i32 = 110;
pub const G_CEIL: i32 = 111;
pub const G_TEST_PRINT_INT: i32 = 112;
pub const G_TEST_PRINT_FLOAT: i32 = 113;

/// Everything at or above this selector belongs to the bot library,
/// which this core stubs out.
pub const BOTLIB_FIRST: i32 = 200;

// game module exports (args[0] of Vm::call on the game VM)
pub const GAME_INIT: i32 = 0;
pub const GAME_SHUTDOWN: i32 = 1;
pub const GAME_CLIENT_CONNECT: i32 = 2;
pub const GAME_CLIENT_BEGIN: i32 = 3;
pub const GAME_CLIENT_USERINFO_CHANGED: i32 = 4;
pub const GAME_CLIENT_DISCONNECT: i32 = 5;
pub const GAME_CLIENT_COMMAND: i32 = 6;
pub const GAME_CLIENT_THINK: i32 = 7;
pub const GAME_RUN_FRAME: i32 = 8;
pub const GAME_CONSOLE_COMMAND: i32 = 9;
pub const BOTAI_START_FRAME: i32 = 10;

// ============================================================
// Client-presentation (cgame) module imports
// ============================================================

pub const CG_PRINT: i32 = 0;
pub const CG_ERROR: i32 = 1;
pub const CG_MILLISECONDS: i32 = 2;
pub const CG_CVAR_REGISTER: i32 = 3;
pub const CG_CVAR_UPDATE: i32 = 4;
pub const CG_CVAR_SET: i32 = 5;
pub const CG_CVAR_VARIABLESTRINGBUFFER: i32 = 6;
pub const CG_ARGC: i32 = 7;
pub const CG_ARGV: i32 = 8;
pub const CG_ARGS: i32 = 9;
pub const CG_FS_FOPENFILE: i32 = 10;
pub const CG_FS_READ: i32 = 11;
pub const CG_FS_WRITE: i32 = 12;
pub const CG_FS_FCLOSEFILE: i32 = 13;
pub const CG_SENDCONSOLECOMMAND: i32 = 14;
pub const CG_ADDCOMMAND: i32 = 15;
pub const CG_SENDCLIENTCOMMAND: i32 = 16;
pub const CG_UPDATESCREEN: i32 = 17;
pub const CG_CM_LOADMAP: i32 = 18;
pub const CG_CM_NUMINLINEMODELS: i32 = 19;
pub const CG_CM_INLINEMODEL: i32 = 20;
pub const CG_CM_LOADMODEL: i32 = 21;
pub const CG_CM_TEMPBOXMODEL: i32 = 22;
pub const CG_CM_POINTCONTENTS: i32 = 23;
pub const CG_CM_TRANSFORMEDPOINTCONTENTS: i32 = 24;
pub const CG_CM_BOXTRACE: i32 = 25;
pub const CG_CM_TRANSFORMEDBOXTRACE: i32 = 26;
pub const CG_CM_MARKFRAGMENTS: i32 = 27;
pub const CG_S_STARTSOUND: i32 = 28;
pub const CG_S_STARTLOCALSOUND: i32 = 29;
pub const CG_S_CLEARLOOPINGSOUNDS: i32 = 30;
pub const CG_S_ADDLOOPINGSOUND: i32 = 31;
pub const CG_S_UPDATEENTITYPOSITION: i32 = 32;
pub const CG_S_RESPATIALIZE: i32 = 33;
pub const CG_S_REGISTERSOUND: i32 = 34;
pub const CG_S_STARTBACKGROUNDTRACK: i32 = 35;
pub const CG_R_LOADWORLDMAP: i32 = 36;
pub const CG_R_REGISTERMODEL: i32 = 37;
pub const CG_R_REGISTERSKIN: i32 = 38;
pub const CG_R_REGISTERSHADER: i32 = 39;
pub const CG_R_CLEARSCENE: i32 = 40;
pub const CG_R_ADDREFENTITYTOSCENE: i32 = 41;
pub const CG_R_ADDPOLYTOSCENE: i32 = 42;
pub const CG_R_ADDLIGHTTOSCENE: i32 = 43;
pub const CG_R_RENDERSCENE: i32 = 44;
pub const CG_R_SETCOLOR: i32 = 45;
pub const CG_R_DRAWSTRETCHPIC: i32 = 46;
pub const CG_R_MODELBOUNDS: i32 = 47;
pub const CG_R_LERPTAG: i32 = 48;
pub const CG_GETGLCONFIG: i32 = 49;
pub const CG_GETGAMESTATE: i32 = 50;
pub const CG_GETCURRENTSNAPSHOTNUMBER: i32 = 51;
pub const CG_GETSNAPSHOT: i32 = 52;
pub const CG_GETSERVERCOMMAND: i32 = 53;
pub const CG_GETCURRENTCMDNUMBER: i32 = 54;
pub const CG_GETUSERCMD: i32 = 55;
pub const CG_SETUSERCMDVALUE: i32 = 56;
pub const CG_R_REGISTERSHADERNOMIP: i32 = 57;
pub const CG_MEMORY_REMAINING: i32 = 58;
pub const CG_R_REGISTERFONT: i32 = 59;
pub const CG_KEY_ISDOWN: i32 = 60;
pub const CG_KEY_GETCATCHER: i32 = 61;
pub const CG_KEY_SETCATCHER: i32 = 62;
pub const CG_KEY_GETKEY: i32 = 63;
pub const CG_PC_ADD_GLOBAL_DEFINE: i32 = 64;
pub const CG_PC_LOAD_SOURCE: i32 = 65;
pub const CG_PC_FREE_SOURCE: i32 = 66;
pub const CG_PC_READ_TOKEN: i32 = 67;
pub const CG_PC_SOURCE_FILE_AND_LINE: i32 = 68;
pub const CG_S_STOPBACKGROUNDTRACK: i32 = 69;
pub const CG_REAL_TIME: i32 = 70;
pub const CG_SNAPVECTOR: i32 = 71;
pub const CG_REMOVECOMMAND: i32 = 72;
pub const CG_R_LIGHTFORPOINT: i32 = 73;
pub const CG_CIN_PLAYCINEMATIC: i32 = 74;
pub const CG_CIN_STOPCINEMATIC: i32 = 75;
pub const CG_CIN_RUNCINEMATIC: i32 = 76;
pub const CG_CIN_DRAWCINEMATIC: i32 = 77;
pub const CG_CIN_SETEXTENTS: i32 = 78;
pub const CG_R_REMAP_SHADER: i32 = 79;
pub const CG_S_ADDREALLOOPINGSOUND: i32 = 80;
pub const CG_S_STOPLOOPINGSOUND: i32 = 81;
pub const CG_CM_TEMPCAPSULEMODEL: i32 = 82;
pub const CG_CM_CAPSULETRACE: i32 = 83;
pub const CG_CM_TRANSFORMEDCAPSULETRACE: i32 = 84;
pub const CG_R_ADDADDITIVELIGHTTOSCENE: i32 = 85;
pub const CG_GET_ENTITY_TOKEN: i32 = 86;
pub const CG_R_ADDPOLYSTOSCENE: i32 = 87;
pub const CG_R_INPVS: i32 = 88;
// selectors in [89, 100) are reserved and answer zero

pub const CG_MEMSET: i32 = 100;
pub const CG_MEMCPY: i32 = 101;
pub const CG_STRNCPY: i32 = 102;
pub const CG_SIN: i32 = 103;
pub const CG_COS: i32 = 104;
pub const CG_ATAN2: i32 = 105;
pub const CG_SQRT: i32 = 106;
pub const CG_FLOOR: i32 = 107;
pub const CG_CEIL: i32 = 108;
pub const CG_TESTPRINTINT: i32 = 109;
pub const CG_TESTPRINTFLOAT: i32 = 110;
pub const CG_ACOS: i32 = 111;

// cgame exports
pub const CG_INIT: i32 = 0;
pub const CG_SHUTDOWN: i32 = 1;
pub const CG_CONSOLE_COMMAND: i32 = 2;
pub const CG_DRAW_ACTIVE_FRAME: i32 = 3;
pub const CG_CROSSHAIR_PLAYER: i32 = 4;
pub const CG_LAST_ATTACKER: i32 = 5;
pub const CG_KEY_EVENT: i32 = 6;
pub const CG_MOUSE_EVENT: i32 = 7;
pub const CG_EVENT_HANDLING: i32 = 8;

// ============================================================
// UI module imports
// ============================================================

pub const UI_ERROR: i32 = 0;
pub const UI_PRINT: i32 = 1;
pub const UI_MILLISECONDS: i32 = 2;
pub const UI_CVAR_SET: i32 = 3;
pub const UI_CVAR_VARIABLEVALUE: i32 = 4;
pub const UI_CVAR_VARIABLESTRINGBUFFER: i32 = 5;
pub const UI_CVAR_SETVALUE: i32 = 6;
pub const UI_CVAR_RESET: i32 = 7;
pub const UI_CVAR_CREATE: i32 = 8;
pub const UI_CVAR_INFOSTRINGBUFFER: i32 = 9;
pub const UI_ARGC: i32 = 10;
pub const UI_ARGV: i32 = 11;
pub const UI_CMD_EXECUTETEXT: i32 = 12;
pub const UI_FS_FOPENFILE: i32 = 13;
pub const UI_FS_READ: i32 = 14;
pub const UI_FS_WRITE: i32 = 15;
pub const UI_FS_FCLOSEFILE: i32 = 16;
pub const UI_FS_GETFILELIST: i32 = 17;
pub const UI_R_REGISTERMODEL: i32 = 18;
pub const UI_R_REGISTERSKIN: i32 = 19;
pub const UI_R_REGISTERSHADERNOMIP: i32 = 20;
pub const UI_R_CLEARSCENE: i32 = 21;
pub const UI_R_ADDREFENTITYTOSCENE: i32 = 22;
pub const UI_R_ADDPOLYTOSCENE: i32 = 23;
pub const UI_R_ADDLIGHTTOSCENE: i32 = 24;
pub const UI_R_RENDERSCENE: i32 = 25;
pub const UI_R_SETCOLOR: i32 = 26;
pub const UI_R_DRAWSTRETCHPIC: i32 = 27;
pub const UI_UPDATESCREEN: i32 = 28;
pub const UI_CM_LERPTAG: i32 = 29;
pub const UI_CM_LOADMODEL: i32 = 30;
pub const UI_S_REGISTERSOUND: i32 = 31;
pub const UI_S_STARTLOCALSOUND: i32 = 32;
pub const UI_KEY_KEYNUMTOSTRINGBUF: i32 = 33;
pub const UI_KEY_GETBINDINGBUF: i32 = 34;
pub const UI_KEY_SETBINDING: i32 = 35;
pub const UI_KEY_ISDOWN: i32 = 36;
pub const UI_KEY_GETOVERSTRIKEMODE: i32 = 37;
pub const UI_KEY_SETOVERSTRIKEMODE: i32 = 38;
pub const UI_KEY_CLEARSTATES: i32 = 39;
pub const UI_KEY_GETCATCHER: i32 = 40;
pub const UI_KEY_SETCATCHER: i32 = 41;
pub const UI_GETCLIPBOARDDATA: i32 = 42;
pub const UI_GETGLCONFIG: i32 = 43;
pub const UI_GETCLIENTSTATE: i32 = 44;
pub const UI_GETCONFIGSTRING: i32 = 45;
pub const UI_LAN_GETPINGQUEUECOUNT: i32 = 46;
pub const UI_LAN_CLEARPING: i32 = 47;
pub const UI_LAN_GETPING: i32 = 48;
pub const UI_LAN_GETPINGINFO: i32 = 49;
pub const UI_CVAR_REGISTER: i32 = 50;
pub const UI_CVAR_UPDATE: i32 = 51;
pub const UI_MEMORY_REMAINING: i32 = 52;
pub const UI_GET_CDKEY: i32 = 53;
pub const UI_SET_CDKEY: i32 = 54;
pub const UI_R_REGISTERFONT: i32 = 55;
pub const UI_R_MODELBOUNDS: i32 = 56;
pub const UI_PC_ADD_GLOBAL_DEFINE: i32 = 57;
pub const UI_PC_LOAD_SOURCE: i32 = 58;
pub const UI_PC_FREE_SOURCE: i32 = 59;
pub const UI_PC_READ_TOKEN: i32 = 60;
pub const UI_PC_SOURCE_FILE_AND_LINE: i32 = 61;
pub const UI_S_STOPBACKGROUNDTRACK: i32 = 62;
pub const UI_S_STARTBACKGROUNDTRACK: i32 = 63;
pub const UI_REAL_TIME: i32 = 64;
pub const UI_LAN_GETSERVERCOUNT: i32 = 65;
pub const UI_LAN_GETSERVERADDRESSSTRING: i32 = 66;
pub const UI_LAN_GETSERVERINFO: i32 = 67;
pub const UI_LAN_MARKSERVERVISIBLE: i32 = 68;
pub const UI_LAN_UPDATEVISIBLEPINGS: i32 = 69;
pub const UI_LAN_RESETPINGS: i32 = 70;
pub const UI_LAN_LOADCACHEDSERVERS: i32 = 71;
pub const UI_LAN_SAVECACHEDSERVERS: i32 = 72;
pub const UI_LAN_ADDSERVER: i32 = 73;
pub const UI_LAN_REMOVESERVER: i32 = 74;
pub const UI_CIN_PLAYCINEMATIC: i32 = 75;
pub const UI_CIN_STOPCINEMATIC: i32 = 76;
pub const UI_CIN_RUNCINEMATIC: i32 = 77;
pub const UI_CIN_DRAWCINEMATIC: i32 = 78;
pub const UI_CIN_SETEXTENTS: i32 = 79;
pub const UI_R_REMAP_SHADER: i32 = 80;
pub const UI_VERIFY_CDKEY: i32 = 81;
pub const UI_LAN_SERVERSTATUS: i32 = 82;
pub const UI_LAN_GETSERVERPING: i32 = 83;
pub const UI_LAN_SERVERISVISIBLE: i32 = 84;
pub const UI_LAN_COMPARESERVERS: i32 = 85;

pub const UI_MEMSET: i32 = 100;
pub const UI_MEMCPY: i32 = 101;
pub const UI_STRNCPY: i32 = 102;
pub const UI_SIN: i32 = 103;
pub const UI_COS: i32 = 104;
pub const UI_ATAN2: i32 = 105;
pub const UI_SQRT: i32 = 106;
pub const UI_FLOOR: i32 = 107;
pub const UI_CEIL: i32 = 108;

// ui exports
pub const UI_GETAPIVERSION: i32 = 0;
pub const UI_INIT: i32 = 1;
pub const UI_SHUTDOWN: i32 = 2;
pub const UI_KEY_EVENT: i32 = 3;
pub const UI_MOUSE_EVENT: i32 = 4;
pub const UI_REFRESH: i32 = 5;
pub const UI_IS_FULLSCREEN: i32 = 6;
pub const UI_SET_ACTIVE_MENU: i32 = 7;
pub const UI_CONSOLE_COMMAND: i32 = 8;
pub const UI_DRAW_CONNECT_SCREEN: i32 = 9;

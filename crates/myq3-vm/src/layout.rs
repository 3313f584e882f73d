// layout.rs — VM-memory byte layouts for every structure shared with
// the modules
//
// The compiled game binaries address these records by fixed byte
// offsets, so the tables below are a wire contract. All marshalling in
// the host goes through this one module; nothing else hardcodes an
// offset into VM memory.

use crate::vm::VmMemory;
use myq3_common::net_chan::{SnapshotRecord, MAX_MAP_AREA_BYTES, MAX_SNAPSHOT_ENTITIES};
use myq3_common::q_shared::{
    CPlane, EntityShared, EntityState, PlayerState, Trace, Trajectory, TrType, UserCmd, Vec3,
    MAX_PERSISTANT, MAX_POWERUPS, MAX_PS_EVENTS, MAX_STATS, MAX_WEAPONS,
};

// ============================================================
// Record sizes
// ============================================================

pub const PLAYER_STATE_SIZE: i32 = 468;
pub const ENTITY_STATE_SIZE: i32 = 208;
pub const ENTITY_SHARED_SIZE: i32 = 100;
pub const SHARED_ENTITY_SIZE: i32 = ENTITY_STATE_SIZE + ENTITY_SHARED_SIZE;
pub const USERCMD_SIZE: i32 = 24;
pub const TRACE_SIZE: i32 = 56;
pub const VM_CVAR_SIZE: i32 = 272;
pub const VM_CVAR_STRING_MAX: usize = 256;

pub const SNAPSHOT_MAX_ENTITIES: i32 = MAX_SNAPSHOT_ENTITIES as i32;
pub const SNAPSHOT_SIZE: i32 = 12 + 32 + PLAYER_STATE_SIZE + 4
    + SNAPSHOT_MAX_ENTITIES * ENTITY_STATE_SIZE + 8;

pub const GLCONFIG_SIZE: i32 = 11332;
pub const GAMESTATE_SIZE: i32 = 20100;
pub const MAX_CONFIGSTRINGS: usize = 1024;
pub const MAX_GAMESTATE_CHARS: usize = 16000;

// ============================================================
// Vectors
// ============================================================

pub fn read_vec3(mem: &VmMemory, addr: i32) -> Vec3 {
    [
        mem.read_f32(addr),
        mem.read_f32(addr + 4),
        mem.read_f32(addr + 8),
    ]
}

pub fn write_vec3(mem: &mut VmMemory, addr: i32, v: &Vec3) {
    mem.write_f32(addr, v[0]);
    mem.write_f32(addr + 4, v[1]);
    mem.write_f32(addr + 8, v[2]);
}

// ============================================================
// Player state — 468 bytes
// ============================================================

mod ps {
    pub const COMMAND_TIME: i32 = 0;
    pub const PM_TYPE: i32 = 4;
    pub const BOB_CYCLE: i32 = 8;
    pub const PM_FLAGS: i32 = 12;
    pub const PM_TIME: i32 = 16;
    pub const ORIGIN: i32 = 20;
    pub const VELOCITY: i32 = 32;
    pub const WEAPON_TIME: i32 = 44;
    pub const GRAVITY: i32 = 48;
    pub const SPEED: i32 = 52;
    pub const DELTA_ANGLES: i32 = 56;
    pub const GROUND_ENTITY_NUM: i32 = 68;
    pub const LEGS_TIMER: i32 = 72;
    pub const LEGS_ANIM: i32 = 76;
    pub const TORSO_TIMER: i32 = 80;
    pub const TORSO_ANIM: i32 = 84;
    pub const MOVEMENT_DIR: i32 = 88;
    pub const GRAPPLE_POINT: i32 = 92;
    pub const E_FLAGS: i32 = 104;
    pub const EVENT_SEQUENCE: i32 = 108;
    pub const EVENTS: i32 = 112;
    pub const EVENT_PARMS: i32 = 120;
    pub const EXTERNAL_EVENT: i32 = 128;
    pub const EXTERNAL_EVENT_PARM: i32 = 132;
    pub const EXTERNAL_EVENT_TIME: i32 = 136;
    pub const CLIENT_NUM: i32 = 140;
    pub const WEAPON: i32 = 144;
    pub const WEAPONSTATE: i32 = 148;
    pub const VIEWANGLES: i32 = 152;
    pub const VIEWHEIGHT: i32 = 164;
    pub const DAMAGE_EVENT: i32 = 168;
    pub const DAMAGE_YAW: i32 = 172;
    pub const DAMAGE_PITCH: i32 = 176;
    pub const DAMAGE_COUNT: i32 = 180;
    pub const STATS: i32 = 184;
    pub const PERSISTANT: i32 = 248;
    pub const POWERUPS: i32 = 312;
    pub const AMMO: i32 = 376;
    pub const GENERIC1: i32 = 440;
    pub const LOOP_SOUND: i32 = 444;
    pub const JUMPPAD_ENT: i32 = 448;
    pub const PING: i32 = 452;
    pub const PMOVE_FRAMECOUNT: i32 = 456;
    pub const JUMPPAD_FRAME: i32 = 460;
    pub const ENTITY_EVENT_SEQUENCE: i32 = 464;
}

pub fn read_player_state(mem: &VmMemory, base: i32) -> PlayerState {
    let mut out = PlayerState {
        command_time: mem.read_i32(base + ps::COMMAND_TIME),
        pm_type: mem.read_i32(base + ps::PM_TYPE),
        bob_cycle: mem.read_i32(base + ps::BOB_CYCLE),
        pm_flags: mem.read_i32(base + ps::PM_FLAGS),
        pm_time: mem.read_i32(base + ps::PM_TIME),
        origin: read_vec3(mem, base + ps::ORIGIN),
        velocity: read_vec3(mem, base + ps::VELOCITY),
        weapon_time: mem.read_i32(base + ps::WEAPON_TIME),
        gravity: mem.read_i32(base + ps::GRAVITY),
        speed: mem.read_i32(base + ps::SPEED),
        delta_angles: [
            mem.read_i32(base + ps::DELTA_ANGLES),
            mem.read_i32(base + ps::DELTA_ANGLES + 4),
            mem.read_i32(base + ps::DELTA_ANGLES + 8),
        ],
        ground_entity_num: mem.read_i32(base + ps::GROUND_ENTITY_NUM),
        legs_timer: mem.read_i32(base + ps::LEGS_TIMER),
        legs_anim: mem.read_i32(base + ps::LEGS_ANIM),
        torso_timer: mem.read_i32(base + ps::TORSO_TIMER),
        torso_anim: mem.read_i32(base + ps::TORSO_ANIM),
        movement_dir: mem.read_i32(base + ps::MOVEMENT_DIR),
        grapple_point: read_vec3(mem, base + ps::GRAPPLE_POINT),
        e_flags: mem.read_i32(base + ps::E_FLAGS),
        event_sequence: mem.read_i32(base + ps::EVENT_SEQUENCE),
        events: [0; MAX_PS_EVENTS],
        event_parms: [0; MAX_PS_EVENTS],
        external_event: mem.read_i32(base + ps::EXTERNAL_EVENT),
        external_event_parm: mem.read_i32(base + ps::EXTERNAL_EVENT_PARM),
        external_event_time: mem.read_i32(base + ps::EXTERNAL_EVENT_TIME),
        client_num: mem.read_i32(base + ps::CLIENT_NUM),
        weapon: mem.read_i32(base + ps::WEAPON),
        weaponstate: mem.read_i32(base + ps::WEAPONSTATE),
        viewangles: read_vec3(mem, base + ps::VIEWANGLES),
        viewheight: mem.read_i32(base + ps::VIEWHEIGHT),
        damage_event: mem.read_i32(base + ps::DAMAGE_EVENT),
        damage_yaw: mem.read_i32(base + ps::DAMAGE_YAW),
        damage_pitch: mem.read_i32(base + ps::DAMAGE_PITCH),
        damage_count: mem.read_i32(base + ps::DAMAGE_COUNT),
        stats: [0; MAX_STATS],
        persistant: [0; MAX_PERSISTANT],
        powerups: [0; MAX_POWERUPS],
        ammo: [0; MAX_WEAPONS],
        generic1: mem.read_i32(base + ps::GENERIC1),
        loop_sound: mem.read_i32(base + ps::LOOP_SOUND),
        jumppad_ent: mem.read_i32(base + ps::JUMPPAD_ENT),
        ping: mem.read_i32(base + ps::PING),
        pmove_framecount: mem.read_i32(base + ps::PMOVE_FRAMECOUNT),
        jumppad_frame: mem.read_i32(base + ps::JUMPPAD_FRAME),
        entity_event_sequence: mem.read_i32(base + ps::ENTITY_EVENT_SEQUENCE),
    };
    for i in 0..MAX_PS_EVENTS as i32 {
        out.events[i as usize] = mem.read_i32(base + ps::EVENTS + i * 4);
        out.event_parms[i as usize] = mem.read_i32(base + ps::EVENT_PARMS + i * 4);
    }
    for i in 0..MAX_STATS as i32 {
        out.stats[i as usize] = mem.read_i32(base + ps::STATS + i * 4);
        out.persistant[i as usize] = mem.read_i32(base + ps::PERSISTANT + i * 4);
        out.powerups[i as usize] = mem.read_i32(base + ps::POWERUPS + i * 4);
        out.ammo[i as usize] = mem.read_i32(base + ps::AMMO + i * 4);
    }
    out
}

pub fn write_player_state(mem: &mut VmMemory, base: i32, v: &PlayerState) {
    mem.write_i32(base + ps::COMMAND_TIME, v.command_time);
    mem.write_i32(base + ps::PM_TYPE, v.pm_type);
    mem.write_i32(base + ps::BOB_CYCLE, v.bob_cycle);
    mem.write_i32(base + ps::PM_FLAGS, v.pm_flags);
    mem.write_i32(base + ps::PM_TIME, v.pm_time);
    write_vec3(mem, base + ps::ORIGIN, &v.origin);
    write_vec3(mem, base + ps::VELOCITY, &v.velocity);
    mem.write_i32(base + ps::WEAPON_TIME, v.weapon_time);
    mem.write_i32(base + ps::GRAVITY, v.gravity);
    mem.write_i32(base + ps::SPEED, v.speed);
    for i in 0..3 {
        mem.write_i32(base + ps::DELTA_ANGLES + i * 4, v.delta_angles[i as usize]);
    }
    mem.write_i32(base + ps::GROUND_ENTITY_NUM, v.ground_entity_num);
    mem.write_i32(base + ps::LEGS_TIMER, v.legs_timer);
    mem.write_i32(base + ps::LEGS_ANIM, v.legs_anim);
    mem.write_i32(base + ps::TORSO_TIMER, v.torso_timer);
    mem.write_i32(base + ps::TORSO_ANIM, v.torso_anim);
    mem.write_i32(base + ps::MOVEMENT_DIR, v.movement_dir);
    write_vec3(mem, base + ps::GRAPPLE_POINT, &v.grapple_point);
    mem.write_i32(base + ps::E_FLAGS, v.e_flags);
    mem.write_i32(base + ps::EVENT_SEQUENCE, v.event_sequence);
    for i in 0..MAX_PS_EVENTS as i32 {
        mem.write_i32(base + ps::EVENTS + i * 4, v.events[i as usize]);
        mem.write_i32(base + ps::EVENT_PARMS + i * 4, v.event_parms[i as usize]);
    }
    mem.write_i32(base + ps::EXTERNAL_EVENT, v.external_event);
    mem.write_i32(base + ps::EXTERNAL_EVENT_PARM, v.external_event_parm);
    mem.write_i32(base + ps::EXTERNAL_EVENT_TIME, v.external_event_time);
    mem.write_i32(base + ps::CLIENT_NUM, v.client_num);
    mem.write_i32(base + ps::WEAPON, v.weapon);
    mem.write_i32(base + ps::WEAPONSTATE, v.weaponstate);
    write_vec3(mem, base + ps::VIEWANGLES, &v.viewangles);
    mem.write_i32(base + ps::VIEWHEIGHT, v.viewheight);
    mem.write_i32(base + ps::DAMAGE_EVENT, v.damage_event);
    mem.write_i32(base + ps::DAMAGE_YAW, v.damage_yaw);
    mem.write_i32(base + ps::DAMAGE_PITCH, v.damage_pitch);
    mem.write_i32(base + ps::DAMAGE_COUNT, v.damage_count);
    for i in 0..MAX_STATS as i32 {
        mem.write_i32(base + ps::STATS + i * 4, v.stats[i as usize]);
        mem.write_i32(base + ps::PERSISTANT + i * 4, v.persistant[i as usize]);
        mem.write_i32(base + ps::POWERUPS + i * 4, v.powerups[i as usize]);
        mem.write_i32(base + ps::AMMO + i * 4, v.ammo[i as usize]);
    }
    mem.write_i32(base + ps::GENERIC1, v.generic1);
    mem.write_i32(base + ps::LOOP_SOUND, v.loop_sound);
    mem.write_i32(base + ps::JUMPPAD_ENT, v.jumppad_ent);
    mem.write_i32(base + ps::PING, v.ping);
    mem.write_i32(base + ps::PMOVE_FRAMECOUNT, v.pmove_framecount);
    mem.write_i32(base + ps::JUMPPAD_FRAME, v.jumppad_frame);
    mem.write_i32(base + ps::ENTITY_EVENT_SEQUENCE, v.entity_event_sequence);
}

// ============================================================
// Entity state — 208 bytes, trajectories inline
// ============================================================

mod es {
    pub const NUMBER: i32 = 0;
    pub const E_TYPE: i32 = 4;
    pub const E_FLAGS: i32 = 8;
    pub const POS: i32 = 12;
    pub const APOS: i32 = 48;
    pub const TIME: i32 = 84;
    pub const TIME2: i32 = 88;
    pub const ORIGIN: i32 = 92;
    pub const ORIGIN2: i32 = 104;
    pub const ANGLES: i32 = 116;
    pub const ANGLES2: i32 = 128;
    pub const OTHER_ENTITY_NUM: i32 = 140;
    pub const OTHER_ENTITY_NUM2: i32 = 144;
    pub const GROUND_ENTITY_NUM: i32 = 148;
    pub const CONSTANT_LIGHT: i32 = 152;
    pub const LOOP_SOUND: i32 = 156;
    pub const MODELINDEX: i32 = 160;
    pub const MODELINDEX2: i32 = 164;
    pub const CLIENT_NUM: i32 = 168;
    pub const FRAME: i32 = 172;
    pub const SOLID: i32 = 176;
    pub const EVENT: i32 = 180;
    pub const EVENT_PARM: i32 = 184;
    pub const POWERUPS: i32 = 188;
    pub const WEAPON: i32 = 192;
    pub const LEGS_ANIM: i32 = 196;
    pub const TORSO_ANIM: i32 = 200;
    pub const GENERIC1: i32 = 204;
}

fn read_trajectory(mem: &VmMemory, base: i32) -> Trajectory {
    Trajectory {
        tr_type: TrType::from_i32(mem.read_i32(base)),
        tr_time: mem.read_i32(base + 4),
        tr_duration: mem.read_i32(base + 8),
        tr_base: read_vec3(mem, base + 12),
        tr_delta: read_vec3(mem, base + 24),
    }
}

fn write_trajectory(mem: &mut VmMemory, base: i32, v: &Trajectory) {
    mem.write_i32(base, v.tr_type as i32);
    mem.write_i32(base + 4, v.tr_time);
    mem.write_i32(base + 8, v.tr_duration);
    write_vec3(mem, base + 12, &v.tr_base);
    write_vec3(mem, base + 24, &v.tr_delta);
}

pub fn read_entity_state(mem: &VmMemory, base: i32) -> EntityState {
    EntityState {
        number: mem.read_i32(base + es::NUMBER),
        e_type: mem.read_i32(base + es::E_TYPE),
        e_flags: mem.read_i32(base + es::E_FLAGS),
        pos: read_trajectory(mem, base + es::POS),
        apos: read_trajectory(mem, base + es::APOS),
        time: mem.read_i32(base + es::TIME),
        time2: mem.read_i32(base + es::TIME2),
        origin: read_vec3(mem, base + es::ORIGIN),
        origin2: read_vec3(mem, base + es::ORIGIN2),
        angles: read_vec3(mem, base + es::ANGLES),
        angles2: read_vec3(mem, base + es::ANGLES2),
        other_entity_num: mem.read_i32(base + es::OTHER_ENTITY_NUM),
        other_entity_num2: mem.read_i32(base + es::OTHER_ENTITY_NUM2),
        ground_entity_num: mem.read_i32(base + es::GROUND_ENTITY_NUM),
        constant_light: mem.read_i32(base + es::CONSTANT_LIGHT),
        loop_sound: mem.read_i32(base + es::LOOP_SOUND),
        modelindex: mem.read_i32(base + es::MODELINDEX),
        modelindex2: mem.read_i32(base + es::MODELINDEX2),
        client_num: mem.read_i32(base + es::CLIENT_NUM),
        frame: mem.read_i32(base + es::FRAME),
        solid: mem.read_i32(base + es::SOLID),
        event: mem.read_i32(base + es::EVENT),
        event_parm: mem.read_i32(base + es::EVENT_PARM),
        powerups: mem.read_i32(base + es::POWERUPS),
        weapon: mem.read_i32(base + es::WEAPON),
        legs_anim: mem.read_i32(base + es::LEGS_ANIM),
        torso_anim: mem.read_i32(base + es::TORSO_ANIM),
        generic1: mem.read_i32(base + es::GENERIC1),
    }
}

pub fn write_entity_state(mem: &mut VmMemory, base: i32, v: &EntityState) {
    mem.write_i32(base + es::NUMBER, v.number);
    mem.write_i32(base + es::E_TYPE, v.e_type);
    mem.write_i32(base + es::E_FLAGS, v.e_flags);
    write_trajectory(mem, base + es::POS, &v.pos);
    write_trajectory(mem, base + es::APOS, &v.apos);
    mem.write_i32(base + es::TIME, v.time);
    mem.write_i32(base + es::TIME2, v.time2);
    write_vec3(mem, base + es::ORIGIN, &v.origin);
    write_vec3(mem, base + es::ORIGIN2, &v.origin2);
    write_vec3(mem, base + es::ANGLES, &v.angles);
    write_vec3(mem, base + es::ANGLES2, &v.angles2);
    mem.write_i32(base + es::OTHER_ENTITY_NUM, v.other_entity_num);
    mem.write_i32(base + es::OTHER_ENTITY_NUM2, v.other_entity_num2);
    mem.write_i32(base + es::GROUND_ENTITY_NUM, v.ground_entity_num);
    mem.write_i32(base + es::CONSTANT_LIGHT, v.constant_light);
    mem.write_i32(base + es::LOOP_SOUND, v.loop_sound);
    mem.write_i32(base + es::MODELINDEX, v.modelindex);
    mem.write_i32(base + es::MODELINDEX2, v.modelindex2);
    mem.write_i32(base + es::CLIENT_NUM, v.client_num);
    mem.write_i32(base + es::FRAME, v.frame);
    mem.write_i32(base + es::SOLID, v.solid);
    mem.write_i32(base + es::EVENT, v.event);
    mem.write_i32(base + es::EVENT_PARM, v.event_parm);
    mem.write_i32(base + es::POWERUPS, v.powerups);
    mem.write_i32(base + es::WEAPON, v.weapon);
    mem.write_i32(base + es::LEGS_ANIM, v.legs_anim);
    mem.write_i32(base + es::TORSO_ANIM, v.torso_anim);
    mem.write_i32(base + es::GENERIC1, v.generic1);
}

// ============================================================
// Shared entity record — 100 bytes after the entity state
// ============================================================

mod er {
    pub const LINKED: i32 = 0;
    pub const LINKCOUNT: i32 = 4;
    pub const SV_FLAGS: i32 = 8;
    pub const SINGLE_CLIENT: i32 = 12;
    pub const BMODEL: i32 = 16;
    pub const MINS: i32 = 20;
    pub const MAXS: i32 = 32;
    pub const CONTENTS: i32 = 44;
    pub const ABSMIN: i32 = 48;
    pub const ABSMAX: i32 = 60;
    pub const CURRENT_ORIGIN: i32 = 72;
    pub const CURRENT_ANGLES: i32 = 84;
    pub const OWNER_NUM: i32 = 96;
}

pub fn read_entity_shared(mem: &VmMemory, base: i32) -> EntityShared {
    EntityShared {
        linked: mem.read_i32(base + er::LINKED) != 0,
        linkcount: mem.read_i32(base + er::LINKCOUNT),
        sv_flags: mem.read_i32(base + er::SV_FLAGS),
        single_client: mem.read_i32(base + er::SINGLE_CLIENT),
        bmodel: mem.read_i32(base + er::BMODEL) != 0,
        mins: read_vec3(mem, base + er::MINS),
        maxs: read_vec3(mem, base + er::MAXS),
        contents: mem.read_i32(base + er::CONTENTS),
        absmin: read_vec3(mem, base + er::ABSMIN),
        absmax: read_vec3(mem, base + er::ABSMAX),
        current_origin: read_vec3(mem, base + er::CURRENT_ORIGIN),
        current_angles: read_vec3(mem, base + er::CURRENT_ANGLES),
        owner_num: mem.read_i32(base + er::OWNER_NUM),
    }
}

pub fn write_entity_shared(mem: &mut VmMemory, base: i32, v: &EntityShared) {
    mem.write_i32(base + er::LINKED, v.linked as i32);
    mem.write_i32(base + er::LINKCOUNT, v.linkcount);
    mem.write_i32(base + er::SV_FLAGS, v.sv_flags);
    mem.write_i32(base + er::SINGLE_CLIENT, v.single_client);
    mem.write_i32(base + er::BMODEL, v.bmodel as i32);
    write_vec3(mem, base + er::MINS, &v.mins);
    write_vec3(mem, base + er::MAXS, &v.maxs);
    mem.write_i32(base + er::CONTENTS, v.contents);
    write_vec3(mem, base + er::ABSMIN, &v.absmin);
    write_vec3(mem, base + er::ABSMAX, &v.absmax);
    write_vec3(mem, base + er::CURRENT_ORIGIN, &v.current_origin);
    write_vec3(mem, base + er::CURRENT_ANGLES, &v.current_angles);
    mem.write_i32(base + er::OWNER_NUM, v.owner_num);
}

// updates the linkage-owned fields without touching the rest
pub fn write_entity_link_state(
    mem: &mut VmMemory,
    base: i32,
    linked: bool,
    linkcount: i32,
    absmin: &Vec3,
    absmax: &Vec3,
) {
    mem.write_i32(base + er::LINKED, linked as i32);
    mem.write_i32(base + er::LINKCOUNT, linkcount);
    write_vec3(mem, base + er::ABSMIN, absmin);
    write_vec3(mem, base + er::ABSMAX, absmax);
}

// ============================================================
// User command — 24 bytes
// ============================================================

pub fn read_usercmd(mem: &VmMemory, base: i32) -> UserCmd {
    UserCmd {
        server_time: mem.read_i32(base),
        angles: [
            mem.read_i32(base + 4),
            mem.read_i32(base + 8),
            mem.read_i32(base + 12),
        ],
        buttons: mem.read_i32(base + 16),
        weapon: mem.read_u8(base + 20),
        forwardmove: mem.read_u8(base + 21) as i8,
        rightmove: mem.read_u8(base + 22) as i8,
        upmove: mem.read_u8(base + 23) as i8,
    }
}

pub fn write_usercmd(mem: &mut VmMemory, base: i32, v: &UserCmd) {
    mem.write_i32(base, v.server_time);
    for i in 0..3 {
        mem.write_i32(base + 4 + i * 4, v.angles[i as usize]);
    }
    mem.write_i32(base + 16, v.buttons);
    mem.write_u8(base + 20, v.weapon);
    mem.write_u8(base + 21, v.forwardmove as u8);
    mem.write_u8(base + 22, v.rightmove as u8);
    mem.write_u8(base + 23, v.upmove as u8);
}

// ============================================================
// Trace result — 56 bytes
// ============================================================

pub fn write_trace(mem: &mut VmMemory, base: i32, t: &Trace) {
    mem.write_i32(base, t.allsolid as i32);
    mem.write_i32(base + 4, t.startsolid as i32);
    mem.write_f32(base + 8, t.fraction);
    write_vec3(mem, base + 12, &t.endpos);
    write_vec3(mem, base + 24, &t.plane.normal);
    mem.write_f32(base + 36, t.plane.dist);
    mem.write_u8(base + 40, t.plane.plane_type);
    mem.write_u8(base + 41, t.plane.signbits);
    mem.write_u8(base + 42, 0);
    mem.write_u8(base + 43, 0);
    mem.write_i32(base + 44, t.surface_flags);
    mem.write_i32(base + 48, t.contents);
    mem.write_i32(base + 52, t.entity_num);
}

pub fn read_trace(mem: &VmMemory, base: i32) -> Trace {
    Trace {
        allsolid: mem.read_i32(base) != 0,
        startsolid: mem.read_i32(base + 4) != 0,
        fraction: mem.read_f32(base + 8),
        endpos: read_vec3(mem, base + 12),
        plane: CPlane {
            normal: read_vec3(mem, base + 24),
            dist: mem.read_f32(base + 36),
            plane_type: mem.read_u8(base + 40),
            signbits: mem.read_u8(base + 41),
        },
        surface_flags: mem.read_i32(base + 44),
        contents: mem.read_i32(base + 48),
        entity_num: mem.read_i32(base + 52),
    }
}

// ============================================================
// Module-side cvar record — 272 bytes
// ============================================================

pub fn write_vm_cvar(
    mem: &mut VmMemory,
    base: i32,
    handle: i32,
    modification_count: i32,
    value: f32,
    integer: i32,
    string: &str,
) {
    mem.write_i32(base, handle);
    mem.write_i32(base + 4, modification_count);
    mem.write_f32(base + 8, value);
    mem.write_i32(base + 12, integer);
    mem.write_string(base + 16, string, VM_CVAR_STRING_MAX);
}

pub fn read_vm_cvar_handle(mem: &VmMemory, base: i32) -> i32 {
    mem.read_i32(base)
}

// ============================================================
// Snapshot — as the presentation module expects it
// ============================================================

pub fn write_snapshot(
    mem: &mut VmMemory,
    base: i32,
    snap: &SnapshotRecord,
    entities: &[EntityState],
    num_server_commands: i32,
    server_command_sequence: i32,
) {
    mem.write_i32(base, snap.snap_flags);
    mem.write_i32(base + 4, snap.ping);
    mem.write_i32(base + 8, snap.server_time);
    mem.write_bytes(base + 12, &snap.areamask);
    write_player_state(mem, base + 12 + MAX_MAP_AREA_BYTES as i32, &snap.ps);

    let ents_base = base + 12 + MAX_MAP_AREA_BYTES as i32 + PLAYER_STATE_SIZE;
    let count = entities.len().min(MAX_SNAPSHOT_ENTITIES) as i32;
    mem.write_i32(ents_base, count);
    for (i, ent) in entities.iter().take(MAX_SNAPSHOT_ENTITIES).enumerate() {
        write_entity_state(mem, ents_base + 4 + i as i32 * ENTITY_STATE_SIZE, ent);
    }
    let tail = ents_base + 4 + SNAPSHOT_MAX_ENTITIES * ENTITY_STATE_SIZE;
    mem.write_i32(tail, num_server_commands);
    mem.write_i32(tail + 4, server_command_sequence);
}

// ============================================================
// Game state — configstring offsets plus packed data
// ============================================================

pub fn write_gamestate(mem: &mut VmMemory, base: i32, configstrings: &[String]) {
    let data_base = base + 4 * MAX_CONFIGSTRINGS as i32;
    let mut data_count = 1; // offset 0 is the shared empty string
    mem.write_u8(data_base, 0);

    // every offset defaults to the empty slot
    for i in 0..MAX_CONFIGSTRINGS as i32 {
        mem.write_i32(base + 4 * i, 0);
    }

    for (i, cs) in configstrings.iter().enumerate().take(MAX_CONFIGSTRINGS) {
        let ofs_addr = base + 4 * i as i32;
        if cs.is_empty() {
            mem.write_i32(ofs_addr, 0);
            continue;
        }
        if data_count as usize + cs.len() + 1 > MAX_GAMESTATE_CHARS {
            mem.write_i32(ofs_addr, 0); // overflowed gamestate text
            continue;
        }
        mem.write_i32(ofs_addr, data_count);
        mem.write_bytes(data_base + data_count, cs.as_bytes());
        mem.write_u8(data_base + data_count + cs.len() as i32, 0);
        data_count += cs.len() as i32 + 1;
    }
    mem.write_i32(base + GAMESTATE_SIZE - 4, data_count);
}

// ============================================================
// GL configuration — strings plus a block of ints, zero filled
// ============================================================

pub fn write_glconfig(mem: &mut VmMemory, base: i32, width: i32, height: i32) {
    mem.fill(base, 0, GLCONFIG_SIZE);
    mem.write_string(base, "null renderer", 1024);
    mem.write_string(base + 1024, "myq3", 1024);
    mem.write_string(base + 2048, "1.0", 1024);
    // extensions string block stays empty
    let ints = base + 3072 + 8192;
    mem.write_i32(ints, 2048); // maxTextureSize
    mem.write_i32(ints + 4, 2); // numTextureUnits
    mem.write_i32(ints + 8, 32); // colorBits
    mem.write_i32(ints + 12, 24); // depthBits
    mem.write_i32(ints + 16, 8); // stencilBits
    mem.write_i32(ints + 40, width);
    mem.write_i32(ints + 44, height);
    mem.write_f32(ints + 48, width as f32 / height.max(1) as f32);
    mem.write_i32(ints + 52, 0); // displayFrequency
    mem.write_i32(ints + 56, 1); // isFullscreen
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VmMemory;

    fn mem() -> VmMemory {
        VmMemory::new(1 << 18)
    }

    #[test]
    fn test_player_state_round_trip() {
        let mut m = mem();
        let mut v = PlayerState::default();
        v.command_time = 12345;
        v.origin = [1.0, -2.5, 64.0];
        v.velocity = [0.0, 270.0, -3.25];
        v.delta_angles = [100, -200, 300];
        v.stats[0] = 100;
        v.stats[15] = -5;
        v.ammo[7] = 50;
        v.persistant[3] = 9;
        v.powerups[15] = 0x7fffffff;
        v.viewangles = [10.0, 20.0, 0.0];
        v.ping = 32;
        v.entity_event_sequence = 7;

        write_player_state(&mut m, 1000, &v);
        let back = read_player_state(&m, 1000);
        assert_eq!(back, v);

        // spot-check the fixed offsets of the wire contract
        assert_eq!(m.read_i32(1000), 12345);
        assert_eq!(m.read_f32(1000 + 20), 1.0);
        assert_eq!(m.read_i32(1000 + 464), 7);
    }

    #[test]
    fn test_entity_state_round_trip() {
        let mut m = mem();
        let mut v = EntityState::default();
        v.number = 77;
        v.e_type = 2;
        v.pos = Trajectory {
            tr_type: TrType::Linear,
            tr_time: 50,
            tr_duration: 100,
            tr_base: [1.0, 2.0, 3.0],
            tr_delta: [0.0, 0.0, -800.0],
        };
        v.origin = [-16.0, 8.0, 24.0];
        v.solid = (31 << 16) | 0x505;
        v.generic1 = -9;

        write_entity_state(&mut m, 4096, &v);
        let back = read_entity_state(&m, 4096);
        assert_eq!(back, v);
        assert_eq!(m.read_i32(4096), 77);
        assert_eq!(m.read_i32(4096 + 204), -9);
    }

    #[test]
    fn test_usercmd_round_trip() {
        let mut m = mem();
        let v = UserCmd {
            server_time: 8250,
            angles: [16000, -3000, 0],
            buttons: 0x21,
            weapon: 5,
            forwardmove: 127,
            rightmove: -128,
            upmove: 20,
        };
        write_usercmd(&mut m, 512, &v);
        assert_eq!(read_usercmd(&m, 512), v);
        // 24-byte footprint: next record starts clean
        assert_eq!(m.read_i32(512 + USERCMD_SIZE), 0);
    }

    #[test]
    fn test_trace_round_trip() {
        let mut m = mem();
        let t = Trace {
            allsolid: false,
            startsolid: true,
            fraction: 0.25,
            endpos: [1.0, 2.0, 3.0],
            plane: CPlane {
                normal: [0.0, 0.0, 1.0],
                dist: 64.0,
                plane_type: 2,
                signbits: 0,
            },
            surface_flags: 0x2,
            contents: 1,
            entity_num: 1022,
        };
        write_trace(&mut m, 2048, &t);
        let back = read_trace(&m, 2048);
        assert_eq!(back.fraction, 0.25);
        assert_eq!(back.plane.normal, [0.0, 0.0, 1.0]);
        assert_eq!(back.entity_num, 1022);
        assert!(back.startsolid && !back.allsolid);
    }

    #[test]
    fn test_entity_shared_round_trip() {
        let mut m = mem();
        let v = EntityShared {
            linked: true,
            linkcount: 3,
            sv_flags: 1,
            single_client: 0,
            bmodel: false,
            mins: [-15.0, -15.0, -24.0],
            maxs: [15.0, 15.0, 32.0],
            contents: 0x2000000,
            absmin: [85.0, -16.0, 39.0],
            absmax: [116.0, 16.0, 97.0],
            current_origin: [100.0, 0.0, 64.0],
            current_angles: [0.0, 90.0, 0.0],
            owner_num: 1023,
        };
        write_entity_shared(&mut m, 9000, &v);
        let back = read_entity_shared(&m, 9000);
        assert_eq!(back.linked, v.linked);
        assert_eq!(back.mins, v.mins);
        assert_eq!(back.contents, v.contents);
        assert_eq!(back.owner_num, v.owner_num);
    }

    #[test]
    fn test_gamestate_offsets() {
        let mut m = mem();
        let mut cs = vec![String::new(); 4];
        cs[0] = "\\sv_hostname\\noname".to_string();
        cs[2] = "maps/q3dm17.bsp".to_string();
        write_gamestate(&mut m, 0, &cs);

        let ofs0 = m.read_i32(0);
        let ofs2 = m.read_i32(8);
        assert!(ofs0 > 0 && ofs2 > ofs0);
        let data_base = 4 * MAX_CONFIGSTRINGS as i32;
        assert_eq!(m.read_string(data_base + ofs0), cs[0]);
        assert_eq!(m.read_string(data_base + ofs2), cs[2]);
        // empty string 1 points at the shared empty slot
        assert_eq!(m.read_i32(4), 0);
        assert_eq!(m.read_u8(data_base), 0);
    }

    #[test]
    fn test_snapshot_layout() {
        let mut m = mem();
        let mut snap = SnapshotRecord::default();
        snap.server_time = 250;
        snap.ping = 16;
        snap.ps.origin = [0.0, 0.0, 64.0];
        let ents = vec![
            EntityState {
                number: 5,
                ..Default::default()
            },
            EntityState {
                number: 9,
                ..Default::default()
            },
        ];
        write_snapshot(&mut m, 100, &snap, &ents, 2, 7);

        assert_eq!(m.read_i32(100 + 8), 250); // serverTime
        let ents_base = 100 + 12 + 32 + PLAYER_STATE_SIZE;
        assert_eq!(m.read_i32(ents_base), 2);
        assert_eq!(m.read_i32(ents_base + 4), 5);
        assert_eq!(m.read_i32(ents_base + 4 + ENTITY_STATE_SIZE), 9);
        let tail = ents_base + 4 + SNAPSHOT_MAX_ENTITIES * ENTITY_STATE_SIZE;
        assert_eq!(m.read_i32(tail), 2);
        assert_eq!(m.read_i32(tail + 4), 7);
    }
}

// cl_ui.rs — the user-interface module's import table
//
// A smaller surface than the presentation module: cvars, drawing,
// keys, clipboard, client-state queries, and stubbed LAN browsing and
// CD-key checks.

use crate::client::{ClientContext, ConnState};
use myq3_common::cmd::CmdContext;
use myq3_common::cvar::{CvarContext, CvarFlags};
use myq3_common::engine_api::{
    AudioRef, ClockRef, ConsoleRef, FileSystemRef, InputRef, RendererRef,
};
use myq3_vm::layout;
use myq3_vm::syscalls::*;
use myq3_vm::vm::{Syscalls, VmMemory, MAX_VMSYSCALL_ARGS};
use myq3_vm::Vm;

// connection state codes the ui module understands
const UI_CA_DISCONNECTED: i32 = 1;
const UI_CA_CONNECTED: i32 = 5;
const UI_CA_ACTIVE: i32 = 8;

pub struct UiHost<'a> {
    pub cl: &'a mut ClientContext,
    pub cvars: &'a mut CvarContext,
    pub cmds: &'a mut CmdContext,
    pub console: ConsoleRef,
    pub fs: FileSystemRef,
    pub clock: ClockRef,
    pub renderer: RendererRef,
    pub audio: AudioRef,
    pub input: InputRef,
    pub configstrings: &'a [String],
    abort: bool,
}

impl<'a> UiHost<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cl: &'a mut ClientContext,
        cvars: &'a mut CvarContext,
        cmds: &'a mut CmdContext,
        console: &ConsoleRef,
        fs: &FileSystemRef,
        clock: &ClockRef,
        renderer: &RendererRef,
        audio: &AudioRef,
        input: &InputRef,
        configstrings: &'a [String],
    ) -> Self {
        Self {
            cl,
            cvars,
            cmds,
            console: console.clone(),
            fs: fs.clone(),
            clock: clock.clone(),
            renderer: renderer.clone(),
            audio: audio.clone(),
            input: input.clone(),
            configstrings,
            abort: false,
        }
    }
}

/// Invoke a ui entry point with the boundary attached.
#[allow(clippy::too_many_arguments)]
pub fn ui_call(
    vm: &mut Vm,
    cl: &mut ClientContext,
    cvars: &mut CvarContext,
    cmds: &mut CmdContext,
    console: &ConsoleRef,
    fs: &FileSystemRef,
    clock: &ClockRef,
    renderer: &RendererRef,
    audio: &AudioRef,
    input: &InputRef,
    configstrings: &[String],
    args: &[i32],
) -> i32 {
    let mut host = UiHost::new(
        cl, cvars, cmds, console, fs, clock, renderer, audio, input, configstrings,
    );
    vm.call(&mut host, args)
}

fn f(arg: i32) -> f32 {
    f32::from_bits(arg as u32)
}

fn r(v: f32) -> i32 {
    v.to_bits() as i32
}

impl Syscalls for UiHost<'_> {
    fn abort_requested(&self) -> bool {
        self.abort
    }

    fn syscall(&mut self, mem: &mut VmMemory, args: &[i32; MAX_VMSYSCALL_ARGS]) -> i32 {
        match args[0] {
            UI_ERROR => {
                self.console.error(&mem.read_string(args[1]));
                self.abort = true;
                0
            }
            UI_PRINT => {
                self.console.print(&mem.read_string(args[1]));
                0
            }
            UI_MILLISECONDS => self.clock.milliseconds(),

            UI_CVAR_SET => {
                let name = mem.read_string(args[1]);
                let value = mem.read_string(args[2]);
                self.cvars.set(&name, &value);
                0
            }
            UI_CVAR_VARIABLEVALUE => {
                r(self.cvars.variable_value(&mem.read_string(args[1])))
            }
            UI_CVAR_VARIABLESTRINGBUFFER => {
                let value = self
                    .cvars
                    .variable_string(&mem.read_string(args[1]))
                    .to_string();
                mem.write_string(args[2], &value, args[3].max(0) as usize);
                0
            }
            UI_CVAR_SETVALUE => {
                let name = mem.read_string(args[1]);
                self.cvars.set_value(&name, f(args[2]));
                0
            }
            UI_CVAR_RESET => {
                self.cvars.reset(&mem.read_string(args[1]));
                0
            }
            UI_CVAR_CREATE => {
                let name = mem.read_string(args[1]);
                let value = mem.read_string(args[2]);
                self.cvars
                    .get(&name, &value, CvarFlags::from_bits_truncate(args[3]));
                0
            }
            UI_CVAR_INFOSTRINGBUFFER => {
                let info = self
                    .cvars
                    .info_string(CvarFlags::from_bits_truncate(args[1]));
                mem.write_string(args[2], &info, args[3].max(0) as usize);
                0
            }
            UI_CVAR_REGISTER => {
                let name = mem.read_string(args[2]);
                let default = mem.read_string(args[3]);
                let flags = CvarFlags::from_bits_truncate(args[4]);
                if let Some(handle) = self.cvars.get(&name, &default, flags) {
                    if args[1] != 0 {
                        let var = &self.cvars.vars[handle];
                        layout::write_vm_cvar(
                            mem,
                            args[1],
                            handle as i32,
                            var.modification_count,
                            var.value,
                            var.integer,
                            &var.string,
                        );
                    }
                }
                0
            }
            UI_CVAR_UPDATE => {
                let handle = layout::read_vm_cvar_handle(mem, args[1]);
                if let Some(var) = self.cvars.vars.get(handle as usize) {
                    layout::write_vm_cvar(
                        mem,
                        args[1],
                        handle,
                        var.modification_count,
                        var.value,
                        var.integer,
                        &var.string,
                    );
                }
                0
            }

            UI_ARGC => self.cmds.argc() as i32,
            UI_ARGV => {
                let arg = self.cmds.argv(args[1].max(0) as usize).to_string();
                mem.write_string(args[2], &arg, args[3].max(0) as usize);
                0
            }
            UI_CMD_EXECUTETEXT => {
                self.cmds.add_text(&mem.read_string(args[2]));
                0
            }

            UI_FS_FOPENFILE => {
                let path = mem.read_string(args[1]);
                match args[3] {
                    0 => match self.fs.open_read(&path) {
                        Some((handle, length)) => {
                            mem.write_i32(args[2], handle);
                            length
                        }
                        None => {
                            mem.write_i32(args[2], 0);
                            -1
                        }
                    },
                    _ => match self.fs.open_write(&path) {
                        Some(handle) => {
                            mem.write_i32(args[2], handle);
                            0
                        }
                        None => {
                            mem.write_i32(args[2], 0);
                            -1
                        }
                    },
                }
            }
            UI_FS_READ => {
                let data = self.fs.read(args[3], args[2].max(0) as usize);
                mem.write_bytes(args[1], &data);
                data.len() as i32
            }
            UI_FS_WRITE => {
                let data = mem.read_bytes(args[1], args[2].max(0) as usize);
                self.fs.write(args[3], &data) as i32
            }
            UI_FS_FCLOSEFILE => {
                self.fs.close(args[1]);
                0
            }
            UI_FS_GETFILELIST => {
                let path = mem.read_string(args[1]);
                let ext = mem.read_string(args[2]);
                let names = self.fs.list_dir(&path, &ext);
                let mut written = 0i32;
                let mut count = 0i32;
                for name in &names {
                    let need = name.len() as i32 + 1;
                    if written + need > args[4] {
                        break;
                    }
                    mem.write_bytes(args[3] + written, name.as_bytes());
                    mem.write_u8(args[3] + written + name.len() as i32, 0);
                    written += need;
                    count += 1;
                }
                count
            }

            UI_R_REGISTERMODEL => self.renderer.register_model(&mem.read_string(args[1])),
            UI_R_REGISTERSKIN => self.renderer.register_skin(&mem.read_string(args[1])),
            UI_R_REGISTERSHADERNOMIP => {
                self.renderer.register_shader_no_mip(&mem.read_string(args[1]))
            }
            UI_R_CLEARSCENE => {
                self.renderer.clear_scene();
                0
            }
            UI_R_ADDREFENTITYTOSCENE => 0,
            UI_R_ADDPOLYTOSCENE => {
                self.renderer.add_poly(args[1], args[2]);
                0
            }
            UI_R_ADDLIGHTTOSCENE => {
                let origin = layout::read_vec3(mem, args[1]);
                self.renderer
                    .add_light(&origin, f(args[2]), [f(args[3]), f(args[4]), f(args[5])]);
                0
            }
            UI_R_RENDERSCENE => {
                self.renderer.render_scene(mem.read_i32(args[1] + 72));
                0
            }
            UI_R_SETCOLOR => {
                if args[1] == 0 {
                    self.renderer.set_color(None);
                } else {
                    self.renderer.set_color(Some([
                        mem.read_f32(args[1]),
                        mem.read_f32(args[1] + 4),
                        mem.read_f32(args[1] + 8),
                        mem.read_f32(args[1] + 12),
                    ]));
                }
                0
            }
            UI_R_DRAWSTRETCHPIC => {
                self.renderer.draw_stretch_pic(
                    f(args[1]),
                    f(args[2]),
                    f(args[3]),
                    f(args[4]),
                    f(args[5]),
                    f(args[6]),
                    f(args[7]),
                    f(args[8]),
                    args[9],
                );
                0
            }
            UI_R_MODELBOUNDS => {
                let (mins, maxs) = self.renderer.model_bounds(args[1]);
                layout::write_vec3(mem, args[2], &mins);
                layout::write_vec3(mem, args[3], &maxs);
                0
            }
            UI_R_REGISTERFONT => 0,
            UI_R_REMAP_SHADER => {
                let old = mem.read_string(args[1]);
                let new = mem.read_string(args[2]);
                let offset = mem.read_string(args[3]);
                self.renderer
                    .remap_shader(&old, &new, offset.parse().unwrap_or(0.0));
                0
            }
            UI_UPDATESCREEN => 0,
            UI_CM_LERPTAG => {
                let tag = mem.read_string(args[6]);
                let (origin, axis) =
                    self.renderer
                        .lerp_tag(args[2], args[3], args[4], f(args[5]), &tag);
                layout::write_vec3(mem, args[1], &origin);
                for (i, a) in axis.iter().enumerate() {
                    layout::write_vec3(mem, args[1] + 12 + i as i32 * 12, a);
                }
                0
            }
            UI_CM_LOADMODEL => 0,

            UI_S_REGISTERSOUND => self.audio.register_sound(&mem.read_string(args[1])),
            UI_S_STARTLOCALSOUND => {
                self.audio.start_local_sound(args[1], args[2]);
                0
            }
            UI_S_STARTBACKGROUNDTRACK => {
                let intro = mem.read_string(args[1]);
                let loop_track = mem.read_string(args[2]);
                self.audio.music(&intro, &loop_track);
                0
            }
            UI_S_STOPBACKGROUNDTRACK => {
                self.audio.music("", "");
                0
            }

            UI_KEY_KEYNUMTOSTRINGBUF => {
                mem.write_string(args[2], &format!("key{}", args[1]), args[3].max(0) as usize);
                0
            }
            UI_KEY_GETBINDINGBUF => {
                let binding = self.input.key_binding(args[1]);
                mem.write_string(args[2], &binding, args[3].max(0) as usize);
                0
            }
            UI_KEY_SETBINDING => {
                let binding = mem.read_string(args[2]);
                self.input.set_key_binding(args[1], &binding);
                0
            }
            UI_KEY_ISDOWN => self.input.key_is_down(args[1]) as i32,
            UI_KEY_GETOVERSTRIKEMODE | UI_KEY_SETOVERSTRIKEMODE | UI_KEY_CLEARSTATES => 0,
            UI_KEY_GETCATCHER => self.cl.key_catcher,
            UI_KEY_SETCATCHER => {
                self.cl.key_catcher = args[1];
                0
            }

            UI_GETCLIPBOARDDATA => {
                mem.write_string(args[1], "", args[2].max(0) as usize);
                0
            }
            UI_GETGLCONFIG => {
                let (width, height) = self.renderer.screen_size();
                layout::write_glconfig(mem, args[1], width, height);
                0
            }
            UI_GETCLIENTSTATE => {
                let connstate = match self.cl.state {
                    ConnState::Disconnected => UI_CA_DISCONNECTED,
                    ConnState::Connected => UI_CA_CONNECTED,
                    ConnState::Active => UI_CA_ACTIVE,
                };
                mem.write_i32(args[1], connstate);
                mem.write_i32(args[1] + 4, 0); // connect packet count
                mem.write_i32(args[1] + 8, self.cl.client_num);
                mem.write_string(args[1] + 12, "localhost", 1024);
                mem.write_string(args[1] + 12 + 1024, "", 1024);
                mem.write_string(args[1] + 12 + 2048, "", 1024);
                0
            }
            UI_GETCONFIGSTRING => {
                let index = args[1].max(0) as usize;
                let value = self
                    .configstrings
                    .get(index)
                    .cloned()
                    .unwrap_or_default();
                mem.write_string(args[2], &value, args[3].max(0) as usize);
                (!value.is_empty()) as i32
            }
            UI_MEMORY_REMAINING => 0x400000,
            UI_REAL_TIME => {
                if args[1] != 0 {
                    mem.fill(args[1], 0, 44);
                }
                self.clock.real_time()
            }

            // no LAN browsing or CD keys on a loopback build
            UI_LAN_GETPINGQUEUECOUNT
            | UI_LAN_CLEARPING
            | UI_LAN_GETPING
            | UI_LAN_GETPINGINFO
            | UI_LAN_GETSERVERCOUNT
            | UI_LAN_GETSERVERADDRESSSTRING
            | UI_LAN_GETSERVERINFO
            | UI_LAN_MARKSERVERVISIBLE
            | UI_LAN_UPDATEVISIBLEPINGS
            | UI_LAN_RESETPINGS
            | UI_LAN_LOADCACHEDSERVERS
            | UI_LAN_SAVECACHEDSERVERS
            | UI_LAN_ADDSERVER
            | UI_LAN_REMOVESERVER
            | UI_LAN_SERVERSTATUS
            | UI_LAN_GETSERVERPING
            | UI_LAN_SERVERISVISIBLE
            | UI_LAN_COMPARESERVERS => 0,
            UI_GET_CDKEY | UI_SET_CDKEY | UI_VERIFY_CDKEY => {
                if args[0] == UI_GET_CDKEY && args[1] != 0 {
                    mem.write_string(args[1], "", args[2].max(0) as usize);
                }
                if args[0] == UI_VERIFY_CDKEY {
                    return 1;
                }
                0
            }
            UI_PC_ADD_GLOBAL_DEFINE | UI_PC_LOAD_SOURCE | UI_PC_FREE_SOURCE
            | UI_PC_READ_TOKEN | UI_PC_SOURCE_FILE_AND_LINE => 0,
            UI_CIN_PLAYCINEMATIC | UI_CIN_STOPCINEMATIC | UI_CIN_RUNCINEMATIC
            | UI_CIN_DRAWCINEMATIC | UI_CIN_SETEXTENTS => 0,

            UI_MEMSET => {
                mem.fill(args[1], args[2] as u8, args[3].max(0));
                args[1]
            }
            UI_MEMCPY => {
                mem.block_copy(args[1], args[2], args[3].max(0));
                args[1]
            }
            UI_STRNCPY => {
                let src = mem.read_string(args[2]);
                let max = args[3].max(0) as usize;
                mem.write_string(args[1], &src, max.max(1));
                args[1]
            }
            UI_SIN => r(f(args[1]).sin()),
            UI_COS => r(f(args[1]).cos()),
            UI_ATAN2 => r(f(args[1]).atan2(f(args[2]))),
            UI_SQRT => r(f(args[1]).sqrt()),
            UI_FLOOR => r(f(args[1]).floor()),
            UI_CEIL => r(f(args[1]).ceil()),

            selector => {
                self.console
                    .warn(&format!("ui vm: bad system trap {}\n", selector));
                0
            }
        }
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use myq3_common::engine_api::{
        ManualClock, MemoryFileSystem, NullAudio, NullInput, NullRenderer, RecordingConsole,
    };
    use std::rc::Rc;

    fn dispatch(
        cl: &mut ClientContext,
        cvars: &mut CvarContext,
        mem: &mut VmMemory,
        args: &[i32],
    ) -> i32 {
        let console: ConsoleRef = Rc::new(RecordingConsole::default());
        let fs: FileSystemRef = Rc::new(MemoryFileSystem::new());
        let clock: ClockRef = Rc::new(ManualClock::default());
        let renderer: RendererRef = Rc::new(NullRenderer::default());
        let audio: AudioRef = Rc::new(NullAudio::default());
        let input: InputRef = Rc::new(NullInput::default());
        let configstrings: Vec<String> = vec![String::new(); 4];
        let mut cmds = CmdContext::new();
        let mut host = UiHost::new(
            cl, cvars, &mut cmds, &console, &fs, &clock, &renderer, &audio, &input,
            &configstrings,
        );
        let mut full = [0i32; MAX_VMSYSCALL_ARGS];
        full[..args.len()].copy_from_slice(args);
        host.syscall(mem, &full)
    }

    #[test]
    fn test_client_state_query() {
        let console: ConsoleRef = Rc::new(RecordingConsole::default());
        let mut cl = ClientContext::new();
        let mut cvars = CvarContext::new(console);
        let mut mem = VmMemory::new(1 << 16);

        cl.state = ConnState::Active;
        cl.client_num = 0;
        dispatch(&mut cl, &mut cvars, &mut mem, &[UI_GETCLIENTSTATE, 256]);
        assert_eq!(mem.read_i32(256), UI_CA_ACTIVE);
        assert_eq!(mem.read_string(256 + 12), "localhost");
    }

    #[test]
    fn test_cvar_setvalue_and_reset() {
        let console: ConsoleRef = Rc::new(RecordingConsole::default());
        let mut cl = ClientContext::new();
        let mut cvars = CvarContext::new(console);
        let mut mem = VmMemory::new(1 << 16);

        mem.write_string(100, "ui_browserMaster", 32);
        mem.write_string(140, "0", 8);
        dispatch(&mut cl, &mut cvars, &mut mem, &[UI_CVAR_CREATE, 100, 140, 1]);
        dispatch(
            &mut cl,
            &mut cvars,
            &mut mem,
            &[UI_CVAR_SETVALUE, 100, 3.0f32.to_bits() as i32],
        );
        assert_eq!(cvars.variable_integer("ui_browserMaster"), 3);
        dispatch(&mut cl, &mut cvars, &mut mem, &[UI_CVAR_RESET, 100]);
        assert_eq!(cvars.variable_integer("ui_browserMaster"), 0);
    }

    #[test]
    fn test_cdkey_stubs() {
        let console: ConsoleRef = Rc::new(RecordingConsole::default());
        let mut cl = ClientContext::new();
        let mut cvars = CvarContext::new(console);
        let mut mem = VmMemory::new(1 << 16);

        assert_eq!(
            dispatch(&mut cl, &mut cvars, &mut mem, &[UI_VERIFY_CDKEY, 0, 0]),
            1
        );
        assert_eq!(
            dispatch(&mut cl, &mut cvars, &mut mem, &[UI_LAN_GETSERVERCOUNT, 0]),
            0
        );
    }
}

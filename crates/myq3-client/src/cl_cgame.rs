// cl_cgame.rs — the client-presentation module's import table
//
// The cgame module reads snapshots, game state, and collision queries
// through these selectors and pushes its scene to the renderer and
// audio capabilities. Snapshot reads are non-blocking polls against the
// loopback ring.

use crate::client::ClientContext;
use myq3_common::cmd::CmdContext;
use myq3_common::cmodel::CModelContext;
use myq3_common::cvar::{CvarContext, CvarFlags};
use myq3_common::engine_api::{
    AudioRef, ClockRef, ConsoleRef, FileSystemRef, InputRef, RefEntity, RendererRef,
};
use myq3_common::net_chan::{ReliableRing, SnapshotRing};
use myq3_common::q_shared::snap_vector;
use myq3_vm::layout;
use myq3_vm::syscalls::*;
use myq3_vm::vm::{Syscalls, VmMemory, MAX_VMSYSCALL_ARGS};
use myq3_vm::Vm;

/// Host side of the cgame boundary. The snapshot ring and the
/// server-command ring are read-only views of the authoritative side.
pub struct CgameHost<'a> {
    pub cl: &'a mut ClientContext,
    pub cm: &'a mut CModelContext,
    pub cvars: &'a mut CvarContext,
    pub cmds: &'a mut CmdContext,
    pub console: ConsoleRef,
    pub fs: FileSystemRef,
    pub clock: ClockRef,
    pub renderer: RendererRef,
    pub audio: AudioRef,
    pub input: InputRef,
    pub snapshots: &'a SnapshotRing,
    pub server_commands: &'a ReliableRing,
    pub configstrings: &'a [String],
    abort: bool,
}

impl<'a> CgameHost<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cl: &'a mut ClientContext,
        cm: &'a mut CModelContext,
        cvars: &'a mut CvarContext,
        cmds: &'a mut CmdContext,
        console: &ConsoleRef,
        fs: &FileSystemRef,
        clock: &ClockRef,
        renderer: &RendererRef,
        audio: &AudioRef,
        input: &InputRef,
        snapshots: &'a SnapshotRing,
        server_commands: &'a ReliableRing,
        configstrings: &'a [String],
    ) -> Self {
        Self {
            cl,
            cm,
            cvars,
            cmds,
            console: console.clone(),
            fs: fs.clone(),
            clock: clock.clone(),
            renderer: renderer.clone(),
            audio: audio.clone(),
            input: input.clone(),
            snapshots,
            server_commands,
            configstrings,
            abort: false,
        }
    }
}

/// Invoke a cgame entry point with the boundary attached.
#[allow(clippy::too_many_arguments)]
pub fn cgame_call(
    vm: &mut Vm,
    cl: &mut ClientContext,
    cm: &mut CModelContext,
    cvars: &mut CvarContext,
    cmds: &mut CmdContext,
    console: &ConsoleRef,
    fs: &FileSystemRef,
    clock: &ClockRef,
    renderer: &RendererRef,
    audio: &AudioRef,
    input: &InputRef,
    snapshots: &SnapshotRing,
    server_commands: &ReliableRing,
    configstrings: &[String],
    args: &[i32],
) -> i32 {
    let mut host = CgameHost::new(
        cl, cm, cvars, cmds, console, fs, clock, renderer, audio, input, snapshots,
        server_commands, configstrings,
    );
    vm.call(&mut host, args)
}

fn f(arg: i32) -> f32 {
    f32::from_bits(arg as u32)
}

fn r(v: f32) -> i32 {
    v.to_bits() as i32
}

/// The scene-entity fields the renderer capability consumes, read from
/// the module's 140-byte refEntity record.
fn read_ref_entity(mem: &VmMemory, base: i32) -> RefEntity {
    RefEntity {
        handle: mem.read_i32(base + 8),
        axis: [
            layout::read_vec3(mem, base + 28),
            layout::read_vec3(mem, base + 40),
            layout::read_vec3(mem, base + 52),
        ],
        origin: layout::read_vec3(mem, base + 68),
        frame: mem.read_i32(base + 80),
        old_frame: mem.read_i32(base + 96),
        backlerp: mem.read_f32(base + 100),
        skin: mem.read_i32(base + 108),
        shader_rgba: [
            mem.read_u8(base + 116),
            mem.read_u8(base + 117),
            mem.read_u8(base + 118),
            mem.read_u8(base + 119),
        ],
    }
}

impl Syscalls for CgameHost<'_> {
    fn abort_requested(&self) -> bool {
        self.abort
    }

    fn syscall(&mut self, mem: &mut VmMemory, args: &[i32; MAX_VMSYSCALL_ARGS]) -> i32 {
        match args[0] {
            CG_PRINT => {
                self.console.print(&mem.read_string(args[1]));
                0
            }
            CG_ERROR => {
                self.console.error(&mem.read_string(args[1]));
                self.abort = true;
                0
            }
            CG_MILLISECONDS => self.clock.milliseconds(),

            CG_CVAR_REGISTER => {
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
            CG_CVAR_UPDATE => {
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
            CG_CVAR_SET => {
                let name = mem.read_string(args[1]);
                let value = mem.read_string(args[2]);
                self.cvars.set(&name, &value);
                0
            }
            CG_CVAR_VARIABLESTRINGBUFFER => {
                let value = self
                    .cvars
                    .variable_string(&mem.read_string(args[1]))
                    .to_string();
                mem.write_string(args[2], &value, args[3].max(0) as usize);
                0
            }

            CG_ARGC => self.cmds.argc() as i32,
            CG_ARGV => {
                let arg = self.cmds.argv(args[1].max(0) as usize).to_string();
                mem.write_string(args[2], &arg, args[3].max(0) as usize);
                0
            }
            CG_ARGS => {
                let all = self.cmds.args().to_string();
                mem.write_string(args[1], &all, args[2].max(0) as usize);
                0
            }

            CG_FS_FOPENFILE => {
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
            CG_FS_READ => {
                let data = self.fs.read(args[3], args[2].max(0) as usize);
                mem.write_bytes(args[1], &data);
                data.len() as i32
            }
            CG_FS_WRITE => {
                let data = mem.read_bytes(args[1], args[2].max(0) as usize);
                self.fs.write(args[3], &data) as i32
            }
            CG_FS_FCLOSEFILE => {
                self.fs.close(args[1]);
                0
            }
            CG_FS_SEEK => self.fs.seek(args[1], args[2], args[3]),

            CG_SENDCONSOLECOMMAND => {
                self.cmds.add_text(&mem.read_string(args[1]));
                0
            }
            CG_ADDCOMMAND => {
                self.cmds.add_vm_command(&mem.read_string(args[1]));
                0
            }
            CG_REMOVECOMMAND => {
                self.cmds.remove_vm_command(&mem.read_string(args[1]));
                0
            }
            CG_SENDCLIENTCOMMAND => {
                self.cl.out_commands.send(&mem.read_string(args[1]));
                0
            }
            CG_UPDATESCREEN => 0,

            // the world is already resident; the load request is a no-op
            CG_CM_LOADMAP => 0,
            CG_CM_NUMINLINEMODELS => self.cm.num_inline_models() as i32,
            CG_CM_INLINEMODEL => self.cm.inline_model(args[1]),
            CG_CM_LOADMODEL => 0,
            CG_CM_TEMPBOXMODEL | CG_CM_TEMPCAPSULEMODEL => {
                let mins = layout::read_vec3(mem, args[1]);
                let maxs = layout::read_vec3(mem, args[2]);
                self.cm.temp_box_model(&mins, &maxs)
            }
            CG_CM_POINTCONTENTS => {
                let p = layout::read_vec3(mem, args[1]);
                self.cm.point_contents(&p, args[2])
            }
            CG_CM_TRANSFORMEDPOINTCONTENTS => {
                let p = layout::read_vec3(mem, args[1]);
                let origin = layout::read_vec3(mem, args[3]);
                let angles = layout::read_vec3(mem, args[4]);
                self.cm
                    .transformed_point_contents(&p, args[2], &origin, &angles)
            }
            CG_CM_BOXTRACE | CG_CM_CAPSULETRACE => {
                let start = layout::read_vec3(mem, args[2]);
                let end = layout::read_vec3(mem, args[3]);
                let mins = if args[4] != 0 {
                    layout::read_vec3(mem, args[4])
                } else {
                    [0.0; 3]
                };
                let maxs = if args[5] != 0 {
                    layout::read_vec3(mem, args[5])
                } else {
                    [0.0; 3]
                };
                let tr = self.cm.box_trace(&start, &end, &mins, &maxs, args[6], args[7]);
                layout::write_trace(mem, args[1], &tr);
                0
            }
            CG_CM_TRANSFORMEDBOXTRACE | CG_CM_TRANSFORMEDCAPSULETRACE => {
                let start = layout::read_vec3(mem, args[2]);
                let end = layout::read_vec3(mem, args[3]);
                let mins = if args[4] != 0 {
                    layout::read_vec3(mem, args[4])
                } else {
                    [0.0; 3]
                };
                let maxs = if args[5] != 0 {
                    layout::read_vec3(mem, args[5])
                } else {
                    [0.0; 3]
                };
                let origin = layout::read_vec3(mem, args[8]);
                let angles = layout::read_vec3(mem, args[9]);
                let tr = self.cm.transformed_box_trace(
                    &start, &end, &mins, &maxs, args[6], args[7], &origin, &angles,
                );
                layout::write_trace(mem, args[1], &tr);
                0
            }
            CG_CM_MARKFRAGMENTS => 0,

            CG_S_STARTSOUND => {
                let origin = if args[1] != 0 {
                    Some(layout::read_vec3(mem, args[1]))
                } else {
                    None
                };
                self.audio
                    .start_sound(origin.as_ref(), args[2], args[3], args[4]);
                0
            }
            CG_S_STARTLOCALSOUND => {
                self.audio.start_local_sound(args[1], args[2]);
                0
            }
            CG_S_CLEARLOOPINGSOUNDS => {
                self.audio.clear_looping_sounds();
                0
            }
            CG_S_ADDLOOPINGSOUND | CG_S_ADDREALLOOPINGSOUND => {
                let origin = layout::read_vec3(mem, args[2]);
                let velocity = layout::read_vec3(mem, args[3]);
                self.audio
                    .add_looping_sound(args[1], &origin, &velocity, args[4]);
                0
            }
            CG_S_STOPLOOPINGSOUND => {
                self.audio.stop_looping_sound(args[1]);
                0
            }
            CG_S_UPDATEENTITYPOSITION => {
                let origin = layout::read_vec3(mem, args[2]);
                self.audio.update_entity(args[1], &origin);
                0
            }
            CG_S_RESPATIALIZE => {
                let origin = layout::read_vec3(mem, args[2]);
                let axis = [
                    layout::read_vec3(mem, args[3]),
                    layout::read_vec3(mem, args[3] + 12),
                    layout::read_vec3(mem, args[3] + 24),
                ];
                self.audio.update_listener(args[1], &origin, &axis);
                0
            }
            CG_S_REGISTERSOUND => self.audio.register_sound(&mem.read_string(args[1])),
            CG_S_STARTBACKGROUNDTRACK => {
                let intro = mem.read_string(args[1]);
                let loop_track = mem.read_string(args[2]);
                self.audio.music(&intro, &loop_track);
                0
            }
            CG_S_STOPBACKGROUNDTRACK => {
                self.audio.music("", "");
                0
            }

            CG_R_LOADWORLDMAP => {
                self.renderer.load_world(&mem.read_string(args[1]));
                0
            }
            CG_R_REGISTERMODEL => self.renderer.register_model(&mem.read_string(args[1])),
            CG_R_REGISTERSKIN => self.renderer.register_skin(&mem.read_string(args[1])),
            CG_R_REGISTERSHADER => self.renderer.register_shader(&mem.read_string(args[1])),
            CG_R_REGISTERSHADERNOMIP => {
                self.renderer.register_shader_no_mip(&mem.read_string(args[1]))
            }
            CG_R_CLEARSCENE => {
                self.renderer.clear_scene();
                0
            }
            CG_R_ADDREFENTITYTOSCENE => {
                let ent = read_ref_entity(mem, args[1]);
                self.renderer.add_ref_entity(&ent);
                0
            }
            CG_R_ADDPOLYTOSCENE => {
                self.renderer.add_poly(args[1], args[2]);
                0
            }
            CG_R_ADDPOLYSTOSCENE => {
                self.renderer.add_poly(args[1], args[2] * args[4].max(1));
                0
            }
            CG_R_ADDLIGHTTOSCENE | CG_R_ADDADDITIVELIGHTTOSCENE => {
                let origin = layout::read_vec3(mem, args[1]);
                self.renderer
                    .add_light(&origin, f(args[2]), [f(args[3]), f(args[4]), f(args[5])]);
                0
            }
            CG_R_RENDERSCENE => {
                // refdef time at offset 72 of the module's refdef record
                self.renderer.render_scene(mem.read_i32(args[1] + 72));
                0
            }
            CG_R_SETCOLOR => {
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
            CG_R_DRAWSTRETCHPIC => {
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
            CG_R_MODELBOUNDS => {
                let (mins, maxs) = self.renderer.model_bounds(args[1]);
                layout::write_vec3(mem, args[2], &mins);
                layout::write_vec3(mem, args[3], &maxs);
                0
            }
            CG_R_LERPTAG => {
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
            CG_R_REMAP_SHADER => {
                let old = mem.read_string(args[1]);
                let new = mem.read_string(args[2]);
                let offset = mem.read_string(args[3]);
                self.renderer
                    .remap_shader(&old, &new, offset.parse().unwrap_or(0.0));
                0
            }
            CG_R_REGISTERFONT => 0,
            CG_R_LIGHTFORPOINT => 0,
            CG_R_INPVS => 1,

            CG_GETGLCONFIG => {
                let (width, height) = self.renderer.screen_size();
                layout::write_glconfig(mem, args[1], width, height);
                0
            }
            CG_GETGAMESTATE => {
                layout::write_gamestate(mem, args[1], self.configstrings);
                0
            }
            CG_GETCURRENTSNAPSHOTNUMBER => {
                mem.write_i32(args[1], self.snapshots.current());
                mem.write_i32(args[2], self.snapshots.current_server_time());
                0
            }
            CG_GETSNAPSHOT => {
                match self.snapshots.get(args[1]) {
                    Some(snap) => {
                        let entities: Vec<_> = (0..snap.num_entities)
                            .map(|i| *self.snapshots.entity(snap.first_entity + i))
                            .collect();
                        let acked = self.cl.server_command_ack;
                        layout::write_snapshot(
                            mem,
                            args[2],
                            snap,
                            &entities,
                            self.server_commands.sequence - acked,
                            self.server_commands.sequence,
                        );
                        1
                    }
                    None => 0, // missing or aged out
                }
            }
            CG_GETSERVERCOMMAND => {
                match self.server_commands.get(args[1]) {
                    Some(text) => {
                        let text = text.to_string();
                        self.cmds.tokenize_string(&text);
                        if args[1] > self.cl.server_command_ack
                            && args[1] <= self.server_commands.sequence
                        {
                            self.cl.server_command_ack = args[1];
                        }
                        1
                    }
                    None => 0,
                }
            }
            CG_GETCURRENTCMDNUMBER => self.cl.cmd_number,
            CG_GETUSERCMD => {
                let n = args[1];
                if n <= 0 || n > self.cl.cmd_number
                    || self.cl.cmd_number - n >= crate::client::CMD_BACKUP as i32
                {
                    0
                } else {
                    layout::write_usercmd(mem, args[2], self.cl.cmd(n));
                    1
                }
            }
            CG_SETUSERCMDVALUE => {
                self.cl.usercmd_value = args[1];
                0
            }
            CG_MEMORY_REMAINING => 0x400000,

            CG_KEY_ISDOWN => self.input.key_is_down(args[1]) as i32,
            CG_KEY_GETCATCHER => self.cl.key_catcher,
            CG_KEY_SETCATCHER => {
                self.cl.key_catcher = args[1];
                0
            }
            CG_KEY_GETKEY => -1,

            CG_GET_ENTITY_TOKEN => match self.cm.next_entity_token() {
                Some(token) => {
                    mem.write_string(args[1], &token, args[2].max(0) as usize);
                    1
                }
                None => 0,
            },

            CG_REAL_TIME => {
                if args[1] != 0 {
                    mem.fill(args[1], 0, 44);
                }
                self.clock.real_time()
            }
            CG_SNAPVECTOR => {
                let mut v = layout::read_vec3(mem, args[1]);
                snap_vector(&mut v);
                layout::write_vec3(mem, args[1], &v);
                0
            }

            // script parser and cinematics are not part of this core
            CG_PC_ADD_GLOBAL_DEFINE | CG_PC_LOAD_SOURCE | CG_PC_FREE_SOURCE
            | CG_PC_READ_TOKEN | CG_PC_SOURCE_FILE_AND_LINE => 0,
            CG_CIN_PLAYCINEMATIC | CG_CIN_STOPCINEMATIC | CG_CIN_RUNCINEMATIC
            | CG_CIN_DRAWCINEMATIC | CG_CIN_SETEXTENTS => 0,

            CG_MEMSET => {
                mem.fill(args[1], args[2] as u8, args[3].max(0));
                args[1]
            }
            CG_MEMCPY => {
                mem.block_copy(args[1], args[2], args[3].max(0));
                args[1]
            }
            CG_STRNCPY => {
                let src = mem.read_string(args[2]);
                let max = args[3].max(0) as usize;
                mem.write_string(args[1], &src, max.max(1));
                args[1]
            }
            CG_SIN => r(f(args[1]).sin()),
            CG_COS => r(f(args[1]).cos()),
            CG_ATAN2 => r(f(args[1]).atan2(f(args[2]))),
            CG_SQRT => r(f(args[1]).sqrt()),
            CG_FLOOR => r(f(args[1]).floor()),
            CG_CEIL => r(f(args[1]).ceil()),
            CG_ACOS => r(f(args[1]).clamp(-1.0, 1.0).acos()),
            CG_TESTPRINTINT => {
                self.console
                    .print(&format!("{} {}\n", mem.read_string(args[1]), args[2]));
                0
            }
            CG_TESTPRINTFLOAT => {
                self.console
                    .print(&format!("{} {}\n", mem.read_string(args[1]), f(args[2])));
                0
            }

            selector if (89..100).contains(&selector) => 0, // reserved gap

            selector => {
                self.console
                    .warn(&format!("cgame vm: bad system trap {}\n", selector));
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
    use myq3_common::net_chan::MAX_MAP_AREA_BYTES;
    use myq3_common::q_shared::{EntityState, PlayerState};
    use std::rc::Rc;

    struct Rig {
        cl: ClientContext,
        cm: CModelContext,
        cvars: CvarContext,
        cmds: CmdContext,
        console: Rc<RecordingConsole>,
        snapshots: SnapshotRing,
        server_commands: ReliableRing,
        configstrings: Vec<String>,
        mem: VmMemory,
    }

    fn rig() -> Rig {
        let console = Rc::new(RecordingConsole::default());
        Rig {
            cl: ClientContext::new(),
            cm: CModelContext::new(),
            cvars: CvarContext::new(console.clone()),
            cmds: CmdContext::new(),
            console,
            snapshots: SnapshotRing::new(),
            server_commands: ReliableRing::new(),
            configstrings: vec![String::new(); 16],
            mem: VmMemory::new(1 << 20),
        }
    }

    fn dispatch(rig: &mut Rig, args: &[i32]) -> i32 {
        let console: ConsoleRef = rig.console.clone();
        let fs: FileSystemRef = Rc::new(MemoryFileSystem::new());
        let clock: ClockRef = Rc::new(ManualClock::default());
        let renderer: RendererRef = Rc::new(NullRenderer::default());
        let audio: AudioRef = Rc::new(NullAudio::default());
        let input: InputRef = Rc::new(NullInput::default());
        let mut host = CgameHost::new(
            &mut rig.cl,
            &mut rig.cm,
            &mut rig.cvars,
            &mut rig.cmds,
            &console,
            &fs,
            &clock,
            &renderer,
            &audio,
            &input,
            &rig.snapshots,
            &rig.server_commands,
            &rig.configstrings,
        );
        let mut full = [0i32; MAX_VMSYSCALL_ARGS];
        full[..args.len()].copy_from_slice(args);
        host.syscall(&mut rig.mem, &full)
    }

    #[test]
    fn test_snapshot_poll_hit_and_miss() {
        let mut rig = rig();
        let mut ps = PlayerState::default();
        ps.origin = [10.0, 20.0, 30.0];
        let ents = vec![EntityState {
            number: 4,
            ..Default::default()
        }];
        rig.snapshots
            .store(100, 5, 0, [0; MAX_MAP_AREA_BYTES], &ps, &ents);

        // current snapshot number and time
        dispatch(&mut rig, &[CG_GETCURRENTSNAPSHOTNUMBER, 64, 68]);
        assert_eq!(rig.mem.read_i32(64), 1);
        assert_eq!(rig.mem.read_i32(68), 100);

        // a hit writes the full record at the given address
        assert_eq!(dispatch(&mut rig, &[CG_GETSNAPSHOT, 1, 4096]), 1);
        assert_eq!(rig.mem.read_i32(4096 + 8), 100); // serverTime
        let ents_base = 4096 + 12 + 32 + layout::PLAYER_STATE_SIZE;
        assert_eq!(rig.mem.read_i32(ents_base), 1);
        assert_eq!(rig.mem.read_i32(ents_base + 4), 4); // entity number

        // a miss returns zero and writes nothing
        assert_eq!(dispatch(&mut rig, &[CG_GETSNAPSHOT, 7, 4096]), 0);
    }

    #[test]
    fn test_server_command_poll() {
        let mut rig = rig();
        rig.server_commands.send("print \"round over\"");

        assert_eq!(dispatch(&mut rig, &[CG_GETSERVERCOMMAND, 1]), 1);
        assert_eq!(rig.cmds.argv(0), "print");
        assert_eq!(rig.cmds.argv(1), "round over");
        assert_eq!(rig.cl.server_command_ack, 1);

        assert_eq!(dispatch(&mut rig, &[CG_GETSERVERCOMMAND, 2]), 0);
    }

    #[test]
    fn test_usercmd_access() {
        let mut rig = rig();
        rig.cl.server_time = 400;
        rig.cl.input.button_command("+forward");
        crate::cl_input::cl_create_cmd(&mut rig.cl);

        assert_eq!(dispatch(&mut rig, &[CG_GETCURRENTCMDNUMBER]), 1);
        assert_eq!(dispatch(&mut rig, &[CG_GETUSERCMD, 1, 512]), 1);
        let cmd = layout::read_usercmd(&rig.mem, 512);
        assert_eq!(cmd.server_time, 400);
        assert_eq!(cmd.forwardmove, 127);

        // out-of-window numbers miss
        assert_eq!(dispatch(&mut rig, &[CG_GETUSERCMD, 99, 512]), 0);
    }

    #[test]
    fn test_gamestate_marshal() {
        let mut rig = rig();
        rig.configstrings[2] = "maps/q3dm17.bsp".to_string();
        dispatch(&mut rig, &[CG_GETGAMESTATE, 0]);
        let ofs = rig.mem.read_i32(8);
        assert!(ofs > 0);
        let data_base = 4 * layout::MAX_CONFIGSTRINGS as i32;
        assert_eq!(rig.mem.read_string(data_base + ofs), "maps/q3dm17.bsp");
    }

    #[test]
    fn test_reserved_gap_returns_zero_silently() {
        let mut rig = rig();
        for selector in 89..100 {
            assert_eq!(dispatch(&mut rig, &[selector]), 0);
        }
        assert!(rig.console.warnings.borrow().is_empty());
    }

    #[test]
    fn test_client_command_goes_out() {
        let mut rig = rig();
        rig.mem.write_string(100, "say hello", 32);
        dispatch(&mut rig, &[CG_SENDCLIENTCOMMAND, 100]);
        assert_eq!(rig.cl.out_commands.get(1), Some("say hello"));
    }
}

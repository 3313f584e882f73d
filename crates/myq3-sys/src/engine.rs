// engine.rs — the engine context and the render-frame scheduler
//
// One object owns every subsystem; nothing in the engine is a global.
// Each render-frame invocation consumes wall-clock time, drains the
// command buffer, advances the authoritative simulation in whole ticks,
// and then drives the presentation module.

use myq3_client::cl_cgame::cgame_call;
use myq3_client::cl_main::{
    cl_frame, cl_init_cgame, cl_init_ui, cl_shutdown_cgame, cl_ui_refresh,
};
use myq3_client::client::{ClientContext, ConnState};
use myq3_common::cmd::CmdContext;
use myq3_common::cmodel::CModelContext;
use myq3_common::cvar::{CvarContext, CvarFlags};
use myq3_common::engine_api::{
    AudioRef, ClockRef, ConsoleRef, FileSystemRef, InputRef, RendererRef,
};
use myq3_common::net_chan::{ReliableRing, SnapshotRing};
use myq3_server::server::{ClientConnState, ServerContext, ServerState};
use myq3_server::sv_ccmds::{sv_serverinfo, sv_status};
use myq3_server::sv_game::game_call;
use myq3_server::sv_init::{sv_connect_local_client, sv_shutdown_game, sv_spawn_server};
use myq3_server::sv_main::sv_frame;
use myq3_vm::syscalls::{CG_CONSOLE_COMMAND, GAME_CLIENT_COMMAND, GAME_CONSOLE_COMMAND};
use myq3_vm::Vm;

/// Per-frame wall clock is clamped into this range; the first frame and
/// debugger stalls otherwise run absurd tick counts.
const FRAME_MSEC_MIN: i32 = 1;
const FRAME_MSEC_MAX: i32 = 200;

/// External collaborators, injected once at construction.
pub struct EngineCaps {
    pub console: ConsoleRef,
    pub fs: FileSystemRef,
    pub clock: ClockRef,
    pub renderer: RendererRef,
    pub audio: AudioRef,
    pub input: InputRef,
}

pub struct Engine {
    pub console: ConsoleRef,
    pub fs: FileSystemRef,
    pub clock: ClockRef,
    pub renderer: RendererRef,
    pub audio: AudioRef,
    pub input: InputRef,

    pub cvars: CvarContext,
    pub cmds: CmdContext,
    pub cm: CModelContext,
    pub sv: ServerContext,
    pub cl: ClientContext,

    pub game_vm: Option<Vm>,
    pub cgame_vm: Option<Vm>,
    pub ui_vm: Option<Vm>,

    // loopback stand-ins while no client slot exists
    empty_snapshots: SnapshotRing,
    empty_commands: ReliableRing,

    last_ms: i32,
    pub quit: bool,
}

impl Engine {
    pub fn new(caps: EngineCaps) -> Self {
        let mut engine = Self {
            cvars: CvarContext::new(caps.console.clone()),
            cmds: CmdContext::new(),
            cm: CModelContext::new(),
            sv: ServerContext::new(),
            cl: ClientContext::new(),
            game_vm: None,
            cgame_vm: None,
            ui_vm: None,
            empty_snapshots: SnapshotRing::new(),
            empty_commands: ReliableRing::new(),
            last_ms: caps.clock.milliseconds(),
            quit: false,
            console: caps.console,
            fs: caps.fs,
            clock: caps.clock,
            renderer: caps.renderer,
            audio: caps.audio,
            input: caps.input,
        };
        engine.register_cvars();
        engine.register_commands();
        engine.exec_startup_configs();
        engine
    }

    fn register_cvars(&mut self) {
        let c = &mut self.cvars;
        c.get("sv_maxclients", "8", CvarFlags::SERVERINFO | CvarFlags::LATCH);
        c.get("sv_cheats", "1", CvarFlags::SYSTEMINFO | CvarFlags::ROM);
        c.get("sv_hostname", "noname", CvarFlags::SERVERINFO | CvarFlags::ARCHIVE);
        c.get("timescale", "1", CvarFlags::CHEAT | CvarFlags::SYSTEMINFO);
        c.get("name", "UnnamedPlayer", CvarFlags::USERINFO | CvarFlags::ARCHIVE);
        c.get("model", "sarge", CvarFlags::USERINFO | CvarFlags::ARCHIVE);
        c.get("rate", "25000", CvarFlags::USERINFO | CvarFlags::ARCHIVE);
        c.get("com_version", "myq3 1.0", CvarFlags::ROM | CvarFlags::SERVERINFO);
    }

    fn register_commands(&mut self) {
        for name in [
            "map", "echo", "exec", "vstr", "set", "seta", "sets", "setu", "reset", "cvarlist",
            "cmdlist", "wait", "quit", "disconnect", "status", "serverinfo",
        ] {
            self.cmds.add_command(name);
        }
        for button in [
            "forward", "back", "moveleft", "moveright", "moveup", "movedown", "attack",
        ] {
            self.cmds.add_command(&format!("+{}", button));
            self.cmds.add_command(&format!("-{}", button));
        }
    }

    /// Sourced in a fixed order on startup; missing files are fine.
    fn exec_startup_configs(&mut self) {
        for config in ["default.cfg", "q3config.cfg", "autoexec.cfg"] {
            if let Some(data) = self.fs.load(config) {
                self.console.print(&format!("execing {}\n", config));
                self.cmds.add_text(&String::from_utf8_lossy(&data));
                self.cmds.add_text("\n");
            }
        }
        self.cvars.startup_done = true;
    }

    // ============================================================
    // Frame
    // ============================================================

    pub fn frame(&mut self) {
        let now = self.clock.milliseconds();
        let msec = (now - self.last_ms).clamp(FRAME_MSEC_MIN, FRAME_MSEC_MAX);
        self.last_ms = now;

        self.drain_commands();

        // loopback: the latest created command feeds this frame's ticks
        if self.sv.running() && self.cl.state == ConnState::Active {
            if let Some(client) = self.sv.clients.get_mut(0) {
                if self.cl.cmd_number > 0 {
                    client.last_usercmd = *self.cl.cmd(self.cl.cmd_number);
                }
            }
            self.forward_client_commands();
        }

        sv_frame(
            &mut self.sv,
            &mut self.cm,
            &mut self.cvars,
            &mut self.cmds,
            &self.console,
            &self.fs,
            &self.clock,
            &mut self.game_vm,
            msec,
        );
        if self.sv.state == ServerState::Dead && self.game_vm.is_none() && self.cl.state != ConnState::Disconnected {
            // the game VM died this frame; the client follows
            self.disconnect();
        }

        if self.cl.state == ConnState::Active && self.sv.running() {
            let (snapshots, commands) = match self.sv.clients.first() {
                Some(client) => (&client.snapshots, &client.commands),
                None => (&self.empty_snapshots, &self.empty_commands),
            };
            cl_frame(
                &mut self.cl,
                &mut self.cm,
                &mut self.cvars,
                &mut self.cmds,
                &self.console,
                &self.fs,
                &self.clock,
                &self.renderer,
                &self.audio,
                &self.input,
                snapshots,
                commands,
                &self.sv.configstrings,
                &mut self.cgame_vm,
            );
        } else {
            cl_ui_refresh(
                &mut self.cl,
                &mut self.cvars,
                &mut self.cmds,
                &self.console,
                &self.fs,
                &self.clock,
                &self.renderer,
                &self.audio,
                &self.input,
                &self.sv.configstrings,
                &mut self.ui_vm,
            );
        }
    }

    /// Client-to-server reliable commands drain into the game module's
    /// client-command entry point, in order.
    fn forward_client_commands(&mut self) {
        let vm = match self.game_vm.as_mut() {
            Some(vm) => vm,
            None => return,
        };
        while self.cl.out_commands_acked < self.cl.out_commands.sequence {
            let seq = self.cl.out_commands_acked + 1;
            let text = match self.cl.out_commands.get(seq) {
                Some(t) => t.to_string(),
                None => {
                    self.cl.out_commands_acked = seq;
                    continue; // aged out before delivery
                }
            };
            self.cl.out_commands_acked = seq;
            self.cl.out_commands.acknowledge(seq);
            self.cmds.tokenize_string(&text);
            game_call(
                vm,
                &mut self.sv,
                &mut self.cm,
                &mut self.cvars,
                &mut self.cmds,
                &self.console,
                &self.fs,
                &self.clock,
                &[GAME_CLIENT_COMMAND, 0],
            );
            if vm.is_aborted() {
                break; // the frame loop will notice and tear down
            }
        }
    }

    // ============================================================
    // Command dispatch
    // ============================================================

    pub fn drain_commands(&mut self) {
        while let Some(line) = self.cmds.next_command() {
            self.execute_line(&line);
        }
    }

    pub fn execute_line(&mut self, line: &str) {
        self.cmds.tokenize_string(line);
        if self.cmds.argc() == 0 {
            return;
        }
        let name = self.cmds.argv(0).to_ascii_lowercase();

        match name.as_str() {
            "map" => {
                if self.cmds.argc() < 2 {
                    self.console.print("usage: map <mapname>\n");
                } else {
                    let map = self.cmds.argv(1).to_string();
                    self.map_command(&map);
                }
                return;
            }
            "echo" => {
                self.console.print(&format!("{}\n", self.cmds.args()));
                return;
            }
            "exec" => {
                if self.cmds.argc() < 2 {
                    self.console.print("usage: exec <filename>\n");
                    return;
                }
                let path = self.cmds.argv(1).to_string();
                match self.fs.load(&path) {
                    Some(data) => {
                        self.console.print(&format!("execing {}\n", path));
                        self.cmds.insert_text(&String::from_utf8_lossy(&data));
                    }
                    None => self
                        .console
                        .print(&format!("couldn't exec {}\n", path)),
                }
                return;
            }
            "vstr" => {
                let value = self
                    .cvars
                    .variable_string(self.cmds.argv(1))
                    .to_string();
                self.cmds.insert_text(&value);
                return;
            }
            "set" | "seta" | "sets" | "setu" => {
                self.set_command(&name);
                return;
            }
            "reset" => {
                let var = self.cmds.argv(1).to_string();
                self.cvars.reset(&var);
                return;
            }
            "cvarlist" => {
                let prefix = if self.cmds.argc() > 1 {
                    Some(self.cmds.argv(1).to_string())
                } else {
                    None
                };
                self.cvars.list(prefix.as_deref());
                return;
            }
            "cmdlist" => {
                for name in self.cmds.command_names() {
                    self.console.print(&format!("{}\n", name));
                }
                return;
            }
            "wait" => {
                let frames = self.cmds.argv(1).parse::<i32>().unwrap_or(1);
                self.cmds.wait = frames.max(1);
                return;
            }
            "quit" => {
                self.quit = true;
                return;
            }
            "disconnect" => {
                self.disconnect();
                return;
            }
            "status" => {
                sv_status(&self.sv, &self.console);
                return;
            }
            "serverinfo" => {
                let info = self.cvars.info_string(CvarFlags::SERVERINFO);
                sv_serverinfo(&info, &self.console);
                return;
            }
            _ => {}
        }

        // held-button state changes
        if name.starts_with('+') || name.starts_with('-') {
            if self.cl.input.button_command(&name) {
                return;
            }
        }

        // commands the presentation module registered
        if self.cmds.is_vm_command(&name) && self.cgame_vm.is_some() {
            self.cgame_console_command();
            return;
        }

        // cvar inspection / assignment
        let argv: Vec<String> = self.cmds.argv_vec().to_vec();
        if self.cvars.command(&argv) {
            return;
        }

        // anything left goes to the game module's console handler
        if self.sv.running() {
            if let Some(vm) = self.game_vm.as_mut() {
                let handled = game_call(
                    vm,
                    &mut self.sv,
                    &mut self.cm,
                    &mut self.cvars,
                    &mut self.cmds,
                    &self.console,
                    &self.fs,
                    &self.clock,
                    &[GAME_CONSOLE_COMMAND],
                );
                if handled != 0 {
                    return;
                }
            }
        }

        self.console
            .print(&format!("Unknown command \"{}\"\n", name));
    }

    fn set_command(&mut self, which: &str) {
        if self.cmds.argc() < 3 {
            self.console
                .print(&format!("usage: {} <variable> <value>\n", which));
            return;
        }
        let name = self.cmds.argv(1).to_string();
        let value: String = self.cmds.argv_vec()[2..].join(" ");
        self.cvars.set(&name, &value);
        let extra = match which {
            "seta" => CvarFlags::ARCHIVE,
            "sets" => CvarFlags::SERVERINFO,
            "setu" => CvarFlags::USERINFO,
            _ => CvarFlags::empty(),
        };
        if !extra.is_empty() {
            if let Some(idx) = self.cvars.find_index(&name) {
                self.cvars.vars[idx].flags |= extra;
            }
        }
    }

    fn cgame_console_command(&mut self) {
        let vm = match self.cgame_vm.as_mut() {
            Some(vm) => vm,
            None => return,
        };
        let (snapshots, commands) = match self.sv.clients.first() {
            Some(client) => (&client.snapshots, &client.commands),
            None => (&self.empty_snapshots, &self.empty_commands),
        };
        cgame_call(
            vm,
            &mut self.cl,
            &mut self.cm,
            &mut self.cvars,
            &mut self.cmds,
            &self.console,
            &self.fs,
            &self.clock,
            &self.renderer,
            &self.audio,
            &self.input,
            snapshots,
            commands,
            &self.sv.configstrings,
            &[CG_CONSOLE_COMMAND],
        );
    }

    // ============================================================
    // Map loads and teardown
    // ============================================================

    /// The full map-load sequence: disconnect, respawn the server, then
    /// reconnect the loopback client and its presentation module.
    pub fn map_command(&mut self, map_name: &str) {
        self.disconnect();

        let ok = sv_spawn_server(
            &mut self.sv,
            &mut self.cm,
            &mut self.cvars,
            &mut self.cmds,
            &self.console,
            &self.fs,
            &self.clock,
            &mut self.game_vm,
            map_name,
        );
        if !ok {
            return; // server stays dead; the error is already logged
        }

        if !sv_connect_local_client(
            &mut self.sv,
            &mut self.cm,
            &mut self.cvars,
            &mut self.cmds,
            &self.console,
            &self.fs,
            &self.clock,
            &mut self.game_vm,
        ) {
            return;
        }
        self.cl.client_num = 0;
        self.cl.state = ConnState::Connected;

        let (snapshots, commands) = match self.sv.clients.first() {
            Some(client) => (&client.snapshots, &client.commands),
            None => (&self.empty_snapshots, &self.empty_commands),
        };
        cl_init_cgame(
            &mut self.cl,
            &mut self.cm,
            &mut self.cvars,
            &mut self.cmds,
            &self.console,
            &self.fs,
            &self.clock,
            &self.renderer,
            &self.audio,
            &self.input,
            snapshots,
            commands,
            &self.sv.configstrings,
            &mut self.cgame_vm,
        );
    }

    /// Drop the local client and, because the server only exists for
    /// it, the level too.
    pub fn disconnect(&mut self) {
        if self.cgame_vm.is_some() || self.cl.state != ConnState::Disconnected {
            cl_shutdown_cgame(&mut self.cl, &mut self.cgame_vm);
        }
        self.cmds.clear_vm_commands();
        if self.sv.state != ServerState::Dead {
            for client in &mut self.sv.clients {
                client.state = ClientConnState::Free;
            }
            sv_shutdown_game(
                &mut self.sv,
                &mut self.cm,
                &mut self.cvars,
                &mut self.cmds,
                &self.console,
                &self.fs,
                &self.clock,
                &mut self.game_vm,
            );
            self.cm.clear();
        }
    }

    /// Load the menu module once the engine is up.
    pub fn init_ui(&mut self) {
        cl_init_ui(
            &mut self.cl,
            &mut self.cvars,
            &mut self.cmds,
            &self.console,
            &self.fs,
            &self.clock,
            &self.renderer,
            &self.audio,
            &self.input,
            &self.sv.configstrings,
            &mut self.ui_vm,
        );
    }

    /// Archive cvars, written on clean exit.
    pub fn write_config(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let _ = self.cvars.write_variables(&mut out);
        out
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
    use myq3_common::qfiles::{BSP_IDENT, BSP_VERSION, VM_MAGIC};
    use std::rc::Rc;

    struct Rig {
        engine: Engine,
        console: Rc<RecordingConsole>,
        fs: Rc<MemoryFileSystem>,
        clock: Rc<ManualClock>,
    }

    fn rig_with(files: &[(&str, Vec<u8>)]) -> Rig {
        let console = Rc::new(RecordingConsole::default());
        let fs = Rc::new(MemoryFileSystem::new());
        let clock = Rc::new(ManualClock::default());
        for (path, data) in files {
            fs.insert(path, data.clone());
        }
        let engine = Engine::new(EngineCaps {
            console: console.clone(),
            fs: fs.clone(),
            clock: clock.clone(),
            renderer: Rc::new(NullRenderer::default()),
            audio: Rc::new(NullAudio::default()),
            input: Rc::new(NullInput::default()),
        });
        Rig {
            engine,
            console,
            fs,
            clock,
        }
    }

    /// A module whose every export returns zero.
    fn trivial_qvm() -> Vec<u8> {
        // ENTER 16; CONST 0; LEAVE 16
        let code: Vec<u8> = [
            vec![3u8],
            16i32.to_le_bytes().to_vec(),
            vec![8u8],
            0i32.to_le_bytes().to_vec(),
            vec![4u8],
            16i32.to_le_bytes().to_vec(),
        ]
        .concat();
        let mut out = Vec::new();
        out.extend_from_slice(&VM_MAGIC.to_le_bytes());
        out.extend_from_slice(&3i32.to_le_bytes()); // instructions
        out.extend_from_slice(&32i32.to_le_bytes());
        out.extend_from_slice(&(code.len() as i32).to_le_bytes());
        out.extend_from_slice(&((32 + code.len()) as i32).to_le_bytes());
        out.extend_from_slice(&4i32.to_le_bytes()); // dataLength
        out.extend_from_slice(&0i32.to_le_bytes()); // litLength
        out.extend_from_slice(&0x20000i32.to_le_bytes()); // bssLength
        out.extend_from_slice(&code);
        out.extend_from_slice(&[0, 0, 0, 0]);
        out
    }

    /// The smallest world the loader accepts: one solid unit brush.
    fn tiny_bsp() -> Vec<u8> {
        use myq3_common::qfiles::*;

        let mut lumps: Vec<Vec<u8>> = vec![Vec::new(); HEADER_LUMPS];
        lumps[LUMP_ENTITIES] = b"{\n\"classname\" \"worldspawn\"\n}\n\0".to_vec();

        let mut shader = vec![0u8; DSHADER_SIZE];
        shader[68..72].copy_from_slice(&1i32.to_le_bytes()); // CONTENTS_SOLID
        lumps[LUMP_SHADERS] = shader;

        let plane_set: [([f32; 3], f32); 7] = [
            ([-1.0, 0.0, 0.0], 0.0),
            ([1.0, 0.0, 0.0], 1.0),
            ([0.0, -1.0, 0.0], 0.0),
            ([0.0, 1.0, 0.0], 1.0),
            ([0.0, 0.0, -1.0], 0.0),
            ([0.0, 0.0, 1.0], 1.0),
            ([0.0, 0.0, 1.0], -65536.0), // node plane
        ];
        for (normal, dist) in plane_set {
            for v in normal {
                lumps[LUMP_PLANES].extend_from_slice(&v.to_le_bytes());
            }
            lumps[LUMP_PLANES].extend_from_slice(&dist.to_le_bytes());
        }

        for v in [6i32, -1, -2, 0, 0, 0, 0, 0, 0] {
            lumps[LUMP_NODES].extend_from_slice(&v.to_le_bytes());
        }
        for (first, count) in [(0i32, 1i32), (0, 0)] {
            for v in [-1i32, 0, 0, 0, 0, 0, 0, 0, 0, 0, first, count] {
                lumps[LUMP_LEAFS].extend_from_slice(&v.to_le_bytes());
            }
        }
        lumps[LUMP_LEAFBRUSHES].extend_from_slice(&0i32.to_le_bytes());
        for v in [-1024.0f32, -1024.0, -1024.0, 1024.0, 1024.0, 1024.0] {
            lumps[LUMP_MODELS].extend_from_slice(&v.to_le_bytes());
        }
        for v in [0i32, 0, 0, 1] {
            lumps[LUMP_MODELS].extend_from_slice(&v.to_le_bytes());
        }
        for v in [0i32, 6, 0] {
            lumps[LUMP_BRUSHES].extend_from_slice(&v.to_le_bytes());
        }
        for plane in 0..6i32 {
            lumps[LUMP_BRUSHSIDES].extend_from_slice(&plane.to_le_bytes());
            lumps[LUMP_BRUSHSIDES].extend_from_slice(&0i32.to_le_bytes());
        }

        let mut out = Vec::new();
        out.extend_from_slice(&BSP_IDENT.to_le_bytes());
        out.extend_from_slice(&BSP_VERSION.to_le_bytes());
        let mut ofs = 8 + HEADER_LUMPS * 8;
        let mut dir = Vec::new();
        for lump in &lumps {
            dir.extend_from_slice(&(ofs as i32).to_le_bytes());
            dir.extend_from_slice(&(lump.len() as i32).to_le_bytes());
            ofs += lump.len();
        }
        out.extend_from_slice(&dir);
        for lump in &lumps {
            out.extend_from_slice(lump);
        }
        out
    }

    #[test]
    fn test_echo_and_unknown_command() {
        let mut rig = rig_with(&[]);
        rig.engine.cmds.add_text("echo hello world\nbogus_cmd\n");
        rig.engine.drain_commands();
        let lines = rig.console.lines.borrow();
        assert!(lines.iter().any(|l| l == "hello world\n"));
        assert!(lines.iter().any(|l| l.contains("Unknown command \"bogus_cmd\"")));
    }

    #[test]
    fn test_set_variants() {
        let mut rig = rig_with(&[]);
        rig.engine
            .cmds
            .add_text("set g_custom 5; seta cg_bob 0.002; sets sv_motd \"hi there\"\n");
        rig.engine.drain_commands();
        assert_eq!(rig.engine.cvars.variable_integer("g_custom"), 5);
        let bob = rig.engine.cvars.find("cg_bob").unwrap();
        assert!(bob.flags.contains(CvarFlags::ARCHIVE));
        let motd = rig.engine.cvars.find("sv_motd").unwrap();
        assert!(motd.flags.contains(CvarFlags::SERVERINFO));
        assert_eq!(motd.string, "hi there");
    }

    #[test]
    fn test_startup_configs_exec_in_order() {
        let mut rig = rig_with(&[
            ("default.cfg", b"set test_order default\n".to_vec()),
            ("q3config.cfg", b"set test_order config\n".to_vec()),
        ]);
        rig.engine.drain_commands();
        assert_eq!(rig.engine.cvars.variable_string("test_order"), "config");
    }

    #[test]
    fn test_cvar_assignment_via_bare_name() {
        let mut rig = rig_with(&[]);
        rig.engine.cmds.add_text("sv_hostname myserver\n");
        rig.engine.drain_commands();
        assert_eq!(rig.engine.cvars.variable_string("sv_hostname"), "myserver");
    }

    #[test]
    fn test_map_command_boots_and_ticks() {
        let mut rig = rig_with(&[
            ("maps/test.bsp", tiny_bsp()),
            ("vm/qagame.qvm", trivial_qvm()),
            ("vm/cgame.qvm", trivial_qvm()),
        ]);
        rig.engine.cmds.add_text("map test\n");
        rig.engine.drain_commands();

        assert_eq!(rig.engine.sv.state, ServerState::Game);
        assert!(rig.engine.game_vm.is_some());
        assert_eq!(rig.engine.cl.state, ConnState::Active);
        assert!(rig.engine.cgame_vm.is_some());
        let warmup_time = rig.engine.sv.time;
        assert_eq!(warmup_time, 150); // three warm-up ticks

        // four render frames of 50 ms = four more ticks and snapshots
        for _ in 0..4 {
            rig.clock.advance(50);
            rig.engine.frame();
        }
        assert_eq!(rig.engine.sv.time, warmup_time + 200);
        assert_eq!(rig.engine.sv.clients[0].snapshots.current(), 4);
        // the client's time estimate follows the authoritative tick
        assert_eq!(rig.engine.cl.server_time, rig.engine.sv.time);
    }

    #[test]
    fn test_map_command_missing_assets_stays_dead() {
        let mut rig = rig_with(&[("maps/test.bsp", tiny_bsp())]);
        rig.engine.cmds.add_text("map test\n");
        rig.engine.drain_commands();
        assert_eq!(rig.engine.sv.state, ServerState::Dead);
        assert!(rig.engine.game_vm.is_none());
        assert!(rig
            .console
            .errors
            .borrow()
            .iter()
            .any(|e| e.contains("qagame")));
    }

    #[test]
    fn test_disconnect_tears_down() {
        let mut rig = rig_with(&[
            ("maps/test.bsp", tiny_bsp()),
            ("vm/qagame.qvm", trivial_qvm()),
            ("vm/cgame.qvm", trivial_qvm()),
        ]);
        rig.engine.cmds.add_text("map test\n");
        rig.engine.drain_commands();
        assert_eq!(rig.engine.sv.state, ServerState::Game);

        rig.engine.cmds.add_text("disconnect\n");
        rig.engine.drain_commands();
        assert_eq!(rig.engine.sv.state, ServerState::Dead);
        assert_eq!(rig.engine.cl.state, ConnState::Disconnected);
        assert!(rig.engine.game_vm.is_none());
        assert!(rig.engine.cgame_vm.is_none());
    }

    #[test]
    fn test_frame_clamps_wall_clock() {
        let mut rig = rig_with(&[
            ("maps/test.bsp", tiny_bsp()),
            ("vm/qagame.qvm", trivial_qvm()),
            ("vm/cgame.qvm", trivial_qvm()),
        ]);
        rig.engine.cmds.add_text("map test\n");
        rig.engine.drain_commands();
        let before = rig.engine.sv.time;

        // a five-second stall runs at most 200 ms of simulation
        rig.clock.advance(5000);
        rig.engine.frame();
        assert_eq!(rig.engine.sv.time, before + 200);
    }

    #[test]
    fn test_button_commands_route_to_input() {
        let mut rig = rig_with(&[]);
        rig.engine.cmds.add_text("+forward\n");
        rig.engine.drain_commands();
        assert!(rig.engine.cl.input.forward);
        rig.engine.cmds.add_text("-forward\n");
        rig.engine.drain_commands();
        assert!(!rig.engine.cl.input.forward);
    }

    #[test]
    fn test_write_config_has_archives() {
        let rig = rig_with(&[]);
        let out = String::from_utf8(rig.engine.write_config()).unwrap();
        assert!(out.contains("seta name \"UnnamedPlayer\""));
        assert!(!out.contains("sv_cheats"));
    }

    #[test]
    fn test_quit_command() {
        let mut rig = rig_with(&[]);
        rig.engine.cmds.add_text("quit\n");
        rig.engine.drain_commands();
        assert!(rig.engine.quit);
    }
}

// sv_init.rs — map loads and server spin-up

use crate::server::{Client, ClientConnState, ServerContext, ServerState, TICK_MSEC};
use crate::sv_game::game_call;
use myq3_common::cmd::CmdContext;
use myq3_common::cmodel::CModelContext;
use myq3_common::cvar::{CvarContext, CvarFlags};
use myq3_common::engine_api::{ClockRef, ConsoleRef, FileSystemRef};
use myq3_common::q_shared::{CS_SERVERINFO, CS_SYSTEMINFO};
use myq3_vm::syscalls::{
    GAME_CLIENT_BEGIN, GAME_CLIENT_CONNECT, GAME_INIT, GAME_RUN_FRAME, GAME_SHUTDOWN,
};
use myq3_vm::Vm;

const WARMUP_TICKS: i32 = 3;

/// Shut the running game module down and discard its VM.
pub fn sv_shutdown_game(
    sv: &mut ServerContext,
    cm: &mut CModelContext,
    cvars: &mut CvarContext,
    cmds: &mut CmdContext,
    console: &ConsoleRef,
    fs: &FileSystemRef,
    clock: &ClockRef,
    game_vm: &mut Option<Vm>,
) {
    if let Some(vm) = game_vm.as_mut() {
        game_call(vm, sv, cm, cvars, cmds, console, fs, clock, &[GAME_SHUTDOWN, 0]);
    }
    *game_vm = None;
    sv.clear_level();
}

/// Bring a map up: world data, collision, sectors, the game VM, warm-up
/// ticks, then the local client. A failure at any stage logs and leaves
/// the server dead without touching the rest of the process.
pub fn sv_spawn_server(
    sv: &mut ServerContext,
    cm: &mut CModelContext,
    cvars: &mut CvarContext,
    cmds: &mut CmdContext,
    console: &ConsoleRef,
    fs: &FileSystemRef,
    clock: &ClockRef,
    game_vm: &mut Option<Vm>,
    map_name: &str,
) -> bool {
    console.print("------ Server Initialization ------\n");
    console.print(&format!("Server: {}\n", map_name));

    sv_shutdown_game(sv, cm, cvars, cmds, console, fs, clock, game_vm);

    // latched variables and cheat gating take effect across map loads
    cvars.apply_latched();
    cvars.set_cheat_state(cvars.variable_integer("sv_cheats") != 0);

    let bsp_path = format!("maps/{}.bsp", map_name);
    let bsp = match fs.load(&bsp_path) {
        Some(data) => data,
        None => {
            console.error(&format!("Couldn't load {}\n", bsp_path));
            return false;
        }
    };
    let checksum = match cm.load_map(&bsp_path, &bsp) {
        Ok(checksum) => checksum,
        Err(e) => {
            console.error(&format!("{}\n", e));
            return false;
        }
    };

    sv.state = ServerState::Loading;
    sv.time = 0;
    sv.time_residual = 0;
    sv.map_name = map_name.to_string();
    sv.map_checksum = checksum;

    cvars.get("sv_mapname", "nomap", CvarFlags::SERVERINFO | CvarFlags::ROM);
    cvars.force_set("sv_mapname", map_name);
    cvars.get("sv_mapChecksum", "", CvarFlags::ROM);
    cvars.force_set("sv_mapChecksum", &checksum.to_string());

    let maxclients = cvars.variable_integer("sv_maxclients").clamp(1, 64) as usize;
    sv.clients = (0..maxclients).map(|_| Client::new()).collect();

    let (world_mins, world_maxs) = cm.world_bounds();
    sv.world.build(&world_mins, &world_maxs);

    sv.set_configstring(CS_SERVERINFO, &cvars.info_string(CvarFlags::SERVERINFO));
    sv.set_configstring(CS_SYSTEMINFO, &cvars.info_string(CvarFlags::SYSTEMINFO));

    // boot the game module
    let qvm_path = "vm/qagame.qvm";
    let image = match fs.load(qvm_path) {
        Some(data) => data,
        None => {
            console.error(&format!("Couldn't load {}\n", qvm_path));
            sv.clear_level();
            return false;
        }
    };
    let vm = match Vm::load(qvm_path, &image) {
        Ok(vm) => vm,
        Err(e) => {
            console.error(&format!("{}\n", e));
            sv.clear_level();
            return false;
        }
    };
    console.print(&format!(
        "Loaded {} ({} instructions, checksum {:x})\n",
        qvm_path,
        vm.instruction_count(),
        vm.checksum
    ));

    let mut vm = vm;
    let seed = clock.milliseconds();
    game_call(
        &mut vm, sv, cm, cvars, cmds, console, fs, clock,
        &[GAME_INIT, sv.time, seed, 0],
    );
    if vm.is_aborted() {
        sv_report_abort(console, &mut vm);
        sv.clear_level();
        return false;
    }

    // run a few ticks so everything settles before anyone connects
    for _ in 0..WARMUP_TICKS {
        sv.time += TICK_MSEC;
        game_call(&mut vm, sv, cm, cvars, cmds, console, fs, clock, &[GAME_RUN_FRAME, sv.time]);
    }
    if vm.is_aborted() {
        sv_report_abort(console, &mut vm);
        sv.clear_level();
        return false;
    }
    *game_vm = Some(vm);

    sv.state = ServerState::Game;
    console.print("-----------------------------------\n");
    true
}

/// Attach the local loopback client to slot 0.
pub fn sv_connect_local_client(
    sv: &mut ServerContext,
    cm: &mut CModelContext,
    cvars: &mut CvarContext,
    cmds: &mut CmdContext,
    console: &ConsoleRef,
    fs: &FileSystemRef,
    clock: &ClockRef,
    game_vm: &mut Option<Vm>,
) -> bool {
    if sv.state != ServerState::Game || sv.clients.is_empty() {
        return false;
    }
    let vm = match game_vm.as_mut() {
        Some(vm) => vm,
        None => return false,
    };

    sv.clients[0].state = ClientConnState::Connected;
    sv.clients[0].userinfo = cvars.info_string(CvarFlags::USERINFO);
    sv.clients[0].name = "local".to_string();

    // a nonzero return is a VM address of a denial string
    let denied = game_call(
        vm, sv, cm, cvars, cmds, console, fs, clock,
        &[GAME_CLIENT_CONNECT, 0, 1, 0],
    );
    if vm.is_aborted() {
        sv_report_abort(console, vm);
        return false;
    }
    if denied != 0 {
        let reason = vm.mem.read_string(denied);
        console.print(&format!("Game rejected the local client: {}\n", reason));
        sv.clients[0].state = ClientConnState::Free;
        return false;
    }

    game_call(vm, sv, cm, cvars, cmds, console, fs, clock, &[GAME_CLIENT_BEGIN, 0]);
    if vm.is_aborted() {
        sv_report_abort(console, vm);
        return false;
    }
    sv.clients[0].state = ClientConnState::Active;
    true
}

pub fn sv_report_abort(console: &ConsoleRef, vm: &mut Vm) {
    match vm.take_fault() {
        Some(fault) => console.error(&format!("{}: {}\n", vm.name, fault)),
        None => console.error(&format!("{}: aborted\n", vm.name)),
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use myq3_common::engine_api::{ManualClock, MemoryFileSystem, RecordingConsole};
    use std::rc::Rc;

    #[test]
    fn test_spawn_fails_cleanly_without_map() {
        let console = Rc::new(RecordingConsole::default());
        let console_ref: ConsoleRef = console.clone();
        let fs: FileSystemRef = Rc::new(MemoryFileSystem::new());
        let clock: ClockRef = Rc::new(ManualClock::default());
        let mut sv = ServerContext::new();
        let mut cm = CModelContext::new();
        let mut cvars = CvarContext::new(console_ref.clone());
        let mut cmds = CmdContext::new();
        let mut game_vm = None;

        cvars.get("sv_maxclients", "8", CvarFlags::LATCH);
        let ok = sv_spawn_server(
            &mut sv, &mut cm, &mut cvars, &mut cmds, &console_ref, &fs, &clock, &mut game_vm,
            "q3dm17",
        );
        assert!(!ok);
        assert_eq!(sv.state, ServerState::Dead);
        assert!(game_vm.is_none());
        assert!(console.errors.borrow()[0].contains("maps/q3dm17.bsp"));
    }
}

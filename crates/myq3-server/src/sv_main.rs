// sv_main.rs — the fixed-tick server frame

use crate::server::{ClientConnState, ServerContext, ServerState, TICK_MSEC};
use crate::sv_game::game_call;
use crate::sv_init::{sv_report_abort, sv_shutdown_game};
use crate::sv_snapshot::sv_build_snapshots;
use myq3_common::cmd::CmdContext;
use myq3_common::cmodel::CModelContext;
use myq3_common::cvar::CvarContext;
use myq3_common::engine_api::{ClockRef, ConsoleRef, FileSystemRef};
use myq3_vm::syscalls::{
    BOTAI_START_FRAME, GAME_CLIENT_DISCONNECT, GAME_CLIENT_THINK, GAME_RUN_FRAME,
};
use myq3_vm::Vm;

/// Advance the authoritative simulation by whole ticks. Each tick runs
/// client thinks, the game frame, the bot frame, then snapshot builds;
/// a VM abort tears the server down to dead without touching the rest
/// of the process.
pub fn sv_frame(
    sv: &mut ServerContext,
    cm: &mut CModelContext,
    cvars: &mut CvarContext,
    cmds: &mut CmdContext,
    console: &ConsoleRef,
    fs: &FileSystemRef,
    clock: &ClockRef,
    game_vm: &mut Option<Vm>,
    msec: i32,
) {
    if sv.state != ServerState::Game {
        return;
    }
    let mut vm = match game_vm.take() {
        Some(vm) => vm,
        None => return,
    };

    sv.time_residual += msec;

    while sv.time_residual >= TICK_MSEC {
        sv.time_residual -= TICK_MSEC;
        sv.time += TICK_MSEC;

        // each active client thinks on its latest command
        for i in 0..sv.clients.len() {
            if sv.clients[i].state != ClientConnState::Active {
                continue;
            }
            sv.clients[i].last_usercmd.server_time = sv.time;
            game_call(
                &mut vm, sv, cm, cvars, cmds, console, fs, clock,
                &[GAME_CLIENT_THINK, i as i32],
            );
            if vm.is_aborted() {
                sv_fault(sv, cm, cvars, cmds, console, fs, clock, &mut vm);
                return;
            }
        }

        game_call(
            &mut vm, sv, cm, cvars, cmds, console, fs, clock,
            &[GAME_RUN_FRAME, sv.time],
        );
        if vm.is_aborted() {
            sv_fault(sv, cm, cvars, cmds, console, fs, clock, &mut vm);
            return;
        }

        game_call(
            &mut vm, sv, cm, cvars, cmds, console, fs, clock,
            &[BOTAI_START_FRAME, sv.time],
        );
        if vm.is_aborted() {
            sv_fault(sv, cm, cvars, cmds, console, fs, clock, &mut vm);
            return;
        }

        // drops requested by the game during this tick
        process_pending_drops(sv, cm, cvars, cmds, console, fs, clock, &mut vm);

        // the tick is complete; clients observe it atomically
        sv_build_snapshots(sv, &vm.mem);
    }

    *game_vm = Some(vm);
}

/// A VM fault during an entry point discards the VM and kills the level.
fn sv_fault(
    sv: &mut ServerContext,
    cm: &mut CModelContext,
    cvars: &mut CvarContext,
    cmds: &mut CmdContext,
    console: &ConsoleRef,
    fs: &FileSystemRef,
    clock: &ClockRef,
    vm: &mut Vm,
) {
    sv_report_abort(console, vm);
    console.print("Server shutting down: game VM fault\n");
    // the VM is already terminal, shutdown only clears host state
    let mut dead = None;
    sv_shutdown_game(sv, cm, cvars, cmds, console, fs, clock, &mut dead);
}

fn process_pending_drops(
    sv: &mut ServerContext,
    cm: &mut CModelContext,
    cvars: &mut CvarContext,
    cmds: &mut CmdContext,
    console: &ConsoleRef,
    fs: &FileSystemRef,
    clock: &ClockRef,
    vm: &mut Vm,
) {
    for i in 0..sv.clients.len() {
        let reason = match sv.clients[i].drop_reason.take() {
            Some(reason) => reason,
            None => continue,
        };
        console.print(&format!("client {}: dropped: {}\n", i, reason));
        game_call(
            vm, sv, cm, cvars, cmds, console, fs, clock,
            &[GAME_CLIENT_DISCONNECT, i as i32],
        );
        sv.clients[i].state = ClientConnState::Free;
        sv.clients[i].commands.clear();
        sv.clients[i].snapshots.clear();
    }
}

// cl_main.rs — presentation-side lifecycle
//
// Loads and drives the cgame and ui modules. Everything network-shaped
// arrives over the loopback rings owned by the server side; this file
// only sequences the calls.

use crate::cl_cgame::cgame_call;
use crate::cl_input::cl_create_cmd;
use crate::cl_ui::ui_call;
use crate::client::{ClientContext, ConnState};
use myq3_common::cmd::CmdContext;
use myq3_common::cmodel::CModelContext;
use myq3_common::cvar::CvarContext;
use myq3_common::engine_api::{
    AudioRef, ClockRef, ConsoleRef, FileSystemRef, InputRef, RendererRef,
};
use myq3_common::net_chan::{ReliableRing, SnapshotRing};
use myq3_common::q_shared::UserCmd;
use myq3_vm::syscalls::{CG_DRAW_ACTIVE_FRAME, CG_INIT, UI_INIT, UI_REFRESH, UI_SET_ACTIVE_MENU};
use myq3_vm::Vm;

const UIMENU_MAIN: i32 = 1;

/// Load the presentation module and hand it the current gamestate.
#[allow(clippy::too_many_arguments)]
pub fn cl_init_cgame(
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
    cgame_vm: &mut Option<Vm>,
) -> bool {
    let image = match fs.load("vm/cgame.qvm") {
        Some(data) => data,
        None => {
            console.error("Couldn't load vm/cgame.qvm\n");
            return false;
        }
    };
    let mut vm = match Vm::load("vm/cgame.qvm", &image) {
        Ok(vm) => vm,
        Err(e) => {
            console.error(&format!("{}\n", e));
            return false;
        }
    };
    console.print(&format!(
        "Loaded vm/cgame.qvm ({} instructions)\n",
        vm.instruction_count()
    ));

    cgame_call(
        &mut vm,
        cl,
        cm,
        cvars,
        cmds,
        console,
        fs,
        clock,
        renderer,
        audio,
        input,
        snapshots,
        server_commands,
        configstrings,
        &[
            CG_INIT,
            snapshots.current(),
            server_commands.sequence,
            cl.client_num,
        ],
    );
    if vm.is_aborted() {
        console.error("cgame init aborted\n");
        return false;
    }
    *cgame_vm = Some(vm);
    cl.state = ConnState::Active;
    true
}

/// One presentation frame: build this frame's user command, then let
/// the module read snapshots and submit the scene. Returns the command
/// so the loopback can hand it to the authoritative side.
#[allow(clippy::too_many_arguments)]
pub fn cl_frame(
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
    cgame_vm: &mut Option<Vm>,
) -> Option<UserCmd> {
    if cl.state != ConnState::Active {
        return None;
    }
    let mut vm = match cgame_vm.take() {
        Some(vm) => vm,
        None => return None,
    };

    // stay in step with the newest authoritative tick
    cl.server_time = snapshots.current_server_time();
    let cmd = cl_create_cmd(cl);

    cgame_call(
        &mut vm,
        cl,
        cm,
        cvars,
        cmds,
        console,
        fs,
        clock,
        renderer,
        audio,
        input,
        snapshots,
        server_commands,
        configstrings,
        &[CG_DRAW_ACTIVE_FRAME, cl.server_time, 0, 0],
    );

    if vm.is_aborted() {
        console.error("cgame VM fault; disconnecting\n");
        cl.disconnect();
        return None;
    }
    *cgame_vm = Some(vm);
    Some(cmd)
}

/// Drop the presentation module and return to the disconnected state.
pub fn cl_shutdown_cgame(cl: &mut ClientContext, cgame_vm: &mut Option<Vm>) {
    // the module gets no farewell call if it already faulted
    *cgame_vm = None;
    cl.disconnect();
}

/// Load the menu module.
#[allow(clippy::too_many_arguments)]
pub fn cl_init_ui(
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
    ui_vm: &mut Option<Vm>,
) -> bool {
    let image = match fs.load("vm/ui.qvm") {
        Some(data) => data,
        None => {
            console.warn("Couldn't load vm/ui.qvm; menus disabled\n");
            return false;
        }
    };
    let mut vm = match Vm::load("vm/ui.qvm", &image) {
        Ok(vm) => vm,
        Err(e) => {
            console.error(&format!("{}\n", e));
            return false;
        }
    };

    ui_call(
        &mut vm, cl, cvars, cmds, console, fs, clock, renderer, audio, input, configstrings,
        &[UI_INIT],
    );
    if vm.is_aborted() {
        console.error("ui init aborted; menus disabled\n");
        return false;
    }
    ui_call(
        &mut vm, cl, cvars, cmds, console, fs, clock, renderer, audio, input, configstrings,
        &[UI_SET_ACTIVE_MENU, UIMENU_MAIN],
    );
    *ui_vm = Some(vm);
    true
}

/// Refresh the menu when no level is being drawn.
#[allow(clippy::too_many_arguments)]
pub fn cl_ui_refresh(
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
    ui_vm: &mut Option<Vm>,
) {
    let mut vm = match ui_vm.take() {
        Some(vm) => vm,
        None => return,
    };
    let now = clock.milliseconds();
    ui_call(
        &mut vm, cl, cvars, cmds, console, fs, clock, renderer, audio, input, configstrings,
        &[UI_REFRESH, now],
    );
    if vm.is_aborted() {
        console.error("ui VM fault; menus disabled\n");
        return;
    }
    *ui_vm = Some(vm);
}

pub fn cl_shutdown_ui(ui_vm: &mut Option<Vm>) {
    *ui_vm = None;
}

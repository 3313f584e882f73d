// client.rs — presentation-side state

use crate::cl_input::InputState;
use myq3_common::net_chan::ReliableRing;
use myq3_common::q_shared::{UserCmd, Vec3};

/// Input commands kept for prediction replay.
pub const CMD_BACKUP: usize = 64;

// key catcher bits, shared with the modules
pub const KEYCATCH_CONSOLE: i32 = 0x0001;
pub const KEYCATCH_UI: i32 = 0x0002;
pub const KEYCATCH_MESSAGE: i32 = 0x0004;
pub const KEYCATCH_CGAME: i32 = 0x0008;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connected,
    Active,
}

pub struct ClientContext {
    pub state: ConnState,
    pub client_num: i32,

    /// the client's estimate of the authoritative time, taken from the
    /// newest snapshot each frame
    pub server_time: i32,

    pub view_angles: Vec3,
    pub input: InputState,

    /// created commands, ring-indexed by cmd_number
    pub cmds: [UserCmd; CMD_BACKUP],
    pub cmd_number: i32,

    /// client → server reliable commands
    pub out_commands: ReliableRing,
    /// how far the server side has drained out_commands
    pub out_commands_acked: i32,
    /// highest server → client command this client has consumed
    pub server_command_ack: i32,

    pub key_catcher: i32,
    /// weapon selection the presentation layer stamps on new commands
    pub usercmd_value: i32,
}

impl ClientContext {
    pub fn new() -> Self {
        Self {
            state: ConnState::Disconnected,
            client_num: 0,
            server_time: 0,
            view_angles: [0.0; 3],
            input: InputState::default(),
            cmds: [UserCmd::default(); CMD_BACKUP],
            cmd_number: 0,
            out_commands: ReliableRing::new(),
            out_commands_acked: 0,
            server_command_ack: 0,
            key_catcher: 0,
            usercmd_value: 0,
        }
    }

    pub fn cmd(&self, number: i32) -> &UserCmd {
        &self.cmds[(number as usize) & (CMD_BACKUP - 1)]
    }

    pub fn store_cmd(&mut self, cmd: UserCmd) -> i32 {
        self.cmd_number += 1;
        self.cmds[(self.cmd_number as usize) & (CMD_BACKUP - 1)] = cmd;
        self.cmd_number
    }

    pub fn disconnect(&mut self) {
        self.state = ConnState::Disconnected;
        self.server_time = 0;
        self.cmd_number = 0;
        self.cmds = [UserCmd::default(); CMD_BACKUP];
        self.out_commands.clear();
        self.out_commands_acked = 0;
        self.server_command_ack = 0;
    }
}

impl Default for ClientContext {
    fn default() -> Self {
        Self::new()
    }
}

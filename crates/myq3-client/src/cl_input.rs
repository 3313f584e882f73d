// cl_input.rs — turning held buttons into user commands
//
// `+button` / `-button` console commands flip the held state; once per
// render frame the held state is folded into a user command stamped
// with the client's server-time estimate.

use crate::client::ClientContext;
use myq3_common::q_shared::{angle2short, UserCmd, BUTTON_ATTACK, PITCH, ROLL, YAW};

#[derive(Debug, Default, Clone, Copy)]
pub struct InputState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub attack: bool,
}

impl InputState {
    /// Route a `+x` / `-x` command. Returns false for commands that are
    /// not button state changes.
    pub fn button_command(&mut self, name: &str) -> bool {
        let (button, down) = match name.split_at(1) {
            ("+", rest) => (rest, true),
            ("-", rest) => (rest, false),
            _ => return false,
        };
        match button {
            "forward" => self.forward = down,
            "back" => self.back = down,
            "moveleft" => self.left = down,
            "moveright" => self.right = down,
            "moveup" => self.up = down,
            "movedown" => self.down = down,
            "attack" => self.attack = down,
            _ => return false,
        }
        true
    }
}

fn axis(pos: bool, neg: bool) -> i8 {
    match (pos, neg) {
        (true, false) => 127,
        (false, true) => -127,
        _ => 0,
    }
}

/// Build this frame's user command from held buttons and view angles.
pub fn cl_create_cmd(cl: &mut ClientContext) -> UserCmd {
    let input = cl.input;
    let cmd = UserCmd {
        server_time: cl.server_time,
        angles: [
            angle2short(cl.view_angles[PITCH]),
            angle2short(cl.view_angles[YAW]),
            angle2short(cl.view_angles[ROLL]),
        ],
        buttons: if input.attack { BUTTON_ATTACK } else { 0 },
        weapon: cl.usercmd_value as u8,
        forwardmove: axis(input.forward, input.back),
        rightmove: axis(input.right, input.left),
        upmove: axis(input.up, input.down),
    };
    cl.store_cmd(cmd);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_commands() {
        let mut input = InputState::default();
        assert!(input.button_command("+forward"));
        assert!(input.forward);
        assert!(input.button_command("-forward"));
        assert!(!input.forward);
        assert!(!input.button_command("echo"));
        assert!(!input.button_command("+unknown"));
    }

    #[test]
    fn test_create_cmd_reflects_buttons() {
        let mut cl = ClientContext::new();
        cl.server_time = 850;
        cl.view_angles = [0.0, 90.0, 0.0];
        cl.input.button_command("+forward");
        cl.input.button_command("+attack");
        cl.usercmd_value = 3;

        let cmd = cl_create_cmd(&mut cl);
        assert_eq!(cmd.server_time, 850);
        assert_eq!(cmd.forwardmove, 127);
        assert_eq!(cmd.rightmove, 0);
        assert_eq!(cmd.buttons, BUTTON_ATTACK);
        assert_eq!(cmd.weapon, 3);
        assert_eq!(cmd.angles[YAW], angle2short(90.0));
        assert_eq!(cl.cmd_number, 1);
        assert_eq!(*cl.cmd(1), cmd);
    }

    #[test]
    fn test_opposed_buttons_cancel() {
        let mut cl = ClientContext::new();
        cl.input.button_command("+forward");
        cl.input.button_command("+back");
        let cmd = cl_create_cmd(&mut cl);
        assert_eq!(cmd.forwardmove, 0);
    }
}

#![allow(dead_code)]
#![allow(clippy::needless_return, clippy::too_many_arguments, clippy::collapsible_if,
         clippy::manual_range_contains, clippy::needless_range_loop, clippy::identity_op,
         clippy::float_cmp)]

pub mod server;
pub mod sv_world;
pub mod sv_game;
pub mod sv_snapshot;
pub mod sv_init;
pub mod sv_main;
pub mod sv_ccmds;

#![allow(dead_code)]
#![allow(clippy::needless_return, clippy::too_many_arguments, clippy::collapsible_if,
         clippy::collapsible_else_if, clippy::manual_range_contains, clippy::single_match,
         clippy::identity_op, clippy::float_cmp, clippy::needless_range_loop,
         clippy::comparison_chain)]

pub mod q_shared;
pub mod qfiles;
pub mod md4;
pub mod engine_api;
pub mod cvar;
pub mod cmd;
pub mod cmodel;
pub mod bg_pmove;
pub mod net_chan;

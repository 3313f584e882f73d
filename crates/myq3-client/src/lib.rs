#![allow(dead_code)]
#![allow(clippy::needless_return, clippy::too_many_arguments, clippy::collapsible_if,
         clippy::manual_range_contains, clippy::needless_range_loop, clippy::identity_op,
         clippy::float_cmp)]

pub mod client;
pub mod cl_input;
pub mod cl_cgame;
pub mod cl_ui;
pub mod cl_main;

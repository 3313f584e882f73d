#![allow(dead_code)]
#![allow(clippy::needless_return, clippy::too_many_arguments, clippy::manual_range_contains,
         clippy::needless_range_loop, clippy::identity_op)]

pub mod qvm;
pub mod interp;
pub mod vm;
pub mod syscalls;
pub mod layout;

pub use vm::{Syscalls, Vm, VmMemory};

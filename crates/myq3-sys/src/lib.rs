#![allow(dead_code)]
#![allow(clippy::needless_return, clippy::too_many_arguments, clippy::collapsible_if,
         clippy::manual_range_contains, clippy::field_reassign_with_default)]

pub mod caps;
pub mod engine;

//! critter-core — Pure types, personas and reply selection.
//!
//! No async runtime, no I/O, no platform dependencies.

pub mod persona;
pub mod reply;
pub mod session;
pub mod status;
pub mod terms;
pub mod text_prep;
pub mod types;

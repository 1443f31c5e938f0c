//! Repair Loop
//!
//! Bounded prompt → LLM → extract → validate cycle, driven as an explicit state machine.

pub mod controller;
pub mod state;

pub use controller::RepairLoop;
pub use state::LoopState;

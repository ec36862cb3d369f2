//! Face photo → cartoon likeness → illustrated template.
//!
//! Each bounded context keeps its traits and value types in `domain` and
//! its concrete engines in `infrastructure`; `pipeline` wires them into the
//! personalization state machine.

pub mod compositing;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod stylizing;

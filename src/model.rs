//! Core data model for rigcal.
//!
//! Partners own devices; each device carries the date its next periodic
//! inspection falls due and, optionally, a reschedule proposal. The proposal
//! is stored on every device of a due-date group rather than as its own
//! record, so the group is the unit that moves.

mod device;
mod partner;
mod proposal;

pub use device::Device;
pub use partner::Partner;
pub use proposal::{FanOut, MoveRecord, MoveStatus, Proposal, Role};

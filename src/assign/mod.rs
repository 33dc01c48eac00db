//! Upload reconciliation
//!
//! Matches parsed CSV rows (seat plans, team rosters) against the
//! in-memory entity list and turns the matches into bulk assignment
//! records.

mod join;
mod records;

pub use join::{JoinMatch, JoinOutcome, JoinSpec, UnmatchedPolicy, UploadRow, join_rows};
pub use records::{
    AssignmentColumns, ChairDeviceAssignment, SeatAssignment, chair_device_assignments,
    seat_assignments,
};

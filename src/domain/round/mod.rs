//! Round domain module.
//!
//! Mirrors the server-authoritative round lifecycle. The server owns the
//! countdown, the winning number and settlement; this module only folds
//! what the server reports into a local snapshot.
//!
//! # Lifecycle
//!
//! `NoSession -> Active -> Closed -> Active (next round)`, with a return to
//! `NoSession` whenever the connection drops.

mod outcome;
mod projection;
mod snapshot;
mod status;

pub use outcome::{ManagerStatus, OutcomeEvent, RolloverAck, RoundClosed};
pub use projection::{PickState, ProjectionChange, SessionProjection};
pub use snapshot::{Participation, SessionSnapshot, DEFAULT_ROUND_SECONDS};
pub use status::RoundStatus;

//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the round synchronization domain.

mod connection_state;
mod credential;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use connection_state::ConnectionState;
pub use credential::Credential;
pub use errors::{ClientError, ValidationError};
pub use ids::{ConnectionId, RoundId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;

pub(crate) use timestamp::deserialize_optional_lenient;

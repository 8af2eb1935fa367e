use crate::flow::FlowKind;
use thiserror::Error;

pub type FeedResult<T> = Result<T, FeedError>;

/// Setup-phase and codec errors.
///
/// Steady-state dispatch never returns these to the caller; it logs and
/// reports a [`DispatchOutcome`](crate::DispatchOutcome) instead.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Entity key {key} registered twice: {existing} and {duplicate}")]
    DuplicateEntityKey {
        key: i32,
        existing: &'static str,
        duplicate: &'static str,
    },

    #[error("Handler for {entity} already bound in {flow} flow")]
    DuplicateHandler { flow: FlowKind, entity: &'static str },

    #[error("Entity type {0} has a handler but is not in the entity registry")]
    UnregisteredEntityType(&'static str),

    #[error("Invalid feed configuration: {0}")]
    InvalidConfig(String),

    #[error("Feed cannot start from state {0}")]
    InvalidState(String),

    #[error("Distribution activation failed: {0:#}")]
    Distribution(#[source] anyhow::Error),

    #[error("Connection error: {0:#}")]
    Connection(#[source] anyhow::Error),
}

use thiserror::Error;

/// Errors raised by the command registry and the batch parser.
///
/// Instrument-reported failures are not errors here: they travel inside
/// each [`crate::proto::parser::ResultRecord`] as its return code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("request/response count mismatch: {requests} requests, {responses} responses")]
    Framing { requests: usize, responses: usize },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("unknown {kind} name: {name}")]
    UnknownEnumName { kind: &'static str, name: String },
}

//! Request/response codec for the `%R1Q` ASCII protocol.
//!
//! Requests are built from typed [`request::Request`] values, replies are
//! decoded by [`parser::parse_batch`] against the requests that produced them.

pub mod command;
pub mod parser;
pub mod request;

pub use command::{Command, EdmMode, EdmProgram};
pub use parser::{parse_batch, parse_pair, Payload, ResultRecord, ReturnCode, Value};
pub use request::{format_batch, format_request, Request};

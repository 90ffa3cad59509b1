//! Driver layer for robotic total stations speaking the `%R1Q` ASCII
//! protocol: typed request builders, a batch response parser, and the
//! serial/replay transports that carry them. GNSS receivers are read through
//! the same line transport by the NMEA collector.

pub mod angle;
pub mod error;
pub mod nmea;
pub mod port;
pub mod proto;
pub mod station;

pub use angle::{Angle, AngleUnit};
pub use error::ProtocolError;
pub use station::Station;

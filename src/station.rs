use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::port::Transport;
use crate::proto::parser::{ResultRecord, ReturnCode, parse_batch};
use crate::proto::request::{Request, format_batch};

/// A named instrument bound to the transport that reaches it.
pub struct Station<T> {
    name: String,
    transport: T,
}

impl<T: Transport> Station<T> {
    pub fn new(name: impl Into<String>, transport: T) -> Self {
        Self {
            name: name.into(),
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send the requests as one batch and decode every reply.
    pub fn execute(&mut self, reqs: &[Request]) -> Result<Vec<ResultRecord>> {
        if reqs.is_empty() {
            return Ok(Vec::new());
        }
        let batch = format_batch(reqs);
        self.execute_raw(&batch)
    }

    pub fn execute_one(&mut self, req: &Request) -> Result<ResultRecord> {
        let mut records = self.execute(std::slice::from_ref(req))?;
        records
            .pop()
            .with_context(|| format!("{}: empty reply to {}", self.name, req))
    }

    /// Send an already formatted batch. An empty batch yields no records.
    pub fn execute_raw(&mut self, batch: &str) -> Result<Vec<ResultRecord>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let replies = self
            .transport
            .send_batch(batch)
            .with_context(|| format!("{}: sending {}", self.name, batch))?;
        let records = parse_batch(batch, &replies)?;
        for rec in &records {
            match rec.code {
                ReturnCode::Ok => {}
                ReturnCode::Tolerated(code) => {
                    info!(station = %self.name, code, "accepted with tolerated warning")
                }
                ReturnCode::Instrument(code) => {
                    warn!(station = %self.name, opcode = ?rec.opcode, code, "command failed")
                }
                ReturnCode::InvalidAnswer => {
                    warn!(station = %self.name, opcode = ?rec.opcode, "invalid answer")
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::angle::{Angle, AngleUnit};
    use crate::error::ProtocolError;
    use crate::port::ReplayTransport;
    use crate::proto::parser::{Payload, Value};

    fn station(replies: &'static str) -> Station<ReplayTransport<Cursor<&'static str>>> {
        Station::new("ts-test", ReplayTransport::new(Cursor::new(replies)))
    }

    #[test]
    fn batch_of_setup_and_reading() {
        let mut st = station("%R1P,0,0:0\n%R1P,0,0:0\n%R1P,0,0:0,1.0,1.5,25.75\n");
        let recs = st
            .execute(&[
                Request::SetOri {
                    ori: Angle::new(0.0, AngleUnit::Deg),
                },
                Request::measure(),
                Request::get_measure(),
            ])
            .unwrap();
        assert_eq!(st.name(), "ts-test");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].payload, Payload::None);
        assert_eq!(recs[2].get("distance"), Some(Value::Float(25.75)));
    }

    #[test]
    fn instrument_errors_stay_in_records() {
        let mut st = station("%R1P,0,0:8704\n%R1P,0,0:0,0\n");
        let recs = st
            .execute(&[
                Request::Move {
                    hz: Angle::from_rad(1.0),
                    v: Angle::from_rad(1.5),
                    atr: true,
                },
                Request::GetAtr,
            ])
            .unwrap();
        assert_eq!(recs[0].err_code(), 8704);
        assert_eq!(recs[1].get("atrStatus"), Some(Value::Int(0)));
    }

    #[test]
    fn single_request() {
        let mut st = station("%R1P,0,0:0,2\n");
        let rec = st.execute_one(&Request::GetEdmMode).unwrap();
        assert_eq!(rec.get("edmMode"), Some(Value::Int(2)));
    }

    #[test]
    fn empty_batch_touches_nothing() {
        let mut st = station("%R1P,0,0:0,1\n");
        assert!(st.execute(&[]).unwrap().is_empty());
        assert!(st.execute_raw("").unwrap().is_empty());
        // the recorded reply is still there for the next real request
        let rec = st.execute_one(&Request::GetAtr).unwrap();
        assert_eq!(rec.get("atrStatus"), Some(Value::Int(1)));
    }

    #[test]
    fn raw_batch_with_pipe_in_reply_is_a_framing_error() {
        let mut st = station("%R1P,0,0:0|junk\n");
        let err = st.execute_raw("%R1Q,9019:").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::Framing { .. })
        ));
    }

    #[test]
    fn transport_failure_propagates() {
        let mut st = station("");
        assert!(st.execute_one(&Request::GetAtr).is_err());
    }
}

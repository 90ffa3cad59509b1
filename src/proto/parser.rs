use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::angle::Angle;
use crate::error::ProtocolError;

use super::command::Command;
use super::request::BATCH_DELIMITER;

/// Non-zero return codes after which the payload is still valid
/// (measurement accuracy could not be fully guaranteed).
pub const TOLERATED_CODES: [i32; 2] = [1283, 1284];
/// Sentinel for replies whose return code or payload cannot be read.
pub const INVALID_ANSWER: i32 = -1;

const OPCODE_FIELD: usize = 1;
const RETURN_CODE_FIELD: usize = 3;
const PAYLOAD_START: usize = 4;

/// Split a request or response line on its `:` and `,` delimiters.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split([':', ',']).map(str::trim).collect()
}

/// Classified return code of one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Ok,
    Tolerated(i32),
    Instrument(i32),
    InvalidAnswer,
}

impl ReturnCode {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ReturnCode::Ok,
            INVALID_ANSWER => ReturnCode::InvalidAnswer,
            c if TOLERATED_CODES.contains(&c) => ReturnCode::Tolerated(c),
            c => ReturnCode::Instrument(c),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ReturnCode::Ok => 0,
            ReturnCode::Tolerated(c) | ReturnCode::Instrument(c) => c,
            ReturnCode::InvalidAnswer => INVALID_ANSWER,
        }
    }

    /// Whether the payload of the reply may be decoded.
    pub fn allows_extraction(self) -> bool {
        matches!(self, ReturnCode::Ok | ReturnCode::Tolerated(_))
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Angle(Angle),
    Float(f64),
    Int(i64),
}

impl Value {
    pub fn as_angle(&self) -> Option<Angle> {
        match self {
            Value::Angle(a) => Some(*a),
            _ => None,
        }
    }

    /// Numeric view; angles come out in radians.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Angle(a) => Some(a.rad()),
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Angle(a) => write!(f, "{a}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Int(i) => write!(f, "{i}"),
        }
    }
}

/// Opcode-specific content of a reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    None,
    AngleDistance {
        hz: Angle,
        v: Angle,
        distance: f64,
    },
    Angles {
        hz: Angle,
        v: Angle,
        cross_incline: Angle,
        length_incline: Angle,
    },
    AtrStatus(i64),
    LockStatus(i64),
    AtmCorr {
        lambda: f64,
        pressure: f64,
        dry_temp: f64,
        wet_temp: f64,
    },
    RefCorr {
        status: i64,
        earth_radius: f64,
        refractive_scale: f64,
    },
    Station {
        easting: f64,
        northing: f64,
        elevation: f64,
    },
    EdmMode(i64),
    Coords {
        easting: f64,
        northing: f64,
        elevation: f64,
    },
}

impl Payload {
    /// Named view of the payload, in reply order.
    pub fn fields(&self) -> Vec<(&'static str, Value)> {
        use Value::{Angle as A, Float as F, Int as I};
        match *self {
            Payload::None => vec![],
            Payload::AngleDistance { hz, v, distance } => {
                vec![("hz", A(hz)), ("v", A(v)), ("distance", F(distance))]
            }
            Payload::Angles {
                hz,
                v,
                cross_incline,
                length_incline,
            } => vec![
                ("hz", A(hz)),
                ("v", A(v)),
                ("crossIncline", A(cross_incline)),
                ("lengthIncline", A(length_incline)),
            ],
            Payload::AtrStatus(s) => vec![("atrStatus", I(s))],
            Payload::LockStatus(s) => vec![("lockStat", I(s))],
            Payload::AtmCorr {
                lambda,
                pressure,
                dry_temp,
                wet_temp,
            } => vec![
                ("lambda", F(lambda)),
                ("pressure", F(pressure)),
                ("dryTemp", F(dry_temp)),
                ("wetTemp", F(wet_temp)),
            ],
            Payload::RefCorr {
                status,
                earth_radius,
                refractive_scale,
            } => vec![
                ("status", I(status)),
                ("earthRadius", F(earth_radius)),
                ("refractiveScale", F(refractive_scale)),
            ],
            Payload::Station {
                easting,
                northing,
                elevation,
            }
            | Payload::Coords {
                easting,
                northing,
                elevation,
            } => vec![
                ("easting", F(easting)),
                ("northing", F(northing)),
                ("elevation", F(elevation)),
            ],
            Payload::EdmMode(m) => vec![("edmMode", I(m))],
        }
    }
}

/// Decoded reply to one request of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Opcode read from the request, if it was readable.
    pub opcode: Option<u32>,
    pub code: ReturnCode,
    pub payload: Payload,
}

impl ResultRecord {
    pub fn err_code(&self) -> i32 {
        self.code.code()
    }

    pub fn command(&self) -> Option<Command> {
        self.opcode.and_then(Command::from_opcode)
    }

    /// Look a field up by name; `errCode` is always present.
    pub fn get(&self, name: &str) -> Option<Value> {
        if name == "errCode" {
            return Some(Value::Int(self.err_code() as i64));
        }
        self.payload
            .fields()
            .into_iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    pub fn fields(&self) -> Vec<(&'static str, Value)> {
        let mut out = vec![("errCode", Value::Int(self.err_code() as i64))];
        out.extend(self.payload.fields());
        out
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.fields() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Parse a `|`-joined batch of requests against the matching batch of
/// responses. Pairs are matched by position; a count mismatch fails the
/// whole batch, anything the instrument reports stays inside the records.
/// An empty batch holds no items.
pub fn parse_batch(requests: &str, responses: &str) -> Result<Vec<ResultRecord>, ProtocolError> {
    let reqs = split_batch(requests);
    let resps = split_batch(responses);
    if reqs.len() != resps.len() {
        return Err(ProtocolError::Framing {
            requests: reqs.len(),
            responses: resps.len(),
        });
    }
    Ok(reqs
        .into_iter()
        .zip(resps)
        .map(|(req, resp)| parse_pair(req, resp))
        .collect())
}

fn split_batch(batch: &str) -> Vec<&str> {
    if batch.is_empty() {
        return Vec::new();
    }
    batch.split(BATCH_DELIMITER).collect()
}

/// Decode one response in the context of the request that produced it.
pub fn parse_pair(request: &str, response: &str) -> ResultRecord {
    let opcode = split_fields(request)
        .get(OPCODE_FIELD)
        .and_then(|s| s.parse::<u32>().ok());
    let fields = split_fields(response);

    let code = match fields
        .get(RETURN_CODE_FIELD)
        .and_then(|s| s.parse::<i32>().ok())
    {
        Some(c) => ReturnCode::from_code(c),
        None => {
            warn!(request, response, "unreadable return code");
            ReturnCode::InvalidAnswer
        }
    };

    let mut record = ResultRecord {
        opcode,
        code,
        payload: Payload::None,
    };
    if !code.allows_extraction() {
        if let ReturnCode::Instrument(c) = code {
            debug!(request, code = c, "instrument reported error");
        }
        return record;
    }

    let Some(command) = opcode.and_then(Command::from_opcode) else {
        debug!(request, "no decoder for opcode, payload skipped");
        return record;
    };

    match extract(command, &fields) {
        Ok(payload) => record.payload = payload,
        Err(err) => {
            warn!(request, response, %err, "malformed payload");
            record.code = ReturnCode::InvalidAnswer;
        }
    }
    record
}

/* ---------- field extraction ---------- */

#[derive(Debug, Error)]
enum FieldError {
    #[error("missing field {0}")]
    Missing(usize),
    #[error("invalid number in field {0}: {1}")]
    BadNumber(usize, String),
}

fn extract(command: Command, fields: &[&str]) -> Result<Payload, FieldError> {
    use Command::*;
    let p = PAYLOAD_START;
    Ok(match command {
        // GETMEASURE replies end in hz, v, dist; MEASUREANGDIST replies put
        // hz, v, dist first and append a distance-mode field.
        GetMeasure => {
            let base = fields.len().saturating_sub(3).max(p);
            angle_distance(fields, base)?
        }
        MeasureAngDist => angle_distance(fields, p)?,
        GetAngles => Payload::Angles {
            hz: req_angle(fields, p)?,
            v: req_angle(fields, p + 1)?,
            cross_incline: req_angle(fields, p + 4)?,
            length_incline: req_angle(fields, p + 5)?,
        },
        GetAtr => Payload::AtrStatus(req_int(fields, p)?),
        GetLock => Payload::LockStatus(req_int(fields, p)?),
        GetAtmCorr => Payload::AtmCorr {
            lambda: req_f64(fields, p)?,
            pressure: req_f64(fields, p + 1)?,
            dry_temp: req_f64(fields, p + 2)?,
            wet_temp: req_f64(fields, p + 3)?,
        },
        GetRefCorr => Payload::RefCorr {
            status: req_int(fields, p)?,
            earth_radius: req_f64(fields, p + 1)?,
            refractive_scale: req_f64(fields, p + 2)?,
        },
        GetStation => Payload::Station {
            easting: req_f64(fields, p)?,
            northing: req_f64(fields, p + 1)?,
            elevation: req_f64(fields, p + 2)?,
        },
        GetEdmMode => Payload::EdmMode(req_int(fields, p)?),
        Coords => Payload::Coords {
            easting: req_f64(fields, p)?,
            northing: req_f64(fields, p + 1)?,
            elevation: req_f64(fields, p + 2)?,
        },
        SetAtr | SetLock | SetRcs | SetAtmCorr | SetRefCorr | SetStation | SetOri | SetEdmMode
        | Move | ChangeFace | SetSearchArea | PowerSearch | Measure => Payload::None,
    })
}

fn angle_distance(fields: &[&str], base: usize) -> Result<Payload, FieldError> {
    Ok(Payload::AngleDistance {
        hz: req_angle(fields, base)?,
        v: req_angle(fields, base + 1)?,
        distance: req_f64(fields, base + 2)?,
    })
}

fn req_str<'a>(fields: &[&'a str], i: usize) -> Result<&'a str, FieldError> {
    fields.get(i).copied().ok_or(FieldError::Missing(i))
}

fn req_f64(fields: &[&str], i: usize) -> Result<f64, FieldError> {
    let s = req_str(fields, i)?;
    s.parse::<f64>()
        .map_err(|_| FieldError::BadNumber(i, s.to_string()))
}

fn req_angle(fields: &[&str], i: usize) -> Result<Angle, FieldError> {
    req_f64(fields, i).map(Angle::from_rad)
}

fn req_int(fields: &[&str], i: usize) -> Result<i64, FieldError> {
    let s = req_str(fields, i)?;
    s.parse::<i64>()
        .map_err(|_| FieldError::BadNumber(i, s.to_string()))
}

/* ---------- tests ---------- */

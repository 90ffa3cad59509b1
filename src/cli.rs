use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use survey_link::angle::{Angle, AngleUnit};
use survey_link::port::SerialOpts;
use survey_link::proto::request::{DEFAULT_COORDS_WAIT_MS, DEFAULT_MEASURE_WAIT_MS};
use survey_link::proto::{EdmMode, EdmProgram, Request};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "survey-link",
    about = "Drive a robotic total station over its %R1Q ASCII protocol"
)]
pub struct Cli {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Take replies from a recorded file instead of the serial port
    #[arg(long)]
    pub replay: Option<PathBuf>,
    /// Unit of angles given as arguments and printed in results
    #[arg(long, default_value = "deg")]
    pub unit: AngleUnit,
    /// Log wire traffic
    #[arg(long, default_value_t = false)]
    pub debug: bool,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    fn on(self) -> bool {
        matches!(self, Switch::On)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Query or switch automatic target recognition
    Atr { state: Option<Switch> },
    /// Query or switch target lock
    Lock { state: Option<Switch> },
    /// Query or set the EDM mode (name or numeric code)
    EdmMode { mode: Option<EdmMode> },
    /// Start a distance measurement
    Measure {
        /// EDM program (name or numeric code)
        #[arg(long, default_value = "DEFAULT")]
        program: EdmProgram,
        /// Inclination mode: 0 measure, 1 calculate, 2 automatic
        #[arg(long, default_value_t = 0)]
        incl: i32,
    },
    /// Clear the last measured distance
    ClearDistance,
    /// Read angles and slope distance
    GetMeasure {
        /// Wait time in ms
        #[arg(long, default_value_t = DEFAULT_MEASURE_WAIT_MS)]
        wait: u32,
        #[arg(long, default_value_t = 0)]
        incl: i32,
    },
    /// Read target coordinates
    Coords {
        /// Wait time in ms
        #[arg(long, default_value_t = DEFAULT_COORDS_WAIT_MS)]
        wait: u32,
        #[arg(long, default_value_t = 0)]
        incl: i32,
    },
    /// Read angles and inclinations
    Angles {
        #[arg(long, default_value_t = 0)]
        incl: i32,
    },
    /// Read station coordinates
    Station,
    /// Set station coordinates
    SetStation {
        easting: f64,
        northing: f64,
        elevation: f64,
    },
    /// Set orientation of the current direction
    SetOri { ori: String },
    /// Turn the telescope to a direction
    Move {
        hz: String,
        v: String,
        /// Fine-point on the target with ATR
        #[arg(long, default_value_t = false)]
        atr: bool,
    },
    /// Change to the other face
    ChangeFace,
    /// Send a literal request batch (`|`-joined) and decode the replies
    Raw { batch: String },
    /// Decode a request/response batch pair without talking to an instrument
    Decode { requests: String, responses: String },
    /// Switch remote control on or off
    Rcs { state: Switch },
    /// Collect NMEA sentences from a GNSS receiver until the stream ends
    Nmea {
        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Cmd {
    /// Request for subcommands that map to exactly one request.
    pub fn request(&self, unit: AngleUnit) -> Result<Option<Request>> {
        let angle = |s: &str| Angle::parse(s, unit);
        Ok(Some(match self {
            Cmd::Atr { state: None } => Request::GetAtr,
            Cmd::Atr { state: Some(s) } => Request::SetAtr { on: s.on() },
            Cmd::Lock { state: None } => Request::GetLock,
            Cmd::Lock { state: Some(s) } => Request::SetLock { on: s.on() },
            Cmd::EdmMode { mode: None } => Request::GetEdmMode,
            Cmd::EdmMode { mode: Some(mode) } => Request::SetEdmMode { mode: *mode },
            Cmd::Measure { program, incl } => Request::Measure {
                program: *program,
                incl: *incl,
            },
            Cmd::ClearDistance => Request::clear_distance(),
            Cmd::GetMeasure { wait, incl } => Request::GetMeasure {
                wait_ms: *wait,
                incl: *incl,
            },
            Cmd::Coords { wait, incl } => Request::Coords {
                wait_ms: *wait,
                incl: *incl,
            },
            Cmd::Angles { incl } => Request::GetAngles { incl: *incl },
            Cmd::Station => Request::GetStation,
            Cmd::SetStation {
                easting,
                northing,
                elevation,
            } => Request::SetStation {
                easting: *easting,
                northing: *northing,
                elevation: *elevation,
            },
            Cmd::SetOri { ori } => Request::SetOri {
                ori: angle(ori.as_str())?,
            },
            Cmd::Move { hz, v, atr } => Request::Move {
                hz: angle(hz.as_str())?,
                v: angle(v.as_str())?,
                atr: *atr,
            },
            Cmd::ChangeFace => Request::ChangeFace,
            Cmd::Rcs { state } => Request::SetRcs { on: state.on() },
            Cmd::Raw { .. } | Cmd::Decode { .. } | Cmd::Nmea { .. } => return Ok(None),
        }))
    }
}

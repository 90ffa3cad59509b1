use std::fmt;

use crate::angle::Angle;

use super::command::{Command, EdmMode, EdmProgram};

/// Fixed prefix of every request line.
pub const REQUEST_PREFIX: &str = "%R1Q,";
/// Separator between requests (and responses) of one batch.
pub const BATCH_DELIMITER: &str = "|";

pub const DEFAULT_MEASURE_WAIT_MS: u32 = 12_000;
pub const DEFAULT_COORDS_WAIT_MS: u32 = 1_000;

/// One outgoing request with its typed parameters.
///
/// Inclination modes are sent as given: 0 measure, 1 calculate, 2 automatic.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    // ---- ATR / lock ----
    SetAtr {
        on: bool,
    },
    GetAtr,
    SetLock {
        on: bool,
    },
    GetLock,
    SetRcs {
        on: bool,
    },

    // ---- Corrections ----
    SetAtmCorr {
        lambda: f64,
        pressure: f64,
        dry_temp: f64,
        wet_temp: f64,
    },
    GetAtmCorr,
    SetRefCorr {
        on: bool,
        earth_radius: f64,
        refractive_scale: f64,
    },
    GetRefCorr,

    // ---- Station / orientation ----
    GetStation,
    SetStation {
        easting: f64,
        northing: f64,
        elevation: f64,
    },
    SetOri {
        ori: Angle,
    },

    // ---- EDM ----
    SetEdmMode {
        mode: EdmMode,
    },
    GetEdmMode,

    // ---- Motion ----
    Move {
        hz: Angle,
        v: Angle,
        atr: bool,
    },
    ChangeFace,
    SetSearchArea {
        center_hz: Angle,
        center_v: Angle,
        range_hz: Angle,
        range_v: Angle,
        enabled: bool,
    },
    PowerSearch,

    // ---- Measurement ----
    Measure {
        program: EdmProgram,
        incl: i32,
    },
    GetMeasure {
        wait_ms: u32,
        incl: i32,
    },
    MeasureAngDist {
        program: EdmProgram,
    },
    Coords {
        wait_ms: u32,
        incl: i32,
    },
    GetAngles {
        incl: i32,
    },
}

impl Request {
    pub fn measure() -> Self {
        Request::Measure {
            program: EdmProgram::Default,
            incl: 0,
        }
    }

    pub fn get_measure() -> Self {
        Request::GetMeasure {
            wait_ms: DEFAULT_MEASURE_WAIT_MS,
            incl: 0,
        }
    }

    pub fn coords() -> Self {
        Request::Coords {
            wait_ms: DEFAULT_COORDS_WAIT_MS,
            incl: 0,
        }
    }

    /// Clearing the distance is a measure request with the CLEAR program.
    pub fn clear_distance() -> Self {
        Request::Measure {
            program: EdmProgram::Clear,
            incl: 0,
        }
    }

    pub fn command(&self) -> Command {
        match self {
            Request::SetAtr { .. } => Command::SetAtr,
            Request::GetAtr => Command::GetAtr,
            Request::SetLock { .. } => Command::SetLock,
            Request::GetLock => Command::GetLock,
            Request::SetRcs { .. } => Command::SetRcs,
            Request::SetAtmCorr { .. } => Command::SetAtmCorr,
            Request::GetAtmCorr => Command::GetAtmCorr,
            Request::SetRefCorr { .. } => Command::SetRefCorr,
            Request::GetRefCorr => Command::GetRefCorr,
            Request::GetStation => Command::GetStation,
            Request::SetStation { .. } => Command::SetStation,
            Request::SetOri { .. } => Command::SetOri,
            Request::SetEdmMode { .. } => Command::SetEdmMode,
            Request::GetEdmMode => Command::GetEdmMode,
            Request::Move { .. } => Command::Move,
            Request::ChangeFace => Command::ChangeFace,
            Request::SetSearchArea { .. } => Command::SetSearchArea,
            Request::PowerSearch => Command::PowerSearch,
            Request::Measure { .. } => Command::Measure,
            Request::GetMeasure { .. } => Command::GetMeasure,
            Request::MeasureAngDist { .. } => Command::MeasureAngDist,
            Request::Coords { .. } => Command::Coords,
            Request::GetAngles { .. } => Command::GetAngles,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_request(self))
    }
}

/// Serialize a request to its wire line (no terminator).
pub fn format_request(req: &Request) -> String {
    use Request::*;
    let mut fields: Vec<String> = Vec::new();

    macro_rules! push {
        (int $v:expr) => {
            fields.push(($v).to_string())
        };
        (flag $v:expr) => {
            fields.push((if $v { "1" } else { "0" }).to_string())
        };
        (float $v:expr) => {
            fields.push(format!("{:.6}", $v))
        };
        (angle $v:expr) => {
            fields.push(format!("{:.6}", ($v).rad()))
        };
    }

    match req {
        GetAtr | GetLock | GetAtmCorr | GetRefCorr | GetStation | GetEdmMode | ChangeFace
        | PowerSearch => {}

        SetAtr { on } | SetLock { on } | SetRcs { on } => push!(flag *on),

        SetAtmCorr {
            lambda,
            pressure,
            dry_temp,
            wet_temp,
        } => {
            push!(float lambda);
            push!(float pressure);
            push!(float dry_temp);
            push!(float wet_temp);
        }
        SetRefCorr {
            on,
            earth_radius,
            refractive_scale,
        } => {
            push!(flag *on);
            push!(float earth_radius);
            push!(float refractive_scale);
        }
        SetStation {
            easting,
            northing,
            elevation,
        } => {
            push!(float easting);
            push!(float northing);
            push!(float elevation);
        }
        SetOri { ori } => push!(angle ori),

        SetEdmMode { mode } => push!(int mode.code()),

        Move { hz, v, atr } => {
            push!(angle hz);
            push!(angle v);
            push!(int 0);
            push!(flag *atr);
            push!(int 0);
        }
        SetSearchArea {
            center_hz,
            center_v,
            range_hz,
            range_v,
            enabled,
        } => {
            push!(angle center_hz);
            push!(angle center_v);
            push!(angle range_hz);
            push!(angle range_v);
            push!(flag *enabled);
        }

        Measure { program, incl } => {
            push!(int program.code());
            push!(int incl);
        }
        GetMeasure { wait_ms, incl } | Coords { wait_ms, incl } => {
            push!(int wait_ms);
            push!(int incl);
        }
        MeasureAngDist { program } => push!(int program.code()),
        GetAngles { incl } => push!(int incl),
    }

    format!(
        "{}{}:{}",
        REQUEST_PREFIX,
        req.command().opcode(),
        fields.join(",")
    )
}

/// Serialize several requests into one `|`-joined transmission.
pub fn format_batch(reqs: &[Request]) -> String {
    reqs.iter()
        .map(format_request)
        .collect::<Vec<_>>()
        .join(BATCH_DELIMITER)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use crate::angle::AngleUnit;
    use crate::proto::parser::split_fields;

    fn every_request() -> Vec<Request> {
        let a = Angle::new(10.0, AngleUnit::Deg);
        vec![
            Request::SetAtr { on: true },
            Request::GetAtr,
            Request::SetLock { on: false },
            Request::GetLock,
            Request::SetRcs { on: true },
            Request::SetAtmCorr {
                lambda: 0.658,
                pressure: 1013.25,
                dry_temp: 12.0,
                wet_temp: 10.0,
            },
            Request::GetAtmCorr,
            Request::SetRefCorr {
                on: true,
                earth_radius: 6_378_000.0,
                refractive_scale: 0.13,
            },
            Request::GetRefCorr,
            Request::GetStation,
            Request::SetStation {
                easting: 1.0,
                northing: 2.0,
                elevation: 3.0,
            },
            Request::SetOri { ori: a },
            Request::SetEdmMode {
                mode: EdmMode::Precise,
            },
            Request::GetEdmMode,
            Request::Move {
                hz: a,
                v: a,
                atr: true,
            },
            Request::ChangeFace,
            Request::SetSearchArea {
                center_hz: a,
                center_v: a,
                range_hz: a,
                range_v: a,
                enabled: true,
            },
            Request::PowerSearch,
            Request::measure(),
            Request::get_measure(),
            Request::MeasureAngDist {
                program: EdmProgram::Default,
            },
            Request::coords(),
            Request::GetAngles { incl: 0 },
        ]
    }

    #[test]
    fn opcode_field_round_trips() {
        let reqs = every_request();
        assert_eq!(reqs.len(), Command::ALL.len());
        for req in reqs {
            let line = format_request(&req);
            assert!(line.starts_with(REQUEST_PREFIX), "{line}");
            let fields = split_fields(&line);
            let opcode: u32 = fields[1].parse().unwrap();
            assert_eq!(opcode, req.command().opcode(), "{line}");
            assert_eq!(Command::from_opcode(opcode), Some(req.command()));
        }
    }

    #[test]
    fn move_fields_are_radians_with_fixed_precision() {
        let req = Request::Move {
            hz: Angle::from_rad(0.0),
            v: Angle::from_rad(FRAC_PI_2),
            atr: false,
        };
        let line = format_request(&req);
        assert_eq!(
            split_fields(&line)[1..],
            ["9027", "0.000000", "1.570796", "0", "0", "0"]
        );
        assert_eq!(line, "%R1Q,9027:0.000000,1.570796,0,0,0");
    }

    #[test]
    fn move_with_atr() {
        let req = Request::Move {
            hz: Angle::new(180.0, AngleUnit::Deg),
            v: Angle::new(100.0, AngleUnit::Gon),
            atr: true,
        };
        assert_eq!(format_request(&req), "%R1Q,9027:3.141593,1.570796,0,1,0");
    }

    #[test]
    fn edm_mode_by_name_or_code() {
        let by_name = Request::SetEdmMode {
            mode: "FAST".parse().unwrap(),
        };
        let by_code = Request::SetEdmMode {
            mode: EdmMode::from(2),
        };
        assert_eq!(format_request(&by_name), format_request(&by_code));
        assert_eq!(format_request(&by_name), "%R1Q,2020:2");
        let raw = Request::SetEdmMode {
            mode: EdmMode::Raw(11),
        };
        assert_eq!(format_request(&raw), "%R1Q,2020:11");
    }

    #[test]
    fn parameterless_requests_keep_trailing_colon() {
        assert_eq!(format_request(&Request::GetAtr), "%R1Q,9019:");
        assert_eq!(format_request(&Request::ChangeFace), "%R1Q,9028:");
        assert_eq!(format_request(&Request::PowerSearch), "%R1Q,9052:");
    }

    #[test]
    fn numeric_setters() {
        let atm = Request::SetAtmCorr {
            lambda: 0.658,
            pressure: 1013.25,
            dry_temp: 12.0,
            wet_temp: -1.5,
        };
        assert_eq!(
            format_request(&atm),
            "%R1Q,2028:0.658000,1013.250000,12.000000,-1.500000"
        );
        let refc = Request::SetRefCorr {
            on: true,
            earth_radius: 6_378_000.0,
            refractive_scale: 0.13,
        };
        assert_eq!(
            format_request(&refc),
            "%R1Q,2030:1,6378000.000000,0.130000"
        );
        let stn = Request::SetStation {
            easting: 650_000.5,
            northing: 240_000.25,
            elevation: 101.0,
        };
        assert_eq!(
            format_request(&stn),
            "%R1Q,2010:650000.500000,240000.250000,101.000000"
        );
        assert_eq!(
            format_request(&Request::SetAtr { on: true }),
            "%R1Q,9018:1"
        );
    }

    #[test]
    fn remote_control_switch() {
        assert_eq!(
            format_request(&Request::SetRcs { on: true }),
            "%R1Q,18009:1"
        );
        assert_eq!(
            format_request(&Request::SetRcs { on: false }),
            "%R1Q,18009:0"
        );
    }

    #[test]
    fn orientation_goes_out_in_radians() {
        let req = Request::SetOri {
            ori: Angle::new(90.0, AngleUnit::Deg),
        };
        assert_eq!(format_request(&req), "%R1Q,2113:1.570796");
    }

    #[test]
    fn measurement_defaults() {
        assert_eq!(format_request(&Request::measure()), "%R1Q,2008:1,0");
        assert_eq!(format_request(&Request::get_measure()), "%R1Q,2108:12000,0");
        assert_eq!(format_request(&Request::coords()), "%R1Q,2082:1000,0");
        assert_eq!(format_request(&Request::clear_distance()), "%R1Q,2008:3,0");
        assert_eq!(
            format_request(&Request::MeasureAngDist {
                program: "TRACKING".parse().unwrap()
            }),
            "%R1Q,17017:2"
        );
        assert_eq!(
            format_request(&Request::GetAngles { incl: 1 }),
            "%R1Q,2003:1"
        );
    }

    #[test]
    fn out_of_range_values_pass_through() {
        let req = Request::GetMeasure {
            wait_ms: 0,
            incl: 42,
        };
        assert_eq!(format_request(&req), "%R1Q,2108:0,42");
    }

    #[test]
    fn batch_is_pipe_joined() {
        let batch = format_batch(&[Request::GetAtr, Request::get_measure()]);
        assert_eq!(batch, "%R1Q,9019:|%R1Q,2108:12000,0");
        assert_eq!(format_batch(&[]), "");
    }
}

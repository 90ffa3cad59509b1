use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Every operation the driver knows, one variant per firmware opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // ---- ATR / lock ----
    SetAtr,
    GetAtr,
    SetLock,
    GetLock,
    /// Remote control switch.
    SetRcs,

    // ---- Corrections ----
    SetAtmCorr,
    GetAtmCorr,
    SetRefCorr,
    GetRefCorr,

    // ---- Station / orientation ----
    GetStation,
    SetStation,
    SetOri,

    // ---- EDM ----
    SetEdmMode,
    GetEdmMode,

    // ---- Motion ----
    Move,
    ChangeFace,
    SetSearchArea,
    PowerSearch,

    // ---- Measurement ----
    Measure,
    GetMeasure,
    MeasureAngDist,
    Coords,
    GetAngles,
}

impl Command {
    pub const ALL: [Command; 23] = [
        Command::SetAtr,
        Command::GetAtr,
        Command::SetLock,
        Command::GetLock,
        Command::SetRcs,
        Command::SetAtmCorr,
        Command::GetAtmCorr,
        Command::SetRefCorr,
        Command::GetRefCorr,
        Command::GetStation,
        Command::SetStation,
        Command::SetOri,
        Command::SetEdmMode,
        Command::GetEdmMode,
        Command::Move,
        Command::ChangeFace,
        Command::SetSearchArea,
        Command::PowerSearch,
        Command::Measure,
        Command::GetMeasure,
        Command::MeasureAngDist,
        Command::Coords,
        Command::GetAngles,
    ];

    /// Symbolic name and opcode, the single source of both.
    const fn entry(self) -> (&'static str, u32) {
        match self {
            Command::SetAtr => ("SETATR", 9018),
            Command::GetAtr => ("GETATR", 9019),
            Command::SetLock => ("SETLOCK", 18007),
            Command::GetLock => ("GETLOCK", 18008),
            Command::SetRcs => ("SETRCS", 18009),
            Command::SetAtmCorr => ("SETATMCORR", 2028),
            Command::GetAtmCorr => ("GETATMCORR", 2029),
            Command::SetRefCorr => ("SETREFCORR", 2030),
            Command::GetRefCorr => ("GETREFCORR", 2031),
            Command::GetStation => ("GETSTN", 2009),
            Command::SetStation => ("SETSTN", 2010),
            Command::SetOri => ("SETORI", 2113),
            Command::SetEdmMode => ("SETEDMMODE", 2020),
            Command::GetEdmMode => ("GETEDMMODE", 2021),
            Command::Move => ("MOVE", 9027),
            Command::ChangeFace => ("CHANGEFACE", 9028),
            Command::SetSearchArea => ("SETSEARCHAREA", 9043),
            Command::PowerSearch => ("POWERSEARCH", 9052),
            Command::Measure => ("MEASURE", 2008),
            Command::GetMeasure => ("GETMEASURE", 2108),
            Command::MeasureAngDist => ("MEASUREANGDIST", 17017),
            Command::Coords => ("COORDS", 2082),
            Command::GetAngles => ("GETANGLES", 2003),
        }
    }

    pub const fn opcode(self) -> u32 {
        self.entry().1
    }

    pub const fn name(self) -> &'static str {
        self.entry().0
    }

    /// Reverse lookup used by the parser; `None` for opcodes this driver
    /// does not decode.
    pub fn from_opcode(opcode: u32) -> Option<Command> {
        Command::ALL.into_iter().find(|cmd| cmd.opcode() == opcode)
    }

    /// Look up a symbolic command name (case-insensitive).
    pub fn lookup(name: &str) -> Result<Command, ProtocolError> {
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ProtocolError::UnknownCommand(name.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = ProtocolError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::lookup(s)
    }
}

/* ---------- enumerated parameters ---------- */

/// EDM measurement mode. Codes without a name travel as `Raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdmMode {
    Standard,
    Precise,
    Fast,
    Tracking,
    Averaging,
    FastTracking,
    Raw(i32),
}

const EDM_MODES: [(&str, i32, EdmMode); 6] = [
    ("STANDARD", 0, EdmMode::Standard),
    ("PRECISE", 1, EdmMode::Precise),
    ("FAST", 2, EdmMode::Fast),
    ("TRACKING", 3, EdmMode::Tracking),
    ("AVERAGING", 4, EdmMode::Averaging),
    ("FASTTRACKING", 5, EdmMode::FastTracking),
];

impl EdmMode {
    pub fn code(self) -> i32 {
        match self {
            EdmMode::Raw(code) => code,
            named => EDM_MODES
                .iter()
                .find(|(_, _, m)| *m == named)
                .map_or(0, |(_, code, _)| *code),
        }
    }
}

impl From<i32> for EdmMode {
    fn from(code: i32) -> Self {
        EDM_MODES
            .iter()
            .find(|(_, c, _)| *c == code)
            .map_or(EdmMode::Raw(code), |(_, _, m)| *m)
    }
}

impl FromStr for EdmMode {
    type Err = ProtocolError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s, &EDM_MODES, "EDM mode", EdmMode::from)
    }
}

/// EDM measurement program. Codes without a name travel as `Raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdmProgram {
    Stop,
    Default,
    Tracking,
    Clear,
    Raw(i32),
}

const EDM_PROGRAMS: [(&str, i32, EdmProgram); 4] = [
    ("STOP", 0, EdmProgram::Stop),
    ("DEFAULT", 1, EdmProgram::Default),
    ("TRACKING", 2, EdmProgram::Tracking),
    ("CLEAR", 3, EdmProgram::Clear),
];

impl EdmProgram {
    pub fn code(self) -> i32 {
        match self {
            EdmProgram::Raw(code) => code,
            named => EDM_PROGRAMS
                .iter()
                .find(|(_, _, p)| *p == named)
                .map_or(0, |(_, code, _)| *code),
        }
    }
}

impl From<i32> for EdmProgram {
    fn from(code: i32) -> Self {
        EDM_PROGRAMS
            .iter()
            .find(|(_, c, _)| *c == code)
            .map_or(EdmProgram::Raw(code), |(_, _, p)| *p)
    }
}

impl FromStr for EdmProgram {
    type Err = ProtocolError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s, &EDM_PROGRAMS, "EDM program", EdmProgram::from)
    }
}

// Numeric text passes through untouched, symbolic names go through the table.
fn resolve<T: Copy>(
    s: &str,
    table: &[(&str, i32, T)],
    kind: &'static str,
    from_code: fn(i32) -> T,
) -> Result<T, ProtocolError> {
    let s = s.trim();
    if let Ok(code) = s.parse::<i32>() {
        return Ok(from_code(code));
    }
    table
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(s))
        .map(|(_, _, v)| *v)
        .ok_or_else(|| ProtocolError::UnknownEnumName {
            kind,
            name: s.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_consistent() {
        let mut opcodes = std::collections::HashSet::new();
        for cmd in Command::ALL {
            assert_eq!(Command::from_opcode(cmd.opcode()), Some(cmd));
            assert_eq!(Command::lookup(cmd.name()), Ok(cmd));
            assert!(opcodes.insert(cmd.opcode()), "duplicate opcode {}", cmd.opcode());
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(Command::lookup("GETMEASURE").unwrap().opcode(), 2108);
        assert_eq!(Command::lookup("setAtr").unwrap(), Command::SetAtr);
        assert_eq!("MEASUREANGDIST".parse::<Command>().unwrap().opcode(), 17017);
        assert!(matches!(
            Command::lookup("SELFDESTRUCT"),
            Err(ProtocolError::UnknownCommand(_))
        ));
        assert_eq!(Command::from_opcode(4242), None);
        assert_eq!(Command::lookup("SETRCS").unwrap().opcode(), 18009);
    }

    #[test]
    fn edm_mode_names_and_codes() {
        assert_eq!("FAST".parse::<EdmMode>().unwrap(), EdmMode::Fast);
        assert_eq!(EdmMode::Fast.code(), 2);
        assert_eq!(EdmMode::from(2), EdmMode::Fast);
        assert_eq!("fasttracking".parse::<EdmMode>().unwrap().code(), 5);
    }

    #[test]
    fn numeric_enum_values_pass_through() {
        assert_eq!("2".parse::<EdmMode>().unwrap(), EdmMode::Fast);
        assert_eq!("77".parse::<EdmMode>().unwrap(), EdmMode::Raw(77));
        assert_eq!(EdmMode::from(-3).code(), -3);
        assert_eq!(EdmProgram::from(99).code(), 99);
    }

    #[test]
    fn unknown_enum_names() {
        assert_eq!(
            "TURBO".parse::<EdmMode>(),
            Err(ProtocolError::UnknownEnumName {
                kind: "EDM mode",
                name: "TURBO".into()
            })
        );
        assert!(matches!(
            "RESET".parse::<EdmProgram>(),
            Err(ProtocolError::UnknownEnumName { .. })
        ));
    }

    #[test]
    fn edm_program_codes() {
        assert_eq!("CLEAR".parse::<EdmProgram>().unwrap().code(), 3);
        assert_eq!(EdmProgram::Stop.code(), 0);
        assert_eq!(EdmProgram::from(1), EdmProgram::Default);
    }
}

use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AngleError {
    #[error("invalid angle for unit {unit}: {text}")]
    Invalid { unit: AngleUnit, text: String },
}

/// Units an [`Angle`] can be built from or converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUnit {
    Rad,
    Deg,
    Gon,
    /// Arc seconds.
    Sec,
    /// 6400 mils per full circle.
    Mil,
    /// Pseudo degrees, `dd.mmss` packed into one number.
    Pdeg,
    /// Text form `d-mm-ss`; as a number it behaves like [`AngleUnit::Pdeg`].
    Dms,
}

impl AngleUnit {
    fn as_str(self) -> &'static str {
        match self {
            AngleUnit::Rad => "rad",
            AngleUnit::Deg => "deg",
            AngleUnit::Gon => "gon",
            AngleUnit::Sec => "sec",
            AngleUnit::Mil => "mil",
            AngleUnit::Pdeg => "pdeg",
            AngleUnit::Dms => "dms",
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AngleUnit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rad" => Ok(AngleUnit::Rad),
            "deg" => Ok(AngleUnit::Deg),
            "gon" => Ok(AngleUnit::Gon),
            "sec" => Ok(AngleUnit::Sec),
            "mil" => Ok(AngleUnit::Mil),
            "pdeg" => Ok(AngleUnit::Pdeg),
            "dms" => Ok(AngleUnit::Dms),
            other => Err(format!("unknown angle unit: {other}")),
        }
    }
}

/// Plane angle, kept in radians.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Angle {
    rad: f64,
}

impl Angle {
    pub const fn from_rad(rad: f64) -> Self {
        Self { rad }
    }

    pub fn new(value: f64, unit: AngleUnit) -> Self {
        let rad = match unit {
            AngleUnit::Rad => value,
            AngleUnit::Deg => value.to_radians(),
            AngleUnit::Gon => value * PI / 200.0,
            AngleUnit::Sec => (value / 3600.0).to_radians(),
            AngleUnit::Mil => value * TAU / 6400.0,
            AngleUnit::Pdeg | AngleUnit::Dms => pdeg_to_deg(value).to_radians(),
        };
        Self { rad }
    }

    pub fn rad(&self) -> f64 {
        self.rad
    }

    pub fn get(&self, unit: AngleUnit) -> f64 {
        match unit {
            AngleUnit::Rad => self.rad,
            AngleUnit::Deg => self.rad.to_degrees(),
            AngleUnit::Gon => self.rad * 200.0 / PI,
            AngleUnit::Sec => self.rad.to_degrees() * 3600.0,
            AngleUnit::Mil => self.rad * 6400.0 / TAU,
            AngleUnit::Pdeg | AngleUnit::Dms => deg_to_pdeg(self.rad.to_degrees()),
        }
    }

    /// `d-mm-ss`, seconds rounded to whole arc seconds.
    pub fn to_dms(&self) -> String {
        let total = (self.rad.to_degrees().abs() * 3600.0).round() as u64;
        let sign = if self.rad < 0.0 && total > 0 { "-" } else { "" };
        format!(
            "{}{}-{:02}-{:02}",
            sign,
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }

    /// Render in the given unit for display.
    pub fn format(&self, unit: AngleUnit) -> String {
        match unit {
            AngleUnit::Dms => self.to_dms(),
            AngleUnit::Rad | AngleUnit::Deg => format!("{:.6}", self.get(unit)),
            AngleUnit::Gon => format!("{:.5}", self.get(unit)),
            AngleUnit::Sec => format!("{:.1}", self.get(unit)),
            AngleUnit::Mil => format!("{:.3}", self.get(unit)),
            AngleUnit::Pdeg => format!("{:.4}", self.get(unit)),
        }
    }

    /// Parse `text` expressed in `unit`. DMS accepts `d-mm-ss` with optional
    /// minutes/seconds and a leading sign.
    pub fn parse(text: &str, unit: AngleUnit) -> Result<Self, AngleError> {
        let invalid = || AngleError::Invalid {
            unit,
            text: text.to_string(),
        };
        let s = text.trim();
        if unit == AngleUnit::Dms {
            let (negative, body) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s),
            };
            let parts: Vec<&str> = body.split('-').collect();
            if parts.is_empty() || parts.len() > 3 {
                return Err(invalid());
            }
            let mut deg = 0.0;
            for (part, div) in parts.iter().zip([1.0, 60.0, 3600.0]) {
                let v: f64 = part.parse().map_err(|_| invalid())?;
                deg += v / div;
            }
            if negative {
                deg = -deg;
            }
            return Ok(Self::new(deg, AngleUnit::Deg));
        }
        let v: f64 = s.parse().map_err(|_| invalid())?;
        Ok(Self::new(v, unit))
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.rad)
    }
}

fn pdeg_to_deg(value: f64) -> f64 {
    let sign = value.signum();
    let v = value.abs();
    let deg = v.trunc();
    let min_sec = (v - deg) * 100.0;
    let min = (min_sec + 1e-9).trunc();
    let sec = (min_sec - min) * 100.0;
    sign * (deg + min / 60.0 + sec / 3600.0)
}

fn deg_to_pdeg(value: f64) -> f64 {
    let sign = value.signum();
    let total = value.abs() * 3600.0;
    let deg = (total / 3600.0 + 1e-12).trunc();
    let rest = total - deg * 3600.0;
    let min = (rest / 60.0 + 1e-12).trunc();
    let sec = rest - min * 60.0;
    sign * (deg + min / 100.0 + sec / 10_000.0)
}

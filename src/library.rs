// SPDX-License-Identifier: Apache-2.0

//! LUT library: area and per-pin delay for every LUT size.
//!
//! The text format has one line per LUT size:
//!
//! ```text
//! # size  area  delay...
//! 1       1.0   1.0
//! 2       1.0   1.0 1.2
//! ```
//!
//! Either one delay (used for every pin) or exactly `size` per-pin delays
//! follow the area. Sizes start at 1 and are consecutive.

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::params::MAX_LUT_SIZE;

/// Ticks per library delay unit.
pub const TIME_UNIT: u32 = 100;
/// Fixed-point units per library area unit.
pub const AREA_UNIT: u64 = 20;
/// Fixed-point units per LUT input edge.
pub const EDGE_UNIT: u64 = 50;
/// Fixed-point units per reference.
pub const REF_UNIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LutLibrary {
    /// Largest LUT size described.
    pub lut_max: usize,
    /// `areas[s]` is the area of a LUT with `s` inputs; index 0 is unused.
    pub areas: Vec<f64>,
    /// `delays[s][pin]`; index 0 is unused.
    pub delays: Vec<Vec<f64>>,
}

#[derive(Debug)]
pub enum LibraryError {
    Io(io::Error),
    Parse { line: usize, message: String },
    Empty,
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::Io(e) => write!(f, "cannot read LUT library: {}", e),
            LibraryError::Parse { line, message } => {
                write!(f, "LUT library line {}: {}", line, message)
            }
            LibraryError::Empty => write!(f, "LUT library describes no LUT sizes"),
        }
    }
}

impl std::error::Error for LibraryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LibraryError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LibraryError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl LutLibrary {
    /// Every size from 1 to `k` has area 1 and delay 1 on every pin.
    pub fn unit(k: usize) -> Self {
        let mut areas = vec![0.0];
        let mut delays = vec![Vec::new()];
        for size in 1..=k {
            areas.push(1.0);
            delays.push(vec![1.0; size]);
        }
        LutLibrary {
            lut_max: k,
            areas,
            delays,
        }
    }

    pub fn parse(text: &str) -> Result<Self, LibraryError> {
        let mut lib = LutLibrary {
            lut_max: 0,
            areas: vec![0.0],
            delays: vec![Vec::new()],
        };
        for (lineno, raw) in text.lines().enumerate() {
            let lineno = lineno + 1;
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let err = |message: String| LibraryError::Parse {
                line: lineno,
                message,
            };
            let mut toks = line.split_whitespace();
            let size_tok = toks.next().unwrap_or_default();
            let size: usize = size_tok
                .parse()
                .map_err(|e| err(format!("invalid LUT size '{}': {}", size_tok, e)))?;
            if size != lib.lut_max + 1 {
                return Err(err(format!(
                    "expected LUT size {}, got {}",
                    lib.lut_max + 1,
                    size
                )));
            }
            if size > MAX_LUT_SIZE {
                return Err(err(format!(
                    "LUT size {} exceeds the supported maximum of {}",
                    size, MAX_LUT_SIZE
                )));
            }
            let numbers: Vec<f64> = toks
                .map(|t| {
                    t.parse::<f64>()
                        .map_err(|e| err(format!("invalid number '{}': {}", t, e)))
                })
                .collect::<Result<_, _>>()?;
            if let Some(bad) = numbers.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(err(format!("negative or non-finite value {}", bad)));
            }
            if let Some(area) = numbers.first() {
                if checked_area_units(*area).is_none() {
                    return Err(err(format!("area {} is too large", area)));
                }
            }
            if let Some(bad) = numbers.iter().skip(1).find(|d| checked_ticks(**d).is_none()) {
                return Err(err(format!("delay {} is too large", bad)));
            }
            let (area, pin_delays) = match numbers.as_slice() {
                [] => return Err(err("missing area".to_string())),
                [_] => return Err(err("missing delay".to_string())),
                [area, delay] => (*area, vec![*delay; size]),
                [area, rest @ ..] if rest.len() == size => (*area, rest.to_vec()),
                [_, rest @ ..] => {
                    return Err(err(format!(
                        "expected 1 or {} delays for size {}, got {}",
                        size,
                        size,
                        rest.len()
                    )));
                }
            };
            lib.areas.push(area);
            lib.delays.push(pin_delays);
            lib.lut_max = size;
        }
        if lib.lut_max == 0 {
            return Err(LibraryError::Empty);
        }
        log::debug!("parsed LUT library with sizes 1..={}", lib.lut_max);
        Ok(lib)
    }

    pub fn from_file(path: &Path) -> Result<Self, LibraryError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn area(&self, size: usize) -> f64 {
        self.areas[size]
    }

    pub fn delay(&self, size: usize, pin: usize) -> f64 {
        self.delays[size][pin]
    }

    /// Fixed-point view of sizes `1..=k`.
    pub fn timing(&self, k: usize) -> LutTiming {
        debug_assert!(k <= self.lut_max && k <= MAX_LUT_SIZE);
        let mut t = LutTiming {
            lut_size: k,
            area: [0; MAX_LUT_SIZE + 1],
            delay: [[0; MAX_LUT_SIZE]; MAX_LUT_SIZE + 1],
        };
        for size in 1..=k {
            t.area[size] = to_area_units(self.areas[size]);
            for pin in 0..size {
                t.delay[size][pin] = to_ticks(self.delays[size][pin]);
            }
        }
        t
    }
}

/// Converts a library delay to ticks. Callers validate with `checked_ticks`
/// first; out-of-range values saturate.
pub fn to_ticks(delay: f64) -> u32 {
    (delay * TIME_UNIT as f64).round() as u32
}

pub fn to_area_units(area: f64) -> u64 {
    (area * AREA_UNIT as f64).round() as u64
}

/// `None` unless `delay` is finite, non-negative and fits in a `u32` tick
/// count.
pub fn checked_ticks(delay: f64) -> Option<u32> {
    let ticks = (delay * TIME_UNIT as f64).round();
    (ticks.is_finite() && ticks >= 0.0 && ticks <= u32::MAX as f64).then(|| ticks as u32)
}

/// `None` unless `area` is finite, non-negative and at most `u32::MAX` area
/// units, which keeps area flow sums well inside `u64`.
pub fn checked_area_units(area: f64) -> Option<u64> {
    let units = (area * AREA_UNIT as f64).round();
    (units.is_finite() && units >= 0.0 && units <= u32::MAX as f64).then(|| units as u64)
}

pub fn ticks_to_delay(ticks: u32) -> f64 {
    ticks as f64 / TIME_UNIT as f64
}

pub fn area_units_to_area(units: u64) -> f64 {
    units as f64 / AREA_UNIT as f64
}

/// Library numbers converted to ticks and area units once per mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LutTiming {
    pub lut_size: usize,
    pub area: [u64; MAX_LUT_SIZE + 1],
    pub delay: [[u32; MAX_LUT_SIZE]; MAX_LUT_SIZE + 1],
}

impl LutTiming {
    #[inline]
    pub fn pin_delay(&self, size: usize, pin: usize) -> u32 {
        self.delay[size][pin]
    }

    #[inline]
    pub fn lut_area(&self, size: usize) -> u64 {
        self.area[size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_single_and_per_pin_delays() {
        let lib = LutLibrary::parse(
            "# k area delay\n\
             1 1 1\n\
             2 2 1.0 1.5   # per pin\n\
             \n\
             3 1 2\n",
        )
        .unwrap();
        assert_eq!(lib.lut_max, 3);
        assert_eq!(lib.area(2), 2.0);
        assert_eq!(lib.delays[2], vec![1.0, 1.5]);
        assert_eq!(lib.delays[3], vec![2.0, 2.0, 2.0]);
        let t = lib.timing(3);
        assert_eq!(t.pin_delay(2, 1), 150);
        assert_eq!(t.lut_area(3), AREA_UNIT);
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let e = LutLibrary::parse("1 1 1\n3 1 1\n").unwrap_err();
        assert!(matches!(e, LibraryError::Parse { line: 2, .. }), "{}", e);
        let e = LutLibrary::parse("1 1 1\n2 1 1 1 1\n").unwrap_err();
        assert!(e.to_string().contains("expected 1 or 2 delays"), "{}", e);
        let e = LutLibrary::parse("1 -1 1\n").unwrap_err();
        assert!(matches!(e, LibraryError::Parse { line: 1, .. }));
        let e = LutLibrary::parse("1 x 1\n").unwrap_err();
        assert!(e.to_string().contains("invalid number"), "{}", e);
        assert!(matches!(LutLibrary::parse("# nothing\n"), Err(LibraryError::Empty)));
        assert!(LutLibrary::parse("1 1\n").is_err());
    }

    #[test]
    fn test_parse_rejects_values_outside_fixed_point_range() {
        let e = LutLibrary::parse("1 1 1\n2 1 1e9\n").unwrap_err();
        assert!(matches!(e, LibraryError::Parse { line: 2, .. }), "{}", e);
        assert!(e.to_string().contains("delay 1000000000 is too large"), "{}", e);
        let e = LutLibrary::parse("1 1e12 1\n").unwrap_err();
        assert!(e.to_string().contains("area"), "{}", e);
        // Largest delay that still fits.
        assert!(LutLibrary::parse("1 1 42949672\n").is_ok());
    }

    #[test]
    fn test_checked_conversions() {
        assert_eq!(checked_ticks(1.25), Some(125));
        assert_eq!(checked_ticks(-0.5), None);
        assert_eq!(checked_ticks(f64::INFINITY), None);
        assert_eq!(checked_ticks(5.0e7), None);
        assert_eq!(checked_area_units(2.0), Some(2 * AREA_UNIT));
        assert_eq!(checked_area_units(1.0e9), None);
    }

    #[test]
    fn test_unit_library_and_serde() {
        let lib = LutLibrary::unit(4);
        assert_eq!(lib.lut_max, 4);
        assert_eq!(lib.delays[4], vec![1.0; 4]);
        let json = serde_json::to_string(&lib).unwrap();
        let back: LutLibrary = serde_json::from_str(&json).unwrap();
        assert_eq!(lib, back);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lut.lib");
        std::fs::write(&path, "1 1 1\n2 1 1\n").unwrap();
        assert_eq!(LutLibrary::from_file(&path).unwrap().lut_max, 2);
        assert!(matches!(
            LutLibrary::from_file(&dir.path().join("missing.lib")),
            Err(LibraryError::Io(_))
        ));
    }
}

//! CPU and memory quantity helpers.
//!
//! Memory suffixes are binary: `K`, `M`, `G`, ... all scale by powers of 1024, whether or not
//! an `i` follows (`128M` and `128Mi` are the same amount).
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::ExplorerError;

fn cpu_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+(?:\.\d+)?|\.\d+)\s*(m|milli)?\s*$").unwrap()
    })
}

fn memory_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*([KkMGTPE]?)(i?)\s*$").unwrap()
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Cores for a CPU quantity (`"2"`, `"0.5"`, `"500m"`), rounded to 2 decimals.
#[must_use]
pub fn normalize_cpu(value: &str) -> Option<f64> {
    let caps = cpu_re().captures(value)?;
    let number: f64 = caps[1].parse().ok()?;
    let cores = if caps.get(2).is_some() { number / 1000.0 } else { number };
    Some(round2(cores))
}

/// Bytes for a memory quantity (`"512"`, `"128M"`, `"1Gi"`).
#[must_use]
pub fn normalize_memory_to_bytes(value: &str) -> Option<f64> {
    let caps = memory_re().captures(value)?;
    let number: f64 = caps[1].parse().ok()?;
    let multiplier = match &caps[2] {
        "" => 1.0,
        suffix => suffix.parse::<MemoryUnit>().ok()?.divisor(),
    };
    Some(number * multiplier)
}

/// Unit used to render memory totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryUnit {
    K,
    #[default]
    M,
    G,
    T,
    P,
    E,
}

impl MemoryUnit {
    /// Bytes per unit.
    #[must_use]
    pub fn divisor(self) -> f64 {
        let exp = match self {
            MemoryUnit::K => 1,
            MemoryUnit::M => 2,
            MemoryUnit::G => 3,
            MemoryUnit::T => 4,
            MemoryUnit::P => 5,
            MemoryUnit::E => 6,
        };
        1024f64.powi(exp)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryUnit::K => "K",
            MemoryUnit::M => "M",
            MemoryUnit::G => "G",
            MemoryUnit::T => "T",
            MemoryUnit::P => "P",
            MemoryUnit::E => "E",
        }
    }
}

impl FromStr for MemoryUnit {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches('i') {
            "K" | "k" => Ok(MemoryUnit::K),
            "M" => Ok(MemoryUnit::M),
            "G" => Ok(MemoryUnit::G),
            "T" => Ok(MemoryUnit::T),
            "P" => Ok(MemoryUnit::P),
            "E" => Ok(MemoryUnit::E),
            _ => Err(ExplorerError::Unit(s.to_string())),
        }
    }
}

impl fmt::Display for MemoryUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

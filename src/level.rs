//! level.rs
//! The six ordered severities. Numeric order is the comparison order.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Verbose = 0,
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    /// Lowercase wire name, e.g. `"warning"`.
    pub fn name(&self) -> &'static str {
        match self {
            Level::Verbose => "verbose",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    /// Single-letter short name used nowhere on the wire but handy for callers.
    pub fn short_name(&self) -> char {
        match self {
            Level::Verbose => 'V',
            Level::Debug => 'D',
            Level::Info => 'I',
            Level::Warning => 'W',
            Level::Error => 'E',
            Level::Fatal => 'F',
        }
    }

    pub fn numeric(&self) -> u8 {
        *self as u8
    }

    pub fn from_numeric(n: u8) -> Option<Level> {
        match n {
            0 => Some(Level::Verbose),
            1 => Some(Level::Debug),
            2 => Some(Level::Info),
            3 => Some(Level::Warning),
            4 => Some(Level::Error),
            5 => Some(Level::Fatal),
            _ => None,
        }
    }

    /// Parses a wire-format lowercase name, defaulting to `Info` for anything
    /// unrecognized — callers decoding foreign or future log files should never fail
    /// to parse just because of an unknown level token.
    pub fn from_name(s: &str) -> Level {
        match s {
            "verbose" => Level::Verbose,
            "debug" => Level::Debug,
            "info" => Level::Info,
            "warning" => Level::Warning,
            "error" => Level::Error,
            "fatal" => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn is_critical(&self) -> bool {
        *self >= Level::Error
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_spec() {
        assert!(Level::Verbose < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn unknown_name_defaults_to_info() {
        assert_eq!(Level::from_name("bogus"), Level::Info);
    }

    #[test]
    fn critical_is_error_and_above() {
        assert!(!Level::Warning.is_critical());
        assert!(Level::Error.is_critical());
        assert!(Level::Fatal.is_critical());
    }
}

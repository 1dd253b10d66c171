//! # Field Management System interface
//!
//! Provides the live match state: which alliance the robot is on, which mode the match is in, and
//! how much time remains in the current period.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{fmt::Display, str::FromStr, sync::Mutex, time::Instant};

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which half of the symmetric field the robot starts on.
///
/// Blue is the canonical alliance in which all field data is authored, red data is always derived
/// from it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alliance {
    Blue,
    Red,
}

/// Top level operating mode of the robot during a match.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    Disabled,
    Auto,
    Teleop,
    Test,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown alliance {0:?}, expected \"blue\" or \"red\"")]
pub struct ParseAllianceError(String);

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Source of live match state.
///
/// Values must reflect the current state of the match each time they are queried, implementors
/// must not cache them at startup.
pub trait FmsSource: Send + Sync {
    /// The robot's alliance, or `None` if the FMS hasn't reported one yet.
    fn alliance(&self) -> Option<Alliance>;

    /// The current match mode.
    fn mode(&self) -> MatchMode;

    /// Seconds remaining in the current match period, or a negative number if unknown.
    fn match_time_s(&self) -> f64;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A simulated FMS whose state is set by the simulation harness.
#[derive(Debug)]
pub struct SimFms {
    state: Mutex<SimFmsState>,
}

#[derive(Debug)]
struct SimFmsState {
    alliance: Option<Alliance>,
    mode: MatchMode,
    period_start: Option<Instant>,
    period_length_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Alliance {
    pub fn is_red(&self) -> bool {
        matches!(self, Alliance::Red)
    }

    /// The alliance on the other side of the field.
    pub fn opposite(&self) -> Self {
        match self {
            Alliance::Blue => Alliance::Red,
            Alliance::Red => Alliance::Blue,
        }
    }
}

impl Display for Alliance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alliance::Blue => write!(f, "Blue"),
            Alliance::Red => write!(f, "Red"),
        }
    }
}

impl FromStr for Alliance {
    type Err = ParseAllianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blue" => Ok(Alliance::Blue),
            "red" => Ok(Alliance::Red),
            _ => Err(ParseAllianceError(s.to_string())),
        }
    }
}

impl SimFms {
    pub fn new(alliance: Option<Alliance>) -> Self {
        Self {
            state: Mutex::new(SimFmsState {
                alliance,
                mode: MatchMode::Disabled,
                period_start: None,
                period_length_s: 0.0,
            }),
        }
    }

    pub fn set_alliance(&self, alliance: Option<Alliance>) {
        self.with_state(|s| s.alliance = alliance)
    }

    /// Begin a new match period in the given mode, with the match timer counting down from
    /// `period_length_s`.
    pub fn start_period(&self, mode: MatchMode, period_length_s: f64) {
        self.with_state(|s| {
            s.mode = mode;
            s.period_start = Some(Instant::now());
            s.period_length_s = period_length_s;
        })
    }

    /// Disable the robot and stop the match timer.
    pub fn disable(&self) {
        self.with_state(|s| {
            s.mode = MatchMode::Disabled;
            s.period_start = None;
        })
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SimFmsState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl FmsSource for SimFms {
    fn alliance(&self) -> Option<Alliance> {
        self.with_state(|s| s.alliance)
    }

    fn mode(&self) -> MatchMode {
        self.with_state(|s| s.mode)
    }

    fn match_time_s(&self) -> f64 {
        self.with_state(|s| match s.period_start {
            Some(start) => (s.period_length_s - start.elapsed().as_secs_f64()).max(0.0),
            None => -1.0,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_alliance_parse() {
        assert_eq!("blue".parse::<Alliance>().unwrap(), Alliance::Blue);
        assert_eq!("RED".parse::<Alliance>().unwrap(), Alliance::Red);
        assert!("green".parse::<Alliance>().is_err());
        assert_eq!(Alliance::Red.opposite(), Alliance::Blue);
    }

    #[test]
    fn test_sim_fms_timer() {
        let fms = SimFms::new(Some(Alliance::Red));
        assert_eq!(fms.mode(), MatchMode::Disabled);
        assert!(fms.match_time_s() < 0.0);

        fms.start_period(MatchMode::Auto, 15.0);
        assert_eq!(fms.mode(), MatchMode::Auto);
        let t = fms.match_time_s();
        assert!(t > 14.0 && t <= 15.0);

        fms.disable();
        assert!(fms.match_time_s() < 0.0);
    }
}

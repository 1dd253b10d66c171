//! # Dashboard interface
//!
//! The dashboard is a flat key/value table shared between the robot and the operator console.
//! Operators write signals into it (for example a confirm flag or a target index) and the robot
//! publishes telemetry back out through it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::HashMap, sync::Mutex};

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A value stored in the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DashValue {
    Bool(bool),
    Number(f64),
    String(String),

    /// A sequence of `[x_m, y_m, heading_rad]` poses, used for trajectory display.
    Poses(Vec<[f64; 3]>),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Access to the dashboard table.
///
/// Implementors must be safe to share between the main control cycle and the telemetry thread.
pub trait Dashboard: Send + Sync {
    /// Get the value stored under `key`, if there is one.
    fn get(&self, key: &str) -> Option<DashValue>;

    /// Publish a value under `key`, replacing any previous value.
    fn put(&self, key: &str, value: DashValue);

    /// Push any buffered values out to the operator console.
    fn flush(&self) {}

    /// Get a boolean, returning `default` if the key is missing or of another type.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(DashValue::Bool(b)) => b,
            _ => default,
        }
    }

    /// Get a number, returning `default` if the key is missing or of another type.
    fn get_number(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            Some(DashValue::Number(n)) => n,
            _ => default,
        }
    }

    /// Get a string, returning `None` if the key is missing or of another type.
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(DashValue::String(s)) => Some(s),
            _ => None,
        }
    }

    fn put_bool(&self, key: &str, value: bool) {
        self.put(key, DashValue::Bool(value))
    }

    fn put_number(&self, key: &str, value: f64) {
        self.put(key, DashValue::Number(value))
    }
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An in-process dashboard, used by the simulation executable and in tests.
///
/// Every `put` is counted per key so that publish volume can be inspected.
#[derive(Debug, Default)]
pub struct MemDashboard {
    table: Mutex<MemTable>,
}

#[derive(Debug, Default)]
struct MemTable {
    values: HashMap<String, DashValue>,
    num_puts: HashMap<String, u64>,
    num_flushes: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MemDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `key` has been published to.
    pub fn num_puts(&self, key: &str) -> u64 {
        self.with_table(|t| t.num_puts.get(key).copied().unwrap_or(0))
    }

    /// Number of times the dashboard has been flushed.
    pub fn num_flushes(&self) -> u64 {
        self.with_table(|t| t.num_flushes)
    }

    /// Write a value without counting it as a publish, as an operator would from the console.
    pub fn set_from_console(&self, key: &str, value: DashValue) {
        self.with_table(|t| {
            t.values.insert(key.to_string(), value);
        })
    }

    fn with_table<R>(&self, f: impl FnOnce(&mut MemTable) -> R) -> R {
        // A poisoned table is still a valid table, the writer can't have left a value half-set
        let mut guard = match self.table.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Dashboard for MemDashboard {
    fn get(&self, key: &str) -> Option<DashValue> {
        self.with_table(|t| t.values.get(key).cloned())
    }

    fn put(&self, key: &str, value: DashValue) {
        self.with_table(|t| {
            t.values.insert(key.to_string(), value);
            *t.num_puts.entry(key.to_string()).or_insert(0) += 1;
        })
    }

    fn flush(&self) {
        self.with_table(|t| t.num_flushes += 1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let dash = MemDashboard::new();

        assert_eq!(dash.get_bool("ConfirmedCondition", false), false);
        assert_eq!(dash.get_number("TargetReefBranch", 3.0), 3.0);

        dash.set_from_console("ConfirmedCondition", DashValue::Bool(true));
        dash.set_from_console("TargetReefBranch", DashValue::Number(7.0));

        assert!(dash.get_bool("ConfirmedCondition", false));
        assert_eq!(dash.get_number("TargetReefBranch", 0.0), 7.0);

        // Wrong type falls back to the default
        assert_eq!(dash.get_number("ConfirmedCondition", -1.0), -1.0);
    }

    #[test]
    fn test_put_counting() {
        let dash = MemDashboard::new();

        dash.set_from_console("MatchTime", DashValue::Number(15.0));
        assert_eq!(dash.num_puts("MatchTime"), 0);

        dash.put_number("MatchTime", 14.0);
        dash.put_number("MatchTime", 13.0);
        assert_eq!(dash.num_puts("MatchTime"), 2);
        assert_eq!(dash.get_number("MatchTime", 0.0), 13.0);

        dash.flush();
        assert_eq!(dash.num_flushes(), 1);
    }
}

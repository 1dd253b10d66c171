//! # Communications interface crate.
//!
//! Provides the interfaces to the collaborators outside the autonomy core which are not specific to
//! motion: the operator dashboard and the field management system.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Dashboard key/value store, used for operator signals and published telemetry
pub mod dash;

/// Field management system - alliance, match mode and match time
pub mod fms;

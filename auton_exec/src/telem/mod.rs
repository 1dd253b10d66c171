//! # Telemetry synchroniser
//!
//! Keeps the dashboard and the robot in step at a low rate, independent of the main control cycle:
//!
//! - The operator's target index is read from the dashboard and, when it changes, written into the
//!   shared [`TargetIndexCell`] and echoed back out.
//! - The remaining match time is published as a whole number of seconds, only when that number
//!   changes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};

use comms_if::{dash::Dashboard, fms::FmsSource};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::dispatch::TargetIndexCell;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct TelemSyncParams {
    /// Period of the synchroniser, independent of the control cycle.
    pub period_s: f64,

    pub target_index_key: String,
    pub target_index_echo_key: String,
    pub match_time_key: String,
}

pub struct TelemSync {
    params: TelemSyncParams,

    /// Only writer of the target index
    target_index: TargetIndexCell,

    last_index: i64,

    /// Last published match time, -1 until the first publish
    last_match_time: i64,
}

/// Runs a [`TelemSync`] on its own thread.
pub struct TelemWorker {
    stop: Arc<AtomicBool>,
    jh: Option<thread::JoinHandle<()>>,
}

/// What a single synchroniser tick published.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TelemTick {
    pub target_index: Option<i64>,
    pub match_time: Option<i64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TelemSyncParams {
    fn default() -> Self {
        Self {
            period_s: 0.2,
            target_index_key: "TargetReefBranch".into(),
            target_index_echo_key: "TargetReefBranchEcho".into(),
            match_time_key: "MatchTime".into(),
        }
    }
}

impl TelemSync {
    pub fn new(params: TelemSyncParams, target_index: TargetIndexCell) -> Self {
        let last_index = target_index.load();

        Self {
            params,
            target_index,
            last_index,
            last_match_time: -1,
        }
    }

    pub fn params(&self) -> &TelemSyncParams {
        &self.params
    }

    /// Perform one synchronisation.
    pub fn tick(&mut self, dash: &dyn Dashboard, fms: &dyn FmsSource) -> TelemTick {
        let mut published = TelemTick::default();

        // Truncation towards zero, matching the dashboard's integer display
        let index = dash.get_number(&self.params.target_index_key, 0.0) as i64;
        if index != self.last_index {
            self.target_index.store(index);
            self.last_index = index;

            dash.put_number(&self.params.target_index_echo_key, index as f64);
            info!("Target index changed to {}", index);
            published.target_index = Some(index);
        }

        let match_time = fms.match_time_s() as i64;
        if match_time != self.last_match_time {
            dash.put_number(&self.params.match_time_key, match_time as f64);
            self.last_match_time = match_time;
            published.match_time = Some(match_time);
        }

        if published != TelemTick::default() {
            dash.flush();
        }

        published
    }
}

impl TelemWorker {
    /// Start the synchroniser on a new thread.
    pub fn spawn(
        mut sync: TelemSync,
        dash: Arc<dyn Dashboard>,
        fms: Arc<dyn FmsSource>,
    ) -> io::Result<Self> {
        let period_s = sync.params().period_s;
        if !(period_s.is_finite() && period_s > 0.0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("TelemSync period must be positive, found {} s", period_s),
            ));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_thread = stop.clone();
        let period = util::time::seconds_to_std(period_s);

        let jh = thread::Builder::new()
            .name("telem_sync".into())
            .spawn(move || {
                debug!("TelemSync thread started with a period of {:?}", period);

                while !stop_thread.load(Ordering::Acquire) {
                    let start = Instant::now();

                    sync.tick(dash.as_ref(), fms.as_ref());

                    match period.checked_sub(start.elapsed()) {
                        Some(d) => thread::sleep(d),
                        None => warn!("TelemSync overran its period"),
                    }
                }

                debug!("TelemSync thread stopped");
            })?;

        Ok(Self {
            stop,
            jh: Some(jh),
        })
    }

    /// Stop the worker, waiting for the current tick to finish.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);

        if let Some(jh) = self.jh.take() {
            if jh.join().is_err() {
                warn!("TelemSync thread panicked");
            }
        }
    }
}

impl Drop for TelemWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

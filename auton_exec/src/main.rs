//! Autonomy simulation executable entry point.
//!
//! # Architecture
//!
//! The executable runs the autonomy core against simulated motion control, a simulated FMS and an
//! in-memory dashboard:
//!
//!     - Initialise the session, logging and parameters
//!     - Dry run: build the selected routine, print and save its pose trace, then exit
//!     - Otherwise:
//!         - Start the telemetry synchroniser thread
//!         - Run the autonomous period, then the teleop period, calling `RobotCtrl::cycle` on a
//!           fixed period
//!         - Save the autonomous pose trace and the motion request log

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::{
    path::PathBuf,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use auton_lib::{
    auton::{AutonParams, RobotConfig},
    dispatch::{DispatchOutcome, TargetIndexCell},
    field::{Alliance, FieldParams, Pose},
    motion::SimMotion,
    registry::AlliancePoseRegistry,
    robot_ctrl::{RobotCtrl, RobotCtrlConfig},
    segment::FileSegmentLoader,
    telem::{TelemSync, TelemSyncParams, TelemWorker},
};
use comms_if::{
    dash::{DashValue, MemDashboard},
    fms::{MatchMode, SimFms},
};
use util::{
    host,
    logger::{logger_init, LevelFilter, LoggerConfig},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle, used if the robot configuration is unavailable.
const DEFAULT_CYCLE_PERIOD_S: f64 = 0.02;

/// Speed used by the simulated drivebase if the robot configuration is unavailable.
const DEFAULT_MAX_SPEED_MS: f64 = 4.5;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "auton_exec", about = "Simulated match runner for the autonomy core")]
struct Opts {
    /// Build the routine and save its pose trace without running it
    #[structopt(long)]
    dry_run: bool,

    /// Alliance reported by the simulated FMS (blue or red)
    #[structopt(short, long, default_value = "blue")]
    alliance: Alliance,

    /// Routine to run, overriding the configured default
    #[structopt(short, long)]
    routine: Option<String>,

    /// Length of the autonomous period
    #[structopt(long, default_value = "15")]
    auto_s: f64,

    /// Length of the teleop period
    #[structopt(long, default_value = "5")]
    teleop_s: f64,

    /// Reef branch to drive to when confirmed during teleop
    #[structopt(long)]
    target: Option<u32>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("auton_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(
        LoggerConfig::new(LevelFilter::Debug)
            .strip_prefix("auton_lib")
            .with_target_level("auton_lib::telem", LevelFilter::Info),
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Autonomy Simulation Executable\n");
    debug!("CLI options: {:?}", opts);
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let field_params: FieldParams =
        util::params::load("field.toml").wrap_err("Could not load field params")?;
    let auton_params: AutonParams =
        util::params::load("auton.toml").wrap_err("Could not load autonomous params")?;
    let telem_params: TelemSyncParams =
        util::params::load("telem.toml").wrap_err("Could not load telemetry params")?;

    // The robot configuration is optional, routines which need it will refuse to build
    let robot_config: Option<RobotConfig> = match util::params::load("robot.toml") {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("Robot configuration unavailable: {}", e);
            None
        }
    };

    info!("Parameters loaded");

    // ---- INITIALISE MODULES ----

    let registry = AlliancePoseRegistry::from_params(&field_params)
        .wrap_err("Could not build the target registry")?;
    info!("Target registry holds {} targets", registry.targets().len());

    let mut segment_dir: PathBuf =
        host::get_sw_root().wrap_err("Could not find the software root")?;
    segment_dir.push(&auton_params.segment_dir);
    let loader = FileSegmentLoader::new(segment_dir);

    let max_speed_ms = robot_config
        .as_ref()
        .map_or(DEFAULT_MAX_SPEED_MS, |c| c.max_speed_ms);
    let cycle_period_s = robot_config
        .as_ref()
        .map_or(DEFAULT_CYCLE_PERIOD_S, |c| c.loop_time_s);

    let dash = Arc::new(MemDashboard::new());
    let fms = Arc::new(SimFms::new(Some(opts.alliance)));
    let target_index = TargetIndexCell::default();

    if let Some(ref r) = opts.routine {
        dash.set_from_console(&auton_params.chooser_key, DashValue::String(r.clone()));
    }

    let mut robot_ctrl = RobotCtrl::new(
        RobotCtrlConfig {
            auton: auton_params.clone(),
            robot: robot_config,
            simulation: true,
        },
        registry,
        Box::new(loader),
        SimMotion::new(max_speed_ms),
        dash.clone(),
        fms.clone(),
        target_index.clone(),
    );

    info!("Module initialisation complete\n");

    // ---- DRY RUN ----

    if opts.dry_run {
        let routine = robot_ctrl.selected_routine();
        let program = robot_ctrl
            .preflight(&routine, opts.alliance)
            .wrap_err_with(|| format!("Routine {:?} failed preflight", routine))?;

        let start = program
            .starting_pose()
            .map_err(|e| eyre!("Routine {:?} has no start pose: {}", routine, e))?;
        info!("Routine {:?} starts at {}", routine, start);

        let trace: Vec<Pose> = program
            .pose_trace_for(opts.alliance, robot_ctrl.registry().field())
            .collect();
        for (i, p) in trace.iter().enumerate() {
            println!("{:>4}  {}", i, p);
        }

        session.save("auto_trace.json", trace);
        session.exit();
        return Ok(());
    }

    // ---- TELEMETRY ----

    let mut telem_worker = TelemWorker::spawn(
        TelemSync::new(telem_params.clone(), target_index),
        dash.clone(),
        fms.clone(),
    )
    .wrap_err("Failed to start the telemetry thread")?;

    if let Some(t) = opts.target {
        dash.set_from_console(
            &telem_params.target_index_key,
            DashValue::Number(t as f64),
        );
    }

    // ---- MATCH ----

    info!("Begining simulated match\n");

    fms.start_period(MatchMode::Auto, opts.auto_s);
    run_period(&mut robot_ctrl, opts.auto_s, cycle_period_s, |_| ());

    // Confirm the target shortly into teleop, giving the telemetry thread time to pick up the index
    let confirm_key = auton_params.confirm_key.clone();
    let confirm_after_s = 2.0 * telem_params.period_s;
    fms.start_period(MatchMode::Teleop, opts.teleop_s);
    run_period(&mut robot_ctrl, opts.teleop_s, cycle_period_s, |elapsed_s| {
        if opts.target.is_some() {
            dash.set_from_console(&confirm_key, DashValue::Bool(elapsed_s >= confirm_after_s));
        }
    });

    fms.disable();
    robot_ctrl.cycle();

    // ---- SHUTDOWN ----

    telem_worker.stop();

    session.save("auto_trace.json", robot_ctrl.auto_trace().to_vec());
    session.save("motion_calls.json", robot_ctrl.motion().calls().to_vec());

    info!("End of execution");

    session.exit();

    Ok(())
}

/// Run control cycles for the given period length.
///
/// `pre_cycle` is called at the start of each cycle with the number of seconds since the period
/// began.
fn run_period<F: FnMut(f64)>(
    robot_ctrl: &mut RobotCtrl<SimMotion>,
    length_s: f64,
    cycle_period_s: f64,
    mut pre_cycle: F,
) {
    let period_start = Instant::now();
    let cycle_period = Duration::from_secs_f64(cycle_period_s.max(0.001));

    while period_start.elapsed().as_secs_f64() < length_s {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        pre_cycle(period_start.elapsed().as_secs_f64());

        let report = robot_ctrl.cycle();
        if report.dispatch != DispatchOutcome::Idle {
            debug!("Dispatch outcome: {:?}", report.dispatch);
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }
    }
}

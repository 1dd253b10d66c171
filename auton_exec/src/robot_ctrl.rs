//! # Robot control
//!
//! Top level mode management. [`RobotCtrl::cycle`] is called once per scheduler tick and:
//!
//! 1. Detects match mode transitions reported by the FMS. Entering autonomous builds the selected
//!    routine for the current alliance and starts it, any other transition cancels the running
//!    program.
//! 2. Advances the running program, if there is one.
//! 3. Feeds the operator's confirm signal to the reactive dispatcher, which is only allowed to
//!    drive in teleop and test.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::{
    dash::{DashValue, Dashboard},
    fms::{FmsSource, MatchMode},
};
use log::{debug, error, info, warn};

use crate::{
    auton::{
        AutonParams, BuildError, CancelToken, Program, ProgramBuilder, ProgramRunner, RobotConfig,
        RunnerStatus,
    },
    dispatch::{DispatchOutcome, Dispatcher, TargetIndexCell},
    field::{Alliance, Pose},
    motion::MotionCtrl,
    registry::AlliancePoseRegistry,
    segment::SegmentLoader,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Static configuration of the robot controller.
#[derive(Debug, Clone)]
pub struct RobotCtrlConfig {
    pub auton: AutonParams,

    /// Physical configuration, needed to build routines which reset the position estimate.
    pub robot: Option<RobotConfig>,

    /// True when running against simulated motion.
    pub simulation: bool,
}

pub struct RobotCtrl<M: MotionCtrl> {
    config: RobotCtrlConfig,

    registry: AlliancePoseRegistry,
    loader: Box<dyn SegmentLoader>,
    motion: M,

    dash: Arc<dyn Dashboard>,
    fms: Arc<dyn FmsSource>,

    /// Mode seen on the previous cycle
    mode: MatchMode,

    runner: Option<ProgramRunner<M::Handle>>,

    dispatcher: Dispatcher<M::Handle>,

    /// Alliance-adjusted pose trace of the last program started
    auto_trace: Vec<Pose>,
}

/// Summary of one control cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub mode: MatchMode,

    /// Status of the autonomous program, if one was running at the start of the cycle
    pub program: Option<RunnerStatus>,

    pub dispatch: DispatchOutcome,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RobotCtrlError {
    #[error("No autonomous routine named {0:?}")]
    UnknownRoutine(String),

    #[error("Could not build autonomous routine {routine:?}: {cause}")]
    Build {
        routine: String,
        #[source]
        cause: BuildError,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<M: MotionCtrl> RobotCtrl<M> {
    pub fn new(
        config: RobotCtrlConfig,
        registry: AlliancePoseRegistry,
        loader: Box<dyn SegmentLoader>,
        motion: M,
        dash: Arc<dyn Dashboard>,
        fms: Arc<dyn FmsSource>,
        target_index: TargetIndexCell,
    ) -> Self {
        let dispatcher = Dispatcher::new(&config.auton.dispatch_group, target_index);

        Self {
            config,
            registry,
            loader,
            motion,
            dash,
            fms,
            mode: MatchMode::Disabled,
            runner: None,
            dispatcher,
            auto_trace: Vec::new(),
        }
    }

    pub fn motion(&self) -> &M {
        &self.motion
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn registry(&self) -> &AlliancePoseRegistry {
        &self.registry
    }

    /// Pose trace of the most recently started autonomous program, in its alliance's frame.
    pub fn auto_trace(&self) -> &[Pose] {
        &self.auto_trace
    }

    /// Token cancelling the running autonomous program, if there is one.
    pub fn auto_cancel_token(&self) -> Option<CancelToken> {
        self.runner.as_ref().map(|r| r.cancel_token())
    }

    /// Name of the routine selected on the dashboard, or the default routine if none is.
    pub fn selected_routine(&self) -> String {
        self.dash
            .get_string(&self.config.auton.chooser_key)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.config.auton.default_routine.clone())
    }

    /// Build the named routine for the given alliance without running it.
    pub fn preflight(&self, routine: &str, alliance: Alliance) -> Result<Program, RobotCtrlError> {
        let params = self
            .config
            .auton
            .routine(routine)
            .ok_or_else(|| RobotCtrlError::UnknownRoutine(routine.to_string()))?;

        let reset_first = params.reset.reset_first(self.config.simulation);

        let program = ProgramBuilder::new(self.loader.as_ref(), self.config.robot.as_ref())
            .build(params.segments.as_slice(), reset_first, params.start_heading())
            .map_err(|cause| RobotCtrlError::Build {
                routine: routine.to_string(),
                cause,
            })?;

        Ok(program.into_alliance(alliance, self.registry.field()))
    }

    /// Execute one control cycle.
    pub fn cycle(&mut self) -> CycleReport {
        let mode = self.fms.mode();
        if mode != self.mode {
            self.mode_transition(self.mode, mode);
            self.mode = mode;
        }

        // ---- AUTONOMOUS PROGRAM ----

        let program = match self.runner.as_mut() {
            Some(runner) => Some(runner.tick(&mut self.motion)),
            None => None,
        };

        if let Some(status) = program {
            if status != RunnerStatus::Running {
                info!("Autonomous program ended: {:?}", status);
                self.runner = None;
            }
        }

        // ---- REACTIVE DISPATCH ----

        let signal = self.dash.get_bool(&self.config.auton.confirm_key, false);
        let enabled = matches!(mode, MatchMode::Teleop | MatchMode::Test);
        let alliance = self.alliance();
        let dispatch = self.dispatcher.tick(
            signal,
            enabled,
            alliance,
            &self.registry,
            &mut self.motion,
        );

        CycleReport {
            mode,
            program,
            dispatch,
        }
    }

    fn mode_transition(&mut self, from: MatchMode, to: MatchMode) {
        info!("Mode transition {:?} -> {:?}", from, to);

        // Anything in progress belongs to the old mode
        if let Some(ref runner) = self.runner {
            info!("Cancelling autonomous program");
            runner.cancel_token().cancel();
        }
        self.dispatcher.cancel();

        if to == MatchMode::Auto {
            if let Err(e) = self.enter_auto() {
                error!("Refusing to enter autonomous: {}", e);
            }
        }
    }

    fn enter_auto(&mut self) -> Result<(), RobotCtrlError> {
        // Alliance is fixed for the whole program once resolved here
        let alliance = match self.fms.alliance() {
            Some(a) => a,
            None => {
                warn!("No alliance reported by the FMS, assuming Blue");
                Alliance::Blue
            }
        };

        let routine = self.selected_routine();
        info!("Starting autonomous routine {:?} ({} alliance)", routine, alliance);

        let program = match self.preflight(&routine, alliance) {
            Ok(p) => p,
            Err(e) => {
                // Don't leave the previous routine's path on display
                self.publish_trace(Vec::new());
                return Err(e);
            }
        };

        // Segments are stored in the blue frame, the dashboard shows what the robot will drive
        let trace = program
            .pose_trace_for(alliance, self.registry.field())
            .collect();
        if let Ok(start) = program.starting_pose() {
            debug!("Autonomous start pose: {}", start);
        }
        self.publish_trace(trace);

        // A previous runner may still be waiting to consume its cancellation
        if let Some(mut old) = self.runner.take() {
            old.tick(&mut self.motion);
        }
        self.runner = Some(ProgramRunner::new(program));

        Ok(())
    }

    fn publish_trace(&mut self, trace: Vec<Pose>) {
        self.auto_trace = trace;
        self.dash.put(
            &self.config.auton.trace_key,
            DashValue::Poses(self.auto_trace.iter().map(|p| p.to_array()).collect()),
        );
    }

    fn alliance(&self) -> Alliance {
        self.fms.alliance().unwrap_or(Alliance::Blue)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        auton::{ResetPolicy, RoutineParams},
        field::{Angle, Field},
        motion::mock::{Call, RecordingMotion},
        registry::NamedTarget,
        segment::MemSegmentLoader,
    };
    use comms_if::{dash::MemDashboard, fms::SimFms};

    struct Harness {
        ctrl: RobotCtrl<RecordingMotion>,
        dash: Arc<MemDashboard>,
        fms: Arc<SimFms>,
        target_index: TargetIndexCell,
    }

    fn auton_params() -> AutonParams {
        AutonParams {
            segment_dir: "paths".into(),
            default_routine: "Example".into(),
            chooser_key: "Auto Chooser".into(),
            trace_key: "AutonTrace".into(),
            dispatch_group: "reef".into(),
            confirm_key: "ConfirmedCondition".into(),
            routines: vec![
                RoutineParams {
                    name: "Example".into(),
                    segments: vec!["A".into(), "B".into()],
                    reset: ResetPolicy::SimulationOnly,
                    start_heading_deg: 180.0,
                },
                RoutineParams {
                    name: "Broken".into(),
                    segments: vec!["A".into(), "missing".into()],
                    reset: ResetPolicy::Never,
                    start_heading_deg: 0.0,
                },
            ],
        }
    }

    fn harness(alliance: Option<Alliance>) -> Harness {
        let loader = MemSegmentLoader::new()
            .with(
                "A",
                vec![
                    Pose::new(7.2, 6.0, Angle::from_deg(180.0)),
                    Pose::new(6.0, 6.2, Angle::from_deg(170.0)),
                ],
            )
            .with("B", vec![Pose::new(5.1, 5.5, Angle::from_deg(-120.0))]);

        let registry = AlliancePoseRegistry::new(
            Field::default(),
            vec![NamedTarget::new(
                "reef",
                0,
                Pose::new(3.0, 4.2, Angle::from_deg(0.0)),
            )],
        )
        .unwrap();

        let config = RobotCtrlConfig {
            auton: auton_params(),
            robot: Some(RobotConfig {
                mass_kg: 52.0,
                max_speed_ms: 4.5,
                loop_time_s: 0.02,
            }),
            simulation: true,
        };

        let dash = Arc::new(MemDashboard::new());
        let fms = Arc::new(SimFms::new(alliance));
        let target_index = TargetIndexCell::new(0);

        let ctrl = RobotCtrl::new(
            config,
            registry,
            Box::new(loader),
            RecordingMotion::new(),
            dash.clone(),
            fms.clone(),
            target_index.clone(),
        );

        Harness {
            ctrl,
            dash,
            fms,
            target_index,
        }
    }

    #[test]
    fn test_auto_entry_red() {
        let mut h = harness(Some(Alliance::Red));
        let field = Field::default();

        h.ctrl.cycle();
        assert!(h.ctrl.motion().calls.is_empty());

        h.fms.start_period(MatchMode::Auto, 15.0);
        let report = h.ctrl.cycle();
        assert_eq!(report.mode, MatchMode::Auto);
        assert_eq!(report.program, Some(RunnerStatus::Running));

        // Reset pose is mirrored, segments are passed through untouched
        let expected_reset =
            field.mirror_pose(Pose::new(7.2, 6.0, Angle::from_deg(180.0)));
        let calls = &h.ctrl.motion().calls;
        assert_eq!(calls.len(), 2);
        match calls[0] {
            Call::Reset(p) => assert!(p.approx_eq(&expected_reset, 1e-9, 1e-9)),
            ref c => panic!("Expected a reset, got {:?}", c),
        }
        assert_eq!(calls[1], Call::Follow("A".into()));

        // Trace published in the red frame
        match h.dash.get("AutonTrace") {
            Some(DashValue::Poses(poses)) => {
                assert_eq!(poses.len(), 3);
                assert!((poses[0][0] - (field.length_m - 7.2)).abs() < 1e-9);
            }
            v => panic!("Expected a pose trace, got {:?}", v),
        }
        assert_eq!(h.ctrl.auto_trace().len(), 3);

        // Finish both segments
        h.ctrl.motion.finish(0);
        h.ctrl.cycle();
        h.ctrl.motion.finish(1);
        let report = h.ctrl.cycle();
        assert_eq!(report.program, Some(RunnerStatus::Finished));
        assert_eq!(h.ctrl.cycle().program, None);
    }

    #[test]
    fn test_routine_selection() {
        let h = harness(Some(Alliance::Blue));
        assert_eq!(h.ctrl.selected_routine(), "Example");

        h.dash
            .set_from_console("Auto Chooser", DashValue::String("Broken".into()));
        assert_eq!(h.ctrl.selected_routine(), "Broken");

        assert!(matches!(
            h.ctrl.preflight("Nope", Alliance::Blue),
            Err(RobotCtrlError::UnknownRoutine(_))
        ));
        assert!(matches!(
            h.ctrl.preflight("Broken", Alliance::Blue),
            Err(RobotCtrlError::Build {
                cause: BuildError::SegmentLoad { index: 1, .. },
                ..
            })
        ));

        let program = h.ctrl.preflight("Example", Alliance::Blue).unwrap();
        assert_eq!(program.steps().len(), 3);
    }

    #[test]
    fn test_auto_refused_on_build_error() {
        let mut h = harness(Some(Alliance::Blue));
        h.dash
            .set_from_console("Auto Chooser", DashValue::String("Broken".into()));

        h.fms.start_period(MatchMode::Auto, 15.0);
        let report = h.ctrl.cycle();

        // A refused build must not reach motion control at all
        assert_eq!(report.program, None);
        assert!(h.ctrl.auto_cancel_token().is_none());
        assert!(h.ctrl.motion().calls.is_empty());
    }

    #[test]
    fn test_refused_auto_clears_trace() {
        let mut h = harness(Some(Alliance::Blue));

        h.fms.start_period(MatchMode::Auto, 15.0);
        h.ctrl.cycle();
        assert_eq!(h.ctrl.auto_trace().len(), 3);

        h.fms.disable();
        h.ctrl.cycle();

        h.dash
            .set_from_console("Auto Chooser", DashValue::String("Broken".into()));
        h.fms.start_period(MatchMode::Auto, 15.0);
        let report = h.ctrl.cycle();

        assert_eq!(report.program, None);
        assert!(h.ctrl.auto_trace().is_empty());
        assert_eq!(h.dash.get("AutonTrace"), Some(DashValue::Poses(vec![])));
    }

    #[test]
    fn test_teleop_cancels_auto() {
        let mut h = harness(Some(Alliance::Blue));

        h.fms.start_period(MatchMode::Auto, 15.0);
        h.ctrl.cycle();
        assert_eq!(h.ctrl.motion().calls.len(), 2);

        h.fms.start_period(MatchMode::Teleop, 135.0);
        let report = h.ctrl.cycle();
        assert_eq!(report.program, Some(RunnerStatus::Cancelled));
        assert!(h.ctrl.motion().is_cancelled(0));
        assert!(h.ctrl.auto_cancel_token().is_none());

        // The follow of segment B is never started
        h.ctrl.cycle();
        assert_eq!(h.ctrl.motion().calls.len(), 2);
    }

    #[test]
    fn test_dispatch_only_in_teleop() {
        let mut h = harness(None);
        let blue_target = h.ctrl.registry().get("reef", 0, Alliance::Blue).unwrap();

        // Rising edge while disabled is suppressed
        h.ctrl.cycle();
        h.dash
            .set_from_console("ConfirmedCondition", DashValue::Bool(true));
        assert_eq!(h.ctrl.cycle().dispatch, DispatchOutcome::Suppressed);

        h.fms.start_period(MatchMode::Teleop, 135.0);
        h.dash
            .set_from_console("ConfirmedCondition", DashValue::Bool(false));
        h.ctrl.cycle();

        h.target_index.store(0);
        h.dash
            .set_from_console("ConfirmedCondition", DashValue::Bool(true));
        assert_eq!(
            h.ctrl.cycle().dispatch,
            DispatchOutcome::Dispatched {
                index: 0,
                pose: blue_target
            }
        );
        assert_eq!(h.ctrl.motion().calls, vec![Call::DriveTo(blue_target)]);

        // Disabling cancels the drive
        h.fms.disable();
        h.ctrl.cycle();
        assert!(h.ctrl.motion().is_cancelled(0));
    }
}

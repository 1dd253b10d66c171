//! Recording motion controller for unit tests.

use std::{
    cell::RefCell,
    rc::Rc,
};

use super::{CommandHandle, MotionCtrl};
use crate::{field::Pose, segment::Segment};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Follow(String),
    Reset(Pose),
    DriveTo(Pose),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HandleFlags {
    pub finished: bool,
    pub cancelled: bool,
}

/// Motion controller whose command handles only finish when the test says so.
#[derive(Debug, Default)]
pub struct RecordingMotion {
    pub calls: Vec<Call>,
    pub handles: Vec<Rc<RefCell<HandleFlags>>>,
}

#[derive(Debug)]
pub struct MockHandle(Rc<RefCell<HandleFlags>>);

impl RecordingMotion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the `n`th issued handle as finished.
    pub fn finish(&self, n: usize) {
        self.handles[n].borrow_mut().finished = true;
    }

    pub fn is_cancelled(&self, n: usize) -> bool {
        self.handles[n].borrow().cancelled
    }

    fn new_handle(&mut self) -> MockHandle {
        let flags = Rc::new(RefCell::new(HandleFlags::default()));
        self.handles.push(flags.clone());
        MockHandle(flags)
    }
}

impl MotionCtrl for RecordingMotion {
    type Handle = MockHandle;

    fn follow(&mut self, segment: &Segment) -> MockHandle {
        self.calls.push(Call::Follow(segment.id().to_string()));
        self.new_handle()
    }

    fn reset_estimate(&mut self, pose: Pose) {
        self.calls.push(Call::Reset(pose));
    }

    fn drive_to(&mut self, pose: Pose) -> MockHandle {
        self.calls.push(Call::DriveTo(pose));
        self.new_handle()
    }
}

impl CommandHandle for MockHandle {
    fn is_finished(&self) -> bool {
        let f = self.0.borrow();
        f.finished || f.cancelled
    }

    fn cancel(&mut self) {
        self.0.borrow_mut().cancelled = true;
    }
}

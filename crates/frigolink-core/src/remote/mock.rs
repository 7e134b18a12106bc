//! No-transport collaborators used during bring-up and in tests.

use heapless::{Deque, Vec};

use super::{
    ActuatorBank, AssetSink, CommandRequest, CommandResult, FixState, PositionService,
    PushOutcome, PushSource, RecordStatus, ResourceKind,
};
use crate::settings::BoardVariant;

const OP_LOG_CAPACITY: usize = 64;

/// One recorded sink operation, for assertions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SinkOp {
    SetBool(&'static str, bool),
    SetI32(&'static str, i32),
    SetF32(&'static str, f32),
    Push(&'static str),
}

/// In-memory record handle.
#[derive(Debug, Default)]
pub struct MockRecord {
    pub appended: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MockSinkError {
    Unavailable,
}

/// Sink that journals every operation instead of talking to a server.
#[derive(Debug, Default)]
pub struct MockSink {
    pub ops: Vec<SinkOp, OP_LOG_CAPACITY>,
    pub resources: Vec<(&'static str, ResourceKind), 16>,
    pub replies: Vec<(CommandRequest, CommandResult), 8>,
    pub records_created: u32,
    pub records_pushed: u32,
    pub records_deleted: u32,
    pub statuses: Deque<(PushSource, PushOutcome), 8>,
    /// Returned by the next `record_*` call instead of `Ok`, then cleared.
    pub force_append_status: Option<RecordStatus>,
    /// Makes `push` and `push_record` fail synchronously.
    pub fail_pushes: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_count(&self, path: &'static str) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, SinkOp::Push(p) if *p == path))
            .count()
    }

    pub fn last_bool(&self, path: &'static str) -> Option<bool> {
        self.ops.iter().rev().find_map(|op| match op {
            SinkOp::SetBool(p, value) if *p == path => Some(*value),
            _ => None,
        })
    }

    fn log(&mut self, op: SinkOp) {
        let _ = self.ops.push(op);
    }

    fn take_append_status(&mut self) -> RecordStatus {
        self.force_append_status.take().unwrap_or(RecordStatus::Ok)
    }
}

impl AssetSink for MockSink {
    type Error = MockSinkError;
    type Record = MockRecord;

    fn create_resource(
        &mut self,
        path: &'static str,
        kind: ResourceKind,
    ) -> Result<(), Self::Error> {
        let _ = self.resources.push((path, kind));
        Ok(())
    }

    fn set_bool(&mut self, path: &'static str, value: bool) {
        self.log(SinkOp::SetBool(path, value));
    }

    fn set_i32(&mut self, path: &'static str, value: i32) {
        self.log(SinkOp::SetI32(path, value));
    }

    fn set_f32(&mut self, path: &'static str, value: f32) {
        self.log(SinkOp::SetF32(path, value));
    }

    fn push(&mut self, path: &'static str) -> Result<(), Self::Error> {
        if self.fail_pushes {
            return Err(MockSinkError::Unavailable);
        }
        self.log(SinkOp::Push(path));
        Ok(())
    }

    fn create_record(&mut self) -> Result<Self::Record, Self::Error> {
        self.records_created += 1;
        Ok(MockRecord::default())
    }

    fn record_f32(
        &mut self,
        record: &mut Self::Record,
        _path: &'static str,
        _value: f32,
        _timestamp_ms: u64,
    ) -> RecordStatus {
        let status = self.take_append_status();
        if status.is_ok() {
            record.appended += 1;
        }
        status
    }

    fn record_i32(
        &mut self,
        record: &mut Self::Record,
        _path: &'static str,
        _value: i32,
        _timestamp_ms: u64,
    ) -> RecordStatus {
        let status = self.take_append_status();
        if status.is_ok() {
            record.appended += 1;
        }
        status
    }

    fn push_record(&mut self, _record: &Self::Record) -> Result<(), Self::Error> {
        if self.fail_pushes {
            return Err(MockSinkError::Unavailable);
        }
        self.records_pushed += 1;
        Ok(())
    }

    fn delete_record(&mut self, _record: Self::Record) {
        self.records_deleted += 1;
    }

    fn reply_command(&mut self, request: CommandRequest, result: CommandResult) {
        let _ = self.replies.push((request, result));
    }

    fn poll_push_status(&mut self) -> Option<(PushSource, PushOutcome)> {
        self.statuses.pop_front()
    }
}

/// Position collaborator that always reports the same fix.
#[derive(Debug, Clone, Copy)]
pub struct MockPosition {
    pub fix: FixState,
    pub pushes: u32,
}

impl MockPosition {
    pub const fn new() -> Self {
        Self {
            fix: FixState::Fix3d,
            pushes: 0,
        }
    }
}

impl Default for MockPosition {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionService for MockPosition {
    fn push_current_location(&mut self) -> FixState {
        self.pushes += 1;
        self.fix
    }
}

/// Actuator bank that only mirrors the requested levels.
#[derive(Debug, Clone, Copy)]
pub struct MockActuators {
    pub board_variant: BoardVariant,
    pub variant_changes: u32,
    pub fan_motor_on: bool,
    pub door_led_on: bool,
}

impl MockActuators {
    pub const fn new() -> Self {
        Self {
            board_variant: BoardVariant::Red,
            variant_changes: 0,
            fan_motor_on: false,
            door_led_on: false,
        }
    }
}

impl Default for MockActuators {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorBank for MockActuators {
    fn variant(&self) -> BoardVariant {
        self.board_variant
    }

    fn set_variant(&mut self, variant: BoardVariant) {
        self.board_variant = variant;
        self.variant_changes += 1;
    }

    fn set_fan_motor(&mut self, on: bool) {
        self.fan_motor_on = on;
    }

    fn set_door_led(&mut self, open: bool) {
        self.door_led_on = open;
    }
}

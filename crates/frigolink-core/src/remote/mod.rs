//! Trait seams toward the external collaborators: the remote asset-data
//! sink, the position service, and the actuator bank.

pub mod mock;

use crate::settings::BoardVariant;

/// Remote-addressable resource paths, kept verbatim from the device model.
pub mod paths {
    pub const VAR_FAN_STATE: &str = "truck.var.fan.isOn";
    pub const VAR_FAN_DURATION: &str = "truck.var.fan.duration";
    pub const VAR_TEMP_CURRENT: &str = "truck.var.temp.current";
    pub const VAR_DOOR_STATE: &str = "truck.var.door.isOpen";

    pub const SET_TARGET_TEMP: &str = "truck.set.temp.target";
    pub const SET_OUTSIDE_TEMP: &str = "truck.set.temp.outside";
    pub const SET_DATAGEN_INTERVAL: &str = "truck.set.interval.datagen";
    pub const SET_DATAPUSH_INTERVAL: &str = "truck.set.interval.datapush";
    pub const SET_BOARD_VARIANT: &str = "truck.set.boardVariant";

    pub const CMD_START_FAN: &str = "truck.cmd.startFan";
    pub const CMD_STOP_FAN: &str = "truck.cmd.stopFan";
    pub const CMD_OPEN_DOOR: &str = "truck.cmd.openDoor";
    pub const CMD_CLOSE_DOOR: &str = "truck.cmd.closeDoor";
}

/// Access class of a remote resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceKind {
    /// Server-read-only value the device publishes.
    Variable,
    /// Server-writable tunable.
    Setting,
    /// Server-invocable action.
    Command,
}

/// Typed value carried by an inbound setting write.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AssetValue {
    Bool(bool),
    I32(i32),
    F32(f32),
}

/// Result of appending one sample to an open timeseries record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordStatus {
    Ok,
    /// Record buffer exhausted; the batch must be flushed now.
    Full,
    Error,
}

impl RecordStatus {
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Deferred completion of a fire-and-forget push.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PushOutcome {
    Acked,
    Failed,
}

/// Which kind of push a deferred status belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PushSource {
    Variable,
    Record,
}

/// Opaque token identifying an inbound command invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CommandRequest(pub u32);

/// Execution status reported back for a command invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommandResult {
    Success,
}

/// Position fix quality reported by the location collaborator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FixState {
    NoFix,
    Fix2d,
    Fix3d,
    Estimated,
}

/// Remote asset-data sink.
///
/// All pushes are fire-and-forget: `push`/`push_record` only hand the data to
/// the transport, and the eventual ack (or failure) surfaces later through
/// [`AssetSink::poll_push_status`]. The engine logs those statuses and never
/// retries on their behalf.
pub trait AssetSink {
    type Error: core::fmt::Debug;
    type Record;

    fn create_resource(
        &mut self,
        path: &'static str,
        kind: ResourceKind,
    ) -> Result<(), Self::Error>;

    fn set_bool(&mut self, path: &'static str, value: bool);
    fn set_i32(&mut self, path: &'static str, value: i32);
    fn set_f32(&mut self, path: &'static str, value: f32);

    /// Queue the current value of `path` for delivery.
    fn push(&mut self, path: &'static str) -> Result<(), Self::Error>;

    fn create_record(&mut self) -> Result<Self::Record, Self::Error>;
    fn record_f32(
        &mut self,
        record: &mut Self::Record,
        path: &'static str,
        value: f32,
        timestamp_ms: u64,
    ) -> RecordStatus;
    fn record_i32(
        &mut self,
        record: &mut Self::Record,
        path: &'static str,
        value: i32,
        timestamp_ms: u64,
    ) -> RecordStatus;

    /// Queue a whole record batch for delivery.
    fn push_record(&mut self, record: &Self::Record) -> Result<(), Self::Error>;
    fn delete_record(&mut self, record: Self::Record);

    fn reply_command(&mut self, request: CommandRequest, result: CommandResult);

    /// Drain one deferred push completion, if any arrived.
    fn poll_push_status(&mut self) -> Option<(PushSource, PushOutcome)>;
}

/// External positioning collaborator.
pub trait PositionService {
    /// Push the current location toward the server and report fix quality.
    fn push_current_location(&mut self) -> FixState;
}

/// Physical outputs the engine actuates.
pub trait ActuatorBank {
    /// Board variant the wiring layer was configured for at boot.
    fn variant(&self) -> BoardVariant;
    fn set_variant(&mut self, variant: BoardVariant);
    fn set_fan_motor(&mut self, on: bool);
    fn set_door_led(&mut self, open: bool);
}

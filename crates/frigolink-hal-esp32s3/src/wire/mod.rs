//! Postcard frame codec and the queued UDP asset sink.
//!
//! Every outbound interaction is one self-contained frame. The sink never
//! touches the network itself: frames pile up in a bounded queue, the engine
//! loop drains them onto the socket and reports the send result back, which
//! is what the deferred push statuses are made of.

use frigolink_core::remote::{
    AssetSink, AssetValue, CommandRequest, CommandResult, PushOutcome, PushSource, RecordStatus,
    ResourceKind,
};
use heapless::{Deque, Vec};
use log::warn;
use serde::{Deserialize, Serialize};

pub const MAX_FRAME_BYTES: usize = 512;
pub const MAX_RECORD_SAMPLES: usize = 16;
const OUTGOING_CAPACITY: usize = 16;
const STATUS_CAPACITY: usize = 8;
const VALUE_CACHE_CAPACITY: usize = 16;

/// Value payload shared by both frame directions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Bool(bool),
    I32(i32),
    F32(f32),
}

impl From<AssetValue> for WireValue {
    fn from(value: AssetValue) -> Self {
        match value {
            AssetValue::Bool(b) => Self::Bool(b),
            AssetValue::I32(v) => Self::I32(v),
            AssetValue::F32(v) => Self::F32(v),
        }
    }
}

impl From<WireValue> for AssetValue {
    fn from(value: WireValue) -> Self {
        match value {
            WireValue::Bool(b) => Self::Bool(b),
            WireValue::I32(v) => Self::I32(v),
            WireValue::F32(v) => Self::F32(v),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum WireResourceKind {
    Variable,
    Setting,
    Command,
}

impl From<ResourceKind> for WireResourceKind {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Variable => Self::Variable,
            ResourceKind::Setting => Self::Setting,
            ResourceKind::Command => Self::Command,
        }
    }
}

/// One timestamped sample inside a timeseries batch.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct WireSample {
    pub path: &'static str,
    pub value: WireValue,
    pub timestamp_ms: u64,
}

/// Device-to-server frames.
#[derive(Debug, Serialize)]
pub enum Outbound<'a> {
    Register {
        path: &'a str,
        kind: WireResourceKind,
    },
    Publish {
        path: &'a str,
        value: WireValue,
    },
    Timeseries {
        samples: &'a [WireSample],
    },
    CommandAck {
        request: u32,
        success: bool,
    },
}

/// Server-to-device frames.
#[derive(Debug, PartialEq, Deserialize)]
pub enum Inbound<'a> {
    SettingWrite { path: &'a str, value: WireValue },
    Command { path: &'a str, request: u32 },
    Shutdown,
}

/// Decode one inbound datagram; malformed frames are logged and dropped.
pub fn decode_inbound(bytes: &[u8]) -> Option<Inbound<'_>> {
    match postcard::from_bytes(bytes) {
        Ok(frame) => Some(frame),
        Err(err) => {
            warn!("undecodable inbound frame ({} bytes): {:?}", bytes.len(), err);
            None
        }
    }
}

/// Classifies a queued frame so the send result can be routed back into the
/// right deferred status, or into none at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameKind {
    Registration,
    VariablePush,
    RecordPush,
    CommandAck,
}

/// One encoded frame waiting on the outgoing queue.
#[derive(Debug)]
pub struct OutboundFrame {
    pub kind: FrameKind,
    pub bytes: Vec<u8, MAX_FRAME_BYTES>,
}

/// Open timeseries batch owned by the engine's accumulator.
#[derive(Debug, Default)]
pub struct WireRecord {
    samples: Vec<WireSample, MAX_RECORD_SAMPLES>,
}

impl WireRecord {
    fn append(&mut self, sample: WireSample) -> RecordStatus {
        if self.samples.push(sample).is_err() {
            return RecordStatus::Error;
        }
        if self.samples.is_full() {
            RecordStatus::Full
        } else {
            RecordStatus::Ok
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameSinkError {
    Encode,
    QueueFull,
    UnknownPath,
}

/// Asset sink that turns every interaction into a queued postcard frame.
#[derive(Debug, Default)]
pub struct FrameSink {
    values: Vec<(&'static str, WireValue), VALUE_CACHE_CAPACITY>,
    outgoing: Deque<OutboundFrame, OUTGOING_CAPACITY>,
    statuses: Deque<(PushSource, PushOutcome), STATUS_CAPACITY>,
}

impl FrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next frame to put on the wire, if any.
    pub fn pop_outgoing(&mut self) -> Option<OutboundFrame> {
        self.outgoing.pop_front()
    }

    /// Report the send result of a previously popped frame. Only pushes
    /// carry a deferred status; registrations and acks are best-effort.
    pub fn notify_sent(&mut self, kind: FrameKind, delivered: bool) {
        let source = match kind {
            FrameKind::VariablePush => PushSource::Variable,
            FrameKind::RecordPush => PushSource::Record,
            FrameKind::Registration | FrameKind::CommandAck => return,
        };
        let outcome = if delivered {
            PushOutcome::Acked
        } else {
            PushOutcome::Failed
        };
        let _ = self.statuses.push_back((source, outcome));
    }

    fn cache_value(&mut self, path: &'static str, value: WireValue) {
        if let Some(slot) = self.values.iter_mut().find(|(p, _)| *p == path) {
            slot.1 = value;
            return;
        }
        if self.values.push((path, value)).is_err() {
            warn!("value cache full; dropping {}", path);
        }
    }

    fn enqueue(&mut self, kind: FrameKind, frame: &Outbound<'_>) -> Result<(), FrameSinkError> {
        let mut bytes: Vec<u8, MAX_FRAME_BYTES> = Vec::new();
        bytes
            .resize_default(MAX_FRAME_BYTES)
            .map_err(|_| FrameSinkError::Encode)?;
        let used = postcard::to_slice(frame, &mut bytes)
            .map_err(|_| FrameSinkError::Encode)?
            .len();
        bytes.truncate(used);

        self.outgoing
            .push_back(OutboundFrame { kind, bytes })
            .map_err(|_| FrameSinkError::QueueFull)
    }
}

impl AssetSink for FrameSink {
    type Error = FrameSinkError;
    type Record = WireRecord;

    fn create_resource(
        &mut self,
        path: &'static str,
        kind: ResourceKind,
    ) -> Result<(), Self::Error> {
        self.enqueue(
            FrameKind::Registration,
            &Outbound::Register {
                path,
                kind: kind.into(),
            },
        )
    }

    fn set_bool(&mut self, path: &'static str, value: bool) {
        self.cache_value(path, WireValue::Bool(value));
    }

    fn set_i32(&mut self, path: &'static str, value: i32) {
        self.cache_value(path, WireValue::I32(value));
    }

    fn set_f32(&mut self, path: &'static str, value: f32) {
        self.cache_value(path, WireValue::F32(value));
    }

    fn push(&mut self, path: &'static str) -> Result<(), Self::Error> {
        let value = self
            .values
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, v)| *v)
            .ok_or(FrameSinkError::UnknownPath)?;
        self.enqueue(FrameKind::VariablePush, &Outbound::Publish { path, value })
    }

    fn create_record(&mut self) -> Result<Self::Record, Self::Error> {
        Ok(WireRecord::default())
    }

    fn record_f32(
        &mut self,
        record: &mut Self::Record,
        path: &'static str,
        value: f32,
        timestamp_ms: u64,
    ) -> RecordStatus {
        record.append(WireSample {
            path,
            value: WireValue::F32(value),
            timestamp_ms,
        })
    }

    fn record_i32(
        &mut self,
        record: &mut Self::Record,
        path: &'static str,
        value: i32,
        timestamp_ms: u64,
    ) -> RecordStatus {
        record.append(WireSample {
            path,
            value: WireValue::I32(value),
            timestamp_ms,
        })
    }

    fn push_record(&mut self, record: &Self::Record) -> Result<(), Self::Error> {
        self.enqueue(
            FrameKind::RecordPush,
            &Outbound::Timeseries {
                samples: &record.samples,
            },
        )
    }

    fn delete_record(&mut self, record: Self::Record) {
        drop(record);
    }

    fn reply_command(&mut self, request: CommandRequest, result: CommandResult) {
        let success = matches!(result, CommandResult::Success);
        if let Err(err) = self.enqueue(
            FrameKind::CommandAck,
            &Outbound::CommandAck {
                request: request.0,
                success,
            },
        ) {
            warn!("failed to queue command ack: {:?}", err);
        }
    }

    fn poll_push_status(&mut self) -> Option<(PushSource, PushOutcome)> {
        self.statuses.pop_front()
    }
}

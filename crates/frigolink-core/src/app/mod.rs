//! Engine context: owns the collaborators, the simulated state, and the two
//! periodic cycles, and dispatches inbound remote events.

use log::{debug, info, warn};

use crate::{
    model::{Advance, TruckState},
    remote::{
        paths, ActuatorBank, AssetSink, AssetValue, CommandRequest, CommandResult, PositionService,
        PushOutcome, PushSource, ResourceKind,
    },
    settings::{BoardVariant, ConfigStore, TruckSettings},
    telemetry::SampleAccumulator,
};

/// Server-writable setting identified at the inbound boundary.
///
/// Hierarchical paths are matched once, by token containment, and everything
/// past this point is an exhaustive match on the closed set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettingField {
    DataGenInterval,
    DataPushInterval,
    TargetTemp,
    OutsideTemp,
    BoardVariant,
}

impl SettingField {
    /// First matching token wins; unknown paths yield `None` and are ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        if path.contains("datagen") {
            Some(Self::DataGenInterval)
        } else if path.contains("datapush") {
            Some(Self::DataPushInterval)
        } else if path.contains("target") {
            Some(Self::TargetTemp)
        } else if path.contains("outside") {
            Some(Self::OutsideTemp)
        } else if path.contains("boardVariant") {
            Some(Self::BoardVariant)
        } else {
            None
        }
    }
}

/// Server-invocable command identified at the inbound boundary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TruckCommand {
    StartFan,
    StopFan,
    OpenDoor,
    CloseDoor,
}

impl TruckCommand {
    pub fn from_path(path: &str) -> Option<Self> {
        if path.contains("startFan") {
            Some(Self::StartFan)
        } else if path.contains("stopFan") {
            Some(Self::StopFan)
        } else if path.contains("openDoor") {
            Some(Self::OpenDoor)
        } else if path.contains("closeDoor") {
            Some(Self::CloseDoor)
        } else {
            None
        }
    }
}

/// Inbound setting write, fully typed after the boundary parse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SettingWrite {
    DataGenIntervalSecs(u32),
    DataPushIntervalSecs(u32),
    TargetTempC(f32),
    OutsideTempC(i32),
    BoardVariant(BoardVariant),
}

impl SettingWrite {
    /// Parse a raw path/value pair delivered by the transport.
    ///
    /// Type mismatches and out-of-range values are treated the same way as
    /// unrecognized paths: ignored, nothing in the engine changes.
    pub fn parse(path: &str, value: AssetValue) -> Option<Self> {
        match (SettingField::from_path(path)?, value) {
            (SettingField::DataGenInterval, AssetValue::I32(secs)) if secs > 0 => {
                Some(Self::DataGenIntervalSecs(secs as u32))
            }
            (SettingField::DataPushInterval, AssetValue::I32(secs)) if secs > 0 => {
                Some(Self::DataPushIntervalSecs(secs as u32))
            }
            (SettingField::TargetTemp, AssetValue::F32(temp)) => Some(Self::TargetTempC(temp)),
            (SettingField::OutsideTemp, AssetValue::I32(temp)) => Some(Self::OutsideTempC(temp)),
            (SettingField::BoardVariant, AssetValue::I32(index)) => {
                BoardVariant::from_index(index).map(Self::BoardVariant)
            }
            _ => None,
        }
    }
}

/// One periodic cycle with a runtime-mutable interval.
///
/// `None` as the next deadline means "not started yet": the first `due`
/// check fires immediately, giving both cycles their eager first tick.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ScheduleSlot {
    interval_ms: u64,
    next_due_ms: Option<u64>,
}

impl ScheduleSlot {
    const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            next_due_ms: None,
        }
    }

    fn due(&mut self, now_ms: u64) -> bool {
        match self.next_due_ms {
            Some(due) if now_ms < due => false,
            _ => {
                self.next_due_ms = Some(now_ms + self.interval_ms);
                true
            }
        }
    }

    /// Stop, change the interval, restart: the next fire is exactly one new
    /// interval from now, never a leftover of the old schedule.
    fn reconfigure(&mut self, interval_ms: u64, now_ms: u64) {
        self.interval_ms = interval_ms;
        self.next_due_ms = Some(now_ms + interval_ms);
    }
}

const fn secs_to_ms(secs: u32) -> u64 {
    secs as u64 * 1_000
}

/// The truck engine. Owns every collaborator; driven solely by [`tick`]
/// and the inbound handlers, one call at a time.
///
/// [`tick`]: TruckApp::tick
pub struct TruckApp<S, C, P, A>
where
    S: AssetSink,
    C: ConfigStore,
    P: PositionService,
    A: ActuatorBank,
{
    sink: S,
    config: C,
    position: P,
    actuators: A,
    settings: TruckSettings,
    state: TruckState,
    telemetry: SampleAccumulator<S::Record>,
    generate_slot: ScheduleSlot,
    publish_slot: ScheduleSlot,
}

impl<S, C, P, A> TruckApp<S, C, P, A>
where
    S: AssetSink,
    C: ConfigStore,
    P: PositionService,
    A: ActuatorBank,
{
    /// Build the engine: load (or bootstrap) persisted settings and seed the
    /// board variant from the wiring layer. Nothing here is fatal; an
    /// unreadable store degrades to defaults.
    pub fn new(sink: S, mut config: C, position: P, actuators: A) -> Self {
        let mut settings = match TruckSettings::load_or_bootstrap(&mut config) {
            Ok(settings) => settings,
            Err(err) => {
                warn!("config store unavailable ({:?}); using defaults", err);
                TruckSettings::default()
            }
        };
        settings.board_variant = actuators.variant();

        let generate_slot = ScheduleSlot::new(secs_to_ms(settings.data_gen_interval_secs));
        let publish_slot = ScheduleSlot::new(secs_to_ms(settings.data_push_interval_secs));

        Self {
            sink,
            config,
            position,
            actuators,
            settings,
            state: TruckState::default(),
            telemetry: SampleAccumulator::new(),
            generate_slot,
            publish_slot,
        }
    }

    pub fn settings(&self) -> &TruckSettings {
        &self.settings
    }

    pub fn state(&self) -> &TruckState {
        &self.state
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn config_mut(&mut self) -> &mut C {
        &mut self.config
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn position_mut(&mut self) -> &mut P {
        &mut self.position
    }
}

include!("runtime.rs");
include!("dispatch.rs");

#[cfg(test)]
mod tests;

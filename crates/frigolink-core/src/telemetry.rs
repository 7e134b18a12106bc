//! Bounded timeseries batching of (temperature, fan-duration) samples.

use log::{debug, info};

use crate::model::TruckState;
use crate::remote::{paths, AssetSink, PositionService};

/// Sample pairs accumulated before a batch is pushed.
pub const RECORD_CAPACITY: u8 = 6;

/// Buffers timestamped samples into a remote record and flushes it as one
/// batch when full, or immediately when the sink reports exhaustion.
///
/// Delivery is at-most-once: once a flush is attempted the record handle is
/// discarded whether the push was accepted or not.
#[derive(Debug)]
pub struct SampleAccumulator<R> {
    open: Option<R>,
    count: u8,
}

impl<R> SampleAccumulator<R> {
    pub const fn new() -> Self {
        Self {
            open: None,
            count: 0,
        }
    }

    pub const fn has_open_record(&self) -> bool {
        self.open.is_some()
    }

    pub const fn sample_count(&self) -> u8 {
        self.count
    }

    /// Append the current temperature and fan duration to the open record,
    /// opening one first if needed.
    pub fn accumulate<S, P>(
        &mut self,
        sink: &mut S,
        position: &mut P,
        state: &TruckState,
        now_ms: u64,
    ) where
        S: AssetSink<Record = R>,
        P: PositionService,
    {
        if self.open.is_none() {
            // A fresh batch also refreshes the truck position upstream.
            let fix = position.push_current_location();
            debug!("opening new timeseries record (fix={:?})", fix);
            match sink.create_record() {
                Ok(record) => {
                    self.open = Some(record);
                    self.count = 0;
                }
                Err(err) => {
                    info!("failed to create timeseries record: {:?}", err);
                    return;
                }
            }
        }

        let Some(record) = self.open.as_mut() else {
            return;
        };

        let temp_status =
            sink.record_f32(record, paths::VAR_TEMP_CURRENT, state.current_temp_c, now_ms);
        let duration_status = sink.record_i32(
            record,
            paths::VAR_FAN_DURATION,
            state.fan_duration_min as i32,
            now_ms,
        );

        let flush_now = if temp_status.is_ok() && duration_status.is_ok() {
            self.count += 1;
            self.count >= RECORD_CAPACITY
        } else {
            info!("record buffer exhausted; flushing timeseries now");
            true
        };

        if flush_now {
            self.flush(sink);
        }
    }

    /// Push the open record and discard the handle regardless of outcome.
    pub fn flush<S: AssetSink<Record = R>>(&mut self, sink: &mut S) {
        let Some(record) = self.open.take() else {
            return;
        };

        if let Err(err) = sink.push_record(&record) {
            info!("failed to push timeseries record: {:?}", err);
        }
        // Discarded even when the push failed; batches are never retried.
        sink.delete_record(record);
        self.count = 0;
    }
}

impl<R> Default for SampleAccumulator<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::{MockPosition, MockRecord, MockSink};
    use crate::remote::RecordStatus;

    fn state() -> TruckState {
        TruckState::default()
    }

    #[test]
    fn first_sample_opens_record_and_pushes_position() {
        let mut acc: SampleAccumulator<MockRecord> = SampleAccumulator::new();
        let mut sink = MockSink::new();
        let mut position = MockPosition::new();

        acc.accumulate(&mut sink, &mut position, &state(), 1_000);

        assert!(acc.has_open_record());
        assert_eq!(acc.sample_count(), 1);
        assert_eq!(sink.records_created, 1);
        assert_eq!(position.pushes, 1);
    }

    #[test]
    fn capacity_reached_flushes_and_discards_handle() {
        let mut acc: SampleAccumulator<MockRecord> = SampleAccumulator::new();
        let mut sink = MockSink::new();
        let mut position = MockPosition::new();

        for tick in 0..RECORD_CAPACITY {
            acc.accumulate(&mut sink, &mut position, &state(), tick as u64 * 5_000);
        }

        assert_eq!(sink.records_pushed, 1);
        assert_eq!(sink.records_deleted, 1);
        assert!(!acc.has_open_record());
        assert_eq!(acc.sample_count(), 0);

        // The next sample starts a fresh record and a fresh position push.
        acc.accumulate(&mut sink, &mut position, &state(), 60_000);
        assert!(acc.has_open_record());
        assert_eq!(sink.records_created, 2);
        assert_eq!(position.pushes, 2);
    }

    #[test]
    fn buffer_exhaustion_forces_an_early_flush() {
        let mut acc: SampleAccumulator<MockRecord> = SampleAccumulator::new();
        let mut sink = MockSink::new();
        let mut position = MockPosition::new();

        acc.accumulate(&mut sink, &mut position, &state(), 0);
        sink.force_append_status = Some(RecordStatus::Full);
        acc.accumulate(&mut sink, &mut position, &state(), 5_000);

        assert_eq!(sink.records_pushed, 1);
        assert_eq!(sink.records_deleted, 1);
        assert!(!acc.has_open_record());
    }

    #[test]
    fn failed_push_still_discards_the_record() {
        let mut acc: SampleAccumulator<MockRecord> = SampleAccumulator::new();
        let mut sink = MockSink::new();
        let mut position = MockPosition::new();

        for tick in 0..(RECORD_CAPACITY - 1) {
            acc.accumulate(&mut sink, &mut position, &state(), tick as u64);
        }
        sink.fail_pushes = true;
        acc.accumulate(&mut sink, &mut position, &state(), 99);

        assert_eq!(sink.records_pushed, 0);
        assert_eq!(sink.records_deleted, 1);
        assert!(!acc.has_open_record());
    }
}

//! Simulated physical state of the truck and its convergence model.

/// Temperature adjustment applied once per generate tick.
pub const TEMP_STEP_C: f32 = 0.4;
/// Fan-duration increment applied per generate tick while the fan runs.
pub const FAN_DURATION_STEP_MIN: u32 = 5;
/// Temperature the simulation starts from.
pub const DEFAULT_START_TEMP_C: f32 = 5.2;

/// What a single `advance` tick did to the temperature.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Advance {
    /// Fan on, door closed: moved toward the target temperature.
    /// `reached` is set when the target was reached or crossed this tick.
    TowardTarget { reached: bool },
    /// Fan off or door open: moved toward the outside temperature.
    TowardOutside,
}

/// Simulated runtime state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TruckState {
    pub current_temp_c: f32,
    pub fan_on: bool,
    pub fan_duration_min: u32,
    pub door_open: bool,
}

impl Default for TruckState {
    fn default() -> Self {
        Self {
            current_temp_c: DEFAULT_START_TEMP_C,
            fan_on: true,
            fan_duration_min: 0,
            door_open: false,
        }
    }
}

/// Move `value` one fixed step toward `target`.
///
/// One-directional correction: below target adds the step, otherwise
/// subtracts it. Overshoot makes the value oscillate around targets that are
/// not an exact step multiple away; that is accepted, exact convergence is
/// not a goal of the simulation.
pub fn converge(target: f32, step: f32, value: &mut f32) {
    if *value < target {
        *value += step;
    } else {
        *value -= step;
    }
}

impl TruckState {
    /// Advance the simulation by one generate tick.
    ///
    /// Does not flip the fan itself: the caller turns it off on
    /// `TowardTarget { reached: true }` so the immediate state publish and
    /// the duration reset happen on the same actuation path as a remote
    /// command. The duration increment is skipped on that tick because the
    /// turn-off resets it to zero anyway.
    pub fn advance(&mut self, target_temp_c: f32, outside_temp_c: i32) -> Advance {
        let outcome = if self.fan_on && !self.door_open {
            converge(target_temp_c, TEMP_STEP_C, &mut self.current_temp_c);
            Advance::TowardTarget {
                reached: self.current_temp_c <= target_temp_c,
            }
        } else {
            converge(outside_temp_c as f32, TEMP_STEP_C, &mut self.current_temp_c);
            Advance::TowardOutside
        };

        let fan_cut_off = matches!(outcome, Advance::TowardTarget { reached: true });
        if self.fan_on && !fan_cut_off {
            self.fan_duration_min += FAN_DURATION_STEP_MIN;
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converge_steps_up_and_down() {
        let mut value = 1.0;
        converge(2.0, 0.4, &mut value);
        assert_eq!(value, 1.4);
        converge(0.0, 0.4, &mut value);
        assert_eq!(value, 1.0);
    }

    #[test]
    fn converge_overshoots_and_oscillates() {
        // Target 0.1 away with step 0.4: never settles, bounces around it.
        let mut value = 2.3;
        converge(2.2, 0.4, &mut value);
        assert!((value - 1.9).abs() < 1e-5);
        converge(2.2, 0.4, &mut value);
        assert!((value - 2.3).abs() < 1e-5);
    }

    #[test]
    fn fan_on_door_closed_moves_toward_target_by_one_step() {
        let mut state = TruckState::default();
        let outcome = state.advance(2.2, 27);
        assert_eq!(outcome, Advance::TowardTarget { reached: false });
        assert!((state.current_temp_c - 4.8).abs() < 1e-5);
        assert_eq!(state.fan_duration_min, FAN_DURATION_STEP_MIN);
    }

    #[test]
    fn reaching_target_reports_cut_off_and_skips_duration_accrual() {
        let mut state = TruckState {
            current_temp_c: 2.5,
            fan_on: true,
            fan_duration_min: 35,
            door_open: false,
        };
        let outcome = state.advance(2.2, 27);
        assert_eq!(outcome, Advance::TowardTarget { reached: true });
        assert_eq!(state.fan_duration_min, 35);
    }

    #[test]
    fn door_open_moves_toward_outside_even_with_fan_on() {
        let mut state = TruckState {
            door_open: true,
            ..TruckState::default()
        };
        let outcome = state.advance(2.2, 27);
        assert_eq!(outcome, Advance::TowardOutside);
        assert!((state.current_temp_c - 5.6).abs() < 1e-5);
        // Fan keeps accruing duration while it runs against an open door.
        assert_eq!(state.fan_duration_min, FAN_DURATION_STEP_MIN);
    }

    #[test]
    fn fan_off_moves_toward_outside_without_duration_accrual() {
        let mut state = TruckState {
            fan_on: false,
            ..TruckState::default()
        };
        state.advance(2.2, 27);
        assert!((state.current_temp_c - 5.6).abs() < 1e-5);
        assert_eq!(state.fan_duration_min, 0);
    }

    #[test]
    fn repeated_advances_reach_target_in_expected_tick_count() {
        // ceil((5.2 - 2.2) / 0.4) = 8 ticks to reach the target.
        let mut state = TruckState::default();
        let mut ticks = 0;
        loop {
            ticks += 1;
            if state.advance(2.2, 27) == (Advance::TowardTarget { reached: true }) {
                break;
            }
            assert!(ticks < 50, "never reached target");
        }
        assert_eq!(ticks, 8);
    }
}

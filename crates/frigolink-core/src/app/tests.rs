use super::*;
use crate::model::{FAN_DURATION_STEP_MIN, TEMP_STEP_C};
use crate::remote::mock::{MockActuators, MockPosition, MockSink, SinkOp};
use crate::settings::MemoryConfig;
use crate::telemetry::RECORD_CAPACITY;

type TestApp = TruckApp<MockSink, MemoryConfig, MockPosition, MockActuators>;

fn make_app() -> TestApp {
    let mut store = MemoryConfig::new();
    TruckSettings::default().persist(&mut store).unwrap();
    store.write_count = 0;
    let mut app = TruckApp::new(
        MockSink::new(),
        store,
        MockPosition::new(),
        MockActuators::new(),
    );
    app.register_resources().unwrap();
    // Registration seeds the variables through the same set_* calls the
    // cycles use; start every test from an empty journal so the counts
    // below only see engine activity.
    app.sink_mut().ops.clear();
    app
}

fn generate_cycles(app: &mut TestApp) -> usize {
    app.sink_mut()
        .ops
        .iter()
        .filter(|op| matches!(op, SinkOp::SetF32(p, _) if *p == paths::VAR_TEMP_CURRENT))
        .count()
}

#[test]
fn first_tick_fires_both_cycles_eagerly() {
    let mut app = make_app();
    app.tick(0);

    assert_eq!(generate_cycles(&mut app), 1);
    assert_eq!(app.sink_mut().push_count(paths::VAR_FAN_STATE), 1);
    assert_eq!(app.sink_mut().push_count(paths::VAR_DOOR_STATE), 1);
}

#[test]
fn generate_cycle_respects_its_interval() {
    let mut app = make_app();
    app.tick(0);
    app.tick(1_000);
    app.tick(4_999);
    assert_eq!(generate_cycles(&mut app), 1);

    app.tick(5_000);
    assert_eq!(generate_cycles(&mut app), 2);
}

#[test]
fn fan_cuts_off_after_expected_tick_count_and_duration_resets() {
    // 5.2C toward 2.2C at 0.4C per tick: ceil(3.0 / 0.4) = 8 ticks.
    let mut app = make_app();

    for tick in 0..7 {
        app.tick(tick * 5_000);
        assert!(app.state().fan_on, "fan cut off early at tick {}", tick);
    }
    assert_eq!(
        app.state().fan_duration_min,
        7 * FAN_DURATION_STEP_MIN
    );

    app.tick(7 * 5_000);
    assert!(!app.state().fan_on);
    assert_eq!(app.state().fan_duration_min, 0);
    assert!(!app.actuators().fan_motor_on);
    // The cut-off publishes the fan state immediately, on top of the
    // publish-cycle pushes at t=0 and t=20s.
    assert_eq!(app.sink_mut().push_count(paths::VAR_FAN_STATE), 3);
    assert_eq!(app.sink_mut().last_bool(paths::VAR_FAN_STATE), Some(false));
}

#[test]
fn fan_off_converges_toward_outside() {
    let mut app = make_app();
    app.handle_command(TruckCommand::StopFan, CommandRequest(1));

    let before = app.state().current_temp_c;
    app.tick(0);
    assert!((app.state().current_temp_c - (before + TEMP_STEP_C)).abs() < 1e-5);
}

#[test]
fn unchanged_interval_write_is_a_complete_no_op() {
    let mut app = make_app();
    app.tick(0);

    app.handle_setting_write(SettingWrite::DataGenIntervalSecs(5), 1_000);

    assert_eq!(app.config_mut().write_count, 0);
    // The schedule was not restarted: the next generate fire is still due
    // at the original deadline, not 5s after the write.
    app.tick(5_000);
    assert_eq!(generate_cycles(&mut app), 2);
}

#[test]
fn changed_interval_write_persists_and_reschedules() {
    let mut app = make_app();
    app.tick(0);

    app.handle_setting_write(SettingWrite::DataGenIntervalSecs(2), 1_000);
    assert_eq!(app.settings().data_gen_interval_secs, 2);
    assert_eq!(app.config_mut().write_count, 4);

    // Old deadline (5s) must not fire; the new one is 1s + 2s = 3s.
    app.tick(2_999);
    assert_eq!(generate_cycles(&mut app), 1);
    app.tick(3_000);
    assert_eq!(generate_cycles(&mut app), 2);
    app.tick(5_000);
    assert_eq!(generate_cycles(&mut app), 3);
}

#[test]
fn unchanged_target_temp_write_skips_persistence() {
    let mut app = make_app();
    app.handle_setting_write(SettingWrite::TargetTempC(2.2), 0);
    assert_eq!(app.config_mut().write_count, 0);
}

#[test]
fn board_variant_write_reaches_the_actuator_bank() {
    let mut app = make_app();
    app.handle_setting_write(SettingWrite::BoardVariant(BoardVariant::Green), 0);

    assert_eq!(app.settings().board_variant, BoardVariant::Green);
    assert_eq!(app.actuators().board_variant, BoardVariant::Green);
    assert_eq!(app.actuators().variant_changes, 1);
}

#[test]
fn commands_actuate_publish_and_always_ack_success() {
    let mut app = make_app();
    app.handle_command(TruckCommand::OpenDoor, CommandRequest(7));

    assert!(app.state().door_open);
    assert!(app.actuators().door_led_on);
    assert_eq!(app.sink_mut().last_bool(paths::VAR_DOOR_STATE), Some(true));
    assert_eq!(
        app.sink_mut().replies.as_slice(),
        &[(CommandRequest(7), CommandResult::Success)]
    );
}

#[test]
fn command_is_acked_success_even_when_the_push_fails() {
    let mut app = make_app();
    app.sink_mut().fail_pushes = true;
    app.handle_command(TruckCommand::StartFan, CommandRequest(3));

    assert_eq!(
        app.sink_mut().replies.as_slice(),
        &[(CommandRequest(3), CommandResult::Success)]
    );
}

#[test]
fn repeated_start_fan_is_idempotent_on_state() {
    let mut app = make_app();
    app.handle_command(TruckCommand::StartFan, CommandRequest(1));
    app.tick(0);
    let duration = app.state().fan_duration_min;

    app.handle_command(TruckCommand::StartFan, CommandRequest(2));
    assert!(app.state().fan_on);
    assert_eq!(app.state().fan_duration_min, duration);
    assert_eq!(app.sink_mut().replies.len(), 2);
}

#[test]
fn door_switch_edge_toggles_the_door() {
    let mut app = make_app();
    app.handle_door_switch_edge();
    assert!(app.state().door_open);
    app.handle_door_switch_edge();
    assert!(!app.state().door_open);
    assert!(!app.actuators().door_led_on);
}

#[test]
fn open_door_diverges_temperature_toward_outside() {
    let mut app = make_app();
    app.handle_command(TruckCommand::OpenDoor, CommandRequest(1));

    let before = app.state().current_temp_c;
    app.tick(0);
    assert!(app.state().current_temp_c > before);
    // Fan is still running against the open door, so duration accrues.
    assert_eq!(app.state().fan_duration_min, FAN_DURATION_STEP_MIN);
}

#[test]
fn full_record_is_flushed_after_capacity_generate_ticks() {
    let mut app = make_app();
    for tick in 0..RECORD_CAPACITY as u64 {
        app.tick(tick * 5_000);
    }

    assert_eq!(app.sink_mut().records_created, 1);
    assert_eq!(app.sink_mut().records_pushed, 1);
    assert_eq!(app.sink_mut().records_deleted, 1);

    // Next generate tick opens a fresh record.
    app.tick(RECORD_CAPACITY as u64 * 5_000);
    assert_eq!(app.sink_mut().records_created, 2);
}

#[test]
fn unrecognized_paths_are_silently_ignored() {
    assert_eq!(SettingField::from_path("truck.set.unknown"), None);
    assert_eq!(TruckCommand::from_path("truck.cmd.honkHorn"), None);
    assert_eq!(
        SettingWrite::parse("truck.set.interval.datagen", AssetValue::F32(3.0)),
        None
    );
    assert_eq!(
        SettingWrite::parse("truck.set.interval.datagen", AssetValue::I32(0)),
        None
    );
}

#[test]
fn boundary_parse_yields_typed_writes() {
    assert_eq!(
        SettingWrite::parse("truck.set.interval.datagen", AssetValue::I32(7)),
        Some(SettingWrite::DataGenIntervalSecs(7))
    );
    assert_eq!(
        SettingWrite::parse("truck.set.temp.target", AssetValue::F32(4.5)),
        Some(SettingWrite::TargetTempC(4.5))
    );
    assert_eq!(
        SettingWrite::parse("truck.set.boardVariant", AssetValue::I32(2)),
        Some(SettingWrite::BoardVariant(BoardVariant::Yellow))
    );
}

#[test]
fn push_statuses_are_drained_and_only_logged() {
    let mut app = make_app();
    let _ = app
        .sink_mut()
        .statuses
        .push_back((PushSource::Record, PushOutcome::Failed));
    let _ = app
        .sink_mut()
        .statuses
        .push_back((PushSource::Variable, PushOutcome::Acked));

    app.tick(0);
    assert!(app.sink_mut().poll_push_status().is_none());
    // No retry happened: still exactly the eager-tick pushes.
    assert_eq!(app.sink_mut().push_count(paths::VAR_FAN_STATE), 1);
}

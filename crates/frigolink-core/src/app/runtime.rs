impl<S, C, P, A> TruckApp<S, C, P, A>
where
    S: AssetSink,
    C: ConfigStore,
    P: PositionService,
    A: ActuatorBank,
{
    /// Register every variable, setting, and command with the sink and seed
    /// their initial values. Called once after boot, before the first tick.
    pub fn register_resources(&mut self) -> Result<(), S::Error> {
        self.sink
            .create_resource(paths::VAR_FAN_STATE, ResourceKind::Variable)?;
        self.switch_fan(self.state.fan_on, false);

        self.sink
            .create_resource(paths::VAR_FAN_DURATION, ResourceKind::Variable)?;
        self.sink
            .set_i32(paths::VAR_FAN_DURATION, self.state.fan_duration_min as i32);

        self.sink
            .create_resource(paths::VAR_TEMP_CURRENT, ResourceKind::Variable)?;
        self.sink
            .set_f32(paths::VAR_TEMP_CURRENT, self.state.current_temp_c);

        self.sink
            .create_resource(paths::VAR_DOOR_STATE, ResourceKind::Variable)?;
        self.switch_door(self.state.door_open, false);

        self.sink
            .create_resource(paths::SET_DATAGEN_INTERVAL, ResourceKind::Setting)?;
        self.sink.set_i32(
            paths::SET_DATAGEN_INTERVAL,
            self.settings.data_gen_interval_secs as i32,
        );

        self.sink
            .create_resource(paths::SET_DATAPUSH_INTERVAL, ResourceKind::Setting)?;
        self.sink.set_i32(
            paths::SET_DATAPUSH_INTERVAL,
            self.settings.data_push_interval_secs as i32,
        );

        self.sink
            .create_resource(paths::SET_TARGET_TEMP, ResourceKind::Setting)?;
        self.sink
            .set_f32(paths::SET_TARGET_TEMP, self.settings.target_temp_c);

        self.sink
            .create_resource(paths::SET_OUTSIDE_TEMP, ResourceKind::Setting)?;
        self.sink
            .set_i32(paths::SET_OUTSIDE_TEMP, self.settings.outside_temp_c);

        self.sink
            .create_resource(paths::SET_BOARD_VARIANT, ResourceKind::Setting)?;
        self.sink.set_i32(
            paths::SET_BOARD_VARIANT,
            self.settings.board_variant.index(),
        );

        self.sink
            .create_resource(paths::CMD_START_FAN, ResourceKind::Command)?;
        self.sink
            .create_resource(paths::CMD_STOP_FAN, ResourceKind::Command)?;
        self.sink
            .create_resource(paths::CMD_OPEN_DOOR, ResourceKind::Command)?;
        self.sink
            .create_resource(paths::CMD_CLOSE_DOOR, ResourceKind::Command)?;

        Ok(())
    }

    /// Single entry point of the engine.
    ///
    /// Drains deferred push statuses, then fires whichever of the two
    /// periodic cycles is due. Both cycles fire eagerly on the very first
    /// call after start.
    pub fn tick(&mut self, now_ms: u64) {
        while let Some((source, outcome)) = self.sink.poll_push_status() {
            match (source, outcome) {
                (PushSource::Variable, PushOutcome::Acked) => debug!("push acked"),
                (PushSource::Variable, PushOutcome::Failed) => {
                    info!("failed to push data; check connection")
                }
                (PushSource::Record, PushOutcome::Acked) => debug!("timeseries push acked"),
                (PushSource::Record, PushOutcome::Failed) => info!("failed to push timeseries"),
            }
        }

        if self.generate_slot.due(now_ms) {
            self.run_generate_cycle(now_ms);
        }
        if self.publish_slot.due(now_ms) {
            self.run_publish_cycle();
        }
    }

    /// Generate cycle: advance the simulation, mirror the recomputed values
    /// into their variables, and accumulate a timeseries sample.
    fn run_generate_cycle(&mut self, now_ms: u64) {
        match self
            .state
            .advance(self.settings.target_temp_c, self.settings.outside_temp_c)
        {
            Advance::TowardTarget { reached: true } => {
                info!(
                    "reached target temp {}C; turning fan off",
                    self.settings.target_temp_c
                );
                self.switch_fan(false, true);
            }
            Advance::TowardTarget { reached: false } => {
                debug!(
                    "converging to target {}C, current {}C",
                    self.settings.target_temp_c, self.state.current_temp_c
                );
            }
            Advance::TowardOutside => {
                debug!(
                    "converging to outside {}C, current {}C",
                    self.settings.outside_temp_c, self.state.current_temp_c
                );
            }
        }

        self.sink
            .set_f32(paths::VAR_TEMP_CURRENT, self.state.current_temp_c);
        self.sink
            .set_i32(paths::VAR_FAN_DURATION, self.state.fan_duration_min as i32);

        self.telemetry
            .accumulate(&mut self.sink, &mut self.position, &self.state, now_ms);
    }

    /// Publish cycle: push the two discrete status variables.
    fn run_publish_cycle(&mut self) {
        info!("pushing fan and door status");

        self.sink.set_bool(paths::VAR_FAN_STATE, self.state.fan_on);
        if let Err(err) = self.sink.push(paths::VAR_FAN_STATE) {
            info!("failed to push fan state: {:?}", err);
        }

        self.sink
            .set_bool(paths::VAR_DOOR_STATE, self.state.door_open);
        if let Err(err) = self.sink.push(paths::VAR_DOOR_STATE) {
            info!("failed to push door state: {:?}", err);
        }
    }
}

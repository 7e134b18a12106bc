impl<S, C, P, A> TruckApp<S, C, P, A>
where
    S: AssetSink,
    C: ConfigStore,
    P: PositionService,
    A: ActuatorBank,
{
    /// Apply a server-issued setting write.
    ///
    /// Idempotent: a write carrying the current value changes nothing, no
    /// persistence write and no timer restart happens. A changed interval
    /// reconfigures its cycle atomically (stop, set interval, start).
    pub fn handle_setting_write(&mut self, write: SettingWrite, now_ms: u64) {
        match write {
            SettingWrite::DataGenIntervalSecs(secs) => {
                if secs == self.settings.data_gen_interval_secs {
                    info!("data generation interval unchanged: {}s", secs);
                    return;
                }
                info!(
                    "data generation interval {}s -> {}s",
                    self.settings.data_gen_interval_secs, secs
                );
                self.settings.data_gen_interval_secs = secs;
                self.persist_settings();
                self.generate_slot.reconfigure(secs_to_ms(secs), now_ms);
            }
            SettingWrite::DataPushIntervalSecs(secs) => {
                if secs == self.settings.data_push_interval_secs {
                    info!("data push interval unchanged: {}s", secs);
                    return;
                }
                info!(
                    "data push interval {}s -> {}s",
                    self.settings.data_push_interval_secs, secs
                );
                self.settings.data_push_interval_secs = secs;
                self.persist_settings();
                self.publish_slot.reconfigure(secs_to_ms(secs), now_ms);
            }
            SettingWrite::TargetTempC(temp) => {
                if temp == self.settings.target_temp_c {
                    info!("target temperature unchanged: {}C", temp);
                    return;
                }
                info!(
                    "target temperature {}C -> {}C",
                    self.settings.target_temp_c, temp
                );
                self.settings.target_temp_c = temp;
                self.persist_settings();
            }
            SettingWrite::OutsideTempC(temp) => {
                if temp == self.settings.outside_temp_c {
                    info!("outside temperature unchanged: {}C", temp);
                    return;
                }
                info!(
                    "outside temperature {}C -> {}C",
                    self.settings.outside_temp_c, temp
                );
                self.settings.outside_temp_c = temp;
                self.persist_settings();
            }
            SettingWrite::BoardVariant(variant) => {
                if variant == self.settings.board_variant {
                    info!("board variant unchanged: {:?}", variant);
                    return;
                }
                info!(
                    "board variant {:?} -> {:?}",
                    self.settings.board_variant, variant
                );
                self.settings.board_variant = variant;
                self.actuators.set_variant(variant);
                self.persist_settings();
            }
        }
    }

    /// Execute a server-issued command and acknowledge it.
    ///
    /// The reply is always a success, whatever the actuation or the
    /// immediate publish ran into; there is no failure path back to the
    /// server for commands.
    pub fn handle_command(&mut self, command: TruckCommand, request: CommandRequest) {
        info!("executing command {:?}", command);
        match command {
            TruckCommand::StartFan => self.switch_fan(true, true),
            TruckCommand::StopFan => self.switch_fan(false, true),
            TruckCommand::OpenDoor => self.switch_door(true, true),
            TruckCommand::CloseDoor => self.switch_door(false, true),
        }
        self.sink.reply_command(request, CommandResult::Success);
    }

    /// Rising edge on the physical door push-button: toggle the door.
    pub fn handle_door_switch_edge(&mut self) {
        let open = !self.state.door_open;
        info!("door switch pressed; door now {}", if open { "open" } else { "closed" });
        self.switch_door(open, true);
    }

    /// Set the fan state, optionally pushing it immediately, and drive the
    /// fan motor. Turning the fan off resets its duration counter.
    pub fn switch_fan(&mut self, on: bool, publish_now: bool) {
        self.state.fan_on = on;

        if publish_now {
            self.sink.set_bool(paths::VAR_FAN_STATE, on);
            if let Err(err) = self.sink.push(paths::VAR_FAN_STATE) {
                info!("failed to push fan state: {:?}", err);
            }
        }

        self.actuators.set_fan_motor(on);

        if !on {
            self.state.fan_duration_min = 0;
        }
    }

    /// Set the door state, optionally pushing it immediately, and drive the
    /// door indicator.
    pub fn switch_door(&mut self, open: bool, publish_now: bool) {
        self.state.door_open = open;

        if publish_now {
            self.sink.set_bool(paths::VAR_DOOR_STATE, open);
            if let Err(err) = self.sink.push(paths::VAR_DOOR_STATE) {
                info!("failed to push door state: {:?}", err);
            }
        }

        self.actuators.set_door_led(open);
    }

    fn persist_settings(&mut self) {
        if let Err(err) = self.settings.persist(&mut self.config) {
            warn!("failed to persist settings: {:?}", err);
        }
    }
}

//! Truck wiring: fan motor and door indicator outputs, and the debounced
//! door push-button.

use embedded_hal::digital::{InputPin, OutputPin};
use frigolink_core::remote::ActuatorBank;
use frigolink_core::settings::BoardVariant;
use log::info;

/// Fan motor and door indicator outputs for one board variant.
///
/// The variant only selects which harness the outputs are assumed to be
/// wired for; the pins themselves are handed in already configured.
#[derive(Debug)]
pub struct TruckActuators<FAN, LED> {
    fan_motor: FAN,
    door_led: LED,
    variant: BoardVariant,
}

impl<FAN, LED> TruckActuators<FAN, LED>
where
    FAN: OutputPin,
    LED: OutputPin,
{
    pub fn new(fan_motor: FAN, door_led: LED, variant: BoardVariant) -> Self {
        Self {
            fan_motor,
            door_led,
            variant,
        }
    }
}

impl<FAN, LED> ActuatorBank for TruckActuators<FAN, LED>
where
    FAN: OutputPin,
    LED: OutputPin,
{
    fn variant(&self) -> BoardVariant {
        self.variant
    }

    fn set_variant(&mut self, variant: BoardVariant) {
        info!("board variant now {:?}", variant);
        self.variant = variant;
    }

    fn set_fan_motor(&mut self, on: bool) {
        let _ = if on {
            self.fan_motor.set_high()
        } else {
            self.fan_motor.set_low()
        };
    }

    fn set_door_led(&mut self, open: bool) {
        let _ = if open {
            self.door_led.set_high()
        } else {
            self.door_led.set_low()
        };
    }
}

/// Debounced door push-button sampled from the engine loop.
#[derive(Debug)]
pub struct DoorSwitch<SW> {
    sw: SW,
    active_low: bool,
    debounce_polls: u8,
    raw_pressed: bool,
    stable_pressed: bool,
    stable_count: u8,
}

impl<SW: InputPin> DoorSwitch<SW> {
    pub fn new(mut sw: SW, active_low: bool) -> Result<Self, SW::Error> {
        let pressed = pressed_from_level(sw.is_high()?, active_low);
        Ok(Self {
            sw,
            active_low,
            debounce_polls: 3,
            raw_pressed: pressed,
            stable_pressed: pressed,
            stable_count: 0,
        })
    }

    pub const fn with_debounce_polls(mut self, debounce_polls: u8) -> Self {
        self.debounce_polls = debounce_polls;
        self
    }

    /// Sample the switch once; `true` on a debounced press edge.
    pub fn poll_pressed_edge(&mut self) -> Result<bool, SW::Error> {
        let pressed = pressed_from_level(self.sw.is_high()?, self.active_low);

        if pressed == self.raw_pressed {
            self.stable_count = self.stable_count.saturating_add(1);
        } else {
            self.raw_pressed = pressed;
            self.stable_count = 0;
        }

        let threshold = self.debounce_polls.max(1);
        if self.stable_count >= threshold && self.stable_pressed != self.raw_pressed {
            self.stable_pressed = self.raw_pressed;
            return Ok(self.stable_pressed);
        }

        Ok(false)
    }
}

#[inline]
fn pressed_from_level(is_high: bool, active_low: bool) -> bool {
    if active_low { !is_high } else { is_high }
}

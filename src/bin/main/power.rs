use esp_hal::{
    gpio::{Level, Output, OutputConfig, RtcPin},
    peripherals::{GPIO1, GPIO2, GPIO3, LPWR},
    rtc_cntl::{
        Rtc,
        sleep::{RtcioWakeupSource, WakeupLevel},
    },
};

pub(super) fn enter_deep_sleep() -> ! {
    // Drive the door indicator and fan motor low, whatever state the engine
    // left them in, and latch both pads through deep sleep. The drivers stay
    // alive; nothing below ever returns.
    let _door_led = Output::new(unsafe { GPIO2::steal() }, Level::Low, OutputConfig::default());
    unsafe { GPIO2::steal() }.rtcio_pad_hold(true);
    let _fan_motor = Output::new(unsafe { GPIO3::steal() }, Level::Low, OutputConfig::default());
    unsafe { GPIO3::steal() }.rtcio_pad_hold(true);

    // A press on the door switch wakes the truck back up.
    let mut rtc = Rtc::new(unsafe { LPWR::steal() });
    let mut wake_sw = unsafe { GPIO1::steal() };
    let mut wake_pins: [(&mut dyn RtcPin, WakeupLevel); 1] = [(&mut wake_sw, WakeupLevel::Low)];
    let wake_source = RtcioWakeupSource::new(&mut wake_pins);

    rtc.sleep_deep(&[&wake_source]);
}

#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::net::Ipv4Addr;

use embassy_executor::Spawner;
use embassy_net::{
    IpAddress, IpEndpoint, Stack,
    udp::{PacketMetadata, UdpSocket},
};
use embassy_time::{Duration as EmbassyDuration, Timer, WithTimeout};
use esp_hal::{
    clock::CpuClock,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull, RtcPin},
    rtc_cntl::{SocResetReason, reset_reason, wakeup_cause},
    system::Cpu,
    time::Instant,
    timer::timg::TimerGroup,
};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use frigolink_core::{
    app::{SettingWrite, TruckApp, TruckCommand},
    remote::CommandRequest,
    settings::BoardVariant,
};
use frigolink_hal_esp32s3::{
    gpio::{DoorSwitch, TruckActuators},
    link::SessionHandle,
    position::GnssStub,
    storage::flash_config::FlashConfigStore,
    wire::{FrameSink, Inbound, MAX_FRAME_BYTES, decode_inbound},
};
use log::{LevelFilter, info};
use static_cell::StaticCell;

#[path = "main/power.rs"]
mod power;

const TITLE: &str = "FrigoLink";
const BOARD_VARIANT: BoardVariant = BoardVariant::Red;
const DOOR_SWITCH_ACTIVE_LOW: bool = true;
const DOOR_SWITCH_DEBOUNCE_POLLS: u8 = 4;
const ENGINE_POLL_INTERVAL_MS: u64 = 20;
const WIFI_RETRY_BACKOFF_MIN_SECS: u64 = 2;
const WIFI_RETRY_BACKOFF_MAX_SECS: u64 = 120;
const NETWORK_POLL_INTERVAL_MS: u64 = 500;
const DHCP_TIMEOUT_SECS: u64 = 15;

const WIFI_SSID: &str = env!(
    "FRIGOLINK_WIFI_SSID",
    "Set FRIGOLINK_WIFI_SSID in your environment before building/flashing."
);
const WIFI_PASSWORD: &str = env!(
    "FRIGOLINK_WIFI_PASSWORD",
    "Set FRIGOLINK_WIFI_PASSWORD in your environment before building/flashing."
);

const SERVER_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);
const SERVER_PORT: u16 = 5690;
const LOCAL_PORT: u16 = 5691;

static SESSION: SessionHandle = SessionHandle::new();
static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    esp_println::println!("panic: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn wifi_retry_backoff_secs(consecutive_failures: u32) -> u64 {
    // 2, 4, 8, 16, 32, 64, 120, 120, ...
    let shift = consecutive_failures.min(6);
    WIFI_RETRY_BACKOFF_MIN_SECS
        .saturating_mul(1u64 << shift)
        .min(WIFI_RETRY_BACKOFF_MAX_SECS)
}

async fn wait_before_wifi_retry(consecutive_failures: &mut u32) {
    let delay_secs = wifi_retry_backoff_secs(*consecutive_failures);
    *consecutive_failures = consecutive_failures.saturating_add(1);
    info!(
        "wifi retrying in {}s (consecutive_failures={})",
        delay_secs, *consecutive_failures
    );
    Timer::after_secs(delay_secs).await;
}

async fn wifi_connection_loop(
    wifi_controller: &mut WifiController<'_>,
    stack: Stack<'_>,
    session: &'static SessionHandle,
) -> ! {
    let mut consecutive_failures = 0u32;

    loop {
        session.mark_opening();

        if !wifi_controller.is_started().unwrap_or(false) {
            if let Err(err) = wifi_controller.start_async().await {
                info!("wifi start failed: {:?}", err);
                session.mark_closed();
                wait_before_wifi_retry(&mut consecutive_failures).await;
                continue;
            }
        }

        if let Err(err) = wifi_controller.connect_async().await {
            info!("wifi connect failed: {:?}", err);
            session.mark_closed();
            let _ = wifi_controller.disconnect_async().await;
            wait_before_wifi_retry(&mut consecutive_failures).await;
            continue;
        }

        match stack
            .wait_config_up()
            .with_timeout(EmbassyDuration::from_secs(DHCP_TIMEOUT_SECS))
            .await
        {
            Ok(()) => {
                session.mark_open();
                info!("wifi connected and dhcp ready; session open");
            }
            Err(_) => {
                info!("dhcp timeout; forcing reconnect");
                let _ = wifi_controller.disconnect_async().await;
                wait_before_wifi_retry(&mut consecutive_failures).await;
                continue;
            }
        }

        consecutive_failures = 0;

        loop {
            let link_up = stack.is_link_up();
            let has_ipv4 = stack.config_v4().is_some();
            let is_connected = matches!(wifi_controller.is_connected(), Ok(true));

            if !(link_up && has_ipv4 && is_connected) {
                info!(
                    "wifi state lost (link_up={} has_ipv4={} connected={}); reconnecting",
                    link_up, has_ipv4, is_connected
                );
                break;
            }

            Timer::after_millis(NETWORK_POLL_INTERVAL_MS).await;
        }

        session.mark_closed();
        let _ = wifi_controller.disconnect_async().await;
        wait_before_wifi_retry(&mut consecutive_failures).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: {} starting", TITLE);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);
    let boot_reset_reason = reset_reason(Cpu::ProCpu);
    let boot_wakeup_cause = wakeup_cause();
    let woke_from_deep_sleep = boot_reset_reason == Some(SocResetReason::CoreDeepSleep);
    info!(
        "boot reset_reason={:?} wakeup_cause={:?} deep_sleep_wake={}",
        boot_reset_reason, boot_wakeup_cause, woke_from_deep_sleep
    );

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Wiring used by this demo:
    // door switch=GPIO1, door LED=GPIO2, fan motor=GPIO3
    let switch_input = Input::new(peripherals.GPIO1, InputConfig::default().with_pull(Pull::Up));
    // Release any deep-sleep pad hold before driving the outputs again.
    let led_pin = peripherals.GPIO2;
    led_pin.rtcio_pad_hold(false);
    let door_led = Output::new(led_pin, Level::Low, OutputConfig::default());
    let motor_pin = peripherals.GPIO3;
    motor_pin.rtcio_pad_hold(false);
    let fan_motor = Output::new(motor_pin, Level::Low, OutputConfig::default());

    let mut door_switch = DoorSwitch::new(switch_input, DOOR_SWITCH_ACTIVE_LOW)
        .unwrap()
        .with_debounce_polls(DOOR_SWITCH_DEBOUNCE_POLLS);
    let actuators = TruckActuators::new(fan_motor, door_led, BOARD_VARIANT);

    let config_store = FlashConfigStore::new();
    let mut app = TruckApp::new(FrameSink::new(), config_store, GnssStub::new(), actuators);
    if let Err(err) = app.register_resources() {
        info!("resource registration incomplete: {:?}", err);
    }

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => {
            info!("esp-radio init failed: {:?}", err);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };

    let (mut wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                info!("wifi peripheral init failed: {:?}", err);
                loop {
                    Timer::after_secs(1).await;
                }
            }
        };

    let client_config = ClientConfig::default()
        .with_ssid(WIFI_SSID.into())
        .with_password(WIFI_PASSWORD.into());
    let wifi_mode = ModeConfig::Client(client_config);
    if let Err(err) = wifi_controller.set_config(&wifi_mode) {
        info!("wifi mode config failed: {:?}", err);
        loop {
            Timer::after_secs(1).await;
        }
    }

    let stack_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.sta,
        stack_config,
        NET_RESOURCES.init(embassy_net::StackResources::<4>::new()),
        0x7F21_6A0C_41B8_D5E3,
    );

    info!(
        "{} started: data_gen_interval={}s data_push_interval={}s target_temp={}C outside_temp={}C",
        TITLE,
        app.settings().data_gen_interval_secs,
        app.settings().data_push_interval_secs,
        app.settings().target_temp_c,
        app.settings().outside_temp_c
    );
    info!("Truck pins: SWITCH=GPIO1 DOOR_LED=GPIO2 FAN_MOTOR=GPIO3");
    info!(
        "Server endpoint: {}:{} (local port {})",
        SERVER_IP, SERVER_PORT, LOCAL_PORT
    );

    SESSION.mark_opening();

    let net_future = net_runner.run();
    let wifi_future = wifi_connection_loop(&mut wifi_controller, stack, &SESSION);
    let engine_future = async {
        let mut rx_meta = [PacketMetadata::EMPTY; 4];
        let mut rx_buffer = [0u8; 1024];
        let mut tx_meta = [PacketMetadata::EMPTY; 4];
        let mut tx_buffer = [0u8; 1024];
        let mut socket = UdpSocket::new(
            stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        if let Err(err) = socket.bind(LOCAL_PORT) {
            info!("udp bind failed: {:?}", err);
        }
        let server = IpEndpoint::new(IpAddress::Ipv4(SERVER_IP), SERVER_PORT);

        let loop_start = Instant::now();
        let mut last_session_revision = u32::MAX;
        let mut frame_buf = [0u8; MAX_FRAME_BYTES];

        loop {
            if matches!(door_switch.poll_pressed_edge(), Ok(true)) {
                app.handle_door_switch_edge();
            }

            app.tick(loop_start.elapsed().as_millis());

            let session = SESSION.snapshot();
            if session.revision != last_session_revision {
                info!("session state now {:?}", session.state);
                last_session_revision = session.revision;
            }

            if session.is_open() {
                while let Some(frame) = app.sink_mut().pop_outgoing() {
                    let delivered = socket.send_to(&frame.bytes, server).await.is_ok();
                    app.sink_mut().notify_sent(frame.kind, delivered);
                }
            }

            match socket
                .recv_from(&mut frame_buf)
                .with_timeout(EmbassyDuration::from_millis(ENGINE_POLL_INTERVAL_MS))
                .await
            {
                Ok(Ok((len, _meta))) => match decode_inbound(&frame_buf[..len]) {
                    Some(Inbound::SettingWrite { path, value }) => {
                        match SettingWrite::parse(path, value.into()) {
                            Some(write) => {
                                app.handle_setting_write(write, loop_start.elapsed().as_millis())
                            }
                            None => info!("ignoring setting write to {}", path),
                        }
                    }
                    Some(Inbound::Command { path, request }) => {
                        match TruckCommand::from_path(path) {
                            Some(command) => app.handle_command(command, CommandRequest(request)),
                            None => info!("ignoring unknown command {}", path),
                        }
                    }
                    Some(Inbound::Shutdown) => {
                        info!("shutdown requested; releasing session");
                        app.position_mut().stop();
                        SESSION.mark_released();
                        // Best-effort drain of whatever was queued, acks included.
                        while let Some(frame) = app.sink_mut().pop_outgoing() {
                            let _ = socket.send_to(&frame.bytes, server).await;
                        }
                        power::enter_deep_sleep()
                    }
                    None => {}
                },
                Ok(Err(err)) => info!("udp recv failed: {:?}", err),
                Err(_) => {
                    // Poll interval elapsed without inbound traffic.
                }
            }
        }
    };

    let _ = embassy_futures::join::join3(net_future, wifi_future, engine_future).await;
    unreachable!()
}

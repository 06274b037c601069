use embassy_executor::Spawner;
use embassy_net::{Runner, Stack};
use embassy_time::Duration;
use esp_println::println;
use esp_radio::wifi::WifiDevice;
use relay_core::store::LastOutcome;
use relay_core::{Acquisition, ConnectionController, PublishLoop};

use super::super::{
    config::{
        connect_policy, publish_timing, ACQUISITION_PERIOD_MS, DESTINATION_TOPIC, EVENT_BUS,
        READINGS,
    },
    mqtt::MqttSession,
    sampler::AdcSampler,
    storage::FlashBootStore,
    wifi::{self, EspStation},
};
use super::status::run_status_log;

pub(super) struct StartupContext {
    pub(super) station: EspStation,
    pub(super) boot_store: FlashBootStore,
    pub(super) sampler: AdcSampler,
    pub(super) session: MqttSession,
}

#[embassy_executor::task]
pub(super) async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

#[embassy_executor::task]
pub(super) async fn address_watch_task(stack: Stack<'static>) {
    wifi::watch_addresses(stack).await;
}

/// Brings the link up, records the outcome, hands off to the workers and
/// ends. Workers start whether or not the link came up.
#[embassy_executor::task]
pub(super) async fn startup_task(spawner: Spawner, startup: StartupContext) {
    let StartupContext {
        station,
        mut boot_store,
        sampler,
        session,
    } = startup;

    let mut controller = ConnectionController::new(&EVENT_BUS, station, connect_policy());
    let (outcome, ipv4) = match controller.connect().await {
        Ok(ip) => {
            println!("relay: wifi connected ip={}", ip);
            (LastOutcome::Connected, Some(ip))
        }
        Err(err) if err.is_fatal() => panic!("relay: wifi bring-up failed err={}", err),
        Err(err) => {
            println!("relay: wifi connect failed err={}", err);
            (LastOutcome::Failed, None)
        }
    };

    if let Err(err) = boot_store.record_outcome(outcome, ipv4) {
        println!("relay: boot record update failed err={}", err);
    }

    spawner.must_spawn(link_monitor_task(controller.into_stack()));
    spawner.must_spawn(publish_task(session));
    spawner.must_spawn(acquisition_task(sampler));
    spawner.must_spawn(status_task());
    println!("relay: workers started");
}

#[embassy_executor::task]
async fn link_monitor_task(station: EspStation) {
    wifi::run_link_monitor(station).await;
}

#[embassy_executor::task]
async fn publish_task(session: MqttSession) {
    PublishLoop::new(&READINGS, session, DESTINATION_TOPIC, publish_timing())
        .run()
        .await;
}

#[embassy_executor::task]
async fn acquisition_task(sampler: AdcSampler) {
    Acquisition::new(&READINGS, sampler)
        .run(Duration::from_millis(ACQUISITION_PERIOD_MS))
        .await;
}

#[embassy_executor::task]
async fn status_task() {
    run_status_log().await;
}

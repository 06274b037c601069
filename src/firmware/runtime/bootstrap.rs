use esp_hal::timer::timg::TimerGroup;
use esp_println::println;
use static_cell::StaticCell;

use super::super::{
    config::{broker_endpoint, HEAP_BYTES, RECLAIMED_HEAP_BYTES},
    mqtt::MqttSession,
    sampler::AdcSampler,
    storage, wifi,
};
use super::tasks::{address_watch_task, net_task, startup_task, StartupContext};

pub fn run() -> ! {
    esp_println::logger::init_logger(log::LevelFilter::Info);

    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: RECLAIMED_HEAP_BYTES);
    esp_alloc::heap_allocator!(size: HEAP_BYTES);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    println!("relay: boot");

    let boot_store = storage::bring_up(peripherals.FLASH);
    let record = boot_store.record();
    println!(
        "relay: boot_count={} last_outcome={}",
        record.boot_count,
        record.last_outcome.as_str()
    );

    let radio = match wifi::setup(peripherals.WIFI) {
        Ok(radio) => radio,
        Err(err) => panic!("{}", err),
    };
    wifi::install_event_bridge();

    let sampler = AdcSampler::new(peripherals.ADC1, peripherals.GPIO34);
    let session = MqttSession::new(radio.stack, broker_endpoint());

    let startup = StartupContext {
        station: radio.station,
        boot_store,
        sampler,
        session,
    };

    static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(move |spawner| {
        spawner.must_spawn(net_task(radio.net_runner));
        spawner.must_spawn(address_watch_task(radio.stack));
        spawner.must_spawn(startup_task(spawner, startup));
    });
}

//! On-target checks for the link bring-up and the reading queue running on
//! the embassy executor provided by esp-rtos.

#![no_std]
#![no_main]

#[cfg(test)]
#[embedded_test::tests(executor = esp_rtos::embassy::Executor::new())]
mod tests {
    use core::net::Ipv4Addr;

    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_time::Duration;
    use relay_core::{
        ConnectError, ConnectPolicy, ConnectionController, ConnectionState, EventBus, NetEvent,
        NetworkStack, Payload, QueuePolicy, TransferQueue,
    };

    const ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 2);

    /// Radio double: the first `disconnects` requests fail at the link layer,
    /// the next one yields an address.
    struct BenchStation<'a> {
        bus: &'a EventBus<CriticalSectionRawMutex>,
        disconnects: u8,
        requests: u8,
    }

    impl NetworkStack for BenchStation<'_> {
        type Error = ();

        fn start_link(&mut self) -> Result<(), ()> {
            self.bus.publish(NetEvent::LinkStarted);
            Ok(())
        }

        fn request_connect(&mut self) -> Result<(), ()> {
            self.requests += 1;
            if self.requests <= self.disconnects {
                self.bus
                    .publish(NetEvent::LinkDisconnected { reason: 201 });
            } else {
                self.bus.publish(NetEvent::AddressAcquired(ADDR));
            }
            Ok(())
        }
    }

    #[init]
    fn init() {
        let peripherals = esp_hal::init(esp_hal::Config::default());
        let timg0 = esp_hal::timer::timg::TimerGroup::new(peripherals.TIMG0);
        esp_rtos::start(timg0.timer0);
    }

    #[test]
    async fn link_comes_up_after_two_drops() {
        let bus = EventBus::<CriticalSectionRawMutex>::new();
        let station = BenchStation {
            bus: &bus,
            disconnects: 2,
            requests: 0,
        };
        let mut controller = ConnectionController::new(&bus, station, ConnectPolicy::defaults());

        assert_eq!(controller.connect().await, Ok(ADDR));
        assert_eq!(controller.state(), ConnectionState::Connected);
        assert_eq!(controller.into_stack().requests, 3);
    }

    #[test]
    async fn link_gives_up_when_drops_exceed_budget() {
        let bus = EventBus::<CriticalSectionRawMutex>::new();
        let station = BenchStation {
            bus: &bus,
            disconnects: u8::MAX,
            requests: 0,
        };
        let mut controller =
            ConnectionController::new(&bus, station, ConnectPolicy::with_max_retries(1));

        let result = controller.connect().await;
        assert!(matches!(
            result,
            Err(ConnectError::RetriesExhausted { retries: 1 })
        ));
        assert_eq!(controller.state(), ConnectionState::Failed);
    }

    #[test]
    async fn queue_hands_readings_over_in_order() {
        let queue = TransferQueue::<CriticalSectionRawMutex, 2>::new(QueuePolicy::Block);
        for body in [b"first".as_slice(), b"second".as_slice()] {
            assert!(queue.enqueue(Payload::from_slice(body).unwrap()).await.is_ok());
        }
        assert!(queue.is_full());

        let wait = Duration::from_millis(10);
        assert_eq!(queue.dequeue(wait).await.as_deref(), Some(b"first".as_slice()));
        assert_eq!(queue.dequeue(wait).await.as_deref(), Some(b"second".as_slice()));
        assert!(queue.dequeue(wait).await.is_none());
    }
}

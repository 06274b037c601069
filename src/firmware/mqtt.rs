use core::net::Ipv4Addr;

use embassy_net::{tcp::TcpSocket, IpAddress, Stack};
use embassy_time::Duration;
use embedded_io_async::Write;
use esp_println::println;
use relay_core::mqtt::{self, MqttError, CONNACK_LEN};
use relay_core::{MessageId, Publisher, PAYLOAD_MAX};
use static_cell::StaticCell;

use super::config::{MQTT_CLIENT_ID, MQTT_KEEP_ALIVE_SECS, MQTT_SOCKET_TIMEOUT_SECS};

const MQTT_RX_BUF: usize = 128;
const MQTT_TX_BUF: usize = 1536;
const MQTT_FRAME_MAX: usize = PAYLOAD_MAX + 128;

/// QoS 0 publishes carry no packet identifier.
const QOS0_MESSAGE_ID: MessageId = 0;

#[derive(Debug)]
pub(crate) enum SessionError {
    Connect(embassy_net::tcp::ConnectError),
    Io(embassy_net::tcp::Error),
    Closed,
    Protocol(MqttError),
}

impl From<MqttError> for SessionError {
    fn from(err: MqttError) -> Self {
        Self::Protocol(err)
    }
}

/// One broker connection, opened on first publish and reopened after any
/// failure.
pub(crate) struct MqttSession {
    socket: TcpSocket<'static>,
    host: Ipv4Addr,
    port: u16,
    connected: bool,
    frame: [u8; MQTT_FRAME_MAX],
}

impl MqttSession {
    pub(crate) fn new(stack: Stack<'static>, (host, port): (Ipv4Addr, u16)) -> Self {
        static RX_BUFFER: StaticCell<[u8; MQTT_RX_BUF]> = StaticCell::new();
        static TX_BUFFER: StaticCell<[u8; MQTT_TX_BUF]> = StaticCell::new();

        let rx_buffer = RX_BUFFER.init([0; MQTT_RX_BUF]);
        let tx_buffer = TX_BUFFER.init([0; MQTT_TX_BUF]);
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(MQTT_SOCKET_TIMEOUT_SECS)));

        Self {
            socket,
            host,
            port,
            connected: false,
            frame: [0; MQTT_FRAME_MAX],
        }
    }

    async fn ensure_session(&mut self) -> Result<(), SessionError> {
        if self.connected {
            return Ok(());
        }

        self.socket
            .connect((IpAddress::Ipv4(self.host), self.port))
            .await
            .map_err(SessionError::Connect)?;

        let len = mqtt::encode_connect(&mut self.frame, MQTT_CLIENT_ID, MQTT_KEEP_ALIVE_SECS)?;
        self.socket
            .write_all(&self.frame[..len])
            .await
            .map_err(SessionError::Io)?;

        let mut ack = [0u8; CONNACK_LEN];
        let mut filled = 0;
        while filled < ack.len() {
            match self.socket.read(&mut ack[filled..]).await {
                Ok(0) => return Err(SessionError::Closed),
                Ok(read) => filled += read,
                Err(err) => return Err(SessionError::Io(err)),
            }
        }
        let session_present = mqtt::decode_connack(&ack)?;

        println!(
            "mqtt: session open broker={}:{} session_present={}",
            self.host, self.port, session_present
        );
        self.connected = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.socket.abort();
        self.connected = false;
    }

    async fn transmit(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, SessionError> {
        self.ensure_session().await?;
        let len = mqtt::encode_publish(&mut self.frame, topic, payload)?;
        self.socket
            .write_all(&self.frame[..len])
            .await
            .map_err(SessionError::Io)?;
        Ok(QOS0_MESSAGE_ID)
    }
}

impl Publisher for MqttSession {
    type Error = SessionError;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<MessageId, SessionError> {
        let result = self.transmit(topic, payload).await;
        if let Err(err) = &result {
            println!("mqtt: session dropped err={:?}", err);
            self.reset();
        }
        result
    }
}

//! MQTT 3.1.1 framing for a publish-only client: CONNECT, CONNACK and
//! QoS 0 PUBLISH. Packets are written into caller-provided buffers.

use core::fmt;

pub const PROTOCOL_NAME: &[u8] = b"MQTT";
pub const PROTOCOL_LEVEL: u8 = 4;
pub const CONNACK_LEN: usize = 4;

const CLEAN_SESSION: u8 = 0x02;
const MAX_REMAINING_LENGTH: usize = 268_435_455;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketType {
    Connect = 1,
    Connack = 2,
    Publish = 3,
    Disconnect = 14,
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnackCode {
    Accepted = 0,
    UnacceptableProtocol = 1,
    IdentifierRejected = 2,
    ServerUnavailable = 3,
    BadCredentials = 4,
    NotAuthorized = 5,
}

impl ConnackCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Accepted),
            1 => Some(Self::UnacceptableProtocol),
            2 => Some(Self::IdentifierRejected),
            3 => Some(Self::ServerUnavailable),
            4 => Some(Self::BadCredentials),
            5 => Some(Self::NotAuthorized),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::UnacceptableProtocol => "unacceptable_protocol",
            Self::IdentifierRejected => "identifier_rejected",
            Self::ServerUnavailable => "server_unavailable",
            Self::BadCredentials => "bad_credentials",
            Self::NotAuthorized => "not_authorized",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MqttError {
    BufferTooSmall,
    StringTooLong,
    PacketTooLarge,
    MalformedConnack,
    Refused(ConnackCode),
}

impl MqttError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BufferTooSmall => "buffer_too_small",
            Self::StringTooLong => "string_too_long",
            Self::PacketTooLarge => "packet_too_large",
            Self::MalformedConnack => "malformed_connack",
            Self::Refused(_) => "refused",
        }
    }
}

impl fmt::Display for MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refused(code) => write!(f, "refused code={}", code.as_str()),
            other => f.write_str(other.as_str()),
        }
    }
}

struct PacketWriter<'b> {
    buf: &'b mut [u8],
    pos: usize,
}

impl<'b> PacketWriter<'b> {
    fn new(buf: &'b mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put_u8(&mut self, byte: u8) -> Result<(), MqttError> {
        self.put_bytes(&[byte])
    }

    fn put_u16(&mut self, value: u16) -> Result<(), MqttError> {
        self.put_bytes(&value.to_be_bytes())
    }

    fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), MqttError> {
        let end = self
            .pos
            .checked_add(bytes.len())
            .ok_or(MqttError::BufferTooSmall)?;
        let dst = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(MqttError::BufferTooSmall)?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn put_str(&mut self, value: &str) -> Result<(), MqttError> {
        let len = u16::try_from(value.len()).map_err(|_| MqttError::StringTooLong)?;
        self.put_u16(len)?;
        self.put_bytes(value.as_bytes())
    }

    fn put_remaining_length(&mut self, mut len: usize) -> Result<(), MqttError> {
        if len > MAX_REMAINING_LENGTH {
            return Err(MqttError::PacketTooLarge);
        }
        loop {
            let mut byte = (len % 128) as u8;
            len /= 128;
            if len > 0 {
                byte |= 0x80;
            }
            self.put_u8(byte)?;
            if len == 0 {
                return Ok(());
            }
        }
    }

    fn finish(self) -> usize {
        self.pos
    }
}

fn encoded_str_len(value: &str) -> usize {
    2 + value.len()
}

/// Writes a clean-session CONNECT without credentials. Returns the frame
/// length.
pub fn encode_connect(
    buf: &mut [u8],
    client_id: &str,
    keep_alive_secs: u16,
) -> Result<usize, MqttError> {
    let remaining = 2 + PROTOCOL_NAME.len() + 1 + 1 + 2 + encoded_str_len(client_id);

    let mut writer = PacketWriter::new(buf);
    writer.put_u8((PacketType::Connect as u8) << 4)?;
    writer.put_remaining_length(remaining)?;
    writer.put_u16(PROTOCOL_NAME.len() as u16)?;
    writer.put_bytes(PROTOCOL_NAME)?;
    writer.put_u8(PROTOCOL_LEVEL)?;
    writer.put_u8(CLEAN_SESSION)?;
    writer.put_u16(keep_alive_secs)?;
    writer.put_str(client_id)?;
    Ok(writer.finish())
}

/// Writes a QoS 0 PUBLISH. QoS 0 frames carry no packet identifier.
pub fn encode_publish(buf: &mut [u8], topic: &str, payload: &[u8]) -> Result<usize, MqttError> {
    let remaining = encoded_str_len(topic)
        .checked_add(payload.len())
        .ok_or(MqttError::PacketTooLarge)?;

    let mut writer = PacketWriter::new(buf);
    writer.put_u8((PacketType::Publish as u8) << 4)?;
    writer.put_remaining_length(remaining)?;
    writer.put_str(topic)?;
    writer.put_bytes(payload)?;
    Ok(writer.finish())
}

pub fn encode_disconnect(buf: &mut [u8]) -> Result<usize, MqttError> {
    let mut writer = PacketWriter::new(buf);
    writer.put_u8((PacketType::Disconnect as u8) << 4)?;
    writer.put_remaining_length(0)?;
    Ok(writer.finish())
}

/// Validates a CONNACK frame. Returns the session-present flag.
pub fn decode_connack(frame: &[u8]) -> Result<bool, MqttError> {
    let [header, remaining, flags, code] = frame else {
        return Err(MqttError::MalformedConnack);
    };
    if *header != (PacketType::Connack as u8) << 4 || *remaining != 2 || flags & !0x01 != 0 {
        return Err(MqttError::MalformedConnack);
    }
    match ConnackCode::from_byte(*code) {
        Some(ConnackCode::Accepted) => Ok(flags & 0x01 != 0),
        Some(refused) => Err(MqttError::Refused(refused)),
        None => Err(MqttError::MalformedConnack),
    }
}

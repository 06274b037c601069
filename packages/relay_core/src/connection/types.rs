use core::net::Ipv4Addr;

pub const MAX_RETRIES_DEFAULT: u8 = 3;
pub const MAX_RETRIES_CEILING: u8 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }

    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Connected | Self::Failed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Connected(Ipv4Addr),
    Failed { retries: u8 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectPolicy {
    pub max_retries: u8,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ConnectPolicy {
    pub const fn defaults() -> Self {
        Self {
            max_retries: MAX_RETRIES_DEFAULT,
        }
    }

    pub const fn with_max_retries(max_retries: u8) -> Self {
        Self { max_retries }.sanitized()
    }

    pub const fn sanitized(self) -> Self {
        Self {
            max_retries: if self.max_retries > MAX_RETRIES_CEILING {
                MAX_RETRIES_CEILING
            } else {
                self.max_retries
            },
        }
    }
}

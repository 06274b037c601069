use core::fmt::{self, Write as _};
use core::ops::Deref;

pub const PAYLOAD_MAX: usize = 1000;
pub const SAMPLE_BATCH_MAX: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadError {
    TooLarge,
    TooManySamples,
}

impl PayloadError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TooLarge => "too_large",
            Self::TooManySamples => "too_many_samples",
        }
    }
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque message body handed from acquisition to publishing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Payload {
    bytes: heapless::Vec<u8, PAYLOAD_MAX>,
}

impl Payload {
    pub const fn new() -> Self {
        Self {
            bytes: heapless::Vec::new(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        heapless::Vec::from_slice(bytes)
            .map(|bytes| Self { bytes })
            .map_err(|_| PayloadError::TooLarge)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Write for Payload {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.bytes
            .extend_from_slice(s.as_bytes())
            .map_err(|_| fmt::Error)
    }
}

/// One acquisition tick worth of raw samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reading {
    samples: heapless::Vec<u16, SAMPLE_BATCH_MAX>,
}

impl Reading {
    pub fn from_samples(samples: &[u16]) -> Result<Self, PayloadError> {
        heapless::Vec::from_slice(samples)
            .map(|samples| Self { samples })
            .map_err(|_| PayloadError::TooManySamples)
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Renders `{"seq":N,"uptime_ms":T,"samples":[a,b,...]}`.
    pub fn encode(&self, seq: u32, uptime_ms: u64) -> Result<Payload, PayloadError> {
        let mut payload = Payload::new();
        write!(payload, "{{\"seq\":{},\"uptime_ms\":{},\"samples\":[", seq, uptime_ms)
            .map_err(|_| PayloadError::TooLarge)?;
        for (index, sample) in self.samples.iter().enumerate() {
            let separator = if index == 0 { "" } else { "," };
            write!(payload, "{}{}", separator, sample).map_err(|_| PayloadError::TooLarge)?;
        }
        payload
            .write_str("]}")
            .map_err(|_| PayloadError::TooLarge)?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_reading_as_json_object() {
        let reading = Reading::from_samples(&[12, 4095, 0]).unwrap();
        let payload = reading.encode(7, 1_500).unwrap();
        assert_eq!(
            payload.as_bytes(),
            br#"{"seq":7,"uptime_ms":1500,"samples":[12,4095,0]}"#
        );
    }

    #[test]
    fn encodes_empty_batch() {
        let payload = Reading::default().encode(0, 0).unwrap();
        assert_eq!(&*payload, br#"{"seq":0,"uptime_ms":0,"samples":[]}"#);
    }

    #[test]
    fn full_batch_of_wide_samples_fits_payload() {
        let samples = [u16::MAX; SAMPLE_BATCH_MAX];
        let reading = Reading::from_samples(&samples).unwrap();
        let payload = reading.encode(u32::MAX, u64::MAX).unwrap();
        assert!(payload.len() <= PAYLOAD_MAX);
    }

    #[test]
    fn oversized_inputs_are_rejected() {
        assert_eq!(
            Reading::from_samples(&[0; SAMPLE_BATCH_MAX + 1]),
            Err(PayloadError::TooManySamples)
        );
        assert_eq!(
            Payload::from_slice(&[0; PAYLOAD_MAX + 1]),
            Err(PayloadError::TooLarge)
        );
        assert!(Payload::from_slice(&[0; PAYLOAD_MAX]).is_ok());
    }
}

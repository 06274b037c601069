//! Durable boot record kept in the last flash sector.
//!
//! Layout (little endian, 16 bytes):
//! `magic:u32 | version:u8 | boot_count:u32 | outcome:u8 | ipv4:[u8; 4] | 0xFF | checksum:u8`

use core::fmt;
use core::net::Ipv4Addr;

use embedded_storage::Storage;

pub const RECORD_MAGIC: u32 = 0x5941_4C52;
pub const RECORD_VERSION: u8 = 1;
pub const RECORD_LEN: usize = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LastOutcome {
    #[default]
    Unknown,
    Connected,
    Failed,
}

impl LastOutcome {
    pub const fn as_persisted(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Connected => 1,
            Self::Failed => 2,
        }
    }

    pub const fn from_persisted(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Unknown),
            1 => Some(Self::Connected),
            2 => Some(Self::Failed),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Connected => "connected",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootRecord {
    pub boot_count: u32,
    pub last_outcome: LastOutcome,
    pub last_ipv4: Option<Ipv4Addr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordFault {
    Blank,
    BadMagic,
    BadChecksum,
    UnsupportedVersion(u8),
    BadOutcome(u8),
}

impl RecordFault {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blank => "blank",
            Self::BadMagic => "bad_magic",
            Self::BadChecksum => "bad_checksum",
            Self::UnsupportedVersion(_) => "unsupported_version",
            Self::BadOutcome(_) => "bad_outcome",
        }
    }
}

impl BootRecord {
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut record = [0xFFu8; RECORD_LEN];
        record[0..4].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
        record[4] = RECORD_VERSION;
        record[5..9].copy_from_slice(&self.boot_count.to_le_bytes());
        record[9] = self.last_outcome.as_persisted();
        record[10..14].copy_from_slice(&self.last_ipv4.map_or([0; 4], |ip| ip.octets()));
        record[RECORD_LEN - 1] = checksum8(&record[..RECORD_LEN - 1]);
        record
    }

    pub fn decode(record: &[u8; RECORD_LEN]) -> Result<Self, RecordFault> {
        if record.iter().all(|&byte| byte == 0xFF) {
            return Err(RecordFault::Blank);
        }
        if u32::from_le_bytes([record[0], record[1], record[2], record[3]]) != RECORD_MAGIC {
            return Err(RecordFault::BadMagic);
        }
        if record[RECORD_LEN - 1] != checksum8(&record[..RECORD_LEN - 1]) {
            return Err(RecordFault::BadChecksum);
        }
        if record[4] != RECORD_VERSION {
            return Err(RecordFault::UnsupportedVersion(record[4]));
        }
        let last_outcome =
            LastOutcome::from_persisted(record[9]).ok_or(RecordFault::BadOutcome(record[9]))?;
        let octets = [record[10], record[11], record[12], record[13]];
        let last_ipv4 = if octets == [0; 4] {
            None
        } else {
            Some(Ipv4Addr::from(octets))
        };
        Ok(Self {
            boot_count: u32::from_le_bytes([record[5], record[6], record[7], record[8]]),
            last_outcome,
            last_ipv4,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum StoreError<E> {
    OutOfRange { offset: u32, capacity: usize },
    Io(E),
}

impl<E: fmt::Debug> fmt::Display for StoreError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { offset, capacity } => {
                write!(f, "out_of_range offset={} capacity={}", offset, capacity)
            }
            Self::Io(err) => write!(f, "io: {:?}", err),
        }
    }
}

/// How the stored record looked at bring-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BringUp {
    Loaded,
    Reinitialized(RecordFault),
}

pub struct BootStore<S> {
    storage: S,
    offset: u32,
    record: BootRecord,
}

impl<S> BootStore<S>
where
    S: Storage,
    S::Error: fmt::Debug,
{
    /// Loads the record, wiping it when unusable, and counts this boot.
    /// Only storage I/O failures are errors.
    pub fn bring_up(
        mut storage: S,
        offset: u32,
    ) -> Result<(Self, BringUp), StoreError<S::Error>> {
        let capacity = storage.capacity();
        match (offset as usize).checked_add(RECORD_LEN) {
            Some(end) if end <= capacity => {}
            _ => return Err(StoreError::OutOfRange { offset, capacity }),
        }

        let mut raw = [0u8; RECORD_LEN];
        storage.read(offset, &mut raw).map_err(StoreError::Io)?;

        let (mut record, status) = match BootRecord::decode(&raw) {
            Ok(record) => (record, BringUp::Loaded),
            Err(fault) => {
                log::warn!("store: record unusable fault={} reinitializing", fault.as_str());
                let blank = BootRecord::default();
                storage
                    .write(offset, &blank.encode())
                    .map_err(StoreError::Io)?;
                (blank, BringUp::Reinitialized(fault))
            }
        };

        record.boot_count = record.boot_count.wrapping_add(1);
        storage
            .write(offset, &record.encode())
            .map_err(StoreError::Io)?;
        log::info!(
            "store: ready boot_count={} last_outcome={}",
            record.boot_count,
            record.last_outcome.as_str()
        );

        Ok((
            Self {
                storage,
                offset,
                record,
            },
            status,
        ))
    }

    pub fn record(&self) -> BootRecord {
        self.record
    }

    pub fn record_outcome(
        &mut self,
        outcome: LastOutcome,
        ipv4: Option<Ipv4Addr>,
    ) -> Result<(), StoreError<S::Error>> {
        let mut next = self.record;
        next.last_outcome = outcome;
        next.last_ipv4 = ipv4;
        if next == self.record {
            return Ok(());
        }
        self.storage
            .write(self.offset, &next.encode())
            .map_err(StoreError::Io)?;
        self.record = next;
        Ok(())
    }
}

fn checksum8(bytes: &[u8]) -> u8 {
    let mut acc = 0x5Au8;
    for &byte in bytes {
        acc ^= byte.rotate_left(1);
    }
    acc
}

#[cfg(test)]
mod tests;

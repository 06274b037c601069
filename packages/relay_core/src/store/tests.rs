use core::net::Ipv4Addr;

use embedded_storage::{ReadStorage, Storage};

use super::*;

const FLASH_LEN: usize = 64;
const OFFSET: u32 = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FlashFault;

struct RamFlash {
    bytes: [u8; FLASH_LEN],
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl RamFlash {
    fn erased() -> Self {
        Self {
            bytes: [0xFF; FLASH_LEN],
            fail_reads: false,
            fail_writes: false,
            writes: 0,
        }
    }

    fn with_record(raw: [u8; RECORD_LEN]) -> Self {
        let mut flash = Self::erased();
        flash.bytes[OFFSET as usize..OFFSET as usize + RECORD_LEN].copy_from_slice(&raw);
        flash
    }

    fn stored(&self) -> [u8; RECORD_LEN] {
        let mut raw = [0u8; RECORD_LEN];
        raw.copy_from_slice(&self.bytes[OFFSET as usize..OFFSET as usize + RECORD_LEN]);
        raw
    }
}

impl ReadStorage for RamFlash {
    type Error = FlashFault;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        if self.fail_reads {
            return Err(FlashFault);
        }
        let start = offset as usize;
        bytes.copy_from_slice(&self.bytes[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        FLASH_LEN
    }
}

impl Storage for RamFlash {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(FlashFault);
        }
        let start = offset as usize;
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}

fn sample_record() -> BootRecord {
    BootRecord {
        boot_count: 41,
        last_outcome: LastOutcome::Connected,
        last_ipv4: Some(Ipv4Addr::new(192, 168, 1, 20)),
    }
}

#[test]
fn record_codec_keeps_fields() {
    let record = sample_record();
    assert_eq!(BootRecord::decode(&record.encode()), Ok(record));
}

#[test]
fn decode_classifies_damage() {
    assert_eq!(
        BootRecord::decode(&[0xFF; RECORD_LEN]),
        Err(RecordFault::Blank)
    );

    let mut raw = sample_record().encode();
    raw[0] ^= 0x01;
    assert_eq!(BootRecord::decode(&raw), Err(RecordFault::BadMagic));

    let mut raw = sample_record().encode();
    raw[6] ^= 0x10;
    assert_eq!(BootRecord::decode(&raw), Err(RecordFault::BadChecksum));

    let mut raw = sample_record().encode();
    raw[4] = RECORD_VERSION + 1;
    raw[RECORD_LEN - 1] = checksum8(&raw[..RECORD_LEN - 1]);
    assert_eq!(
        BootRecord::decode(&raw),
        Err(RecordFault::UnsupportedVersion(RECORD_VERSION + 1))
    );
}

#[test]
fn bring_up_on_erased_flash_initializes_record() {
    let (store, status) = BootStore::bring_up(RamFlash::erased(), OFFSET).unwrap();

    assert_eq!(status, BringUp::Reinitialized(RecordFault::Blank));
    assert_eq!(store.record().boot_count, 1);
    assert_eq!(store.record().last_outcome, LastOutcome::Unknown);
    assert_eq!(
        BootRecord::decode(&store.storage.stored()),
        Ok(store.record())
    );
}

#[test]
fn bring_up_counts_boots_on_valid_record() {
    let flash = RamFlash::with_record(sample_record().encode());
    let (store, status) = BootStore::bring_up(flash, OFFSET).unwrap();

    assert_eq!(status, BringUp::Loaded);
    assert_eq!(store.record().boot_count, 42);
    assert_eq!(store.record().last_outcome, LastOutcome::Connected);
    assert_eq!(store.storage.writes, 1);
}

#[test]
fn bring_up_wipes_corrupt_record() {
    let mut raw = sample_record().encode();
    raw[RECORD_LEN - 1] ^= 0xFF;
    let (store, status) = BootStore::bring_up(RamFlash::with_record(raw), OFFSET).unwrap();

    assert_eq!(status, BringUp::Reinitialized(RecordFault::BadChecksum));
    assert_eq!(store.record().boot_count, 1);
    assert_eq!(store.record().last_ipv4, None);
}

#[test]
fn bring_up_io_failures_are_errors() {
    let mut flash = RamFlash::erased();
    flash.fail_reads = true;
    assert!(matches!(
        BootStore::bring_up(flash, OFFSET),
        Err(StoreError::Io(FlashFault))
    ));

    let mut flash = RamFlash::erased();
    flash.fail_writes = true;
    assert!(matches!(
        BootStore::bring_up(flash, OFFSET),
        Err(StoreError::Io(FlashFault))
    ));

    assert!(matches!(
        BootStore::bring_up(RamFlash::erased(), FLASH_LEN as u32 - 4),
        Err(StoreError::OutOfRange { .. })
    ));
}

#[test]
fn record_outcome_writes_only_on_change() {
    let (mut store, _) = BootStore::bring_up(RamFlash::erased(), OFFSET).unwrap();
    let writes_after_bring_up = store.storage.writes;
    let ip = Ipv4Addr::new(10, 1, 2, 3);

    store
        .record_outcome(LastOutcome::Connected, Some(ip))
        .unwrap();
    store
        .record_outcome(LastOutcome::Connected, Some(ip))
        .unwrap();

    assert_eq!(store.storage.writes, writes_after_bring_up + 1);
    let persisted = BootRecord::decode(&store.storage.stored()).unwrap();
    assert_eq!(persisted.last_outcome, LastOutcome::Connected);
    assert_eq!(persisted.last_ipv4, Some(ip));
}

#[test]
fn bring_up_rejects_offset_at_end_of_address_space() {
    let mut flash = RamFlash::erased();
    flash.fail_reads = true;
    assert!(matches!(
        BootStore::bring_up(flash, u32::MAX),
        Err(StoreError::OutOfRange {
            offset: u32::MAX,
            capacity: FLASH_LEN
        })
    ));
}

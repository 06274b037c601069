use embedded_storage::ReadStorage;
use esp_println::println;
use esp_storage::FlashStorage;
use relay_core::store::{BootStore, BringUp};

pub(crate) type FlashBootStore = BootStore<FlashStorage<'static>>;

/// Opens the boot record in the last flash sector. Any storage fault here is
/// unrecoverable.
pub(crate) fn bring_up(flash_peripheral: esp_hal::peripherals::FLASH<'static>) -> FlashBootStore {
    let flash = FlashStorage::new(flash_peripheral).multicore_auto_park();
    let capacity = flash.capacity() as u32;
    let offset = capacity.saturating_sub(FlashStorage::SECTOR_SIZE);

    match BootStore::bring_up(flash, offset) {
        Ok((store, BringUp::Loaded)) => store,
        Ok((store, BringUp::Reinitialized(fault))) => {
            println!("storage: boot record reinitialized fault={}", fault.as_str());
            store
        }
        Err(err) => panic!("storage: bring-up failed err={}", err),
    }
}

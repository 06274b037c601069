mod boot_store;

pub(crate) use boot_store::{bring_up, FlashBootStore};

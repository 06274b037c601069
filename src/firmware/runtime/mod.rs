mod bootstrap;
mod status;
mod tasks;

pub use bootstrap::run;

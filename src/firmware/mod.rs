mod config;
mod mqtt;
mod runtime;
mod sampler;
mod storage;
mod wifi;

pub use runtime::run;

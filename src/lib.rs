#![forbid(unsafe_code)]

pub mod alerts;
pub mod logging;
pub mod snapshot;
pub mod store;
pub mod watchdog;

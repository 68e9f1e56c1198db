//! CLI command implementations

mod config;
mod devices;
mod record;

pub use config::{config, ConfigArgs};
pub use devices::devices;
pub use record::{record, RecordArgs};

mod client;
mod control;
mod error;
mod scrape;
mod types;
mod zone;

pub use client::{TccClient, TccClientBuilder};
pub use control::HoldEnd;
pub use error::{Error, Result};
pub use types::{FanMode, SystemMode, ZoneRecord};
pub use zone::Zone;

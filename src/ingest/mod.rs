pub mod codec;
pub mod controller;
pub mod loop_worker;

pub use codec::{decode, DecodeError};
pub use controller::{IngestionController, IngestionStats, MessageOutcome, StatsSnapshot};
pub use loop_worker::ingestion_loop;

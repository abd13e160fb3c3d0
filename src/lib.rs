pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod export;
pub mod locations;
pub mod logging;
pub mod pacing;
pub mod pipeline;
pub mod seen_set;
pub mod shutdown;
pub mod sources;
pub mod util;

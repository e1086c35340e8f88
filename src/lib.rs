//! Asynchronous content-authenticity analysis pipeline: a durable job queue
//! with leased workers, a circuit-broken client for the external detection
//! service, the score classification state machine, and the side-effect
//! fan-out that follows a finished analysis.

pub mod analysis;
pub mod classify;
pub mod content;
pub mod database;
pub mod detector;
pub mod fanout;
pub mod queue;
pub mod resilience;
pub mod settings;
pub mod utils;
pub mod worker;

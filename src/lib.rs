//! # txstream-rs
//!
//! Streaming anomaly detection for transaction values.
//!
//! A synthetic generator emits seasonal transaction amounts with occasional
//! extreme outliers. Each value is classified by an isolation forest, kept in
//! a fixed-size sliding window, and forwarded to presentation sinks. The
//! forest is refitted on the window contents every `retrain_period`
//! observations so it tracks seasonal drift.

pub mod config;
pub mod detector;
pub mod error;
pub mod history;
pub mod logging;
pub mod observation;
pub mod pipeline;
pub mod sink;
pub mod stream;
pub mod window;

pub use config::StreamConfig;
pub use detector::{IsolationForest, OutlierDetector};
pub use error::{Error, Result};
pub use observation::{Label, Observation};
pub use pipeline::{ControllerState, RunStats, StreamController};
pub use window::ObservationWindow;

//! LSTM autoencoder for multivariate telemetry anomaly detection.
//!
//! The model learns a compressed temporal representation of normal telemetry
//! and scores live windows by per-feature reconstruction error:
//!
//! - [`LstmAutoencoder`]: seq2seq encoder/decoder with a linear output head
//! - [`training::train`]: MSE reconstruction training with manual BPTT + Adam
//! - [`scoring::infer_anomalies`]: threshold-based per-metric severity scores
//! - [`ModelHandle`]: copy-on-write publication of retrained weights

mod autoencoder;
mod handle;
mod lstm;
pub mod scoring;
pub mod training;

pub use autoencoder::{ForwardTrace, LstmAutoencoder};
pub use handle::ModelHandle;
pub use lstm::{LstmLayer, StepCache};
pub use scoring::{infer_anomalies, per_feature_error, reconstruction_error, AnomalyScore};
pub use training::{train, AdamOptimizer, TrainingArtifacts, TrainingError};

/// One telemetry window shaped `(seq_len, features)`, row-major.
pub type Window = Vec<Vec<f64>>;

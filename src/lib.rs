//! Benign/malignant histopathology image classifier served over HTTP.
//!
//! One model instance is loaded at startup and shared read-only by every
//! request; `/predict` decodes an upload, runs the fixed preprocessing and a
//! single forward pass, and returns the class label.

pub mod config;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod model;
pub mod preprocess;
pub mod server;
pub mod utils;

pub use config::Config;
pub use error::{ModelError, PredictError};
pub use labels::{Label, CLASS_NAMES};
pub use model::{Classifier, InferenceEngine, TfModel};
pub use server::{build_router, AppState};

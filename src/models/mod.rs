//! Trained pipeline stages and the inference pipeline that chains them

pub mod bundle;
pub mod forest;
pub mod inference;
pub mod loader;
pub mod onnx;
pub mod stages;

pub use bundle::ArtifactBundle;
pub use inference::{InferencePipeline, PredictionResult};
pub use loader::ArtifactLoader;
pub use stages::{Classifier, FeatureSelector, Scaler};

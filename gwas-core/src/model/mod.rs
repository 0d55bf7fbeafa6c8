//! Fitted null model and its on-disk format.

pub mod null_model;
pub mod serialization;

pub use null_model::NullModel;
pub use serialization::{load_model, model_summary, save_model, save_model_json};

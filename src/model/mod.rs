pub mod config;
pub mod model_metadata;
pub mod model_storage;
pub mod inference_config;

pub use config::{AppConfig, DatasetSettings, DeviceType, EvaluationSettings, ModelSettings};
#[cfg(feature = "ml")]
pub use model_metadata::{ModelMetadata, Normalization};
#[cfg(feature = "ml")]
pub use model_storage::{save_model_with_metadata, load_model_with_metadata, print_metadata_info};
#[cfg(feature = "ml")]
pub use inference_config::InferenceConfig;

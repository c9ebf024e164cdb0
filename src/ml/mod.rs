pub mod ml_model;
pub mod normalization;
pub mod test_set;
pub mod evaluation;
pub mod inference;

pub use ml_model::{DeerClassifier, ModelConfig};
pub use normalization::{denormalize_image, denormalize_pixel, load_and_normalize_image, normalize_image, normalize_pixel};
pub use test_set::{build_test_loader, ImageBatch, ImageBatcher, ImageFolderDataset, ImageItem};
pub use evaluation::{
    evaluate, write_report, BinaryClassifier, EvaluationRecord, EvaluationReport, EvaluationSummary,
    MismatchDirectory, MismatchViewer, NoViewer,
};
pub use inference::{load_classifier, serialize_classifier, InferenceEngine};

//! 鹿/背景の画像分類データセット構築と学習済みモデルの評価

#![recursion_limit = "256"]

pub mod error;

// データセット構築
pub mod dataset;
pub mod model;
#[cfg(feature = "ml")]
pub mod ml;

pub use error::{Error, Result};

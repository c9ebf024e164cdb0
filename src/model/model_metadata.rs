//! モデルメタデータの定義と永続化
//!
//! tar.gz形式でモデルと関連するメタデータを保存・読み込みします。
//! 推論側はこのメタデータから入力サイズ・クラス順・正規化定数を取得します。

#[cfg(feature = "ml")]
use anyhow::{Context, Result};
#[cfg(feature = "ml")]
use serde::{Deserialize, Serialize};

/// 画素値の正規化定数 `pixel' = pixel * scale + offset`
#[cfg(feature = "ml")]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub scale: f32,
    pub offset: f32,
}

#[cfg(feature = "ml")]
impl Default for Normalization {
    /// [0, 255] -> [-1, 1]
    fn default() -> Self {
        Self {
            scale: 1.0 / 127.5,
            offset: -1.0,
        }
    }
}

/// モデルメタデータ
///
/// tar.gz形式で保存される情報：
/// - metadata.json: このメタデータ（JSON形式）
/// - model.bin: モデルの重み（バイナリ）
#[cfg(feature = "ml")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// クラスラベル（インデックス順）
    /// 例: ["background", "deer"]
    pub class_labels: Vec<String>,

    /// モデル入力サイズ（正方形、ピクセル）
    pub image_size: u32,

    /// 学習時に使用した正規化
    #[serde(default)]
    pub normalization: Normalization,

    /// ドロップアウト率（モデル構築用）
    #[serde(default)]
    pub dropout: f64,

    /// モデルの作成時刻（ISO8601形式）
    pub created_at: String,
}

#[cfg(feature = "ml")]
impl ModelMetadata {
    /// 新しいメタデータを作成
    pub fn new(class_labels: Vec<String>, image_size: u32, dropout: f64) -> Self {
        let created_at = chrono::Local::now().to_rfc3339();

        Self {
            class_labels,
            image_size,
            normalization: Normalization::default(),
            dropout,
            created_at,
        }
    }

    /// メタデータをJSON文字列に変換
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize metadata to JSON")
    }

    /// JSON文字列からメタデータを生成
    pub fn from_json_string(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize metadata from JSON")
    }
}

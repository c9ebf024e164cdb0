//! アプリケーション設定管理モジュール
//!
//! 計算デバイス、モデルの場所、データセット構築・評価の既定値をJSON形式で保存・読み込みします。
//! コマンドライン引数で指定された値はこの設定より優先されます。

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// 計算デバイスの種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, clap::ValueEnum)]
pub enum DeviceType {
    /// WGPU (GPU) バックエンド
    Wgpu,
    /// NdArray (CPU) バックエンド
    Cpu,
}

impl Default for DeviceType {
    fn default() -> Self {
        DeviceType::Wgpu
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
        }
    }
}

/// モデル設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// 学習済みモデル（tar.gz）のパス
    pub model_path: String,
    /// 評価時のバッチサイズ
    pub batch_size: usize,
    /// Deer と判定する確率のしきい値
    pub threshold: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_path: "model_checkpoints/deer_classifier.tar.gz".to_string(),
            batch_size: 32,
            threshold: 0.5,
        }
    }
}

/// データセット構築設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSettings {
    /// 鹿画像のディレクトリ
    pub deer_images: String,
    /// 背景画像のディレクトリ
    pub background_images: String,
    /// train,validation,test の百分率
    pub train_val_test: String,
    /// 出力先ルート
    pub output_root: String,
    /// シャッフル用シード（未指定ならOSの乱数）
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            deer_images: "../datasets/deer".to_string(),
            background_images: "../datasets/landscape".to_string(),
            train_val_test: "70,20,10".to_string(),
            output_root: "datasets".to_string(),
            seed: None,
        }
    }
}

/// 評価設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSettings {
    /// 評価対象ディレクトリ（クラスごとのサブディレクトリ構成）
    pub dataset_dir: String,
    /// 誤分類画像の書き出し先（未指定なら書き出さない）
    #[serde(default)]
    pub mismatch_dir: Option<String>,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            dataset_dir: "datasets/test".to_string(),
            mismatch_dir: None,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 計算デバイスの種類
    #[serde(default)]
    pub device_type: DeviceType,
    /// モデル設定
    #[serde(default)]
    pub model: ModelSettings,
    /// データセット構築設定
    #[serde(default)]
    pub dataset: DatasetSettings,
    /// 評価設定
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("deer_notdeer.json")
    }

    /// 設定を読み込む
    ///
    /// 読み込めない場合は `Io`、JSONとして解釈できない場合は `MalformedConfig`。
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            Error::MalformedConfig(format!("failed to parse config {}: {}", path.display(), e))
        })?;
        Ok(config)
    }

    /// 指定パス（なければデフォルトパス）から読み込む
    ///
    /// パスが明示された場合は読み込み失敗をエラーとして返す。
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let config = Self::load(path)?;
                info!("設定ファイルを読み込みました: {}", path.display());
                Ok(config)
            }
            None => Self::load_or_default(&Self::default_path()),
        }
    }

    /// 設定ファイルがあれば読み込み、なければデフォルト設定を返す
    ///
    /// ファイルが存在するのに解釈できない場合はエラー。
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let config = Self::load(path)?;
            info!("設定ファイルを読み込みました: {}", path.display());
            Ok(config)
        } else {
            info!("設定ファイルが存在しません。デフォルト設定を使用します");
            Ok(Self::default())
        }
    }

    /// 設定情報を表示
    pub fn display(&self) {
        info!("=== アプリケーション設定 ===");
        info!("計算デバイス: {}", self.device_type);
        info!("モデルパス: {}", self.model.model_path);
        info!("バッチサイズ: {}", self.model.batch_size);
        info!("しきい値: {}", self.model.threshold);
        info!("評価データ: {}", self.evaluation.dataset_dir);
        if let Some(ref dir) = self.evaluation.mismatch_dir {
            info!("誤分類画像の出力先: {}", dir);
        }
        info!("========================");
    }
}

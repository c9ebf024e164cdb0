//! ライブラリ共通のエラー定義

use std::path::PathBuf;
use thiserror::Error;

/// データセット構築・評価で発生するエラー
#[derive(Debug, Error)]
pub enum Error {
    /// 入力ディレクトリやモデルファイルが存在しない
    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// 分割比率や設定ファイルの内容が不正
    #[error("malformed configuration: {0}")]
    MalformedConfig(String),

    /// ファイル操作の失敗
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 画像デコードや推論結果の取り出しに失敗
    #[error("inference failed: {0}")]
    Inference(String),

    /// 評価対象の画像が1枚もない
    #[error("no images found under {}", .0.display())]
    EmptyDataset(PathBuf),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

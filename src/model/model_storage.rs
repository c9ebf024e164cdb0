//! モデルとメタデータの永続化
//!
//! Tar.gz形式でモデルとメタデータを1ファイルに統合して保存・読み込みします。
//!
//! ファイル構成（tar.gz内部）:
//! - metadata.json   - メタデータ（クラス順、入力サイズ、正規化）
//! - model.bin       - モデルの重み（バイナリ）

#[cfg(feature = "ml")]
use anyhow::{Context, Result};
#[cfg(feature = "ml")]
use std::path::Path;
#[cfg(feature = "ml")]
use std::fs::File;
#[cfg(feature = "ml")]
use std::io::Read;
#[cfg(feature = "ml")]
use tar::{Builder, Archive};
#[cfg(feature = "ml")]
use flate2::Compression;
#[cfg(feature = "ml")]
use flate2::write::GzEncoder;
#[cfg(feature = "ml")]
use flate2::read::GzDecoder;

#[cfg(feature = "ml")]
use crate::model::model_metadata::ModelMetadata;

#[cfg(feature = "ml")]
const METADATA_ENTRY: &str = "metadata.json";
#[cfg(feature = "ml")]
const MODEL_ENTRY: &str = "model.bin";

/// メタデータと共にモデルをTar.gz形式で保存
///
/// 1つのtar.gzファイルに以下を含む：
/// - metadata.json : メタデータ
/// - model.bin : モデルの重み
#[cfg(feature = "ml")]
pub fn save_model_with_metadata(
    output_path: &Path,
    metadata: &ModelMetadata,
    model_binary: &[u8],
) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create parent directory: {:?}", parent))?;
    }

    let tar_gz_file = File::create(output_path)
        .context(format!("Failed to create tar.gz file: {:?}", output_path))?;

    // Gzip圧縮を設定
    let encoder = GzEncoder::new(tar_gz_file, Compression::default());
    let mut tar_builder = Builder::new(encoder);

    let json_str = metadata.to_json_string()?;
    append_entry(&mut tar_builder, METADATA_ENTRY, json_str.as_bytes())?;
    append_entry(&mut tar_builder, MODEL_ENTRY, model_binary)?;

    // gzipストリームまで閉じる
    tar_builder
        .into_inner()
        .context("Failed to finalize tar archive")?
        .finish()
        .context("Failed to finalize gzip stream")?;

    Ok(())
}

#[cfg(feature = "ml")]
fn append_entry<W: std::io::Write>(builder: &mut Builder<W>, name: &str, bytes: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_path(name)?;
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append(&header, bytes)
        .context(format!("Failed to add {} to tar", name))
}

/// メタデータとモデルバイナリを共に読み込む
#[cfg(feature = "ml")]
pub fn load_model_with_metadata(tar_gz_path: &Path) -> Result<(ModelMetadata, Vec<u8>)> {
    match read_entries(tar_gz_path)? {
        (Some(metadata), Some(binary)) => Ok((metadata, binary)),
        (None, _) => Err(anyhow::anyhow!("metadata.json not found in tar.gz archive")),
        (_, None) => Err(anyhow::anyhow!("model.bin not found in tar.gz archive")),
    }
}

#[cfg(feature = "ml")]
fn read_entries(tar_gz_path: &Path) -> Result<(Option<ModelMetadata>, Option<Vec<u8>>)> {
    let tar_gz_file = File::open(tar_gz_path)
        .context(format!("Failed to open tar.gz file: {:?}", tar_gz_path))?;

    let decoder = GzDecoder::new(tar_gz_file);
    let mut archive = Archive::new(decoder);

    let mut metadata_opt: Option<ModelMetadata> = None;
    let mut model_binary_opt: Option<Vec<u8>> = None;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();

        match name.as_str() {
            METADATA_ENTRY => {
                let mut json_str = String::new();
                entry.read_to_string(&mut json_str)?;
                metadata_opt = Some(ModelMetadata::from_json_string(&json_str)?);
            }
            MODEL_ENTRY => {
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer)?;
                model_binary_opt = Some(buffer);
            }
            _ => {}
        }
    }

    Ok((metadata_opt, model_binary_opt))
}

/// メタデータをログに表示
#[cfg(feature = "ml")]
pub fn print_metadata_info(metadata: &ModelMetadata) {
    log::info!("=== モデルメタデータ ===");
    log::info!("クラスラベル: {}", metadata.class_labels.join(", "));
    log::info!("モデル入力サイズ: {}x{}", metadata.image_size, metadata.image_size);
    log::info!(
        "正規化: scale={}, offset={}",
        metadata.normalization.scale, metadata.normalization.offset
    );
    log::info!("作成日時: {}", metadata.created_at);
    log::info!("========================");
}

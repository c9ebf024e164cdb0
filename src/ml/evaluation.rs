//! テストデータでの評価とレポート
//!
//! データローダーを1回だけ走査して、損失・正解率・画像ごとの予測をまとめて集計します。
//! レポートは集計後に書き出すため、正解率を先頭に表示しつつ各画像の行を走査順で出力できます。

use std::io::Write;
use std::path::{Path, PathBuf};

use burn::data::dataloader::DataLoader;
use burn::tensor::{backend::Backend, Tensor};
use image::RgbImage;
use log::info;

use crate::dataset::ClassLabel;
use crate::error::{Error, Result};
use crate::ml::normalization::denormalize_image;
use crate::ml::test_set::ImageBatch;

/// 確率のクリップ幅（log(0) 回避）
const EPSILON: f64 = 1e-7;

/// 二値分類器
///
/// 正規化済み画像バッチから、各画像が Deer である確率を返す。
pub trait BinaryClassifier<B: Backend> {
    fn predict_proba(&self, images: Tensor<B, 4>) -> Result<Vec<f32>>;
}

/// 1画像分の評価結果
#[derive(Debug, Clone)]
pub struct EvaluationRecord {
    pub path: PathBuf,
    pub label: ClassLabel,
    pub probability: f32,
    pub predicted: ClassLabel,
    /// 誤分類時のみ、正規化を戻した画像
    pub image: Option<RgbImage>,
}

impl EvaluationRecord {
    pub fn is_mismatch(&self) -> bool {
        self.label != self.predicted
    }
}

/// 集計結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationSummary {
    /// 平均バイナリクロスエントロピー
    pub loss: f64,
    pub accuracy: f64,
    pub num_examples: usize,
    pub num_mismatches: usize,
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub summary: EvaluationSummary,
    pub records: Vec<EvaluationRecord>,
}

/// 誤分類画像の表示先
///
/// `show` が戻るまで次の画像の処理は行われない。
pub trait MismatchViewer {
    fn show(&mut self, record: &EvaluationRecord, image: &RgbImage) -> Result<()>;
}

/// 何も表示しない
pub struct NoViewer;

impl MismatchViewer for NoViewer {
    fn show(&mut self, _record: &EvaluationRecord, _image: &RgbImage) -> Result<()> {
        Ok(())
    }
}

/// 誤分類画像をPNGとしてディレクトリに書き出す
pub struct MismatchDirectory {
    dir: PathBuf,
    written: usize,
}

impl MismatchDirectory {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl MismatchViewer for MismatchDirectory {
    fn show(&mut self, record: &EvaluationRecord, image: &RgbImage) -> Result<()> {
        let stem = record
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let out = self.dir.join(format!("{:04}_{}.png", self.written, stem));
        image
            .save(&out)
            .map_err(|e| Error::io(&out, std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        info!(
            "誤分類画像を保存しました: {} (label={}, p={:.3})",
            out.display(),
            record.label,
            record.probability
        );
        self.written += 1;
        Ok(())
    }
}

fn binary_cross_entropy(probability: f32, label: ClassLabel) -> f64 {
    let p = (probability as f64).clamp(EPSILON, 1.0 - EPSILON);
    match label {
        ClassLabel::Deer => -p.ln(),
        ClassLabel::Background => -(1.0 - p).ln(),
    }
}

/// データローダーを1回走査して評価する
pub fn evaluate<B, M>(
    model: &M,
    loader: &dyn DataLoader<B, ImageBatch<B>>,
    threshold: f32,
    dataset_root: &Path,
) -> Result<EvaluationReport>
where
    B: Backend,
    M: BinaryClassifier<B> + ?Sized,
{
    let mut records = Vec::new();
    let mut total_loss = 0.0f64;
    let mut correct = 0usize;

    for batch in loader.iter() {
        if let Some((path, reason)) = batch.failures.first() {
            return Err(Error::Inference(format!(
                "failed to decode {}: {}",
                path.display(),
                reason
            )));
        }

        let [_, channels, height, width] = batch.images.dims();
        let per_image = channels * height * width;
        let probabilities = model.predict_proba(batch.images.clone())?;
        if probabilities.len() != batch.labels.len() {
            return Err(Error::Inference(format!(
                "model returned {} predictions for a batch of {}",
                probabilities.len(),
                batch.labels.len()
            )));
        }

        // 誤分類があったバッチだけ画素データをホストへ取り出す
        let mut pixels: Option<Vec<f32>> = None;

        for (i, (path, &probability)) in batch.paths.iter().zip(&probabilities).enumerate() {
            let label = ClassLabel::from_index(batch.labels[i]).ok_or_else(|| {
                Error::Inference(format!("unknown class index {}", batch.labels[i]))
            })?;
            let predicted = ClassLabel::from_probability(probability, threshold);

            total_loss += binary_cross_entropy(probability, label);

            let image = if predicted == label {
                correct += 1;
                None
            } else {
                if pixels.is_none() {
                    let data = batch
                        .images
                        .clone()
                        .into_data()
                        .to_vec::<f32>()
                        .map_err(|e| Error::Inference(format!("画素データの取得エラー: {:?}", e)))?;
                    pixels = Some(data);
                }
                pixels
                    .as_deref()
                    .and_then(|data| data.get(i * per_image..(i + 1) * per_image))
                    .and_then(|chw| denormalize_image(chw, width, height))
            };

            records.push(EvaluationRecord {
                path: path.clone(),
                label,
                probability,
                predicted,
                image,
            });
        }
    }

    if records.is_empty() {
        return Err(Error::EmptyDataset(dataset_root.to_path_buf()));
    }

    let num_examples = records.len();
    let summary = EvaluationSummary {
        loss: total_loss / num_examples as f64,
        accuracy: correct as f64 / num_examples as f64,
        num_examples,
        num_mismatches: num_examples - correct,
    };

    Ok(EvaluationReport { summary, records })
}

/// レポートを書き出す
///
/// 損失と正解率を先頭に1回だけ出力し、その後に各画像の予測を走査順で出力する。
/// 誤分類の行の直後に `viewer` を呼び出す。
pub fn write_report<W, V>(report: &EvaluationReport, out: &mut W, viewer: &mut V) -> Result<()>
where
    W: Write,
    V: MismatchViewer + ?Sized,
{
    let report_err = |e| Error::io("<report>", e);

    writeln!(out, "Test loss: {:.3}", report.summary.loss).map_err(report_err)?;
    writeln!(out, "Test accuracy: {:.3}", report.summary.accuracy).map_err(report_err)?;

    for record in &report.records {
        writeln!(out, "Label: {}, Pred: {}", record.label, record.predicted).map_err(report_err)?;

        if let Some(ref image) = record.image {
            out.flush().map_err(report_err)?;
            viewer.show(record, image)?;
        }
    }

    out.flush().map_err(report_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bce_is_clamped() {
        assert!(binary_cross_entropy(0.0, ClassLabel::Deer).is_finite());
        assert!(binary_cross_entropy(1.0, ClassLabel::Background).is_finite());
        assert!((binary_cross_entropy(0.9, ClassLabel::Deer) - 0.105_360_5).abs() < 1e-6);
    }

    struct Recording(Vec<PathBuf>);

    impl MismatchViewer for Recording {
        fn show(&mut self, record: &EvaluationRecord, _image: &RgbImage) -> Result<()> {
            self.0.push(record.path.clone());
            Ok(())
        }
    }

    #[test]
    fn test_report_prints_summary_first_and_calls_viewer_on_mismatch() {
        let record = |name: &str, label, predicted, image| EvaluationRecord {
            path: PathBuf::from(name),
            label,
            probability: 0.9,
            predicted,
            image,
        };
        let report = EvaluationReport {
            summary: EvaluationSummary { loss: 1.2, accuracy: 0.5, num_examples: 2, num_mismatches: 1 },
            records: vec![
                record("bg.png", ClassLabel::Background, ClassLabel::Deer, Some(RgbImage::new(2, 2))),
                record("deer.png", ClassLabel::Deer, ClassLabel::Deer, None),
            ],
        };

        let mut out = Vec::new();
        let mut viewer = Recording(Vec::new());
        write_report(&report, &mut out, &mut viewer).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Test loss: 1.200",
                "Test accuracy: 0.500",
                "Label: Background, Pred: Deer",
                "Label: Deer, Pred: Deer",
            ]
        );
        assert_eq!(viewer.0, vec![PathBuf::from("bg.png")]);
    }
}

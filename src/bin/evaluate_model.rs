//! 学習済みモデルをテストデータで評価する
//!
//! 使い方:
//!
//! evaluate_model --dataset ./datasets/test
//!
//! evaluate_model --model ./model_checkpoints/deer_classifier.tar.gz --device cpu --mismatch-dir ./mismatches

use std::path::PathBuf;

use clap::Parser;
use log::info;

use deer_notdeer::ml::{write_report, InferenceEngine, MismatchDirectory, MismatchViewer, NoViewer};
use deer_notdeer::model::{AppConfig, DeviceType};

#[derive(Parser, Debug)]
#[command(name = "evaluate_model", about = "Evaluate a trained deer/background classifier on a dataset")]
struct Args {
    /// Path to input dataset (class subdirectories).
    #[arg(long)]
    dataset: Option<String>,
    /// Path to the model bundle (.tar.gz).
    #[arg(long)]
    model: Option<String>,
    /// Compute device.
    #[arg(long, value_enum)]
    device: Option<DeviceType>,
    /// Batch size.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Probability threshold for the Deer class.
    #[arg(long)]
    threshold: Option<f32>,
    /// Write misclassified images to this directory.
    #[arg(long)]
    mismatch_dir: Option<String>,
    /// Config file (defaults to deer_notdeer.json when present).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    /// 指定されたフラグで設定ファイルの値を上書き
    fn apply(self, config: &mut AppConfig) {
        if let Some(dataset) = self.dataset {
            config.evaluation.dataset_dir = dataset;
        }
        if let Some(model) = self.model {
            config.model.model_path = model;
        }
        if let Some(device) = self.device {
            config.device_type = device;
        }
        if let Some(batch_size) = self.batch_size {
            config.model.batch_size = batch_size;
        }
        if let Some(threshold) = self.threshold {
            config.model.threshold = threshold;
        }
        if self.mismatch_dir.is_some() {
            config.evaluation.mismatch_dir = self.mismatch_dir;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = AppConfig::resolve(args.config.as_deref())?;

    args.apply(&mut config);
    config.display();

    let engine = InferenceEngine::load(
        &PathBuf::from(&config.model.model_path),
        config.device_type,
        config.model.batch_size,
        config.model.threshold,
    )?;
    engine.config().print_info();

    let dataset_dir = PathBuf::from(&config.evaluation.dataset_dir);
    let report = engine.evaluate_directory(&dataset_dir)?;

    let mut viewer: Box<dyn MismatchViewer> = match config.evaluation.mismatch_dir {
        Some(ref dir) => Box::new(MismatchDirectory::new(dir)?),
        None => Box::new(NoViewer),
    };

    let stdout = std::io::stdout();
    write_report(&report, &mut stdout.lock(), viewer.as_mut())?;

    info!(
        "評価完了: {} 枚中 {} 枚を誤分類",
        report.summary.num_examples, report.summary.num_mismatches
    );

    Ok(())
}

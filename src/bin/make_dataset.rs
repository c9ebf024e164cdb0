//! ソース画像から train/validation/test データセットを作成する
//!
//! 使い方:
//!
//! make_dataset --deer-images ../datasets/deer --background-images ../datasets/landscape --train-val-test 70,20,10

use std::path::PathBuf;

use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use deer_notdeer::dataset::{ClassLabel, DatasetBuilder, DatasetLayout, SplitPercentages};
use deer_notdeer::model::{AppConfig, DatasetSettings};

#[derive(Parser, Debug)]
#[command(name = "make_dataset", about = "Make a local deer/background dataset from source images")]
struct Args {
    /// Path to deer images.
    #[arg(long)]
    deer_images: Option<String>,
    /// Path to background images.
    #[arg(long)]
    background_images: Option<String>,
    /// Percentage split between train, validation and test (e.g. "70,20,10").
    #[arg(long)]
    train_val_test: Option<String>,
    /// Dataset output root.
    #[arg(long)]
    output: Option<String>,
    /// Seed for the shuffle (random when omitted).
    #[arg(long)]
    seed: Option<u64>,
    /// Config file (defaults to deer_notdeer.json when present).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    /// 指定されたフラグで設定ファイルの値を上書き
    fn merge(self, config: DatasetSettings) -> DatasetSettings {
        DatasetSettings {
            deer_images: self.deer_images.unwrap_or(config.deer_images),
            background_images: self.background_images.unwrap_or(config.background_images),
            train_val_test: self.train_val_test.unwrap_or(config.train_val_test),
            output_root: self.output.unwrap_or(config.output_root),
            seed: self.seed.or(config.seed),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let file_config = AppConfig::resolve(args.config.as_deref())?.dataset;
    let settings = args.merge(file_config);

    let percentages: SplitPercentages = settings.train_val_test.parse()?;

    let mut rng = match settings.seed {
        Some(seed) => {
            info!("シード {} でシャッフルします", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let builder = DatasetBuilder::new(DatasetLayout::new(&settings.output_root))
        .source(ClassLabel::Deer, &settings.deer_images)
        .source(ClassLabel::Background, &settings.background_images);

    let summary = builder.build(&percentages, &mut rng)?;
    summary.print();
    info!("データセットを作成しました: {}", builder.layout().root().display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults_without_flags() {
        let args = Args::try_parse_from(["make_dataset"]).unwrap();
        let settings = args.merge(DatasetSettings::default());
        assert_eq!(settings.deer_images, "../datasets/deer");
        assert_eq!(settings.background_images, "../datasets/landscape");
        assert_eq!(settings.train_val_test, "70,20,10");
        assert_eq!(settings.output_root, "datasets");
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn test_flags_override_config_file() {
        let file_config = DatasetSettings {
            deer_images: "from_file/deer".to_string(),
            background_images: "from_file/bg".to_string(),
            train_val_test: "60,20,20".to_string(),
            output_root: "from_file/out".to_string(),
            seed: Some(1),
        };
        let args = Args::try_parse_from([
            "make_dataset",
            "--deer-images",
            "cli/deer",
            "--train-val-test",
            "80,10,10",
            "--seed",
            "9",
        ])
        .unwrap();

        let settings = args.merge(file_config);
        assert_eq!(settings.deer_images, "cli/deer");
        assert_eq!(settings.background_images, "from_file/bg");
        assert_eq!(settings.train_val_test, "80,10,10");
        assert_eq!(settings.output_root, "from_file/out");
        assert_eq!(settings.seed, Some(9));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["make_dataset", "--deer", "x"]).is_err());
    }
}

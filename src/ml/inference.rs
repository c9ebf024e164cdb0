//! モデル推論機能

use std::path::Path;

use anyhow::Result;
use burn::{
    backend::Wgpu,
    module::Module,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
    tensor::{backend::Backend, Tensor},
};
use burn_ndarray::{NdArray, NdArrayDevice};
use burn_wgpu::WgpuDevice;
use log::info;

use crate::error::Error;
use crate::ml::evaluation::{evaluate, BinaryClassifier, EvaluationReport};
use crate::ml::ml_model::{DeerClassifier, ModelConfig};
use crate::ml::test_set::{build_test_loader, ImageFolderDataset};
use crate::model::{load_model_with_metadata, print_metadata_info, DeviceType, InferenceConfig};

impl<B: Backend> BinaryClassifier<B> for DeerClassifier<B> {
    fn predict_proba(&self, images: Tensor<B, 4>) -> crate::error::Result<Vec<f32>> {
        self.forward_proba(images)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| Error::Inference(format!("推論結果の取得エラー: {:?}", e)))
    }
}

/// モデルの重みをバイナリに変換
pub fn serialize_classifier<B: Backend>(model: DeerClassifier<B>) -> crate::error::Result<Vec<u8>> {
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    Recorder::<B>::record(&recorder, model.into_record(), ())
        .map_err(|e| Error::Inference(format!("モデル重みの書き出しエラー: {:?}", e)))
}

/// バイナリから重みを復元
pub fn load_classifier<B: Backend>(
    model_config: &ModelConfig,
    model_binary: Vec<u8>,
    device: &B::Device,
) -> crate::error::Result<DeerClassifier<B>> {
    model_config.validate()?;

    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let record = Recorder::<B>::load(&recorder, model_binary, device)
        .map_err(|e| Error::MalformedConfig(format!("モデル重みの読み込みエラー: {:?}", e)))?;

    Ok(model_config.init::<B>(device).load_record(record))
}

/// 推論エンジン
pub enum InferenceEngine {
    Wgpu {
        model: DeerClassifier<Wgpu>,
        device: WgpuDevice,
        config: InferenceConfig,
    },
    NdArray {
        model: DeerClassifier<NdArray>,
        device: NdArrayDevice,
        config: InferenceConfig,
    },
}

impl InferenceEngine {
    /// モデルを読み込んで推論エンジンを初期化
    pub fn load(
        model_path: &Path,
        device_type: DeviceType,
        batch_size: usize,
        threshold: f32,
    ) -> Result<Self> {
        if !model_path.is_file() {
            return Err(Error::MissingInput(model_path.to_path_buf()).into());
        }

        let (metadata, model_binary) = load_model_with_metadata(model_path)?;
        print_metadata_info(&metadata);

        let config = InferenceConfig::from_metadata(&metadata, batch_size, threshold)?;
        let model_config = ModelConfig {
            image_size: metadata.image_size as usize,
            dropout: metadata.dropout,
        };

        info!("使用デバイス: {}", device_type);
        let engine = match device_type {
            DeviceType::Wgpu => {
                let device = WgpuDevice::default();
                let model = load_classifier::<Wgpu>(&model_config, model_binary, &device)?;
                info!("モデルパラメータ数: {}", model.num_params());
                Self::Wgpu { model, device, config }
            }
            DeviceType::Cpu => {
                let device = NdArrayDevice::Cpu;
                let model = load_classifier::<NdArray>(&model_config, model_binary, &device)?;
                info!("モデルパラメータ数: {}", model.num_params());
                Self::NdArray { model, device, config }
            }
        };

        Ok(engine)
    }

    /// InferenceConfigへの参照を取得
    pub fn config(&self) -> &InferenceConfig {
        match self {
            Self::Wgpu { config, .. } | Self::NdArray { config, .. } => config,
        }
    }

    /// クラス別ディレクトリの画像を評価
    pub fn evaluate_directory(&self, dataset_dir: &Path) -> crate::error::Result<EvaluationReport> {
        match self {
            Self::Wgpu { model, device, config } => {
                evaluate_with::<Wgpu>(model, device, config, dataset_dir)
            }
            Self::NdArray { model, device, config } => {
                evaluate_with::<NdArray>(model, device, config, dataset_dir)
            }
        }
    }
}

fn evaluate_with<B: Backend>(
    model: &DeerClassifier<B>,
    device: &B::Device,
    config: &InferenceConfig,
    dataset_dir: &Path,
) -> crate::error::Result<EvaluationReport> {
    let dataset = ImageFolderDataset::from_directory(dataset_dir)?;
    let loader = build_test_loader::<B>(dataset, config.image_size, config.batch_size, device.clone());
    evaluate(model, loader.as_ref(), config.threshold, dataset_dir)
}

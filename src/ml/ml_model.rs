//! 機械学習モデルの共通定義
//!
//! 鹿/背景の二値分類用CNNモデルと関連する設定を提供します。

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
    },
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};

use crate::error::Error;

/// 最終畳み込み層のチャネル数
const FEATURE_CHANNELS: usize = 128;

/// モデル設定
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 入力画像サイズ（正方形）
    #[config(default = 224)]
    pub image_size: usize,
    /// ドロップアウト率
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl ModelConfig {
    /// 最終畳み込み層の特徴マップサイズ
    ///
    /// Conv (3x3, no padding) で2減少、Pool (2x2) で半分。
    pub fn feature_map_size(&self) -> usize {
        let after_conv1 = self.image_size.saturating_sub(2);
        let after_pool1 = after_conv1 / 2;
        let after_conv2 = after_pool1.saturating_sub(2);
        let after_pool2 = after_conv2 / 2;
        after_pool2.saturating_sub(2)
    }

    /// 入力サイズが小さすぎないか確認
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.feature_map_size() == 0 {
            return Err(Error::MalformedConfig(format!(
                "入力サイズが小さすぎます: {} (最小18x18が必要)",
                self.image_size
            )));
        }
        Ok(())
    }

    /// モデルを初期化
    pub fn init<B: Backend>(&self, device: &B::Device) -> DeerClassifier<B> {
        log::debug!(
            "[Model] 入力サイズ: {}x{}, 特徴マップ: {} x {}x{}",
            self.image_size,
            self.image_size,
            FEATURE_CHANNELS,
            self.feature_map_size(),
            self.feature_map_size()
        );

        DeerClassifier {
            conv1: Conv2dConfig::new([3, 32], [3, 3]).init(device),
            conv2: Conv2dConfig::new([32, 64], [3, 3]).init(device),
            conv3: Conv2dConfig::new([64, FEATURE_CHANNELS], [3, 3]).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            dropout: DropoutConfig::new(self.dropout).init(),
            fc: LinearConfig::new(FEATURE_CHANNELS, 1).init(device),
            activation: Relu::new(),
        }
    }
}

/// 鹿/背景分類用CNNモデル
///
/// # アーキテクチャ
/// - {Conv 3x3 + ReLU + MaxPool 2x2} x 2層
/// - Conv 3x3 + ReLU
/// - Global Average Pooling
/// - FC: 128 -> 1 (ロジット)
/// - Sigmoid (確率出力時)
#[derive(Module, Debug)]
pub struct DeerClassifier<B: Backend> {
    conv1: Conv2d<B>, // 3 -> 32
    conv2: Conv2d<B>, // 32 -> 64
    conv3: Conv2d<B>, // 64 -> 128
    pool: MaxPool2d,
    global_pool: AdaptiveAvgPool2d,
    dropout: Dropout,
    fc: Linear<B>,
    activation: Relu,
}

impl<B: Backend> DeerClassifier<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `images`: バッチ画像 [batch_size, 3, size, size]
    ///
    /// # 戻り値
    /// - Deer クラスのロジット [batch_size, 1]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);

        let x = self.conv3.forward(x);
        let x = self.activation.forward(x);

        // [batch_size, 128, 1, 1] -> [batch_size, 128]
        let x = self.global_pool.forward(x);
        let x = x.reshape([batch_size, FEATURE_CHANNELS]);
        let x = self.dropout.forward(x);

        self.fc.forward(x)
    }

    /// Deer である確率 [batch_size]
    pub fn forward_proba(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        let [batch_size, _, _, _] = images.dims();
        sigmoid(self.forward(images)).reshape([batch_size])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    #[test]
    fn test_feature_map_size() {
        assert_eq!(ModelConfig::new().feature_map_size(), 52);
        assert!(ModelConfig::new().with_image_size(17).validate().is_err());
        assert!(ModelConfig::new().with_image_size(18).validate().is_ok());
    }

    #[test]
    fn test_forward_proba_shape_and_range() {
        let device = Default::default();
        let model = ModelConfig::new().with_image_size(32).init::<NdArray>(&device);
        let images = Tensor::<NdArray, 4>::zeros([3, 3, 32, 32], &device);

        let probs = model.forward_proba(images);
        assert_eq!(probs.dims(), [3]);
        let values = probs.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
    }
}

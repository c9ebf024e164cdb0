//! モデルメタデータから推論用の設定を組み立てる

#[cfg(feature = "ml")]
use log::{info, warn};

#[cfg(feature = "ml")]
use crate::dataset::ClassLabel;
#[cfg(feature = "ml")]
use crate::error::{Error, Result};
#[cfg(feature = "ml")]
use crate::model::model_metadata::{ModelMetadata, Normalization};

/// 推論設定
#[cfg(feature = "ml")]
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// クラスラベル（インデックス順）
    pub class_labels: Vec<ClassLabel>,
    /// モデル入力解像度
    pub image_size: usize,
    /// 評価時のバッチサイズ
    pub batch_size: usize,
    /// Deer と判定するしきい値
    pub threshold: f32,
}

#[cfg(feature = "ml")]
impl InferenceConfig {
    /// メタデータからInferenceConfigを作成
    ///
    /// クラス順がローダーの順序（background, deer）と一致しない場合はエラー。
    pub fn from_metadata(metadata: &ModelMetadata, batch_size: usize, threshold: f32) -> Result<Self> {
        let class_labels = metadata
            .class_labels
            .iter()
            .map(|name| {
                ClassLabel::from_dir_name(name)
                    .ok_or_else(|| Error::MalformedConfig(format!("unknown class label '{}' in model metadata", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        if class_labels != ClassLabel::ALL {
            return Err(Error::MalformedConfig(format!(
                "model class order {:?} does not match dataset order {:?}",
                metadata.class_labels,
                ClassLabel::ALL.map(|c| c.dir_name())
            )));
        }

        if metadata.normalization != Normalization::default() {
            warn!(
                "model was trained with scale={}, offset={}; test images are normalized with scale={}, offset={}",
                metadata.normalization.scale,
                metadata.normalization.offset,
                Normalization::default().scale,
                Normalization::default().offset
            );
        }

        if batch_size == 0 {
            return Err(Error::MalformedConfig("batch size must be at least 1".to_string()));
        }

        Ok(Self {
            class_labels,
            image_size: metadata.image_size as usize,
            batch_size,
            threshold,
        })
    }

    /// 設定情報を表示
    pub fn print_info(&self) {
        info!("=== 推論設定 ===");
        info!(
            "クラス: {}",
            self.class_labels.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
        );
        info!("モデル入力サイズ: {}x{}", self.image_size, self.image_size);
        info!("バッチサイズ: {}", self.batch_size);
        info!("しきい値: {}", self.threshold);
        info!("==================");
    }
}

#[cfg(all(test, feature = "ml"))]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_swapped_class_order() {
        let metadata = ModelMetadata::new(vec!["deer".into(), "background".into()], 224, 0.0);
        assert!(matches!(
            InferenceConfig::from_metadata(&metadata, 32, 0.5),
            Err(Error::MalformedConfig(_))
        ));
    }

    #[test]
    fn test_accepts_loader_class_order() {
        let metadata = ModelMetadata::new(vec!["background".into(), "deer".into()], 224, 0.0);
        let config = InferenceConfig::from_metadata(&metadata, 32, 0.5).unwrap();
        assert_eq!(config.class_labels, ClassLabel::ALL.to_vec());
        assert_eq!(config.image_size, 224);
    }
}

//! クラス別ディレクトリから評価用データセットを読み込む
//!
//! `<dir>/background/*`, `<dir>/deer/*` を (パス, クラスID) の列として保持し、
//! バッチ化の際に画像を読み込んで正規化します。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use burn::{
    data::{
        dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    tensor::{backend::Backend, Tensor},
};
use log::{debug, info, warn};

use crate::dataset::ClassLabel;
use crate::error::{Error, Result};
use crate::ml::normalization::load_and_normalize_image;

/// 読み込み対象の拡張子
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// 評価データセット（パスのリストのみ保持）
#[derive(Debug, Clone)]
pub struct ImageFolderDataset {
    samples: Vec<(PathBuf, usize)>, // (画像パス, クラスID)
}

impl ImageFolderDataset {
    /// クラスディレクトリから読み込む
    ///
    /// クラスIDは `ClassLabel` の順序。存在しないクラスディレクトリはスキップし、
    /// 未知のサブディレクトリは警告して無視する。
    pub fn from_directory(data_dir: &Path) -> Result<Self> {
        if !data_dir.is_dir() {
            return Err(Error::MissingInput(data_dir.to_path_buf()));
        }

        for entry in std::fs::read_dir(data_dir).map_err(|e| Error::io(data_dir, e))? {
            let path = entry.map_err(|e| Error::io(data_dir, e))?.path();
            if !path.is_dir() {
                continue;
            }
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            if ClassLabel::from_dir_name(&name).is_none() {
                warn!("未知のクラスディレクトリを無視します: {}", path.display());
            }
        }

        let mut samples = Vec::new();
        for class in ClassLabel::ALL {
            let class_dir = data_dir.join(class.dir_name());
            if !class_dir.is_dir() {
                warn!("クラスディレクトリが存在しません: {}", class_dir.display());
                continue;
            }

            let mut files = Vec::new();
            for entry in std::fs::read_dir(&class_dir).map_err(|e| Error::io(&class_dir, e))? {
                let path = entry.map_err(|e| Error::io(&class_dir, e))?.path();
                if path.is_file() && is_image_file(&path) {
                    files.push(path);
                } else {
                    debug!("画像以外をスキップ: {}", path.display());
                }
            }
            files.sort();

            info!("  クラス {}: {} ({} 枚)", class.index(), class.dir_name(), files.len());
            samples.extend(files.into_iter().map(|path| (path, class.index())));
        }

        Ok(Self { samples })
    }
}

/// データセットアイテム（画像パスのみ保持）
#[derive(Clone, Debug)]
pub struct ImageItem {
    pub path: PathBuf,
    pub label: usize,
}

impl Dataset<ImageItem> for ImageFolderDataset {
    fn get(&self, index: usize) -> Option<ImageItem> {
        let (path, label) = self.samples.get(index)?;
        Some(ImageItem {
            path: path.clone(),
            label: *label,
        })
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// バッチデータ
#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// 正規化済み画像 [batch_size, 3, size, size]
    pub images: Tensor<B, 4>,
    /// 正解クラスID
    pub labels: Vec<usize>,
    pub paths: Vec<PathBuf>,
    /// 読み込みに失敗した画像（ゼロ埋めされている）
    pub failures: Vec<(PathBuf, String)>,
}

/// バッチャー
#[derive(Clone)]
pub struct ImageBatcher<B: Backend> {
    device: B::Device,
    image_size: usize,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, image_size: usize) -> Self {
        Self { device, image_size }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>, _device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let size = self.image_size;
        let mut all_pixels = Vec::with_capacity(batch_size * 3 * size * size);
        let mut labels = Vec::with_capacity(batch_size);
        let mut paths = Vec::with_capacity(batch_size);
        let mut failures = Vec::new();

        for item in items {
            match load_and_normalize_image(&item.path, size) {
                Ok(image_data) => all_pixels.extend_from_slice(&image_data),
                Err(e) => {
                    warn!("画像読み込み失敗 {}: {}", item.path.display(), e);
                    all_pixels.extend(std::iter::repeat(0.0f32).take(3 * size * size));
                    failures.push((item.path.clone(), e.to_string()));
                }
            }
            labels.push(item.label);
            paths.push(item.path);
        }

        let images = Tensor::<B, 1>::from_floats(all_pixels.as_slice(), &self.device)
            .reshape([batch_size, 3, size, size]);

        ImageBatch {
            images,
            labels,
            paths,
            failures,
        }
    }
}

/// 評価用データローダーを作成
///
/// シャッフルなし・ワーカーなしのため、何度 `iter()` しても同じ順序でバッチを返す。
pub fn build_test_loader<B: Backend>(
    dataset: ImageFolderDataset,
    image_size: usize,
    batch_size: usize,
    device: B::Device,
) -> Arc<dyn DataLoader<B, ImageBatch<B>>> {
    let batcher = ImageBatcher::<B>::new(device, image_size);
    DataLoaderBuilder::new(batcher)
        .batch_size(batch_size)
        .num_workers(0)
        .build(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};

    fn write_image(path: &Path, value: u8) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(12, 12, Rgb([value, value, value])).save(path).unwrap();
    }

    #[test]
    fn test_labels_follow_class_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_image(&tmp.path().join("deer/b.png"), 10);
        write_image(&tmp.path().join("deer/a.png"), 10);
        write_image(&tmp.path().join("background/z.png"), 200);
        std::fs::write(tmp.path().join("deer/readme.txt"), b"x").unwrap();
        std::fs::create_dir_all(tmp.path().join("elk")).unwrap();

        let dataset = ImageFolderDataset::from_directory(tmp.path()).unwrap();
        assert_eq!(dataset.len(), 3);
        let items: Vec<_> = (0..3).map(|i| dataset.get(i).unwrap()).collect();
        assert_eq!(items[0].label, 0);
        assert!(items[0].path.ends_with("background/z.png"));
        assert!(items[1].path.ends_with("deer/a.png"));
        assert_eq!(items[2].label, 1);
        assert!(dataset.get(3).is_none());
    }

    #[test]
    fn test_missing_directory() {
        assert!(matches!(
            ImageFolderDataset::from_directory(Path::new("/nonexistent/test")),
            Err(Error::MissingInput(_))
        ));
    }

    #[test]
    fn test_loader_is_restartable() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..5 {
            write_image(&tmp.path().join(format!("deer/{i}.png")), 50);
        }
        let dataset = ImageFolderDataset::from_directory(tmp.path()).unwrap();
        let loader = build_test_loader::<NdArray>(dataset, 8, 2, Default::default());

        let first: Vec<Vec<PathBuf>> = loader.iter().map(|b| b.paths).collect();
        let second: Vec<Vec<PathBuf>> = loader.iter().map(|b| b.paths).collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_undecodable_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("deer")).unwrap();
        std::fs::write(tmp.path().join("deer/broken.jpg"), b"not an image").unwrap();

        let dataset = ImageFolderDataset::from_directory(tmp.path()).unwrap();
        let loader = build_test_loader::<NdArray>(dataset, 8, 4, Default::default());
        let batch = loader.iter().next().unwrap();
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.images.dims(), [1, 3, 8, 8]);
    }
}

//! 画像の読み込みと正規化
//!
//! 画素値 [0, 255] を `pixel / 127.5 - 1` で [-1, 1] に写像し、(C, H, W) の順で平坦化します。
//! 学習済みモデルが同じ変換で学習されている必要があります。

use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;

use crate::error::{Error, Result};

/// [0, 255] -> [-1, 1]
pub fn normalize_pixel(value: u8) -> f32 {
    value as f32 / 127.5 - 1.0
}

/// [-1, 1] -> [0, 255]（小数部は切り捨て）
pub fn denormalize_pixel(value: f32) -> u8 {
    ((value + 1.0) * 127.5) as u8
}

/// RGB画像を正方形にリサイズして正規化
pub fn normalize_image(img: &RgbImage, size: usize) -> Vec<f32> {
    let size_u32 = size as u32;
    let resized;
    let img = if img.dimensions() == (size_u32, size_u32) {
        img
    } else {
        resized = image::imageops::resize(img, size_u32, size_u32, FilterType::Triangle);
        &resized
    };

    let mut data = Vec::with_capacity(3 * size * size);
    for channel in 0..3 {
        for y in 0..size_u32 {
            for x in 0..size_u32 {
                data.push(normalize_pixel(img.get_pixel(x, y)[channel]));
            }
        }
    }
    data
}

/// 画像ファイルを読み込んで正規化
pub fn load_and_normalize_image(path: &Path, size: usize) -> Result<Vec<f32>> {
    let img = image::open(path)
        .map_err(|e| Error::Inference(format!("画像読み込みエラー {}: {}", path.display(), e)))?
        .to_rgb8();
    Ok(normalize_image(&img, size))
}

/// 正規化済み (C, H, W) データから表示用のRGB画像を復元
pub fn denormalize_image(data: &[f32], width: usize, height: usize) -> Option<RgbImage> {
    let plane = width * height;
    if data.len() != 3 * plane {
        return None;
    }

    let mut raw = Vec::with_capacity(3 * plane);
    for i in 0..plane {
        for channel in 0..3 {
            raw.push(denormalize_pixel(data[channel * plane + i]));
        }
    }
    RgbImage::from_raw(width as u32, height as u32, raw)
}

// 该文件是 XRay Predict 项目的一部分。
// src/input/preprocess.rs - 胸片预处理
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{DynamicImage, GrayImage, Luma, imageops::FilterType};
use tracing::debug;

use crate::frame::GrayNchwFrame;

/// 模型训练数据的像素幅度，[-1, 1] 映射到 [-1024, 1024]
pub const XRAY_INTENSITY_SCALE: f32 = 1024.0;

/// 转为单通道灰度图
///
/// 彩色图像按 ITU-R 601-2 亮度公式转换：
/// L = R * 299/1000 + G * 587/1000 + B * 114/1000
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
  match image {
    DynamicImage::ImageLuma8(gray) => gray.clone(),
    other => {
      let rgb = other.to_rgb8();
      GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([itu_r_601_luma(r, g, b)])
      })
    }
  }
}

// 16 位定点，三个系数之和为 65536
fn itu_r_601_luma(r: u8, g: u8, b: u8) -> u8 {
  ((r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16) as u8
}

/// 像素值 [0, 255] -> [0, 1] -> [-1, 1] -> [-1024, 1024]
pub fn normalize_intensity(value: u8) -> f32 {
  let unit = value as f32 / 255.0;
  (unit * 2.0 - 1.0) * XRAY_INTENSITY_SCALE
}

/// 解码后的图像 -> 模型输入帧
///
/// 直接拉伸到 W x H，不保持宽高比，也不做补边。
pub fn preprocess<const W: u32, const H: u32>(image: &DynamicImage) -> GrayNchwFrame<W, H> {
  let gray = to_grayscale(image);
  let resized = if gray.dimensions() == (W, H) {
    gray
  } else {
    debug!("缩放图像: {}x{} -> {}x{}", gray.width(), gray.height(), W, H);
    image::imageops::resize(&gray, W, H, FilterType::Triangle)
  };

  let mut frame = GrayNchwFrame::<W, H>::default();
  for (value, pixel) in frame.as_mut().iter_mut().zip(resized.pixels()) {
    *value = normalize_intensity(pixel[0]);
  }
  frame
}

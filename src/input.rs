// 该文件是 XRay Predict 项目的一部分。
// src/input.rs - 图像输入
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

use std::io::Cursor;

use image::{DynamicImage, ImageReader};
use thiserror::Error;
use tracing::debug;

use crate::frame::GrayNchwFrame;

pub trait AsNchwFrame<const W: u32, const H: u32> {
  fn as_nchw(&self) -> &[f32];
}

mod preprocess;
pub use self::preprocess::{XRAY_INTENSITY_SCALE, normalize_intensity, preprocess, to_grayscale};

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("上传的图像内容为空")]
  Empty,
  #[error("无法读取图像数据: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码失败: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 按内容识别格式并解码图像字节
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
  if bytes.is_empty() {
    return Err(DecodeError::Empty);
  }

  let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
  debug!("识别到的图像格式: {:?}", reader.format());
  let image = reader.decode()?;
  debug!("图像解码完成: {}x{}", image.width(), image.height());

  Ok(image)
}

/// 来自内存字节（如 HTTP 上传）的单张图像输入
pub struct ImageBytesInput {
  image: Option<DynamicImage>,
}

impl ImageBytesInput {
  pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
    Ok(ImageBytesInput {
      image: Some(decode_image(bytes)?),
    })
  }

  pub fn into_nchw<const W: u32, const H: u32>(self) -> ImageNchwIter<W, H> {
    ImageNchwIter::new(self.image)
  }
}

/// 单张图像的 NCHW 帧迭代器，只产出一帧
pub struct ImageNchwIter<const W: u32, const H: u32> {
  image: Option<DynamicImage>,
}

impl<const W: u32, const H: u32> ImageNchwIter<W, H> {
  pub(crate) fn new(image: Option<DynamicImage>) -> Self {
    ImageNchwIter { image }
  }
}

impl<const W: u32, const H: u32> Iterator for ImageNchwIter<W, H> {
  type Item = GrayNchwFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take().map(|image| preprocess(&image))
  }
}

// 该文件是 XRay Predict 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::DynamicImage;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::{DecodeError, ImageNchwIter, decode_image},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image decode error: {0}")]
  DecodeError(#[from] DecodeError),
}

pub struct ImageFileInput {
  image: Option<DynamicImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path();
    info!("读取图像文件: {}", path);
    let bytes = std::fs::read(path)?;
    let image = decode_image(&bytes)?;

    Ok(ImageFileInput { image: Some(image) })
  }
}

impl ImageFileInput {
  pub fn into_nchw<const W: u32, const H: u32>(self) -> ImageNchwIter<W, H> {
    ImageNchwIter::new(self.image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::XrayFrame, input::AsNchwFrame};
  use image::{GrayImage, Luma};

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("file:///tmp/a.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("image:///definitely/not/here.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }

  #[test]
  fn reads_png_from_disk() {
    let path = std::env::temp_dir().join(format!("xray-predict-input-{}.png", std::process::id()));
    GrayImage::from_pixel(31, 17, Luma([255])).save(&path).unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let frames: Vec<XrayFrame> = ImageFileInput::from_url(&url).unwrap().into_nchw().collect();
    std::fs::remove_file(&path).ok();

    assert_eq!(frames.len(), 1);
    assert!(frames[0].as_nchw().iter().all(|&v| v == 1024.0));
  }
}

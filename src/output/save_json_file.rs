// 该文件是 XRay Predict 项目的一部分。
// src/output/save_json_file.rs - 保存 JSON 结果文件
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

use std::path::Path;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{JsonFormat, Render},
  prediction::Prediction,
};

pub struct SaveJsonFileOutput {
  path: String,
  format: JsonFormat,
}

#[derive(Error, Debug)]
pub enum SaveJsonFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveJsonFileOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for SaveJsonFileOutput {
  type Error = SaveJsonFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveJsonFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveJsonFileOutput {
      path: uri.path().to_string(),
      format: JsonFormat::from_query(uri),
    })
  }
}

impl SaveJsonFileOutput {
  fn save_json(&self, json: String) -> Result<(), SaveJsonFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveJsonFileError::IoError)?;
    }

    std::fs::write(&self.path, json).map_err(SaveJsonFileError::IoError)?;

    warn!("保存预测结果到文件: {}", self.path);

    Ok(())
  }
}

impl<F> Render<F, Prediction> for SaveJsonFileOutput {
  type Error = SaveJsonFileError;

  fn render_result(&self, _frame: &F, result: &Prediction) -> Result<(), Self::Error> {
    let json = self
      .format
      .to_json(result)
      .map_err(SaveJsonFileError::JsonError)?;
    self.save_json(json)
  }
}

// 该文件是 XRay Predict 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use crate::prediction::{DEFAULT_MODEL_NAME, Prediction};
use crate::{FromUrl, FromUrlWithScheme};
use thiserror::Error;
use url::Url;

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

mod save_json_file;
pub use self::save_json_file::{SaveJsonFileError, SaveJsonFileOutput};

mod stdout_json;
pub use self::stdout_json::{StdoutJsonError, StdoutJsonOutput};

/// JSON 输出格式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFormat {
  /// 标签 -> 概率
  Plain,
  /// 带风险等级与说明的结果
  Detailed { model: String },
}

impl JsonFormat {
  /// 从 `?format=detailed&model=...` 查询参数解析
  pub fn from_query(url: &Url) -> Self {
    let detailed = url
      .query_pairs()
      .any(|(k, v)| k == "format" && v == "detailed");
    if !detailed {
      return JsonFormat::Plain;
    }

    let model = url
      .query_pairs()
      .find(|(k, _)| k == "model")
      .map(|(_, v)| v.into_owned())
      .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string());
    JsonFormat::Detailed { model }
  }

  pub fn to_json(&self, prediction: &Prediction) -> Result<String, serde_json::Error> {
    match self {
      JsonFormat::Plain => serde_json::to_string_pretty(prediction),
      JsonFormat::Detailed { model } => serde_json::to_string_pretty(&prediction.detailed(model)),
    }
  }
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("保存 JSON 文件错误: {0}")]
  SaveJsonFileError(#[from] SaveJsonFileError),
  #[error("标准输出错误: {0}")]
  StdoutJsonError(#[from] StdoutJsonError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  SaveJsonFileOutput(SaveJsonFileOutput),
  StdoutJsonOutput(StdoutJsonOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      SaveJsonFileOutput::SCHEME => {
        let output = SaveJsonFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveJsonFileOutput(output))
      }
      StdoutJsonOutput::SCHEME => {
        let output = StdoutJsonOutput::from_url(url)?;
        Ok(OutputWrapper::StdoutJsonOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl<F> Render<F, Prediction> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &F, result: &Prediction) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::SaveJsonFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      OutputWrapper::StdoutJsonOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

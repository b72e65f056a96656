// 该文件是 XRay Predict 项目的一部分。
// src/output/stdout_json.rs - 标准输出 JSON 结果
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

use std::io::Write;

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{JsonFormat, Render},
  prediction::Prediction,
};

pub struct StdoutJsonOutput {
  format: JsonFormat,
}

#[derive(Error, Debug)]
pub enum StdoutJsonError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

impl FromUrlWithScheme for StdoutJsonOutput {
  const SCHEME: &'static str = "stdout";
}

impl FromUrl for StdoutJsonOutput {
  type Error = StdoutJsonError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(StdoutJsonError::SchemeMismatch);
    }

    Ok(StdoutJsonOutput {
      format: JsonFormat::from_query(uri),
    })
  }
}

impl<F> Render<F, Prediction> for StdoutJsonOutput {
  type Error = StdoutJsonError;

  fn render_result(&self, _frame: &F, result: &Prediction) -> Result<(), Self::Error> {
    let json = self.format.to_json(result)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
  }
}

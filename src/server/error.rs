// 该文件是 XRay Predict 项目的一部分。
// src/server/error.rs - HTTP 错误响应
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

use axum::{
  Json,
  extract::multipart::{MultipartError, MultipartRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{
  input::DecodeError,
  prediction::{PredictionError, ScoreOutOfRange, ShapeMismatch},
};

/// 单个请求内的错误，不影响服务状态
#[derive(Error, Debug)]
pub enum ServerError {
  #[error("Missing form field: {0}")]
  MissingField(&'static str),

  #[error("Invalid multipart body: {0}")]
  Multipart(#[from] MultipartError),

  #[error("Expected a multipart/form-data request: {0}")]
  MultipartRejection(#[from] MultipartRejection),

  #[error("Uploaded file is not a valid image: {0}")]
  Decode(#[from] DecodeError),

  #[error("Model output does not match label list: {0}")]
  ShapeMismatch(#[from] ShapeMismatch),

  #[error("Model output is not a valid probability: {0}")]
  ScoreOutOfRange(#[from] ScoreOutOfRange),

  #[error("Inference failed: {0}")]
  Inference(String),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl ServerError {
  pub fn status(&self) -> StatusCode {
    match self {
      ServerError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ServerError::Multipart(e) => e.status(),
      ServerError::MultipartRejection(e) => e.status(),
      ServerError::Decode(_) => StatusCode::BAD_REQUEST,
      ServerError::ShapeMismatch(_)
      | ServerError::ScoreOutOfRange(_)
      | ServerError::Inference(_)
      | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<PredictionError> for ServerError {
  fn from(err: PredictionError) -> Self {
    match err {
      PredictionError::ShapeMismatch(e) => ServerError::ShapeMismatch(e),
      PredictionError::ScoreOutOfRange(e) => ServerError::ScoreOutOfRange(e),
    }
  }
}

impl IntoResponse for ServerError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(status = %status, detail = %self, "请求处理失败");
    } else {
      warn!(status = %status, detail = %self, "请求被拒绝");
    }

    let body = Json(json!({
      "detail": self.to_string(),
    }));

    (status, body).into_response()
  }
}

pub type Result<T> = std::result::Result<T, ServerError>;

// 该文件是 XRay Predict 项目的一部分。
// src/server/handlers.rs - HTTP 请求处理
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

use std::sync::Arc;

use axum::{
  Json,
  body::Bytes,
  extract::{Multipart, State, multipart::MultipartRejection},
  http::StatusCode,
  response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::info;

use crate::prediction::{DetailedPrediction, Prediction};

use super::{
  error::{Result, ServerError},
  state::{AppState, InferenceModel},
};

/// 上传图像所在的表单字段
pub const UPLOAD_FIELD: &str = "file";

/// 取出表单中的图像字段，其余字段忽略
async fn read_upload(
  multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Bytes> {
  let mut multipart = multipart?;
  while let Some(field) = multipart.next_field().await? {
    if field.name() != Some(UPLOAD_FIELD) {
      continue;
    }

    let file_name = field.file_name().unwrap_or("<unnamed>").to_string();
    let data = field.bytes().await?;
    info!(file = %file_name, size = data.len(), "收到上传图像");
    return Ok(data);
  }

  Err(ServerError::MissingField(UPLOAD_FIELD))
}

/// POST /predict
pub async fn predict<M: InferenceModel>(
  State(state): State<Arc<AppState<M>>>,
  multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Prediction>> {
  let bytes = read_upload(multipart).await?;
  let prediction = state.classify(bytes).await?;
  Ok(Json(prediction))
}

/// POST /predict/detailed
pub async fn predict_detailed<M: InferenceModel>(
  State(state): State<Arc<AppState<M>>>,
  multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<DetailedPrediction>> {
  let bytes = read_upload(multipart).await?;
  let prediction = state.classify(bytes).await?;
  Ok(Json(prediction.detailed(state.model_name())))
}

/// GET /health，不依赖模型状态
pub async fn health() -> Json<Value> {
  Json(json!({ "status": "ok" }))
}

pub async fn handle_404() -> impl IntoResponse {
  (
    StatusCode::NOT_FOUND,
    Json(json!({
      "detail": "Not Found",
    })),
  )
}

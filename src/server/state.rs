// 该文件是 XRay Predict 项目的一部分。
// src/server/state.rs - 服务共享状态
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

use std::{sync::Arc, time::Instant};

use axum::body::Bytes;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::{
  frame::XrayFrame,
  input::ImageBytesInput,
  model::{ClassifyResult, Model, WithLabels},
  prediction::Prediction,
  server::{ServerConfig, error::ServerError},
};

/// 服务可以托管的模型：224x224 灰度帧输入，按标签输出
pub trait InferenceModel:
  Model<Input = XrayFrame, Output = ClassifyResult, Error: std::error::Error + Send + Sync + 'static>
  + WithLabels
  + Send
  + Sync
  + 'static
{
}

impl<M> InferenceModel for M where
  M: Model<Input = XrayFrame, Output = ClassifyResult, Error: std::error::Error + Send + Sync + 'static>
    + WithLabels
    + Send
    + Sync
    + 'static
{
}

/// 加载完成后只读的共享状态
pub struct AppState<M> {
  model: Arc<M>,
  permits: Arc<Semaphore>,
  model_name: String,
}

impl<M: InferenceModel> AppState<M> {
  pub fn new(model: M, config: &ServerConfig) -> Self {
    AppState {
      model: Arc::new(model),
      permits: Arc::new(Semaphore::new(config.inference_workers.max(1))),
      model_name: config.model_name.clone(),
    }
  }

  pub fn model(&self) -> &M {
    &self.model
  }

  pub fn model_name(&self) -> &str {
    &self.model_name
  }

  /// 解码、预处理与推理都在阻塞线程池中执行，并发数受推理工作数限制
  pub async fn classify(&self, bytes: Bytes) -> Result<Prediction, ServerError> {
    let permit = self
      .permits
      .clone()
      .acquire_owned()
      .await
      .map_err(|e| ServerError::Internal(e.to_string()))?;
    let model = self.model.clone();

    tokio::task::spawn_blocking(move || -> Result<Prediction, ServerError> {
      let _permit = permit;
      let now = Instant::now();

      let frame: XrayFrame = ImageBytesInput::decode(&bytes)?
        .into_nchw()
        .next()
        .ok_or_else(|| ServerError::Internal("no frame decoded".to_string()))?;
      debug!("预处理完成，耗时: {:.2?}", now.elapsed());

      let result = model
        .infer(&frame)
        .map_err(|e| ServerError::Inference(e.to_string()))?;
      debug!("推理完成，耗时: {:.2?}", now.elapsed());

      Ok(Prediction::from_scores(model.labels(), &result.scores)?)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))?
  }
}

// 该文件是 XRay Predict 项目的一部分。
// src/server.rs - HTTP 推理服务
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

mod error;
mod handlers;
mod state;

pub use self::error::ServerError;
pub use self::handlers::UPLOAD_FIELD;
pub use self::state::{AppState, InferenceModel};

use std::{net::SocketAddr, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};
use tracing::{error, info};

use crate::prediction::DEFAULT_MODEL_NAME;

/// 默认请求体上限 20 MiB
pub const DEFAULT_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// 服务配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub host: String,
  pub port: u16,
  pub body_limit: usize,
  /// 同时执行推理的数量，默认 1，即数值计算单线程
  pub inference_workers: usize,
  pub model_name: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    ServerConfig {
      host: "0.0.0.0".to_string(),
      port: 8000,
      body_limit: DEFAULT_BODY_LIMIT,
      inference_workers: 1,
      model_name: DEFAULT_MODEL_NAME.to_string(),
    }
  }
}

/// 路由与中间件
pub fn create_router<M: InferenceModel>(state: Arc<AppState<M>>, config: &ServerConfig) -> Router {
  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods(Any)
    .allow_headers(Any);

  Router::new()
    .route("/predict", post(handlers::predict::<M>))
    .route("/predict/detailed", post(handlers::predict_detailed::<M>))
    .route("/health", get(handlers::health))
    .fallback(handlers::handle_404)
    .layer(DefaultBodyLimit::max(config.body_limit))
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// 模型必须在调用前加载完成，监听端口之后才开始接受请求
pub async fn run_server<M: InferenceModel>(
  state: Arc<AppState<M>>,
  config: ServerConfig,
) -> anyhow::Result<()> {
  let start_time = chrono::Utc::now();
  let app = create_router(state.clone(), &config);

  let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
  let listener = tokio::net::TcpListener::bind(addr).await?;
  info!(
    address = %addr,
    model = %state.model_name(),
    labels = state.model().labels().len(),
    inference_workers = config.inference_workers,
    body_limit_mb = config.body_limit / 1024 / 1024,
    started_at = %start_time.to_rfc3339(),
    "服务已启动，开始接受请求"
  );

  let shutdown_signal = async move {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!("无法监听中断信号: {}", e);
      std::future::pending::<()>().await;
    }
    let uptime = chrono::Utc::now().signed_duration_since(start_time);
    info!(uptime_secs = uptime.num_seconds(), "收到中断信号，准备退出...");
  };

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal)
    .await?;

  info!("服务已退出");
  Ok(())
}

// 该文件是 XRay Predict 项目的一部分。
// src/main.rs - 推理服务主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use xray_predict::{
  FromUrl,
  model::{DenseNetBuilder, XrayDenseNet},
  server::{AppState, run_server},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型地址: {}", args.model);
  info!("标签表: {}", args.labels.as_deref().unwrap_or("default"));
  info!("推理并发数: {}", args.inference_workers);

  // 模型加载失败时直接退出，不监听端口
  let labels = args.label_set().context("标签表加载失败")?;
  let model: XrayDenseNet = DenseNetBuilder::from_url(&args.model)?
    .labels(labels)
    .build()
    .context("模型加载失败")?;

  let config = args.server_config();
  let state = Arc::new(AppState::new(model, &config));

  tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()?
    .block_on(run_server(state, config))
}

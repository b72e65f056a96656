// 该文件是 XRay Predict 项目的一部分。
// src/args.rs - 服务参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use clap::Parser;
use url::Url;

use xray_predict::{
  labels::{LabelError, LabelSet},
  prediction::DEFAULT_MODEL_NAME,
  server::{DEFAULT_BODY_LIMIT, ServerConfig},
};

/// XRay Predict 服务参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址
  /// 例如: densenet:///models/densenet121-res224-all.onnx
  /// 模型输出 logits 时追加 ?activation=sigmoid
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 病理标签表
  /// - 缺省: 内置 15 项标签
  /// - all: 内置 18 项标签
  /// - 其他: 标签文件路径，每行一个标签
  #[arg(long, value_name = "LABELS")]
  pub labels: Option<String>,

  /// 监听地址
  #[arg(long, env = "HOST", default_value = "0.0.0.0")]
  pub host: String,

  /// 监听端口
  #[arg(long, env = "PORT", default_value_t = 8000)]
  pub port: u16,

  /// 请求体大小上限（字节）
  #[arg(long, default_value_t = DEFAULT_BODY_LIMIT, value_name = "BYTES")]
  pub body_limit: usize,

  /// 同时执行推理的数量
  #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
  pub inference_workers: u32,

  /// 返回结果中的模型名称
  #[arg(long, default_value = DEFAULT_MODEL_NAME)]
  pub model_name: String,
}

impl Args {
  pub fn label_set(&self) -> Result<LabelSet, LabelError> {
    LabelSet::resolve(self.labels.as_deref())
  }

  pub fn server_config(&self) -> ServerConfig {
    ServerConfig {
      host: self.host.clone(),
      port: self.port,
      body_limit: self.body_limit,
      inference_workers: self.inference_workers as usize,
      model_name: self.model_name.clone(),
    }
  }
}

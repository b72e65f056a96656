// 该文件是 XRay Predict 项目的一部分。
// src/bin/simple_oneshot.rs - 单张胸片推理
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use anyhow::Result;
use clap::Parser;
use url::Url;

use tracing::info;
use xray_predict::{
  FromUrl,
  input::ImageFileInput,
  labels::LabelSet,
  model::{DenseNetBuilder, XrayDenseNet},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

/// XRay Predict 单张推理参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址，如 densenet:///models/model.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，如 image:///data/chest.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出，如 stdout: 或 json:///tmp/result.json?format=detailed
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,
  /// 标签表（default、all 或文件路径）
  #[arg(long, value_name = "LABELS")]
  pub labels: Option<String>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let labels = LabelSet::resolve(args.labels.as_deref())?;
  let input_image = ImageFileInput::from_url(&args.input)?;
  let model: XrayDenseNet = DenseNetBuilder::from_url(&args.model)?
    .labels(labels)
    .build()?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input_image.into_nchw::<224, 224>(), model, output)?;

  Ok(())
}

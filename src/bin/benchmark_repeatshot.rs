// 该文件是 XRay Predict 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复推理测速
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
  task::{RepeatShotTask, Task},
};

/// XRay Predict 测速参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,
  /// 标签表
  #[arg(long, value_name = "LABELS")]
  pub labels: Option<String>,
  /// 推理次数（含 2 次预热）
  #[arg(long, default_value_t = 100)]
  pub repeat: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("推理次数: {}", args.repeat);

  let labels = LabelSet::resolve(args.labels.as_deref())?;
  let input_image = ImageFileInput::from_url(&args.input)?;
  let model: XrayDenseNet = DenseNetBuilder::from_url(&args.model)?
    .labels(labels)
    .build()?;
  let output = OutputWrapper::from_url(&args.output)?;

  RepeatShotTask::default()
    .with_repeat(args.repeat)
    .run_task(input_image.into_nchw::<224, 224>(), model, output)?;

  Ok(())
}

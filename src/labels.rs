// 该文件是 XRay Predict 项目的一部分。
// src/labels.rs - 病理标签表
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

use std::{collections::HashSet, path::Path};

use thiserror::Error;
use tracing::{debug, info};

const XRV_DEFAULT_LABELS: &str = include_str!("../labels/xrv.txt");
const XRV_ALL_LABELS: &str = include_str!("../labels/xrv-all.txt");

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("标签文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签表为空")]
  Empty,
  #[error("标签重复: {0}")]
  Duplicate(String),
}

/// 有序的病理标签表，顺序与模型输出一一对应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
  labels: Box<[String]>,
}

impl LabelSet {
  /// 内置的 15 项默认病理标签
  pub fn xrv_default() -> Self {
    Self::bundled(XRV_DEFAULT_LABELS)
  }

  /// torchxrayvision "all" 权重对应的完整 18 项标签
  pub fn xrv_all() -> Self {
    Self::bundled(XRV_ALL_LABELS)
  }

  /// 内置文件在编译期确定，由单元测试保证非空且无重复
  fn bundled(text: &str) -> Self {
    LabelSet {
      labels: split_lines(text).into_boxed_slice(),
    }
  }

  /// 命令行中的标签表：缺省或 `default` 为内置 15 项，`all` 为内置 18 项，其余视为文件路径
  pub fn resolve(spec: Option<&str>) -> Result<Self, LabelError> {
    match spec {
      None | Some("default") => Ok(Self::xrv_default()),
      Some("all") => Ok(Self::xrv_all()),
      Some(path) => Self::from_file(path),
    }
  }

  /// 每行一个标签，忽略空行与 `#` 注释
  pub fn parse(text: &str) -> Result<Self, LabelError> {
    Self::new(split_lines(text))
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let labels = Self::parse(&text)?;
    debug!("标签数量: {}", labels.len());
    Ok(labels)
  }

  pub fn new(labels: Vec<String>) -> Result<Self, LabelError> {
    if labels.is_empty() {
      return Err(LabelError::Empty);
    }

    let mut seen = HashSet::with_capacity(labels.len());
    for label in &labels {
      if !seen.insert(label.as_str()) {
        return Err(LabelError::Duplicate(label.clone()));
      }
    }

    Ok(LabelSet {
      labels: labels.into_boxed_slice(),
    })
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}

fn split_lines(text: &str) -> Vec<String> {
  text
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty() && !line.starts_with('#'))
    .map(str::to_string)
    .collect()
}

impl Default for LabelSet {
  fn default() -> Self {
    Self::xrv_default()
  }
}

// 该文件是 XRay Predict 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{fmt, str::FromStr};

use crate::labels::LabelSet;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 带有固定标签表的分类模型
pub trait WithLabels {
  fn labels(&self) -> &LabelSet;
}

impl<M: Model + ?Sized> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

impl<M: WithLabels + ?Sized> WithLabels for &M {
  fn labels(&self) -> &LabelSet {
    (**self).labels()
  }
}

/// 一次前向推理的结果，已去掉批维度
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyResult {
  pub scores: Box<[f32]>,
}

impl From<Vec<f32>> for ClassifyResult {
  fn from(scores: Vec<f32>) -> Self {
    ClassifyResult {
      scores: scores.into_boxed_slice(),
    }
  }
}

/// 模型输出的激活方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputActivation {
  /// 模型已输出概率
  #[default]
  Identity,
  /// 模型输出 logits，需要 sigmoid
  Sigmoid,
}

impl OutputActivation {
  pub fn apply(self, value: f32) -> f32 {
    match self {
      OutputActivation::Identity => value,
      OutputActivation::Sigmoid => sigmoid(value),
    }
  }
}

impl FromStr for OutputActivation {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "identity" | "none" => Ok(OutputActivation::Identity),
      "sigmoid" => Ok(OutputActivation::Sigmoid),
      other => Err(format!("未知的激活方式: {other}")),
    }
  }
}

impl fmt::Display for OutputActivation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OutputActivation::Identity => f.write_str("identity"),
      OutputActivation::Sigmoid => f.write_str("sigmoid"),
    }
  }
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}

mod densenet;
pub use self::densenet::{DenseNet, DenseNetBuilder, DenseNetError, XrayDenseNet};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn activation_parsing() {
    assert_eq!("sigmoid".parse(), Ok(OutputActivation::Sigmoid));
    assert_eq!("identity".parse(), Ok(OutputActivation::Identity));
    assert!("relu".parse::<OutputActivation>().is_err());
    assert_eq!(OutputActivation::Sigmoid.to_string(), "sigmoid");
  }

  #[test]
  fn sigmoid_is_centered() {
    assert_eq!(OutputActivation::Sigmoid.apply(0.0), 0.5);
    assert!(OutputActivation::Sigmoid.apply(20.0) <= 1.0);
    assert!(OutputActivation::Sigmoid.apply(-20.0) >= 0.0);
    assert_eq!(OutputActivation::Identity.apply(0.25), 0.25);
  }
}

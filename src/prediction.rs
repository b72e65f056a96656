// 该文件是 XRay Predict 项目的一部分。
// src/prediction.rs - 预测结果格式化
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

use serde::{Serialize, Serializer, ser::SerializeMap};
use thiserror::Error;

use crate::labels::LabelSet;

/// 概率保留的小数位数
pub const PROBABILITY_DECIMALS: i32 = 4;
/// 百分比保留的小数位数
pub const PERCENTAGE_DECIMALS: i32 = 2;

/// 未指定时使用的模型名称
pub const DEFAULT_MODEL_NAME: &str = "densenet121-res224-all";
pub const PREDICTION_TYPE: &str = "chest-xray";
pub const PREDICTION_DISCLAIMER: &str = "For research and educational use only. \
  Not a substitute for diagnosis by a qualified medical professional.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("标签数量 ({labels}) 与模型输出长度 ({outputs}) 不一致")]
pub struct ShapeMismatch {
  pub labels: usize,
  pub outputs: usize,
}

impl ShapeMismatch {
  pub fn check(labels: usize, outputs: usize) -> Result<(), Self> {
    if labels == outputs {
      Ok(())
    } else {
      Err(ShapeMismatch { labels, outputs })
    }
  }
}

/// 模型输出必须是 [0, 1] 内的有限值
#[derive(Error, Debug, Clone, PartialEq)]
#[error("标签 {label} 的输出 {value} 不是 [0, 1] 内的概率")]
pub struct ScoreOutOfRange {
  pub label: String,
  pub value: f32,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
  #[error(transparent)]
  ShapeMismatch(#[from] ShapeMismatch),
  #[error(transparent)]
  ScoreOutOfRange(#[from] ScoreOutOfRange),
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (value * factor).round() / factor
}

/// 按标签顺序序列化为 JSON 对象的有序表
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap<V> {
  entries: Vec<(String, V)>,
}

impl<V> LabelMap<V> {
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, label: &str) -> Option<&V> {
    self
      .entries
      .iter()
      .find(|(name, _)| name == label)
      .map(|(_, value)| value)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
    self.entries.iter().map(|(name, value)| (name.as_str(), value))
  }
}

impl<V: Serialize> Serialize for LabelMap<V> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (label, value) in &self.entries {
      map.serialize_entry(label, value)?;
    }
    map.end()
  }
}

/// 标签 -> 概率（保留 4 位小数）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Prediction {
  probabilities: LabelMap<f64>,
}

impl Prediction {
  /// 标签与输出必须等长，不做截断或补齐；任一输出越界则整体失败
  pub fn from_scores(labels: &LabelSet, scores: &[f32]) -> Result<Self, PredictionError> {
    ShapeMismatch::check(labels.len(), scores.len())?;

    let entries = labels
      .iter()
      .zip(scores)
      .map(|(label, &score)| {
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
          return Err(ScoreOutOfRange {
            label: label.to_string(),
            value: score,
          });
        }
        Ok((label.to_string(), round_to(score as f64, PROBABILITY_DECIMALS)))
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Prediction {
      probabilities: LabelMap { entries },
    })
  }

  pub fn len(&self) -> usize {
    self.probabilities.len()
  }

  pub fn is_empty(&self) -> bool {
    self.probabilities.is_empty()
  }

  pub fn get(&self, label: &str) -> Option<f64> {
    self.probabilities.get(label).copied()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self.probabilities.iter().map(|(label, &p)| (label, p))
  }

  pub fn detailed(&self, model: &str) -> DetailedPrediction {
    let entries = self
      .iter()
      .map(|(label, probability)| (label.to_string(), ConditionResult::new(probability)))
      .collect();

    DetailedPrediction {
      model: model.to_string(),
      kind: PREDICTION_TYPE.to_string(),
      disclaimer: PREDICTION_DISCLAIMER.to_string(),
      results: LabelMap { entries },
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
  Low,
  Moderate,
  High,
}

impl RiskLevel {
  pub fn from_probability(probability: f64) -> Self {
    if probability > 0.7 {
      RiskLevel::High
    } else if probability > 0.4 {
      RiskLevel::Moderate
    } else {
      RiskLevel::Low
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionResult {
  pub probability: f64,
  pub percentage: f64,
  pub risk_level: RiskLevel,
}

impl ConditionResult {
  pub fn new(probability: f64) -> Self {
    ConditionResult {
      probability,
      percentage: round_to(probability * 100.0, PERCENTAGE_DECIMALS),
      risk_level: RiskLevel::from_probability(probability),
    }
  }
}

/// 前端使用的带说明的预测结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedPrediction {
  pub model: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub disclaimer: String,
  pub results: LabelMap<ConditionResult>,
}

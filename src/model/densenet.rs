// 该文件是 XRay Predict 项目的一部分。
// src/model/densenet.rs - DenseNet 胸片分类模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use tracing::{debug, error, info, warn};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{GrayNchwFrame, XRAY_INPUT_H, XRAY_INPUT_W},
  input::AsNchwFrame,
  labels::{LabelError, LabelSet},
  model::{ClassifyResult, Model, OutputActivation, WithLabels},
  prediction::ShapeMismatch,
};

const DENSENET_NUM_INPUTS: usize = 1;
const DENSENET_NUM_OUTPUTS: usize = 1;

type DenseNetPlan = TypedRunnableModel<TypedModel>;

/// 胸片模型的默认输入尺寸 224x224
pub type XrayDenseNet = DenseNet<XRAY_INPUT_W, XRAY_INPUT_H>;

/// 已优化、可直接运行的 DenseNet，加载后不再修改
pub struct DenseNet<const W: u32, const H: u32> {
  plan: DenseNetPlan,
  labels: LabelSet,
  activation: OutputActivation,
}

#[derive(Error, Debug)]
pub enum DenseNetError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, TractError),
  #[error("推理错误: {0}")]
  TractError(TractError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("标签错误: {0}")]
  LabelError(#[from] LabelError),
  #[error("输出形状错误: {0}")]
  ShapeMismatch(#[from] ShapeMismatch),
}

impl From<std::io::Error> for DenseNetError {
  fn from(err: std::io::Error) -> Self {
    DenseNetError::ModelLoadError(err)
  }
}

impl From<TractError> for DenseNetError {
  fn from(err: TractError) -> Self {
    DenseNetError::TractError(err)
  }
}

impl DenseNetError {
  pub fn invalid(msg: &str, e: TractError) -> Self {
    DenseNetError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct DenseNetBuilder {
  model_path: String,
  labels: LabelSet,
  activation: OutputActivation,
}

impl FromUrlWithScheme for DenseNetBuilder {
  const SCHEME: &'static str = "densenet";
}

impl FromUrl for DenseNetBuilder {
  type Error = DenseNetError;

  /// `densenet:///path/model.onnx[?activation=sigmoid]`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DenseNetError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut activation = OutputActivation::default();
    for (k, v) in url.query_pairs() {
      if k == "activation" {
        activation = v.parse().map_err(DenseNetError::ModelPathError)?;
      }
    }

    Ok(DenseNetBuilder {
      model_path: url.path().to_string(),
      labels: LabelSet::default(),
      activation,
    })
  }
}

impl DenseNetBuilder {
  pub fn labels(mut self, labels: LabelSet) -> Self {
    self.labels = labels;
    self
  }

  pub fn activation(mut self, activation: OutputActivation) -> Self {
    self.activation = activation;
    self
  }

  pub fn build<const W: u32, const H: u32>(self) -> Result<DenseNet<W, H>, DenseNetError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let model = tract_onnx::onnx()
      .model_for_read(&mut model_data.as_slice())
      .map_err(|e| DenseNetError::invalid("无法解析 ONNX 模型", e))?;

    let num_inputs = model.input_outlets()?.len();
    let num_outputs = model.output_outlets()?.len();
    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);

    if num_inputs != DENSENET_NUM_INPUTS || num_outputs != DENSENET_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        DENSENET_NUM_INPUTS, DENSENET_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(DenseNetError::invalid(&msg, anyhow::anyhow!("输入输出数量不匹配")));
    }

    info!("固定模型输入形状: [1, 1, {}, {}]", H, W);
    let model = model
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 1, H as usize, W as usize)),
      )
      .map_err(|e| DenseNetError::invalid("无法设置输入形状", e))?
      .into_optimized()
      .map_err(|e| DenseNetError::invalid("模型优化失败", e))?;

    // 输出形状已知时在加载阶段校验标签数量
    match model.output_fact(0)?.shape.as_concrete() {
      Some(shape) => {
        let outputs = shape.iter().product::<usize>();
        debug!("模型输出形状: {:?}", shape);
        if let Err(e) = ShapeMismatch::check(self.labels.len(), outputs) {
          error!("标签表与模型输出不一致: {}", e);
          return Err(e.into());
        }
      }
      None => warn!("模型输出形状不是常量，标签数量将在推理时校验"),
    }

    let plan = model
      .into_runnable()
      .map_err(|e| DenseNetError::invalid("无法生成执行计划", e))?;
    info!(
      "模型加载完成: {} 个标签, 输出激活: {}",
      self.labels.len(),
      self.activation
    );

    Ok(DenseNet {
      plan,
      labels: self.labels,
      activation: self.activation,
    })
  }
}

impl<const W: u32, const H: u32> DenseNet<W, H> {
  fn postprocess(&self, output: TVec<TValue>) -> Result<ClassifyResult, DenseNetError> {
    debug!("后处理模型输出");
    let output = output
      .first()
      .ok_or_else(|| DenseNetError::invalid("模型没有输出", anyhow::anyhow!("空输出")))?;
    // 去掉批维度，展平成每个标签一个值
    let scores = output
      .to_array_view::<f32>()?
      .iter()
      .map(|&v| self.activation.apply(v))
      .collect::<Vec<_>>();
    debug!("模型推理结果：{:?}", scores);

    ShapeMismatch::check(self.labels.len(), scores.len())?;
    Ok(ClassifyResult::from(scores))
  }
}

impl<const W: u32, const H: u32> Model for DenseNet<W, H> {
  type Input = GrayNchwFrame<W, H>;
  type Output = ClassifyResult;
  type Error = DenseNetError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let tensor = Tensor::from_shape(&input.shape(), input.as_nchw())?;

    debug!("执行模型推理");
    let output = self.plan.run(tvec!(tensor.into()))?;

    self.postprocess(output)
  }
}

impl<const W: u32, const H: u32> WithLabels for DenseNet<W, H> {
  fn labels(&self) -> &LabelSet {
    &self.labels
  }
}

// 该文件是 XRay Predict 项目的一部分。
// src/task.rs - 离线推理任务
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

use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::{
  model::{ClassifyResult, Model, WithLabels},
  output::Render,
  prediction::Prediction,
};

/// 预热轮数，不计入平均耗时
const WARMUP_ROUNDS: usize = 2;

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 推理一帧并按标签表格式化
pub fn classify<F, M>(model: &M, frame: &F) -> anyhow::Result<Prediction>
where
  M: Model<Input = F, Output = ClassifyResult> + WithLabels,
  M::Error: std::error::Error + Sync + Send + 'static,
{
  let result = model.infer(frame)?;
  Ok(Prediction::from_scores(model.labels(), &result.scores)?)
}

pub struct OneShotTask;

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = ClassifyResult, Error = ME> + WithLabels,
  O: Render<F, Prediction, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let prediction = classify(&model, &frame)?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &prediction)?;
    info!("输出完成");

    Ok(())
  }
}

#[derive(Debug)]
pub struct RepeatShotTask {
  repeat: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    RepeatShotTask { repeat: 100 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat.max(WARMUP_ROUNDS + 1);
    self
  }
}

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = ClassifyResult, Error = ME> + WithLabels,
  O: Render<F, Prediction, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");

    let mut times = Vec::with_capacity(self.repeat);
    let mut first: Option<Prediction> = None;
    for i in 0..self.repeat {
      let now = Instant::now();
      let prediction = classify(&model, &frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);

      let expected = first.get_or_insert_with(|| prediction.clone());
      if *expected != prediction {
        error!("({})推理结果与首次不一致", i);
        anyhow::bail!("相同输入的推理结果不一致");
      }
    }

    if let Some(prediction) = &first {
      output.render_result(&frame, prediction)?;
    }

    warn!("平均推理时间: {:.2?}", average_after_warmup(&times));

    Ok(())
  }
}

fn average_after_warmup(times: &[Duration]) -> Duration {
  let measured = times.get(WARMUP_ROUNDS..).unwrap_or_default();
  if measured.is_empty() {
    return Duration::ZERO;
  }
  measured.iter().sum::<Duration>() / measured.len() as u32
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::labels::LabelSet;
  use std::cell::{Cell, RefCell};
  use thiserror::Error;

  #[derive(Error, Debug)]
  #[error("stub")]
  struct StubError;

  struct StubModel {
    labels: LabelSet,
    scores: Vec<f32>,
    calls: Cell<usize>,
  }

  impl Model for StubModel {
    type Input = u8;
    type Output = ClassifyResult;
    type Error = StubError;

    fn infer(&self, _input: &u8) -> Result<ClassifyResult, StubError> {
      self.calls.set(self.calls.get() + 1);
      Ok(ClassifyResult::from(self.scores.clone()))
    }
  }

  impl WithLabels for StubModel {
    fn labels(&self) -> &LabelSet {
      &self.labels
    }
  }

  #[derive(Default)]
  struct Collect {
    rendered: RefCell<Vec<Prediction>>,
  }

  impl Render<u8, Prediction> for &Collect {
    type Error = StubError;

    fn render_result(&self, _frame: &u8, result: &Prediction) -> Result<(), StubError> {
      self.rendered.borrow_mut().push(result.clone());
      Ok(())
    }
  }

  fn stub(scores: Vec<f32>) -> StubModel {
    StubModel {
      labels: LabelSet::parse("Edema\nMass\n").unwrap(),
      scores,
      calls: Cell::new(0),
    }
  }

  #[test]
  fn one_shot_renders_single_prediction() {
    let collect = Collect::default();
    OneShotTask
      .run_task(std::iter::once(0u8), stub(vec![0.2, 0.8]), &collect)
      .unwrap();
    let rendered = collect.rendered.borrow();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].get("Mass"), Some(0.8));
  }

  #[test]
  fn one_shot_without_input_fails() {
    let collect = Collect::default();
    let result = OneShotTask.run_task(std::iter::empty::<u8>(), stub(vec![0.2, 0.8]), &collect);
    assert!(result.is_err());
  }

  #[test]
  fn label_mismatch_surfaces_as_error() {
    let collect = Collect::default();
    let result = OneShotTask.run_task(std::iter::once(0u8), stub(vec![0.2]), &collect);
    assert!(result.is_err());
    assert!(collect.rendered.borrow().is_empty());
  }

  #[test]
  fn repeat_shot_runs_requested_rounds() {
    let collect = Collect::default();
    let model = stub(vec![0.1, 0.9]);
    let task = RepeatShotTask::default().with_repeat(5);
    task.run_task(std::iter::once(0u8), &model, &collect).unwrap();
    assert_eq!(model.calls.get(), 5);
    assert_eq!(collect.rendered.borrow().len(), 1);
  }

  #[test]
  fn average_skips_warmup() {
    let times = [
      Duration::from_millis(100),
      Duration::from_millis(100),
      Duration::from_millis(10),
      Duration::from_millis(20),
    ];
    assert_eq!(average_after_warmup(&times), Duration::from_millis(15));
    assert_eq!(average_after_warmup(&times[..2]), Duration::ZERO);
  }
}

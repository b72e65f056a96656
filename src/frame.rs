// 该文件是 XRay Predict 项目的一部分。
// src/frame.rs - NCHW 灰度帧定义
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

use thiserror::Error;

use crate::input::AsNchwFrame;

const GRAY_CHANNELS: usize = 1;
const BATCH_SIZE: usize = 1;

/// 模型输入分辨率
pub const XRAY_INPUT_W: u32 = 224;
pub const XRAY_INPUT_H: u32 = 224;

/// 胸片模型使用的输入帧，形状为 [1, 1, 224, 224]
pub type XrayFrame = GrayNchwFrame<XRAY_INPUT_W, XRAY_INPUT_H>;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
pub struct FrameLengthError {
  pub expected: usize,
  pub actual: usize,
}

/// 单通道 NCHW 浮点帧，批大小固定为 1
#[derive(Debug, Clone, PartialEq)]
pub struct GrayNchwFrame<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> GrayNchwFrame<W, H> {
  const LEN: usize = BATCH_SIZE * GRAY_CHANNELS * (W as usize) * (H as usize);

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    GRAY_CHANNELS
  }

  /// 张量形状 [N, C, H, W]
  pub fn shape(&self) -> [usize; 4] {
    [BATCH_SIZE, GRAY_CHANNELS, H as usize, W as usize]
  }
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for GrayNchwFrame<W, H> {
  type Error = FrameLengthError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(FrameLengthError {
        expected: Self::LEN,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for GrayNchwFrame<W, H> {
  fn default() -> Self {
    let data = vec![0f32; Self::LEN].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for GrayNchwFrame<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

impl<const W: u32, const H: u32> AsNchwFrame<W, H> for GrayNchwFrame<W, H> {
  fn as_nchw(&self) -> &[f32] {
    &self.data
  }
}

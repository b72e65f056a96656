// 该文件是 XRay Predict 项目的一部分。
// tests/server.rs - HTTP 接口测试
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

use std::{io::Cursor, sync::Arc};

use axum::{
  Router,
  body::{Body, Bytes},
  http::{Request, StatusCode},
};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use serde_json::Value;
use tower::ServiceExt;

use xray_predict::{
  frame::XrayFrame,
  input::AsNchwFrame,
  labels::LabelSet,
  model::{ClassifyResult, Model, WithLabels},
  server::{AppState, ServerConfig, create_router},
};

const BOUNDARY: &str = "xray-predict-test-boundary";

#[derive(Debug, thiserror::Error)]
#[error("stub inference failure")]
struct StubError;

/// 输出只取决于图像平均亮度的桩模型
struct StubModel {
  labels: LabelSet,
  outputs: usize,
}

impl Model for StubModel {
  type Input = XrayFrame;
  type Output = ClassifyResult;
  type Error = StubError;

  fn infer(&self, input: &XrayFrame) -> Result<ClassifyResult, StubError> {
    let data = input.as_nchw();
    let mean = data.iter().sum::<f32>() / data.len() as f32;
    let brightness = (mean / 1024.0 + 1.0) / 2.0;
    let scores = (0..self.outputs)
      .map(|i| 0.1 + 0.8 * brightness * (i + 1) as f32 / self.outputs as f32)
      .collect::<Vec<_>>();
    Ok(scores.into())
  }
}

impl WithLabels for StubModel {
  fn labels(&self) -> &LabelSet {
    &self.labels
  }
}

/// 无论输入如何都返回固定输出的桩模型
struct FixedScoresModel {
  labels: LabelSet,
  scores: Vec<f32>,
}

impl Model for FixedScoresModel {
  type Input = XrayFrame;
  type Output = ClassifyResult;
  type Error = StubError;

  fn infer(&self, _input: &XrayFrame) -> Result<ClassifyResult, StubError> {
    Ok(self.scores.clone().into())
  }
}

impl WithLabels for FixedScoresModel {
  fn labels(&self) -> &LabelSet {
    &self.labels
  }
}

fn app_with_scores(scores: Vec<f32>) -> Router {
  let config = ServerConfig::default();
  let model = FixedScoresModel {
    labels: LabelSet::xrv_default(),
    scores,
  };
  create_router(Arc::new(AppState::new(model, &config)), &config)
}

fn app_with(outputs: usize, config: ServerConfig) -> Router {
  let model = StubModel {
    labels: LabelSet::xrv_default(),
    outputs,
  };
  let state = Arc::new(AppState::new(model, &config));
  create_router(state, &config)
}

fn app() -> Router {
  app_with(15, ServerConfig::default())
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
  let mut buf = Cursor::new(Vec::new());
  image.write_to(&mut buf, format).unwrap();
  buf.into_inner()
}

fn black_png() -> Vec<u8> {
  encode(
    &DynamicImage::ImageLuma8(GrayImage::new(224, 224)),
    ImageFormat::Png,
  )
}

fn upload(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
  let mut body = Vec::new();
  body.extend_from_slice(
    format!(
      "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"chest.png\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .as_bytes(),
  );
  body.extend_from_slice(bytes);
  body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

  Request::builder()
    .method("POST")
    .uri(uri)
    .header(
      "content-type",
      format!("multipart/form-data; boundary={BOUNDARY}"),
    )
    .body(Body::from(body))
    .unwrap()
}

fn get(uri: &str) -> Request<Body> {
  Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  (status, bytes)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
  let (status, bytes) = send_raw(app, request).await;
  (status, serde_json::from_slice(&bytes).unwrap())
}

fn assert_valid_prediction(value: &Value) {
  let map = value.as_object().expect("prediction is a JSON object");
  let labels = LabelSet::xrv_default();
  assert_eq!(map.len(), labels.len());
  for label in labels.iter() {
    let p = map[label].as_f64().expect("probability is a number");
    assert!((0.0..=1.0).contains(&p), "{label} = {p}");
    assert_eq!((p * 10000.0).round() / 10000.0, p, "{label} has more than 4 decimals");
  }
}

#[tokio::test]
async fn health_reports_ok() {
  let (status, body) = send(&app(), get("/health")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn predict_black_png_returns_all_labels() {
  let (status, body) = send(&app(), upload("/predict", "file", &black_png())).await;
  assert_eq!(status, StatusCode::OK);
  assert_valid_prediction(&body);
  assert_eq!(body["Atelectasis"], 0.1);
  assert_eq!(body["Lung Lesion"], 0.1);
}

#[tokio::test]
async fn predict_keeps_label_order() {
  let (status, bytes) = send_raw(&app(), upload("/predict", "file", &black_png())).await;
  assert_eq!(status, StatusCode::OK);
  let text = std::str::from_utf8(&bytes).unwrap();

  let positions: Vec<usize> = LabelSet::xrv_default()
    .iter()
    .map(|label| text.find(&format!("\"{label}\"")).unwrap())
    .collect();
  assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
}

#[tokio::test]
async fn identical_uploads_give_identical_predictions() {
  let image = DynamicImage::ImageLuma8(GrayImage::from_fn(300, 260, |x, y| {
    Luma([((x + 2 * y) % 256) as u8])
  }));
  let bytes = encode(&image, ImageFormat::Png);
  let app = app();

  let (_, first) = send(&app, upload("/predict", "file", &bytes)).await;
  let (_, second) = send(&app, upload("/predict", "file", &bytes)).await;
  assert_valid_prediction(&first);
  assert_eq!(first, second);
}

#[tokio::test]
async fn non_square_color_jpeg_is_accepted() {
  let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(1024, 333, Rgb([200, 120, 40])));
  let bytes = encode(&image, ImageFormat::Jpeg);

  let (status, body) = send(&app(), upload("/predict", "file", &bytes)).await;
  assert_eq!(status, StatusCode::OK);
  assert_valid_prediction(&body);
}

#[tokio::test]
async fn text_upload_is_a_decode_error_and_health_survives() {
  let app = app();
  let (status, body) = send(
    &app,
    upload("/predict", "file", b"hello, I am a text file posing as an image"),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["detail"].as_str().unwrap().contains("not a valid image"));

  let (status, body) = send(&app, get("/health")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn missing_file_field_is_unprocessable() {
  let (status, body) = send(&app(), upload("/predict", "image", &black_png())).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["detail"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn output_length_mismatch_fails_loudly() {
  let app = app_with(18, ServerConfig::default());
  let (status, body) = send(&app, upload("/predict", "file", &black_png())).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert!(body.get("Atelectasis").is_none());
  assert!(body["detail"].as_str().unwrap().contains("label"));
}

#[tokio::test]
async fn detailed_prediction_envelope() {
  let (status, body) = send(&app(), upload("/predict/detailed", "file", &black_png())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["model"], "densenet121-res224-all");
  assert_eq!(body["type"], "chest-xray");
  assert!(body["disclaimer"].is_string());

  let results = body["results"].as_object().unwrap();
  assert_eq!(results.len(), 15);
  assert_eq!(results["Edema"]["probability"], 0.1);
  assert_eq!(results["Edema"]["percentage"], 10.0);
  assert_eq!(results["Edema"]["risk_level"], "Low");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
  let config = ServerConfig {
    body_limit: 1024,
    ..ServerConfig::default()
  };
  let app = app_with(15, config);
  let (status, _) = send_raw(&app, upload("/predict", "file", &vec![0u8; 64 * 1024])).await;
  assert!(status.is_client_error());
}

#[tokio::test]
async fn non_finite_or_out_of_range_scores_are_rejected() {
  let mut scores = vec![0.5f32; 15];
  scores[0] = f32::NAN;
  scores[1] = 3.7;
  let app = app_with_scores(scores);

  for uri in ["/predict", "/predict/detailed"] {
    let (status, body) = send(&app, upload(uri, "file", &black_png())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("Atelectasis").is_none());
    assert!(body.get("results").is_none());
    assert!(body["detail"].as_str().unwrap().contains("probability"));
  }

  let mut scores = vec![0.5f32; 15];
  scores[14] = -0.2;
  let (status, _) = send(&app_with_scores(scores), upload("/predict", "file", &black_png())).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn boundary_scores_are_accepted() {
  let mut scores = vec![0.0f32; 15];
  scores[14] = 1.0;
  let (status, body) = send(&app_with_scores(scores), upload("/predict", "file", &black_png())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["Atelectasis"], 0.0);
  assert_eq!(body["Lung Lesion"], 1.0);
}

#[tokio::test]
async fn non_multipart_request_gets_json_detail() {
  let request = Request::builder()
    .method("POST")
    .uri("/predict")
    .body(Body::from("abc"))
    .unwrap();
  let response = app().oneshot(request).await.unwrap();
  assert!(response.status().is_client_error());
  let content_type = response
    .headers()
    .get("content-type")
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .to_string();
  assert!(content_type.starts_with("application/json"));

  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert!(body["detail"].is_string());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
  let (status, body) = send(&app(), get("/metrics")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["detail"], "Not Found");
}

#[tokio::test]
async fn health_answers_while_predictions_are_in_flight() {
  let app = app();
  let bytes = black_png();

  let (a, b, health) = tokio::join!(
    send(&app, upload("/predict", "file", &bytes)),
    send(&app, upload("/predict", "file", &bytes)),
    send(&app, get("/health")),
  );

  assert_eq!(a.0, StatusCode::OK);
  assert_eq!(b.0, StatusCode::OK);
  assert_eq!(a.1, b.1);
  assert_eq!(health.1["status"], "ok");
}

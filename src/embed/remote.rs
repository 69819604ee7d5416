use std::io::Cursor;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use super::Embedder;
use crate::config::EmbedOptions;

const RETRY_ATTEMPTS: u32 = 3;

/// HTTP 嵌入服务客户端
///
/// 请求体为 JSON：`{"model": "...", "image": "<base64 PNG>"}`，
/// 响应体为 `{"embedding": [f32; dim]}`。
/// 5xx 和传输错误会按指数退避重试，4xx 立即失败。
#[derive(Debug, Clone)]
pub struct RemoteEmbedder {
    url: Url,
    model: String,
    dim: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    image: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl RemoteEmbedder {
    pub fn new(opts: &EmbedOptions) -> Result<Self> {
        let url = Url::parse(&opts.embed_url)
            .with_context(|| format!("无效的嵌入服务地址：{}", opts.embed_url))?
            .join("embed")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(opts.embed_timeout)))
            .build()
            .into();

        Ok(Self { url, model: opts.embed_model.clone(), dim: opts.embed_dim, agent })
    }

    fn request(&self, body: &str) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=RETRY_ATTEMPTS {
            let result = self
                .agent
                .post(self.url.as_str())
                .header("Content-Type", "application/json")
                .send(body)
                .and_then(|mut resp| resp.body_mut().read_to_string());

            match result {
                Ok(text) => return Ok(text),
                Err(error) => {
                    let retryable = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                true
                            } else {
                                return Err(anyhow!("嵌入服务返回 HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => true,
                        _ => false,
                    };
                    if !retryable {
                        return Err(anyhow!("嵌入请求失败：{}", error));
                    }
                    warn!("嵌入请求失败（第 {}/{} 次）：{}", attempt, RETRY_ATTEMPTS, error);
                    last_error = Some(error);
                    if attempt < RETRY_ATTEMPTS {
                        std::thread::sleep(Duration::from_millis(2u64.pow(attempt - 1) * 1000));
                    }
                }
            }
        }

        Err(anyhow!("嵌入请求重试 {} 次后仍然失败：{}", RETRY_ATTEMPTS, last_error.unwrap()))
    }
}

impl Embedder for RemoteEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, image: &RgbImage) -> Result<Vec<f32>> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).context("编码图片失败")?;

        let request =
            EmbedRequest { model: &self.model, image: STANDARD.encode(&png) };
        let body = serde_json::to_string(&request)?;

        let text = self.request(&body)?;
        let response: EmbedResponse =
            serde_json::from_str(&text).context("解析嵌入响应失败")?;

        if response.embedding.len() != self.dim {
            return Err(anyhow!(
                "嵌入服务返回的维数不匹配：期望 {}，实际 {}",
                self.dim,
                response.embedding.len()
            ));
        }

        debug!("嵌入完成，维数 {}", response.embedding.len());
        Ok(response.embedding)
    }
}

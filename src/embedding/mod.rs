//! 임베딩 모듈 - OpenAI API를 통한 텍스트 벡터화
//!
//! 텍스트를 벡터로 변환하는 OpenAI 임베딩 프로바이더입니다.
//! 시맨틱 검색을 위한 핵심 모듈입니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = OpenAiEmbedding::from_env()?;
//! let embedding = embedder.embed("Hello, world!").await?;
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// OpenAI 임베딩 API 엔드포인트
/// source: https://platform.openai.com/docs/api-reference/embeddings
const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";

/// 기본 임베딩 모델
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-ada-002";

/// 기본 임베딩 차원 (text-embedding-ada-002)
pub const DEFAULT_DIMENSION: usize = 1536;

/// OpenAI 임베딩 구현체
///
/// 결정적(deterministic) 출력: 같은 모델 버전에서 같은 입력은 같은 벡터를 반환합니다.
#[derive(Debug)]
pub struct OpenAiEmbedding {
    api_key: String,
    client: reqwest::Client,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedding {
    /// 새 OpenAI 임베딩 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API 키
    /// * `model` - 임베딩 모델 이름
    /// * `dimension` - 모델 출력 차원
    pub fn new(api_key: String, model: String, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            anyhow::bail!("Embedding dimension must be greater than 0");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            client,
            model,
            dimension,
        })
    }

    /// 환경변수에서 API 키를 읽어 기본 모델로 생성
    pub fn from_env() -> Result<Self> {
        let api_key = crate::config::openai_api_key()?;
        Self::new(api_key, DEFAULT_EMBED_MODEL.to_string(), DEFAULT_DIMENSION)
    }
}

/// OpenAI 임베딩 요청 본문
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// OpenAI 임베딩 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// OpenAI API 에러 응답
#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiError {
    pub(crate) error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiErrorDetail {
    pub(crate) message: String,
    #[serde(default, rename = "type")]
    pub(crate) kind: String,
}

/// OpenAI API 에러 본문을 anyhow 에러로 변환
pub(crate) fn openai_api_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    if let Ok(error) = serde_json::from_str::<OpenAiError>(body) {
        anyhow::anyhow!(
            "OpenAI API error ({} {}): {}",
            status,
            error.error.kind,
            error.error.message
        )
    } else {
        anyhow::anyhow!("OpenAI API error ({}): {}", status, body)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // 빈 텍스트 처리
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(OPENAI_EMBED_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read embedding response body")?;

        if !status.is_success() {
            return Err(openai_api_error(status, &body));
        }

        let embed_response: EmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;

        let embedding = embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("Embedding response contained no data"))?;

        // 인덱스 차원과 임베딩 차원은 반드시 일치해야 함
        if embedding.len() != self.dimension {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            );
        }

        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            tracing::debug!("Embedding batch {}/{}", i + 1, texts.len());
            results.push(self.embed(text).await?);
        }

        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================

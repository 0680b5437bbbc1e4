//! Pinecone 클라이언트 - 호스티드 벡터 스토어
//!
//! 컨트롤 플레인(인덱스 카탈로그)과 데이터 플레인(upsert/query)을
//! REST API로 호출합니다.
//! ref: https://docs.pinecone.io/reference/api/introduction

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::vector::{Chunk, IndexCatalog, IndexEntry, ScoredChunk, VectorIndex};

/// 컨트롤 플레인 베이스 URL
const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// API 버전 헤더 값
const API_VERSION: &str = "2025-01";

/// 메타데이터에서 청크 텍스트를 담는 키
const TEXT_KEY: &str = "text";

/// upsert 배치 크기 (Pinecone 권장 한도 이하)
const UPSERT_BATCH: usize = 100;

/// 인덱스 생성 후 ready 대기 폴링 간격/횟수
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);
const READY_MAX_POLLS: u32 = 60;

// ============================================================================
// PineconeClient (컨트롤 플레인)
// ============================================================================

/// Pinecone 카탈로그 클라이언트
///
/// 서버리스 인덱스의 조회/생성/삭제를 담당합니다.
pub struct PineconeClient {
    api_key: String,
    client: reqwest::Client,
    cloud: String,
    region: String,
}

impl PineconeClient {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `api_key` - Pinecone API 키
    /// * `cloud` - 서버리스 클라우드 (aws/gcp/azure)
    /// * `region` - 서버리스 리전
    pub fn new(api_key: String, cloud: String, region: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            client,
            cloud,
            region,
        })
    }

    /// 인덱스 상세 조회
    async fn describe(&self, name: &str) -> Result<IndexDescription> {
        let url = format!("{}/indexes/{}", CONTROL_PLANE_URL, name);
        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .context("Failed to send describe request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read body")?;

        if !status.is_success() {
            return Err(pinecone_api_error(status, &body));
        }

        serde_json::from_str(&body).context("Failed to parse index description")
    }
}

// ============================================================================
// Control Plane API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexDescription {
    name: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

/// Pinecone API 에러 응답
#[derive(Debug, Deserialize)]
struct PineconeError {
    error: PineconeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct PineconeErrorDetail {
    message: String,
    #[serde(default)]
    code: String,
}

/// Pinecone API 에러 본문을 anyhow 에러로 변환
fn pinecone_api_error(status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    if let Ok(error) = serde_json::from_str::<PineconeError>(body) {
        anyhow::anyhow!(
            "Pinecone API error ({} {}): {}",
            status,
            error.error.code,
            error.error.message
        )
    } else {
        anyhow::anyhow!("Pinecone API error ({}): {}", status, body)
    }
}

#[async_trait]
impl IndexCatalog for PineconeClient {
    async fn index_exists(&self, name: &str) -> Result<bool> {
        let url = format!("{}/indexes", CONTROL_PLANE_URL);
        let response = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .context("Failed to list indexes")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read body")?;

        if !status.is_success() {
            return Err(pinecone_api_error(status, &body));
        }

        let list: IndexList = serde_json::from_str(&body).context("Failed to parse index list")?;
        Ok(list.indexes.iter().any(|i| i.name == name))
    }

    async fn create_index(&self, name: &str, dimension: usize, metric: &str) -> Result<()> {
        let url = format!("{}/indexes", CONTROL_PLANE_URL);
        let request = CreateIndexRequest {
            name,
            dimension,
            metric,
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to send create index request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read body")?;

        if !status.is_success() {
            return Err(pinecone_api_error(status, &body));
        }

        // 인덱스가 사용 가능해질 때까지 대기
        for _ in 0..READY_MAX_POLLS {
            let description = self.describe(name).await?;
            if description.status.ready {
                tracing::info!("Index '{}' is ready (dimension={})", name, dimension);
                return Ok(());
            }
            tracing::debug!("Index '{}' not ready yet, polling...", name);
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }

        anyhow::bail!("Index '{}' did not become ready in time", name)
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        let url = format!("{}/indexes/{}", CONTROL_PLANE_URL, name);
        let response = self
            .client
            .delete(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .context("Failed to send delete index request")?;

        let status = response.status();

        // 404는 이미 없는 것이므로 no-op
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(pinecone_api_error(status, &body));
        }

        tracing::info!("Deleted index '{}'", name);
        Ok(())
    }

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let description = self.describe(name).await?;
        if description.host.is_empty() {
            anyhow::bail!("Index '{}' has no host assigned yet", name);
        }

        Ok(Arc::new(PineconeIndex::new(
            self.api_key.clone(),
            description.host,
        )?))
    }
}

// ============================================================================
// PineconeIndex (데이터 플레인)
// ============================================================================

/// 단일 Pinecone 인덱스 핸들
pub struct PineconeIndex {
    api_key: String,
    client: reqwest::Client,
    host: String,
}

impl PineconeIndex {
    /// 인덱스 호스트로 핸들 생성
    pub fn new(api_key: String, host: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            client,
            host,
        })
    }

    /// 데이터 플레인 URL 구성 (호스트의 스킴 유무 허용)
    fn data_url(&self, path: &str) -> String {
        let host = self
            .host
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        format!("https://{}{}", host, path)
    }
}

// ============================================================================
// Data Plane API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct UpsertRequest {
    vectors: Vec<PineconeVector>,
}

#[derive(Debug, Serialize)]
struct PineconeVector {
    id: String,
    values: Vec<f32>,
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    #[serde(default, rename = "upsertedCount")]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    #[allow(dead_code)]
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

/// 쿼리 매치를 검색 결과로 변환
///
/// 메타데이터의 `text` 키가 청크 본문이고 나머지는 소스 메타데이터입니다.
fn match_to_scored(m: QueryMatch) -> ScoredChunk {
    let mut metadata = m.metadata;
    let text = metadata.remove(TEXT_KEY).unwrap_or_default();

    ScoredChunk {
        chunk: Chunk { text, metadata },
        score: m.score,
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut upserted = 0;

        for batch in entries.chunks(UPSERT_BATCH) {
            let vectors = batch
                .iter()
                .map(|entry| {
                    let mut metadata = entry.chunk.metadata.clone();
                    metadata.insert(TEXT_KEY.to_string(), entry.chunk.text.clone());
                    PineconeVector {
                        id: entry.id.clone(),
                        values: entry.embedding.clone(),
                        metadata,
                    }
                })
                .collect();

            let response = self
                .client
                .post(self.data_url("/vectors/upsert"))
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .json(&UpsertRequest { vectors })
                .send()
                .await
                .context("Failed to send upsert request")?;

            let status = response.status();
            let body = response.text().await.context("Failed to read body")?;

            if !status.is_success() {
                return Err(pinecone_api_error(status, &body));
            }

            let parsed: UpsertResponse =
                serde_json::from_str(&body).context("Failed to parse upsert response")?;
            upserted += parsed.upserted_count;
        }

        tracing::debug!("Upserted {} vectors", upserted);
        Ok(upserted)
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let request = QueryRequest {
            vector: embedding,
            top_k,
            include_metadata: true,
        };

        let response = self
            .client
            .post(self.data_url("/query"))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to send query request")?;

        let status = response.status();
        let body = response.text().await.context("Failed to read body")?;

        if !status.is_success() {
            return Err(pinecone_api_error(status, &body));
        }

        let parsed: QueryResponse =
            serde_json::from_str(&body).context("Failed to parse query response")?;

        // 스토어 고유 순서(유사도 내림차순) 그대로 반환
        Ok(parsed.matches.into_iter().map(match_to_scored).collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Index Builder - 인덱스 생성-또는-재사용
//!
//! 청크 집합을 이름 있는 벡터 인덱스로 만듭니다. 이미 존재하는 인덱스를
//! 어떻게 다룰지는 명시적인 `RefreshPolicy`로 결정합니다.
//! 빌드 경로는 오프라인 1회 실행이므로 에러는 그대로 전파됩니다 (재시도 없음).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::embedding::EmbeddingProvider;

use super::vector::{chunk_id, Chunk, IndexCatalog, IndexEntry, VectorIndex};

// ============================================================================
// RefreshPolicy
// ============================================================================

/// 기존 인덱스 리프레시 정책
///
/// - `Reuse`: 기존 데이터를 신뢰하고 아무것도 쓰지 않음 (staleness 위험은 로그로 경고)
/// - `Upsert`: 공급된 청크를 전부 임베딩하여 기존 인덱스에 upsert (결정적 ID로 멱등)
/// - `Rebuild`: 인덱스를 지우고 처음부터 다시 생성
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    Reuse,
    Upsert,
    Rebuild,
}

impl FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reuse" => Ok(RefreshPolicy::Reuse),
            "upsert" => Ok(RefreshPolicy::Upsert),
            "rebuild" => Ok(RefreshPolicy::Rebuild),
            other => Err(format!(
                "unknown refresh policy '{}' (expected: reuse, upsert, rebuild)",
                other
            )),
        }
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPolicy::Reuse => write!(f, "reuse"),
            RefreshPolicy::Upsert => write!(f, "upsert"),
            RefreshPolicy::Rebuild => write!(f, "rebuild"),
        }
    }
}

// ============================================================================
// IndexBuilder
// ============================================================================

/// 인덱스 빌더
///
/// 카탈로그와 임베더를 주입받아 동작합니다. 동시에 두 번 실행하면
/// exists 확인과 생성 사이에 레이스가 있으므로 빌드는 단독 실행이 전제입니다.
pub struct IndexBuilder {
    catalog: Arc<dyn IndexCatalog>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexBuilder {
    /// 새 빌더 생성
    pub fn new(catalog: Arc<dyn IndexCatalog>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { catalog, embedder }
    }

    /// 인덱스 생성 또는 재사용
    ///
    /// 없으면 생성 후 청크를 임베딩하여 기록하고, 있으면 정책에 따라
    /// 재사용/upsert/재생성합니다.
    pub async fn get_or_create_index(
        &self,
        chunks: &[Chunk],
        name: &str,
        dimension: usize,
        metric: &str,
        policy: RefreshPolicy,
    ) -> Result<Arc<dyn VectorIndex>> {
        // 인덱스 차원은 임베딩 모델 출력 차원과 일치해야 함
        if self.embedder.dimension() != dimension {
            anyhow::bail!(
                "Index dimension ({}) does not match embedder output dimension ({})",
                dimension,
                self.embedder.dimension()
            );
        }

        let exists = self
            .catalog
            .index_exists(name)
            .await
            .context("Failed to check index existence")?;

        match (exists, policy) {
            (true, RefreshPolicy::Reuse) => {
                if !chunks.is_empty() {
                    tracing::warn!(
                        "Index '{}' already exists; skipping {} supplied chunks \
                         (refresh=reuse). Existing data may be stale.",
                        name,
                        chunks.len()
                    );
                }
                self.catalog.open_index(name).await
            }
            (true, RefreshPolicy::Upsert) => {
                tracing::info!("Index '{}' exists; upserting {} chunks", name, chunks.len());
                let index = self.catalog.open_index(name).await?;
                self.embed_and_upsert(&index, chunks).await?;
                Ok(index)
            }
            (true, RefreshPolicy::Rebuild) => {
                tracing::info!("Rebuilding index '{}'", name);
                self.catalog.delete_index(name).await?;
                self.create_and_populate(chunks, name, dimension, metric)
                    .await
            }
            (false, _) => {
                tracing::info!("Index '{}' does not exist; creating", name);
                self.create_and_populate(chunks, name, dimension, metric)
                    .await
            }
        }
    }

    /// 인덱스 생성 후 청크 기록
    async fn create_and_populate(
        &self,
        chunks: &[Chunk],
        name: &str,
        dimension: usize,
        metric: &str,
    ) -> Result<Arc<dyn VectorIndex>> {
        self.catalog
            .create_index(name, dimension, metric)
            .await
            .with_context(|| format!("Failed to create index '{}'", name))?;

        let index = self.catalog.open_index(name).await?;
        self.embed_and_upsert(&index, chunks).await?;
        Ok(index)
    }

    /// 청크 임베딩 후 upsert
    async fn embed_and_upsert(
        &self,
        index: &Arc<dyn VectorIndex>,
        chunks: &[Chunk],
    ) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .context("Failed to embed chunks")?;

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry {
                id: chunk_id(&chunk.text),
                embedding,
                chunk: chunk.clone(),
            })
            .collect();

        let upserted = index
            .upsert(&entries)
            .await
            .context("Failed to upsert vectors")?;

        tracing::info!("Upserted {} vectors", upserted);
        Ok(upserted)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingEmbedder, MemoryCatalog};

    const DIM: usize = 8;

    fn sample_chunks() -> Vec<Chunk> {
        vec![
            Chunk::new("HackerEarth offers remote hiring tools."),
            Chunk::new("Pricing plans for growing teams."),
        ]
    }

    #[test]
    fn test_refresh_policy_parsing() {
        assert_eq!("reuse".parse::<RefreshPolicy>().unwrap(), RefreshPolicy::Reuse);
        assert_eq!(
            "REBUILD".parse::<RefreshPolicy>().unwrap(),
            RefreshPolicy::Rebuild
        );
        assert_eq!(
            "upsert".parse::<RefreshPolicy>().unwrap(),
            RefreshPolicy::Upsert
        );
        assert!("replace".parse::<RefreshPolicy>().is_err());
    }

    #[test]
    fn test_refresh_policy_roundtrip() {
        for policy in [
            RefreshPolicy::Reuse,
            RefreshPolicy::Upsert,
            RefreshPolicy::Rebuild,
        ] {
            assert_eq!(policy.to_string().parse::<RefreshPolicy>().unwrap(), policy);
        }
    }

    #[tokio::test]
    async fn test_create_when_absent() {
        let catalog = Arc::new(MemoryCatalog::new());
        let embedder = Arc::new(CountingEmbedder::new(DIM));
        let builder = IndexBuilder::new(catalog.clone(), embedder.clone());

        let index = builder
            .get_or_create_index(&sample_chunks(), "kb", DIM, "cosine", RefreshPolicy::Reuse)
            .await
            .unwrap();

        assert!(catalog.index_exists("kb").await.unwrap());
        assert_eq!(embedder.calls(), 2);

        // 기록된 청크가 검색됨
        let query = crate::testing::pseudo_embedding("HackerEarth offers remote hiring tools.", DIM);
        let results = index.query(&query, 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_reuse_does_not_re_embed() {
        let catalog = Arc::new(MemoryCatalog::new());
        let embedder = Arc::new(CountingEmbedder::new(DIM));
        let builder = IndexBuilder::new(catalog.clone(), embedder.clone());

        let chunks = sample_chunks();
        builder
            .get_or_create_index(&chunks, "kb", DIM, "cosine", RefreshPolicy::Reuse)
            .await
            .unwrap();
        let calls_after_first = embedder.calls();

        // 두 번째 호출: 재사용 의미론이므로 임베딩/쓰기가 없어야 함
        builder
            .get_or_create_index(&chunks, "kb", DIM, "cosine", RefreshPolicy::Reuse)
            .await
            .unwrap();
        assert_eq!(embedder.calls(), calls_after_first);
    }

    #[tokio::test]
    async fn test_upsert_policy_writes_into_existing() {
        let catalog = Arc::new(MemoryCatalog::new());
        let embedder = Arc::new(CountingEmbedder::new(DIM));
        let builder = IndexBuilder::new(catalog.clone(), embedder.clone());

        builder
            .get_or_create_index(&sample_chunks(), "kb", DIM, "cosine", RefreshPolicy::Reuse)
            .await
            .unwrap();

        let new_chunks = vec![Chunk::new("University hiring drives at scale.")];
        builder
            .get_or_create_index(&new_chunks, "kb", DIM, "cosine", RefreshPolicy::Upsert)
            .await
            .unwrap();

        // 기존 2개 + 신규 1개
        assert_eq!(catalog.entry_count("kb"), 3);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let catalog = Arc::new(MemoryCatalog::new());
        let embedder = Arc::new(CountingEmbedder::new(DIM));
        let builder = IndexBuilder::new(catalog.clone(), embedder.clone());

        let chunks = sample_chunks();
        builder
            .get_or_create_index(&chunks, "kb", DIM, "cosine", RefreshPolicy::Upsert)
            .await
            .unwrap();
        builder
            .get_or_create_index(&chunks, "kb", DIM, "cosine", RefreshPolicy::Upsert)
            .await
            .unwrap();

        // 같은 텍스트는 같은 ID로 덮어쓰므로 개수가 늘지 않음
        assert_eq!(catalog.entry_count("kb"), 2);
    }

    #[tokio::test]
    async fn test_rebuild_drops_old_data() {
        let catalog = Arc::new(MemoryCatalog::new());
        let embedder = Arc::new(CountingEmbedder::new(DIM));
        let builder = IndexBuilder::new(catalog.clone(), embedder.clone());

        builder
            .get_or_create_index(&sample_chunks(), "kb", DIM, "cosine", RefreshPolicy::Reuse)
            .await
            .unwrap();

        let replacement = vec![Chunk::new("Fresh corpus only.")];
        builder
            .get_or_create_index(&replacement, "kb", DIM, "cosine", RefreshPolicy::Rebuild)
            .await
            .unwrap();

        assert_eq!(catalog.entry_count("kb"), 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_fatal() {
        let catalog = Arc::new(MemoryCatalog::new());
        let embedder = Arc::new(CountingEmbedder::new(DIM));
        let builder = IndexBuilder::new(catalog, embedder);

        let result = builder
            .get_or_create_index(&sample_chunks(), "kb", DIM + 1, "cosine", RefreshPolicy::Reuse)
            .await;
        assert!(result.is_err());
    }
}

//! Retriever - 유사도 검색
//!
//! 질의를 임베딩하고 벡터 인덱스에서 top-k 최근접 청크를 가져옵니다.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::RagError;
use crate::index::{ScoredChunk, VectorIndex};

/// 라이브 Q&A 기본 top-k
pub const DEFAULT_TOP_K: usize = 5;

/// 벌크 조회용 top-k
pub const BULK_TOP_K: usize = 4;

// ============================================================================
// Retriever
// ============================================================================

/// 유사도 검색기
///
/// 임베더와 인덱스 핸들을 주입받습니다.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    /// 새 검색기 생성
    pub fn new(index: Arc<dyn VectorIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// top-k 유사도 검색
    ///
    /// 스토어 고유 순서(유사도 내림차순)를 그대로 반환합니다.
    /// 타이브레이크 규칙은 따로 두지 않습니다.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(RagError::Embedding)?;

        let results = self
            .index
            .query(&embedding, k)
            .await
            .map_err(RagError::VectorStore)?;

        tracing::debug!("Retrieved {} chunks for query (k={})", results.len(), k);
        Ok(results)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Vector Index - 인덱스 타입 및 트레이트
//!
//! 벡터 스토어의 컨트롤 플레인(카탈로그)과 데이터 플레인(인덱스)을
//! 트레이트로 분리합니다. 테스트에서는 인메모리 구현으로 대체됩니다.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Types
// ============================================================================

/// 텍스트 청크
///
/// 임베딩/저장/검색의 기본 단위입니다. 메타데이터는 원본 문서의
/// 소스 경계 정보를 그대로 물려받습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// 청크 텍스트
    pub text: String,
    /// 원본 문서 메타데이터
    pub metadata: BTreeMap<String, String>,
}

impl Chunk {
    /// 메타데이터 없는 청크 생성
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// 인덱스 엔트리 (청크 + 임베딩)
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// 결정적 ID (청크 텍스트의 SHA-256)
    pub id: String,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
    /// 청크
    pub chunk: Chunk,
}

/// 검색 결과 (유사도 내림차순)
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// 청크
    pub chunk: Chunk,
    /// 스토어가 보고한 유사도 스코어
    pub score: f32,
}

/// 청크 텍스트에서 결정적 ID 생성
///
/// 같은 텍스트는 항상 같은 ID를 가지므로 재-upsert가 멱등입니다.
pub fn chunk_id(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

// ============================================================================
// VectorIndex Trait (데이터 플레인)
// ============================================================================

/// 벡터 인덱스 트레이트
///
/// 단일 인덱스에 대한 쓰기/검색 인터페이스입니다.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// 벡터 배치 upsert (같은 ID는 덮어쓰기)
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize>;

    /// 최근접 이웃 검색
    ///
    /// 스토어 고유 순서(유사도 내림차순)로 최대 `top_k`개를 반환합니다.
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;
}

// ============================================================================
// IndexCatalog Trait (컨트롤 플레인)
// ============================================================================

/// 인덱스 카탈로그 트레이트
///
/// 이름으로 인덱스를 조회/생성/삭제하는 인터페이스입니다.
#[async_trait]
pub trait IndexCatalog: Send + Sync {
    /// 인덱스 존재 여부
    async fn index_exists(&self, name: &str) -> Result<bool>;

    /// 인덱스 생성 (사용 가능해질 때까지 대기)
    async fn create_index(&self, name: &str, dimension: usize, metric: &str) -> Result<()>;

    /// 인덱스 삭제 (없으면 no-op)
    async fn delete_index(&self, name: &str) -> Result<()>;

    /// 인덱스 핸들 열기
    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>>;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 결과는 -1.0 ~ 1.0 범위입니다. 길이가 다르거나 빈 벡터면 0.0입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_deterministic() {
        assert_eq!(chunk_id("hello"), chunk_id("hello"));
        assert_ne!(chunk_id("hello"), chunk_id("world"));
        // SHA-256 hex = 64 chars
        assert_eq!(chunk_id("hello").len(), 64);
    }

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c) - 0.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) - -1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_empty() {
        let a: Vec<f32> = vec![];
        let b: Vec<f32> = vec![];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}

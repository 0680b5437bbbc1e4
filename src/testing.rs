//! 테스트 전용 인메모리 구현체
//!
//! 네트워크 없이 파이프라인을 검증하기 위한 결정적 페이크 모음입니다.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::completion::{ChatMessage, CompletionProvider};
use crate::embedding::EmbeddingProvider;
use crate::index::{cosine_similarity, IndexCatalog, IndexEntry, ScoredChunk, VectorIndex};

// ============================================================================
// Deterministic Embeddings
// ============================================================================

/// 텍스트에서 결정적 의사 임베딩 생성
///
/// 같은 텍스트는 항상 같은 벡터가 되고, 다른 텍스트는 (해시 충돌이 없는 한)
/// 다른 벡터가 됩니다. 성분이 모두 양수이므로 동일 텍스트의 코사인
/// 유사도 1.0이 항상 최상위입니다.
pub fn pseudo_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(dimension);
    let mut block: u32 = 0;

    while out.len() < dimension {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(block.to_le_bytes());
        for byte in hasher.finalize() {
            if out.len() == dimension {
                break;
            }
            out.push(f32::from(byte) / 255.0 + 0.001);
        }
        block += 1;
    }

    out
}

/// 임베딩 호출 횟수를 세는 결정적 임베더
pub struct CountingEmbedder {
    dimension: usize,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    /// 지금까지의 embed 호출 횟수
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(pseudo_embedding(text, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "counting-embedder"
    }
}

/// 항상 실패하는 임베더
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        anyhow::bail!("embedding backend unavailable")
    }

    fn dimension(&self) -> usize {
        8
    }

    fn name(&self) -> &str {
        "failing-embedder"
    }
}

// ============================================================================
// In-Memory Vector Store
// ============================================================================

/// 인메모리 벡터 인덱스
///
/// upsert는 같은 ID를 덮어쓰고, query는 코사인 유사도 내림차순으로
/// 정렬하여 반환합니다.
pub struct MemoryIndex {
    entries: Mutex<Vec<IndexEntry>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<usize> {
        let mut stored = self.entries.lock().unwrap();
        for entry in entries {
            if let Some(existing) = stored.iter_mut().find(|e| e.id == entry.id) {
                *existing = entry.clone();
            } else {
                stored.push(entry.clone());
            }
        }
        Ok(entries.len())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let stored = self.entries.lock().unwrap();
        let mut scored: Vec<ScoredChunk> = stored
            .iter()
            .map(|e| ScoredChunk {
                chunk: e.chunk.clone(),
                score: cosine_similarity(embedding, &e.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// 인메모리 인덱스 카탈로그
pub struct MemoryCatalog {
    indexes: Mutex<HashMap<String, Arc<MemoryIndex>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            indexes: Mutex::new(HashMap::new()),
        }
    }

    /// 이름 있는 인덱스의 엔트리 수 (없으면 0)
    pub fn entry_count(&self, name: &str) -> usize {
        self.indexes
            .lock()
            .unwrap()
            .get(name)
            .map(|i| i.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl IndexCatalog for MemoryCatalog {
    async fn index_exists(&self, name: &str) -> Result<bool> {
        Ok(self.indexes.lock().unwrap().contains_key(name))
    }

    async fn create_index(&self, name: &str, _dimension: usize, _metric: &str) -> Result<()> {
        self.indexes
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(MemoryIndex::new()));
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        self.indexes.lock().unwrap().remove(name);
        Ok(())
    }

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let indexes = self.indexes.lock().unwrap();
        let index = indexes
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("index '{}' does not exist", name))?;
        Ok(index.clone() as Arc<dyn VectorIndex>)
    }
}

// ============================================================================
// Scripted Completion
// ============================================================================

/// 준비된 응답을 순서대로 돌려주는 컴플리션 페이크
///
/// 전송된 메시지를 기록하므로 프롬프트 조립 검증에 사용합니다.
/// 준비된 응답이 바닥나면 에러를 반환합니다.
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    /// 마지막 complete 호출에 전달된 메시지들
    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, messages: &[ChatMessage], _model: &str) -> Result<String> {
        *self.last_messages.lock().unwrap() = messages.to_vec();

        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no scripted reply left")),
        }
    }

    fn name(&self) -> &str {
        "scripted-completion"
    }
}

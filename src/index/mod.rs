//! Index 모듈 - 벡터 인덱스 빌드 및 유지
//!
//! - Chunker: 재귀 문자 분할
//! - Vector: 인덱스 타입/트레이트
//! - Pinecone: 호스티드 벡터 스토어 클라이언트
//! - Builder: 인덱스 생성-또는-재사용 (리프레시 정책 포함)

mod builder;
mod chunker;
mod pinecone;
mod vector;

// Re-exports
pub use builder::{IndexBuilder, RefreshPolicy};
pub use chunker::{RecursiveSplitter, DEFAULT_SEPARATORS};
pub use pinecone::{PineconeClient, PineconeIndex};
pub use vector::{
    chunk_id, cosine_similarity, Chunk, IndexCatalog, IndexEntry, ScoredChunk, VectorIndex,
};

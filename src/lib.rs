//! recruitbot-rag - RAG 기반 제품 상담 챗봇
//!
//! Pinecone 벡터 검색 + OpenAI 챗 컴플리션을 결합하여
//! 근거(context) 기반 답변과 대화 리드 캡처를 제공합니다.

pub mod chat;
pub mod cli;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod lead;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use chat::{compose_prompt, AnswerEngine, Retriever, BULK_TOP_K, DEFAULT_TOP_K, HISTORY_WINDOW};
pub use completion::{ChatMessage, CompletionProvider, OpenAiChat, Role};
pub use config::{get_data_dir, Config};
pub use embedding::{EmbeddingProvider, OpenAiEmbedding};
pub use error::RagError;
pub use index::{
    chunk_id, Chunk, IndexBuilder, IndexCatalog, IndexEntry, PineconeClient, RecursiveSplitter,
    RefreshPolicy, ScoredChunk, VectorIndex,
};
pub use ingest::{load_pdf_directory, Document, WebIngestor};
pub use lead::{ExtractionOutcome, LeadExtractor, LeadRecord, LeadStore, StoredLead};

//! Chat 모듈 - 질의 시점 RAG 파이프라인
//!
//! Retriever → PromptComposer → AnswerEngine 순으로
//! 질의를 근거 기반 답변으로 바꿉니다.

mod engine;
mod prompt;
mod retriever;

// Re-exports
pub use engine::AnswerEngine;
pub use prompt::{compose_prompt, CONTACT_TRAILER, HISTORY_WINDOW};
pub use retriever::{Retriever, BULK_TOP_K, DEFAULT_TOP_K};

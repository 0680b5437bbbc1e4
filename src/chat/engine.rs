//! Answer Engine - 검색-증강 답변 생성
//!
//! 질의를 받아 유사도 검색, 프롬프트 조립, 컴플리션 호출을 순서대로
//! 수행합니다. 각 단계 실패는 종류별 에러로 호출자에게 전파됩니다.

use std::sync::Arc;

use crate::completion::{ChatMessage, CompletionProvider};
use crate::error::RagError;

use super::prompt::compose_prompt;
use super::retriever::Retriever;

// ============================================================================
// AnswerEngine
// ============================================================================

/// 답변 엔진
///
/// 검색기와 컴플리션 프로바이더를 주입받습니다. 대화 이력은
/// 호출자가 소유하며 매 호출마다 전달됩니다.
pub struct AnswerEngine {
    retriever: Retriever,
    completion: Arc<dyn CompletionProvider>,
    system_message: String,
    model: String,
    top_k: usize,
}

impl AnswerEngine {
    /// 새 엔진 생성
    pub fn new(
        retriever: Retriever,
        completion: Arc<dyn CompletionProvider>,
        system_message: impl Into<String>,
        model: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            completion,
            system_message: system_message.into(),
            model: model.into(),
            top_k,
        }
    }

    /// 질의에 대한 근거 기반 답변 생성
    ///
    /// 파이프라인: 유사도 검색 → 프롬프트 조립 → 컴플리션.
    pub async fn get_answer(
        &self,
        query: &str,
        conversation: &[ChatMessage],
    ) -> Result<String, RagError> {
        let context = self.retriever.similarity_search(query, self.top_k).await?;
        tracing::debug!("Composing prompt with {} context chunks", context.len());

        let prompt = compose_prompt(&context, conversation, query);
        let messages = [
            ChatMessage::system(self.system_message.clone()),
            ChatMessage::user(prompt),
        ];

        let answer = self
            .completion
            .complete(&messages, &self.model)
            .await
            .map_err(RagError::Completion)?;

        Ok(answer.trim().to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

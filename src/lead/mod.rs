//! Lead 모듈 - 대화에서 연락처 추출 및 저장
//!
//! 최신 사용자 메시지와 대화 이력을 모델에 보내 JSON 형태의 리드를
//! 추출하고, 이메일이 있는 경우에만 파일로 영속화합니다.

mod store;

use std::path::PathBuf;
use std::sync::Arc;

use crate::completion::{ChatMessage, CompletionProvider};
use crate::error::RagError;

pub use store::{LeadRecord, LeadStore, StoredLead};

// ============================================================================
// Types
// ============================================================================

/// 추출 결과
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// 이메일이 있어 파일로 저장됨
    Persisted(PathBuf),
    /// 이메일이 없어 버려짐 (추출 자체는 성공)
    Discarded(LeadRecord),
}

// ============================================================================
// LeadExtractor
// ============================================================================

/// 리드 추출기
///
/// Q&A 경로와 별개로 동작합니다. 추출 호출에는 시스템 메시지를
/// 붙이지 않습니다 (페르소나가 JSON 출력을 오염시키지 않도록).
pub struct LeadExtractor {
    completion: Arc<dyn CompletionProvider>,
    store: LeadStore,
    model: String,
}

impl LeadExtractor {
    /// 새 추출기 생성
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        store: LeadStore,
        model: impl Into<String>,
    ) -> Self {
        Self {
            completion,
            store,
            model: model.into(),
        }
    }

    /// 메시지와 대화 이력에서 리드 추출
    ///
    /// 이메일이 있으면 저장하고, 없으면 레코드를 버립니다.
    pub async fn extract(
        &self,
        message: &str,
        conversation: &[ChatMessage],
    ) -> Result<ExtractionOutcome, RagError> {
        let prompt = extraction_prompt(message, conversation);
        let reply = self
            .completion
            .complete(&[ChatMessage::user(prompt)], &self.model)
            .await
            .map_err(RagError::Completion)?;

        let record = parse_lead_reply(&reply)?;

        if record.has_email() {
            let path = self.store.save(&record).map_err(RagError::LeadStore)?;
            Ok(ExtractionOutcome::Persisted(path))
        } else {
            tracing::debug!("Lead discarded (no email): {:?}", record);
            Ok(ExtractionOutcome::Discarded(record))
        }
    }
}

// ============================================================================
// Prompt & Parsing
// ============================================================================

/// 리드 추출 프롬프트 조립
///
/// 메시지는 `***`, 대화 이력은 `###` 구분자로 감쌉니다.
fn extraction_prompt(message: &str, conversation: &[ChatMessage]) -> String {
    let history = conversation
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Extract the name, email, company name and intent of the user from the \
         message delimited by triple stars and the conversation history delimited \
         by triple hashes.\n\
         ***\n{message}\n***\n\
         ###\n{history}\n###\n\
         Reply with only a JSON object in this exact format:\n\
         {{\"name\": \"None\", \"email\": \"None\", \"company_name\": \"None\", \
         \"intent\": \"None\"}}\n\
         Use the string None for any detail that is not present.",
        message = message,
        history = history,
    )
}

/// 모델 응답을 리드 레코드로 파싱
///
/// 코드 펜스를 벗겨낸 뒤 JSON으로 해석하고, `"None"`/`"null"`/빈 문자열
/// 플레이스홀더를 `None`으로 정규화합니다. JSON이 아니면
/// `MalformedReply`입니다.
fn parse_lead_reply(reply: &str) -> Result<LeadRecord, RagError> {
    let stripped = strip_code_fences(reply);

    let record: LeadRecord =
        serde_json::from_str(stripped).map_err(|e| RagError::MalformedReply {
            reason: e.to_string(),
            body: reply.to_string(),
        })?;

    Ok(LeadRecord {
        name: normalize_field(record.name),
        email: normalize_field(record.email),
        company_name: normalize_field(record.company_name),
        intent: normalize_field(record.intent),
    })
}

/// 마크다운 코드 펜스 제거
fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// 플레이스홀더 값을 None으로 정규화
fn normalize_field(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") || trimmed.eq_ignore_ascii_case("null")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! 에러 타입 모듈
//!
//! 라이브 질의/추출 경로는 실패 종류를 구분할 수 있는 타입드 에러를 사용합니다.
//! 인덱스 빌드 경로는 오프라인 1회 실행이므로 anyhow로 그대로 전파합니다.

use thiserror::Error;

/// RAG 파이프라인 에러
///
/// 상류 서비스(임베딩/컴플리션/벡터 스토어) 실패와
/// 추출 응답 파싱 실패를 구분합니다.
#[derive(Debug, Error)]
pub enum RagError {
    /// 임베딩 서비스 호출 실패
    #[error("embedding service error")]
    Embedding(#[source] anyhow::Error),

    /// 컴플리션 서비스 호출 실패
    #[error("completion service error")]
    Completion(#[source] anyhow::Error),

    /// 벡터 스토어 호출 실패
    #[error("vector store error")]
    VectorStore(#[source] anyhow::Error),

    /// 추출 응답이 유효한 JSON 레코드가 아님
    ///
    /// 전송 실패와 구분되는 별도 종류입니다. 재시도해도 같은 응답이
    /// 돌아올 가능성이 높으므로 호출자는 보통 폐기를 선택합니다.
    #[error("malformed extraction reply: {reason}")]
    MalformedReply {
        /// 파싱 실패 사유
        reason: String,
        /// 모델이 돌려준 원문
        body: String,
    },

    /// 리드 레코드 저장 실패
    #[error("lead store error")]
    LeadStore(#[source] anyhow::Error),
}

impl RagError {
    /// 상류 전송 계열 에러 여부 (재시도 가능성이 있는 종류)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RagError::Embedding(_) | RagError::Completion(_) | RagError::VectorStore(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let e = RagError::Completion(anyhow::anyhow!("boom"));
        assert!(e.is_transient());

        let e = RagError::MalformedReply {
            reason: "expected value".to_string(),
            body: "not json".to_string(),
        };
        assert!(!e.is_transient());
    }

    #[test]
    fn test_display_includes_reason() {
        let e = RagError::MalformedReply {
            reason: "trailing characters".to_string(),
            body: "{}".to_string(),
        };
        assert!(e.to_string().contains("trailing characters"));
    }
}

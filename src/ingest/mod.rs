//! 콘텐츠 수집 모듈
//!
//! 이기종 소스(웹 페이지, PDF 디렉토리)에서 원시 콘텐츠를 가져와
//! 플레인 텍스트 `Document`로 정규화합니다.
//! 소스 경계는 메타데이터로 보존됩니다 (문서 간 텍스트 융합 없음).

pub mod pdf;
pub mod web;

pub use pdf::load_pdf_directory;
pub use web::WebIngestor;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Document
// ============================================================================

/// 정규화된 플레인 텍스트 문서
///
/// 수집 시점에 생성되며 이후 불변입니다. 청커가 소비합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// 본문 텍스트
    pub text: String,
    /// 소스 메타데이터 (source, title, page 등)
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// 메타데이터 없는 문서 생성
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// 메타데이터 추가 (빌더 스타일)
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::new("hello")
            .with_meta("source", "https://example.com")
            .with_meta("title", "Example");

        assert_eq!(doc.text, "hello");
        assert_eq!(
            doc.metadata.get("source").map(String::as_str),
            Some("https://example.com")
        );
        assert_eq!(doc.metadata.len(), 2);
    }
}

//! 웹 수집 모듈 - URL 콘텐츠 추출
//!
//! 각 URL에 대해 HTTP GET 후 콘텐츠 셀렉터로 본문 텍스트를 추출합니다.
//! URL 단위로 조용히 실패합니다: 실패한 URL은 로그만 남기고 건너뛰며
//! 전체 호출은 절대 실패하지 않습니다.

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use url::Url;

use super::Document;

/// 기본 콘텐츠 셀렉터
pub const DEFAULT_CONTENT_SELECTOR: &str = "div#content";

/// 본문으로 인정할 최소 텍스트 길이 (문자 수)
const MIN_CONTENT_LEN: usize = 100;

// ============================================================================
// WebIngestor
// ============================================================================

/// 웹 콘텐츠 수집기
pub struct WebIngestor {
    client: reqwest::Client,
    content_selector: String,
}

impl WebIngestor {
    /// 새 수집기 생성 (기본 셀렉터)
    pub fn new() -> Result<Self> {
        Self::with_selector(DEFAULT_CONTENT_SELECTOR)
    }

    /// 콘텐츠 셀렉터를 지정하여 생성
    pub fn with_selector(selector: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("recruitbot-rag/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            content_selector: selector.into(),
        })
    }

    /// URL 목록에서 문서 수집
    ///
    /// URL마다 하나의 `Document`를 생성합니다 (소스 경계 보존).
    /// 실패한 URL은 에러 로그 후 건너뜁니다.
    pub async fn fetch_web_content(&self, urls: &[String]) -> Vec<Document> {
        let mut documents = Vec::with_capacity(urls.len());

        for url in urls {
            match self.fetch_page(url).await {
                Ok(Some(doc)) => documents.push(doc),
                Ok(None) => tracing::warn!("No content extracted from {}", url),
                Err(e) => tracing::error!("Failed to fetch {}: {:#}", url, e),
            }
        }

        documents
    }

    /// 단일 페이지 수집
    async fn fetch_page(&self, url: &str) -> Result<Option<Document>> {
        let parsed = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;
        tracing::info!("Fetching: {}", parsed);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .context("HTTP request failed")?
            .error_for_status()
            .context("HTTP error status")?;

        let html = response.text().await.context("Failed to read body")?;

        let document = Html::parse_document(&html);

        let title = self.extract_title(&document);
        let content = self.extract_content(&document);

        if content.trim().is_empty() {
            return Ok(None);
        }

        let mut doc = Document::new(content).with_meta("source", url);
        if let Some(title) = title {
            doc = doc.with_meta("title", title);
        }

        Ok(Some(doc))
    }

    /// 제목 추출
    fn extract_title(&self, document: &Html) -> Option<String> {
        // <title> 태그
        if let Ok(title_selector) = Selector::parse("title") {
            if let Some(element) = document.select(&title_selector).next() {
                let title = element.text().collect::<String>().trim().to_string();
                if !title.is_empty() {
                    return Some(title);
                }
            }
        }

        // <h1> 태그
        if let Ok(h1_selector) = Selector::parse("h1") {
            if let Some(element) = document.select(&h1_selector).next() {
                let title = element.text().collect::<String>().trim().to_string();
                if !title.is_empty() {
                    return Some(title);
                }
            }
        }

        None
    }

    /// 본문 추출 (HTML 태그 제거)
    ///
    /// 설정된 셀렉터를 먼저 시도하고, 실패하면 일반적인 본문 요소로 폴백합니다.
    fn extract_content(&self, document: &Html) -> String {
        // 1. 설정된 셀렉터
        if let Ok(selector) = Selector::parse(&self.content_selector) {
            if let Some(element) = document.select(&selector).next() {
                let text = extract_text_from_element(&element);
                if !text.is_empty() {
                    return text;
                }
            }
        } else {
            tracing::warn!("Invalid content selector: {}", self.content_selector);
        }

        // 2. 폴백 체인: article > main > body
        let fallbacks = ["article", "main", "[role=main]", ".content", "#content"];

        for selector_str in fallbacks {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(element) = document.select(&selector).next() {
                    let text = extract_text_from_element(&element);
                    if text.len() > MIN_CONTENT_LEN {
                        return text;
                    }
                }
            }
        }

        // 3. 전체 body 텍스트
        if let Ok(selector) = Selector::parse("body") {
            if let Some(element) = document.select(&selector).next() {
                return extract_text_from_element(&element);
            }
        }

        String::new()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 요소에서 텍스트 추출 (공백 정리 포함)
fn extract_text_from_element(element: &scraper::ElementRef) -> String {
    let mut text = String::new();

    for node in element.text() {
        let trimmed = node.trim();
        if !trimmed.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
    }

    // 연속 공백 정리
    if let Ok(re) = regex::Regex::new(r"\s+") {
        re.replace_all(&text, " ").trim().to_string()
    } else {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

// ============================================================================
// Tests
// ============================================================================

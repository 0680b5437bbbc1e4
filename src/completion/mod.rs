//! 컴플리션 모듈 - OpenAI 챗 컴플리션 호출
//!
//! 메시지 시퀀스를 보내고 모델의 텍스트 응답을 받는 인터페이스입니다.
//! Q&A 답변 생성과 리드 추출이 모두 이 모듈을 통합니다.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::openai_api_error;

// ============================================================================
// Types
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// 대화 메시지 (턴)
///
/// 대화 히스토리는 호출자가 소유하며 호출마다 전달됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// CompletionProvider Trait
// ============================================================================

/// 컴플리션 프로바이더 트레이트
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// 메시지 시퀀스를 보내고 응답 텍스트를 반환
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Chat
// ============================================================================

/// OpenAI 챗 컴플리션 API 엔드포인트
/// source: https://platform.openai.com/docs/api-reference/chat
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// 기본 챗 모델
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI 챗 컴플리션 구현체
#[derive(Debug)]
pub struct OpenAiChat {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiChat {
    /// 새 인스턴스 생성
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { api_key, client })
    }

    /// 환경변수에서 API 키를 읽어 생성
    pub fn from_env() -> Result<Self> {
        let api_key = crate::config::openai_api_key()?;
        Self::new(api_key)
    }
}

/// 챗 컴플리션 요청 본문
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

/// 챗 컴플리션 응답
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl CompletionProvider for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String> {
        if messages.is_empty() {
            anyhow::bail!("Cannot complete an empty message sequence");
        }

        let request = ChatRequest { model, messages };

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send completion request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read completion response body")?;

        if !status.is_success() {
            return Err(openai_api_error(status, &body));
        }

        let chat_response: ChatResponse =
            serde_json::from_str(&body).context("Failed to parse completion response")?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("Completion response contained no choices"))
    }

    fn name(&self) -> &str {
        "openai-chat"
    }
}

// ============================================================================
// Tests
// ============================================================================

//! 설정 모듈 - 환경변수 기반 구성
//!
//! 인덱스 정체성/차원, API 키, 청킹 파라미터, 시스템 메시지를
//! 환경변수에서 읽어 명시적인 `Config`로 구성합니다.
//! 전역 싱글톤 없이 각 컴포넌트 생성 시 주입됩니다.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

// ============================================================================
// Defaults
// ============================================================================

/// 기본 청크 크기 (문자 수)
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// 기본 청크 오버랩 (문자 수)
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
/// 기본 인덱스 이름
pub const DEFAULT_INDEX_NAME: &str = "recruit-kb";
/// 기본 임베딩 차원 (text-embedding-ada-002)
pub const DEFAULT_DIMENSION: usize = 1536;
/// 기본 유사도 메트릭
pub const DEFAULT_METRIC: &str = "cosine";
/// 기본 Pinecone 서버리스 클라우드/리전
pub const DEFAULT_CLOUD: &str = "aws";
pub const DEFAULT_REGION: &str = "us-east-1";

/// 기본 시스템 메시지 (어시스턴트 페르소나)
pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a friendly product assistant for a technical \
hiring platform. Answer questions using only the provided context. Be brief, accurate and \
professional. If the context does not cover the question, say so instead of guessing.";

// ============================================================================
// Config
// ============================================================================

/// 런타임 설정
///
/// `Config::from_env()`로 환경변수에서 구성합니다. API 키 두 개는 필수,
/// 나머지는 기본값이 있습니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI API 키 (임베딩 + 컴플리션 인증)
    pub openai_api_key: String,
    /// Pinecone API 키
    pub pinecone_api_key: String,
    /// Pinecone 서버리스 클라우드 (aws/gcp/azure)
    pub pinecone_cloud: String,
    /// Pinecone 서버리스 리전
    pub pinecone_region: String,
    /// 벡터 인덱스 이름
    pub index_name: String,
    /// 인덱스 차원 (임베딩 모델 출력 차원과 일치해야 함)
    pub dimension: usize,
    /// 유사도 메트릭 (cosine/dotproduct/euclidean)
    pub metric: String,
    /// 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 청크 오버랩 (문자 수)
    pub chunk_overlap: usize,
    /// Q&A 호출마다 앞에 붙는 시스템 메시지
    pub system_message: String,
    /// 챗 컴플리션 모델
    pub chat_model: String,
    /// 임베딩 모델
    pub embed_model: String,
    /// 리드 레코드 저장 디렉토리
    pub leads_dir: PathBuf,
}

impl Config {
    /// 환경변수에서 설정 구성
    ///
    /// `OPENAI_API_KEY`, `PINECONE_API_KEY`는 필수입니다.
    pub fn from_env() -> Result<Self> {
        let openai_api_key = openai_api_key()?;
        let pinecone_api_key = pinecone_api_key()?;

        let chunk_size = env_parse("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = env_parse("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        if chunk_overlap >= chunk_size {
            anyhow::bail!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                chunk_overlap,
                chunk_size
            );
        }

        let dimension = env_parse("PINECONE_DIMENSION", DEFAULT_DIMENSION)?;
        if dimension == 0 {
            anyhow::bail!("PINECONE_DIMENSION must be greater than 0");
        }

        let leads_dir = match std::env::var("LEADS_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => get_data_dir().join("leads"),
        };

        Ok(Self {
            openai_api_key,
            pinecone_api_key,
            pinecone_cloud: env_or("PINECONE_CLOUD", DEFAULT_CLOUD),
            pinecone_region: env_or("PINECONE_REGION", DEFAULT_REGION),
            index_name: env_or("PINECONE_INDEX_NAME", DEFAULT_INDEX_NAME),
            dimension,
            metric: env_or("PINECONE_METRICS", DEFAULT_METRIC),
            chunk_size,
            chunk_overlap,
            system_message: env_or("SYSTEM_MESSAGE", DEFAULT_SYSTEM_MESSAGE),
            chat_model: env_or("OPENAI_CHAT_MODEL", "gpt-3.5-turbo"),
            embed_model: env_or("OPENAI_EMBED_MODEL", "text-embedding-ada-002"),
            leads_dir,
        })
    }
}

// ============================================================================
// API Key Management
// ============================================================================

/// OpenAI API 키 로드
pub fn openai_api_key() -> Result<String> {
    non_empty_env("OPENAI_API_KEY").context(
        "OPENAI_API_KEY not set. Set: export OPENAI_API_KEY=your-api-key",
    )
}

/// Pinecone API 키 로드
pub fn pinecone_api_key() -> Result<String> {
    non_empty_env("PINECONE_API_KEY").context(
        "PINECONE_API_KEY not set. Set: export PINECONE_API_KEY=your-api-key",
    )
}

/// 두 API 키가 모두 설정되어 있는지 확인
pub fn has_api_keys() -> bool {
    non_empty_env("OPENAI_API_KEY").is_ok() && non_empty_env("PINECONE_API_KEY").is_ok()
}

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.recruitbot-rag/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".recruitbot-rag")
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 환경변수 읽기 (비어있지 않은 값만)
fn non_empty_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => anyhow::bail!("{} is not set", name),
    }
}

/// 환경변수 읽기 (없으면 기본값)
fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}

/// 환경변수 파싱 (없으면 기본값, 파싱 실패 시 에러)
fn env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", name, v)),
        _ => Ok(default),
    }
}

// ============================================================================
// Tests
// ============================================================================

//! CLI 모듈
//!
//! recruitbot-rag CLI 명령어 정의 및 구현

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::chat::{AnswerEngine, Retriever, BULK_TOP_K, DEFAULT_TOP_K};
use crate::completion::{ChatMessage, OpenAiChat};
use crate::config::{has_api_keys, Config};
use crate::embedding::OpenAiEmbedding;
use crate::error::RagError;
use crate::index::{
    IndexBuilder, IndexCatalog, PineconeClient, RecursiveSplitter, RefreshPolicy,
};
use crate::ingest::{load_pdf_directory, Document, WebIngestor};
use crate::lead::{ExtractionOutcome, LeadExtractor, LeadStore};

/// 답변 생성 실패 시 사용자에게 보여줄 대체 문구
const FALLBACK_ANSWER: &str =
    "Sorry, I could not generate an answer right now. Please try again in a moment.";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "recruitbot-rag")]
#[command(version, about = "RAG 기반 제품 상담 챗봇 + 리드 캡처", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// URL/PDF에서 지식베이스 인덱스 구축
    Build {
        /// 수집할 URL (여러 번 지정 가능)
        #[arg(short, long)]
        url: Vec<String>,

        /// PDF 폴더 경로
        #[arg(short, long)]
        pdf_dir: Option<PathBuf>,

        /// 기존 인덱스 처리 정책 (reuse/upsert/rebuild)
        #[arg(short, long, default_value = "reuse")]
        refresh: RefreshPolicy,
    },

    /// 질문에 답변 (여러 개 지정 시 벌크 모드)
    Ask {
        /// 질문 (하나 이상)
        #[arg(required = true)]
        query: Vec<String>,

        /// 검색할 청크 개수 (기본: 단일 5, 벌크 4)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// 대화형 챗 (리드 캡처 포함)
    Chat,

    /// 저장된 리드 목록
    Leads,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            url,
            pdf_dir,
            refresh,
        } => cmd_build(url, pdf_dir, refresh).await,
        Commands::Ask { query, top_k } => cmd_ask(&query, top_k).await,
        Commands::Chat => cmd_chat().await,
        Commands::Leads => cmd_leads().await,
        Commands::Status => cmd_status().await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 인덱스 구축 명령어 (build)
///
/// URL과 PDF 폴더에서 문서를 수집해 청킹, 임베딩, 인덱스 기록까지
/// 수행합니다. 빌드 경로의 에러는 치명적입니다 (부분 인덱스 방지).
async fn cmd_build(urls: Vec<String>, pdf_dir: Option<PathBuf>, refresh: RefreshPolicy) -> Result<()> {
    if urls.is_empty() && pdf_dir.is_none() {
        bail!("--url 또는 --pdf-dir 중 하나 이상을 지정해야 합니다");
    }

    let config = Config::from_env()?;

    // 문서 수집
    let mut documents: Vec<Document> = Vec::new();

    if !urls.is_empty() {
        println!("[*] URL 수집 중: {} 건", urls.len());
        let ingestor = WebIngestor::new().context("WebIngestor 생성 실패")?;
        let web_docs = ingestor.fetch_web_content(&urls).await;
        println!("    성공 {} / {}", web_docs.len(), urls.len());
        documents.extend(web_docs);
    }

    if let Some(ref dir) = pdf_dir {
        println!("[*] PDF 수집 중: {}", dir.display());
        let pdf_docs = load_pdf_directory(dir).await.context("PDF 수집 실패")?;
        println!("    페이지 {} 건", pdf_docs.len());
        documents.extend(pdf_docs);
    }

    if documents.is_empty() {
        println!("[!] 수집된 문서가 없습니다.");
        return Ok(());
    }

    // 청킹
    let splitter = RecursiveSplitter::new(config.chunk_size, config.chunk_overlap)?;
    let chunks = splitter.split_documents(&documents);
    println!(
        "[*] 청킹 완료: 문서 {} 건 -> 청크 {} 개 (size={}, overlap={})",
        documents.len(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    // 임베딩 + 인덱스 기록
    let embedder = Arc::new(OpenAiEmbedding::new(
        config.openai_api_key.clone(),
        config.embed_model.clone(),
        config.dimension,
    )?);
    let catalog: Arc<dyn IndexCatalog> = Arc::new(PineconeClient::new(
        config.pinecone_api_key.clone(),
        config.pinecone_cloud.clone(),
        config.pinecone_region.clone(),
    )?);

    println!(
        "[*] 인덱스 '{}' 준비 중 (refresh={})...",
        config.index_name, refresh
    );

    let builder = IndexBuilder::new(catalog, embedder);
    builder
        .get_or_create_index(
            &chunks,
            &config.index_name,
            config.dimension,
            &config.metric,
            refresh,
        )
        .await
        .context("인덱스 구축 실패")?;

    println!("[OK] 인덱스 '{}' 준비 완료", config.index_name);
    Ok(())
}

/// 질문 명령어 (ask)
///
/// 질문이 여러 개면 벌크 모드로 동작하며 top-k 기본값이 달라집니다.
async fn cmd_ask(queries: &[String], top_k: Option<usize>) -> Result<()> {
    let config = Config::from_env()?;
    let k = ask_top_k(top_k, queries.len());
    let engine = build_engine(&config, k).await?;

    for query in queries {
        println!("[*] 질문: {}", query);

        match engine.get_answer(query, &[]).await {
            Ok(answer) => {
                println!();
                println!("{}", answer);
            }
            Err(e) => {
                tracing::error!("Answer generation failed: {:#}", anyhow::Error::from(e));
                println!();
                println!("{}", FALLBACK_ANSWER);
            }
        }
        println!();
    }

    Ok(())
}

/// ask의 top-k 결정: 명시값 > 벌크 기본(4) > 단일 기본(5)
fn ask_top_k(explicit: Option<usize>, query_count: usize) -> usize {
    match explicit {
        Some(k) => k,
        None if query_count > 1 => BULK_TOP_K,
        None => DEFAULT_TOP_K,
    }
}

/// 대화형 챗 명령어 (chat)
///
/// 매 사용자 턴마다 답변을 생성하고, 별도 경로로 리드 추출을 시도합니다.
/// 리드 추출 실패는 대화를 끊지 않습니다.
async fn cmd_chat() -> Result<()> {
    let config = Config::from_env()?;
    let engine = build_engine(&config, DEFAULT_TOP_K).await?;

    let completion = Arc::new(OpenAiChat::new(config.openai_api_key.clone())?);
    let extractor = LeadExtractor::new(
        completion,
        LeadStore::new(&config.leads_dir),
        config.chat_model.clone(),
    );

    println!("recruitbot-rag chat (빈 줄 또는 'exit' 입력 시 종료)");
    println!();

    let stdin = io::stdin();
    let mut conversation: Vec<ChatMessage> = Vec::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("exit") {
            break;
        }

        // 답변은 현재 턴을 이력에 넣기 전에 생성 (이력 윈도는 이전 턴만)
        let answer = match engine.get_answer(input, &conversation).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Answer generation failed: {:#}", anyhow::Error::from(e));
                FALLBACK_ANSWER.to_string()
            }
        };
        println!("{}", answer);
        println!();

        // 리드 추출은 베스트 에포트
        match extractor.extract(input, &conversation).await {
            Ok(ExtractionOutcome::Persisted(path)) => {
                tracing::info!("Lead captured: {}", path.display());
            }
            Ok(ExtractionOutcome::Discarded(_)) => {}
            Err(RagError::MalformedReply { reason, .. }) => {
                // 재시도해도 같은 응답일 가능성이 높으므로 폐기
                tracing::warn!("Lead reply was not valid JSON, discarding: {}", reason);
            }
            Err(e) if e.is_transient() => {
                // 상류 일시 장애 - 다음 턴에서 자연히 재시도됨
                tracing::warn!(
                    "Lead extraction hit a transient upstream error: {:#}",
                    anyhow::Error::from(e)
                );
            }
            Err(e) => {
                tracing::warn!("Lead extraction failed: {:#}", anyhow::Error::from(e));
            }
        }

        conversation.push(ChatMessage::user(input));
        conversation.push(ChatMessage::assistant(answer));
    }

    println!("안녕히 가세요.");
    Ok(())
}

/// 리드 목록 명령어 (leads)
async fn cmd_leads() -> Result<()> {
    let store = match std::env::var("LEADS_DIR") {
        Ok(dir) if !dir.is_empty() => LeadStore::new(dir),
        _ => LeadStore::open_default(),
    };

    let leads = store.list().context("리드 목록 조회 실패")?;

    if leads.is_empty() {
        println!("[!] 저장된 리드가 없습니다.");
        return Ok(());
    }

    println!("[OK] 저장된 리드 ({} 건):\n", leads.len());

    for lead in leads {
        let name = lead.record.name.as_deref().unwrap_or("-");
        let email = lead.record.email.as_deref().unwrap_or("-");
        let company = lead.record.company_name.as_deref().unwrap_or("-");

        println!("  {} <{}>", name, email);
        println!("        회사: {}", company);
        if let Some(ref intent) = lead.record.intent {
            println!("        관심사: {}", truncate_text(intent, 60));
        }
        println!("        저장: {}", lead.saved_at.format("%Y-%m-%d %H:%M"));
        println!();
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status() -> Result<()> {
    println!("recruitbot-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // API 키 상태
    if has_api_keys() {
        println!("[OK] API 키: 설정됨 (OpenAI + Pinecone)");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export OPENAI_API_KEY=... PINECONE_API_KEY=...");
    }

    // 리드 스토어
    let store = LeadStore::open_default();
    println!("[*] 리드 디렉토리: {}", store.dir().display());
    match store.list() {
        Ok(leads) => println!("[OK] 저장된 리드: {} 건", leads.len()),
        Err(e) => println!("[!] 리드 조회 실패: {}", e),
    }

    // 인덱스 상태 (API 키가 있을 때만)
    if has_api_keys() {
        let config = Config::from_env()?;
        let catalog = PineconeClient::new(
            config.pinecone_api_key.clone(),
            config.pinecone_cloud.clone(),
            config.pinecone_region.clone(),
        )?;

        match catalog.index_exists(&config.index_name).await {
            Ok(true) => println!("[OK] 인덱스 '{}': 존재함", config.index_name),
            Ok(false) => {
                println!("[!] 인덱스 '{}': 없음", config.index_name);
                println!("    생성: recruitbot-rag build --url <URL>");
            }
            Err(e) => {
                tracing::debug!("Index check failed: {:#}", e);
                println!("[!] 인덱스 상태 확인 실패");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 설정에서 답변 엔진 조립
///
/// 인덱스가 아직 없으면 에러입니다 (먼저 build를 실행해야 함).
async fn build_engine(config: &Config, top_k: usize) -> Result<AnswerEngine> {
    let catalog = PineconeClient::new(
        config.pinecone_api_key.clone(),
        config.pinecone_cloud.clone(),
        config.pinecone_region.clone(),
    )?;

    if !catalog.index_exists(&config.index_name).await? {
        bail!(
            "인덱스 '{}'가 없습니다. 먼저 실행하세요: recruitbot-rag build --url <URL>",
            config.index_name
        );
    }

    let index = catalog.open_index(&config.index_name).await?;
    let embedder = Arc::new(OpenAiEmbedding::new(
        config.openai_api_key.clone(),
        config.embed_model.clone(),
        config.dimension,
    )?);

    let retriever = Retriever::new(index, embedder);
    let completion = Arc::new(OpenAiChat::new(config.openai_api_key.clone())?);

    Ok(AnswerEngine::new(
        retriever,
        completion,
        config.system_message.clone(),
        config.chat_model.clone(),
        top_k,
    ))
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

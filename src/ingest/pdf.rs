//! PDF 디렉토리 수집 모듈
//!
//! pdf-extract 크레이트로 디렉토리 내 모든 PDF에서 텍스트를 추출하고
//! 페이지 단위 `Document`로 분할합니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use super::Document;

// ============================================================================
// Directory Loader
// ============================================================================

/// 디렉토리 내 모든 PDF를 페이지 단위 문서로 로드
///
/// 읽을 수 없는 개별 PDF는 에러 로그 후 건너뜁니다.
/// 디렉토리 자체가 없으면 에러입니다.
pub async fn load_pdf_directory(dir: &Path) -> Result<Vec<Document>> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || collect_pdf_documents(&dir))
        .await
        .context("PDF extraction task failed")?
}

/// 동기 수집 구현 (CPU 바운드)
fn collect_pdf_documents(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        anyhow::bail!("PDF directory not found: {:?}", dir);
    }

    // 결정적 순서를 위해 경로 정렬
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut documents = Vec::new();

    for path in paths {
        let pages = match extract_text_from_pdf(&path) {
            Ok(pages) => pages,
            Err(e) => {
                tracing::error!("Skipping unreadable PDF {:?}: {:#}", path, e);
                continue;
            }
        };

        let total_pages = pages.len();
        for (page_num, text) in pages {
            if text.trim().is_empty() {
                continue;
            }
            documents.push(
                Document::new(text)
                    .with_meta("source", format!("file://{}", path.display()))
                    .with_meta("page", page_num.to_string())
                    .with_meta("total_pages", total_pages.to_string()),
            );
        }
    }

    tracing::info!("Loaded {} page documents from {:?}", documents.len(), dir);
    Ok(documents)
}

// ============================================================================
// PDF Text Extraction
// ============================================================================

/// PDF에서 텍스트 추출
///
/// (페이지 번호, 텍스트) 튜플 벡터로 반환합니다. 페이지 번호는 1부터 시작합니다.
fn extract_text_from_pdf(path: &Path) -> Result<Vec<(usize, String)>> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read PDF: {:?}", path))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(vec![(1, String::new())]);
    }

    let pages = split_pdf_pages(&text);

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .collect())
}

/// PDF 텍스트를 페이지별로 분리
fn split_pdf_pages(text: &str) -> Vec<String> {
    // 폼피드 문자 (\x0c)로 페이지 분리 시도
    let pages: Vec<String> = text
        .split('\x0c')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if pages.len() > 1 {
        return pages;
    }

    // 페이지 구분자 패턴으로 시도 (일부 PDF에서 사용)
    // 예: "--- Page 1 ---" 또는 숫자만 있는 줄
    let page_pattern = regex::Regex::new(r"(?m)^[\s]*[-=]+[\s]*(?:Page[\s]*)?(\d+)[\s]*[-=]+[\s]*$")
        .expect("Invalid regex");

    if page_pattern.is_match(text) {
        let pages: Vec<String> = page_pattern
            .split(text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if pages.len() > 1 {
            return pages;
        }
    }

    // 분리 실패 - 전체를 하나의 페이지로
    vec![text.to_string()]
}

// ============================================================================
// Tests
// ============================================================================

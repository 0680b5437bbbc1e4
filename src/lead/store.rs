//! Lead Store - 리드 파일 영속화
//!
//! 리드를 이메일 기준 파일 하나(`{email}.json`)로 저장합니다.
//! 같은 이메일로 다시 저장하면 파일 전체를 덮어씁니다.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Types
// ============================================================================

/// 추출된 리드
///
/// 모든 필드는 선택적입니다. 모델이 찾지 못한 필드는 `None`입니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
}

impl LeadRecord {
    /// 이메일이 실제 값으로 존재하는지
    ///
    /// 저장 게이트입니다. 이메일 없는 리드는 버려집니다.
    pub fn has_email(&self) -> bool {
        self.email
            .as_deref()
            .map(|e| !e.trim().is_empty())
            .unwrap_or(false)
    }
}

/// 저장된 리드 (레코드 + 저장 시각)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLead {
    #[serde(flatten)]
    pub record: LeadRecord,
    pub saved_at: DateTime<Utc>,
}

// ============================================================================
// LeadStore
// ============================================================================

/// 파일 기반 리드 저장소
#[derive(Debug, Clone)]
pub struct LeadStore {
    dir: PathBuf,
}

impl LeadStore {
    /// 지정 디렉터리에 저장하는 스토어 생성
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 기본 데이터 디렉터리 하위의 leads/ 스토어
    pub fn open_default() -> Self {
        Self::new(crate::config::get_data_dir().join("leads"))
    }

    /// 저장 디렉터리 경로
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 리드 저장
    ///
    /// 파일명은 이메일에서 파생하며, 기존 파일은 통째로 교체됩니다.
    /// 이메일 없는 레코드는 에러입니다 (호출자가 먼저 걸러야 함).
    pub fn save(&self, record: &LeadRecord) -> Result<PathBuf> {
        let email = record
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .context("Cannot save a lead without an email")?;

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create leads dir {}", self.dir.display()))?;

        let stored = StoredLead {
            record: record.clone(),
            saved_at: Utc::now(),
        };

        let path = self.dir.join(format!("{}.json", sanitize_key(email.trim())));
        let json = serde_json::to_string_pretty(&stored).context("Failed to serialize lead")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write lead file {}", path.display()))?;

        tracing::info!("Saved lead to {}", path.display());
        Ok(path)
    }

    /// 저장된 리드 전체 나열
    ///
    /// 디렉터리가 없으면 빈 목록입니다. 깨진 파일은 건너뛰고 경고합니다.
    pub fn list(&self) -> Result<Vec<StoredLead>> {
        if !self.dir.is_dir() {
            return Ok(vec![]);
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read leads dir {}", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        paths.sort();

        let mut leads = Vec::with_capacity(paths.len());
        for path in paths {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read lead file {}", path.display()))?;
            match serde_json::from_str::<StoredLead>(&contents) {
                Ok(lead) => leads.push(lead),
                Err(e) => {
                    tracing::warn!("Skipping malformed lead file {}: {}", path.display(), e);
                }
            }
        }

        Ok(leads)
    }
}

/// 이메일을 안전한 파일명 키로 변환
///
/// 영숫자와 `@ . _ - +`만 유지하고 나머지는 `_`로 치환합니다.
fn sanitize_key(email: &str) -> String {
    email
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

//! Text Chunking Module - 재귀 문자 분할
//!
//! 구분자 우선순위 목록(문단 > 줄 > 단어 > 문자)으로 텍스트를 재귀 분할하여
//! `chunk_size`에 최대한 가까운 조각을 만들고, 연속 청크 사이에
//! `chunk_overlap` 문자의 문맥을 유지합니다.
//! 같은 입력과 파라미터에 대해 결정적입니다.

use std::collections::VecDeque;

use anyhow::Result;

use crate::ingest::Document;

use super::vector::Chunk;

/// 구분자 우선순위: 문단 > 줄 > 단어 > 문자
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

// ============================================================================
// RecursiveSplitter
// ============================================================================

/// 재귀 문자 분할기
///
/// 청크 길이는 `chunk_size` 이하가 원칙이지만, 자연 경계에서 더 이상
/// 쪼갤 수 없는 조각은 약간 초과할 수 있습니다 (soft bound).
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// 새 분할기 생성
    ///
    /// # Arguments
    /// * `chunk_size` - 목표 청크 크기 (문자 수)
    /// * `chunk_overlap` - 연속 청크 간 오버랩 (문자 수, `chunk_size` 미만)
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than 0");
        }
        if chunk_overlap >= chunk_size {
            anyhow::bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// 텍스트 분할
    ///
    /// 빈 입력은 빈 시퀀스를 반환합니다 (에러 아님).
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        self.split_with(text, &DEFAULT_SEPARATORS)
    }

    /// 문서 시퀀스 분할
    ///
    /// 각 청크는 원본 문서의 메타데이터를 물려받습니다.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.text).into_iter().map(|text| Chunk {
                    text,
                    metadata: doc.metadata.clone(),
                })
            })
            .collect()
    }

    /// 구분자 목록으로 재귀 분할
    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // 텍스트에 실제로 존재하는 첫 구분자 선택
        let mut separator = *separators.last().unwrap_or(&"");
        let mut next_separators: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep) {
                separator = sep;
                next_separators = &separators[i + 1..];
                break;
            }
        }

        let splits = split_on(text, separator, self.chunk_size);

        let mut final_chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();

        for piece in splits {
            if char_len(&piece) <= self.chunk_size {
                good.push(piece);
            } else {
                // 조각이 크면 지금까지 모은 것을 먼저 병합
                if !good.is_empty() {
                    final_chunks.extend(self.merge_splits(&good, separator));
                    good.clear();
                }

                if next_separators.is_empty() {
                    // 더 쪼갤 구분자가 없음 - soft bound 초과 허용
                    final_chunks.push(piece);
                } else {
                    final_chunks.extend(self.split_with(&piece, next_separators));
                }
            }
        }

        if !good.is_empty() {
            final_chunks.extend(self.merge_splits(&good, separator));
        }

        final_chunks
    }

    /// 조각들을 chunk_size 이하로 병합하고 오버랩 유지
    fn merge_splits(&self, splits: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks: Vec<String> = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);
            let extra = if current.is_empty() { 0 } else { sep_len };

            if total + len + extra > self.chunk_size && !current.is_empty() {
                let joined = join_pieces(&current, separator);
                if !joined.is_empty() {
                    chunks.push(joined);
                }

                // 오버랩 한도까지 앞에서부터 제거 (꼬리는 다음 청크의 머리가 됨)
                while total > self.chunk_overlap
                    || (total + len + if current.is_empty() { 0 } else { sep_len }
                        > self.chunk_size
                        && total > 0)
                {
                    let Some(first) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(first) + if current.is_empty() { 0 } else { sep_len };
                }
            }

            current.push_back(piece.as_str());
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        let joined = join_pieces(&current, separator);
        if !joined.is_empty() {
            chunks.push(joined);
        }

        chunks
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 문자 수 (바이트 아님)
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 조각 병합 (구분자로 연결 후 트림)
fn join_pieces(pieces: &VecDeque<&str>, separator: &str) -> String {
    pieces
        .iter()
        .copied()
        .collect::<Vec<_>>()
        .join(separator)
        .trim()
        .to_string()
}

/// 구분자로 분할
///
/// 빈 구분자는 문자 단위 하드 컷을 의미합니다.
fn split_on(text: &str, separator: &str, chunk_size: usize) -> Vec<String> {
    if separator.is_empty() {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(chunk_size.max(1))
            .map(|c| c.iter().collect())
            .collect()
    } else {
        text.split(separator)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let splitter = RecursiveSplitter::new(100, 10).unwrap();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_invalid_config() {
        assert!(RecursiveSplitter::new(0, 0).is_err());
        assert!(RecursiveSplitter::new(10, 10).is_err());
        assert!(RecursiveSplitter::new(10, 20).is_err());
        assert!(RecursiveSplitter::new(10, 9).is_ok());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let splitter = RecursiveSplitter::new(100, 10).unwrap();
        let chunks = splitter.split_text("Short paragraph.");
        assert_eq!(chunks, vec!["Short paragraph.".to_string()]);
    }

    #[test]
    fn test_chunk_length_bound() {
        let splitter = RecursiveSplitter::new(20, 5).unwrap();
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let chunks = splitter.split_text(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 20,
                "chunk too long: {:?}",
                chunk
            );
        }
    }

    #[test]
    fn test_overlap_carries_trailing_context() {
        let splitter = RecursiveSplitter::new(20, 8).unwrap();
        let text = "aaa bbb ccc ddd eee fff ggg hhh iii jjj";
        let chunks = splitter.split_text(text);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            // 다음 청크는 이전 청크의 꼬리 조각으로 시작한다
            let first_word = pair[1].split_whitespace().next().unwrap();
            assert!(
                pair[0].ends_with(first_word)
                    || pair[0].contains(&format!("{} ", first_word)),
                "no overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_paragraph_boundaries_preferred() {
        let splitter = RecursiveSplitter::new(30, 0).unwrap();
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird one.";
        let chunks = splitter.split_text(text);

        assert!(chunks.iter().any(|c| c.contains("First paragraph")));
        // 문단이 잘리지 않고 통째로 유지됨
        for chunk in &chunks {
            assert!(!chunk.starts_with("aragraph"));
        }
    }

    #[test]
    fn test_hard_cut_on_unbreakable_text() {
        // 공백 없는 긴 토큰은 문자 단위로 잘린다
        let splitter = RecursiveSplitter::new(10, 2).unwrap();
        let text = "a".repeat(35);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() >= 4);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
    }

    #[test]
    fn test_deterministic() {
        let splitter = RecursiveSplitter::new(25, 5).unwrap();
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        assert_eq!(splitter.split_text(text), splitter.split_text(text));
    }

    #[test]
    fn test_utf8_safety() {
        let splitter = RecursiveSplitter::new(8, 2).unwrap();
        let text = "안녕하세요 세계 여러분 반갑습니다 오늘도 좋은 하루";
        let chunks = splitter.split_text(text);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 8);
        }
    }

    #[test]
    fn test_split_documents_propagates_metadata() {
        let splitter = RecursiveSplitter::new(15, 3).unwrap();
        let docs = vec![
            Document::new("one two three four five six").with_meta("source", "a"),
            Document::new("seven eight nine ten eleven").with_meta("source", "b"),
        ];

        let chunks = splitter.split_documents(&docs);
        assert!(chunks.len() >= 2);

        for chunk in &chunks {
            let source = chunk.metadata.get("source").map(String::as_str);
            assert!(source == Some("a") || source == Some("b"));
        }
        // 두 소스가 모두 존재
        assert!(chunks
            .iter()
            .any(|c| c.metadata.get("source").map(String::as_str) == Some("a")));
        assert!(chunks
            .iter()
            .any(|c| c.metadata.get("source").map(String::as_str) == Some("b")));
    }
}

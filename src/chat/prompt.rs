//! Prompt Composer - 질의 프롬프트 조립
//!
//! 검색된 문맥, 최근 대화 이력, 질의를 구분자가 있는 단일 프롬프트로
//! 묶습니다. 순수 함수이므로 같은 입력은 항상 같은 프롬프트를 만듭니다.

use crate::completion::ChatMessage;
use crate::index::ScoredChunk;

/// 프롬프트에 포함하는 최근 대화 턴 수
pub const HISTORY_WINDOW: usize = 4;

/// 대화가 충분히 길어지면 붙이는 연락처 요청 지시문
pub const CONTACT_TRAILER: &str = "Ask for the user's name, email and company detail. \
     Don't ask if you already asked them in the conversation history.";

/// 질의 프롬프트 조립
///
/// 문맥은 `***`, 대화 이력은 ``` ``` ```, 질의는 `###` 구분자로 감쌉니다.
/// 이력은 마지막 `HISTORY_WINDOW` 턴만 포함하며, 전체 대화가 그보다 길면
/// 연락처 요청 지시문을 덧붙입니다.
pub fn compose_prompt(context: &[ScoredChunk], conversation: &[ChatMessage], query: &str) -> String {
    let context_block = context
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let start = conversation.len().saturating_sub(HISTORY_WINDOW);
    let history_block = conversation[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "Use the following pieces of context delimited by triple stars to answer \
         the question at the end. If you don't know the answer, just say that you \
         don't know, don't try to make up an answer.\n\
         ***\n{context}\n***\n\
         Conversation history is delimited by triple backticks.\n\
         ```\n{history}\n```\n\
         The question is delimited by triple hashes.\n\
         ###\n{query}\n###\n\
         Answer briefly.",
        context = context_block,
        history = history_block,
        query = query,
    );

    if conversation.len() > HISTORY_WINDOW {
        prompt.push('\n');
        prompt.push_str(CONTACT_TRAILER);
    }

    prompt
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Chunk;

    fn scored(text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk::new(text),
            score: 0.9,
        }
    }

    #[test]
    fn test_prompt_contains_all_sections() {
        let context = vec![scored("Remote hiring tools."), scored("Pricing plans.")];
        let conversation = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello, how can I help?"),
        ];

        let prompt = compose_prompt(&context, &conversation, "What do you offer?");

        assert!(prompt.contains("***\nRemote hiring tools.\n\nPricing plans.\n***"));
        assert!(prompt.contains("```\nuser: hi\nassistant: hello, how can I help?\n```"));
        assert!(prompt.contains("###\nWhat do you offer?\n###"));
        assert!(prompt.contains("Answer briefly."));
    }

    #[test]
    fn test_deterministic() {
        let context = vec![scored("alpha"), scored("beta")];
        let conversation = vec![ChatMessage::user("q1"), ChatMessage::assistant("a1")];

        let a = compose_prompt(&context, &conversation, "q2");
        let b = compose_prompt(&context, &conversation, "q2");
        assert_eq!(a, b);
    }

    #[test]
    fn test_history_window_keeps_last_four_turns() {
        let conversation = vec![
            ChatMessage::user("turn-1"),
            ChatMessage::assistant("turn-2"),
            ChatMessage::user("turn-3"),
            ChatMessage::assistant("turn-4"),
            ChatMessage::user("turn-5"),
            ChatMessage::assistant("turn-6"),
        ];

        let prompt = compose_prompt(&[], &conversation, "next");

        // 마지막 4턴만 포함
        assert!(!prompt.contains("turn-1"));
        assert!(!prompt.contains("turn-2"));
        assert!(prompt.contains("turn-3"));
        assert!(prompt.contains("turn-6"));
    }

    #[test]
    fn test_trailer_absent_on_short_conversation() {
        let conversation = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let prompt = compose_prompt(&[], &conversation, "q");
        assert!(!prompt.contains(CONTACT_TRAILER));
    }

    #[test]
    fn test_trailer_present_on_long_conversation() {
        let conversation: Vec<ChatMessage> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("u{}", i))
                } else {
                    ChatMessage::assistant(format!("a{}", i))
                }
            })
            .collect();

        let prompt = compose_prompt(&[], &conversation, "q");
        assert!(prompt.contains(CONTACT_TRAILER));
    }

    #[test]
    fn test_empty_context_and_history() {
        let prompt = compose_prompt(&[], &[], "anything there?");
        assert!(prompt.contains("###\nanything there?\n###"));
        assert!(prompt.contains("***\n\n***"));
    }
}

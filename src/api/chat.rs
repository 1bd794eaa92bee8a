use super::client::{ApiClient, ApiError};
use crate::types::{ChatMessage, ChatReply, ChatRole};
use serde::Serialize;
use serde_json::Value;

const QUERY_PATH: &str = "/query";

#[derive(Serialize)]
struct HistoryEntry<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
    conversation_history: Vec<HistoryEntry<'a>>,
}

fn read_string(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?;
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// Older deployments answer under `answer` instead of `response`.
fn parse_reply(json: &Value) -> ChatReply {
    let response = read_string(json.get("response"))
        .or_else(|| read_string(json.get("answer")))
        .unwrap_or_default();
    let sources = json
        .get("sources")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    ChatReply { response, sources }
}

impl ApiClient {
    pub async fn send_chat_message(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ApiError> {
        let body = QueryRequest {
            question: message,
            conversation_history: history
                .iter()
                .map(|m| HistoryEntry {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
        };
        let json: Value = self.post_json(QUERY_PATH, &body).await?;
        Ok(parse_reply(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_prefers_response_then_answer() {
        let reply = parse_reply(&json!({"response": "r", "answer": "a", "sources": ["s1"]}));
        assert_eq!(reply.response, "r");
        assert_eq!(reply.sources, vec!["s1".to_string()]);

        let reply = parse_reply(&json!({"answer": "a"}));
        assert_eq!(reply.response, "a");
        assert!(reply.sources.is_empty());

        assert_eq!(parse_reply(&json!({})), ChatReply::default());
    }
}

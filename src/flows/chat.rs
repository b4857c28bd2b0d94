use log::{info, warn};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{ChartData, ChatMessage, Role};
use crate::provider::{GenerativeClient, Modality, Part};

const SYSTEM_PROMPT: &str = "You are Omondi AI, a friendly and helpful graphic design \
assistant.\n\
- Your goal is to be a creative partner.\n\
- If a user asks who you are, introduce yourself as Omondi AI.\n\
- For image generation requests, politely direct the user to the Generate tab; do not \
attempt to generate images yourself.\n\
- If a user asks for data that can be visualized, include a chart with a title, data \
rows, categories, an index key, and a chart type (bar, line or area).\n\
- Format your responses using Markdown.\n\
- Provide helpful and safe responses; do not generate harmful, unethical, or \
inappropriate content.\n\n\
Reply with a single JSON object of the form \
{\"response\": \"<markdown reply>\", \"chart\": {\"title\": ..., \"data\": [...], \
\"categories\": [...], \"index\": ..., \"type\": \"bar\"|\"line\"|\"area\"}} where \
\"chart\" is optional and only present when a chart genuinely helps.";

/// The assistant's reply, optionally carrying chart data.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatOutcome {
    pub response: String,
    #[serde(default)]
    pub chart: Option<ChartData>,
}

pub(crate) async fn chat(
    provider: &dyn GenerativeClient,
    history: &[ChatMessage],
    new_message: &str,
) -> Result<ChatOutcome, AppError> {
    let new_message = new_message.trim();
    if new_message.is_empty() {
        return Err(AppError::InvalidInput("A message is required.".into()));
    }
    info!("Chat turn ({} history messages)", history.len());

    let mut prompt = String::from(SYSTEM_PROMPT);
    if !history.is_empty() {
        prompt.push_str("\n\nConversation so far:\n");
        for message in history {
            let speaker = match message.role {
                Role::User => "user",
                Role::Model => "model",
            };
            prompt.push_str(speaker);
            prompt.push_str(": ");
            prompt.push_str(&message.content);
            prompt.push('\n');
        }
    }
    prompt.push_str("\nuser: ");
    prompt.push_str(new_message);

    let generated = provider.generate(&[Part::text(prompt)], &[Modality::Text]).await?;
    let text = generated
        .text
        .ok_or_else(|| AppError::Provider("no chat response was returned".into()))?;

    Ok(parse_reply(&text))
}

/// Models wrap JSON in markdown fences or skip the JSON shape entirely; a
/// malformed reply degrades to plain text rather than failing the turn.
fn parse_reply(raw: &str) -> ChatOutcome {
    let candidate = strip_code_fence(raw.trim());
    match serde_json::from_str::<ChatOutcome>(candidate) {
        Ok(outcome) if !outcome.response.is_empty() => outcome,
        _ => {
            if candidate.starts_with('{') {
                warn!("Chat reply looked like JSON but did not parse; returning raw text");
            }
            ChatOutcome {
                response: raw.trim().to_string(),
                chart: None,
            }
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag on the opening fence, if any.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testutil::FakeProvider;
    use crate::models::ChartKind;

    #[test]
    fn parses_plain_json_reply() {
        let outcome = parse_reply(r#"{"response": "Here you go"}"#);
        assert_eq!(outcome.response, "Here you go");
        assert!(outcome.chart.is_none());
    }

    #[test]
    fn parses_fenced_json_with_chart() {
        let raw = "```json\n{\"response\": \"Sales by month\", \"chart\": {\"title\": \
\"Sales\", \"data\": [{\"month\": \"Jan\", \"total\": 3}], \"categories\": [\"total\"], \
\"index\": \"month\", \"type\": \"line\"}}\n```";
        let outcome = parse_reply(raw);
        let chart = outcome.chart.expect("chart should parse");
        assert_eq!(chart.title, "Sales");
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.index, "month");
    }

    #[test]
    fn malformed_json_degrades_to_plain_text() {
        let outcome = parse_reply("{\"response\": \"broken");
        assert_eq!(outcome.response, "{\"response\": \"broken");
        assert!(outcome.chart.is_none());
    }

    #[test]
    fn non_json_reply_is_kept_verbatim() {
        let outcome = parse_reply("Hi! I'm Omondi AI.");
        assert_eq!(outcome.response, "Hi! I'm Omondi AI.");
    }

    #[tokio::test]
    async fn history_is_serialized_into_the_prompt() {
        let provider = FakeProvider::with_text(r#"{"response": "ok"}"#);
        let history = vec![
            ChatMessage {
                role: Role::User,
                content: "hello".into(),
            },
            ChatMessage {
                role: Role::Model,
                content: "hi there".into(),
            },
        ];
        chat(&provider, &history, "what can you do?").await.unwrap();

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        match &calls[0][0] {
            crate::provider::Part::Text(prompt) => {
                assert!(prompt.contains("user: hello"));
                assert!(prompt.contains("model: hi there"));
                assert!(prompt.contains("user: what can you do?"));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[tokio::test]
    async fn blank_message_is_invalid_input() {
        let provider = FakeProvider::with_text("unused");
        let err = chat(&provider, &[], "   ").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}

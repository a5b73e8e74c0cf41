//! Plain-language summaries of command output from an OpenAI-compatible
//! chat-completions API.

use std::time::Duration;

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Returned in place of an interpretation when no API key is configured.
pub const NOT_CONFIGURED: &str = "LLM interpretation not available - API key not configured";

const SYSTEM_PROMPT: &str = "You are an expert Cisco network engineer assistant. Your role is to interpret and explain Cisco IOS command outputs in a clear, concise manner.

When analyzing network outputs:
1. Identify the key information (interface states, IP addresses, routing information, etc.)
2. Highlight any potential issues or warnings (down interfaces, errors, misconfigurations)
3. Provide a brief summary of the overall status
4. Use proper Cisco terminology and abbreviations
5. Focus on actionable insights

Format your response as:
- **Summary**: Brief overview in 1-2 sentences
- **Key Findings**: Bullet points of important information
- **Issues/Warnings**: Any problems detected (if any)
- **Recommendations**: Suggested actions (if applicable)

Keep responses concise and technical but understandable. Assume the reader has basic networking knowledge.";

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: 500,
            temperature: 0.3,
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum InterpretError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("response contained no message")]
    Empty,
}

/// Client for the interpretation endpoint. Never fails: errors come back as
/// text so the caller can show them next to the raw output.
pub struct Interpreter {
    config: InterpreterConfig,
    client: reqwest::Client,
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    /// Interpretation is available only with an API key.
    pub fn is_enabled(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Summarize `output`, optionally naming the command that produced it.
    pub async fn interpret(&self, output: &str, command: Option<&str>) -> String {
        let Some(api_key) = &self.config.api_key else {
            return NOT_CONFIGURED.to_string();
        };

        let context = command
            .map(|c| format!("Command executed: {c}\n\n"))
            .unwrap_or_default();
        let prompt = format!("{context}Please interpret this Cisco output:\n\n{output}");

        match self.complete(api_key, &prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("interpretation failed: {}", e);
                format!("Error generating interpretation: {e}")
            }
        }
    }

    async fn complete(&self, api_key: &SecretString, prompt: &str) -> Result<String, InterpretError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("POST {} (model {})", url, self.config.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InterpretError::Status { status, body });
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(InterpretError::Empty)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    async fn fake_api(reply: Value, status: u16) -> (String, Arc<Mutex<Option<Value>>>) {
        let seen = Arc::new(Mutex::new(None));
        let recorder = Arc::clone(&seen);
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| {
                let recorder = Arc::clone(&recorder);
                let reply = reply.clone();
                async move {
                    *recorder.lock().unwrap() = Some(body);
                    (axum::http::StatusCode::from_u16(status).unwrap(), Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1"), seen)
    }

    fn interpreter(base_url: String) -> Interpreter {
        Interpreter::new(InterpreterConfig {
            api_key: Some(SecretString::from("sk-test")),
            base_url,
            ..InterpreterConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_without_key_is_disabled() {
        let interpreter = Interpreter::new(InterpreterConfig::default()).unwrap();
        assert!(!interpreter.is_enabled());
        assert_eq!(interpreter.interpret("x", None).await, NOT_CONFIGURED);
    }

    #[tokio::test]
    async fn test_interpret_sends_prompt() {
        let reply = json!({"choices": [{"message": {"role": "assistant", "content": "**Summary**: all up"}}]});
        let (base_url, seen) = fake_api(reply, 200).await;

        let text = interpreter(base_url)
            .interpret("Gi0/1 up up", Some("show ip interface brief"))
            .await;
        assert_eq!(text, "**Summary**: all up");

        let body = seen.lock().unwrap().take().unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(
            body["messages"][1]["content"],
            "Command executed: show ip interface brief\n\nPlease interpret this Cisco output:\n\nGi0/1 up up"
        );
    }

    #[tokio::test]
    async fn test_api_error_becomes_text() {
        let (base_url, _seen) = fake_api(json!({"error": "bad key"}), 401).await;
        let text = interpreter(base_url).interpret("output", None).await;
        assert!(text.starts_with("Error generating interpretation: API returned 401"));
    }
}

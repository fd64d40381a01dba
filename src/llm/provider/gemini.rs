//! Google Gemini provider
//!
//! Uses the `generateContent` REST endpoint. Gemini restricts function names,
//! so capability ids are escaped on the way out and unescaped on the way back.
//! Function-call arguments arrive as an object and are serialized to a string.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use crate::capability::CapabilityDeclaration;
use crate::core::{Answer, ChatTurn, CohortError, Config, Invocation, Result, Role};
use crate::llm::traits::{arguments_to_string, ensure_success, request_error, LlmProvider};

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Escape a capability id into a Gemini-safe function name.
///
/// Leading `_`, ASCII alphanumerics kept, `_` doubled, `-` as `_d`, anything
/// else byte-wise as `_xHH`.
pub fn escape_name(id: &str) -> String {
    let mut out = String::with_capacity(id.len() + 1);
    out.push('_');
    for byte in id.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => out.push(byte as char),
            b'_' => out.push_str("__"),
            b'-' => out.push_str("_d"),
            other => out.push_str(&format!("_x{:02x}", other)),
        }
    }
    out
}

/// Reverse `escape_name`
pub fn unescape_name(name: &str) -> Result<String> {
    let invalid = || CohortError::provider(format!("Gemini returned an unknown function name '{}'", name));

    let body = name.strip_prefix('_').ok_or_else(invalid)?;
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'_' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'_') => {
                out.push(b'_');
                i += 2;
            }
            Some(b'd') => {
                out.push(b'-');
                i += 2;
            }
            Some(b'x') => {
                let hex = body.get(i + 2..i + 4).ok_or_else(invalid)?;
                out.push(u8::from_str_radix(hex, 16).map_err(|_| invalid())?);
                i += 4;
            }
            _ => return Err(invalid()),
        }
    }
    String::from_utf8(out).map_err(|_| invalid())
}

impl GeminiProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.gemini.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.gemini.base_url.trim_end_matches('/').to_string(),
            api_key: config.gemini.api_key.clone(),
        })
    }

    /// Build the request body.
    ///
    /// Leading system turns become the system instruction. Later system turns
    /// (capability observations) are sent as user parts tagged `[system]`.
    pub(crate) fn request_body(turns: &[ChatTurn], capabilities: &[CapabilityDeclaration]) -> Value {
        let leading = turns.iter().take_while(|t| t.role == Role::System).count();
        let instruction = turns[..leading]
            .iter()
            .map(|t| t.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let contents: Vec<Value> = turns[leading..]
            .iter()
            .map(|turn| match turn.role {
                Role::Assistant => json!({"role": "model", "parts": [{"text": turn.content}]}),
                Role::User => json!({"role": "user", "parts": [{"text": turn.content}]}),
                Role::System => json!({
                    "role": "user",
                    "parts": [{"text": format!("[system] {}", turn.content)}]
                }),
            })
            .collect();

        let mut body = json!({ "contents": contents });
        if !instruction.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }
        if !capabilities.is_empty() {
            let declarations: Vec<Value> = capabilities
                .iter()
                .map(|decl| {
                    json!({
                        "name": escape_name(&decl.name),
                        "description": decl.description,
                        "parameters": decl.parameters,
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }
        body
    }

    pub(crate) fn canonicalize(response: &Value) -> Result<Answer> {
        let usage = response["usageMetadata"]["totalTokenCount"]
            .as_u64()
            .unwrap_or(0);

        let parts = response["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut text = String::new();
        let mut invocation = None;
        for part in parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            }
            if invocation.is_none() {
                if let Some(name) = part["functionCall"]["name"].as_str() {
                    let arguments = arguments_to_string(part["functionCall"]["args"].clone())?;
                    invocation = Some(Invocation::new(unescape_name(name)?, arguments));
                }
            }
        }

        Ok(Answer {
            content: Some(text).filter(|t| !t.is_empty()),
            invocation,
            usage,
        })
    }

    fn endpoint(&self, model: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/models/{}:generateContent", self.base_url, model))
            .map_err(|e| CohortError::config(format!("Invalid Gemini URL: {}", e)))?;
        if let Some(ref key) = self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn think(
        &self,
        model: &str,
        turns: &[ChatTurn],
        capabilities: &[CapabilityDeclaration],
    ) -> Result<Answer> {
        if self.api_key.is_none() {
            return Err(CohortError::provider("GEMINI_API_KEY is not set"));
        }

        let body = Self::request_body(turns, capabilities);
        let response = self
            .client
            .post(self.endpoint(model)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("Gemini", &self.base_url, e))?;
        let response = ensure_success("Gemini", response).await?;

        let json: Value = response.json().await?;
        Self::canonicalize(&json)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip_on_awkward_ids() {
        for id in [
            "7198573d-bb7d-4786-b1c6-c9d88af4756d",
            "read_file",
            "a-_b",
            "db.query",
            "ação",
        ] {
            let escaped = escape_name(id);
            assert!(escaped
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_'));
            assert_eq!(unescape_name(&escaped).unwrap(), id);
        }
    }

    #[test]
    fn test_unescape_rejects_foreign_names() {
        assert!(unescape_name("no_prefix").is_err());
        assert!(unescape_name("_bad_q").is_err());
        assert!(unescape_name("_trail_x4").is_err());
    }

    #[test]
    fn test_function_call_is_unescaped_and_serialized() {
        let response = json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"functionCall": {"name": escape_name("read-file"), "args": {"path": "/tmp/a"}}}
            ]}}],
            "usageMetadata": {"totalTokenCount": 99}
        });
        let answer = GeminiProvider::canonicalize(&response).unwrap();
        let invocation = answer.invocation.unwrap();
        assert_eq!(invocation.id, "read-file");
        assert_eq!(invocation.arguments, r#"{"path":"/tmp/a"}"#);
        assert_eq!(answer.usage, 99);
    }

    #[test]
    fn test_text_parts_without_usage() {
        let response = json!({
            "candidates": [{"content": {"parts": [{"text": "hel"}, {"text": "lo"}]}}]
        });
        let answer = GeminiProvider::canonicalize(&response).unwrap();
        assert_eq!(answer.content.as_deref(), Some("hello"));
        assert_eq!(answer.usage, 0);
    }

    #[test]
    fn test_request_body_layout() {
        let turns = vec![
            ChatTurn::system("persona"),
            ChatTurn::system("YOUR NAME IS: Iara"),
            ChatTurn::user("hi"),
            ChatTurn::system("[echo] said: hi"),
            ChatTurn::assistant("hello"),
        ];
        let decls = vec![CapabilityDeclaration {
            name: "echo-1".into(),
            description: "repeat".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let body = GeminiProvider::request_body(&turns, &decls);

        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            "persona\nYOUR NAME IS: Iara"
        );
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["parts"][0]["text"], "[system] [echo] said: hi");
        assert_eq!(contents[2]["role"], "model");
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "_echo_d1"
        );
    }
}

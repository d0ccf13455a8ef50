//! Inference client for the hosted text-generation API
//!
//! One blocking POST per turn with a fixed timeout, no retries. Failures are
//! returned as a tagged `InferenceError`; callers turn them into display
//! text only when recording the exchange.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::InferenceConfig;
use crate::persona::prompt::RESPONSE_MARKER;

/// Upper bound on a single request, connect to last byte
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reply used when the service answers without any generated text
pub const NO_RESPONSE: &str = "No response generated";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("⚠️ Hugging Face API token not configured. Please add your token to continue.")]
    MissingCredential,

    #[error("API Error: {status} - {body}")]
    HttpError { status: u16, body: String },

    #[error("Error: {0}")]
    TransportError(String),

    #[error("Error: {0}")]
    MalformedResponse(String),
}

/// Anything that can turn a prompt into generated text
pub trait TextGenerator {
    fn query(&self, prompt: &str, model_id: &str, credential: Option<&str>) -> Result<String, InferenceError>;
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub max_length: u32,
    pub temperature: f32,
    pub do_sample: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 200,
            temperature: 0.7,
            do_sample: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParams,
}

/// Client for the Hugging Face Inference API
pub struct HfClient {
    agent: ureq::Agent,
    base_url: String,
    params: GenerationParams,
}

impl HfClient {
    pub fn new(base_url: &str, params: GenerationParams) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();

        Self::with_agent(agent, base_url, params)
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(&config.base_url, config.params())
    }

    fn with_agent(agent: ureq::Agent, base_url: &str, params: GenerationParams) -> Self {
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            params,
        }
    }

    pub fn endpoint(&self, model_id: &str) -> String {
        format!("{}/{}", self.base_url, model_id)
    }
}

impl TextGenerator for HfClient {
    fn query(&self, prompt: &str, model_id: &str, credential: Option<&str>) -> Result<String, InferenceError> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(InferenceError::MissingCredential)?;

        let url = self.endpoint(model_id);
        let request = GenerateRequest {
            inputs: prompt,
            parameters: self.params,
        };
        let request_body =
            serde_json::to_string(&request).map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        log::info!("Querying {} (prompt {} chars)", url, prompt.len());

        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .send(request_body.as_bytes())
            .map_err(|e| {
                log::warn!("Request to {} failed: {}", url, e);
                InferenceError::TransportError(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| InferenceError::TransportError(e.to_string()))?;

        log::info!("{} answered {}", url, status);

        if status != 200 {
            return Err(InferenceError::HttpError { status, body });
        }

        extract_generated_text(&body)
    }
}

/// Pull the generated text out of a successful response body.
///
/// Accepts a list of `{generated_text}` objects or a single object; any other
/// JSON is returned as its compact text.
pub fn extract_generated_text(body: &str) -> Result<String, InferenceError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| InferenceError::MalformedResponse(format!("invalid JSON response: {}", e)))?;

    let text = match &value {
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("generated_text"))
            .and_then(Value::as_str)
            .unwrap_or(NO_RESPONSE)
            .to_string(),
        Value::Object(map) => match map.get("generated_text").and_then(Value::as_str) {
            Some(text) => text.to_string(),
            None => value.to_string(),
        },
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    Ok(text)
}

/// Strip an echoed prompt and anything up to the last response marker
pub fn clean_reply(prompt: &str, text: &str) -> String {
    let mut reply = text.strip_prefix(prompt).unwrap_or(text);
    if let Some(idx) = reply.rfind(RESPONSE_MARKER) {
        reply = &reply[idx + RESPONSE_MARKER.len()..];
    }
    reply.trim().to_string()
}

/// Text stored for a turn: the cleaned reply, or the error message in its place
pub fn reply_text(prompt: &str, outcome: Result<String, InferenceError>) -> String {
    match outcome {
        Ok(text) => clean_reply(prompt, &text),
        Err(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    fn test_client(base_url: &str) -> HfClient {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(5)))
            .http_status_as_error(false)
            .proxy(None)
            .build()
            .into();
        HfClient::with_agent(agent, base_url, GenerationParams::default())
    }

    /// Read one HTTP request; returns lowercased head and raw body
    fn read_request(stream: &TcpStream) -> (String, String) {
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut head = String::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            head.push_str(&line.to_ascii_lowercase());
        }

        let mut body = Vec::new();
        if let Some(len) = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse::<usize>().unwrap())
        {
            body.resize(len, 0);
            reader.read_exact(&mut body).unwrap();
        } else if head.contains("transfer-encoding: chunked") {
            loop {
                let mut size_line = String::new();
                reader.read_line(&mut size_line).unwrap();
                let size = usize::from_str_radix(size_line.trim(), 16).unwrap();
                let mut chunk = vec![0; size + 2];
                reader.read_exact(&mut chunk).unwrap();
                if size == 0 {
                    break;
                }
                body.extend_from_slice(&chunk[..size]);
            }
        }

        (head, String::from_utf8(body).unwrap())
    }

    /// Answer exactly one request with `status` and `body`
    fn serve_once(status: &'static str, body: &'static str) -> (String, thread::JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&stream);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });
        (format!("http://{}/models", addr), handle)
    }

    #[test]
    fn test_missing_credential_skips_network() {
        // Nothing listens here; a network attempt would fail with a transport error
        let client = test_client("http://127.0.0.1:9/models");
        assert_eq!(client.query("hi", "gpt2", None), Err(InferenceError::MissingCredential));
        assert_eq!(client.query("hi", "gpt2", Some("  ")), Err(InferenceError::MissingCredential));
    }

    #[test]
    fn test_missing_credential_message() {
        assert_eq!(
            InferenceError::MissingCredential.to_string(),
            "⚠️ Hugging Face API token not configured. Please add your token to continue."
        );
    }

    #[test]
    fn test_query_success() {
        let (base_url, server) = serve_once("200 OK", r#"[{"generated_text": "Hello from the model"}]"#);
        let client = test_client(&base_url);

        let text = client.query("Say hi", "gpt2", Some("secret")).unwrap();
        assert_eq!(text, "Hello from the model");

        let (head, body) = server.join().unwrap();
        assert!(head.starts_with("post /models/gpt2 http/1.1"));
        assert!(head.contains("authorization: bearer secret"));

        let sent: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(sent["inputs"], "Say hi");
        assert_eq!(sent["parameters"]["max_length"], 200);
        assert_eq!(sent["parameters"]["do_sample"], true);
        assert!((sent["parameters"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_query_http_error() {
        let (base_url, server) = serve_once("503 Service Unavailable", r#"{"error":"Model is loading"}"#);
        let client = test_client(&base_url);

        let err = client.query("Say hi", "distilgpt2", Some("secret")).unwrap_err();
        assert_eq!(
            err,
            InferenceError::HttpError {
                status: 503,
                body: r#"{"error":"Model is loading"}"#.to_string()
            }
        );
        assert!(err.to_string().starts_with("API Error: 503 - "));
        server.join().unwrap();
    }

    #[test]
    fn test_query_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = test_client(&format!("http://{}/models", addr));
        let err = client.query("Say hi", "gpt2", Some("secret")).unwrap_err();
        assert!(matches!(err, InferenceError::TransportError(_)));
        assert!(err.to_string().starts_with("Error: "));
    }

    #[test]
    fn test_extract_list_shape() {
        assert_eq!(extract_generated_text(r#"[{"generated_text":"a"},{"generated_text":"b"}]"#).unwrap(), "a");
        assert_eq!(extract_generated_text(r#"[{"summary":"x"}]"#).unwrap(), NO_RESPONSE);
        assert_eq!(extract_generated_text("[]").unwrap(), NO_RESPONSE);
    }

    #[test]
    fn test_extract_object_shape() {
        assert_eq!(extract_generated_text(r#"{"generated_text":"solo"}"#).unwrap(), "solo");
        assert_eq!(extract_generated_text(r#"{"warning":"slow"}"#).unwrap(), r#"{"warning":"slow"}"#);
        assert_eq!(extract_generated_text(r#""plain""#).unwrap(), "plain");
    }

    #[test]
    fn test_extract_not_json() {
        let err = extract_generated_text("<html>oops</html>").unwrap_err();
        assert!(matches!(err, InferenceError::MalformedResponse(_)));
    }

    #[test]
    fn test_clean_reply_strips_echoed_prompt() {
        let prompt = "You are Spy.\n\nCurrent user request: hi\n\nResponse:";
        let echoed = format!("{} Hello there. ", prompt);
        assert_eq!(clean_reply(prompt, &echoed), "Hello there.");
    }

    #[test]
    fn test_clean_reply_uses_last_marker() {
        assert_eq!(clean_reply("unrelated", "junk Response: one Response:  two "), "two");
        assert_eq!(clean_reply("unrelated", "  just text "), "just text");
    }

    #[test]
    fn test_reply_text_for_errors() {
        let text = reply_text("p", Err(InferenceError::HttpError { status: 401, body: "bad token".into() }));
        assert_eq!(text, "API Error: 401 - bad token");

        // error text is stored as-is, even when it contains the marker
        let text = reply_text("p", Err(InferenceError::TransportError("Response: reset".into())));
        assert_eq!(text, "Error: Response: reset");
    }
}

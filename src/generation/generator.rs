//! Generator backends: prompt in, raw text out.
//!
//! Timeouts are applied by the caller (the retry loop); backends only need
//! to be cancellation-safe. `CommandGenerator` sets `kill_on_drop`, so a
//! timed-out child process is killed when its future is dropped.

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::ai::GeneratorConfig;
use crate::error::GenerateError;
use crate::telemetry::fingerprint;

/// Max stderr bytes kept in a process failure.
const STDERR_TAIL: usize = 500;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Run one generation for `phase`. Implementations may use the phase
    /// name to pick arguments; they must not retry on their own.
    async fn generate(&self, phase: &str, prompt: &str) -> Result<String, GenerateError>;
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn Generator>;

/// Factory: build a generator according to config.
pub fn build_generator(cfg: &GeneratorConfig) -> anyhow::Result<DynGenerator> {
    match cfg.provider.as_str() {
        "command" => Ok(Arc::new(CommandGenerator::from_config(cfg))),
        "openai" => Ok(Arc::new(OpenAiGenerator::new(&cfg.api_key, &cfg.model)?)),
        "mock" => Ok(Arc::new(ScriptedGenerator::new(
            cfg.mock_responses.iter().cloned().map(Ok),
        ))),
        other => anyhow::bail!("Unsupported provider in config: {other}"),
    }
}

// ------------------------------------------------------------
// External CLI
// ------------------------------------------------------------

/// Runs an external CLI, writes the prompt to its stdin and returns stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    phase_args: std::collections::HashMap<String, Vec<String>>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            phase_args: Default::default(),
        }
    }

    pub fn from_config(cfg: &GeneratorConfig) -> Self {
        Self {
            program: cfg.command.clone(),
            args: cfg.args.clone(),
            phase_args: cfg.phase_args.clone(),
        }
    }

    fn args_for(&self, phase: &str) -> Vec<String> {
        let mut out = self.args.clone();
        if let Some(extra) = self.phase_args.get(phase) {
            out.extend(extra.iter().cloned());
        }
        out
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    async fn generate(&self, phase: &str, prompt: &str) -> Result<String, GenerateError> {
        let mut child = Command::new(&self.program)
            .args(self.args_for(phase))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GenerateError::Unavailable(format!("{}: {e}", self.program)))?;

        // stdin is fed while stdout/stderr drain, or a chatty child fills
        // its pipe and both sides block.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(prompt.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, out) = tokio::join!(feed, child.wait_with_output());
        let out = out?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(GenerateError::ProcessFailed {
                code: out.status.code(),
                stderr: truncate_bytes(stderr.trim(), STDERR_TAIL),
            });
        }
        if let Err(e) = fed {
            // a child may exit successfully without reading all of its input
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(GenerateError::Io(e));
            }
            debug!(target: "generation", program = %self.program, "child closed stdin early");
        }
        let text = String::from_utf8_lossy(&out.stdout).into_owned();
        debug!(
            target: "generation",
            phase,
            program = %self.program,
            response = %fingerprint(&text),
            bytes = text.len(),
            "command generator finished"
        );
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

fn truncate_bytes(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

// ------------------------------------------------------------
// OpenAI-compatible chat completions
// ------------------------------------------------------------

/// OpenAI provider (Chat Completions API).
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, model: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("press-digest/0.1")
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}
#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}
#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}
#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, phase: &str, prompt: &str) -> Result<String, GenerateError> {
        if self.api_key.is_empty() {
            return Err(GenerateError::Unavailable("OPENAI_API_KEY is not set".into()));
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.4,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| GenerateError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GenerateError::Request(format!("HTTP {status}")));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| GenerateError::Request(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        debug!(target: "generation", phase, response = %fingerprint(&content), "openai generator finished");
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Scripted (tests / dry runs)
// ------------------------------------------------------------

/// Serves queued responses in order and records every prompt it saw.
/// Once the queue is empty every call fails with `Unavailable`.
#[derive(Default)]
pub struct ScriptedGenerator {
    queue: Mutex<VecDeque<Result<String, GenerateError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Result<String, GenerateError>>,
    {
        Self {
            queue: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| Ok(t.into())))
    }

    /// Sleep before answering (to exercise timeouts).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _phase: &str, prompt: &str) -> Result<String, GenerateError> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        next.unwrap_or_else(|| Err(GenerateError::Unavailable("script exhausted".into())))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

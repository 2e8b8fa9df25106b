// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env, fs, path::Path, path::PathBuf, time::Duration};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";
/// `AI_TEST_MODE=mock` forces the scripted generator regardless of config.
pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";

fn default_provider() -> String {
    "command".to_string()
}
fn default_command() -> String {
    "claude".to_string()
}
fn default_args() -> Vec<String> {
    ["-p", "--output-format", "text", "--no-session-persistence"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_timeout_secs() -> u64 {
    300
}

/// How the text generator is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// "command" | "openai" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Executable for the "command" provider; the prompt goes to its stdin.
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Extra arguments appended for one phase only (e.g. tool permissions
    /// for the web-search phase).
    #[serde(default)]
    pub phase_args: HashMap<String, Vec<String>>,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default)]
    pub api_key: String,
    /// Fallback per-attempt timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Per-phase timeouts, keyed by phase name.
    #[serde(default)]
    pub timeouts: HashMap<String, u64>,
    /// Canned responses for the "mock" provider, served in order.
    #[serde(default)]
    pub mock_responses: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            command: default_command(),
            args: default_args(),
            phase_args: HashMap::new(),
            model: default_model(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            timeouts: HashMap::new(),
            mock_responses: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: GeneratorConfig = serde_json::from_str(&data)?;
        cfg.resolved()
    }

    /// 1) `$AI_CONFIG_PATH` (must exist)
    /// 2) `config/ai.json`
    /// 3) defaults (command provider)
    pub fn load_default() -> anyhow::Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_AI_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!(
                    "{ENV_AI_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                );
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_AI_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_AI_CONFIG_PATH)?
        } else {
            Self::default()
        };

        if env::var(ENV_AI_TEST_MODE)
            .map(|v| v == "mock")
            .unwrap_or(false)
        {
            cfg.provider = "mock".to_string();
        }
        Ok(cfg)
    }

    fn resolved(mut self) -> anyhow::Result<Self> {
        // Normalize provider
        self.provider = self.provider.trim().to_lowercase();

        // Resolve api key if "ENV"
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("api_key=ENV is not supported for provider {other}"),
            };
        }

        match self.provider.as_str() {
            "command" | "openai" | "mock" => {}
            other => anyhow::bail!("Unsupported provider in config: {other}"),
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        Ok(self)
    }

    /// Per-attempt deadline for `phase`.
    pub fn timeout_for(&self, phase: &str) -> Duration {
        let secs = self
            .timeouts
            .get(phase)
            .copied()
            .filter(|s| *s > 0)
            .unwrap_or(self.timeout_secs);
        Duration::from_secs(secs)
    }
}

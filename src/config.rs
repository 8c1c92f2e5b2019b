//! Configuration: defaults, TOML overlay file, env overrides
//!
//! The config file lives at the platform config dir (e.g.
//! `~/.config/sotto/config.toml`); every field is optional and overlays
//! the built-in defaults. A few `SOTTO_*` env vars override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::context::CompactionConfig;
use crate::tools::ExecutorConfig;
use crate::{Error, Result};

/// Default OpenAI-compatible endpoint: a local llama.cpp / LM Studio server
const DEFAULT_LLM_BASE_URL: &str = "http://localhost:8080/v1";

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Voice capture and synthesis settings
    pub voice: VoiceConfig,
    /// Language model endpoint settings
    pub llm: LlmConfig,
    /// Orchestration settings
    pub agent: AgentConfig,
    /// Tool execution settings
    pub tools: ToolsConfig,
    /// History compaction settings
    pub compaction: CompactionConfig,
}

/// Voice capture and synthesis settings
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Fixed recording window per utterance, in seconds
    pub record_secs: u64,
    /// STT model identifier
    pub stt_model: String,
    /// TTS model identifier
    pub tts_model: String,
    /// TTS voice identifier
    pub tts_voice: String,
    /// TTS speed multiplier
    pub tts_speed: f32,
}

/// Language model endpoint settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible API root; also used for STT/TTS endpoints
    pub base_url: String,
    /// Bearer token; omit for local servers without auth
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Max tokens per completion
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

/// Orchestration settings
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Max tool-call rounds per utterance
    pub max_tool_iterations: usize,
}

/// Tool execution settings
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    /// Per-call tool timeout in seconds
    pub timeout_secs: u64,
    /// Cap on tool result text length
    pub max_output_chars: usize,
    /// Web search provider name ("brave" or "serper"); search is
    /// disabled when unset
    pub search_provider: Option<String>,
    /// Web search API key
    pub search_api_key: Option<String>,
}

impl ToolsConfig {
    /// Executor limits derived from this config
    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            max_output_chars: self.max_output_chars,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            voice: VoiceConfig {
                record_secs: 5,
                stt_model: "whisper-1".to_string(),
                tts_model: "tts-1".to_string(),
                tts_voice: "alloy".to_string(),
                tts_speed: 1.0,
            },
            llm: LlmConfig {
                base_url: DEFAULT_LLM_BASE_URL.to_string(),
                api_key: None,
                model: "local".to_string(),
                max_tokens: 256,
                temperature: 0.3,
            },
            agent: AgentConfig {
                max_tool_iterations: 5,
            },
            tools: ToolsConfig {
                timeout_secs: 30,
                max_output_chars: 4000,
                search_provider: None,
                search_api_key: None,
            },
            compaction: CompactionConfig::default(),
        }
    }
}

/// Partial TOML schema; every field overlays a default
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    voice: VoiceFileSection,
    #[serde(default)]
    llm: LlmFileSection,
    #[serde(default)]
    agent: AgentFileSection,
    #[serde(default)]
    tools: ToolsFileSection,
    #[serde(default)]
    memory: MemoryFileSection,
}

#[derive(Debug, Default, Deserialize)]
struct VoiceFileSection {
    record_secs: Option<u64>,
    stt_model: Option<String>,
    tts_model: Option<String>,
    tts_voice: Option<String>,
    tts_speed: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmFileSection {
    base_url: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentFileSection {
    max_tool_iterations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolsFileSection {
    timeout_secs: Option<u64>,
    max_output_chars: Option<usize>,
    search_provider: Option<String>,
    search_api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MemoryFileSection {
    max_tokens: Option<usize>,
    protected_tail: Option<usize>,
}

impl Config {
    /// Default config file path, if a config directory exists
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "sotto")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load configuration: defaults, then the TOML file (if present),
    /// then env overrides.
    ///
    /// # Errors
    ///
    /// Returns error if an explicitly given path is missing or the file
    /// fails to parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let resolved = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                Some(p.to_path_buf())
            }
            None => Self::default_path().filter(|p| p.exists()),
        };

        if let Some(file_path) = resolved {
            let raw = std::fs::read_to_string(&file_path)?;
            let file: ConfigFile = toml::from_str(&raw)?;
            config.apply_file(file);
            tracing::debug!(path = %file_path.display(), "loaded config file");
        }

        config.apply_env();
        config.compaction = {
            let mut c = CompactionConfig::from_env();
            // File values win over defaults but not over env
            if std::env::var("SOTTO_COMPACT_MAX_TOKENS").is_err() {
                c.max_tokens = config.compaction.max_tokens;
            }
            if std::env::var("SOTTO_COMPACT_PROTECTED_TAIL").is_err() {
                c.protected_tail = config.compaction.protected_tail;
            }
            c
        };

        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        let v = file.voice;
        if let Some(n) = v.record_secs {
            self.voice.record_secs = n;
        }
        if let Some(m) = v.stt_model {
            self.voice.stt_model = m;
        }
        if let Some(m) = v.tts_model {
            self.voice.tts_model = m;
        }
        if let Some(m) = v.tts_voice {
            self.voice.tts_voice = m;
        }
        if let Some(s) = v.tts_speed {
            self.voice.tts_speed = s;
        }

        let l = file.llm;
        if let Some(u) = l.base_url {
            self.llm.base_url = u;
        }
        if l.api_key.is_some() {
            self.llm.api_key = l.api_key;
        }
        if let Some(m) = l.model {
            self.llm.model = m;
        }
        if let Some(n) = l.max_tokens {
            self.llm.max_tokens = n;
        }
        if let Some(t) = l.temperature {
            self.llm.temperature = t;
        }

        if let Some(n) = file.agent.max_tool_iterations {
            self.agent.max_tool_iterations = n;
        }

        let t = file.tools;
        if let Some(n) = t.timeout_secs {
            self.tools.timeout_secs = n;
        }
        if let Some(n) = t.max_output_chars {
            self.tools.max_output_chars = n;
        }
        if t.search_provider.is_some() {
            self.tools.search_provider = t.search_provider;
        }
        if t.search_api_key.is_some() {
            self.tools.search_api_key = t.search_api_key;
        }

        if let Some(n) = file.memory.max_tokens {
            self.compaction.max_tokens = n;
        }
        if let Some(n) = file.memory.protected_tail {
            self.compaction.protected_tail = n;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SOTTO_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(key) = std::env::var("SOTTO_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("SOTTO_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(key) = std::env::var("SOTTO_SEARCH_API_KEY") {
            self.tools.search_api_key = Some(key);
        }
    }
}

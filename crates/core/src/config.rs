use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::NetsocError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Key lookup chain: `{PROFILE}_{KEY}` env, `{KEY}` env, then the YAML file
/// (keys are the lowercase env names, e.g. `ollama_model`).
struct Settings {
    profile: String,
    file: HashMap<String, String>,
}

impl Settings {
    fn opt(&self, key: &str) -> Option<String> {
        if !self.profile.is_empty() {
            if let Some(v) = env_opt(&format!("{}_{}", self.profile, key)) {
                return Some(v);
            }
        }
        env_opt(key).or_else(|| {
            self.file
                .get(&key.to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .cloned()
        })
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }
}

/// Flatten a YAML mapping into `key -> string` pairs. Nested sections are
/// joined with `_` so `ollama: { model: x }` and `ollama_model: x` agree.
fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, String>) {
    use serde_yaml::Value;

    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(k) = k.as_str() else { continue };
                let key = if prefix.is_empty() {
                    k.to_ascii_lowercase()
                } else {
                    format!("{}_{}", prefix, k.to_ascii_lowercase())
                };
                flatten_yaml(&key, v, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        _ => {}
    }
}

fn read_config_file(path: &Path) -> Result<HashMap<String, String>, NetsocError> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&text).map_err(|e| NetsocError::Config(e.to_string()))?;
    let mut out = HashMap::new();
    flatten_yaml("", &value, &mut out);
    Ok(out)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub data: DataConfig,
    pub detection: DetectionConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub embedding: EmbeddingConfig,
    pub mapper: MapperConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first)
    /// layered over the optional YAML file named by `NETSOC_CONFIG`
    /// (default `config.yaml`). A missing file is not an error.
    pub fn from_env() -> Self {
        let profile = env_or("NETSOC_PROFILE", "").to_uppercase();
        let path = PathBuf::from(env_or("NETSOC_CONFIG", "config.yaml"));
        let file = if path.exists() {
            match read_config_file(&path) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };
        Self::build(&profile, file)
    }

    /// Build config from a specific YAML file, still honouring env overrides.
    pub fn from_file(path: &Path) -> Result<Self, NetsocError> {
        let profile = env_or("NETSOC_PROFILE", "").to_uppercase();
        Ok(Self::build(&profile, read_config_file(path)?))
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        Self::build(&profile.to_uppercase(), HashMap::new())
    }

    fn build(profile: &str, file: HashMap<String, String>) -> Self {
        let s = Settings {
            profile: profile.to_string(),
            file,
        };
        Self {
            profile: s.profile.clone(),
            server: ServerConfig::from_settings(&s),
            data: DataConfig::from_settings(&s),
            detection: DetectionConfig::from_settings(&s),
            llm: LlmConfig::from_settings(&s),
            ollama: OllamaConfig::from_settings(&s),
            embedding: EmbeddingConfig::from_settings(&s),
            mapper: MapperConfig::from_settings(&s),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  data:        logs={}, corpus={}, iocs={}",
            self.data.log_path.display(),
            self.data.corpus_dir.display(),
            self.data.ioc_path.display()
        );
        tracing::info!(
            "  detection:   gap={}s, window={}, z>{}, field={}, dns_entropy>{}",
            self.detection.gap_seconds,
            self.detection.anomaly_window,
            self.detection.anomaly_z_threshold,
            self.detection.volume_field,
            self.detection.dns_entropy_threshold
        );
        tracing::info!("  llm:         provider={}", self.llm.provider);
        tracing::info!("  ollama:      url={}, model={}", self.ollama.url, self.ollama.model);
        tracing::info!("  embedding:   provider={}", self.embedding.provider);
        tracing::info!(
            "  mapper:      k={}, concurrency={}, timeout={}s",
            self.mapper.top_k,
            self.mapper.concurrency,
            self.mapper.timeout_secs
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "data": {
                "log_path": self.data.log_path,
                "corpus_dir": self.data.corpus_dir,
                "ioc_path": self.data.ioc_path,
                "max_log_bytes": self.data.max_log_bytes,
            },
            "detection": self.detection,
            "llm": {
                "provider": self.llm.provider,
                "configured": self.llm.is_configured(),
            },
            "ollama": { "url": self.ollama.url, "model": self.ollama.model },
            "embedding": { "provider": self.embedding.provider, "dimensions": self.embedding.dimensions },
            "mapper": self.mapper,
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_settings(s: &Settings) -> Self {
        Self {
            host: s.or("HOST", "0.0.0.0"),
            port: s.parse_or("PORT", 5000),
            cors_origin: s.or("CORS_ORIGIN", "*"),
        }
    }
}

// ── Data locations ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Default telemetry export loaded by the collector.
    pub log_path: PathBuf,
    /// Directory of reference documents for the retrieval corpus.
    pub corpus_dir: PathBuf,
    /// Indicator list, one IOC per line.
    pub ioc_path: PathBuf,
    /// Exports larger than this are refused before reading.
    pub max_log_bytes: u64,
}

pub const DEFAULT_MAX_LOG_BYTES: u64 = 256 * 1024 * 1024;

impl DataConfig {
    fn from_settings(s: &Settings) -> Self {
        Self {
            log_path: PathBuf::from(s.or("LOG_PATH", "data/logs.json")),
            corpus_dir: PathBuf::from(s.or("CORPUS_DIR", "data/corpus")),
            ioc_path: PathBuf::from(s.or("IOC_PATH", "data/iocs.txt")),
            max_log_bytes: s.parse_or("MAX_LOG_BYTES", DEFAULT_MAX_LOG_BYTES),
        }
    }

    /// Directory that collector requests are confined to: the parent of
    /// `log_path`, or the working directory for a bare file name.
    pub fn log_dir(&self) -> &Path {
        match self.log_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

// ── Detection ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Maximum inter-alert gap inside one episode.
    pub gap_seconds: i64,
    /// Rolling window length for the volume anomaly scorer.
    pub anomaly_window: usize,
    /// |z| above which a volume sample is anomalous.
    pub anomaly_z_threshold: f64,
    /// Numeric field scored for volume anomalies (one per run).
    pub volume_field: String,
    /// Bits per character above which a DNS label counts as random.
    pub dns_entropy_threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            gap_seconds: 120,
            anomaly_window: 50,
            anomaly_z_threshold: 3.0,
            volume_field: "resp_bytes".to_string(),
            dns_entropy_threshold: 3.5,
        }
    }
}

impl DetectionConfig {
    fn from_settings(s: &Settings) -> Self {
        let d = Self::default();
        Self {
            gap_seconds: s.parse_or("GAP_SECONDS", d.gap_seconds),
            anomaly_window: s.parse_or("ANOMALY_WINDOW", d.anomaly_window),
            anomaly_z_threshold: s.parse_or("ANOMALY_Z_THRESHOLD", d.anomaly_z_threshold),
            volume_field: s.or("VOLUME_FIELD", &d.volume_field),
            dns_entropy_threshold: s.parse_or("DNS_ENTROPY_THRESHOLD", d.dns_entropy_threshold),
        }
    }
}

// ── LLM (OpenAI / Ollama) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai", "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_settings(s: &Settings) -> Self {
        Self {
            provider: s.or("LLM_PROVIDER", "ollama"),
            openai_api_key: s.opt("OPENAI_API_KEY"),
            openai_model: s.or("OPENAI_MODEL", "gpt-4o"),
            openai_base_url: s.opt("OPENAI_BASE_URL"),
            temperature: s.parse_or("LLM_TEMPERATURE", 0.1),
            max_tokens: s.parse_or("LLM_MAX_TOKENS", 400),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    fn from_settings(s: &Settings) -> Self {
        Self {
            url: s.or("OLLAMA_URL", "http://localhost:11434"),
            model: s.or("OLLAMA_MODEL", "mistral"),
            embedding_model: s.opt("OLLAMA_EMBEDDING_MODEL")
                .or_else(|| s.opt("EMBEDDING_MODEL"))
                .unwrap_or_else(|| "nomic-embed-text".to_string()),
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ollama", "openai", "local"
    pub provider: String,
    pub dimensions: u32,
    pub openai_model: String,
    pub batch_size: u32,
    /// Query embeddings kept in the LRU cache.
    pub cache_capacity: u32,
}

impl EmbeddingConfig {
    fn from_settings(s: &Settings) -> Self {
        Self {
            provider: s.or("EMBEDDING_PROVIDER", "ollama"),
            dimensions: s.parse_or("EMBEDDING_DIMENSIONS", 768),
            openai_model: s.or("OPENAI_EMBEDDING_MODEL", "text-embedding-3-small"),
            batch_size: s.parse_or("EMBEDDING_BATCH_SIZE", 64),
            cache_capacity: s.parse_or("EMBEDDING_CACHE_CAPACITY", 1024),
        }
    }
}

// ── Tactic mapper ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Context documents retrieved per episode.
    pub top_k: usize,
    /// Completion calls in flight at once.
    pub concurrency: usize,
    /// Per-call timeout for retrieval + completion.
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            concurrency: 4,
            timeout_secs: 120,
            temperature: 0.1,
            max_tokens: 400,
        }
    }
}

impl MapperConfig {
    fn from_settings(s: &Settings) -> Self {
        let d = Self::default();
        Self {
            top_k: s.parse_or("MAPPER_TOP_K", d.top_k),
            concurrency: s.parse_or("MAPPER_CONCURRENCY", d.concurrency).max(1),
            timeout_secs: s.parse_or("MAPPER_TIMEOUT_SECS", d.timeout_secs),
            temperature: s.parse_or("LLM_TEMPERATURE", d.temperature),
            max_tokens: s.parse_or("LLM_MAX_TOKENS", d.max_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_file_supplies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "netsoc_unit_port: 8088\nnetsoc_unit:\n  ollama_model: llama3\n",
        )
        .unwrap();

        let file = read_config_file(&path).unwrap();
        assert_eq!(file.get("netsoc_unit_port").map(String::as_str), Some("8088"));
        assert_eq!(
            file.get("netsoc_unit_ollama_model").map(String::as_str),
            Some("llama3")
        );

        let s = Settings {
            profile: String::new(),
            file,
        };
        assert_eq!(s.parse_or("NETSOC_UNIT_PORT", 1u16), 8088);
        assert_eq!(s.or("NETSOC_UNIT_OLLAMA_MODEL", "mistral"), "llama3");
        assert_eq!(s.or("NETSOC_UNIT_MISSING", "fallback"), "fallback");
    }

    #[test]
    fn detection_defaults_match_pipeline_constants() {
        let d = DetectionConfig::default();
        assert_eq!(d.gap_seconds, 120);
        assert_eq!(d.anomaly_window, 50);
        assert_eq!(d.anomaly_z_threshold, 3.0);
        assert_eq!(d.volume_field, "resp_bytes");
        assert_eq!(d.dns_entropy_threshold, 3.5);
    }

    #[test]
    fn log_dir_is_the_parent_of_the_default_export() {
        let mut data = Config::for_profile("netsoc_unit_data").data;
        data.log_path = PathBuf::from("/srv/telemetry/conn.log");
        assert_eq!(data.log_dir(), Path::new("/srv/telemetry"));
        data.log_path = PathBuf::from("logs.json");
        assert_eq!(data.log_dir(), Path::new("."));
    }

    #[test]
    fn profile_label_defaults() {
        let cfg = Config::for_profile("");
        assert_eq!(cfg.profile_label(), "default");
        assert!(cfg.mapper.concurrency >= 1);
    }
}

use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_EMBEDDING_DIM: usize = 64;
const DEFAULT_EMBEDDINGS_MODEL: &str = "text-embedding-v4";
const DEFAULT_CHAT_MODEL: &str = "qwen-plus";
const DEFAULT_CHAT_TIMEOUT_MS: u64 = 45_000;
const DEFAULT_EMBEDDINGS_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TOP_K: usize = 6;

/// Which strategy turns text into embedding vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingsProviderKind {
    /// Deterministic bag-of-hashed-tokens, no network.
    Local,
    /// External embedding service over HTTP.
    Remote,
}

impl EmbeddingsProviderKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "dashscope" | "remote" => Self::Remote,
            _ => Self::Local,
        }
    }
}

/// Replaces the live chat provider for local runs and demos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    Off,
    /// Canned "(mock) Ready." reply with no actions.
    Static,
    /// Keyword planner that emits real action plans without a model.
    Router,
}

impl MockMode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "router" | "local" => Self::Router,
            "1" | "true" => Self::Static,
            _ => Self::Off,
        }
    }
}

/// Per-request tool prompt strategy, chosen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RagMode {
    /// Every registered capability, unranked.
    #[default]
    Legacy,
    /// Similarity-ranked top-K.
    Rag,
}

impl RagMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "legacy.v1" => Some(Self::Legacy),
            "rag.v2" => Some(Self::Rag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy.v1",
            Self::Rag => "rag.v2",
        }
    }
}

pub struct Config {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
    /// Tool registry JSON asset.
    pub registry_path: PathBuf,
    /// Precomputed tool vectors JSON asset (see the `build-vectors` binary).
    pub vectors_path: PathBuf,
    pub embeddings_provider: EmbeddingsProviderKind,
    /// Dimensionality of local embeddings. Must match the vectors asset.
    pub embedding_dim: usize,
    pub embeddings_url: Option<String>,
    pub embeddings_model: String,
    pub embeddings_timeout: Duration,
    /// Shared by the embedding service and the chat provider.
    pub api_key: Option<SecretString>,
    pub chat_base_url: Option<String>,
    pub chat_model: String,
    pub chat_timeout: Duration,
    /// Used when the request carries no usable temperature. Always within [0, 1].
    pub default_temperature: f32,
    pub mock_mode: MockMode,
    /// Number of ranked tools rendered into the prompt in `rag.v2` mode.
    pub top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 30,
            registry_path: PathBuf::from("assets/tools/registry.json"),
            vectors_path: PathBuf::from("assets/tools/tool_vectors.json"),
            embeddings_provider: EmbeddingsProviderKind::Local,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            embeddings_url: None,
            embeddings_model: DEFAULT_EMBEDDINGS_MODEL.to_string(),
            embeddings_timeout: Duration::from_millis(DEFAULT_EMBEDDINGS_TIMEOUT_MS),
            api_key: None,
            chat_base_url: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            chat_timeout: Duration::from_millis(DEFAULT_CHAT_TIMEOUT_MS),
            default_temperature: DEFAULT_TEMPERATURE,
            mock_mode: MockMode::Off,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// - `A2ACTION_EMBEDDINGS_PROVIDER`: `toy`/`local` (default) or `dashscope`/`remote`
    /// - `A2ACTION_MOCK_MODE`: `router`/`local` for the keyword planner, `1`/`true` for a canned reply
    /// - `A2ACTION_API_KEY` falls back to `DASHSCOPE_API_KEY`
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let api_key = non_empty_var("A2ACTION_API_KEY")
            .or_else(|| non_empty_var("DASHSCOPE_API_KEY"))
            .map(SecretString::from);

        let embedding_dim = env::var("A2ACTION_EMBEDDING_DIM")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&dim| dim > 0)
            .unwrap_or(DEFAULT_EMBEDDING_DIM);

        let chat_timeout_ms = env::var("A2ACTION_CHAT_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&ms| ms > 0)
            .unwrap_or(DEFAULT_CHAT_TIMEOUT_MS);

        let default_temperature = env::var("A2ACTION_CHAT_TEMPERATURE")
            .ok()
            .and_then(|s| s.trim().parse::<f32>().ok())
            .filter(|t| t.is_finite())
            .map(|t| t.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_TEMPERATURE);

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            registry_path: env::var("A2ACTION_REGISTRY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.registry_path),
            vectors_path: env::var("A2ACTION_VECTORS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.vectors_path),
            embeddings_provider: EmbeddingsProviderKind::parse(
                &env::var("A2ACTION_EMBEDDINGS_PROVIDER").unwrap_or_default(),
            ),
            embedding_dim,
            embeddings_url: non_empty_var("A2ACTION_EMBEDDINGS_URL").map(|u| strip_trailing_slashes(&u)),
            embeddings_model: non_empty_var("A2ACTION_EMBEDDINGS_MODEL")
                .unwrap_or(defaults.embeddings_model),
            embeddings_timeout: Duration::from_millis(
                env::var("A2ACTION_EMBEDDINGS_TIMEOUT_MS")
                    .unwrap_or_else(|_| DEFAULT_EMBEDDINGS_TIMEOUT_MS.to_string())
                    .parse()?,
            ),
            api_key,
            chat_base_url: non_empty_var("A2ACTION_CHAT_BASE_URL").map(|u| strip_trailing_slashes(&u)),
            chat_model: non_empty_var("A2ACTION_CHAT_MODEL").unwrap_or(defaults.chat_model),
            chat_timeout: Duration::from_millis(chat_timeout_ms),
            default_temperature,
            mock_mode: MockMode::parse(&env::var("A2ACTION_MOCK_MODE").unwrap_or_default()),
            top_k: env::var("A2ACTION_TOP_K")
                .unwrap_or_else(|_| DEFAULT_TOP_K.to_string())
                .parse()?,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn strip_trailing_slashes(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embeddings_provider_parse() {
        assert_eq!(EmbeddingsProviderKind::parse("toy"), EmbeddingsProviderKind::Local);
        assert_eq!(EmbeddingsProviderKind::parse(""), EmbeddingsProviderKind::Local);
        assert_eq!(
            EmbeddingsProviderKind::parse(" DashScope "),
            EmbeddingsProviderKind::Remote
        );
    }

    #[test]
    fn test_mock_mode_parse() {
        assert_eq!(MockMode::parse("router"), MockMode::Router);
        assert_eq!(MockMode::parse("LOCAL"), MockMode::Router);
        assert_eq!(MockMode::parse("true"), MockMode::Static);
        assert_eq!(MockMode::parse("1"), MockMode::Static);
        assert_eq!(MockMode::parse("no"), MockMode::Off);
    }

    #[test]
    fn test_rag_mode_parse_is_exact() {
        assert_eq!(RagMode::parse("rag.v2"), Some(RagMode::Rag));
        assert_eq!(RagMode::parse("legacy.v1"), Some(RagMode::Legacy));
        assert_eq!(RagMode::parse("RAG.V2"), None);
    }

    #[test]
    fn test_strip_trailing_slashes() {
        assert_eq!(
            strip_trailing_slashes("https://example.com/v1//"),
            "https://example.com/v1"
        );
    }
}

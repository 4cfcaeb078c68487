use serde::Deserialize;
use std::path::Path;

use crate::completion::openai::DEFAULT_BASE_URL as DEFAULT_COMPLETION_URL;
use crate::embedding::huggingface::DEFAULT_BASE_URL as DEFAULT_EMBEDDING_URL;
use crate::prompt::{CONTEXT_PLACEHOLDER, DEFAULT_SYSTEM_TEMPLATE};
use crate::selector::ModelCategory;
use crate::vector_store::pinecone::CONTROL_PLANE_URL;
use crate::vector_store::utils::INDEX_DIMENSIONS;

pub const DEFAULT_CONFIG_PATH: &str = "support.toml";

// ──────────────────────────── TOML structure ────────────────────────────

#[derive(Debug, Deserialize, Clone)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default = "default_models")]
    pub models: Vec<ModelCategory>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            service: ServiceConfig::default(),
            embedding: EmbeddingConfig::default(),
            completion: CompletionConfig::default(),
            vector_store: VectorStoreConfig::default(),
            prompt: PromptConfig::default(),
            models: default_models(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
        }
    }
}

fn default_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_url")]
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            base_url: default_embedding_url(),
        }
    }
}

fn default_embedding_model() -> String {
    "sentence-transformers/paraphrase-multilingual-mpnet-base-v2".to_string()
}
fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub base_url: String,
    #[serde(default)]
    pub referer: Option<String>,
    #[serde(default = "default_title")]
    pub title: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_url(),
            referer: None,
            title: default_title(),
        }
    }
}

fn default_completion_url() -> String {
    DEFAULT_COMPLETION_URL.to_string()
}
fn default_title() -> Option<String> {
    Some("Support Chat".to_string())
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default = "default_index_name")]
    pub index_name: String,
    /// Data-plane host; resolved from the control plane when absent.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            index_name: default_index_name(),
            host: None,
            control_plane_url: default_control_plane_url(),
            dimensions: default_dimensions(),
            top_k: default_top_k(),
        }
    }
}

fn default_index_name() -> String {
    "support-docs".to_string()
}
fn default_control_plane_url() -> String {
    CONTROL_PLANE_URL.to_string()
}
fn default_dimensions() -> usize {
    INDEX_DIMENSIONS
}
fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_system_template")]
    pub system_template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_template: default_system_template(),
        }
    }
}

fn default_system_template() -> String {
    DEFAULT_SYSTEM_TEMPLATE.to_string()
}

fn default_models() -> Vec<ModelCategory> {
    vec![
        ModelCategory::new(
            "meta-llama/llama-3.1-8b-instruct:free",
            "general support, platform information, interview preparation",
        ),
        ModelCategory::new(
            "openchat/openchat-7b:free",
            "coding, programming, technical questions, algorithms, data structures",
        ),
        ModelCategory::new(
            "gryphe/mythomist-7b:free",
            "creative writing, storytelling, role-playing scenarios, hypothetical situations",
        ),
    ]
}

// ──────────────────────────── Resolved Settings ────────────────────────────

/// Flat settings structure resolved from TOML + environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    // API
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Embedding
    pub embedding_model: String,
    pub embedding_base_url: String,
    pub huggingface_api_key: String,

    // Completion
    pub completion_base_url: String,
    pub completion_referer: Option<String>,
    pub completion_title: Option<String>,
    pub openrouter_api_key: String,

    // Vector store
    pub pinecone_api_key: String,
    pub index_name: String,
    pub index_host: Option<String>,
    pub control_plane_url: String,
    pub vector_dimensions: usize,
    pub top_k: usize,

    // Routing and prompt
    pub model_categories: Vec<ModelCategory>,
    pub system_template: String,
}

/// Load `.env.local` then `.env` if present; already-set variables win.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
}

/// Load settings from a given TOML path and the process environment.
pub fn load_settings_from_path(path: impl AsRef<Path>) -> anyhow::Result<Settings> {
    load_settings_from_path_with(path, |key: &str| std::env::var(key).ok())
}

/// Load settings from a given TOML path, reading secrets through `env`. Useful for testing.
pub fn load_settings_from_path_with(
    path: impl AsRef<Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let config: TomlConfig = toml::from_str(&content)?;
    resolve_settings(config, env)
}

/// Load settings from an explicit path, or from `support.toml` if present,
/// falling back to built-in defaults.
pub fn load_settings(path: Option<&str>) -> anyhow::Result<Settings> {
    match path {
        Some(path) => load_settings_from_path(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_settings_from_path(DEFAULT_CONFIG_PATH)
        }
        None => resolve_settings(TomlConfig::default(), |key: &str| std::env::var(key).ok()),
    }
}

fn required(env: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    env(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{key} environment variable is required"))
}

/// Merge parsed TOML with secrets looked up through `env`, and validate.
pub fn resolve_settings(
    config: TomlConfig,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let huggingface_api_key = required(&env, "HUGGINGFACE_API_KEY")?;
    let openrouter_api_key = required(&env, "OPENROUTER_API_KEY")?;
    let pinecone_api_key = required(&env, "PINECONE_API_KEY")?;
    let index_name = env("PINECONE_INDEX")
        .filter(|v| !v.is_empty())
        .unwrap_or(config.vector_store.index_name);

    if config.models.is_empty() {
        anyhow::bail!("At least one [[models]] entry is required");
    }
    if config.vector_store.dimensions == 0 {
        anyhow::bail!("vector_store.dimensions must be positive");
    }
    if !config.prompt.system_template.contains(CONTEXT_PLACEHOLDER) {
        anyhow::bail!("prompt.system_template must contain {CONTEXT_PLACEHOLDER}");
    }

    Ok(Settings {
        host: config.api.host,
        port: config.api.port,
        environment: config.service.environment,
        embedding_model: config.embedding.model,
        embedding_base_url: config.embedding.base_url,
        huggingface_api_key,
        completion_base_url: config.completion.base_url,
        completion_referer: config.completion.referer,
        completion_title: config.completion.title,
        openrouter_api_key,
        pinecone_api_key,
        index_name,
        index_host: config.vector_store.host,
        control_plane_url: config.vector_store.control_plane_url,
        vector_dimensions: config.vector_store.dimensions,
        top_k: config.vector_store.top_k,
        model_categories: config.models,
        system_template: config.prompt.system_template,
    })
}

use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::AppState;
use crate::llm::{OpenAiCompatibleClient, SYSTEM_PROMPT};
use crate::retrieval::{HttpRetriever, RetrievalAugmenter};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub llm: LlmConfig,
    pub retrieval: Option<RetrievalConfig>,
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_documents: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        Self::from_lookup(|key: &str| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Box<dyn Error>> {
        let api_key = lookup("LLM_API_KEY")
            .or_else(|| lookup("SILICONFLOW_API_KEY"))
            .filter(|key| !key.trim().is_empty())
            .ok_or("LLM_API_KEY (or SILICONFLOW_API_KEY) must be set")?;

        let retrieval = match lookup("RETRIEVAL_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => Some(RetrievalConfig {
                url,
                timeout: Duration::from_secs(parse_or(&lookup, "RETRIEVAL_TIMEOUT_SECS", 5)?),
                max_documents: parse_or(&lookup, "RETRIEVAL_MAX_DOCUMENTS", 5)?,
            }),
            None => None,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3000)?,
            llm: LlmConfig {
                api_key,
                base_url: lookup("LLM_BASE_URL")
                    .unwrap_or_else(|| "https://api.siliconflow.cn/v1".to_string()),
                model: lookup("LLM_MODEL")
                    .unwrap_or_else(|| "Pro/deepseek-ai/DeepSeek-R1".to_string()),
                temperature: parse_or(&lookup, "LLM_TEMPERATURE", 0.7)?,
                max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", 1000)?,
            },
            retrieval,
            idle_timeout: Duration::from_secs(parse_or(&lookup, "UPSTREAM_IDLE_TIMEOUT_SECS", 60)?),
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, Box<dyn Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| format!("invalid {}={:?}: {}", key, raw, e).into()),
        None => Ok(default),
    }
}

pub async fn app_init() -> Result<(Config, Arc<AppState>), Box<dyn Error>> {
    let config = Config::from_env()?;
    log::info!("✅ Configuration loaded");

    let state = build_state(&config)?;
    log::info!("✅ Application state initialized");

    Ok((config, Arc::new(state)))
}

// ============================================================================
// Setup Functions
// ============================================================================

pub fn build_state(config: &Config) -> Result<AppState, Box<dyn Error>> {
    let llm = Arc::new(OpenAiCompatibleClient::new(config.llm.clone()));

    let augmenter = match &config.retrieval {
        Some(retrieval) => {
            log::info!("📚 Retrieval enabled: {}", retrieval.url);
            let retriever = Arc::new(HttpRetriever::new(retrieval)?);
            Some(RetrievalAugmenter::new(
                retriever,
                retrieval.max_documents,
                retrieval.timeout,
            ))
        }
        None => {
            log::info!("📚 RETRIEVAL_URL not set, answering without reference material");
            None
        }
    };

    Ok(AppState {
        llm,
        augmenter,
        system_prompt: SYSTEM_PROMPT.to_string(),
        idle_timeout: config.idle_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("LLM_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.llm.base_url, "https://api.siliconflow.cn/v1");
        assert_eq!(config.llm.model, "Pro/deepseek-ai/DeepSeek-R1");
        assert_eq!(config.llm.max_tokens, 1000);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.retrieval.is_none());
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_legacy_key_and_retrieval() {
        let config = Config::from_lookup(lookup(&[
            ("SILICONFLOW_API_KEY", "sk-legacy"),
            ("RETRIEVAL_URL", "http://localhost:8000/retrieve"),
            ("RETRIEVAL_TIMEOUT_SECS", "2"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.llm.api_key, "sk-legacy");
        assert_eq!(config.port, 8080);

        let retrieval = config.retrieval.unwrap();
        assert_eq!(retrieval.url, "http://localhost:8000/retrieve");
        assert_eq!(retrieval.timeout, Duration::from_secs(2));
        assert_eq!(retrieval.max_documents, 5);
    }

    #[test]
    fn test_missing_key_and_bad_numbers() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("LLM_API_KEY", "  ")])).is_err());

        let err = Config::from_lookup(lookup(&[("LLM_API_KEY", "sk"), ("PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_build_state_wires_augmenter() {
        let config = Config::from_lookup(lookup(&[
            ("LLM_API_KEY", "sk"),
            ("RETRIEVAL_URL", "http://localhost:8000/retrieve"),
            ("UPSTREAM_IDLE_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        let state = build_state(&config).unwrap();
        assert!(state.augmenter.is_some());
        assert_eq!(state.system_prompt, SYSTEM_PROMPT);
        assert_eq!(state.idle_timeout, Duration::from_secs(5));
    }
}

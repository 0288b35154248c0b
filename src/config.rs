use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ScanError;
use crate::services::estimator::NutritionStrategy;

pub const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// What the recognizer does when the model path fails at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Surface the typed error.
    Strict,
    /// Return a clearly labeled offline example meal.
    DegradeToOffline,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(FallbackPolicy::Strict),
            "degrade-to-offline" | "degrade" | "offline" => Ok(FallbackPolicy::DegradeToOffline),
            other => Err(format!("unknown fallback policy '{}'", other)),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FallbackPolicy::Strict => "strict",
            FallbackPolicy::DegradeToOffline => "degrade-to-offline",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for NutritionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "model" => Ok(NutritionStrategy::Model),
            "offline" | "table" => Ok(NutritionStrategy::Offline),
            other => Err(format!("unknown nutrition strategy '{}'", other)),
        }
    }
}

/// Which canned meal set backs the offline fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineFallbackKind {
    /// Random pick among the example meals
    Examples,
    /// Always the single "Mixed Meal"
    Basic,
}

impl FromStr for OfflineFallbackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "examples" => Ok(OfflineFallbackKind::Examples),
            "basic" => Ok(OfflineFallbackKind::Basic),
            other => Err(format!("unknown offline fallback '{}'", other)),
        }
    }
}

#[derive(Clone)]
pub struct InferenceSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl fmt::Debug for InferenceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub inference: InferenceSettings,
    pub fallback_policy: FallbackPolicy,
    pub nutrition_strategy: NutritionStrategy,
    pub offline_fallback: OfflineFallbackKind,
    pub bind_addr: String,
}

impl Config {
    /// Reads the process environment (call `dotenv()` first to pick up `.env`).
    pub fn from_env() -> Result<Self, ScanError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScanError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("OPENROUTER_API_KEY");
        if api_key.is_none() {
            log::warn!("⚠️ OPENROUTER_API_KEY not set, meal recognition requests will be rejected");
        }

        let model = match lookup("OPENROUTER_MODEL") {
            None => DEFAULT_MODEL.to_string(),
            Some(model) if model.trim().is_empty() => {
                return Err(ScanError::Configuration("OPENROUTER_MODEL is set but empty".to_string()))
            }
            Some(model) => model.trim().to_string(),
        };

        let timeout_secs: u64 = parse_var(&get, "INFERENCE_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            return Err(ScanError::Configuration("INFERENCE_TIMEOUT_SECS must be positive".to_string()));
        }

        Ok(Self {
            inference: InferenceSettings {
                api_key,
                model,
                base_url: get("OPENROUTER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
                max_retries: parse_var(&get, "INFERENCE_MAX_RETRIES", 1)?,
            },
            fallback_policy: parse_var(&get, "FALLBACK_POLICY", FallbackPolicy::DegradeToOffline)?,
            nutrition_strategy: parse_var(&get, "NUTRITION_STRATEGY", NutritionStrategy::Model)?,
            offline_fallback: parse_var(&get, "OFFLINE_FALLBACK", OfflineFallbackKind::Examples)?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T, ScanError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| ScanError::Configuration(format!("invalid {} '{}': {}", key, raw, e))),
    }
}

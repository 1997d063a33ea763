use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 設定読み込みエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// 参照写真付き編集のバックエンド選択
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditBackend {
    /// 1回のマルチモーダル呼び出し（画像インライン入出力）
    Multimodal,
    /// 顔の特徴を文章化してから text-to-image
    Describe,
    /// 外部リレーサービス（アップロード → 生成 → 取得）
    Relay,
}

impl FromStr for EditBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multimodal" => Ok(Self::Multimodal),
            "describe" | "describe_then_generate" => Ok(Self::Describe),
            "relay" => Ok(Self::Relay),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_base: String,
    pub image_model: String,
    pub completion_model: String,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub api_base: String,
    pub image_model: String,
    pub vision_model: String,
}

/// リレー生成の本人性保持パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelayTuning {
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub id_weight: f32,
}

impl Default for RelayTuning {
    fn default() -> Self {
        Self {
            num_inference_steps: 20,
            guidance_scale: 4.0,
            id_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub upload_url: String,
    pub generate_url: String,
    pub tuning: RelayTuning,
}

/// プロバイダ設定（起動時に一度だけ読み込み、以後は読み取り専用）
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai: OpenAiConfig,
    pub gemini: Option<GeminiConfig>,
    pub relay: Option<RelayConfig>,
    /// 出力解像度（例: "1024x1024"）
    pub image_size: String,
    /// 品質ティア（low / medium / high / auto）
    pub image_quality: String,
    pub enhance_prompts: bool,
    pub enhancer_max_tokens: u32,
    pub target_language: String,
    pub completion_timeout: Duration,
    pub generation_timeout: Duration,
    pub upload_timeout: Duration,
}

/// ボット全体の設定
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub telegram_token: String,
    pub max_prompt_length: usize,
    pub edit_backend: EditBackend,
    pub poll_timeout_secs: u64,
    pub provider: ProviderConfig,
}

impl BotSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の変数ルックアップから設定を組み立てる
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let edit_backend = {
            let raw = env.required("EDIT_BACKEND")?;
            raw.parse::<EditBackend>().map_err(|_| ConfigError::Invalid {
                name: "EDIT_BACKEND",
                value: raw,
            })?
        };

        let openai = OpenAiConfig {
            api_key: env.required("OPENAI_API_KEY")?,
            api_base: env.base_url("OPENAI_API_BASE", "https://api.openai.com/v1"),
            image_model: env.string("IMAGE_MODEL", "gpt-image-1"),
            completion_model: env.string("COMPLETION_MODEL", "gpt-4o-mini"),
        };

        let gemini = match env.optional("GEMINI_API_KEY") {
            Some(api_key) => Some(GeminiConfig {
                api_key,
                api_base: env.base_url(
                    "GEMINI_API_BASE",
                    "https://generativelanguage.googleapis.com/v1beta",
                ),
                image_model: env.string("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
                vision_model: env.string("GEMINI_VISION_MODEL", "gemini-2.5-flash"),
            }),
            None => None,
        };
        if matches!(edit_backend, EditBackend::Multimodal | EditBackend::Describe)
            && gemini.is_none()
        {
            return Err(ConfigError::Missing("GEMINI_API_KEY"));
        }

        let relay = if edit_backend == EditBackend::Relay {
            let defaults = RelayTuning::default();
            Some(RelayConfig {
                api_key: env.required("RELAY_API_KEY")?,
                upload_url: env.required("RELAY_UPLOAD_URL")?,
                generate_url: env.required("RELAY_GENERATE_URL")?,
                tuning: RelayTuning {
                    num_inference_steps: env.parsed("RELAY_STEPS", defaults.num_inference_steps)?,
                    guidance_scale: env.parsed("RELAY_GUIDANCE_SCALE", defaults.guidance_scale)?,
                    id_weight: env.parsed("RELAY_ID_WEIGHT", defaults.id_weight)?,
                },
            })
        } else {
            None
        };

        let image_quality = env.string("IMAGE_QUALITY", "medium").to_ascii_lowercase();
        if !matches!(image_quality.as_str(), "low" | "medium" | "high" | "auto") {
            return Err(ConfigError::Invalid {
                name: "IMAGE_QUALITY",
                value: image_quality,
            });
        }

        let image_size = env.string("IMAGE_SIZE", "1024x1024");
        if parse_dims(&image_size).is_none() {
            return Err(ConfigError::Invalid {
                name: "IMAGE_SIZE",
                value: image_size,
            });
        }

        let max_prompt_length: usize = env.parsed("MAX_PROMPT_LENGTH", 1000)?;
        if max_prompt_length == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_PROMPT_LENGTH",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            telegram_token: env.required("TELEGRAM_BOT_TOKEN")?,
            max_prompt_length,
            edit_backend,
            poll_timeout_secs: env.parsed("POLL_TIMEOUT_SECS", 30)?,
            provider: ProviderConfig {
                openai,
                gemini,
                relay,
                image_size,
                image_quality,
                enhance_prompts: env.parsed_bool("ENHANCE_PROMPTS", true)?,
                enhancer_max_tokens: env.parsed("ENHANCER_MAX_TOKENS", 300)?,
                target_language: env.string("TARGET_LANGUAGE", "English"),
                completion_timeout: Duration::from_secs(env.parsed("COMPLETION_TIMEOUT_SECS", 30)?),
                generation_timeout: Duration::from_secs(env.parsed("GENERATION_TIMEOUT_SECS", 120)?),
                upload_timeout: Duration::from_secs(env.parsed("UPLOAD_TIMEOUT_SECS", 60)?),
            },
        })
    }
}

/// "1024x1024" 形式を (幅, 高さ) に分解する
pub fn parse_dims(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.trim().to_ascii_lowercase().split_once('x').map(|(w, h)| {
        (w.trim().parse::<u32>(), h.trim().parse::<u32>())
    })?;
    match (w, h) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn base_url(&self, name: &str, default: &str) -> String {
        self.string(name, default).trim_end_matches('/').to_string()
    }

    fn parsed<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            Some(value) => value
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        }
    }

    fn parsed_bool(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(name) {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid { name, value }),
            },
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<BotSettings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotSettings::from_lookup(|name| map.get(name).cloned())
    }

    const BASE: &[(&str, &str)] = &[
        ("TELEGRAM_BOT_TOKEN", "tg"),
        ("OPENAI_API_KEY", "sk-test"),
        ("GEMINI_API_KEY", "gm-test"),
        ("EDIT_BACKEND", "multimodal"),
    ];

    #[test]
    fn test_defaults() {
        let s = load(BASE).unwrap();
        assert_eq!(s.edit_backend, EditBackend::Multimodal);
        assert_eq!(s.max_prompt_length, 1000);
        assert_eq!(s.provider.image_size, "1024x1024");
        assert_eq!(s.provider.image_quality, "medium");
        assert_eq!(s.provider.openai.image_model, "gpt-image-1");
        assert!(s.provider.enhance_prompts);
        assert_eq!(s.provider.generation_timeout, Duration::from_secs(120));
        assert!(s.provider.relay.is_none());
    }

    #[test]
    fn test_edit_backend_has_no_default() {
        let vars: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != "EDIT_BACKEND").collect();
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("EDIT_BACKEND"));
    }

    #[test]
    fn test_unknown_edit_backend() {
        let mut vars = BASE.to_vec();
        vars.retain(|(k, _)| *k != "EDIT_BACKEND");
        vars.push(("EDIT_BACKEND", "magic"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: "EDIT_BACKEND", .. })
        ));
    }

    #[test]
    fn test_gemini_required_for_multimodal() {
        let vars: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != "GEMINI_API_KEY").collect();
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("GEMINI_API_KEY"));
    }

    #[test]
    fn test_relay_backend_requires_relay_settings() {
        let vars = [
            ("TELEGRAM_BOT_TOKEN", "tg"),
            ("OPENAI_API_KEY", "sk-test"),
            ("EDIT_BACKEND", "relay"),
        ];
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("RELAY_API_KEY"));

        let vars = [
            ("TELEGRAM_BOT_TOKEN", "tg"),
            ("OPENAI_API_KEY", "sk-test"),
            ("EDIT_BACKEND", "relay"),
            ("RELAY_API_KEY", "rk"),
            ("RELAY_UPLOAD_URL", "https://relay.example/upload"),
            ("RELAY_GENERATE_URL", "https://relay.example/generate"),
            ("RELAY_ID_WEIGHT", "0.8"),
        ];
        let s = load(&vars).unwrap();
        let relay = s.provider.relay.unwrap();
        assert_eq!(relay.tuning.num_inference_steps, 20);
        assert!((relay.tuning.id_weight - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        let mut vars = BASE.to_vec();
        vars.push(("MAX_PROMPT_LENGTH", "lots"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: "MAX_PROMPT_LENGTH", .. })
        ));
    }

    #[test]
    fn test_invalid_quality_and_size() {
        let mut vars = BASE.to_vec();
        vars.push(("IMAGE_QUALITY", "ultra"));
        assert!(load(&vars).is_err());

        let mut vars = BASE.to_vec();
        vars.push(("IMAGE_SIZE", "big"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let mut vars = BASE.to_vec();
        vars.push(("OPENAI_API_BASE", "http://localhost:8080/v1/"));
        let s = load(&vars).unwrap();
        assert_eq!(s.provider.openai.api_base, "http://localhost:8080/v1");
    }

    #[test]
    fn test_parse_dims() {
        assert_eq!(parse_dims("1024x1536"), Some((1024, 1536)));
        assert_eq!(parse_dims("0x10"), None);
        assert_eq!(parse_dims("square"), None);
    }
}

// 配置读取：YAML 文件 + 环境变量占位符展开，缺失时回退默认值。
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use regex::{Captures, Regex};
use serde_yaml::Value;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, warn};

pub const CONFIG_PATH_ENV: &str = "DOCTEXT_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/doctext.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractorConfig {
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub container: ContainerConfig,
    #[serde(default)]
    pub xml: XmlConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
    #[serde(default)]
    pub plain_text: PlainTextConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Upper bound for one async extraction; `0` disables the timeout.
    pub timeout_s: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { timeout_s: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub max_member_bytes: u64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_member_bytes: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MalformedXmlPolicy {
    #[default]
    Fallback,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct XmlConfig {
    #[serde(default)]
    pub on_malformed: MalformedXmlPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlideOrder {
    #[default]
    Lexicographic,
    Numeric,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PresentationConfig {
    #[serde(default)]
    pub slide_order: SlideOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvalidUtf8Policy {
    #[default]
    Replace,
    Fail,
    Latin1,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlainTextConfig {
    #[serde(default)]
    pub on_invalid_utf8: InvalidUtf8Policy,
}

/// Lenient loader: a missing or invalid file falls back to defaults with a warning.
pub fn load_config() -> ExtractorConfig {
    let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            // 配置文件允许不存在，直接使用默认配置。
            warn!("read config failed: {path}, {err}");
            return ExtractorConfig::default();
        }
    };
    parse_config(&content).unwrap_or_else(|err| {
        warn!("config {path} rejected, using defaults: {err:#}");
        ExtractorConfig::default()
    })
}

/// Strict variant for explicitly requested files: missing or invalid files are errors.
pub fn load_config_from(path: &Path) -> Result<ExtractorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("read config failed: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config: {}", path.display()))
}

fn parse_config(content: &str) -> Result<ExtractorConfig> {
    let mut value: Value = serde_yaml::from_str(content).context("parse yaml failed")?;
    if value.is_null() {
        return Ok(ExtractorConfig::default());
    }
    expand_yaml_env(&mut value);
    serde_yaml::from_value(value).context("config values do not match the schema")
}

fn expand_yaml_env(value: &mut Value) {
    match value {
        Value::String(text) => {
            if text.contains("${") {
                *text = expand_env_placeholders(text);
            }
        }
        Value::Sequence(items) => items.iter_mut().for_each(expand_yaml_env),
        Value::Mapping(map) => map.iter_mut().for_each(|(_, item)| expand_yaml_env(item)),
        Value::Tagged(tagged) => expand_yaml_env(&mut tagged.value),
        _ => {}
    }
}

/// Expands `${VAR}` and `${VAR:-default}`; an unset or empty variable yields the
/// default, or nothing. Unterminated or nameless placeholders stay verbatim.
fn expand_env_placeholders(input: &str) -> String {
    let Some(pattern) = placeholder_regex() else {
        return input.to_string();
    };
    pattern
        .replace_all(input, |captures: &Captures| {
            let name = captures[1].trim();
            if name.is_empty() {
                return captures[0].to_string();
            }
            env::var(name)
                .ok()
                .filter(|value| !value.is_empty())
                .or_else(|| captures.get(2).map(|default| default.as_str().to_string()))
                .unwrap_or_default()
        })
        .into_owned()
}

fn placeholder_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| match Regex::new(r"\$\{([^}:]*)(?::-([^}]*))?\}") {
            Ok(regex) => Some(regex),
            Err(err) => {
                error!("invalid config placeholder regex: {err}");
                None
            }
        })
        .as_ref()
}

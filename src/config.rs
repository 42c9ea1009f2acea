use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 可选的模型列表
pub const SUPPORTED_MODELS: &[&str] = &["llama-3.1-8b-instant", "llama-3.3-70b-versatile"];

/// 默认扣分
pub const DEFAULT_PENALTY: i64 = -1;

/// 默认配置文件名（存在时自动加载）
pub const DEFAULT_CONFIG_FILE: &str = "grader.toml";

/// 权重之和允许的误差
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 评分规则 ---
    pub weight_content: f64,
    pub weight_organization: f64,
    pub weight_conventions: f64,
    pub penalty: i64,
    pub guardrail_enabled: bool,
    // --- 输入输出 ---
    /// 待评分的作文表格
    pub input_file: String,
    /// 评分结果表格
    pub output_file: String,
    pub id_column: String,
    pub text_column: String,
    pub delimiter: char,
    /// 评分失败的作文记录
    pub failure_log_file: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.groq.com/openai/v1".to_string(),
            llm_model_name: SUPPORTED_MODELS[0].to_string(),
            request_timeout_secs: 60,
            weight_content: 0.4,
            weight_organization: 0.3,
            weight_conventions: 0.3,
            penalty: DEFAULT_PENALTY,
            guardrail_enabled: true,
            input_file: "essays.csv".to_string(),
            output_file: "graded_essays.csv".to_string(),
            id_column: "essay_id".to_string(),
            text_column: "full_text".to_string(),
            delimiter: ',',
            failure_log_file: "failed_essays.txt".to_string(),
            output_log_file: "grading_log.txt".to_string(),
            verbose_logging: false,
        }
    }
}

/// TOML 配置文件，所有字段可选，缺省时沿用默认值
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    llm_api_key: Option<String>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
    request_timeout_secs: Option<u64>,
    weight_content: Option<f64>,
    weight_organization: Option<f64>,
    weight_conventions: Option<f64>,
    penalty: Option<i64>,
    guardrail_enabled: Option<bool>,
    input_file: Option<String>,
    output_file: Option<String>,
    id_column: Option<String>,
    text_column: Option<String>,
    delimiter: Option<char>,
    failure_log_file: Option<String>,
    output_log_file: Option<String>,
    verbose_logging: Option<bool>,
}

impl Config {
    /// 加载配置：默认值 → TOML 文件 → 环境变量
    ///
    /// TOML 文件路径取自 `GRADER_CONFIG`，未设置时若当前目录存在 `grader.toml` 则加载它。
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        let file_path = std::env::var("GRADER_CONFIG").ok().or_else(|| {
            Path::new(DEFAULT_CONFIG_FILE)
                .exists()
                .then(|| DEFAULT_CONFIG_FILE.to_string())
        });
        if let Some(path) = file_path {
            config.apply_file(read_file_config(Path::new(&path))?);
        }

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 只从环境变量加载（忽略配置文件）
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从指定的 TOML 文件加载
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let mut config = Self::default();
        config.apply_file(read_file_config(path)?);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = file.$field { self.$field = v; })*
            };
        }
        take!(
            llm_api_key,
            llm_api_base_url,
            llm_model_name,
            request_timeout_secs,
            weight_content,
            weight_organization,
            weight_conventions,
            penalty,
            guardrail_enabled,
            input_file,
            output_file,
            id_column,
            text_column,
            delimiter,
            failure_log_file,
            output_log_file,
            verbose_logging,
        );
    }

    /// 用环境变量覆盖配置
    ///
    /// `lookup` 通常是 `std::env::var`，测试中可替换为内存表。
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GROQ_API_KEY") {
            self.llm_api_key = v;
        }
        if let Some(v) = lookup("LLM_API_BASE_URL") {
            self.llm_api_base_url = v;
        }
        if let Some(v) = lookup("LLM_MODEL_NAME") {
            self.llm_model_name = v;
        }
        if let Some(v) = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", "u64")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "WEIGHT_CONTENT", "f64")? {
            self.weight_content = v;
        }
        if let Some(v) = parse_var(&lookup, "WEIGHT_ORGANIZATION", "f64")? {
            self.weight_organization = v;
        }
        if let Some(v) = parse_var(&lookup, "WEIGHT_CONVENTIONS", "f64")? {
            self.weight_conventions = v;
        }
        if let Some(v) = parse_var(&lookup, "GRADE_PENALTY", "i64")? {
            self.penalty = v;
        }
        if let Some(v) = parse_var(&lookup, "GUARDRAIL_ENABLED", "bool")? {
            self.guardrail_enabled = v;
        }
        if let Some(v) = lookup("INPUT_FILE") {
            self.input_file = v;
        }
        if let Some(v) = lookup("OUTPUT_FILE") {
            self.output_file = v;
        }
        if let Some(v) = lookup("ID_COLUMN") {
            self.id_column = v;
        }
        if let Some(v) = lookup("TEXT_COLUMN") {
            self.text_column = v;
        }
        if let Some(v) = parse_var(&lookup, "DELIMITER", "char")? {
            self.delimiter = v;
        }
        if let Some(v) = lookup("FAILURE_LOG_FILE") {
            self.failure_log_file = v;
        }
        if let Some(v) = lookup("OUTPUT_LOG_FILE") {
            self.output_log_file = v;
        }
        if let Some(v) = parse_var(&lookup, "VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        Ok(())
    }

    /// 校验配置
    ///
    /// 权重之和不为 1.0 不算错误，只由 [`Weights::is_balanced`] 给出提示。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_MODELS.contains(&self.llm_model_name.as_str()) {
            return Err(ConfigError::UnsupportedModel {
                model: self.llm_model_name.clone(),
                supported: SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect(),
            });
        }

        for (name, value) in [
            ("content", self.weight_content),
            ("organization", self.weight_organization),
            ("conventions", self.weight_conventions),
        ] {
            if value < 0.0 || value.is_nan() {
                return Err(ConfigError::NegativeWeight {
                    name: name.to_string(),
                    value,
                });
            }
        }

        if !self.delimiter.is_ascii() {
            return Err(ConfigError::InvalidDelimiter {
                value: self.delimiter.to_string(),
            });
        }

        Ok(())
    }

    /// 要求 API key 已配置
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "GROQ_API_KEY".to_string(),
            });
        }
        Ok(&self.llm_api_key)
    }

    /// 单次请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 分隔符字节（`validate` 已保证是 ASCII）
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    /// 生成本次批处理使用的评分配置
    pub fn grading_config(&self) -> GradingConfig {
        GradingConfig {
            model: self.llm_model_name.clone(),
            weights: Weights {
                content: self.weight_content,
                organization: self.weight_organization,
                conventions: self.weight_conventions,
            },
            penalty: self.penalty,
            guardrail_enabled: self.guardrail_enabled,
        }
    }
}

fn read_file_config(path: &Path) -> AppResult<FileConfig> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(FileError::NotFound { path: display }.into());
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| AppError::file_read_failed(&display, e))?;
    toml::from_str(&content).map_err(|e| {
        FileError::TomlParseFailed {
            path: display,
            source: Box::new(e),
        }
        .into()
    })
}

fn parse_var<T, F>(
    lookup: &F,
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var_name) else {
        return Ok(None);
    };

    // 制表符这类纯空白值不能 trim
    let raw = match value.trim() {
        "" => value.as_str(),
        trimmed => trimmed,
    };

    match raw.parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.clone(),
            expected_type: expected_type.to_string(),
        }),
    }
}

/// 三项评分标准的权重
///
/// 期望之和为 1.0，但评分时不做归一化。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub content: f64,
    pub organization: f64,
    pub conventions: f64,
}

impl Weights {
    pub fn sum(&self) -> f64 {
        self.content + self.organization + self.conventions
    }

    /// 权重之和是否为 1.0
    pub fn is_balanced(&self) -> bool {
        (self.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }
}

/// 一次批处理的评分配置，批处理期间不可变
#[derive(Debug, Clone, PartialEq)]
pub struct GradingConfig {
    pub model: String,
    pub weights: Weights,
    pub penalty: i64,
    pub guardrail_enabled: bool,
}

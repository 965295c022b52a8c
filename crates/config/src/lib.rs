//! 统一配置中心
//!
//! 分层加载：内置默认值 -> `ANONCHAT_CONFIG` 指定的文件（YAML/TOML）
//! -> `TELEGRAM_BOT_TOKEN` -> `ANONCHAT_*` 环境变量（`__` 分隔层级）。

use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "ANONCHAT_CONFIG";
/// 环境变量前缀
pub const ENV_PREFIX: &str = "ANONCHAT_";
/// 沿用的机器人令牌变量名
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// 全局应用配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub vip: VipConfig,
    #[serde(default)]
    pub restart: RestartConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Telegram Bot API 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_url: String,
    /// getUpdates 长轮询超时（秒）
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_url: "https://api.telegram.org".into(),
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

/// 会话行为配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// stop/next 是否需要二次确认
    pub confirm_destructive: bool,
    pub confirmation_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confirm_destructive: false,
            confirmation_ttl_secs: 60,
        }
    }
}

impl SessionConfig {
    pub fn confirmation_ttl(&self) -> Duration {
        Duration::from_secs(self.confirmation_ttl_secs)
    }
}

/// VIP 名单
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VipConfig {
    #[serde(default)]
    pub users: Vec<i64>,
}

/// 轮询循环崩溃后的重启退避
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartConfig {
    pub initial_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 5,
            max_delay_secs: 60,
        }
    }
}

impl RestartConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// 未设置 RUST_LOG 时使用的过滤规则
    pub filter: String,
    /// 日志文件路径，为空时只输出到控制台
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            file: Some("bot.log".into()),
        }
    }
}

impl AppConfig {
    /// 从进程环境加载并校验配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// 组装配置来源，后合并的来源优先
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                figment = figment.merge(Yaml::file(path));
            } else {
                figment = figment.merge(Toml::file(path));
            }
        }
        figment
            .merge(
                Env::raw()
                    .only(&[BOT_TOKEN_ENV])
                    .map(|_| "telegram.bot_token".into()),
            )
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::MissingBotToken);
        }
        if self.telegram.api_url.trim().is_empty() {
            return Err(ConfigError::InvalidTelegram(
                "api_url cannot be empty".to_string(),
            ));
        }
        if self.telegram.poll_timeout_secs == 0 {
            return Err(ConfigError::InvalidTelegram(
                "poll_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.session.confirmation_ttl_secs == 0 {
            return Err(ConfigError::InvalidSession(
                "confirmation_ttl_secs must be greater than 0".to_string(),
            ));
        }

        if self.restart.initial_delay_secs == 0 {
            return Err(ConfigError::InvalidRestart(
                "initial_delay_secs must be greater than 0".to_string(),
            ));
        }
        if self.restart.max_delay_secs < self.restart.initial_delay_secs {
            return Err(ConfigError::InvalidRestart(
                "max_delay_secs must not be less than initial_delay_secs".to_string(),
            ));
        }

        Ok(())
    }

    /// 用于日志输出的脱敏表示
    pub fn sanitize(&self) -> String {
        let mut redacted = self.clone();
        if !redacted.telegram.bot_token.is_empty() {
            redacted.telegram.bot_token = "[REDACTED]".into();
        }
        format!("{:?}", redacted)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Bot token is missing, set {BOT_TOKEN_ENV} or telegram.bot_token")]
    MissingBotToken,
    #[error("Invalid telegram configuration: {0}")]
    InvalidTelegram(String),
    #[error("Invalid session configuration: {0}")]
    InvalidSession(String),
    #[error("Invalid restart configuration: {0}")]
    InvalidRestart(String),
}

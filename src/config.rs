//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 核心配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 硬件设备配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// 解锁轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 解锁轮询超时（毫秒），0 表示无限等待
    pub poll_timeout_ms: u64,
    /// 单次会话枚举的索引批量
    pub enumeration_batch: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            poll_timeout_ms: 60_000,
            enumeration_batch: 5,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "text" 或 "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CoreConfig {
    /// 从 TOML 文件加载，环境变量 IRONFORGE_LOG_LEVEL 覆盖日志级别
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config {}", path.as_ref().display()))?;
        let mut config: CoreConfig =
            toml::from_str(&contents).context("failed to parse config file")?;

        if let Ok(level) = std::env::var("IRONFORGE_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// 配置有效性检查
    pub fn validate(&self) -> Result<()> {
        if self.device.poll_interval_ms == 0 {
            anyhow::bail!("device.poll_interval_ms must be > 0");
        }
        if self.device.enumeration_batch == 0 {
            anyhow::bail!("device.enumeration_batch must be > 0");
        }
        if self.logging.format != "text" && self.logging.format != "json" {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }
        Ok(())
    }
}

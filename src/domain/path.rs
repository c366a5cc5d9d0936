//! HD 派生路径处理
//!
//! 钱包记录中存储的是相对路径（如 `0'/0/2`，BIP44 的 account/change/index 段）。
//! 历史版本只存储了单个地址索引，需要兼容：单数字 `n` 重写为 `0'/0/n`。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 路径分量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathComponent {
    pub index: u32,
    pub hardened: bool,
}

impl fmt::Display for PathComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

/// HD 派生路径（相对形式，不含 `m/44'/coin'` 头）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdPath {
    components: Vec<PathComponent>,
}

impl HdPath {
    /// 解析相对路径，如 `0'/0/2`
    pub fn parse(path: &str) -> Result<Self, CoreError> {
        let trimmed = path.trim().trim_start_matches("m/");
        if trimmed.is_empty() {
            return Err(CoreError::InvalidPath {
                path: path.to_string(),
                reason: "empty path".to_string(),
            });
        }

        let mut components = Vec::new();
        for segment in trimmed.split('/') {
            let (raw, hardened) = match segment.strip_suffix('\'').or(segment.strip_suffix('h')) {
                Some(raw) => (raw, true),
                None => (segment, false),
            };
            let index: u32 = raw.parse().map_err(|_| CoreError::InvalidPath {
                path: path.to_string(),
                reason: format!("invalid segment '{}'", segment),
            })?;
            if index >= 0x8000_0000 {
                return Err(CoreError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("index {} out of range", index),
                });
            }
            components.push(PathComponent { index, hardened });
        }

        Ok(Self { components })
    }

    /// 历史格式兼容：存储值为单个数字索引 `n` 时，重写为 `0'/0/n`
    ///
    /// 新版本直接存储完整相对路径，原样解析。
    pub fn resolve_stored(stored: &str) -> Result<Self, CoreError> {
        let trimmed = stored.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            let index: u32 = trimmed.parse().map_err(|_| CoreError::InvalidPath {
                path: stored.to_string(),
                reason: "legacy index out of range".to_string(),
            })?;
            return Ok(Self {
                components: vec![
                    PathComponent {
                        index: 0,
                        hardened: true,
                    },
                    PathComponent {
                        index: 0,
                        hardened: false,
                    },
                    PathComponent {
                        index,
                        hardened: false,
                    },
                ],
            });
        }

        Self::parse(trimmed)
    }

    /// 拼接为完整绝对路径 `m/44'/{coin_type}'/...`
    pub fn to_absolute(&self, coin_type: u32) -> String {
        let rest: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        format!("m/44'/{}'/{}", coin_type, rest.join("/"))
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    /// 地址索引（最后一个分量）
    pub fn address_index(&self) -> Option<u32> {
        self.components.last().map(|c| c.index)
    }
}

impl fmt::Display for HdPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("/"))
    }
}

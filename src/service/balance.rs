//! 多链余额聚合
//!
//! 并发查询各链余额，单链失败只降级该链的条目，不拖垮整体。
//! 前缀派生链缺少落库地址时，从来源链地址做前缀变换现场解析。

use async_trait::async_trait;
use futures::future::join_all;

use crate::domain::chain_config::ChainRegistry;
use crate::domain::derivation::transform_prefix;
use crate::domain::tx::Coin;
use crate::domain::wallet::WalletRecord;
use crate::error::{CoreError, CoreResult};

/// 单链余额来源（RPC / REST 适配由调用方实现）
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch_balances(&self, chain_key: &str, address: &str) -> CoreResult<Vec<Coin>>;
}

/// 单链查询结果
#[derive(Debug, Clone, PartialEq)]
pub struct ChainBalance {
    pub chain_key: String,
    pub address: String,
    pub coins: Vec<Coin>,
    /// 该链查询失败时的错误码
    pub error: Option<String>,
}

impl ChainBalance {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// 一个钱包的聚合余额
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceSummary {
    pub balances: Vec<ChainBalance>,
}

impl BalanceSummary {
    /// 所有成功查询的链余额均为零
    pub fn all_zero(&self) -> bool {
        !self.has_nonzero()
    }

    /// 至少一条链有非零余额
    pub fn has_nonzero(&self) -> bool {
        self.balances
            .iter()
            .filter(|b| b.is_ok())
            .any(|b| b.coins.iter().any(|c| !is_zero_amount(&c.amount)))
    }

    /// 查询失败的链
    pub fn failed_chains(&self) -> Vec<&str> {
        self.balances
            .iter()
            .filter(|b| !b.is_ok())
            .map(|b| b.chain_key.as_str())
            .collect()
    }
}

fn is_zero_amount(amount: &str) -> bool {
    match amount.trim().parse::<u128>() {
        Ok(value) => value == 0,
        // 解析不了按非零处理，宁可多展示也不漏资产
        Err(_) => amount.trim().is_empty(),
    }
}

/// 余额聚合器
pub struct BalanceAggregator<B: BalanceSource> {
    registry: ChainRegistry,
    source: B,
}

impl<B: BalanceSource> BalanceAggregator<B> {
    pub fn new(registry: ChainRegistry, source: B) -> Self {
        Self { registry, source }
    }

    /// 解析钱包在某链上的查询地址
    ///
    /// 落库地址优先；前缀派生链缺地址时从来源链地址变换前缀。
    pub fn resolve_address(&self, record: &WalletRecord, chain_key: &str) -> CoreResult<String> {
        if let Some(address) = record.addresses.get(chain_key) {
            return Ok(address.clone());
        }

        let config = self
            .registry
            .get(chain_key)
            .ok_or_else(|| CoreError::UnsupportedCurve {
                chain: chain_key.to_string(),
            })?;

        if let (Some(source_chain), Some(prefix)) =
            (config.derived_from.as_deref(), config.bech32_prefix.as_deref())
        {
            if let Some(source_address) = record.addresses.get(source_chain) {
                return transform_prefix(source_address, prefix);
            }
        }

        Err(CoreError::WalletNotFound(format!(
            "wallet {} has no address for chain {}",
            record.id, chain_key
        )))
    }

    /// 并发查询一组链的余额
    ///
    /// 返回顺序与入参链顺序一致；地址解析失败或查询失败的链
    /// 以错误条目形式出现。
    pub async fn aggregate(&self, record: &WalletRecord, chain_keys: &[&str]) -> BalanceSummary {
        let queries = chain_keys.iter().map(|chain_key| async move {
            let address = match self.resolve_address(record, chain_key) {
                Ok(address) => address,
                Err(e) => {
                    return ChainBalance {
                        chain_key: chain_key.to_string(),
                        address: String::new(),
                        coins: vec![],
                        error: Some(e.code().to_string()),
                    };
                }
            };

            match self.source.fetch_balances(chain_key, &address).await {
                Ok(coins) => ChainBalance {
                    chain_key: chain_key.to_string(),
                    address,
                    coins,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(chain = *chain_key, code = e.code(), "balance query failed");
                    ChainBalance {
                        chain_key: chain_key.to_string(),
                        address,
                        coins: vec![],
                        error: Some(e.code().to_string()),
                    }
                }
            }
        });

        BalanceSummary {
            balances: join_all(queries).await,
        }
    }
}

//! 多链配置模块
//!
//! 定义所有支持的链及其曲线/地址编码配置。
//! Cosmos 系链共享同一份密钥材料，地址仅通过 bech32 前缀区分，
//! 因此部分链配置为"前缀派生"（不重新派生密钥，仅重编码地址）。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 加密曲线类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveType {
    /// secp256k1 曲线，Cosmos 标准地址（ripemd160(sha256(pubkey))）
    Secp256k1,
    /// secp256k1 曲线，Ethereum 风格地址（keccak256 payload）
    EthSecp256k1,
    /// ed25519 曲线
    Ed25519,
}

/// 地址编码格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFormat {
    /// Bech32 编码（Cosmos 系，带链前缀）
    Bech32,
    /// 十六进制 0x...（Ethereum，EIP-55 checksum）
    Hex,
}

/// 链配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// 链标识（钱包记录中的 key，如 "cosmoshub"）
    pub chain_key: String,
    /// 链名称
    pub name: String,
    /// 链上 chain_id（如 "cosmoshub-4"）
    pub chain_id: String,
    /// 曲线类型
    pub curve_type: CurveType,
    /// 地址格式
    pub address_format: AddressFormat,
    /// Bech32 前缀（Bech32 格式的链必填）
    pub bech32_prefix: Option<String>,
    /// BIP44 coin type
    pub coin_type: u32,
    /// 派生路径模板
    pub derivation_path_template: String,
    /// 主币面额（最小单位）
    pub denom: String,
    /// 前缀派生来源链（设置后地址不重新派生，仅从来源链地址重编码）
    pub derived_from: Option<String>,
    /// RPC 端点（可选）
    pub rpc_url: Option<String>,
}

impl ChainConfig {
    /// 生成完整派生路径
    pub fn derivation_path(&self, account: u32, change: u32, index: u32) -> String {
        format!(
            "m/44'/{}'/{}'/{}/{}",
            self.coin_type, account, change, index
        )
    }

    /// 是否为前缀派生链
    pub fn is_prefix_derived(&self) -> bool {
        self.derived_from.is_some()
    }
}

/// 链配置注册表
pub struct ChainRegistry {
    configs: HashMap<String, ChainConfig>,
}

impl ChainRegistry {
    /// 创建预配置的注册表
    pub fn new() -> Self {
        let mut registry = Self {
            configs: HashMap::new(),
        };

        registry.register_default_chains();
        registry
    }

    /// 注册默认支持的链
    fn register_default_chains(&mut self) {
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // Secp256k1 系列（Cosmos 标准地址）
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        // Cosmos Hub
        self.register(ChainConfig {
            chain_key: "cosmoshub".to_string(),
            name: "Cosmos Hub".to_string(),
            chain_id: "cosmoshub-4".to_string(),
            curve_type: CurveType::Secp256k1,
            address_format: AddressFormat::Bech32,
            bech32_prefix: Some("cosmos".to_string()),
            coin_type: 118,
            derivation_path_template: "m/44'/118'/0'/0/{index}".to_string(),
            denom: "uatom".to_string(),
            derived_from: None,
            rpc_url: Some("https://rpc.cosmos.network".to_string()),
        });

        // Osmosis - coin type 118，与 Cosmos Hub 共享密钥，地址仅前缀不同
        self.register(ChainConfig {
            chain_key: "osmosis".to_string(),
            name: "Osmosis".to_string(),
            chain_id: "osmosis-1".to_string(),
            curve_type: CurveType::Secp256k1,
            address_format: AddressFormat::Bech32,
            bech32_prefix: Some("osmo".to_string()),
            coin_type: 118,
            derivation_path_template: "m/44'/118'/0'/0/{index}".to_string(),
            denom: "uosmo".to_string(),
            derived_from: Some("cosmoshub".to_string()),
            rpc_url: Some("https://rpc.osmosis.zone".to_string()),
        });

        // Juno - 同样前缀派生
        self.register(ChainConfig {
            chain_key: "juno".to_string(),
            name: "Juno".to_string(),
            chain_id: "juno-1".to_string(),
            curve_type: CurveType::Secp256k1,
            address_format: AddressFormat::Bech32,
            bech32_prefix: Some("juno".to_string()),
            coin_type: 118,
            derivation_path_template: "m/44'/118'/0'/0/{index}".to_string(),
            denom: "ujuno".to_string(),
            derived_from: Some("cosmoshub".to_string()),
            rpc_url: None,
        });

        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // EthSecp256k1 系列（keccak payload）
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        // Injective - coin type 60，地址为 keccak payload 的 bech32 编码
        self.register(ChainConfig {
            chain_key: "injective".to_string(),
            name: "Injective".to_string(),
            chain_id: "injective-1".to_string(),
            curve_type: CurveType::EthSecp256k1,
            address_format: AddressFormat::Bech32,
            bech32_prefix: Some("inj".to_string()),
            coin_type: 60,
            derivation_path_template: "m/44'/60'/0'/0/{index}".to_string(),
            denom: "inj".to_string(),
            derived_from: None,
            rpc_url: None,
        });

        // Ethereum
        self.register(ChainConfig {
            chain_key: "ethereum".to_string(),
            name: "Ethereum".to_string(),
            chain_id: "1".to_string(),
            curve_type: CurveType::EthSecp256k1,
            address_format: AddressFormat::Hex,
            bech32_prefix: None,
            coin_type: 60,
            derivation_path_template: "m/44'/60'/0'/0/{index}".to_string(),
            denom: "wei".to_string(),
            derived_from: None,
            rpc_url: Some("https://eth-mainnet.g.alchemy.com/v2/".to_string()),
        });

        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // Ed25519 系列
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

        // Near - implicit account，地址为公钥的 hex 编码
        self.register(ChainConfig {
            chain_key: "near".to_string(),
            name: "NEAR".to_string(),
            chain_id: "mainnet".to_string(),
            curve_type: CurveType::Ed25519,
            address_format: AddressFormat::Hex,
            bech32_prefix: None,
            coin_type: 397,
            derivation_path_template: "m/44'/397'/0'".to_string(),
            denom: "yoctoNEAR".to_string(),
            derived_from: None,
            rpc_url: None,
        });
    }

    /// 注册链配置（支持运行时扩展）
    pub fn register(&mut self, config: ChainConfig) {
        self.configs.insert(config.chain_key.clone(), config);
    }

    /// 通过链标识获取配置
    pub fn get(&self, chain_key: &str) -> Option<&ChainConfig> {
        self.configs.get(chain_key)
    }

    /// 按曲线类型分组获取所有链
    pub fn get_by_curve_type(&self, curve_type: CurveType) -> Vec<&ChainConfig> {
        self.configs
            .values()
            .filter(|c| c.curve_type == curve_type)
            .collect()
    }

    /// 列出所有支持的链
    pub fn list_all(&self) -> Vec<&ChainConfig> {
        self.configs.values().collect()
    }

    /// 验证链配置完整性
    pub fn validate_configs(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (chain_key, config) in &self.configs {
            if config.name.is_empty() {
                errors.push(format!("Chain {} has empty name", chain_key));
            }
            if config.chain_id.is_empty() {
                errors.push(format!("Chain {} has empty chain_id", chain_key));
            }
            if config.derivation_path_template.is_empty() {
                errors.push(format!(
                    "Chain {} has empty derivation_path_template",
                    chain_key
                ));
            }

            // Bech32 格式的链必须有前缀
            if config.address_format == AddressFormat::Bech32 && config.bech32_prefix.is_none() {
                errors.push(format!("Chain {} is bech32 but has no prefix", chain_key));
            }

            // 前缀派生链的来源必须存在且为 bech32
            if let Some(source) = &config.derived_from {
                match self.configs.get(source) {
                    None => errors.push(format!(
                        "Chain {} derives from unknown chain {}",
                        chain_key, source
                    )),
                    Some(source_config) => {
                        if source_config.address_format != AddressFormat::Bech32 {
                            errors.push(format!(
                                "Chain {} derives from non-bech32 chain {}",
                                chain_key, source
                            ));
                        }
                    }
                }
            }

            // 曲线类型和地址格式匹配检查
            match (config.curve_type, config.address_format) {
                (CurveType::Secp256k1, AddressFormat::Bech32) => {}
                (CurveType::EthSecp256k1, AddressFormat::Bech32 | AddressFormat::Hex) => {}
                (CurveType::Ed25519, AddressFormat::Hex) => {}
                _ => {
                    errors.push(format!(
                        "Chain {} has incompatible curve_type and address_format: {:?} / {:?}",
                        chain_key, config.curve_type, config.address_format
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

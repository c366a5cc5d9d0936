//! 钱包领域模型
//!
//! 纯公开信息：钱包记录只存地址、公钥和派生路径，
//! 私钥材料由签名器单独管理，永不进入持久化文档。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 钱包类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletType {
    /// 本地生成的助记词钱包
    SeedPhrase,
    /// 导入的助记词钱包
    SeedPhraseImported,
    /// 导入的裸私钥钱包
    PrivateKey,
    /// Ledger 硬件钱包
    Ledger,
    /// 只读观察钱包
    Watch,
}

impl WalletType {
    /// 是否为硬件签名器支持的钱包
    pub fn is_hardware_backed(&self) -> bool {
        matches!(self, WalletType::Ledger)
    }
}

/// 钱包记录
///
/// 不变式：某链上的地址一旦写入，只能通过显式对账或用户操作变更，
/// 绝不隐式改写。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    /// 唯一标识，创建后不可变
    pub id: Uuid,
    pub name: String,
    pub wallet_type: WalletType,
    /// 各链地址（chain_key -> address）
    #[serde(default)]
    pub addresses: HashMap<String, String>,
    /// 各链公钥（chain_key -> hex pubkey）
    #[serde(default)]
    pub pub_keys: HashMap<String, String>,
    /// 派生路径（新格式：相对路径；历史格式：单个索引数字）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derivation_path: Option<String>,
    /// 头像颜色索引
    #[serde(default)]
    pub color_index: u32,
    /// 自定义头像
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletRecord {
    /// 创建新记录
    pub fn new(name: impl Into<String>, wallet_type: WalletType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            wallet_type,
            addresses: HashMap::new(),
            pub_keys: HashMap::new(),
            derivation_path: None,
            color_index: 0,
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 写入某链的地址和公钥（对账或用户操作专用入口）
    pub fn set_chain_account(&mut self, chain_key: &str, address: String, pub_key: String) {
        self.addresses.insert(chain_key.to_string(), address);
        self.pub_keys.insert(chain_key.to_string(), pub_key);
        self.updated_at = Utc::now();
    }
}

/// 单条派生结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedAccount {
    pub address: String,
    /// hex 编码公钥（secp256k1 为压缩格式）
    pub pub_key: String,
}

/// 一次硬件枚举的完整输出
///
/// path -> (chain_key -> 账户)。生命周期仅限单次导入操作。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DerivationResult {
    accounts: HashMap<String, HashMap<String, DerivedAccount>>,
}

impl DerivationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个 path/chain 的账户
    pub fn insert(&mut self, path: &str, chain_key: &str, account: DerivedAccount) {
        self.accounts
            .entry(path.to_string())
            .or_default()
            .insert(chain_key.to_string(), account);
    }

    /// 按路径查找各链账户
    pub fn get_by_path(&self, path: &str) -> Option<&HashMap<String, DerivedAccount>> {
        self.accounts.get(path)
    }

    /// 合并另一次枚举的结果（多 app 顺序枚举后聚合）
    pub fn merge(&mut self, other: DerivationResult) {
        for (path, chains) in other.accounts {
            let entry = self.accounts.entry(path).or_default();
            for (chain_key, account) in chains {
                entry.insert(chain_key, account);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.accounts.keys()
    }
}

/// 钱包库：持久化的单一逻辑文档
///
/// 活跃钱包指针持有记录的完整副本，两份身份信息不得分叉——
/// 对账改写记录时必须同步刷新指针。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keystore {
    #[serde(default)]
    pub wallets: HashMap<Uuid, WalletRecord>,
    /// 当前活跃钱包（完整副本）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_wallet: Option<WalletRecord>,
}

impl Keystore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入记录；若 id 已存在则覆盖
    pub fn insert(&mut self, record: WalletRecord) {
        self.wallets.insert(record.id, record);
    }

    pub fn get(&self, id: &Uuid) -> Option<&WalletRecord> {
        self.wallets.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut WalletRecord> {
        self.wallets.get_mut(id)
    }

    /// 显式删除
    pub fn remove(&mut self, id: &Uuid) -> Option<WalletRecord> {
        if self
            .active_wallet
            .as_ref()
            .map(|w| w.id == *id)
            .unwrap_or(false)
        {
            self.active_wallet = None;
        }
        self.wallets.remove(id)
    }

    /// 设置活跃钱包（存入完整副本）
    pub fn set_active(&mut self, id: &Uuid) -> bool {
        match self.wallets.get(id) {
            Some(record) => {
                self.active_wallet = Some(record.clone());
                true
            }
            None => false,
        }
    }

    /// 若活跃钱包就是 id，对应记录变更后刷新副本
    pub fn refresh_active_if(&mut self, id: &Uuid) {
        if self
            .active_wallet
            .as_ref()
            .map(|w| w.id == *id)
            .unwrap_or(false)
        {
            if let Some(record) = self.wallets.get(id) {
                self.active_wallet = Some(record.clone());
            }
        }
    }
}

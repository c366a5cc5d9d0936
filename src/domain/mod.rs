//! Domain 模块
//!
//! 包含核心业务逻辑和领域模型

pub mod chain_config;
pub mod derivation;
pub mod path;
pub mod tx;
pub mod wallet;

// 重新导出常用类型
pub use chain_config::{AddressFormat, ChainConfig, ChainRegistry, CurveType};
pub use derivation::{
    transform_prefix, AddressDeriver, DerivationStrategy, DerivationStrategyFactory, SecretSource,
};
pub use path::HdPath;
pub use tx::{SignMode, SignedEnvelope, StdSignDoc, TxRaw, WalletMessage};
pub use wallet::{DerivationResult, DerivedAccount, Keystore, WalletRecord, WalletType};

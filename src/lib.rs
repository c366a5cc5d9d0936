//! IronForge Core - 多链钱包核心库
//!
//! 非托管模式：地址派生、交易签名和编码全部在本地完成，
//! 密钥材料绝不离开调用方进程。

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;

pub use error::{CoreError, CoreResult};

// 统一模块导出
pub mod prelude {
    pub use crate::config::{CoreConfig, DeviceConfig};
    pub use crate::domain::{
        chain_config::{AddressFormat, ChainConfig, ChainRegistry, CurveType},
        derivation::{AddressDeriver, SecretSource},
        path::HdPath,
        tx::{
            Coin, SignedEnvelope, SignMode, StdFee, StdSignDoc, TxRaw, WalletMessage,
        },
        wallet::{DerivationResult, DerivedAccount, Keystore, WalletRecord, WalletType},
    };
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::infrastructure::{
        device::{DeviceApp, HardwareDevice, HardwareEnumerator},
        keystore_store::{FileKeystoreStore, KeystoreStore, MemoryKeystoreStore},
    };
    pub use crate::service::{
        BalanceAggregator, BalanceSource, KeystoreReconciler, Signer, SoftwareSigner,
        TransactionEncoder,
    };
}

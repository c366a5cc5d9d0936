//! 统一错误类型
//!
//! 所有错误按类别分类（认证/派生/对账/编码/网络），
//! 调用方可以区分"提示用户解锁设备"和"不可恢复错误"

use thiserror::Error;

/// 核心错误类型
#[derive(Debug, Error)]
pub enum CoreError {
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 认证/密钥错误（立即上报，永不自动重试）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    /// 密码未设置，软件签名器无法解密密钥
    #[error("password not set")]
    PasswordNotSet,

    /// 硬件设备锁定或未进入对应 app
    #[error("device locked: app {0} not open")]
    DeviceLocked(String),

    /// 用户在设备上拒绝签名
    #[error("user rejected signing on device")]
    UserRejected,

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 派生错误（携带路径和链信息，支持单路径重试）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    /// 不支持的曲线类型
    #[error("unsupported curve for chain {chain}")]
    UnsupportedCurve { chain: String },

    /// 无效的派生路径
    #[error("invalid derivation path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// 设备返回了无法解析的数据
    #[error("malformed device response for path {path}, chain {chain}")]
    MalformedDeviceData { path: String, chain: String },

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 对账错误（当前操作致命，禁止半合并写入）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    /// 钱包库不可读或损坏
    #[error("keystore corrupt: {0}")]
    CorruptKeystore(String),

    /// 目标钱包不存在
    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 编码错误（携带违规的类型标识）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    /// 获取账户信息失败（无 sequence 则签名无法进行）
    #[error("account fetch failed for {address}: {reason}")]
    AccountFetchFailed { address: String, reason: String },

    /// 编码失败（未注册的消息类型等）
    #[error("encoding error for type {type_url}: {reason}")]
    EncodingError { type_url: String, reason: String },

    /// 签名器不支持请求的签名模式
    #[error("unsupported sign mode: {0}")]
    UnsupportedSignMode(String),

    /// 无效地址
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // 网络错误（按调用方上报，余额查询按链降级）
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    /// 外部协作方网络错误
    #[error("network error from {source_name}: {reason}")]
    Network { source_name: String, reason: String },

    /// 存储读写错误
    #[error("store error: {0}")]
    Store(String),
}

impl CoreError {
    /// 稳定错误码（用于上层错误映射和日志）
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::PasswordNotSet => "password_not_set",
            CoreError::DeviceLocked(_) => "device_locked",
            CoreError::UserRejected => "user_rejected",
            CoreError::UnsupportedCurve { .. } => "unsupported_curve",
            CoreError::InvalidPath { .. } => "invalid_path",
            CoreError::MalformedDeviceData { .. } => "malformed_device_data",
            CoreError::CorruptKeystore(_) => "corrupt_keystore",
            CoreError::WalletNotFound(_) => "wallet_not_found",
            CoreError::AccountFetchFailed { .. } => "account_fetch_failed",
            CoreError::EncodingError { .. } => "encoding_error",
            CoreError::UnsupportedSignMode(_) => "unsupported_sign_mode",
            CoreError::InvalidAddress(_) => "invalid_address",
            CoreError::Network { .. } => "network_error",
            CoreError::Store(_) => "store_error",
        }
    }

    /// 是否为认证类错误（需要用户介入：解锁设备/输入密码）
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            CoreError::PasswordNotSet | CoreError::DeviceLocked(_) | CoreError::UserRejected
        )
    }

    /// 是否为可重试的网络错误
    pub fn is_network_error(&self) -> bool {
        matches!(self, CoreError::Network { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

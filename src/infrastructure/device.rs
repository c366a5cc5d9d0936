//! 硬件签名设备协作方
//!
//! 设备是独占会话资源：同一时刻只能打开一个 app（每条曲线一个 app），
//! 多曲线枚举必须顺序执行，绝不并发。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::tx::{SignMode, SignatureData, StdSignDoc, TxRaw};
use crate::domain::wallet::DerivationResult;
use crate::error::{CoreError, CoreResult};

/// 设备 app（每条曲线一个）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceApp {
    /// Cosmos app：secp256k1 标准地址链
    Cosmos,
    /// Ethereum app：eth_secp256k1 链
    Ethereum,
}

impl DeviceApp {
    pub fn name(&self) -> &'static str {
        match self {
            DeviceApp::Cosmos => "cosmos",
            DeviceApp::Ethereum => "ethereum",
        }
    }
}

/// 设备签名返回
///
/// 部分固件只支持 amino 签名，返回分离的签名；
/// 新固件可以直接产出组装好的二进制信封。
#[derive(Debug, Clone)]
pub enum DeviceSignResponse {
    Amino(SignatureData),
    Direct(TxRaw),
}

/// 硬件设备接口
#[async_trait]
pub trait HardwareDevice: Send + Sync {
    /// 设备是否已解锁进入指定 app
    async fn is_unlocked(&self, app: DeviceApp) -> bool;

    /// 枚举固定一批索引的账户（单次会话操作）
    async fn get_accounts(&self, app: DeviceApp, indices: &[u32]) -> CoreResult<DerivationResult>;

    /// 在设备上签名
    async fn sign(
        &self,
        app: DeviceApp,
        doc: &StdSignDoc,
        mode: SignMode,
    ) -> CoreResult<DeviceSignResponse>;
}

/// 硬件枚举器
///
/// 持有会话锁：同一设备上的枚举互斥，多 app 严格顺序执行。
pub struct HardwareEnumerator<D: HardwareDevice> {
    device: Arc<D>,
    session: Mutex<()>,
    /// 每次会话枚举的索引批量（0..batch_size）
    batch_size: u32,
}

impl<D: HardwareDevice> HardwareEnumerator<D> {
    pub fn new(device: Arc<D>, batch_size: u32) -> Self {
        Self {
            device,
            session: Mutex::new(()),
            batch_size,
        }
    }

    pub fn device(&self) -> Arc<D> {
        Arc::clone(&self.device)
    }

    /// 顺序枚举多个 app 的账户并聚合
    ///
    /// 任一 app 未解锁立即返回 DeviceLocked，不做部分枚举——
    /// 调用方（UI）收到错误后提示用户切换 app 再重试。
    pub async fn enumerate(&self, apps: &[DeviceApp]) -> CoreResult<DerivationResult> {
        let _session = self.session.lock().await;

        let indices: Vec<u32> = (0..self.batch_size).collect();
        let mut merged = DerivationResult::new();

        for app in apps {
            if !self.device.is_unlocked(*app).await {
                return Err(CoreError::DeviceLocked(app.name().to_string()));
            }

            tracing::debug!(app = app.name(), batch = self.batch_size, "enumerating device accounts");
            let result = self.device.get_accounts(*app, &indices).await?;
            merged.merge(result);
        }

        Ok(merged)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 测试替身
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 模拟硬件设备
///
/// 预置各 app 的解锁状态和枚举结果，支持"轮询 N 次后解锁"
/// 和"拒绝签名"两种行为，用于单元与集成测试。
pub struct MockDevice {
    state: std::sync::Mutex<MockDeviceState>,
}

struct MockDeviceState {
    unlocked: std::collections::HashSet<DeviceApp>,
    /// 再被轮询多少次后自动解锁（模拟用户在设备上操作）
    unlock_after_polls: Option<(DeviceApp, u32)>,
    accounts: std::collections::HashMap<DeviceApp, DerivationResult>,
    reject_signing: bool,
    direct_response: Option<TxRaw>,
    sign_signature: Option<SignatureData>,
    poll_count: u32,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            state: std::sync::Mutex::new(MockDeviceState {
                unlocked: std::collections::HashSet::new(),
                unlock_after_polls: None,
                accounts: std::collections::HashMap::new(),
                reject_signing: false,
                direct_response: None,
                sign_signature: None,
                poll_count: 0,
            }),
        }
    }

    pub fn unlock(&self, app: DeviceApp) {
        self.state.lock().unwrap().unlocked.insert(app);
    }

    pub fn lock_all(&self) {
        self.state.lock().unwrap().unlocked.clear();
    }

    /// 被轮询 n 次后自动解锁 app
    pub fn unlock_after_polls(&self, app: DeviceApp, n: u32) {
        let mut state = self.state.lock().unwrap();
        state.unlock_after_polls = Some((app, n));
        state.poll_count = 0;
    }

    pub fn set_accounts(&self, app: DeviceApp, result: DerivationResult) {
        self.state.lock().unwrap().accounts.insert(app, result);
    }

    pub fn set_reject_signing(&self, reject: bool) {
        self.state.lock().unwrap().reject_signing = reject;
    }

    /// 配置设备直接产出二进制信封（新固件行为）
    pub fn set_direct_response(&self, tx_raw: TxRaw) {
        self.state.lock().unwrap().direct_response = Some(tx_raw);
    }

    pub fn set_sign_signature(&self, signature: SignatureData) {
        self.state.lock().unwrap().sign_signature = Some(signature);
    }

    pub fn poll_count(&self) -> u32 {
        self.state.lock().unwrap().poll_count
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HardwareDevice for MockDevice {
    async fn is_unlocked(&self, app: DeviceApp) -> bool {
        let mut state = self.state.lock().unwrap();
        state.poll_count += 1;

        if let Some((pending_app, n)) = state.unlock_after_polls {
            if pending_app == app && state.poll_count >= n {
                state.unlocked.insert(app);
                state.unlock_after_polls = None;
            }
        }

        state.unlocked.contains(&app)
    }

    async fn get_accounts(&self, app: DeviceApp, indices: &[u32]) -> CoreResult<DerivationResult> {
        let state = self.state.lock().unwrap();
        if !state.unlocked.contains(&app) {
            return Err(CoreError::DeviceLocked(app.name().to_string()));
        }
        let _ = indices;
        Ok(state.accounts.get(&app).cloned().unwrap_or_default())
    }

    async fn sign(
        &self,
        app: DeviceApp,
        doc: &StdSignDoc,
        _mode: SignMode,
    ) -> CoreResult<DeviceSignResponse> {
        let state = self.state.lock().unwrap();
        if !state.unlocked.contains(&app) {
            return Err(CoreError::DeviceLocked(app.name().to_string()));
        }
        if state.reject_signing {
            return Err(CoreError::UserRejected);
        }

        if let Some(tx_raw) = &state.direct_response {
            return Ok(DeviceSignResponse::Direct(tx_raw.clone()));
        }

        let signature = state.sign_signature.clone().unwrap_or_else(|| {
            // 默认返回文档摘要伪签名，便于断言
            use sha2::{Digest, Sha256};
            let digest = Sha256::digest(doc.canonical_bytes().unwrap_or_default());
            SignatureData {
                pub_key: crate::domain::tx::PubKeyData::Secp256k1(vec![2; 33]),
                signature: digest.to_vec(),
            }
        });
        Ok(DeviceSignResponse::Amino(signature))
    }
}

//! 签名服务
//!
//! 两种签名器：
//! - SoftwareSigner：本地密钥签名（amino sha256 摘要 / EIP-191 前缀）
//! - HardwareSigner：硬件设备签名，先轮询解锁状态再发起签名，
//!   轮询可取消，同一设备不允许并发轮询

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use crate::config::DeviceConfig;
use crate::domain::chain_config::{ChainConfig, CurveType};
use crate::domain::derivation::{secp256k1_key, SecretSource};
use crate::domain::path::HdPath;
use crate::domain::tx::{PubKeyData, SignMode, SignatureData, SignedEnvelope, StdSignDoc};
use crate::infrastructure::device::{DeviceApp, DeviceSignResponse, HardwareDevice};
use crate::error::{CoreError, CoreResult};

/// 签名器接口
#[async_trait]
pub trait Signer: Send + Sync {
    /// 对 amino 签名文档按指定模式签名
    async fn sign(&self, doc: &StdSignDoc, mode: SignMode) -> CoreResult<SignedEnvelope>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 软件签名器
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 本地密钥签名器
///
/// 持有密钥来源和派生路径，按链配置的曲线签名。
pub struct SoftwareSigner {
    secret: SecretSource,
    path: HdPath,
    config: ChainConfig,
}

impl SoftwareSigner {
    pub fn new(secret: SecretSource, path: HdPath, config: ChainConfig) -> Self {
        Self {
            secret,
            path,
            config,
        }
    }

    fn sign_secp256k1(&self, digest: &[u8], eth: bool) -> CoreResult<SignatureData> {
        let signing_key = secp256k1_key(&self.secret, &self.path, &self.config)?;
        let signature: k256::ecdsa::Signature =
            signing_key
                .sign_prehash(digest)
                .map_err(|e| CoreError::EncodingError {
                    type_url: "signature".to_string(),
                    reason: e.to_string(),
                })?;
        // 固定 low-s 形式，64 字节 r||s
        let signature = signature.normalize_s().unwrap_or(signature);

        let compressed = {
            use k256::elliptic_curve::sec1::ToEncodedPoint;
            signing_key.verifying_key().to_encoded_point(true)
        };
        let pub_key = if eth {
            PubKeyData::EthSecp256k1(compressed.as_bytes().to_vec())
        } else {
            PubKeyData::Secp256k1(compressed.as_bytes().to_vec())
        };

        Ok(SignatureData {
            pub_key,
            signature: signature.to_bytes().to_vec(),
        })
    }

    fn sign_ed25519(&self, message: &[u8]) -> CoreResult<SignatureData> {
        use ed25519_dalek::Signer as _;

        let k256_key = secp256k1_key(&self.secret, &self.path, &self.config)?;
        let key_bytes: [u8; 32] = k256_key.to_bytes().into();
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&key_bytes);
        let signature = signing_key.sign(message);

        Ok(SignatureData {
            pub_key: PubKeyData::Ed25519(signing_key.verifying_key().to_bytes().to_vec()),
            signature: signature.to_bytes().to_vec(),
        })
    }
}

#[async_trait]
impl Signer for SoftwareSigner {
    async fn sign(&self, doc: &StdSignDoc, mode: SignMode) -> CoreResult<SignedEnvelope> {
        let canonical = doc.canonical_bytes()?;

        let signature = match mode {
            SignMode::Amino => match self.config.curve_type {
                CurveType::Secp256k1 => {
                    let digest = Sha256::digest(&canonical);
                    self.sign_secp256k1(&digest, false)?
                }
                CurveType::EthSecp256k1 => {
                    let digest = Sha256::digest(&canonical);
                    self.sign_secp256k1(&digest, true)?
                }
                CurveType::Ed25519 => self.sign_ed25519(&canonical)?,
            },
            SignMode::Eip191 => {
                if self.config.curve_type != CurveType::EthSecp256k1 {
                    return Err(CoreError::UnsupportedSignMode(format!(
                        "eip-191 requires eth_secp256k1, chain {} uses another curve",
                        self.config.chain_key
                    )));
                }
                let digest = eip191_digest(&canonical);
                self.sign_secp256k1(&digest, true)?
            }
            SignMode::Direct => {
                return Err(CoreError::UnsupportedSignMode(
                    "direct mode requires a hardware backend".to_string(),
                ));
            }
        };

        Ok(SignedEnvelope::AminoSigned {
            signed_doc: doc.clone(),
            signature,
        })
    }
}

/// EIP-191 personal-message 摘要：前缀 + 消息长度 + 原文，keccak256
pub fn eip191_digest(message: &[u8]) -> Vec<u8> {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message);
    hasher.finalize().to_vec()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 硬件签名器
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 硬件设备签名器
///
/// 签名前按固定间隔轮询设备解锁状态，直到解锁、超时或被取消。
/// 会话锁保证同一设备上的轮询不重叠。
pub struct HardwareSigner<D: HardwareDevice> {
    device: Arc<D>,
    app: DeviceApp,
    config: DeviceConfig,
    session: Mutex<()>,
    cancel: watch::Sender<bool>,
}

impl<D: HardwareDevice> HardwareSigner<D> {
    pub fn new(device: Arc<D>, app: DeviceApp, config: DeviceConfig) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            device,
            app,
            config,
            session: Mutex::new(()),
            cancel,
        }
    }

    /// 取消进行中的解锁等待
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// 轮询直到设备解锁进入目标 app
    async fn wait_for_unlock(&self) -> CoreResult<()> {
        // 新一轮签名重置取消标记
        let _ = self.cancel.send(false);
        let mut cancelled = self.cancel.subscribe();

        // 超时为 0 表示无限等待
        let deadline = (self.config.poll_timeout_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(self.config.poll_timeout_ms));
        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.device.is_unlocked(self.app).await {
                        return Ok(());
                    }
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        tracing::warn!(app = self.app.name(), "device unlock wait timed out");
                        return Err(CoreError::DeviceLocked(self.app.name().to_string()));
                    }
                }
                // wait_for 的返回值持有 watch 读锁，必须在分支内立即丢弃，
                // 不能跨另一分支的 await 存活
                changed = async { cancelled.wait_for(|c| *c).await.map(|_| ()) } => {
                    if changed.is_ok() {
                        tracing::info!(app = self.app.name(), "device unlock wait cancelled");
                        return Err(CoreError::UserRejected);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<D: HardwareDevice> Signer for HardwareSigner<D> {
    async fn sign(&self, doc: &StdSignDoc, mode: SignMode) -> CoreResult<SignedEnvelope> {
        let _session = self.session.lock().await;

        self.wait_for_unlock().await?;

        match self.device.sign(self.app, doc, mode).await? {
            DeviceSignResponse::Amino(signature) => Ok(SignedEnvelope::AminoSigned {
                signed_doc: doc.clone(),
                signature,
            }),
            DeviceSignResponse::Direct(tx_raw) => Ok(SignedEnvelope::DirectSigned { tx_raw }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain_config::ChainRegistry;
    use crate::domain::tx::{AminoMsg, StdFee, TxRaw};
    use crate::infrastructure::device::MockDevice;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_doc() -> StdSignDoc {
        StdSignDoc {
            chain_id: "cosmoshub-4".to_string(),
            account_number: "12".to_string(),
            sequence: "4".to_string(),
            fee: StdFee {
                amount: vec![],
                gas: "200000".to_string(),
            },
            msgs: vec![AminoMsg {
                kind: "cosmos-sdk/MsgSend".to_string(),
                value: serde_json::json!({"from_address": "cosmos1a"}),
            }],
            memo: String::new(),
        }
    }

    fn software_signer(chain_key: &str) -> SoftwareSigner {
        let registry = ChainRegistry::new();
        let config = registry.get(chain_key).unwrap().clone();
        SoftwareSigner::new(
            SecretSource::from_mnemonic(TEST_MNEMONIC),
            HdPath::parse("0'/0/0").unwrap(),
            config,
        )
    }

    #[tokio::test]
    async fn test_amino_signature_verifies() {
        let signer = software_signer("cosmoshub");
        let doc = test_doc();

        let envelope = signer.sign(&doc, SignMode::Amino).await.unwrap();
        let SignedEnvelope::AminoSigned { signed_doc, signature } = envelope else {
            panic!("expected amino envelope");
        };
        assert_eq!(signed_doc, doc);

        let PubKeyData::Secp256k1(pub_key) = &signature.pub_key else {
            panic!("expected secp256k1 pub key");
        };
        let verifying_key = k256::ecdsa::VerifyingKey::from_sec1_bytes(pub_key).unwrap();
        let sig = k256::ecdsa::Signature::from_slice(&signature.signature).unwrap();
        let digest = Sha256::digest(doc.canonical_bytes().unwrap());
        verifying_key.verify_prehash(&digest, &sig).unwrap();
    }

    #[tokio::test]
    async fn test_eip191_signature_verifies() {
        let signer = software_signer("ethereum");
        let doc = test_doc();

        let envelope = signer.sign(&doc, SignMode::Eip191).await.unwrap();
        let SignedEnvelope::AminoSigned { signature, .. } = envelope else {
            panic!("expected amino envelope");
        };

        let PubKeyData::EthSecp256k1(pub_key) = &signature.pub_key else {
            panic!("expected eth pub key");
        };
        let verifying_key = k256::ecdsa::VerifyingKey::from_sec1_bytes(pub_key).unwrap();
        let sig = k256::ecdsa::Signature::from_slice(&signature.signature).unwrap();
        let digest = eip191_digest(&doc.canonical_bytes().unwrap());
        verifying_key.verify_prehash(&digest, &sig).unwrap();
    }

    #[tokio::test]
    async fn test_eip191_rejected_for_cosmos_curve() {
        let signer = software_signer("cosmoshub");
        let err = signer.sign(&test_doc(), SignMode::Eip191).await.unwrap_err();
        assert_eq!(err.code(), "unsupported_sign_mode");
    }

    #[tokio::test]
    async fn test_direct_mode_unsupported_in_software() {
        let signer = software_signer("cosmoshub");
        let err = signer.sign(&test_doc(), SignMode::Direct).await.unwrap_err();
        assert_eq!(err.code(), "unsupported_sign_mode");
    }

    fn fast_device_config() -> DeviceConfig {
        DeviceConfig {
            poll_interval_ms: 10,
            poll_timeout_ms: 500,
            enumeration_batch: 5,
        }
    }

    #[tokio::test]
    async fn test_hardware_waits_for_unlock() {
        let device = Arc::new(MockDevice::new());
        device.unlock_after_polls(DeviceApp::Cosmos, 3);

        let signer = HardwareSigner::new(Arc::clone(&device), DeviceApp::Cosmos, fast_device_config());
        let envelope = signer.sign(&test_doc(), SignMode::Amino).await.unwrap();
        assert!(matches!(envelope, SignedEnvelope::AminoSigned { .. }));
        assert!(device.poll_count() >= 3);
    }

    #[tokio::test]
    async fn test_hardware_sign_runs_on_spawned_task() {
        // spawn 要求签名 future 是 Send：轮询循环内部不得把
        // watch 读锁带过 await 点
        let device = Arc::new(MockDevice::new());
        device.unlock(DeviceApp::Cosmos);

        let signer = Arc::new(HardwareSigner::new(
            device,
            DeviceApp::Cosmos,
            fast_device_config(),
        ));
        let handle = tokio::spawn({
            let signer = Arc::clone(&signer);
            async move { signer.sign(&test_doc(), SignMode::Amino).await }
        });

        let envelope = handle.await.unwrap().unwrap();
        assert!(matches!(envelope, SignedEnvelope::AminoSigned { .. }));
    }

    #[tokio::test]
    async fn test_hardware_unlock_timeout() {
        let device = Arc::new(MockDevice::new());
        let signer = HardwareSigner::new(
            device,
            DeviceApp::Cosmos,
            DeviceConfig {
                poll_interval_ms: 10,
                poll_timeout_ms: 40,
                enumeration_batch: 5,
            },
        );

        let err = signer.sign(&test_doc(), SignMode::Amino).await.unwrap_err();
        assert_eq!(err.code(), "device_locked");
    }

    #[tokio::test]
    async fn test_hardware_cancel_during_wait() {
        let device = Arc::new(MockDevice::new());
        let signer = Arc::new(HardwareSigner::new(
            device,
            DeviceApp::Cosmos,
            fast_device_config(),
        ));

        let signing = {
            let signer = Arc::clone(&signer);
            tokio::spawn(async move { signer.sign(&test_doc(), SignMode::Amino).await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        signer.cancel();

        let err = signing.await.unwrap().unwrap_err();
        assert_eq!(err.code(), "user_rejected");
    }

    #[tokio::test]
    async fn test_hardware_rejection_propagates() {
        let device = Arc::new(MockDevice::new());
        device.unlock(DeviceApp::Cosmos);
        device.set_reject_signing(true);

        let signer = HardwareSigner::new(device, DeviceApp::Cosmos, fast_device_config());
        let err = signer.sign(&test_doc(), SignMode::Amino).await.unwrap_err();
        assert_eq!(err.code(), "user_rejected");
    }

    #[tokio::test]
    async fn test_hardware_direct_envelope_passthrough() {
        let device = Arc::new(MockDevice::new());
        device.unlock(DeviceApp::Cosmos);
        let tx_raw = TxRaw {
            body_bytes: vec![1, 2, 3],
            auth_info_bytes: vec![4, 5],
            signatures: vec![vec![9; 64]],
        };
        device.set_direct_response(tx_raw.clone());

        let signer = HardwareSigner::new(device, DeviceApp::Cosmos, fast_device_config());
        let envelope = signer.sign(&test_doc(), SignMode::Amino).await.unwrap();
        assert_eq!(envelope, SignedEnvelope::DirectSigned { tx_raw });
    }
}

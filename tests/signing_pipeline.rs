//! 端到端签名流水线测试
//!
//! 覆盖：实时账户状态嵌入、空内嵌 memo 省略、软件/硬件签名路径、
//! 编码确定性。

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;

use ironforge_core::domain::chain_config::ChainRegistry;
use ironforge_core::domain::derivation::SecretSource;
use ironforge_core::domain::path::HdPath;
use ironforge_core::domain::tx::{
    AuthInfo, Coin, MsgIbcTransfer, MsgSend, StdFee, TxBody, WalletMessage,
};
use ironforge_core::error::{CoreError, CoreResult};
use ironforge_core::infrastructure::device::{DeviceApp, MockDevice};
use ironforge_core::service::signer::HardwareSigner;
use ironforge_core::service::tx_encoder::{AccountInfo, AccountInfoSource, TransactionEncoder};
use ironforge_core::service::SoftwareSigner;
use ironforge_core::config::DeviceConfig;

const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

struct FixedAccounts;

#[async_trait]
impl AccountInfoSource for FixedAccounts {
    async fn get_account(&self, _chain_key: &str, _address: &str) -> CoreResult<AccountInfo> {
        Ok(AccountInfo {
            account_number: 12,
            sequence: 4,
        })
    }
}

fn software_signer(chain_key: &str) -> SoftwareSigner {
    let registry = ChainRegistry::new();
    SoftwareSigner::new(
        SecretSource::from_mnemonic(TEST_MNEMONIC),
        HdPath::parse("0'/0/0").unwrap(),
        registry.get(chain_key).unwrap().clone(),
    )
}

fn ibc_transfer_with_empty_memo() -> WalletMessage {
    WalletMessage::IbcTransfer(MsgIbcTransfer {
        source_port: "transfer".to_string(),
        source_channel: "channel-141".to_string(),
        token: Coin::new("uatom", "100"),
        sender: "cosmos1a".to_string(),
        receiver: "osmo1b".to_string(),
        timeout_timestamp: 1_700_000_000_000_000_000,
        memo: Some(String::new()),
    })
}

fn default_fee() -> StdFee {
    StdFee {
        amount: vec![Coin::new("uatom", "500")],
        gas: "200000".to_string(),
    }
}

#[tokio::test]
async fn test_transfer_pipeline_embeds_account_state_and_strips_empty_memo() {
    let encoder = TransactionEncoder::new(ChainRegistry::new(), FixedAccounts);
    let signer = software_signer("cosmoshub");

    let encoded = encoder
        .build_and_encode(
            &signer,
            "cosmoshub",
            "cosmos1a",
            ibc_transfer_with_empty_memo(),
            default_fee(),
            String::new(),
        )
        .await
        .unwrap();

    let auth_info: AuthInfo = bincode::deserialize(&encoded.tx_raw.auth_info_bytes).unwrap();
    assert_eq!(auth_info.signer_infos.len(), 1);
    assert_eq!(auth_info.signer_infos[0].sequence, 4);
    assert_eq!(auth_info.fee.gas_limit, 200000);

    let body: TxBody = bincode::deserialize(&encoded.tx_raw.body_bytes).unwrap();
    assert_eq!(body.messages.len(), 1);
    assert_eq!(
        body.messages[0].type_url,
        "/ibc.applications.transfer.v1.MsgTransfer"
    );

    // 空内嵌 memo 整体剥离：解码回来必须是 None 而非 Some("")
    let transfer: MsgIbcTransfer = bincode::deserialize(&body.messages[0].value).unwrap();
    assert_eq!(transfer.memo, None);
    assert_eq!(transfer.receiver, "osmo1b");

    assert_eq!(encoded.tx_raw.signatures.len(), 1);
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&encoded.encoded)
        .unwrap();
    assert_eq!(decoded, encoded.tx_raw.to_bytes().unwrap());
}

#[tokio::test]
async fn test_pipeline_is_deterministic() {
    let encoder = TransactionEncoder::new(ChainRegistry::new(), FixedAccounts);
    let signer = software_signer("cosmoshub");

    let message = WalletMessage::Send(MsgSend {
        from_address: "cosmos1a".to_string(),
        to_address: "cosmos1b".to_string(),
        amount: vec![Coin::new("uatom", "100")],
    });

    let first = encoder
        .build_and_encode(
            &signer,
            "cosmoshub",
            "cosmos1a",
            message.clone(),
            default_fee(),
            "note".to_string(),
        )
        .await
        .unwrap();
    let second = encoder
        .build_and_encode(
            &signer,
            "cosmoshub",
            "cosmos1a",
            message,
            default_fee(),
            "note".to_string(),
        )
        .await
        .unwrap();

    assert_eq!(first.encoded, second.encoded);
}

#[tokio::test]
async fn test_hardware_direct_envelope_is_passed_through() {
    let device = Arc::new(MockDevice::new());
    device.unlock(DeviceApp::Cosmos);
    let tx_raw = ironforge_core::domain::tx::TxRaw {
        body_bytes: vec![1, 2, 3],
        auth_info_bytes: vec![4, 5, 6],
        signatures: vec![vec![7; 64]],
    };
    device.set_direct_response(tx_raw.clone());

    let signer = HardwareSigner::new(
        device,
        DeviceApp::Cosmos,
        DeviceConfig {
            poll_interval_ms: 10,
            poll_timeout_ms: 500,
            enumeration_batch: 5,
        },
    );

    let encoder = TransactionEncoder::new(ChainRegistry::new(), FixedAccounts);
    let encoded = encoder
        .build_and_encode(
            &signer,
            "cosmoshub",
            "cosmos1a",
            ibc_transfer_with_empty_memo(),
            default_fee(),
            String::new(),
        )
        .await
        .unwrap();

    assert_eq!(encoded.tx_raw, tx_raw);
}

#[tokio::test]
async fn test_hardware_rejection_surfaces_as_user_rejected() {
    let device = Arc::new(MockDevice::new());
    device.unlock(DeviceApp::Cosmos);
    device.set_reject_signing(true);

    let signer = HardwareSigner::new(
        device,
        DeviceApp::Cosmos,
        DeviceConfig {
            poll_interval_ms: 10,
            poll_timeout_ms: 500,
            enumeration_batch: 5,
        },
    );

    let encoder = TransactionEncoder::new(ChainRegistry::new(), FixedAccounts);
    let err = encoder
        .build_and_encode(
            &signer,
            "cosmoshub",
            "cosmos1a",
            ibc_transfer_with_empty_memo(),
            default_fee(),
            String::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::UserRejected));
}

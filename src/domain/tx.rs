//! 交易文档与信封类型
//!
//! 两套互不兼容的签名信封：
//! - Amino 文档：人类可读的中间表示，canonical JSON（键排序、无空格）后做摘要
//! - 二进制信封：紧凑 wire 格式（TxBody/AuthInfo/TxRaw），bincode 定长字段序，
//!   同一输入重复编码字节级一致

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// 币额
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 结构化消息
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 银行转账
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Vec<Coin>,
}

/// IBC 转账
///
/// memo 为消息自带的可选子字段（区别于交易级 memo）。
/// amino 文档中为空时整体省略键（由转换器处理，下游摘要对字段
/// 存在性敏感）；二进制编码始终携带 Option 标记，保证可逆。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgIbcTransfer {
    pub source_port: String,
    pub source_channel: String,
    pub token: Coin,
    pub sender: String,
    pub receiver: String,
    pub timeout_timestamp: u64,
    #[serde(default)]
    pub memo: Option<String>,
}

/// 智能合约执行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgExecuteContract {
    pub sender: String,
    pub contract: String,
    pub msg: serde_json::Value,
    pub funds: Vec<Coin>,
}

/// 链特定 token-bridge 转换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgConvertCoin {
    pub coin: Coin,
    pub receiver: String,
    pub sender: String,
}

/// 钱包支持的消息类型（封闭集合，转换表按 type_url 分发）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalletMessage {
    Send(MsgSend),
    IbcTransfer(MsgIbcTransfer),
    ExecuteContract(MsgExecuteContract),
    ConvertCoin(MsgConvertCoin),
}

impl WalletMessage {
    /// 二进制编码的类型标识
    pub fn type_url(&self) -> &'static str {
        match self {
            WalletMessage::Send(_) => "/cosmos.bank.v1beta1.MsgSend",
            WalletMessage::IbcTransfer(_) => "/ibc.applications.transfer.v1.MsgTransfer",
            WalletMessage::ExecuteContract(_) => "/cosmwasm.wasm.v1.MsgExecuteContract",
            WalletMessage::ConvertCoin(_) => "/evmos.erc20.v1.MsgConvertCoin",
        }
    }

    /// Amino 文档的类型标识
    pub fn amino_type(&self) -> &'static str {
        match self {
            WalletMessage::Send(_) => "cosmos-sdk/MsgSend",
            WalletMessage::IbcTransfer(_) => "cosmos-sdk/MsgTransfer",
            WalletMessage::ExecuteContract(_) => "wasm/MsgExecuteContract",
            WalletMessage::ConvertCoin(_) => "evmos/MsgConvertCoin",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Amino 签名文档
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Amino 消息（类型标识 + JSON value）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AminoMsg {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: serde_json::Value,
}

/// Amino 费用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

/// Amino 签名文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdSignDoc {
    pub chain_id: String,
    pub account_number: String,
    pub sequence: String,
    pub fee: StdFee,
    pub msgs: Vec<AminoMsg>,
    pub memo: String,
}

impl StdSignDoc {
    /// canonical JSON 字节：键排序、无空格
    ///
    /// serde_json 默认 Map 为 BTreeMap，经 to_value 中转后键即有序。
    pub fn canonical_bytes(&self) -> CoreResult<Vec<u8>> {
        let value = serde_json::to_value(self).map_err(|e| CoreError::EncodingError {
            type_url: "std_sign_doc".to_string(),
            reason: e.to_string(),
        })?;
        serde_json::to_vec(&value).map_err(|e| CoreError::EncodingError {
            type_url: "std_sign_doc".to_string(),
            reason: e.to_string(),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 二进制信封
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 类型标识 + 二进制值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyMsg {
    pub type_url: String,
    pub value: Vec<u8>,
}

/// 交易体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBody {
    pub messages: Vec<AnyMsg>,
    pub memo: String,
    pub timeout_height: u64,
}

/// 签名模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignMode {
    /// 标准 amino 摘要（sha256(canonical JSON)）
    Amino,
    /// EIP-191 personal-message 前缀 + keccak256
    Eip191,
    /// 已组装的二进制文档
    Direct,
}

/// 公钥（按曲线区分 type_url）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PubKeyData {
    Secp256k1(Vec<u8>),
    EthSecp256k1(Vec<u8>),
    Ed25519(Vec<u8>),
}

impl PubKeyData {
    pub fn type_url(&self) -> &'static str {
        match self {
            PubKeyData::Secp256k1(_) => "/cosmos.crypto.secp256k1.PubKey",
            PubKeyData::EthSecp256k1(_) => "/ethermint.crypto.v1.ethsecp256k1.PubKey",
            PubKeyData::Ed25519(_) => "/cosmos.crypto.ed25519.PubKey",
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            PubKeyData::Secp256k1(b) | PubKeyData::EthSecp256k1(b) | PubKeyData::Ed25519(b) => b,
        }
    }

    pub fn to_any(&self) -> AnyMsg {
        AnyMsg {
            type_url: self.type_url().to_string(),
            value: self.bytes().to_vec(),
        }
    }
}

/// 单个签名者信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    pub public_key: AnyMsg,
    pub mode: SignMode,
    pub sequence: u64,
}

/// 二进制费用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeInfo {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
    pub payer: String,
    pub granter: String,
}

/// 授权信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub signer_infos: Vec<SignerInfo>,
    pub fee: FeeInfo,
}

/// 最终 wire 格式交易
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRaw {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub signatures: Vec<Vec<u8>>,
}

impl TxRaw {
    /// 序列化为 wire 字节（bincode 定长字段序，确定性编码）
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CoreError::EncodingError {
            type_url: "tx_raw".to_string(),
            reason: e.to_string(),
        })
    }

    /// 传输安全的 base64 编码
    pub fn to_base64(&self) -> CoreResult<String> {
        let bytes = self.to_bytes()?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

/// 签名数据（公钥 + 签名字节）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureData {
    pub pub_key: PubKeyData,
    pub signature: Vec<u8>,
}

/// 签名结果信封（封闭和类型，编码器必须穷尽匹配）
#[derive(Debug, Clone, PartialEq)]
pub enum SignedEnvelope {
    /// amino 路径：签名后的文档 + 分离的签名
    AminoSigned {
        signed_doc: StdSignDoc,
        signature: SignatureData,
    },
    /// 后端直接产出的二进制信封（部分硬件流程）
    DirectSigned { tx_raw: TxRaw },
}

/// 签名请求上下文
#[derive(Debug, Clone)]
pub struct SignRequest {
    pub message: WalletMessage,
    pub fee: StdFee,
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub memo: String,
}

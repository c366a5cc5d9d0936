//! 消息类型注册表与 amino 转换表
//!
//! 两张查找表：
//! - AminoConverterTable：结构化消息 -> amino 文档消息（基础转换 +
//!   智能合约执行转换 + token-bridge 转换合并为一张表）
//! - MsgTypeRegistry：type_url -> (encode, decode) 编解码对，
//!   构造时注册默认类型，非默认类型按需注册

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::tx::{
    AminoMsg, MsgConvertCoin, MsgExecuteContract, MsgIbcTransfer, MsgSend, WalletMessage,
};
use crate::error::{CoreError, CoreResult};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Amino 转换表
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

type AminoConverterFn = fn(&WalletMessage) -> CoreResult<AminoMsg>;

/// 结构化消息到 amino 消息的转换表
pub struct AminoConverterTable {
    converters: HashMap<&'static str, AminoConverterFn>,
}

impl AminoConverterTable {
    /// 基础转换 + 合约执行 + token-bridge 转换合并成一张表
    pub fn with_defaults() -> Self {
        let mut table = Self {
            converters: HashMap::new(),
        };
        // 基础模块
        table.register("/cosmos.bank.v1beta1.MsgSend", convert_send);
        table.register(
            "/ibc.applications.transfer.v1.MsgTransfer",
            convert_ibc_transfer,
        );
        // 智能合约模块
        table.register("/cosmwasm.wasm.v1.MsgExecuteContract", convert_execute);
        // token-bridge 模块
        table.register("/evmos.erc20.v1.MsgConvertCoin", convert_bridge);
        table
    }

    pub fn register(&mut self, type_url: &'static str, converter: AminoConverterFn) {
        self.converters.insert(type_url, converter);
    }

    /// 转换一条消息；未注册类型报 EncodingError 并携带 type_url
    pub fn convert(&self, message: &WalletMessage) -> CoreResult<AminoMsg> {
        let type_url = message.type_url();
        let converter = self
            .converters
            .get(type_url)
            .ok_or_else(|| CoreError::EncodingError {
                type_url: type_url.to_string(),
                reason: "no amino converter registered".to_string(),
            })?;
        converter(message)
    }
}

impl Default for AminoConverterTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn to_amino_value<T: Serialize>(kind: &str, value: &T) -> CoreResult<AminoMsg> {
    Ok(AminoMsg {
        kind: kind.to_string(),
        value: serde_json::to_value(value).map_err(|e| CoreError::EncodingError {
            type_url: kind.to_string(),
            reason: e.to_string(),
        })?,
    })
}

fn convert_send(message: &WalletMessage) -> CoreResult<AminoMsg> {
    match message {
        WalletMessage::Send(msg) => to_amino_value(message.amino_type(), msg),
        _ => Err(mismatch(message)),
    }
}

fn convert_ibc_transfer(message: &WalletMessage) -> CoreResult<AminoMsg> {
    match message {
        WalletMessage::IbcTransfer(msg) => {
            let mut amino = to_amino_value(message.amino_type(), msg)?;
            // 空 memo 整体剥离键：此省略规则属于本转换器，只作用于
            // amino 文档，不触及二进制形式
            if let Some(obj) = amino.value.as_object_mut() {
                let strip = match obj.get("memo") {
                    Some(serde_json::Value::Null) => true,
                    Some(serde_json::Value::String(s)) => s.is_empty(),
                    _ => false,
                };
                if strip {
                    obj.remove("memo");
                }
            }
            Ok(amino)
        }
        _ => Err(mismatch(message)),
    }
}

fn convert_execute(message: &WalletMessage) -> CoreResult<AminoMsg> {
    match message {
        WalletMessage::ExecuteContract(msg) => to_amino_value(message.amino_type(), msg),
        _ => Err(mismatch(message)),
    }
}

fn convert_bridge(message: &WalletMessage) -> CoreResult<AminoMsg> {
    match message {
        WalletMessage::ConvertCoin(msg) => to_amino_value(message.amino_type(), msg),
        _ => Err(mismatch(message)),
    }
}

fn mismatch(message: &WalletMessage) -> CoreError {
    CoreError::EncodingError {
        type_url: message.type_url().to_string(),
        reason: "converter/message kind mismatch".to_string(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 类型注册表
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 一个类型的 (encode, decode) 编解码对
pub struct MsgCodec {
    encode: Box<dyn Fn(&serde_json::Value) -> CoreResult<Vec<u8>> + Send + Sync>,
    decode: Box<dyn Fn(&[u8]) -> CoreResult<serde_json::Value> + Send + Sync>,
}

impl MsgCodec {
    pub fn new(
        encode: impl Fn(&serde_json::Value) -> CoreResult<Vec<u8>> + Send + Sync + 'static,
        decode: impl Fn(&[u8]) -> CoreResult<serde_json::Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }

    /// 由类型参数生成编解码对
    pub fn of<T: Serialize + DeserializeOwned>(type_url: &'static str) -> Self {
        Self {
            encode: Box::new(move |value| {
                let typed: T = serde_json::from_value(value.clone()).map_err(|e| {
                    CoreError::EncodingError {
                        type_url: type_url.to_string(),
                        reason: format!("amino value does not match schema: {}", e),
                    }
                })?;
                bincode::serialize(&typed).map_err(|e| CoreError::EncodingError {
                    type_url: type_url.to_string(),
                    reason: e.to_string(),
                })
            }),
            decode: Box::new(move |bytes| {
                let typed: T =
                    bincode::deserialize(bytes).map_err(|e| CoreError::EncodingError {
                        type_url: type_url.to_string(),
                        reason: e.to_string(),
                    })?;
                serde_json::to_value(&typed).map_err(|e| CoreError::EncodingError {
                    type_url: type_url.to_string(),
                    reason: e.to_string(),
                })
            }),
        }
    }
}

/// 合约执行消息的 wire 形式
///
/// 内嵌的 JSON 负载是任意结构，二进制编码要求字段形状固定，
/// 因此固化为 canonical JSON 字节；解码时再展开。
#[derive(Serialize, Deserialize)]
struct ExecuteContractWire {
    sender: String,
    contract: String,
    msg: Vec<u8>,
    funds: Vec<crate::domain::tx::Coin>,
}

fn execute_contract_codec() -> MsgCodec {
    const URL: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";

    MsgCodec::new(
        |value| {
            let typed: MsgExecuteContract = serde_json::from_value(value.clone())
                .map_err(|e| codec_error(URL, format!("amino value does not match schema: {}", e)))?;
            let payload = serde_json::to_vec(&typed.msg)
                .map_err(|e| codec_error(URL, e.to_string()))?;
            let wire = ExecuteContractWire {
                sender: typed.sender,
                contract: typed.contract,
                msg: payload,
                funds: typed.funds,
            };
            bincode::serialize(&wire).map_err(|e| codec_error(URL, e.to_string()))
        },
        |bytes| {
            let wire: ExecuteContractWire =
                bincode::deserialize(bytes).map_err(|e| codec_error(URL, e.to_string()))?;
            let typed = MsgExecuteContract {
                sender: wire.sender,
                contract: wire.contract,
                msg: serde_json::from_slice(&wire.msg)
                    .map_err(|e| codec_error(URL, e.to_string()))?,
                funds: wire.funds,
            };
            serde_json::to_value(&typed).map_err(|e| codec_error(URL, e.to_string()))
        },
    )
}

fn codec_error(type_url: &str, reason: String) -> CoreError {
    CoreError::EncodingError {
        type_url: type_url.to_string(),
        reason,
    }
}

/// 消息类型注册表
///
/// 默认注册基础协议类型；扩展类型（合约执行、token-bridge）
/// 由编码器在编码前按类型标识按需注册。
pub struct MsgTypeRegistry {
    codecs: HashMap<String, MsgCodec>,
    /// amino 类型标识 -> type_url
    amino_to_url: HashMap<String, String>,
}

impl MsgTypeRegistry {
    /// 创建并注册默认类型
    pub fn new() -> Self {
        let mut registry = Self {
            codecs: HashMap::new(),
            amino_to_url: HashMap::new(),
        };
        registry.register::<MsgSend>(
            "/cosmos.bank.v1beta1.MsgSend",
            "cosmos-sdk/MsgSend",
        );
        registry.register::<MsgIbcTransfer>(
            "/ibc.applications.transfer.v1.MsgTransfer",
            "cosmos-sdk/MsgTransfer",
        );
        registry
    }

    /// 按类型标识注册（支持运行时扩展）
    pub fn register<T: Serialize + DeserializeOwned>(
        &mut self,
        type_url: &'static str,
        amino_type: &str,
    ) {
        self.register_codec(type_url, amino_type, MsgCodec::of::<T>(type_url));
    }

    /// 注册自定义编解码对
    pub fn register_codec(&mut self, type_url: &str, amino_type: &str, codec: MsgCodec) {
        self.codecs.insert(type_url.to_string(), codec);
        self.amino_to_url
            .insert(amino_type.to_string(), type_url.to_string());
    }

    pub fn contains(&self, type_url: &str) -> bool {
        self.codecs.contains_key(type_url)
    }

    /// amino 类型标识解析为 type_url
    pub fn resolve_amino(&self, amino_type: &str) -> Option<&str> {
        self.amino_to_url.get(amino_type).map(String::as_str)
    }

    /// 编码一个 amino value 为二进制
    pub fn encode(&self, type_url: &str, value: &serde_json::Value) -> CoreResult<Vec<u8>> {
        let codec = self
            .codecs
            .get(type_url)
            .ok_or_else(|| CoreError::EncodingError {
                type_url: type_url.to_string(),
                reason: "unregistered type".to_string(),
            })?;
        (codec.encode)(value)
    }

    /// 解码二进制为 amino value
    pub fn decode(&self, type_url: &str, bytes: &[u8]) -> CoreResult<serde_json::Value> {
        let codec = self
            .codecs
            .get(type_url)
            .ok_or_else(|| CoreError::EncodingError {
                type_url: type_url.to_string(),
                reason: "unregistered type".to_string(),
            })?;
        (codec.decode)(bytes)
    }

    /// 确保扩展类型已注册（编码前的按需注册入口）
    pub fn ensure_extension(&mut self, amino_type: &str) -> CoreResult<()> {
        if self.resolve_amino(amino_type).is_some() {
            return Ok(());
        }
        match amino_type {
            "wasm/MsgExecuteContract" => {
                self.register_codec(
                    "/cosmwasm.wasm.v1.MsgExecuteContract",
                    "wasm/MsgExecuteContract",
                    execute_contract_codec(),
                );
                Ok(())
            }
            "evmos/MsgConvertCoin" => {
                self.register::<MsgConvertCoin>(
                    "/evmos.erc20.v1.MsgConvertCoin",
                    "evmos/MsgConvertCoin",
                );
                Ok(())
            }
            other => Err(CoreError::EncodingError {
                type_url: other.to_string(),
                reason: "unknown amino type".to_string(),
            }),
        }
    }
}

impl Default for MsgTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tx::Coin;

    #[test]
    fn test_send_conversion() {
        let table = AminoConverterTable::with_defaults();
        let message = WalletMessage::Send(MsgSend {
            from_address: "cosmos1a".to_string(),
            to_address: "cosmos1b".to_string(),
            amount: vec![Coin::new("uatom", "100")],
        });

        let amino = table.convert(&message).unwrap();
        assert_eq!(amino.kind, "cosmos-sdk/MsgSend");
        assert_eq!(amino.value.get("from_address").unwrap(), "cosmos1a");
    }

    #[test]
    fn test_empty_embedded_memo_stripped() {
        let table = AminoConverterTable::with_defaults();
        let message = WalletMessage::IbcTransfer(MsgIbcTransfer {
            source_port: "transfer".to_string(),
            source_channel: "channel-141".to_string(),
            token: Coin::new("uatom", "100"),
            sender: "cosmos1a".to_string(),
            receiver: "osmo1b".to_string(),
            timeout_timestamp: 0,
            memo: Some(String::new()),
        });

        let amino = table.convert(&message).unwrap();
        // 序列化结构中完全不含 memo 键，而非键存在值为空
        assert!(amino.value.get("memo").is_none());
    }

    #[test]
    fn test_non_empty_memo_preserved() {
        let table = AminoConverterTable::with_defaults();
        let message = WalletMessage::IbcTransfer(MsgIbcTransfer {
            source_port: "transfer".to_string(),
            source_channel: "channel-141".to_string(),
            token: Coin::new("uatom", "100"),
            sender: "cosmos1a".to_string(),
            receiver: "osmo1b".to_string(),
            timeout_timestamp: 0,
            memo: Some("forward".to_string()),
        });

        let amino = table.convert(&message).unwrap();
        assert_eq!(amino.value.get("memo").unwrap(), "forward");
    }

    #[test]
    fn test_registry_round_trip() {
        let registry = MsgTypeRegistry::new();
        let value = serde_json::json!({
            "from_address": "cosmos1a",
            "to_address": "cosmos1b",
            "amount": [{"denom": "uatom", "amount": "42"}]
        });

        let bytes = registry.encode("/cosmos.bank.v1beta1.MsgSend", &value).unwrap();
        let back = registry.decode("/cosmos.bank.v1beta1.MsgSend", &bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_transfer_codec_round_trips_without_memo() {
        let registry = MsgTypeRegistry::new();
        // 转换器剥离空 memo 后的 amino value 没有 memo 键
        let value = serde_json::json!({
            "source_port": "transfer",
            "source_channel": "channel-141",
            "token": {"denom": "uatom", "amount": "100"},
            "sender": "cosmos1a",
            "receiver": "osmo1b",
            "timeout_timestamp": 0
        });

        let url = "/ibc.applications.transfer.v1.MsgTransfer";
        let bytes = registry.encode(url, &value).unwrap();
        let back = registry.decode(url, &bytes).unwrap();

        assert_eq!(back.get("receiver").unwrap(), "osmo1b");
        assert_eq!(back.get("token").unwrap().get("amount").unwrap(), "100");
        // 二进制形式保留 Option 标记，解码回来 memo 为空值
        assert!(back.get("memo").map(|m| m.is_null()).unwrap_or(true));
    }

    #[test]
    fn test_execute_contract_codec_round_trips() {
        let mut registry = MsgTypeRegistry::new();
        registry.ensure_extension("wasm/MsgExecuteContract").unwrap();

        let value = serde_json::json!({
            "sender": "cosmos1a",
            "contract": "cosmos1contract",
            "msg": {"transfer": {"recipient": "cosmos1b", "amount": "5"}},
            "funds": [{"denom": "uatom", "amount": "1"}]
        });

        let url = "/cosmwasm.wasm.v1.MsgExecuteContract";
        let bytes = registry.encode(url, &value).unwrap();
        let back = registry.decode(url, &bytes).unwrap();

        // 内嵌 JSON 负载经 wire 形式往返后保持原结构
        assert_eq!(back, value);
    }

    #[test]
    fn test_convert_coin_codec_round_trips() {
        let mut registry = MsgTypeRegistry::new();
        registry.ensure_extension("evmos/MsgConvertCoin").unwrap();

        let value = serde_json::json!({
            "coin": {"denom": "erc20/0xabc", "amount": "10"},
            "receiver": "0x9858EfFD232B4033E47d90003D41EC34EcaEda94",
            "sender": "cosmos1a"
        });

        let url = "/evmos.erc20.v1.MsgConvertCoin";
        let bytes = registry.encode(url, &value).unwrap();
        assert_eq!(registry.decode(url, &bytes).unwrap(), value);
    }

    #[test]
    fn test_unregistered_type_carries_url() {
        let registry = MsgTypeRegistry::new();
        let err = registry
            .encode("/cosmwasm.wasm.v1.MsgExecuteContract", &serde_json::json!({}))
            .unwrap_err();
        match err {
            CoreError::EncodingError { type_url, .. } => {
                assert_eq!(type_url, "/cosmwasm.wasm.v1.MsgExecuteContract");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_on_demand_extension_registration() {
        let mut registry = MsgTypeRegistry::new();
        assert!(!registry.contains("/evmos.erc20.v1.MsgConvertCoin"));

        registry.ensure_extension("evmos/MsgConvertCoin").unwrap();
        assert!(registry.contains("/evmos.erc20.v1.MsgConvertCoin"));
        assert_eq!(
            registry.resolve_amino("evmos/MsgConvertCoin"),
            Some("/evmos.erc20.v1.MsgConvertCoin")
        );
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let mut registry = MsgTypeRegistry::new();
        assert!(registry.ensure_extension("unknown/MsgNope").is_err());
    }
}

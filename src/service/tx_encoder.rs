//! 交易构建与编码
//!
//! 流水线：查询账户 -> amino 转换 -> 组装签名文档 -> 签名 ->
//! 组装二进制信封 -> base64。同一输入必须产出逐字节相同的结果。

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::chain_config::{ChainRegistry, CurveType};
use crate::domain::tx::{
    AnyMsg, AuthInfo, FeeInfo, SignMode, SignedEnvelope, SignerInfo, StdFee, StdSignDoc, TxBody,
    TxRaw, WalletMessage,
};
use crate::error::{CoreError, CoreResult};
use crate::service::msg_registry::{AminoConverterTable, MsgTypeRegistry};
use crate::service::signer::Signer;

/// 链上账户信息（签名文档必须嵌入实时值）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// 账户信息来源
#[async_trait]
pub trait AccountInfoSource: Send + Sync {
    async fn get_account(&self, chain_key: &str, address: &str) -> CoreResult<AccountInfo>;
}

/// 编码产物
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTx {
    pub tx_raw: TxRaw,
    /// 传输用 base64
    pub encoded: String,
}

/// 交易编码器
pub struct TransactionEncoder<A: AccountInfoSource> {
    registry: ChainRegistry,
    accounts: A,
    converters: AminoConverterTable,
    /// 按需注册扩展类型，锁短暂持有且不跨 await
    types: Mutex<MsgTypeRegistry>,
}

impl<A: AccountInfoSource> TransactionEncoder<A> {
    pub fn new(registry: ChainRegistry, accounts: A) -> Self {
        Self {
            registry,
            accounts,
            converters: AminoConverterTable::with_defaults(),
            types: Mutex::new(MsgTypeRegistry::new()),
        }
    }

    /// 构建、签名并编码一笔交易
    pub async fn build_and_encode(
        &self,
        signer: &dyn Signer,
        chain_key: &str,
        sender_address: &str,
        message: WalletMessage,
        fee: StdFee,
        memo: String,
    ) -> CoreResult<EncodedTx> {
        let config = self
            .registry
            .get(chain_key)
            .ok_or_else(|| CoreError::UnsupportedCurve {
                chain: chain_key.to_string(),
            })?;

        // 每次构建都取实时账户信息，绝不缓存序列号
        let account = self
            .accounts
            .get_account(chain_key, sender_address)
            .await?;

        let amino = self.converters.convert(&message)?;
        {
            let mut types = self.types.lock().map_err(|_| {
                CoreError::Store("message type registry lock poisoned".to_string())
            })?;
            types.ensure_extension(&amino.kind)?;
        }

        let doc = StdSignDoc {
            chain_id: config.chain_id.clone(),
            account_number: account.account_number.to_string(),
            sequence: account.sequence.to_string(),
            fee,
            msgs: vec![amino],
            memo,
        };

        let mode = match config.curve_type {
            CurveType::EthSecp256k1 => SignMode::Eip191,
            CurveType::Secp256k1 | CurveType::Ed25519 => SignMode::Amino,
        };

        tracing::debug!(
            chain = chain_key,
            sequence = account.sequence,
            ?mode,
            "signing transaction"
        );

        let tx_raw = match signer.sign(&doc, mode).await? {
            SignedEnvelope::AminoSigned {
                signed_doc,
                signature,
            } => {
                let messages = {
                    let types = self.types.lock().map_err(|_| {
                        CoreError::Store("message type registry lock poisoned".to_string())
                    })?;
                    signed_doc
                        .msgs
                        .iter()
                        .map(|m| {
                            let type_url = types.resolve_amino(&m.kind).ok_or_else(|| {
                                CoreError::EncodingError {
                                    type_url: m.kind.clone(),
                                    reason: "amino kind not mapped to a type url".to_string(),
                                }
                            })?;
                            Ok(AnyMsg {
                                type_url: type_url.to_string(),
                                value: types.encode(type_url, &m.value)?,
                            })
                        })
                        .collect::<CoreResult<Vec<_>>>()?
                };

                let body = TxBody {
                    messages,
                    memo: signed_doc.memo.clone(),
                    timeout_height: 0,
                };

                let gas_limit = signed_doc.fee.gas.parse::<u64>().map_err(|e| {
                    CoreError::EncodingError {
                        type_url: "fee".to_string(),
                        reason: format!("invalid gas amount: {}", e),
                    }
                })?;
                let auth_info = AuthInfo {
                    signer_infos: vec![SignerInfo {
                        public_key: signature.pub_key.to_any(),
                        mode,
                        sequence: account.sequence,
                    }],
                    fee: FeeInfo {
                        amount: signed_doc.fee.amount.clone(),
                        gas_limit,
                        payer: String::new(),
                        granter: String::new(),
                    },
                };

                TxRaw {
                    body_bytes: encode_section("tx_body", &body)?,
                    auth_info_bytes: encode_section("auth_info", &auth_info)?,
                    signatures: vec![signature.signature],
                }
            }
            // 后端已经组装好的信封原样透传
            SignedEnvelope::DirectSigned { tx_raw } => tx_raw,
        };

        let encoded = tx_raw.to_base64()?;
        Ok(EncodedTx { tx_raw, encoded })
    }
}

fn encode_section<T: Serialize>(label: &str, value: &T) -> CoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| CoreError::EncodingError {
        type_url: label.to_string(),
        reason: e.to_string(),
    })
}

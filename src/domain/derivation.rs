//! 钱包派生策略
//!
//! 为不同的加密曲线提供统一的地址/公钥派生接口。
//! 前缀派生链不重新派生密钥，仅对来源链地址做 bech32 前缀重编码。

use bip39::{Language, Mnemonic};
use coins_bip32::path::DerivationPath;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;
use zeroize::Zeroizing;

use crate::domain::chain_config::{AddressFormat, ChainConfig, ChainRegistry, CurveType};
use crate::domain::path::HdPath;
use crate::domain::wallet::DerivedAccount;
use crate::error::{CoreError, CoreResult};

/// 密钥来源（软件钱包）
///
/// 硬件设备不经过此类型，由 HardwareEnumerator 走会话枚举。
#[derive(Clone)]
pub enum SecretSource {
    /// BIP39 助记词
    Mnemonic(Zeroizing<String>),
    /// 导入的裸私钥（hex）
    PrivateKeyHex(Zeroizing<String>),
}

impl SecretSource {
    pub fn from_mnemonic(phrase: impl Into<String>) -> Self {
        Self::Mnemonic(Zeroizing::new(phrase.into()))
    }

    pub fn from_private_key_hex(hex_key: impl Into<String>) -> Self {
        Self::PrivateKeyHex(Zeroizing::new(hex_key.into()))
    }
}

/// 派生策略 trait
pub trait DerivationStrategy: Send + Sync {
    /// 派生某链的地址和公钥
    fn derive_account(
        &self,
        secret: &SecretSource,
        path: &HdPath,
        config: &ChainConfig,
    ) -> CoreResult<DerivedAccount>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// secp256k1 私钥解析（Cosmos / Ethereum 系共用）
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub(crate) fn secp256k1_key(
    secret: &SecretSource,
    path: &HdPath,
    config: &ChainConfig,
) -> CoreResult<k256::ecdsa::SigningKey> {
    use coins_bip32::prelude::*;

    match secret {
        SecretSource::Mnemonic(phrase) => {
            let mnemonic = Mnemonic::parse_in(Language::English, phrase.as_str()).map_err(
                |e| CoreError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("invalid mnemonic: {}", e),
                },
            )?;
            let seed = Zeroizing::new(mnemonic.to_seed(""));

            let absolute = path.to_absolute(config.coin_type);
            let derivation_path =
                absolute
                    .parse::<DerivationPath>()
                    .map_err(|e| CoreError::InvalidPath {
                        path: absolute.clone(),
                        reason: e.to_string(),
                    })?;

            let master_key = XPriv::root_from_seed(seed.as_ref(), None).map_err(|e| {
                CoreError::InvalidPath {
                    path: absolute.clone(),
                    reason: format!("master key derivation failed: {}", e),
                }
            })?;
            let derived_key =
                master_key
                    .derive_path(&derivation_path)
                    .map_err(|e| CoreError::InvalidPath {
                        path: absolute,
                        reason: format!("key derivation failed: {}", e),
                    })?;

            let signing_key: &k256::ecdsa::SigningKey = derived_key.as_ref();
            Ok(signing_key.clone())
        }
        SecretSource::PrivateKeyHex(hex_key) => {
            let bytes = Zeroizing::new(hex::decode(hex_key.trim().trim_start_matches("0x"))
                .map_err(|e| CoreError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("invalid private key hex: {}", e),
                })?);
            k256::ecdsa::SigningKey::from_slice(&bytes).map_err(|e| CoreError::InvalidPath {
                path: path.to_string(),
                reason: format!("invalid private key: {}", e),
            })
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cosmos 标准地址策略（ripemd160(sha256(pubkey)) + bech32）
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct CosmosSecp256k1Strategy;

impl DerivationStrategy for CosmosSecp256k1Strategy {
    fn derive_account(
        &self,
        secret: &SecretSource,
        path: &HdPath,
        config: &ChainConfig,
    ) -> CoreResult<DerivedAccount> {
        let prefix = config
            .bech32_prefix
            .as_deref()
            .ok_or_else(|| CoreError::UnsupportedCurve {
                chain: config.chain_key.clone(),
            })?;

        let signing_key = secp256k1_key(secret, path, config)?;
        let verifying_key = signing_key.verifying_key();
        let compressed = verifying_key.to_encoded_point(true);

        let address = cosmos_address(compressed.as_bytes(), prefix)?;

        Ok(DerivedAccount {
            address,
            pub_key: hex::encode(compressed.as_bytes()),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ethereum 风格地址策略（keccak payload，hex 或 bech32 编码）
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct EthSecp256k1Strategy;

impl DerivationStrategy for EthSecp256k1Strategy {
    fn derive_account(
        &self,
        secret: &SecretSource,
        path: &HdPath,
        config: &ChainConfig,
    ) -> CoreResult<DerivedAccount> {
        let signing_key = secp256k1_key(secret, path, config)?;
        let verifying_key = signing_key.verifying_key();
        let uncompressed = verifying_key.to_encoded_point(false);
        let compressed = verifying_key.to_encoded_point(true);

        // keccak256(未压缩公钥去掉 0x04 前缀) 的后 20 字节
        let hash = Keccak256::digest(&uncompressed.as_bytes()[1..]);
        let payload = &hash[12..];

        let address = match config.address_format {
            AddressFormat::Hex => eip55_checksum(payload),
            AddressFormat::Bech32 => {
                let prefix =
                    config
                        .bech32_prefix
                        .as_deref()
                        .ok_or_else(|| CoreError::UnsupportedCurve {
                            chain: config.chain_key.clone(),
                        })?;
                encode_bech32(payload, prefix)?
            }
        };

        Ok(DerivedAccount {
            address,
            pub_key: hex::encode(compressed.as_bytes()),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ed25519 策略
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Ed25519Strategy;

impl DerivationStrategy for Ed25519Strategy {
    fn derive_account(
        &self,
        secret: &SecretSource,
        path: &HdPath,
        config: &ChainConfig,
    ) -> CoreResult<DerivedAccount> {
        use ed25519_dalek::SigningKey;

        // 复用 secp256k1 派生得到 32 字节密钥材料，再转 ed25519 密钥对
        let k256_key = secp256k1_key(secret, path, config)?;
        let key_bytes: [u8; 32] = k256_key.to_bytes().into();
        let signing_key = SigningKey::from_bytes(&key_bytes);
        let public_key = signing_key.verifying_key().to_bytes();

        // implicit account：地址即公钥 hex
        Ok(DerivedAccount {
            address: hex::encode(public_key),
            pub_key: hex::encode(public_key),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 策略工厂
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct DerivationStrategyFactory;

impl DerivationStrategyFactory {
    pub fn create_strategy(curve_type: CurveType) -> Box<dyn DerivationStrategy> {
        match curve_type {
            CurveType::Secp256k1 => Box::new(CosmosSecp256k1Strategy),
            CurveType::EthSecp256k1 => Box::new(EthSecp256k1Strategy),
            CurveType::Ed25519 => Box::new(Ed25519Strategy),
        }
    }
}

/// 地址派生器：组合注册表和策略，处理前缀派生链
pub struct AddressDeriver {
    registry: ChainRegistry,
}

impl AddressDeriver {
    pub fn new(registry: ChainRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// 派生某链的账户
    ///
    /// 前缀派生链：先取来源链账户，再做前缀重编码，公钥不变。
    pub fn derive(
        &self,
        secret: &SecretSource,
        path: &HdPath,
        chain_key: &str,
    ) -> CoreResult<DerivedAccount> {
        let config = self
            .registry
            .get(chain_key)
            .ok_or_else(|| CoreError::UnsupportedCurve {
                chain: chain_key.to_string(),
            })?;

        if let Some(source_key) = &config.derived_from {
            let source_account = self.derive(secret, path, source_key)?;
            let prefix =
                config
                    .bech32_prefix
                    .as_deref()
                    .ok_or_else(|| CoreError::UnsupportedCurve {
                        chain: chain_key.to_string(),
                    })?;
            let address = transform_prefix(&source_account.address, prefix)?;
            return Ok(DerivedAccount {
                address,
                pub_key: source_account.pub_key,
            });
        }

        let strategy = DerivationStrategyFactory::create_strategy(config.curve_type);
        strategy.derive_account(secret, path, config)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 地址编码
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cosmos 标准地址：bech32(ripemd160(sha256(压缩公钥)))
pub fn cosmos_address(compressed_pubkey: &[u8], prefix: &str) -> CoreResult<String> {
    let sha = Sha256::digest(compressed_pubkey);
    let payload = Ripemd160::digest(sha);
    encode_bech32(&payload, prefix)
}

/// EIP-55 checksum 地址
pub fn eip55_checksum(payload: &[u8]) -> String {
    let lower = hex::encode(payload);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Bech32 编码
pub fn encode_bech32(payload: &[u8], prefix: &str) -> CoreResult<String> {
    let hrp = bech32::Hrp::parse(prefix).map_err(|e| CoreError::InvalidAddress(format!(
        "invalid prefix {}: {:?}",
        prefix, e
    )))?;
    bech32::encode::<bech32::Bech32>(hrp, payload)
        .map_err(|e| CoreError::InvalidAddress(format!("bech32 encoding failed: {}", e)))
}

/// Bech32 解码，返回（前缀，payload）
pub fn decode_bech32(address: &str) -> CoreResult<(String, Vec<u8>)> {
    let (hrp, payload) = bech32::decode(address)
        .map_err(|e| CoreError::InvalidAddress(format!("bech32 decode failed: {}", e)))?;
    Ok((hrp.to_string(), payload))
}

/// 地址前缀变换：decode 后用目标前缀重编码，payload 不变
pub fn transform_prefix(address: &str, target_prefix: &str) -> CoreResult<String> {
    let (_, payload) = decode_bech32(address)?;
    encode_bech32(&payload, target_prefix)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 助记词生成（仅测试和开发工具）
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(any(test, feature = "dev-tools"))]
pub fn generate_mnemonic(word_count: u8) -> CoreResult<String> {
    use rand::RngCore;

    let entropy_bytes = match word_count {
        12 => 16,
        24 => 32,
        _ => {
            return Err(CoreError::InvalidPath {
                path: String::new(),
                reason: "word count must be 12 or 24".to_string(),
            })
        }
    };

    let mut entropy = vec![0u8; entropy_bytes];
    rand::thread_rng().fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy).map_err(|e| {
        CoreError::InvalidPath {
            path: String::new(),
            reason: format!("mnemonic generation failed: {}", e),
        }
    })?;
    Ok(mnemonic.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn deriver() -> AddressDeriver {
        AddressDeriver::new(ChainRegistry::new())
    }

    #[test]
    fn test_cosmos_derivation_vector() {
        let secret = SecretSource::from_mnemonic(TEST_MNEMONIC);
        let path = HdPath::parse("0'/0/0").unwrap();

        let account = deriver().derive(&secret, &path, "cosmoshub").unwrap();
        // BIP39 标准测试助记词在 m/44'/118'/0'/0/0 的地址，
        // 独立用 RustCrypto bip32 派生核对过
        assert_eq!(
            account.address,
            "cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4"
        );
        assert_eq!(account.pub_key.len(), 66); // 压缩公钥 33 字节
    }

    #[test]
    fn test_ethereum_derivation_vector() {
        let secret = SecretSource::from_mnemonic(TEST_MNEMONIC);
        let path = HdPath::parse("0'/0/0").unwrap();

        let account = deriver().derive(&secret, &path, "ethereum").unwrap();
        // BIP44 测试向量（EIP-55 大小写）
        assert_eq!(
            account.address,
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
    }

    #[test]
    fn test_prefix_derived_chain_shares_pubkey() {
        let secret = SecretSource::from_mnemonic(TEST_MNEMONIC);
        let path = HdPath::parse("0'/0/0").unwrap();
        let deriver = deriver();

        let hub = deriver.derive(&secret, &path, "cosmoshub").unwrap();
        let osmo = deriver.derive(&secret, &path, "osmosis").unwrap();

        // 公钥相同，地址仅前缀不同
        assert_eq!(hub.pub_key, osmo.pub_key);
        assert!(osmo.address.starts_with("osmo1"));
        assert_eq!(
            transform_prefix(&osmo.address, "cosmos").unwrap(),
            hub.address
        );
    }

    #[test]
    fn test_prefix_round_trip() {
        let secret = SecretSource::from_mnemonic(TEST_MNEMONIC);
        let path = HdPath::parse("0'/0/0").unwrap();
        let account = deriver().derive(&secret, &path, "cosmoshub").unwrap();

        // encode(decode(a), p2) 再转回 p1 应还原
        let as_juno = transform_prefix(&account.address, "juno").unwrap();
        let back = transform_prefix(&as_juno, "cosmos").unwrap();
        assert_eq!(back, account.address);

        // payload 在任意前缀下不变
        let (_, original_payload) = decode_bech32(&account.address).unwrap();
        let (_, juno_payload) = decode_bech32(&as_juno).unwrap();
        assert_eq!(original_payload, juno_payload);
    }

    #[test]
    fn test_different_indices_different_addresses() {
        let secret = SecretSource::from_mnemonic(TEST_MNEMONIC);
        let deriver = deriver();

        let a0 = deriver
            .derive(&secret, &HdPath::parse("0'/0/0").unwrap(), "cosmoshub")
            .unwrap();
        let a1 = deriver
            .derive(&secret, &HdPath::parse("0'/0/1").unwrap(), "cosmoshub")
            .unwrap();
        assert_ne!(a0.address, a1.address);
    }

    #[test]
    fn test_eip55_known_vector() {
        // EIP-55 规范向量
        let payload = hex::decode("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(
            eip55_checksum(&payload),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn test_invalid_mnemonic_rejected() {
        let secret = SecretSource::from_mnemonic("not a valid mnemonic");
        let path = HdPath::parse("0'/0/0").unwrap();
        assert!(deriver().derive(&secret, &path, "cosmoshub").is_err());
    }

    #[test]
    fn test_unsupported_chain_rejected() {
        let secret = SecretSource::from_mnemonic(TEST_MNEMONIC);
        let path = HdPath::parse("0'/0/0").unwrap();
        let err = deriver().derive(&secret, &path, "dogecoin").unwrap_err();
        assert_eq!(err.code(), "unsupported_curve");
    }

    #[test]
    fn test_private_key_import() {
        // 任意有效私钥
        let secret = SecretSource::from_private_key_hex(
            "af1a53abf88f4821840a2934f3facfc8b1827cccd7f2e331375d2faf8c1032d4",
        );
        let path = HdPath::parse("0'/0/0").unwrap();
        let account = deriver().derive(&secret, &path, "cosmoshub").unwrap();
        assert!(account.address.starts_with("cosmos1"));
    }

    #[test]
    fn test_generate_mnemonic_word_counts() {
        let phrase = generate_mnemonic(12).unwrap();
        assert_eq!(phrase.split_whitespace().count(), 12);

        let phrase = generate_mnemonic(24).unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);

        assert!(generate_mnemonic(15).is_err());
    }
}

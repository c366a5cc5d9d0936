//! 钱包库持久化
//!
//! 后备存储是单一 JSON 文档，只提供整篇读/整篇写，无事务保证。
//! 读-改-写的串行化由上层（对账服务的互斥锁）负责。

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::wallet::Keystore;
use crate::error::{CoreError, CoreResult};

/// 钱包库存储接口
#[async_trait]
pub trait KeystoreStore: Send + Sync {
    /// 读取整篇文档；文档不存在时返回空钱包库
    async fn load(&self) -> CoreResult<Keystore>;

    /// 整篇覆盖写入
    async fn save(&self, keystore: &Keystore) -> CoreResult<()>;
}

/// 内存存储（测试用）
pub struct MemoryKeystoreStore {
    inner: Mutex<Keystore>,
}

impl MemoryKeystoreStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Keystore::new()),
        }
    }

    pub fn with_keystore(keystore: Keystore) -> Self {
        Self {
            inner: Mutex::new(keystore),
        }
    }
}

impl Default for MemoryKeystoreStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeystoreStore for MemoryKeystoreStore {
    async fn load(&self) -> CoreResult<Keystore> {
        Ok(self.inner.lock().await.clone())
    }

    async fn save(&self, keystore: &Keystore) -> CoreResult<()> {
        *self.inner.lock().await = keystore.clone();
        Ok(())
    }
}

/// 文件存储
pub struct FileKeystoreStore {
    path: PathBuf,
}

impl FileKeystoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KeystoreStore for FileKeystoreStore {
    async fn load(&self) -> CoreResult<Keystore> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| CoreError::CorruptKeystore(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Keystore::new()),
            Err(e) => Err(CoreError::Store(e.to_string())),
        }
    }

    async fn save(&self, keystore: &Keystore) -> CoreResult<()> {
        let json = serde_json::to_vec_pretty(keystore)
            .map_err(|e| CoreError::Store(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))
    }
}

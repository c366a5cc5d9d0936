//! 钱包库对账
//!
//! 把一次硬件枚举的结果合并进持久化钱包库。整个读-改-写是
//! 互斥临界区；任何一步失败都不写盘，绝不持久化半成品文档。

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::path::HdPath;
use crate::domain::wallet::{DerivationResult, Keystore, WalletRecord};
use crate::error::CoreResult;
use crate::infrastructure::keystore_store::KeystoreStore;

/// 一次对账的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// 写入过至少一条链账户的钱包数
    pub wallets_updated: usize,
    /// 写入的链账户条数
    pub chains_written: usize,
    /// 跳过的钱包数（非硬件、无路径或枚举结果未覆盖）
    pub wallets_skipped: usize,
}

/// 钱包库对账服务
pub struct KeystoreReconciler<S: KeystoreStore> {
    store: Arc<S>,
    /// 对账互斥：读-改-写期间不允许并发对账
    lock: Mutex<()>,
}

impl<S: KeystoreStore> KeystoreReconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// 将枚举结果对账进钱包库
    ///
    /// 只改写硬件钱包记录；结果未覆盖的链保持原值不动。
    /// 同一结果重复对账不产生额外变更。
    pub async fn reconcile(&self, result: &DerivationResult) -> CoreResult<ReconcileReport> {
        let _guard = self.lock.lock().await;

        let mut keystore = self.store.load().await?;
        let mut report = ReconcileReport::default();
        let mut changed = false;

        let ids: Vec<_> = keystore.wallets.keys().copied().collect();
        for id in ids {
            let record = match keystore.wallets.get(&id) {
                Some(r) => r,
                None => continue,
            };

            if !record.wallet_type.is_hardware_backed() {
                report.wallets_skipped += 1;
                continue;
            }

            let Some(stored_path) = record.derivation_path.clone() else {
                tracing::warn!(wallet = %id, "hardware wallet has no derivation path, skipping");
                report.wallets_skipped += 1;
                continue;
            };

            // 历史格式（裸索引数字）在这里归一化
            let path = HdPath::resolve_stored(&stored_path)?;
            let path_key = path.to_string();

            let Some(chains) = result.get_by_path(&path_key) else {
                report.wallets_skipped += 1;
                continue;
            };

            let mut written = 0;
            if let Some(record) = keystore.wallets.get_mut(&id) {
                for (chain_key, account) in chains {
                    if account_matches(record, chain_key, account) {
                        continue;
                    }
                    record.set_chain_account(
                        chain_key,
                        account.address.clone(),
                        account.pub_key.clone(),
                    );
                    written += 1;
                }
            }

            if written > 0 {
                tracing::info!(wallet = %id, chains = written, "reconciled wallet accounts");
                keystore.refresh_active_if(&id);
                report.wallets_updated += 1;
                report.chains_written += written;
                changed = true;
            }
        }

        // 无变更不写盘，保持文档时间戳稳定
        if changed {
            self.store.save(&keystore).await?;
        }

        Ok(report)
    }

    /// 读取当前钱包库快照
    pub async fn snapshot(&self) -> CoreResult<Keystore> {
        self.store.load().await
    }
}

fn account_matches(
    record: &WalletRecord,
    chain_key: &str,
    account: &crate::domain::wallet::DerivedAccount,
) -> bool {
    record.addresses.get(chain_key) == Some(&account.address)
        && record.pub_keys.get(chain_key) == Some(&account.pub_key)
}

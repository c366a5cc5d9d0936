pub mod balance;
pub mod msg_registry;
pub mod reconciler;
pub mod signer;
pub mod tx_encoder;

pub use balance::{BalanceAggregator, BalanceSource, BalanceSummary, ChainBalance};
pub use msg_registry::{AminoConverterTable, MsgCodec, MsgTypeRegistry};
pub use reconciler::{KeystoreReconciler, ReconcileReport};
pub use signer::{eip191_digest, HardwareSigner, Signer, SoftwareSigner};
pub use tx_encoder::{AccountInfo, AccountInfoSource, EncodedTx, TransactionEncoder};

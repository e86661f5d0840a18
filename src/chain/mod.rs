pub mod asset;
pub mod authority;
pub mod betting;
pub mod encoder;
pub mod keys;
pub mod operations;
pub mod registry;
pub mod signer;
pub mod time;
pub mod transaction;

pub use asset::Asset;
pub use authority::Authority;
pub use encoder::{Encode, EncodeError, Encoder, MoneyFormat};
pub use keys::{KeyError, PrivateKey, PublicKey};
pub use operations::{Operation, Operations};
pub use registry::OpKind;
pub use signer::{ref_block_num, ref_block_prefix, ChainId, SignError, TransactionSigner};
pub use time::ChainTime;
pub use transaction::Transaction;

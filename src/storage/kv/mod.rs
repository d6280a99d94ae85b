//! Embedded key-value storage
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ KvStore  (proverb records + tag index)       │
//! ├──────────────────────────────────────────────┤
//! │ KvEngine (BTreeMap + append-only batch log)  │
//! │   codec: length + payload + blake3 frames    │
//! │   lock:  exclusive lock on the directory     │
//! └──────────────────────────────────────────────┘
//! ```

mod codec;
mod engine;
mod lock;
mod store;

pub use engine::{KvEngine, WriteBatch};
pub use lock::FileLock;
pub use store::KvStore;

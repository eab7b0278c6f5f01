// Fast hash maps / sets using AHash instead of the default SipHash.
// Import these throughout the codebase with `use crate::types::{HashMap, HashSet}`.
// Also import `HashMapExt` / `HashSetExt` when you need `::new()` or `::with_capacity()`.
pub type HashMap<K, V> = ahash::HashMap<K, V>;
pub type HashSet<K> = ahash::HashSet<K>;
pub use ahash::HashMapExt;
#[allow(unused_imports)]
pub use ahash::HashSetExt;

/// Stable identifier of a splice-graph edge. Ids are never reused after
/// removal, so maps keyed by `EdgeId` stay valid across graph rewrites.
pub type EdgeId = usize;

//! On-disk meshlet cache: a small fixed binary format keyed by a hash of the
//! source asset path, plus the load/store functions that keep it in sync.
//!
//! Hand-rolled with `to_le_bytes`/`from_le_bytes` (`resources::loaders`
//! parses its BMP headers the same way) rather than reaching for `serde` +
//! `bincode`: the format is a handful of fixed fields with a pinned byte
//! layout, not a serialization graph a derive would help with.

mod format;
mod path;

pub use format::{load, store, CacheError};
pub use path::cache_path;

//! Event Model: canonical event record, canonical-byte encoding, hash
//! chaining (spec §3, §4.1).

mod canonical;
mod model;
mod payload;

pub use canonical::canonical_bytes;
pub use model::{canonical_envelope_bytes, content_hash, Event};
pub use payload::*;

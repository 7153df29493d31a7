//! Collection construction helpers.

use rustc_hash::FxHashMap;

use crate::types::Stage;

/// Creates an empty stage-keyed map with the crate's standard hasher.
#[must_use]
pub fn new_stage_map<V>() -> FxHashMap<Stage, V> {
    FxHashMap::default()
}

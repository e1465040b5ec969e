//! The configuration module for stream construction.

use serde::{Deserialize, Serialize};

use crate::repack::YieldMode;

/// Options fixed at stream construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StreamOptions {
    /// Whether the processor records its history (inputs, outputs, committed
    /// actions) for handlers to read. When false, the null history substrate
    /// is used and every getter returns an empty view.
    /// The default is `false`.
    pub record_history: bool,
    /// How the adapter groups released characters into yielded pieces.
    /// The default is [`YieldMode::Char`].
    pub yield_mode: YieldMode,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            record_history: false,
            yield_mode: YieldMode::Char,
        }
    }
}

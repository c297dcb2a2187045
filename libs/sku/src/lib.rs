//! # epg-sku
//!
//! SKU value types, parsing, and rendering for rental equipment instances.
//!
//! ## SKU Format
//!
//! Every physical equipment instance carries a SKU of the form
//! `{org}-{category}-{brand}-{sequence}`:
//!
//! - `EPG-LGT-CHV-0001` (first Chauvet lighting fixture)
//! - `EPG-AUD-SHR-0042` (42nd Shure audio item)
//!
//! The three prefix segments are exactly [`PREFIX_LEN`] characters of
//! `[A-Z0-9]`. The sequence is zero-padded to the configured width and widens
//! instead of truncating once the padded field is exhausted.
//!
//! ## Guarantees
//!
//! - Parsing is strict: only the canonical rendering of a SKU parses
//! - `parse(render(parts)) == parts` for every sequence >= 1
//! - Prefix types are distinct so a brand code cannot be passed as a category

mod error;
mod format;
mod macros;
mod prefix;

pub use error::SkuError;
pub use format::{
    normalize, Sku, SkuFormat, SkuParts, DEFAULT_ORG_PREFIX, DEFAULT_SEQUENCE_WIDTH,
    MAX_SEQUENCE_WIDTH, SEPARATOR,
};
pub use prefix::*;

//! Prefix code types for the three lettered SKU segments.

use crate::define_prefix;
use crate::SkuError;

/// Width of every prefix segment.
pub const PREFIX_LEN: usize = 3;

define_prefix!(OrgPrefix, "organization");
define_prefix!(CategoryPrefix, "category");
define_prefix!(BrandPrefix, "brand");

/// Checks a prefix candidate and returns its bytes.
///
/// Used by [`define_prefix!`]; not intended to be called directly.
#[doc(hidden)]
pub fn validate_prefix(kind: &'static str, s: &str) -> Result<[u8; PREFIX_LEN], SkuError> {
    let bytes: [u8; PREFIX_LEN] =
        s.as_bytes()
            .try_into()
            .map_err(|_| SkuError::PrefixLength {
                kind,
                expected: PREFIX_LEN,
                value: s.to_string(),
            })?;

    if !bytes
        .iter()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    {
        return Err(SkuError::PrefixCharacters {
            kind,
            value: s.to_string(),
        });
    }

    Ok(bytes)
}

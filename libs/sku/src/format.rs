//! Rendering and parsing of full SKU strings.

use serde::Serialize;

use crate::{BrandPrefix, CategoryPrefix, OrgPrefix, SkuError};

/// Organization prefix used when none is configured.
pub const DEFAULT_ORG_PREFIX: &str = "EPG";

/// Zero-padded width of the sequence segment.
pub const DEFAULT_SEQUENCE_WIDTH: usize = 4;

/// Widest padding a format may request (`10^18 - 1` still fits in a `u64`).
pub const MAX_SEQUENCE_WIDTH: usize = 18;

/// Separator between SKU segments.
pub const SEPARATOR: char = '-';

const SEGMENT_COUNT: usize = 4;

/// The variable components of a SKU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SkuParts {
    pub category: CategoryPrefix,
    pub brand: BrandPrefix,
    pub sequence: u64,
}

impl SkuParts {
    pub fn new(category: CategoryPrefix, brand: BrandPrefix, sequence: u64) -> Self {
        Self {
            category,
            brand,
            sequence,
        }
    }
}

/// A rendered SKU together with the parts it was built from.
///
/// Only [`SkuFormat::render`] and [`SkuFormat::parse`] construct this type,
/// so the text is always canonical for the format that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sku {
    parts: SkuParts,
    text: String,
}

impl Sku {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn parts(&self) -> SkuParts {
        self.parts
    }

    #[must_use]
    pub fn category(&self) -> CategoryPrefix {
        self.parts.category
    }

    #[must_use]
    pub fn brand(&self) -> BrandPrefix {
        self.parts.brand
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.parts.sequence
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl Serialize for Sku {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.text)
    }
}

/// The fixed parts of the SKU grammar: organization prefix and padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuFormat {
    org_prefix: OrgPrefix,
    sequence_width: usize,
}

impl SkuFormat {
    /// Creates a format with the given organization prefix and padding width.
    pub fn new(org_prefix: OrgPrefix, sequence_width: usize) -> Result<Self, SkuError> {
        if sequence_width == 0 || sequence_width > MAX_SEQUENCE_WIDTH {
            return Err(SkuError::InvalidFormat {
                message: format!(
                    "sequence width must be between 1 and {MAX_SEQUENCE_WIDTH}, got {sequence_width}"
                ),
            });
        }

        Ok(Self {
            org_prefix,
            sequence_width,
        })
    }

    #[must_use]
    pub fn org_prefix(&self) -> OrgPrefix {
        self.org_prefix
    }

    #[must_use]
    pub fn sequence_width(&self) -> usize {
        self.sequence_width
    }

    /// Largest sequence that fits in the padded field without widening.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        10u64.pow(self.sequence_width as u32) - 1
    }

    /// Returns true if `sequence` no longer fits in the padded width.
    #[must_use]
    pub fn is_widened(&self, sequence: u64) -> bool {
        sequence > self.capacity()
    }

    /// Renders parts into the canonical SKU string.
    ///
    /// Sequences beyond [`capacity`](Self::capacity) widen the numeric field.
    /// A zero sequence renders but will not parse back; sequences start at 1.
    #[must_use]
    pub fn render(&self, parts: SkuParts) -> Sku {
        let text = format!(
            "{org}{SEPARATOR}{category}{SEPARATOR}{brand}{SEPARATOR}{sequence:0width$}",
            org = self.org_prefix,
            category = parts.category,
            brand = parts.brand,
            sequence = parts.sequence,
            width = self.sequence_width,
        );
        Sku { parts, text }
    }

    /// Parses a SKU in canonical form.
    ///
    /// No normalization is applied; call [`normalize`] first for operator
    /// input.
    pub fn parse(&self, s: &str) -> Result<Sku, SkuError> {
        if s.is_empty() {
            return Err(SkuError::Empty);
        }

        let segments: Vec<&str> = s.split(SEPARATOR).collect();
        let [org, category, brand, sequence] = segments.as_slice() else {
            return Err(SkuError::SegmentCount {
                expected: SEGMENT_COUNT,
                actual: segments.len(),
            });
        };

        if *org != self.org_prefix.as_str() {
            return Err(SkuError::OrgPrefixMismatch {
                expected: self.org_prefix.to_string(),
                actual: org.to_string(),
            });
        }

        let category = CategoryPrefix::parse(category)?;
        let brand = BrandPrefix::parse(brand)?;
        let sequence = self.parse_sequence(sequence)?;

        Ok(self.render(SkuParts::new(category, brand, sequence)))
    }

    fn parse_sequence(&self, segment: &str) -> Result<u64, SkuError> {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SkuError::NonNumericSequence {
                value: segment.to_string(),
            });
        }

        let value: u64 = segment
            .parse()
            .map_err(|_| SkuError::SequenceOutOfRange {
                value: segment.to_string(),
            })?;

        if value == 0 {
            return Err(SkuError::ZeroSequence);
        }

        if format!("{value:0width$}", width = self.sequence_width) != segment {
            return Err(SkuError::NonCanonicalSequence {
                value: segment.to_string(),
                width: self.sequence_width,
            });
        }

        Ok(value)
    }
}

impl Default for SkuFormat {
    fn default() -> Self {
        Self {
            org_prefix: OrgPrefix::parse(DEFAULT_ORG_PREFIX).expect("default org prefix is valid"),
            sequence_width: DEFAULT_SEQUENCE_WIDTH,
        }
    }
}

/// Normalizes operator input: trims whitespace and uppercases.
#[must_use]
pub fn normalize(candidate: &str) -> String {
    candidate.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parts(category: &str, brand: &str, sequence: u64) -> SkuParts {
        SkuParts::new(
            CategoryPrefix::parse(category).unwrap(),
            BrandPrefix::parse(brand).unwrap(),
            sequence,
        )
    }

    #[test]
    fn test_render_pads_sequence() {
        let format = SkuFormat::default();
        let sku = format.render(parts("LGT", "CHV", 1));
        assert_eq!(sku.as_str(), "EPG-LGT-CHV-0001");
        assert_eq!(sku.sequence(), 1);
    }

    #[test]
    fn test_render_widens_past_capacity() {
        let format = SkuFormat::default();
        assert_eq!(format.capacity(), 9999);
        assert!(!format.is_widened(9999));
        assert!(format.is_widened(10_000));

        let sku = format.render(parts("LGT", "CHV", 10_000));
        assert_eq!(sku.as_str(), "EPG-LGT-CHV-10000");
    }

    #[test]
    fn test_parse_widened_sequence() {
        let format = SkuFormat::default();
        let sku = format.parse("EPG-AUD-SHR-123456").unwrap();
        assert_eq!(sku.sequence(), 123_456);
        assert_eq!(sku.category().as_str(), "AUD");
        assert_eq!(sku.brand().as_str(), "SHR");
    }

    #[test]
    fn test_parse_returns_canonical_text() {
        let format = SkuFormat::default();
        let sku = format.parse("EPG-LGT-CHV-0042").unwrap();
        assert_eq!(sku.as_str(), "EPG-LGT-CHV-0042");
        assert_eq!(sku.parts(), parts("LGT", "CHV", 42));
    }

    #[test]
    fn test_custom_org_prefix_and_width() {
        let format = SkuFormat::new(OrgPrefix::parse("RNT").unwrap(), 6).unwrap();
        let sku = format.render(parts("VID", "SNY", 7));
        assert_eq!(sku.as_str(), "RNT-VID-SNY-000007");
        assert!(format.parse("EPG-VID-SNY-000007").is_err());
        assert_eq!(format.parse(sku.as_str()).unwrap(), sku);
    }

    #[rstest]
    #[case(0)]
    #[case(MAX_SEQUENCE_WIDTH + 1)]
    fn test_invalid_width(#[case] width: usize) {
        let err = SkuFormat::new(OrgPrefix::parse("EPG").unwrap(), width).unwrap_err();
        assert!(matches!(err, SkuError::InvalidFormat { .. }));
    }

    #[test]
    fn test_max_width_capacity() {
        let format = SkuFormat::new(OrgPrefix::parse("EPG").unwrap(), MAX_SEQUENCE_WIDTH).unwrap();
        assert_eq!(format.capacity(), 999_999_999_999_999_999);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(SkuFormat::default().parse(""), Err(SkuError::Empty));
    }

    #[rstest]
    #[case("EPG-LGT-CHV", 3)]
    #[case("EPG-LGT-CHV-0001-X", 5)]
    #[case("EPGLGTCHV0001", 1)]
    #[case("EPG--LGT-CHV-0001", 5)]
    fn test_parse_wrong_segment_count(#[case] input: &str, #[case] actual: usize) {
        let err = SkuFormat::default().parse(input).unwrap_err();
        assert_eq!(
            err,
            SkuError::SegmentCount {
                expected: 4,
                actual
            }
        );
    }

    #[rstest]
    #[case("ABC-LGT-CHV-0001")]
    #[case("epg-LGT-CHV-0001")]
    #[case("EP-LGT-CHV-0001")]
    fn test_parse_wrong_org_prefix(#[case] input: &str) {
        let err = SkuFormat::default().parse(input).unwrap_err();
        assert!(matches!(err, SkuError::OrgPrefixMismatch { .. }));
    }

    #[rstest]
    #[case("EPG-LG-CHV-0001")]
    #[case("EPG-LGTX-CHV-0001")]
    #[case("EPG-LGT-CH-0001")]
    #[case("EPG-LGT-lgt-0001")]
    fn test_parse_bad_prefix_segment(#[case] input: &str) {
        let err = SkuFormat::default().parse(input).unwrap_err();
        assert!(err.is_prefix_error(), "unexpected error: {err:?}");
    }

    #[rstest]
    #[case("EPG-LGT-CHV-00A1")]
    #[case("EPG-LGT-CHV-")]
    #[case("EPG-LGT-CHV-0 01")]
    #[case("EPG-LGT-CHV-+001")]
    fn test_parse_non_numeric_sequence(#[case] input: &str) {
        let err = SkuFormat::default().parse(input).unwrap_err();
        assert!(matches!(err, SkuError::NonNumericSequence { .. }));
    }

    #[rstest]
    #[case("EPG-LGT-CHV-001")]
    #[case("EPG-LGT-CHV-1")]
    #[case("EPG-LGT-CHV-00001")]
    fn test_parse_non_canonical_sequence(#[case] input: &str) {
        let err = SkuFormat::default().parse(input).unwrap_err();
        assert!(matches!(
            err,
            SkuError::NonCanonicalSequence { width: 4, .. }
        ));
    }

    #[test]
    fn test_parse_zero_sequence() {
        let err = SkuFormat::default().parse("EPG-LGT-CHV-0000").unwrap_err();
        assert_eq!(err, SkuError::ZeroSequence);
        assert!(err.is_sequence_error());
    }

    #[test]
    fn test_parse_sequence_overflow() {
        let err = SkuFormat::default()
            .parse("EPG-LGT-CHV-99999999999999999999999")
            .unwrap_err();
        assert!(matches!(err, SkuError::SequenceOutOfRange { .. }));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  epg-lgt-chv-0001\n"), "EPG-LGT-CHV-0001");
    }

    #[test]
    fn test_sku_serializes_as_string() {
        let sku = SkuFormat::default().render(parts("LGT", "CHV", 3));
        assert_eq!(serde_json::to_string(&sku).unwrap(), "\"EPG-LGT-CHV-0003\"");
    }
}

//! Macro for defining fixed-width prefix code types.

/// Defines a typed, fixed-width prefix code.
///
/// This generates a `Copy` newtype over `[u8; PREFIX_LEN]` with:
/// - A `KIND` constant naming the segment in error messages
/// - `parse()` enforcing length and the `[A-Z0-9]` alphabet
/// - `as_str()`, `Display`, `FromStr`, `AsRef<str>`
/// - `Serialize` and `Deserialize` as a plain string
///
/// # Example
///
/// ```ignore
/// define_prefix!(CategoryPrefix, "category");
///
/// let lighting: CategoryPrefix = "LGT".parse()?;
/// assert_eq!(lighting.as_str(), "LGT");
/// ```
#[macro_export]
macro_rules! define_prefix {
    ($name:ident, $kind:literal) => {
        /// A validated prefix code for this SKU segment.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $crate::PREFIX_LEN]);

        impl $name {
            /// Segment name used in error messages.
            pub const KIND: &'static str = $kind;

            /// Parses a prefix code. Input must already be uppercase.
            pub fn parse(s: &str) -> Result<Self, $crate::SkuError> {
                $crate::validate_prefix(Self::KIND, s).map(Self)
            }

            /// Returns the code as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                // Bytes were checked to be ASCII in `parse`.
                std::str::from_utf8(&self.0).unwrap_or_default()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::SkuError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

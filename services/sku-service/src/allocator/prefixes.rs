//! Category and brand name to prefix code lookup.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use epg_sku::{BrandPrefix, CategoryPrefix, SkuError};
use serde::Deserialize;
use thiserror::Error;

use super::AllocationError;

/// Prefix table shipped with the service.
pub const BUILTIN_PREFIXES: &str = include_str!("../../config/prefixes.toml");

/// Errors loading a prefix table.
#[derive(Debug, Error)]
pub enum PrefixConfigError {
    #[error("failed to read prefix file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid prefix file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {kind} code for '{name}': {source}")]
    InvalidCode {
        kind: &'static str,
        name: String,
        #[source]
        source: SkuError,
    },

    #[error("{kind} code {code} is assigned to both '{first}' and '{second}'")]
    DuplicateCode {
        kind: &'static str,
        code: String,
        first: String,
        second: String,
    },

    #[error("{kind} name '{name}' is listed more than once")]
    DuplicateName { kind: &'static str, name: String },
}

/// On-disk shape of a prefix table.
#[derive(Debug, Default, Deserialize)]
pub struct PrefixTable {
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
    #[serde(default)]
    pub brands: BTreeMap<String, String>,
}

/// Resolves category and brand names to their registered codes.
#[derive(Debug, Clone)]
pub struct PrefixResolver {
    categories: HashMap<String, CategoryPrefix>,
    brands: HashMap<String, BrandPrefix>,
}

impl PrefixResolver {
    /// The table compiled into the binary.
    pub fn builtin() -> Self {
        Self::from_toml(BUILTIN_PREFIXES).expect("built-in prefix table is valid")
    }

    /// Load a table from a TOML file.
    pub fn load(path: &Path) -> Result<Self, PrefixConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PrefixConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, PrefixConfigError> {
        let table: PrefixTable = toml::from_str(contents)?;
        Self::from_table(table)
    }

    pub fn from_table(table: PrefixTable) -> Result<Self, PrefixConfigError> {
        Ok(Self {
            categories: build_index(CategoryPrefix::KIND, table.categories, CategoryPrefix::parse)?,
            brands: build_index(BrandPrefix::KIND, table.brands, BrandPrefix::parse)?,
        })
    }

    pub fn resolve_category_prefix(&self, category: &str) -> Result<CategoryPrefix, AllocationError> {
        self.categories
            .get(&name_key(category))
            .copied()
            .ok_or_else(|| AllocationError::UnknownPrefix {
                kind: CategoryPrefix::KIND,
                name: category.trim().to_string(),
            })
    }

    pub fn resolve_brand_prefix(&self, brand: &str) -> Result<BrandPrefix, AllocationError> {
        self.brands
            .get(&name_key(brand))
            .copied()
            .ok_or_else(|| AllocationError::UnknownPrefix {
                kind: BrandPrefix::KIND,
                name: brand.trim().to_string(),
            })
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn brand_count(&self) -> usize {
        self.brands.len()
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn build_index<P: Copy + ToString>(
    kind: &'static str,
    entries: BTreeMap<String, String>,
    parse: impl Fn(&str) -> Result<P, SkuError>,
) -> Result<HashMap<String, P>, PrefixConfigError> {
    let mut index = HashMap::with_capacity(entries.len());
    let mut owners: HashMap<String, String> = HashMap::with_capacity(entries.len());

    for (name, code) in entries {
        let prefix = parse(code.trim()).map_err(|source| PrefixConfigError::InvalidCode {
            kind,
            name: name.clone(),
            source,
        })?;

        if let Some(first) = owners.insert(prefix.to_string(), name.clone()) {
            return Err(PrefixConfigError::DuplicateCode {
                kind,
                code: prefix.to_string(),
                first,
                second: name,
            });
        }

        if index.insert(name_key(&name), prefix).is_some() {
            return Err(PrefixConfigError::DuplicateName { kind, name });
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let resolver = PrefixResolver::builtin();
        assert!(resolver.category_count() >= 5);
        assert!(resolver.brand_count() >= 5);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let resolver = PrefixResolver::builtin();
        assert_eq!(
            resolver.resolve_category_prefix(" lighting ").unwrap().as_str(),
            "LGT"
        );
        assert_eq!(resolver.resolve_brand_prefix("CHAUVET").unwrap().as_str(), "CHV");
    }

    #[test]
    fn test_unknown_category() {
        let resolver = PrefixResolver::builtin();
        let err = resolver.resolve_category_prefix("Catering").unwrap_err();
        assert!(matches!(
            err,
            AllocationError::UnknownPrefix {
                kind: "category",
                ref name,
            } if name == "Catering"
        ));
    }

    #[test]
    fn test_unknown_brand() {
        let resolver = PrefixResolver::builtin();
        let err = resolver.resolve_brand_prefix("Acme").unwrap_err();
        assert!(matches!(err, AllocationError::UnknownPrefix { kind: "brand", .. }));
    }

    #[test]
    fn test_invalid_code_rejected() {
        let err = PrefixResolver::from_toml("[categories]\nLighting = \"LIGHT\"\n").unwrap_err();
        assert!(matches!(err, PrefixConfigError::InvalidCode { kind: "category", .. }));
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let toml = "[brands]\nChauvet = \"CHV\"\n\"Chauvet Pro\" = \"CHV\"\n";
        let err = PrefixResolver::from_toml(toml).unwrap_err();
        assert!(matches!(err, PrefixConfigError::DuplicateCode { kind: "brand", .. }));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let toml = "[brands]\nShure = \"SHR\"\nSHURE = \"SH2\"\n";
        let err = PrefixResolver::from_toml(toml).unwrap_err();
        assert!(matches!(err, PrefixConfigError::DuplicateName { kind: "brand", .. }));
    }

    #[test]
    fn test_missing_tables_are_empty() {
        let resolver = PrefixResolver::from_toml("").unwrap();
        assert_eq!(resolver.category_count(), 0);
        assert!(resolver.resolve_brand_prefix("Shure").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = PrefixResolver::load(Path::new("/nonexistent/prefixes.toml")).unwrap_err();
        assert!(matches!(err, PrefixConfigError::Io { .. }));
    }
}

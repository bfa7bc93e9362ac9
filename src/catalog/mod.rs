//! Runtime release catalog.
//!
//! The catalog is the ordered table of runtime releases that images are
//! generated for. It comes from the built-in table, a JSON/YAML file, or a
//! downloaded catalog cached under the output directory. Once loaded it is an
//! immutable value passed explicitly to the resolver.

mod builtin;
mod fetch;
mod release;
pub mod version;

pub use fetch::{CatalogFetcher, DEFAULT_FETCH_TIMEOUT_SECS};
pub use release::RuntimeRelease;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// File name of the cached catalog inside the output directory.
pub const CACHED_CATALOG_FILE: &str = "catalog.json";

/// On-disk catalog documents: a bare list or an object with a `releases` key.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    List(Vec<RuntimeRelease>),
    Wrapped { releases: Vec<RuntimeRelease> },
}

impl CatalogDocument {
    fn into_releases(self) -> Vec<RuntimeRelease> {
        match self {
            CatalogDocument::List(releases) => releases,
            CatalogDocument::Wrapped { releases } => releases,
        }
    }
}

#[derive(Serialize)]
struct CatalogDocumentRef<'a> {
    releases: &'a [RuntimeRelease],
}

/// Ordered, validated set of runtime releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    releases: Vec<RuntimeRelease>,
}

impl Catalog {
    /// Builds a catalog, normalizing every release and rejecting duplicate labels.
    ///
    /// Labels count as duplicates when they share a directory or tag form, so
    /// `15.4 LTS` and `15.4 (LTS)` cannot both be present.
    pub fn new(releases: Vec<RuntimeRelease>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(releases.len());

        for mut release in releases {
            release.normalize()?;
            if !seen.insert(version::tag_runtime_label(&release.version)) {
                return Err(CatalogError::DuplicateVersion(release.version));
            }
            normalized.push(release);
        }

        Ok(Self {
            releases: normalized,
        })
    }

    /// The built-in release table.
    pub fn builtin() -> Self {
        Self {
            releases: builtin::releases(),
        }
    }

    /// Loads a catalog from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let content = fs::read_to_string(path)?;
        let document: CatalogDocument = match extension.as_str() {
            "json" => serde_json::from_str(&content)?,
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            _ => return Err(CatalogError::UnsupportedFormat(path.display().to_string())),
        };

        let catalog = Self::new(document.into_releases())?;
        tracing::debug!(
            path = %path.display(),
            releases = catalog.len(),
            "Loaded runtime catalog"
        );
        Ok(catalog)
    }

    /// Parses a JSON catalog document.
    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(content)?;
        Self::new(document.into_releases())
    }

    /// Serializes the catalog as `{"releases": [...]}`.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&CatalogDocumentRef {
            releases: &self.releases,
        })?)
    }

    /// Writes the catalog as JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn get(&self, version: &str) -> Option<&RuntimeRelease> {
        self.releases.iter().find(|r| r.version == version)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuntimeRelease> {
        self.releases.iter()
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Catalog restricted to LTS releases.
    pub fn lts_only(&self) -> Self {
        Self {
            releases: self.releases.iter().filter(|r| r.is_lts).cloned().collect(),
        }
    }

    /// Catalog restricted to the `count` most recent LTS releases.
    ///
    /// Recency is the release date, falling back to the version label; the
    /// result keeps the original catalog order.
    pub fn latest_lts(&self, count: usize) -> Self {
        let mut lts: Vec<&RuntimeRelease> = self.releases.iter().filter(|r| r.is_lts).collect();
        lts.sort_by(|a, b| newest_first(a, b));

        let keep: HashSet<&str> = lts
            .into_iter()
            .take(count)
            .map(|r| r.version.as_str())
            .collect();

        Self {
            releases: self
                .releases
                .iter()
                .filter(|r| keep.contains(r.version.as_str()))
                .cloned()
                .collect(),
        }
    }
}

fn newest_first(a: &RuntimeRelease, b: &RuntimeRelease) -> Ordering {
    // None sorts before Some, so reversing puts undated releases last.
    b.release_date
        .cmp(&a.release_date)
        .then_with(|| version::compare_runtime_labels_desc(&a.version, &b.version))
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn dated(version: &str, y: i32, m: u32, d: u32) -> RuntimeRelease {
        let released = NaiveDate::from_ymd_opt(y, m, d).expect("valid date");
        RuntimeRelease::new(version, "22.04", "3.11")
            .with_lts(true)
            .with_support_window(released, released)
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let builtin = Catalog::builtin();
        let rebuilt = Catalog::new(builtin.iter().cloned().collect())
            .expect("built-in table should validate");
        assert_eq!(builtin, rebuilt);

        let release = builtin.get("15.4 LTS").expect("15.4 LTS is built in");
        assert_eq!(release.os_version, "22.04");
        assert_eq!(release.python_version, "3.11");
        assert!(release.has_ml_variant);
    }

    #[test]
    fn test_duplicate_versions_rejected() {
        let err = Catalog::new(vec![
            RuntimeRelease::new("15.4 LTS", "22.04", "3.11"),
            RuntimeRelease::new("15.4 LTS", "24.04", "3.12"),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateVersion(v) if v == "15.4 LTS"));
    }

    #[test]
    fn test_labels_sharing_an_output_dir_are_duplicates() {
        for clash in ["15.4 (LTS)", "15.4  LTS", "15.4 lts"] {
            let err = Catalog::new(vec![
                RuntimeRelease::new("15.4 LTS", "22.04", "3.11"),
                RuntimeRelease::new(clash, "22.04", "3.11"),
            ])
            .unwrap_err();
            assert!(
                matches!(&err, CatalogError::DuplicateVersion(v) if v == clash.trim()),
                "{clash} should clash with 15.4 LTS, got {err}"
            );
        }
    }

    #[test]
    fn test_fetched_catalog_with_path_label_is_rejected() {
        let err = Catalog::from_json(
            r#"[{"version": "17.3/../../../etc", "os_version": "24.04", "python_version": "3.12"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRelease { .. }));
    }

    #[test]
    fn test_load_yaml_list() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("catalog.yaml");
        fs::write(
            &path,
            r#"
- version: "15.4 LTS"
  os_version: "Ubuntu 22.04.4 LTS"
  python_version: "3.11.0"
  is_lts: true
  has_ml_variant: true
- version: "17.2"
  os_version: "24.04"
  python_version: "3.12"
"#,
        )
        .expect("write catalog");

        let catalog = Catalog::load(&path).expect("yaml catalog should load");
        assert_eq!(catalog.len(), 2);
        let first = catalog.iter().next().expect("first release");
        assert_eq!(first.version, "15.4 LTS");
        assert_eq!(first.os_version, "22.04");
        assert_eq!(first.python_version, "3.11");
    }

    #[test]
    fn test_load_wrapped_json_and_save_roundtrip() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("catalog.json");

        let catalog = Catalog::builtin().lts_only();
        catalog.save(&path).expect("save catalog");

        let loaded = Catalog::load(&path).expect("load saved catalog");
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("catalog.toml");
        fs::write(&path, "releases = []").expect("write file");

        let err = Catalog::load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_lts_only_drops_non_lts() {
        let catalog = Catalog::builtin().lts_only();
        assert!(catalog.iter().all(|r| r.is_lts));
        assert!(catalog.get("17.2").is_none());
    }

    #[test]
    fn test_latest_lts_keeps_catalog_order() {
        let catalog = Catalog::new(vec![
            dated("13.3 LTS", 2023, 8, 22),
            dated("15.4 LTS", 2024, 8, 19),
            RuntimeRelease::new("15.5", "22.04", "3.11"),
            dated("14.3 LTS", 2024, 2, 1),
        ])
        .expect("valid catalog");

        let latest = catalog.latest_lts(2);
        let versions: Vec<&str> = latest.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["15.4 LTS", "14.3 LTS"]);

        assert!(catalog.latest_lts(0).is_empty());
        assert_eq!(catalog.latest_lts(10).len(), 3);
    }
}

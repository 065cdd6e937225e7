//! Case store writing utilities.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{CaseError, CaseResult};
use crate::models::TestCase;
use crate::store::StoreFormat;

/// Writer for case store files.
pub struct CaseWriter;

impl CaseWriter {
    /// Write cases as a list, picking JSON or YAML from the extension.
    pub fn write(path: impl AsRef<Path>, cases: &[TestCase]) -> CaseResult<()> {
        let path = path.as_ref();
        debug!("Writing {} cases to {:?}", cases.len(), path);

        let content = match StoreFormat::from_path(path) {
            StoreFormat::Json => serde_json::to_string_pretty(cases)?,
            StoreFormat::Yaml => serde_yaml::to_string(cases)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CaseError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, content).map_err(|source| CaseError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CaseStore;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cases.yaml");
        let cases = vec![TestCase::new("Login").with_step("open page")];

        CaseWriter::write(&path, &cases).unwrap();
        let store = CaseStore::load(&path).unwrap();

        assert_eq!(store.cases(), cases.as_slice());
    }
}

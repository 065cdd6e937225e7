//! Case store reading utilities.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CaseError, CaseResult};
use crate::models::TestCase;

/// Serialization format of a case store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    Json,
    Yaml,
}

impl StoreFormat {
    /// Pick the format from the file extension; anything but `.yaml`/`.yml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// An ordered, read-only list of test cases.
#[derive(Debug, Clone, Default)]
pub struct CaseStore {
    source: Option<PathBuf>,
    cases: Vec<TestCase>,
}

/// A case together with the position it was found at.
#[derive(Debug, Clone, Copy)]
pub struct CaseRef<'a> {
    /// 1-based ordinal.
    pub ordinal: usize,
    pub case: &'a TestCase,
}

impl CaseStore {
    /// Build a store from in-memory cases.
    pub fn from_cases(cases: Vec<TestCase>) -> Self {
        Self {
            source: None,
            cases,
        }
    }

    /// Load a store from a JSON or YAML list.
    pub fn load(path: impl AsRef<Path>) -> CaseResult<Self> {
        let path = path.as_ref();
        debug!("Reading case store from {:?}", path);

        if !path.exists() {
            return Err(CaseError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| CaseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let cases = Self::parse(&content, StoreFormat::from_path(path)).map_err(|e| {
            CaseError::InvalidFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        debug!("Loaded {} test cases", cases.len());
        Ok(Self {
            source: Some(path.to_path_buf()),
            cases,
        })
    }

    /// Parse case list content.
    pub fn parse(content: &str, format: StoreFormat) -> CaseResult<Vec<TestCase>> {
        let cases = match format {
            StoreFormat::Json => serde_json::from_str(content)?,
            StoreFormat::Yaml => serde_yaml::from_str(content)?,
        };
        Ok(cases)
    }

    /// Path the store was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Look up a case by 0-based offset.
    pub fn get(&self, offset: usize) -> Option<&TestCase> {
        self.cases.get(offset)
    }

    /// Iterate cases with their 1-based ordinals.
    pub fn iter(&self) -> impl Iterator<Item = CaseRef<'_>> {
        self.cases.iter().enumerate().map(|(i, case)| CaseRef {
            ordinal: i + 1,
            case,
        })
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }
}

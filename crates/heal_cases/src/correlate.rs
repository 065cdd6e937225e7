//! Mapping from script identifiers back to the test cases they were generated from.
//!
//! A script identifier is whatever path the test report used for the script.
//! Its file name must follow the convention `<stem>_<N>.py`, optionally with a
//! `.healed` suffix, where `<stem>` starts with a letter or underscore and `N`
//! is the 1-based ordinal of the case in the store. The mapping depends on the
//! identifier string alone, so it gives the same answer after a restart.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::models::TestCase;
use crate::store::CaseStore;

/// A successful correlation.
#[derive(Debug, Clone, Copy)]
pub struct CaseMatch<'a> {
    /// 1-based ordinal encoded in the script name.
    pub ordinal: usize,
    /// 0-based offset into the store.
    pub offset: usize,
    pub case: &'a TestCase,
}

fn script_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*_([0-9]+)\.py(?:\.healed)?$")
            .expect("script name pattern is valid")
    })
}

/// Last path component, accepting both `/` and `\` separators.
pub fn script_file_name(script_id: &str) -> &str {
    script_id
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(script_id)
}

/// Extract the 1-based ordinal from a script identifier.
///
/// Returns `None` for names that do not follow the convention, for ordinal
/// zero, and for ordinals that do not fit in `usize`.
pub fn parse_ordinal(script_id: &str) -> Option<usize> {
    let name = script_file_name(script_id.trim());
    let caps = script_name_pattern().captures(name)?;
    let ordinal: usize = caps.get(1)?.as_str().parse().ok()?;
    (ordinal >= 1).then_some(ordinal)
}

/// Build the live script file name for an ordinal.
pub fn script_name_for(prefix: &str, ordinal: usize) -> String {
    format!("{}_{}.py", prefix, ordinal)
}

/// Find the test case a script was generated from.
pub fn find_case<'a>(script_id: &str, store: &'a CaseStore) -> Option<CaseMatch<'a>> {
    let Some(ordinal) = parse_ordinal(script_id) else {
        debug!("Script name does not encode a case ordinal: {}", script_id);
        return None;
    };

    let offset = ordinal.checked_sub(1)?;
    match store.get(offset) {
        Some(case) => Some(CaseMatch {
            ordinal,
            offset,
            case,
        }),
        None => {
            debug!(
                "Case ordinal {} out of range for store of {} cases",
                ordinal,
                store.len()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(n: usize) -> CaseStore {
        CaseStore::from_cases((1..=n).map(|i| TestCase::new(format!("case {}", i))).collect())
    }

    #[test]
    fn test_parse_ordinal_variants() {
        assert_eq!(parse_ordinal("scripts/case_2.py"), Some(2));
        assert_eq!(parse_ordinal("playwright_scripts/test_playwright_12.py"), Some(12));
        assert_eq!(parse_ordinal(r"C:\runs\test_playwright_3.py"), Some(3));
        assert_eq!(parse_ordinal("test_playwright_007.py.healed"), Some(7));
        assert_eq!(parse_ordinal("case_1_4.py"), Some(4));
    }

    #[test]
    fn test_parse_ordinal_rejects_malformed() {
        assert_eq!(parse_ordinal("case_0.py"), None);
        assert_eq!(parse_ordinal("case.py"), None);
        assert_eq!(parse_ordinal("case_2.pyc"), None);
        assert_eq!(parse_ordinal("case_-1.py"), None);
        assert_eq!(parse_ordinal("2.py"), None);
        assert_eq!(parse_ordinal(""), None);
        assert_eq!(parse_ordinal("case_99999999999999999999999999.py"), None);
        assert_eq!(parse_ordinal("test_playwright_1.py.failed_backup_0"), None);
    }

    #[test]
    fn test_find_case_offset() {
        let store = store(3);
        let found = find_case("scripts/case_2.py", &store).unwrap();

        assert_eq!(found.ordinal, 2);
        assert_eq!(found.offset, 1);
        assert_eq!(found.case.name, "case 2");
    }

    #[test]
    fn test_find_case_bounds() {
        let store = store(3);
        assert!(find_case("case_3.py", &store).is_some());
        assert!(find_case("case_4.py", &store).is_none());
        assert!(find_case("case_0.py", &store).is_none());
        assert!(find_case(&format!("case_{}.py", usize::MAX), &store).is_none());
        assert!(find_case("case_1.py", &CaseStore::default()).is_none());
    }

    #[test]
    fn test_script_name_round_trip() {
        let name = script_name_for("test_playwright", 5);
        assert_eq!(name, "test_playwright_5.py");
        assert_eq!(parse_ordinal(&name), Some(5));
    }
}

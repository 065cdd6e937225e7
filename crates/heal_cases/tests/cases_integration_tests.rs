//! Integration tests for the case store and correlator.

use std::fs;
use tempfile::tempdir;

use heal_cases::{find_case, CaseError, CaseStore, CaseWriter, TestCase};

/// A generated store on disk correlates with report-style script paths.
#[test]
fn test_store_and_correlate_workflow() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("testcases.json");

    fs::write(
        &path,
        r#"[
  {"scene": "Open home page", "steps": ["goto /"], "expected": "title shown"},
  {"name": "Login form", "steps": ["fill username", "fill password", "submit"]},
  {"name": "Logout", "steps": ["click logout"], "target_url": "http://localhost/app"}
]"#,
    )
    .unwrap();

    let store = CaseStore::load(&path).unwrap();
    assert_eq!(store.len(), 3);
    assert_eq!(store.source(), Some(path.as_path()));

    let found = find_case("scripts/case_2.py", &store).unwrap();
    assert_eq!(found.offset, 1);
    assert_eq!(found.case.name, "Login form");
    assert_eq!(found.case.steps.len(), 3);

    assert!(find_case("scripts/case_4.py", &store).is_none());
    assert!(find_case("scripts/conftest.py", &store).is_none());
}

/// Correlation is a pure function of the id: reloading gives the same case.
#[test]
fn test_correlation_is_reproducible_after_reload() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("cases.yaml");
    let cases: Vec<TestCase> = (1..=5)
        .map(|i| TestCase::new(format!("scenario {}", i)).with_step("do it"))
        .collect();
    CaseWriter::write(&path, &cases).unwrap();

    let first = CaseStore::load(&path).unwrap();
    let second = CaseStore::load(&path).unwrap();

    let a = find_case("test_playwright_4.py", &first).unwrap();
    let b = find_case("test_playwright_4.py", &second).unwrap();
    assert_eq!(a.case, b.case);
    assert_eq!(a.case.name, "scenario 4");
}

#[test]
fn test_missing_store_is_an_error() {
    let temp = tempdir().unwrap();
    let err = CaseStore::load(temp.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, CaseError::NotFound(_)));
}

#[test]
fn test_malformed_store_reports_path() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("testcases.json");
    fs::write(&path, "[{\"name\": \"unterminated\"").unwrap();

    match CaseStore::load(&path) {
        Err(CaseError::InvalidFormat { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected InvalidFormat, got {:?}", other),
    }
}

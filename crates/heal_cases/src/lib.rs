//! # heal_cases
//!
//! Test-case storage for selfheal.
//!
//! Test cases are structured UI scenarios (name, steps, target URL, expected
//! result) produced once by generation and read by every later stage. This
//! crate loads and writes the case store and maps script identifiers back to
//! the case each script was generated from.
//!
//! ## Example
//!
//! ```rust,no_run
//! use heal_cases::{find_case, CaseStore};
//!
//! let store = CaseStore::load("testcases.json").unwrap();
//! if let Some(found) = find_case("playwright_scripts/test_playwright_2.py", &store) {
//!     println!("case #{}: {}", found.ordinal, found.case.name);
//! }
//! ```

pub mod correlate;
pub mod error;
pub mod models;
pub mod store;
pub mod writer;

pub use correlate::{find_case, parse_ordinal, script_file_name, script_name_for, CaseMatch};
pub use error::{CaseError, CaseResult};
pub use models::TestCase;
pub use store::{CaseRef, CaseStore, StoreFormat};
pub use writer::CaseWriter;

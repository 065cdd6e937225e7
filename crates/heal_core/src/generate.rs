//! Script and case generation.
//!
//! Generation runs before the repair loop: cases come from UI snapshots,
//! scripts from cases. Both ask the completion service and keep only what
//! passes the same checks repairs do.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use heal_cases::{CaseStore, CaseWriter, TestCase};
use heal_llm::{CompletionService, Message};
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::artifacts::ArtifactStore;
use crate::error::{CoreError, CoreResult};
use crate::prompt::{case_messages, script_messages};
use crate::sanitize::{strip_fences, Sanitizer, SyntaxDiagnostic};

/// Snapshot file holding UI elements per page URL.
pub const PAGE_SNAPSHOT_FILE: &str = "page_snapshot.json";

/// Backup attempt number used when `--force` replaces a live script.
const REGENERATION_ATTEMPT: u32 = 0;

/// UI elements keyed by page URL.
pub type ElementSnapshot = HashMap<String, Vec<Value>>;

/// Load `page_snapshot.json`. Missing or malformed snapshots give an empty map.
pub fn load_element_snapshot(path: &Path) -> ElementSnapshot {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("No element snapshot at {:?}: {}", path, e);
            return ElementSnapshot::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Ignoring malformed element snapshot {:?}: {}", path, e);
            ElementSnapshot::new()
        }
    }
}

pub(crate) async fn complete_within(
    service: &dyn CompletionService,
    messages: &[Message],
    timeout: Duration,
) -> Result<String, String> {
    match tokio::time::timeout(timeout, service.complete(messages)).await {
        Err(_) => Err(format!("no reply within {} seconds", timeout.as_secs())),
        Ok(Err(e)) => Err(e.to_string()),
        Ok(Ok(completion)) => Ok(completion.content),
    }
}

/// What happened to one case during script generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedScript {
    Written(PathBuf),
    /// Did not validate; kept next to the live path for inspection.
    Invalid {
        path: PathBuf,
        diagnostic: SyntaxDiagnostic,
    },
    Skipped(String),
    Failed(String),
}

/// Per-case results, in case order.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub scripts: Vec<(usize, GeneratedScript)>,
}

impl GenerationReport {
    pub fn written(&self) -> usize {
        self.count(|g| matches!(g, GeneratedScript::Written(_)))
    }

    pub fn invalid(&self) -> usize {
        self.count(|g| matches!(g, GeneratedScript::Invalid { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|g| matches!(g, GeneratedScript::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&GeneratedScript) -> bool) -> usize {
        self.scripts.iter().filter(|(_, g)| pred(g)).count()
    }
}

/// Generates one live script per actionable case.
pub struct ScriptGenerator {
    service: Arc<dyn CompletionService>,
    sanitizer: Sanitizer,
    store: ArtifactStore,
    elements: ElementSnapshot,
    timeout: Duration,
    force: bool,
}

impl ScriptGenerator {
    pub fn new(service: Arc<dyn CompletionService>, sanitizer: Sanitizer, store: ArtifactStore) -> Self {
        Self {
            service,
            sanitizer,
            store,
            elements: ElementSnapshot::new(),
            timeout: Duration::from_secs(heal_llm::DEFAULT_TIMEOUT_SECS),
            force: false,
        }
    }

    pub fn with_elements(mut self, elements: ElementSnapshot) -> Self {
        self.elements = elements;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace existing live scripts, backing them up first.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub async fn generate(&self, cases: &CaseStore) -> CoreResult<GenerationReport> {
        let mut report = GenerationReport::default();
        for case_ref in cases.iter() {
            let result = self.generate_one(case_ref.ordinal, case_ref.case).await?;
            report.scripts.push((case_ref.ordinal, result));
        }
        info!(
            "Generated {} script(s), {} invalid, {} failed",
            report.written(),
            report.invalid(),
            report.failed()
        );
        Ok(report)
    }

    async fn generate_one(&self, ordinal: usize, case: &TestCase) -> CoreResult<GeneratedScript> {
        let name = case.display_name(ordinal);
        if !case.is_actionable() {
            warn!("Case #{} ({}) has no steps; skipping", ordinal, name);
            return Ok(GeneratedScript::Skipped("no steps".to_string()));
        }

        let live = self.store.live_path(ordinal);
        if live.exists() && !self.force {
            debug!("Keeping existing script {:?}", live);
            return Ok(GeneratedScript::Skipped("script exists".to_string()));
        }

        let elements = case
            .target_url
            .as_ref()
            .and_then(|url| self.elements.get(url))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let messages = script_messages(case, ordinal, elements);

        info!("Generating script for case #{} ({})", ordinal, name);
        let raw = match complete_within(self.service.as_ref(), &messages, self.timeout).await {
            Ok(raw) => raw,
            Err(reason) => {
                warn!("No script for case #{}: {}", ordinal, reason);
                return Ok(GeneratedScript::Failed(reason));
            }
        };
        if strip_fences(&raw).trim().is_empty() {
            return Ok(GeneratedScript::Failed("reply contained no code".to_string()));
        }

        let sanitized = self.sanitizer.sanitize(&raw);
        if let Some(diagnostic) = sanitized.diagnostic {
            let path = ArtifactStore::invalid_path(&live);
            warn!("Script for case #{} is invalid ({}); saved {:?}", ordinal, diagnostic, path);
            self.store.write_new(&path, &sanitized.script)?;
            return Ok(GeneratedScript::Invalid { path, diagnostic });
        }

        if live.exists() {
            let backup = self.store.backup_live(&live, REGENERATION_ATTEMPT)?;
            info!("Backed up {:?} to {:?}", live, backup);
        }
        self.store.write_new(&live, &sanitized.script)?;
        info!("Wrote {:?}", live);
        Ok(GeneratedScript::Written(live))
    }
}

/// Snapshot files used for case generation, sorted by name.
pub fn read_snapshots(dir: &Path) -> CoreResult<Vec<(String, String)>> {
    if !dir.is_dir() {
        return Err(CoreError::Generation(format!(
            "snapshot directory not found: {}",
            dir.display()
        )));
    }

    let mut snapshots = Vec::new();
    for entry in WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !matches!(ext, "html" | "json") {
            continue;
        }
        let content = fs::read_to_string(path).map_err(|source| CoreError::Artifact {
            path: path.to_path_buf(),
            source,
        })?;
        snapshots.push((entry.file_name().to_string_lossy().into_owned(), content));
    }
    Ok(snapshots)
}

/// Parse a reply into test cases. Accepts a fenced block or prose around
/// the JSON array.
pub fn parse_cases(reply: &str) -> CoreResult<Vec<TestCase>> {
    let body = strip_fences(reply);
    if let Ok(cases) = serde_json::from_str::<Vec<TestCase>>(body.trim()) {
        return Ok(cases);
    }

    let slice = match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(CoreError::Generation(
                "reply does not contain a JSON array".to_string(),
            ))
        }
    };
    serde_json::from_str(slice).map_err(|e| {
        CoreError::Generation(format!("reply is not a list of test cases: {}", e))
    })
}

/// Generates the case store from UI snapshots.
pub struct CaseGenerator {
    service: Arc<dyn CompletionService>,
    timeout: Duration,
}

impl CaseGenerator {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            timeout: Duration::from_secs(heal_llm::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read snapshots, ask for cases and write them to `out`.
    pub async fn generate(&self, snapshots_dir: &Path, out: &Path) -> CoreResult<Vec<TestCase>> {
        let snapshots = read_snapshots(snapshots_dir)?;
        if snapshots.is_empty() {
            return Err(CoreError::Generation(format!(
                "no .html or .json snapshots in {}",
                snapshots_dir.display()
            )));
        }
        info!("Generating test cases from {} snapshot(s)", snapshots.len());

        let messages = case_messages(&snapshots);
        let reply = complete_within(self.service.as_ref(), &messages, self.timeout)
            .await
            .map_err(CoreError::Generation)?;

        let cases = parse_cases(&reply)?;
        let actionable = cases.iter().filter(|c| c.is_actionable()).count();
        if actionable < cases.len() {
            warn!("{} generated case(s) have no steps", cases.len() - actionable);
        }

        CaseWriter::write(out, &cases)?;
        info!("Wrote {} test case(s) to {:?}", cases.len(), out);
        Ok(cases)
    }
}

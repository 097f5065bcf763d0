//! Tera rendering engine: [`ReportKind`] enum and [`Renderer`].
//!
//! | Report       | Template                   | Payload              |
//! |--------------|----------------------------|----------------------|
//! | BranchDiffs  | `branch_diffs.html.tera`   | [`DivergenceReport`] |
//! | LiveLog      | `live_log.html.tera`       | [`LiveLog`]          |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use branchyard_core::{DivergenceReport, LiveLog};

use crate::context::{BranchDiffsContext, LiveLogContext, ReportLinks};
use crate::error::RenderError;

/// Built-in templates, keyed by the name overrides must use to replace them.
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("shared/_styles.tera", include_str!("templates/_partials/styles.tera")),
    ("branch_diffs.html.tera", include_str!("templates/branch_diffs.html.tera")),
    ("live_log.html.tera", include_str!("templates/live_log.html.tera")),
];

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

/// Lower-cased, `/`-separated name relative to the override root.
fn template_key(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every `*.tera` file below `root`, keyed by [`template_key`]. A missing
/// `root` yields nothing.
fn read_overrides(root: &Path) -> Result<BTreeMap<String, String>, RenderError> {
    let mut found = BTreeMap::new();
    if !root.is_dir() {
        tracing::debug!("no template overrides at {}", root.display());
        return Ok(found);
    }
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
            let path = entry.map_err(|e| io_err(&dir, e))?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            if path.extension().map_or(true, |ext| ext != "tera") {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            found.insert(template_key(relative), source);
        }
    }
    Ok(found)
}

fn build_tera(override_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut sources: BTreeMap<String, String> = BUILTIN_TEMPLATES
        .iter()
        .map(|(name, body)| (name.to_string(), body.to_string()))
        .collect();
    if let Some(dir) = override_dir {
        for (name, body) in read_overrides(dir)? {
            tracing::debug!("template override: {name}");
            sources.insert(name, body);
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(sources)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// ReportKind
// ---------------------------------------------------------------------------

/// The HTML reports branchyard can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    BranchDiffs,
    LiveLog,
}

impl ReportKind {
    pub fn all() -> &'static [ReportKind] {
        &[ReportKind::BranchDiffs, ReportKind::LiveLog]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            ReportKind::BranchDiffs => "branch_diffs.html.tera",
            ReportKind::LiveLog => "live_log.html.tera",
        }
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera engine holding the embedded templates plus any user overrides.
///
/// Override files are matched by relative path, so a directory containing
/// `branch_diffs.html.tera` replaces the built-in divergence page while
/// `shared/_styles.tera` replaces only the stylesheet partial.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    pub fn render(&self, kind: ReportKind, ctx: &tera::Context) -> Result<String, RenderError> {
        Ok(self.tera.render(kind.template_name(), ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders the divergence report and the live log to HTML.
///
/// Create once with [`Renderer::new`] (or [`Renderer::with_overrides`]) and
/// reuse across reports.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_overrides(None)
    }

    pub fn with_overrides(template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(template_dir)? })
    }

    pub fn render_branch_diffs(
        &self,
        report: &DivergenceReport,
        links: &ReportLinks,
    ) -> Result<String, RenderError> {
        let ctx = BranchDiffsContext::build(report, links);
        self.render_branch_diffs_with_context(&ctx)
    }

    pub fn render_branch_diffs_with_context(
        &self,
        ctx: &BranchDiffsContext,
    ) -> Result<String, RenderError> {
        self.engine.render(ReportKind::BranchDiffs, &ctx.to_tera_context()?)
    }

    pub fn render_live_log(&self, log: &LiveLog, links: &ReportLinks) -> Result<String, RenderError> {
        let ctx = LiveLogContext::build(log, links);
        self.render_live_log_with_context(&ctx)
    }

    pub fn render_live_log_with_context(&self, ctx: &LiveLogContext) -> Result<String, RenderError> {
        self.engine.render(ReportKind::LiveLog, &ctx.to_tera_context()?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

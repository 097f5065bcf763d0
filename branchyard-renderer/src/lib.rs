//! # branchyard-renderer
//!
//! Tera-based HTML rendering for the branch divergence report and the live
//! deployment log.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use branchyard_core::DivergenceReport;
//! use branchyard_renderer::{Renderer, ReportLinks};
//!
//! fn render(report: &DivergenceReport) {
//!     if let Ok(renderer) = Renderer::new() {
//!         if let Ok(html) = renderer.render_branch_diffs(report, &ReportLinks::default()) {
//!             println!("{} bytes", html.len());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{BranchDiffsContext, LiveLogContext, ReportLinks};
pub use engine::{Renderer, ReportKind, TemplateEngine};
pub use error::RenderError;

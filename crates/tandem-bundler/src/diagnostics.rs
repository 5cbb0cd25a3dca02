//! Diagnostic extraction from Rolldown errors.
//!
//! Each [`BuildDiagnostic`] of a failed build is rendered against the
//! project directory and kept in a small cloneable structure, so bundle
//! outcomes do not hold on to Rolldown's error types.

use std::path::Path;

use rolldown_error::{BatchedBuildDiagnostic, BuildDiagnostic, DiagnosticOptions, EventKind};

/// Diagnostic information pulled out of a Rolldown error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDiagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub file: Option<String>,
    pub help: Option<String>,
    /// Import specifier that failed to resolve, for resolve failures.
    pub specifier: Option<String>,
}

/// Coarse classification of a bundler failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    ParseError,
    UnresolvedEntry,
    UnresolvedImport,
    MissingExport,
    Plugin,
    Other,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiagnosticKind::ParseError => "ParseError",
            DiagnosticKind::UnresolvedEntry => "UnresolvedEntry",
            DiagnosticKind::UnresolvedImport => "UnresolvedImport",
            DiagnosticKind::MissingExport => "MissingExport",
            DiagnosticKind::Plugin => "Plugin",
            DiagnosticKind::Other => "Error",
        };
        f.write_str(name)
    }
}

impl From<EventKind> for DiagnosticKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::ParseError | EventKind::JsonParseError => DiagnosticKind::ParseError,
            EventKind::UnresolvedEntry => DiagnosticKind::UnresolvedEntry,
            EventKind::UnresolvedImport
            | EventKind::ResolveError
            | EventKind::UnloadableDependencyError => DiagnosticKind::UnresolvedImport,
            EventKind::MissingExportError => DiagnosticKind::MissingExport,
            EventKind::PluginError => DiagnosticKind::Plugin,
            _ => DiagnosticKind::Other,
        }
    }
}

/// Extract every diagnostic of a failed build.
///
/// Paths in messages are shown relative to `cwd`.
pub fn extract_from_batch(batch: &BatchedBuildDiagnostic, cwd: &Path) -> Vec<ExtractedDiagnostic> {
    batch.iter().map(|diag| extract_single(diag, cwd)).collect()
}

fn extract_single(diag: &BuildDiagnostic, cwd: &Path) -> ExtractedDiagnostic {
    let options = DiagnosticOptions {
        cwd: cwd.to_path_buf(),
    };
    let rendered = diag.to_diagnostic_with(&options).to_string();

    // The rendered report carries the code frame; a few events only fill in
    // their short message.
    let message = match rendered.trim() {
        "" => diag.to_string(),
        text => text.to_string(),
    };

    let kind = DiagnosticKind::from(diag.kind());
    let specifier = match kind {
        DiagnosticKind::UnresolvedImport => extract_specifier(&message),
        _ => None,
    };

    ExtractedDiagnostic {
        kind,
        help: extract_help_text(&message),
        file: diag.id(),
        specifier,
        message,
    }
}

/// Specifier quoted in `Could not resolve '<specifier>' in <importer>`.
fn extract_specifier(text: &str) -> Option<String> {
    let start = text.find("Could not resolve '")? + "Could not resolve '".len();
    let len = text[start..].find('\'')?;
    Some(text[start..start + len].to_string())
}

fn extract_help_text(text: &str) -> Option<String> {
    for indicator in ["help: ", "Help: ", "hint: ", "Hint: "] {
        if let Some(pos) = text.find(indicator) {
            let help = text[pos + indicator.len()..]
                .lines()
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            if !help.is_empty() {
                return Some(help);
            }
        }
    }
    None
}

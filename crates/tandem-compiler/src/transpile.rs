//! Single-module transpilation on top of the oxc toolchain.
//!
//! Parse → semantic analysis → transform (TypeScript stripping, JSX, syntax
//! lowering to the configured target) → codegen with a source map.

use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions, CodegenReturn};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

use crate::{Error, Result};

/// Default syntax target. Compiled files are executed by a recent host
/// runtime, so a modern dialect is safe.
pub const DEFAULT_TARGET: &str = "es2022";

/// Options controlling a single transpilation.
#[derive(Debug, Clone)]
pub struct TranspileOptions {
    /// ECMAScript target understood by `TransformOptions::from_target`.
    pub target: String,
    /// Path recorded as the map's `sources` entry. Defaults to the input path.
    pub source_map_path: Option<PathBuf>,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            source_map_path: None,
        }
    }
}

/// Result of a successful transpilation.
#[derive(Debug, Clone)]
pub struct TranspileOutput {
    /// Generated code, without a `sourceMappingURL` comment.
    pub code: String,
    /// Source map JSON, carrying the original text in `sourcesContent`.
    pub map: Option<String>,
}

/// Source type for a recognized extension.
///
/// Plain `.js` files may carry JSX, matching what most toolchains accept.
fn source_type_for(path: &Path) -> SourceType {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") => SourceType::ts(),
        Some("tsx") => SourceType::tsx(),
        Some("mjs") => SourceType::mjs(),
        _ => SourceType::jsx(),
    }
}

/// Transpile `source` (the contents of `path`) to the configured target.
///
/// # Errors
///
/// Returns [`Error::Transpile`] when the module fails to parse or transform.
/// The message lists every reported diagnostic, one per line.
pub fn transpile(source: &str, path: &Path, options: &TranspileOptions) -> Result<TranspileOutput> {
    let allocator = Allocator::default();
    let source_type = source_type_for(path);

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        return Err(transpile_error(path, parsed.errors.iter().map(ToString::to_string)));
    }

    let mut program = parsed.program;

    let semantic = SemanticBuilder::new()
        .with_excess_capacity(2.0)
        .build(&program);
    let scoping = semantic.semantic.into_scoping();

    let transform_options = TransformOptions::from_target(&options.target).map_err(|e| {
        Error::Transpile {
            file: path.to_path_buf(),
            message: format!("invalid target '{}': {}", options.target, e),
        }
    })?;

    let transformed =
        Transformer::new(&allocator, path, &transform_options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(transpile_error(
            path,
            transformed.errors.iter().map(ToString::to_string),
        ));
    }

    let source_map_path = options
        .source_map_path
        .clone()
        .unwrap_or_else(|| path.to_path_buf());

    let CodegenReturn { code, map, .. } = Codegen::new()
        .with_options(CodegenOptions {
            source_map_path: Some(source_map_path),
            ..CodegenOptions::default()
        })
        .build(&program);

    Ok(TranspileOutput {
        code,
        map: map.map(|m| m.to_json_string()),
    })
}

fn transpile_error(path: &Path, messages: impl Iterator<Item = String>) -> Error {
    let mut message = messages.collect::<Vec<_>>().join("\n");
    if message.is_empty() {
        message = "parser aborted without a diagnostic".to_string();
    }
    Error::Transpile {
        file: path.to_path_buf(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_typescript_annotations() {
        let source = "export function execute(a: number, b: number): number { return a + b; }\n";
        let out = transpile(source, Path::new("utils.ts"), &TranspileOptions::default()).unwrap();

        assert!(out.code.contains("function execute(a, b)"));
        assert!(!out.code.contains(": number"));
        assert!(out.map.is_some());
    }

    #[test]
    fn test_map_records_source_path() {
        let options = TranspileOptions {
            source_map_path: Some(PathBuf::from("../../src/lib/utils.ts")),
            ..TranspileOptions::default()
        };
        let out = transpile("export const x: number = 1;\n", Path::new("/app/src/lib/utils.ts"), &options)
            .unwrap();

        let map = out.map.unwrap();
        assert!(map.contains("../../src/lib/utils.ts"));
    }

    #[test]
    fn test_map_embeds_original_source() {
        let source = "export const greeting: string = 'hi';\n";
        let out = transpile(source, Path::new("greeting.ts"), &TranspileOptions::default()).unwrap();

        assert!(!out.code.contains("sourceMappingURL"));
        assert!(out.map.unwrap().contains("greeting: string"));
    }

    #[test]
    fn test_syntax_error_is_reported_with_file() {
        let err = transpile("export const = ;\n", Path::new("broken.js"), &TranspileOptions::default())
            .unwrap_err();

        match err {
            Error::Transpile { file, message } => {
                assert_eq!(file, PathBuf::from("broken.js"));
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        let source = "import { a } from './a.js';\nexport const b = (x: string) => a + x;\n";
        let first = transpile(source, Path::new("b.ts"), &TranspileOptions::default()).unwrap();
        let second = transpile(source, Path::new("b.ts"), &TranspileOptions::default()).unwrap();

        assert_eq!(first.code, second.code);
        assert_eq!(first.map, second.map);
    }
}

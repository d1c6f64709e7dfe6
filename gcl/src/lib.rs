#![forbid(unsafe_code)]

//! Session façade: elaborates a program, then generates its proof
//! obligations and specification holes.
//!
//! Parsing belongs to the front-end. A syntax tree reaches this crate either
//! as a value or as its JSON encoding.

mod config;
mod error;

use std::fs;
use std::path::Path;

use gcl_ast::Program;
use gcl_core::{elaborate_program, TypedProgram};
use gcl_verify::{verify_program, ProofObligation, SpecHole, StructWarning, VerifyOutput};
use serde::{Deserialize, Serialize};

pub use config::{find_config, Config, CONFIG_FILE};
pub use error::Error;

/// Result of a successful run. Always complete: nothing partial is returned
/// on success.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub program: TypedProgram,
    pub obligations: Vec<ProofObligation>,
    pub specs: Vec<SpecHole>,
    pub warnings: Vec<StructWarning>,
}

impl Analysis {
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Others(e.to_string()))
    }
}

pub fn analyze(program: &Program, config: &Config) -> Result<Analysis, Error> {
    let typed = elaborate_program(program)?;
    let VerifyOutput {
        obligations,
        specs,
        warnings,
    } = verify_program(&typed, &config.verify)?;
    tracing::debug!(
        obligations = obligations.len(),
        specs = specs.len(),
        warnings = warnings.len(),
        "analysis finished"
    );
    Ok(Analysis {
        program: typed,
        obligations,
        specs,
        warnings,
    })
}

/// Decodes a JSON-encoded syntax tree.
pub fn parse_program_json(raw: &str) -> Result<Program, Error> {
    serde_json::from_str(raw).map_err(|e| Error::Parse {
        message: e.to_string(),
        span: gcl_ast::span(line_offset(raw, e.line(), e.column()), 0),
    })
}

/// Reads a JSON-encoded syntax tree from `path` and analyzes it with the
/// configuration discovered next to it.
pub fn analyze_file(path: &Path) -> Result<Analysis, Error> {
    let raw = fs::read_to_string(path).map_err(|e| Error::CannotReadFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let config = Config::discover(path)?;
    let program = parse_program_json(&raw)?;
    analyze(&program, &config)
}

/// Byte offset of a 1-based line and column.
fn line_offset(raw: &str, line: usize, column: usize) -> usize {
    let start: usize = raw
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (start + column.saturating_sub(1)).min(raw.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_count_previous_lines() {
        let raw = "ab\ncde\nf";
        assert_eq!(line_offset(raw, 1, 1), 0);
        assert_eq!(line_offset(raw, 2, 2), 4);
        assert_eq!(line_offset(raw, 9, 9), raw.len());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_program_json("{\n  \"defns\": oops").expect_err("not json");
        assert!(matches!(err, Error::Parse { .. }), "unexpected error: {err}");
        assert!(err.span().is_some());
    }
}

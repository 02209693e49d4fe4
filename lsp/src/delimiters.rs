//! Built-in engine: bracket balance.
//!
//! Reports unmatched, unclosed and mismatched `()`, `[]`, `{}` pairs, plus
//! unterminated string literals. String bodies and `#` comments are skipped.
//!
//! A file's state hash covers only its declaration lines (lines starting
//! with one of the configured keywords), so edits inside method bodies stay
//! on the fast path and anything that touches a declaration goes slow.

use std::sync::Arc;

use vigil_core::{
    Diagnostic, DiagnosticsByFile, ErrorClass, ErrorLine, ErrorSection, Location, SourceSnapshot,
    StateHash, StateHashes, SuggestedFix,
};

use crate::analysis::{AnalysisEngine, FileSet, Infeasible};
use crate::types::EngineConfig;

pub const UNMATCHED_CLOSER: ErrorClass = ErrorClass::error(1001);
pub const UNCLOSED_OPENER: ErrorClass = ErrorClass::error(1002);
pub const MISMATCHED_CLOSER: ErrorClass = ErrorClass::error(1003);
pub const UNTERMINATED_STRING: ErrorClass = ErrorClass::error(1004);

#[derive(Debug, Clone)]
pub struct DelimiterEngine {
    declaration_keywords: Vec<String>,
}

impl DelimiterEngine {
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            declaration_keywords: config.declaration_keywords.clone(),
        }
    }

    fn is_declaration(&self, line: &str) -> bool {
        let line = line.trim_start();
        self.declaration_keywords.iter().any(|keyword| {
            line.strip_prefix(keyword.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        })
    }
}

impl AnalysisEngine for DelimiterEngine {
    fn state_hash(&self, snapshot: &SourceSnapshot) -> StateHash {
        StateHash::of_lines(
            snapshot
                .text()
                .lines()
                .filter(|line| self.is_declaration(line))
                .map(str::trim),
        )
    }

    fn run_fast_path(
        &self,
        changed: &FileSet,
        hashes: &StateHashes,
    ) -> Result<DiagnosticsByFile, Infeasible> {
        for (id, snapshot) in changed {
            if hashes.matches(*id, self.state_hash(snapshot)) {
                continue;
            }
            let reason = if hashes.get(*id).is_some() {
                "declarations changed in"
            } else {
                "no recorded state for"
            };
            return Err(Infeasible::new(format!("{reason} {}", snapshot.path())));
        }
        Ok(changed
            .iter()
            .map(|(id, snapshot)| (*id, check(snapshot)))
            .collect())
    }

    fn run_slow_path(&self, files: &FileSet) -> DiagnosticsByFile {
        files
            .iter()
            .map(|(id, snapshot)| (*id, check(snapshot)))
            .collect()
    }
}

fn closer_for(opener: u8) -> u8 {
    match opener {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    }
}

fn span(snapshot: &Arc<SourceSnapshot>, offset: usize) -> Location {
    let begin = offset as u32;
    Location::new(snapshot, begin, begin + 1).unwrap_or_else(|_| Location::none())
}

/// Scan one file.
fn check(snapshot: &Arc<SourceSnapshot>) -> Vec<Diagnostic> {
    let bytes = snapshot.text().as_bytes();
    let mut open: Vec<(u8, usize)> = Vec::new();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                i = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |n| i + n);
                continue;
            }
            quote @ (b'"' | b'\'') => {
                let start = i;
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => {
                            found.push(Diagnostic::new(
                                span(snapshot, start),
                                UNTERMINATED_STRING,
                                "unterminated string literal",
                            ));
                            break;
                        }
                        Some(&b'\\') => i += 2,
                        Some(&b) if b == quote => break,
                        Some(_) => i += 1,
                    }
                }
            }
            opener @ (b'(' | b'[' | b'{') => open.push((opener, i)),
            closer @ (b')' | b']' | b'}') => {
                let text = char::from(closer);
                match open.pop() {
                    None => found.push(
                        Diagnostic::new(
                            span(snapshot, i),
                            UNMATCHED_CLOSER,
                            format!("unexpected `{text}`"),
                        )
                        .with_fix(SuggestedFix::new(
                            format!("Delete `{text}`"),
                            span(snapshot, i),
                            "",
                        )),
                    ),
                    Some((opener, _)) if closer_for(opener) == closer => {}
                    Some((opener, at)) => {
                        let expected = char::from(closer_for(opener));
                        found.push(
                            Diagnostic::new(
                                span(snapshot, i),
                                MISMATCHED_CLOSER,
                                format!("mismatched `{text}`, expected `{expected}`"),
                            )
                            .with_section(ErrorSection::new(
                                format!("`{}` opened here", char::from(opener)),
                                vec![ErrorLine::new(span(snapshot, at), "")],
                            ))
                            .with_fix(SuggestedFix::new(
                                format!("Replace with `{expected}`"),
                                span(snapshot, i),
                                expected.to_string(),
                            )),
                        );
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    for (opener, at) in open {
        found.push(Diagnostic::new(
            span(snapshot, at),
            UNCLOSED_OPENER,
            format!("unclosed `{}`", char::from(opener)),
        ));
    }
    found.sort_by_key(|d| d.location().begin_offset());
    found
}

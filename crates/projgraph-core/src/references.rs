//! Static reference extraction.
//!
//! Parsing is an external concern; the graph builder only needs the list of
//! module specifiers and reference directives a document names, in source
//! order. [`ReferenceScanner`] is that seam, and [`PatternScanner`] is a
//! lightweight regex-based implementation good enough for preprocessing.

use once_cell::sync::Lazy;
use regex::Regex;

/// Kind of static reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `import ... from "x"`, `export ... from "x"`, `require("x")`, `import("x")`
    Module,
    /// `/// <reference path="x" />`
    Path,
    /// `/// <reference types="x" />`
    Types,
}

/// A single reference found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReference {
    pub specifier: String,
    pub kind: ReferenceKind,
    /// Zero-based line of the reference.
    pub line: u32,
}

/// All static references of a document, each list in source-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReferences {
    pub modules: Vec<SourceReference>,
    pub directives: Vec<SourceReference>,
}

impl SourceReferences {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.directives.is_empty()
    }

    /// Module specifiers first, then reference directives.
    pub fn iter(&self) -> impl Iterator<Item = &SourceReference> {
        self.modules.iter().chain(self.directives.iter())
    }
}

/// Extracts static references from source text.
pub trait ReferenceScanner: Send + Sync {
    fn scan(&self, text: &str) -> SourceReferences;
}

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*///\s*<reference\s+(path|types)\s*=\s*["']([^"']+)["']\s*/?>"#)
        .expect("valid directive regex")
});

static MODULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"\b(?:import|export)\b[^'";]*?\bfrom\s*["']([^"'\n]+)["']"#,
        r#"|\bimport\s*["']([^"'\n]+)["']"#,
        r#"|\b(?:require|import)\s*\(\s*["']([^"'\n]+)["']\s*\)"#,
    ))
    .expect("valid module regex")
});

/// Regex-based reference scanner.
///
/// # Examples
///
/// ```
/// use projgraph_core::{PatternScanner, ReferenceScanner};
///
/// let refs = PatternScanner.scan(
///     "///<reference path=\"b.ts\"/>\nimport { y } from \"./b\";\nexport * from './c';",
/// );
/// let modules: Vec<_> = refs.modules.iter().map(|r| r.specifier.as_str()).collect();
/// assert_eq!(modules, vec!["./b", "./c"]);
/// assert_eq!(refs.directives[0].specifier, "b.ts");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternScanner;

fn line_of(text: &str, offset: usize) -> u32 {
    text[..offset].bytes().filter(|b| *b == b'\n').count() as u32
}

impl ReferenceScanner for PatternScanner {
    fn scan(&self, text: &str) -> SourceReferences {
        let mut refs = SourceReferences::default();

        for (line_num, line) in text.lines().enumerate() {
            if let Some(caps) = DIRECTIVE.captures(line) {
                let kind = if &caps[1] == "types" {
                    ReferenceKind::Types
                } else {
                    ReferenceKind::Path
                };
                refs.directives.push(SourceReference {
                    specifier: caps[2].to_string(),
                    kind,
                    line: line_num as u32,
                });
            }
        }

        for caps in MODULE.captures_iter(text) {
            let Some(m) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
                continue;
            };
            refs.modules.push(SourceReference {
                specifier: m.as_str().to_string(),
                kind: ReferenceKind::Module,
                line: line_of(text, m.start()),
            });
        }

        tracing::trace!(
            "scanned {} module specifiers and {} reference directives",
            refs.modules.len(),
            refs.directives.len()
        );
        refs
    }
}

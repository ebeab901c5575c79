//! Specifier classification and extraction.
//!
//! Finds the module specifiers inside a source file (import declarations,
//! `export ... from`, dynamic `import()` calls and `import ... = require()`
//! clauses) and decides, for each one, whether it names a relative path that
//! carries a recognized source extension and should therefore be rewritten.
//!
//! Classification is deliberately conservative: any expression shape the
//! classifier does not recognize yields an empty classification and the
//! specifier is left untouched.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tree_sitter::{Node, Parser, Tree};

use crate::error::{DualError, Result};

/// Trailing `.js` extension, tolerating the closing quote/backtick of the
/// surrounding expression text.
static JS_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\.js['"`\s]*$"#).unwrap());

/// Leading `./` or `../`, tolerating the opening quote/backtick.
static RELATIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^['"`\s]*\.\.?/"#).unwrap());

/// Characters stripped when collapsing a concatenation expression down to
/// the path-like text it denotes.
static COLLAPSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"`+)\s]|new String\("#).unwrap());

/// Whether a specifier value ends in a recognized source extension.
pub fn has_js_ext(value: &str) -> bool {
    JS_EXT_RE.is_match(value)
}

/// Whether a specifier value denotes a relative path.
///
/// A template literal that opens with an interpolation is treated as
/// relative whenever its tail carries a recognized extension. The
/// interpolation could expand to anything at runtime, so this is a
/// documented heuristic, not a guarantee.
pub fn is_relative(value: &str) -> bool {
    RELATIVE_RE.is_match(value) || (value.starts_with("`${") && has_js_ext(value))
}

/// The module kind a file's own extension locks it to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// `.mjs` / `.mts`: always an ES module
    Esm,
    /// `.cjs` / `.cts`: always CommonJS
    Cjs,
    /// Plain `.js`-family extension; kind decided by the build target
    Ambiguous,
}

/// Detect the module kind encoded by a file name's extension.
pub fn module_kind(file: &Path) -> ModuleKind {
    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if name.ends_with(".mjs") || name.ends_with(".mts") {
        ModuleKind::Esm
    } else if name.ends_with(".cjs") || name.ends_with(".cts") {
        ModuleKind::Cjs
    } else {
        ModuleKind::Ambiguous
    }
}

/// Whether a file is a TypeScript declaration file (`.d.ts`, `.d.mts`, `.d.cts`).
pub fn is_declaration_file(file: &Path) -> bool {
    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");

    name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts")
}

/// The classified value of one specifier expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Verbatim source text of the expression, quotes and all
    pub value: String,
    /// Denotes a relative path
    pub is_relative: bool,
    /// Carries a recognized source extension
    pub has_source_ext: bool,
}

impl Classification {
    fn none() -> Self {
        Self {
            value: String::new(),
            is_relative: false,
            has_source_ext: false,
        }
    }

    /// Only relative specifiers with a recognized extension are rewritten.
    pub fn is_rewritable(&self) -> bool {
        self.is_relative && self.has_source_ext
    }
}

/// Classify a specifier expression node.
///
/// Recognizes string literals, template literals, `+`-concatenations and a
/// single-argument `new String(...)` wrapper. The wrapper is unwrapped at
/// most one level deep; anything more exotic classifies as a no-op.
pub fn classify(node: Node<'_>, source: &str) -> Classification {
    classify_depth(node, source, 0)
}

fn classify_depth(node: Node<'_>, source: &str, depth: usize) -> Classification {
    let slice = |n: Node<'_>| source[n.start_byte()..n.end_byte()].to_string();

    match node.kind() {
        "string" | "template_string" => {
            let value = slice(node);
            let is_relative = is_relative(&value);
            let has_source_ext = has_js_ext(&value);

            Classification {
                value,
                is_relative,
                has_source_ext,
            }
        }
        "binary_expression" => {
            let is_concat = node
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "+");

            if !is_concat {
                return Classification::none();
            }

            // The collapsed form drops quotes, `+`, whitespace and any
            // `new String(` wrapper so `'./a' + '.js'` tests like `./a.js`.
            let value = slice(node);
            let collapsed = COLLAPSE_RE.replace_all(&value, "").into_owned();
            let is_relative = is_relative(&collapsed);
            let has_source_ext = has_js_ext(&collapsed);

            Classification {
                value,
                is_relative,
                has_source_ext,
            }
        }
        "new_expression" => {
            if depth > 0 {
                return Classification::none();
            }

            let is_string_box = node
                .child_by_field_name("constructor")
                .is_some_and(|c| c.kind() == "identifier" && &source[c.byte_range()] == "String");

            if !is_string_box {
                return Classification::none();
            }

            node.child_by_field_name("arguments")
                .and_then(|args| args.named_child(0))
                .map(|arg| classify_depth(arg, source, depth + 1))
                .unwrap_or_else(Classification::none)
        }
        _ => Classification::none(),
    }
}

/// One specifier occurrence within a source file: the byte span of the
/// expression in the original text plus its classification.
#[derive(Debug, Clone)]
pub struct SpecifierSite {
    pub start: usize,
    pub end: usize,
    pub classification: Classification,
}

/// Parse a source file with the TypeScript grammar (TSX for `.tsx`/`.jsx`).
///
/// The TypeScript grammar is a superset of JavaScript for the syntax this
/// tool cares about, so plain `.js`/`.mjs`/`.cjs` inputs parse with it too.
pub fn parse(file: &Path, source: &str) -> Result<Tree> {
    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let language = if name.ends_with(".tsx") || name.ends_with(".jsx") {
        tree_sitter_typescript::language_tsx()
    } else {
        tree_sitter_typescript::language_typescript()
    };

    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| DualError::Parse {
            file: file.to_path_buf(),
            message: format!("failed to load grammar: {e}"),
        })?;

    parser.parse(source, None).ok_or_else(|| DualError::Parse {
        file: file.to_path_buf(),
        message: "parser produced no syntax tree".into(),
    })
}

/// Extract every specifier site from a parsed file.
///
/// Covers import declarations, `export ... from` declarations, dynamic
/// `import()` call expressions (including type-level `import("...")` where
/// the grammar exposes them as calls) and `import x = require("...")`.
pub fn extract_specifiers(tree: &Tree, source: &str) -> Vec<SpecifierSite> {
    let mut sites = Vec::new();
    let mut stack = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        let spec_node = match node.kind() {
            "import_statement" | "export_statement" | "import_require_clause" => {
                node.child_by_field_name("source")
            }
            "call_expression" => {
                let is_dynamic_import = node
                    .child_by_field_name("function")
                    .is_some_and(|f| f.kind() == "import");

                if is_dynamic_import {
                    node.child_by_field_name("arguments")
                        .and_then(|args| args.named_child(0))
                } else {
                    None
                }
            }
            _ => None,
        };

        if let Some(spec) = spec_node {
            sites.push(SpecifierSite {
                start: spec.start_byte(),
                end: spec.end_byte(),
                classification: classify(spec, source),
            });
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }

    sites
}

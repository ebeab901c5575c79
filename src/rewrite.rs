//! Extension rewrite engine.
//!
//! Two independent [`SourceEditor`] buffers (one per module target) accept
//! text edits addressed by byte ranges of the *original* source, so the ESM
//! and CJS rewrites of one file diverge freely without touching a shared
//! mutable tree. Edits within one buffer must not overlap; each specifier
//! occupies exactly one span.

use crate::outpath::ExtensionMap;
use crate::specifier::SpecifierSite;

/// An edit buffer over one immutable source string.
///
/// Replacements are recorded against original byte offsets and spliced in a
/// single pass when the final text is produced.
#[derive(Debug)]
pub struct SourceEditor<'s> {
    source: &'s str,
    edits: Vec<Edit>,
}

#[derive(Debug)]
struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

impl<'s> SourceEditor<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    /// Record a replacement for the half-open byte range `start..end`.
    pub fn update(&mut self, start: usize, end: usize, replacement: String) {
        debug_assert!(start <= end && end <= self.source.len());
        self.edits.push(Edit {
            start,
            end,
            replacement,
        });
    }

    /// Apply all recorded edits and return the patched text.
    pub fn finish(mut self) -> String {
        self.edits.sort_by_key(|e| e.start);

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;

        for edit in &self.edits {
            debug_assert!(edit.start >= cursor, "overlapping edits");
            out.push_str(&self.source[cursor..edit.start]);
            out.push_str(&edit.replacement);
            cursor = edit.end;
        }
        out.push_str(&self.source[cursor..]);

        out
    }
}

/// Replace the last occurrence of the literal `.js` in a specifier value
/// with an output extension, leaving everything around it (quotes, template
/// syntax, concatenation operators) untouched.
///
/// This is a raw text splice, not an extension parse; callers gate on
/// [`Classification::is_rewritable`](crate::specifier::Classification) so
/// only values whose tail is a recognized extension get here. Returns
/// `None` when the value holds no `.js` at all, in which case the
/// specifier passes through unmodified for that target.
pub fn replace_js_ext(value: &str, out_ext: &str) -> Option<String> {
    let idx = value.rfind(".js")?;
    let tail = &value[idx + ".js".len()..];

    Some(format!("{}{}{}", &value[..idx], out_ext, tail))
}

/// Apply one specifier rewrite to both target buffers.
///
/// No-op unless the specifier classified as a relative path with a
/// recognized source extension.
pub fn rewrite_specifier(
    esm: &mut SourceEditor<'_>,
    cjs: &mut SourceEditor<'_>,
    site: &SpecifierSite,
    exts: &ExtensionMap,
) {
    if !site.classification.is_rewritable() {
        return;
    }

    if let Some(replacement) = replace_js_ext(&site.classification.value, &exts.esm) {
        esm.update(site.start, site.end, replacement);
    }
    if let Some(replacement) = replace_js_ext(&site.classification.value, &exts.cjs) {
        cjs.update(site.start, site.end, replacement);
    }
}

/// Produce the ESM- and CJS-patched copies of one source file.
pub fn patch_source(source: &str, sites: &[SpecifierSite], exts: &ExtensionMap) -> (String, String) {
    let mut esm = SourceEditor::new(source);
    let mut cjs = SourceEditor::new(source);

    for site in sites {
        rewrite_specifier(&mut esm, &mut cjs, site, exts);
    }

    (esm.finish(), cjs.finish())
}

//! Output path policy.
//!
//! Pure functions mapping an input file name plus a build target to the
//! extension its output artifact carries, and the matching declaration-file
//! names. The three modes (keep-original, explicit map, default inference)
//! are mutually exclusive; the configuration layer guarantees at most one is
//! active before any of this runs.

use std::path::{Path, PathBuf};

use crate::specifier::{module_kind, ModuleKind};

/// Which of the two builds an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Esm,
    Cjs,
}

/// Output extensions per target. Either may be a compound extension such as
/// `.esm.js`; only the final segment decides declaration suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMap {
    pub esm: String,
    pub cjs: String,
}

impl Default for ExtensionMap {
    fn default() -> Self {
        Self {
            esm: ".js".into(),
            cjs: ".cjs".into(),
        }
    }
}

/// How output extensions are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionPolicy {
    /// Preserve each input file's own extension
    Keep,
    /// Explicit (or default) per-target extensions
    Map(ExtensionMap),
}

impl ExtensionPolicy {
    /// The active extension map, when one exists.
    pub fn map(&self) -> Option<&ExtensionMap> {
        match self {
            ExtensionPolicy::Keep => None,
            ExtensionPolicy::Map(map) => Some(map),
        }
    }
}

/// Final single-segment extension of a file name, `None` for extension-less
/// names and for names that *are* a lone extension (`.cjs` has no extension
/// of its own).
fn last_ext(name: &str) -> Option<&str> {
    name.rfind('.')
        .filter(|&idx| idx > 0)
        .map(|idx| &name[idx..])
}

/// Compute the output extension for one file and target.
///
/// Module-locked inputs (`.mjs`/`.cjs`/`.mts`/`.cts`) are normalized to the
/// plain `.js` extension for both targets: their module kind is encoded by
/// placement in the dual output layout, not by suffix. `keep` mode wins over
/// everything, including the lock.
pub fn out_ext(file: &Path, target: Target, policy: &ExtensionPolicy) -> String {
    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");

    match policy {
        ExtensionPolicy::Keep => last_ext(name).unwrap_or("").to_string(),
        ExtensionPolicy::Map(map) => {
            if module_kind(file) != ModuleKind::Ambiguous {
                return ".js".into();
            }

            match target {
                Target::Esm => map.esm.clone(),
                Target::Cjs => map.cjs.clone(),
            }
        }
    }
}

/// Swap a path's final extension for `ext`.
pub fn with_out_ext(path: &Path, ext: &str) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let stem = match last_ext(name) {
        Some(old) => &name[..name.len() - old.len()],
        None => name,
    };

    path.with_file_name(format!("{stem}{ext}"))
}

/// Compute the per-target names of a declaration file.
///
/// Only plain `.d.ts` names are renamed; `.d.mts` and `.d.cts` already
/// encode their module kind and pass through unchanged. The ESM name picks
/// up any compound prefix from the ESM extension (`.esm.js` yields
/// `name.esm.d.ts`). The CJS name does the same, and when the CJS output
/// extension's final segment is the `.cjs` marker the declaration suffix is
/// forced to `.d.cts`; a plain `.d.ts` is not valid next to `.cjs` code.
pub fn dts_out_names(file_name: &str, map: &ExtensionMap) -> (String, String) {
    let Some(stem) = file_name.strip_suffix(".d.ts") else {
        return (file_name.to_string(), file_name.to_string());
    };

    let esm_out = last_ext(&map.esm).unwrap_or(&map.esm);
    let esm_prefix = map.esm.strip_suffix(esm_out).unwrap_or("");
    let esm_name = format!("{stem}{esm_prefix}.d.ts");

    let cjs_out = last_ext(&map.cjs).unwrap_or(&map.cjs);
    let cjs_prefix = map.cjs.strip_suffix(cjs_out).unwrap_or("");
    let cjs_suffix = if cjs_out == ".cjs" { ".d.cts" } else { ".d.ts" };
    let cjs_name = format!("{stem}{cjs_prefix}{cjs_suffix}");

    (esm_name, cjs_name)
}

//! The source-transform capability.
//!
//! Language-level compilation (syntax downleveling, module-format
//! conversion) is not this tool's job; the driver hands each patched source
//! to a [`Transform`] implementation once per module target. The built-in
//! [`PassthroughTransform`] emits the patched text unchanged, which is
//! enough for packages that ship modern syntax and let the specifier
//! rewrites plus the dual directory layout do the work.

use std::path::Path;

use crate::error::Result;

/// The module format a single transform invocation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    /// Leave declarative import/export syntax in place
    Esm,
    /// Convert to require/module.exports semantics
    CommonJs,
}

/// Options for one transform invocation.
#[derive(Debug, Clone)]
pub struct ModuleOptions {
    pub format: ModuleFormat,
    pub minify: bool,
    pub source_maps: bool,
}

/// The result of one transform invocation.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub code: String,
    /// Raw source map, written as a `.map` sidecar when present
    pub map: Option<serde_json::Value>,
}

/// A source-to-source compiler the driver invokes twice per file.
///
/// Implementations must be shareable across concurrently building files.
pub trait Transform: Send + Sync {
    fn transform(
        &self,
        file: &Path,
        source: &str,
        options: &ModuleOptions,
    ) -> Result<TransformOutput>;
}

/// Identity transform: no downleveling, no module conversion, no maps.
#[derive(Debug, Default)]
pub struct PassthroughTransform;

impl Transform for PassthroughTransform {
    fn transform(
        &self,
        _file: &Path,
        source: &str,
        _options: &ModuleOptions,
    ) -> Result<TransformOutput> {
        Ok(TransformOutput {
            code: source.to_string(),
            map: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_passthrough_is_identity() {
        let options = ModuleOptions {
            format: ModuleFormat::CommonJs,
            minify: true,
            source_maps: true,
        };
        let out = PassthroughTransform
            .transform(&PathBuf::from("a.js"), "import x from './a.cjs'\n", &options)
            .unwrap();

        assert_eq!(out.code, "import x from './a.cjs'\n");
        assert!(out.map.is_none());
    }
}

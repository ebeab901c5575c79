//! Build configuration.
//!
//! Turns parsed CLI arguments into a validated [`BuildConfig`] the driver
//! can trust: the extension map is parsed against its grammar, the eligible
//! extension list is normalized, and the nearest package.json is checked for
//! `"type": "module"`. Everything mutually exclusive is rejected here, never
//! inside the core.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::cli::{Cli, RootMode};
use crate::error::{DualError, Result};
use crate::outpath::{ExtensionMap, ExtensionPolicy};

/// `esm:<ext>,cjs:<ext>` in either order; each extension is one or more
/// dot-led word segments.
static EXT_MAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^esm:((?:\.\w+)+),cjs:((?:\.\w+)+)$|^cjs:((?:\.\w+)+),esm:((?:\.\w+)+)$").unwrap()
});

/// Validated configuration for one build invocation.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root of the ESM output tree
    pub out_dir: PathBuf,
    /// Root of the CJS output tree (equals `out_dir` when `no_cjs_dir`)
    pub cjs_dir: PathBuf,
    pub no_cjs_dir: bool,
    /// File extensions eligible for compilation, dots included
    pub extensions: Vec<String>,
    pub policy: ExtensionPolicy,
    pub keep_file_extension: bool,
    pub source_maps: bool,
    pub minified: bool,
    pub copy_files: bool,
    /// Input files and directories, in positional order
    pub files: Vec<PathBuf>,
}

impl BuildConfig {
    /// Build and validate a configuration from CLI arguments, checking the
    /// surrounding package against `--root-mode`.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        Self::from_cli_in(cli, &std::env::current_dir()?)
    }

    /// Like [`BuildConfig::from_cli`], rooted at an explicit directory.
    pub fn from_cli_in(cli: &Cli, cwd: &Path) -> Result<Self> {
        if cli.files.is_empty() {
            return Err(DualError::Config(
                "No filenames found. Did you forget to pass <FILES>?".into(),
            ));
        }

        check_package(cwd, cli.root_mode)?;

        let policy = if cli.keep_file_extension {
            ExtensionPolicy::Keep
        } else {
            match &cli.out_file_extension {
                Some(raw) => ExtensionPolicy::Map(parse_extension_map(raw)?),
                None => ExtensionPolicy::Map(ExtensionMap::default()),
            }
        };

        let extensions = cli
            .extensions
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|e| {
                if e.starts_with('.') {
                    Ok(e.to_string())
                } else {
                    Err(DualError::Config(format!(
                        "Invalid extension '{e}' for --extensions."
                    )))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let out_dir = cwd.join(&cli.out_dir);
        let cjs_dir = if cli.no_cjs_dir {
            out_dir.clone()
        } else {
            out_dir.join(&cli.cjs_dir_name)
        };

        Ok(Self {
            out_dir,
            cjs_dir,
            no_cjs_dir: cli.no_cjs_dir,
            extensions,
            policy,
            keep_file_extension: cli.keep_file_extension,
            source_maps: cli.source_maps,
            minified: cli.minified,
            copy_files: cli.copy_files,
            files: cli.files.iter().map(|f| cwd.join(f)).collect(),
        })
    }

    /// Whether a file's extension makes it eligible for compilation.
    pub fn is_eligible(&self, file: &Path) -> bool {
        let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");

        self.extensions
            .iter()
            .any(|ext| name.ends_with(ext.as_str()) && name.len() > ext.len())
    }
}

/// Parse an `--out-file-extension` argument.
pub fn parse_extension_map(raw: &str) -> Result<ExtensionMap> {
    let caps = EXT_MAP_RE.captures(raw).ok_or_else(|| {
        DualError::Config(format!("Invalid arg '{raw}' for --out-file-extension."))
    })?;

    let esm = caps.get(1).or(caps.get(4)).map(|m| m.as_str().to_string());
    let cjs = caps.get(2).or(caps.get(3)).map(|m| m.as_str().to_string());

    match (esm, cjs) {
        (Some(esm), Some(cjs)) => Ok(ExtensionMap { esm, cjs }),
        _ => Err(DualError::Config(format!(
            "Invalid arg '{raw}' for --out-file-extension."
        ))),
    }
}

/// The subset of package.json this tool cares about.
#[derive(Debug, Deserialize)]
struct PackageJson {
    #[serde(rename = "type")]
    package_type: Option<String>,
}

/// Locate the governing package.json per the root mode and require
/// `"type": "module"`. Dual builds only make sense for ESM-first packages.
fn check_package(cwd: &Path, root_mode: RootMode) -> Result<()> {
    let candidate = match root_mode {
        RootMode::Root => {
            let path = cwd.join("package.json");
            path.is_file().then_some(path)
        }
        RootMode::Upward | RootMode::UpwardOptional => cwd
            .ancestors()
            .map(|dir| dir.join("package.json"))
            .find(|path| path.is_file()),
    };

    let Some(path) = candidate else {
        if root_mode == RootMode::UpwardOptional {
            return Ok(());
        }
        return Err(DualError::PackageJsonNotFound(cwd.display().to_string()));
    };

    let raw = std::fs::read_to_string(&path)?;
    let pkg: PackageJson = serde_json::from_str(&raw)?;

    if pkg.package_type.as_deref() != Some("module") {
        return Err(DualError::NotEsModule);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extension_map_both_orders() {
        let map = parse_extension_map("esm:.js,cjs:.cjs").unwrap();
        assert_eq!(map.esm, ".js");
        assert_eq!(map.cjs, ".cjs");

        let map = parse_extension_map("cjs:.cjs.js,esm:.esm.js").unwrap();
        assert_eq!(map.esm, ".esm.js");
        assert_eq!(map.cjs, ".cjs.js");
    }

    #[test]
    fn test_parse_extension_map_rejects_garbage() {
        assert!(parse_extension_map("esm:.js").is_err());
        assert!(parse_extension_map("esm:js,cjs:cjs").is_err());
        assert!(parse_extension_map("mjs:.js,cjs:.cjs").is_err());
        assert!(parse_extension_map("").is_err());
    }

    #[test]
    fn test_eligibility() {
        let config = BuildConfig {
            out_dir: PathBuf::from("dist"),
            cjs_dir: PathBuf::from("dist/cjs"),
            no_cjs_dir: false,
            extensions: vec![".js".into(), ".jsx".into(), ".mjs".into(), ".cjs".into()],
            policy: ExtensionPolicy::Map(ExtensionMap::default()),
            keep_file_extension: false,
            source_maps: false,
            minified: false,
            copy_files: false,
            files: vec![],
        };

        assert!(config.is_eligible(Path::new("a.js")));
        assert!(config.is_eligible(Path::new("a.mjs")));
        assert!(!config.is_eligible(Path::new("a.ts")));
        assert!(!config.is_eligible(Path::new("a.css")));
        // A bare `.js` file name has no stem to compile.
        assert!(!config.is_eligible(Path::new(".js")));
    }
}

//! Declaration synchronization.
//!
//! After every source emission has completed, this pass scans the output
//! tree for TypeScript declaration files (freshly emitted or pre-existing),
//! rewrites their specifiers per target exactly like the code pass, renames
//! them per the output path policy and mirrors them into the CJS tree.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::error::Result;
use crate::outpath::{dts_out_names, ExtensionPolicy};
use crate::rewrite::patch_source;
use crate::specifier::{self, is_declaration_file};

/// Synchronize every declaration file under the output directory with the
/// emitted code. Returns the number of files updated.
///
/// Must only run after all source emissions have completed; it discovers
/// declaration files by scanning the materialized output tree.
pub async fn sync_declarations(config: &BuildConfig) -> Result<usize> {
    if !config.out_dir.exists() {
        return Ok(0);
    }

    let mut updated = 0;

    for file in collect_declaration_files(config) {
        sync_one(config, &file).await?;
        updated += 1;
    }

    Ok(updated)
}

async fn sync_one(config: &BuildConfig, file: &Path) -> Result<()> {
    let rel = pathdiff::diff_paths(file, &config.out_dir)
        .or_else(|| file.file_name().map(PathBuf::from))
        .unwrap_or_else(|| file.to_path_buf());

    let map = match &config.policy {
        // Keep mode: the CJS side gets a byte-for-byte copy, no rewriting.
        ExtensionPolicy::Keep => {
            let out_cjs = config.cjs_dir.join(&rel);

            if out_cjs != *file {
                if let Some(parent) = out_cjs.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::copy(file, &out_cjs).await?;
            }

            return Ok(());
        }
        ExtensionPolicy::Map(map) => map,
    };

    let source = fs::read_to_string(file).await?;
    let tree = specifier::parse(file, &source)?;
    let sites = specifier::extract_specifiers(&tree, &source);
    let (esm_text, cjs_text) = patch_source(&source, &sites, map);

    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let (esm_name, cjs_name) = dts_out_names(name, map);
    let out_esm = config.out_dir.join(&rel).with_file_name(&esm_name);
    let out_cjs = config.cjs_dir.join(&rel).with_file_name(&cjs_name);

    if let Some(parent) = out_cjs.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::write(&out_esm, &esm_text).await?;
    fs::write(&out_cjs, &cjs_text).await?;

    // An explicit extension map can rename the ESM declaration; once the
    // replacement exists, the old name is an unreachable duplicate.
    if out_esm != *file {
        fs::remove_file(file).await?;
    }

    debug!(file = %file.display(), esm = %out_esm.display(), cjs = %out_cjs.display(), "declaration synchronized");

    Ok(())
}

/// Declaration files under the ESM output tree. The CJS subtree is skipped
/// so a second run over an already synchronized tree is a fixed point.
fn collect_declaration_files(config: &BuildConfig) -> Vec<PathBuf> {
    WalkDir::new(&config.out_dir)
        .into_iter()
        .filter_entry(|entry| config.no_cjs_dir || entry.path() != config.cjs_dir)
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_declaration_file(path))
        .collect()
}

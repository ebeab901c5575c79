//! Dual emission driver.
//!
//! Walks the input positionals, builds every eligible file into the ESM and
//! CJS output trees, and returns a structured [`BuildSummary`]. Files are
//! independent of one another and build concurrently; a strict barrier
//! separates all emissions from the declaration synchronization pass, which
//! scans the fully materialized output tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::BuildConfig;
use crate::declarations::sync_declarations;
use crate::error::{DualError, Result};
use crate::outpath::{out_ext, with_out_ext, ExtensionPolicy, Target};
use crate::rewrite::patch_source;
use crate::specifier::{self, is_declaration_file, module_kind, ModuleKind};
use crate::transform::{ModuleFormat, ModuleOptions, Transform};

/// Structured result of one build run. Presentation is the caller's job.
#[derive(Debug, Default)]
pub struct BuildSummary {
    /// Files compiled into both targets
    pub files_compiled: usize,
    /// Wall time spent compiling source files
    pub compile_time: Duration,
    /// Declaration files rewritten or copied by the sync pass
    pub dts_files_updated: usize,
    /// Wall time spent in the sync pass
    pub dts_time: Duration,
    /// Per-file parse/transform failures; the rest of the run continued
    pub failures: Vec<FileFailure>,
}

/// A failure scoped to a single file.
#[derive(Debug)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: DualError,
}

enum Outcome {
    Compiled,
    Copied,
}

/// Run a full dual build: emit every input file, then synchronize
/// declaration files over the output tree.
pub async fn run_build(config: BuildConfig, transform: Arc<dyn Transform>) -> Result<BuildSummary> {
    let config = Arc::new(config);
    let mut summary = BuildSummary::default();
    let mut tasks: JoinSet<(PathBuf, Result<Outcome>)> = JoinSet::new();
    let start = Instant::now();

    for positional in &config.files {
        let Ok(metadata) = fs::metadata(positional).await else {
            // Bogus positionals are skipped, not fatal.
            debug!(path = %positional.display(), "input path not found, skipping");
            continue;
        };

        if metadata.is_file() {
            if config.is_eligible(positional) && !is_declaration_file(positional) {
                spawn_build(&mut tasks, &config, &transform, positional.clone(), None);
            }
        } else {
            for file in collect_files(positional) {
                let base = Some(positional.clone());

                if config.is_eligible(&file) && !is_declaration_file(&file) {
                    spawn_build(&mut tasks, &config, &transform, file, base);
                } else if config.copy_files {
                    spawn_copy(&mut tasks, &config, file, base);
                }
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        let (file, result) = joined.map_err(|e| DualError::Other(e.to_string()))?;

        match result {
            Ok(Outcome::Compiled) => summary.files_compiled += 1,
            Ok(Outcome::Copied) => {}
            Err(error) if error.is_per_file() => {
                warn!(file = %file.display(), %error, "file failed to build");
                summary.failures.push(FileFailure { file, error });
            }
            Err(error) => return Err(error),
        }
    }

    summary.compile_time = start.elapsed();

    // Barrier: every emission above has completed before the sync pass
    // scans the output tree.
    let dts_start = Instant::now();
    summary.dts_files_updated = sync_declarations(&config).await?;
    summary.dts_time = dts_start.elapsed();

    Ok(summary)
}

fn spawn_build(
    tasks: &mut JoinSet<(PathBuf, Result<Outcome>)>,
    config: &Arc<BuildConfig>,
    transform: &Arc<dyn Transform>,
    file: PathBuf,
    base: Option<PathBuf>,
) {
    let config = Arc::clone(config);
    let transform = Arc::clone(transform);

    tasks.spawn(async move {
        let result = build_file(&config, transform.as_ref(), &file, base.as_deref()).await;

        (file, result.map(|()| Outcome::Compiled))
    });
}

fn spawn_copy(
    tasks: &mut JoinSet<(PathBuf, Result<Outcome>)>,
    config: &Arc<BuildConfig>,
    file: PathBuf,
    base: Option<PathBuf>,
) {
    let config = Arc::clone(config);

    tasks.spawn(async move {
        let result = copy_file(&config, &file, base.as_deref()).await;

        (file, result.map(|()| Outcome::Copied))
    });
}

/// Compile one source file into both targets.
async fn build_file(
    config: &BuildConfig,
    transform: &dyn Transform,
    file: &Path,
    base: Option<&Path>,
) -> Result<()> {
    let source = fs::read_to_string(file).await?;

    // Keep mode passes the file through untouched; otherwise produce the
    // two divergently patched copies.
    let (esm_source, cjs_source) = match &config.policy {
        ExtensionPolicy::Keep => (source.clone(), source),
        ExtensionPolicy::Map(map) => {
            let tree = specifier::parse(file, &source)?;
            let sites = specifier::extract_specifiers(&tree, &source);

            patch_source(&source, &sites, map)
        }
    };

    // Module-locked inputs keep their fixed module semantics for both
    // targets; forcing them into the other kind would be wrong.
    let cjs_format = match module_kind(file) {
        ModuleKind::Ambiguous => ModuleFormat::CommonJs,
        ModuleKind::Esm | ModuleKind::Cjs => ModuleFormat::Esm,
    };
    let esm_options = ModuleOptions {
        format: ModuleFormat::Esm,
        minify: config.minified,
        source_maps: config.source_maps,
    };
    let cjs_options = ModuleOptions {
        format: cjs_format,
        ..esm_options.clone()
    };

    let esm_output = transform.transform(file, &esm_source, &esm_options)?;
    let cjs_output = transform.transform(file, &cjs_source, &cjs_options)?;

    let rel = relative_name(file, base);
    let out_esm = with_out_ext(
        &config.out_dir.join(&rel),
        &out_ext(file, Target::Esm, &config.policy),
    );
    let out_cjs = with_out_ext(
        &config.cjs_dir.join(&rel),
        &out_ext(file, Target::Cjs, &config.policy),
    );

    write_artifact(&out_esm, &esm_output.code).await?;
    write_artifact(&out_cjs, &cjs_output.code).await?;

    if config.source_maps {
        if let Some(map) = &esm_output.map {
            write_artifact(&sidecar(&out_esm), &serde_json::to_string_pretty(map)?).await?;
        }
        if let Some(map) = &cjs_output.map {
            write_artifact(&sidecar(&out_cjs), &serde_json::to_string_pretty(map)?).await?;
        }
    }

    debug!(file = %file.display(), esm = %out_esm.display(), cjs = %out_cjs.display(), "compiled");

    Ok(())
}

/// Copy a non-compilable file verbatim into both output trees.
async fn copy_file(config: &BuildConfig, file: &Path, base: Option<&Path>) -> Result<()> {
    let rel = relative_name(file, base);
    let out_esm = config.out_dir.join(&rel);

    ensure_parent(&out_esm).await?;
    fs::copy(file, &out_esm).await?;

    if !config.no_cjs_dir {
        let out_cjs = config.cjs_dir.join(&rel);

        ensure_parent(&out_cjs).await?;
        fs::copy(file, &out_cjs).await?;
    }

    Ok(())
}

/// Path of a file relative to its directory positional; bare file
/// positionals land at the output root under their own name.
fn relative_name(file: &Path, base: Option<&Path>) -> PathBuf {
    base.and_then(|dir| pathdiff::diff_paths(file, dir))
        .or_else(|| file.file_name().map(PathBuf::from))
        .unwrap_or_else(|| file.to_path_buf())
}

/// Recursively list the files under a directory.
fn collect_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Sidecar source-map path for an output artifact.
fn sidecar(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".map");

    PathBuf::from(os)
}

/// Write an artifact, creating parent directories idempotently. Concurrent
/// builds may create the same parent; `create_dir_all` tolerates that.
async fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    ensure_parent(path).await?;
    fs::write(path, contents).await?;

    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    Ok(())
}

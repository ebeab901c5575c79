//! End-to-end build tests.
//!
//! Each test drives a full dual build over a temporary source tree with the
//! passthrough transform and inspects the materialized output trees.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use dualpack::build::run_build;
use dualpack::cli::Cli;
use dualpack::config::BuildConfig;
use dualpack::error::{DualError, Result};
use dualpack::outpath::{ExtensionMap, ExtensionPolicy};
use dualpack::transform::{ModuleFormat, ModuleOptions, PassthroughTransform, Transform, TransformOutput};

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

/// A build configuration over a temp dir, defaulting to the stock policy.
fn config(root: &TempDir, files: Vec<PathBuf>) -> BuildConfig {
    let out_dir = root.path().join("dist");

    BuildConfig {
        cjs_dir: out_dir.join("cjs"),
        out_dir,
        no_cjs_dir: false,
        extensions: vec![".js".into(), ".jsx".into(), ".mjs".into(), ".cjs".into()],
        policy: ExtensionPolicy::Map(ExtensionMap::default()),
        keep_file_extension: false,
        source_maps: false,
        minified: false,
        copy_files: false,
        files,
    }
}

#[tokio::test]
async fn default_policy_diverges_per_target() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.js");
    write(&src, "import x from './b.js'\nexport default x\n");

    let config = config(&root, vec![src]);
    let summary = run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(summary.files_compiled, 1);
    assert!(summary.failures.is_empty());
    assert_eq!(
        read(&config.out_dir.join("a.js")),
        "import x from './b.js'\nexport default x\n"
    );
    assert_eq!(
        read(&config.cjs_dir.join("a.cjs")),
        "import x from './b.cjs'\nexport default x\n"
    );
}

#[tokio::test]
async fn explicit_map_renames_outputs_and_specifiers() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.js");
    write(&src, "import x from './b.js'\n");

    let mut config = config(&root, vec![src]);
    config.policy = ExtensionPolicy::Map(ExtensionMap {
        esm: ".esm.js".into(),
        cjs: ".cjs.js".into(),
    });

    run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(
        read(&config.out_dir.join("a.esm.js")),
        "import x from './b.esm.js'\n"
    );
    assert_eq!(
        read(&config.cjs_dir.join("a.cjs.js")),
        "import x from './b.cjs.js'\n"
    );
}

#[tokio::test]
async fn keep_file_extension_never_touches_specifiers() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.jsx");
    write(&src, "import x from './b.js'\n");

    let mut config = config(&root, vec![src]);
    config.policy = ExtensionPolicy::Keep;
    config.keep_file_extension = true;

    run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(read(&config.out_dir.join("a.jsx")), "import x from './b.js'\n");
    assert_eq!(read(&config.cjs_dir.join("a.jsx")), "import x from './b.js'\n");
}

#[tokio::test]
async fn dynamic_template_rewrites_trailing_extension_only() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.js");
    write(&src, "export const load = (mod) => import(`./${mod}.js`)\n");

    let config = config(&root, vec![src]);
    run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(
        read(&config.out_dir.join("a.js")),
        "export const load = (mod) => import(`./${mod}.js`)\n"
    );
    assert_eq!(
        read(&config.cjs_dir.join("a.cjs")),
        "export const load = (mod) => import(`./${mod}.cjs`)\n"
    );
}

#[tokio::test]
async fn directory_build_preserves_nesting_and_skips_ineligible() {
    let root = TempDir::new().unwrap();
    let src_dir = root.path().join("src");
    write(&src_dir.join("index.js"), "export * from './deep/util.js'\n");
    write(&src_dir.join("deep/util.js"), "export const n = 1\n");
    write(&src_dir.join("styles.css"), "body {}\n");

    let config = config(&root, vec![src_dir]);
    let summary = run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(summary.files_compiled, 2);
    assert_eq!(
        read(&config.cjs_dir.join("index.cjs")),
        "export * from './deep/util.cjs'\n"
    );
    assert!(config.cjs_dir.join("deep/util.cjs").is_file());
    // Copying is off: the stylesheet produces no output.
    assert!(!config.out_dir.join("styles.css").exists());
}

#[tokio::test]
async fn copy_files_copies_ineligible_files_to_both_trees() {
    let root = TempDir::new().unwrap();
    let src_dir = root.path().join("src");
    write(&src_dir.join("a.js"), "export const a = 1\n");
    write(&src_dir.join("styles.css"), "body {}\n");

    let mut config = config(&root, vec![src_dir.clone()]);
    config.copy_files = true;

    run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(read(&config.out_dir.join("styles.css")), "body {}\n");
    assert_eq!(read(&config.cjs_dir.join("styles.css")), "body {}\n");

    // With no CJS subdirectory there is exactly one copy.
    let root2 = TempDir::new().unwrap();
    let src2 = root2.path().join("src");
    write(&src2.join("styles.css"), "body {}\n");

    let mut config2 = config_no_cjs(&root2, vec![src2]);
    config2.copy_files = true;

    run_build(config2.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(read(&config2.out_dir.join("styles.css")), "body {}\n");
    assert!(!config2.out_dir.join("cjs").exists());
}

fn config_no_cjs(root: &TempDir, files: Vec<PathBuf>) -> BuildConfig {
    let mut config = config(root, files);
    config.cjs_dir = config.out_dir.clone();
    config.no_cjs_dir = true;

    config
}

#[tokio::test]
async fn missing_positional_is_skipped_and_zero_files_is_ok() {
    let root = TempDir::new().unwrap();
    let config = config(&root, vec![root.path().join("does-not-exist")]);

    let summary = run_build(config, Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(summary.files_compiled, 0);
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn declaration_files_are_never_compiled_as_sources() {
    let root = TempDir::new().unwrap();
    let src_dir = root.path().join("src");
    write(&src_dir.join("a.js"), "export const a = 1\n");
    write(&src_dir.join("a.d.ts"), "export declare const a: number\n");

    let mut config = config(&root, vec![src_dir]);
    config.extensions.push(".ts".into());

    let summary = run_build(config, Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(summary.files_compiled, 1);
}

#[tokio::test]
async fn declaration_sync_rewrites_and_forces_cts_suffix() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.js");
    write(&src, "export const a = 1\n");

    let config = config(&root, vec![src]);
    // Declarations co-located in the output tree before the build, the way
    // tsc emits them.
    write(
        &config.out_dir.join("a.d.ts"),
        "import type { B } from './b.js'\nexport declare const a: B\n",
    );

    let summary = run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(summary.dts_files_updated, 1);
    assert_eq!(
        read(&config.out_dir.join("a.d.ts")),
        "import type { B } from './b.js'\nexport declare const a: B\n"
    );
    assert_eq!(
        read(&config.cjs_dir.join("a.d.cts")),
        "import type { B } from './b.cjs'\nexport declare const a: B\n"
    );
}

#[tokio::test]
async fn declaration_sync_renames_and_removes_stranded_original() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.js");
    write(&src, "export const a = 1\n");

    let mut config = config(&root, vec![src]);
    config.policy = ExtensionPolicy::Map(ExtensionMap {
        esm: ".esm.js".into(),
        cjs: ".cjs.js".into(),
    });
    write(
        &config.out_dir.join("a.d.ts"),
        "export * from './b.js'\n",
    );

    run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(
        read(&config.out_dir.join("a.esm.d.ts")),
        "export * from './b.esm.js'\n"
    );
    assert_eq!(
        read(&config.cjs_dir.join("a.cjs.d.ts")),
        "export * from './b.cjs.js'\n"
    );
    // The renamed replacement exists; the original must not be stranded.
    assert!(!config.out_dir.join("a.d.ts").exists());
}

#[tokio::test]
async fn declaration_sync_copies_verbatim_in_keep_mode() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.js");
    write(&src, "export const a = 1\n");

    let mut config = config(&root, vec![src]);
    config.policy = ExtensionPolicy::Keep;
    config.keep_file_extension = true;
    write(
        &config.out_dir.join("a.d.ts"),
        "export * from './b.js'\n",
    );

    run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(
        read(&config.cjs_dir.join("a.d.ts")),
        "export * from './b.js'\n"
    );
}

#[tokio::test]
async fn second_run_is_a_fixed_point() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.js");
    write(&src, "import x from './b.js'\n");

    let config = config(&root, vec![src]);
    write(&config.out_dir.join("a.d.ts"), "export * from './b.js'\n");

    run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();
    let esm_first = read(&config.out_dir.join("a.js"));
    let cjs_first = read(&config.cjs_dir.join("a.cjs"));
    let cts_first = read(&config.cjs_dir.join("a.d.cts"));

    run_build(config.clone(), Arc::new(PassthroughTransform))
        .await
        .unwrap();

    assert_eq!(read(&config.out_dir.join("a.js")), esm_first);
    assert_eq!(read(&config.cjs_dir.join("a.cjs")), cjs_first);
    assert_eq!(read(&config.cjs_dir.join("a.d.cts")), cts_first);
}

/// Records the module format of every invocation.
struct RecordingTransform {
    formats: Mutex<Vec<ModuleFormat>>,
}

impl Transform for RecordingTransform {
    fn transform(
        &self,
        _file: &Path,
        source: &str,
        options: &ModuleOptions,
    ) -> Result<TransformOutput> {
        self.formats.lock().unwrap().push(options.format);

        Ok(TransformOutput {
            code: source.to_string(),
            map: None,
        })
    }
}

#[tokio::test]
async fn module_locked_inputs_keep_esm_configuration_and_plain_extension() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.mjs");
    write(&src, "export const a = 1\n");

    let config = config(&root, vec![src]);
    let transform = Arc::new(RecordingTransform {
        formats: Mutex::new(Vec::new()),
    });

    run_build(config.clone(), transform.clone()).await.unwrap();

    // Both invocations used the ESM module configuration.
    let formats = transform.formats.lock().unwrap();
    assert_eq!(formats.as_slice(), [ModuleFormat::Esm, ModuleFormat::Esm]);

    // Module-locked inputs are normalized to the plain extension; the dual
    // layout already encodes the module kind.
    assert!(config.out_dir.join("a.js").is_file());
    assert!(config.cjs_dir.join("a.js").is_file());
}

/// Fails for one specific file name, succeeds for everything else.
struct FailingTransform {
    fail_for: String,
}

impl Transform for FailingTransform {
    fn transform(
        &self,
        file: &Path,
        source: &str,
        _options: &ModuleOptions,
    ) -> Result<TransformOutput> {
        if file.file_name().and_then(|n| n.to_str()) == Some(self.fail_for.as_str()) {
            return Err(DualError::Transform {
                file: file.to_path_buf(),
                message: "boom".into(),
            });
        }

        Ok(TransformOutput {
            code: source.to_string(),
            map: None,
        })
    }
}

#[tokio::test]
async fn transform_failure_aborts_only_that_file() {
    let root = TempDir::new().unwrap();
    let src_dir = root.path().join("src");
    write(&src_dir.join("good.js"), "export const g = 1\n");
    write(&src_dir.join("bad.js"), "export const b = 1\n");

    let config = config(&root, vec![src_dir]);
    let summary = run_build(
        config.clone(),
        Arc::new(FailingTransform {
            fail_for: "bad.js".into(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(summary.files_compiled, 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].file.ends_with("bad.js"));
    assert!(config.out_dir.join("good.js").is_file());
    assert!(!config.out_dir.join("bad.js").exists());
}

/// Produces a trivial source map for every invocation.
struct MappingTransform;

impl Transform for MappingTransform {
    fn transform(
        &self,
        _file: &Path,
        source: &str,
        options: &ModuleOptions,
    ) -> Result<TransformOutput> {
        let map = options
            .source_maps
            .then(|| serde_json::json!({ "version": 3, "mappings": "" }));

        Ok(TransformOutput {
            code: source.to_string(),
            map,
        })
    }
}

#[tokio::test]
async fn source_map_sidecars_are_written_when_enabled() {
    let root = TempDir::new().unwrap();
    let src = root.path().join("src/a.js");
    write(&src, "export const a = 1\n");

    let mut config = config(&root, vec![src]);
    config.source_maps = true;

    run_build(config.clone(), Arc::new(MappingTransform))
        .await
        .unwrap();

    assert!(config.out_dir.join("a.js.map").is_file());
    assert!(config.cjs_dir.join("a.cjs.map").is_file());
}

#[tokio::test]
async fn from_cli_requires_type_module_package() {
    let root = TempDir::new().unwrap();
    write(&root.path().join("package.json"), r#"{ "type": "commonjs" }"#);

    let cli = clap::Parser::try_parse_from(["dualpack", "src"]).unwrap();
    let result = BuildConfig::from_cli_in(&cli, root.path());

    assert!(matches!(result, Err(DualError::NotEsModule)));

    write(&root.path().join("package.json"), r#"{ "type": "module" }"#);
    let cli: Cli = clap::Parser::try_parse_from(["dualpack", "src"]).unwrap();

    assert!(BuildConfig::from_cli_in(&cli, root.path()).is_ok());
}

#[tokio::test]
async fn from_cli_upward_optional_tolerates_missing_package() {
    let root = TempDir::new().unwrap();
    let nested = root.path().join("deep/project");
    std::fs::create_dir_all(&nested).unwrap();

    let cli: Cli = clap::Parser::try_parse_from(["dualpack", "src"]).unwrap();
    assert!(matches!(
        BuildConfig::from_cli_in(&cli, &nested),
        Err(DualError::PackageJsonNotFound(_))
    ));

    let cli: Cli =
        clap::Parser::try_parse_from(["dualpack", "--root-mode", "upward-optional", "src"])
            .unwrap();
    assert!(BuildConfig::from_cli_in(&cli, &nested).is_ok());
}

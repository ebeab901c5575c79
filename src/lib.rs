//! # dualpack
//!
//! Build dual ESM/CJS packages from a single JavaScript or TypeScript
//! source tree.
//!
//! One input tree compiles into two parallel output trees, an ES-module
//! build and a CommonJS build, so a package ships both module formats
//! without maintaining two codebases. For every relative
//! import/export/dynamic-import specifier found in a file, dualpack decides
//! what extension it must carry in each output, derives collision-free
//! output and declaration-file names under a configurable extension policy,
//! and hands the patched text to a pluggable [`Transform`] capability for
//! the actual language-level compilation.
//!
//! ## Library usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dualpack::{run_build, BuildConfig, Cli, PassthroughTransform};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse_from(["dualpack", "--out-dir", "dist", "src"]);
//!     let config = BuildConfig::from_cli(&cli)?;
//!     let summary = run_build(config, Arc::new(PassthroughTransform)).await?;
//!
//!     println!("compiled {} files", summary.files_compiled);
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod declarations;
pub mod error;
pub mod outpath;
pub mod rewrite;
pub mod specifier;
pub mod transform;

pub use build::{run_build, BuildSummary, FileFailure};
pub use cli::{Cli, RootMode};
pub use config::BuildConfig;
pub use error::{DualError, Result};
pub use outpath::{ExtensionMap, ExtensionPolicy, Target};
pub use specifier::{Classification, ModuleKind};
pub use transform::{ModuleFormat, ModuleOptions, PassthroughTransform, Transform, TransformOutput};

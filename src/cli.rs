//! CLI argument parsing for dualpack.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// dualpack - Build dual ESM/CJS packages from a single source tree
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "dualpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Compile the modules in <FILES> into an output directory
    #[arg(long, default_value = "dist", value_name = "DIR")]
    pub out_dir: PathBuf,

    /// The project-root resolution mode
    #[arg(long, value_enum, default_value_t = RootMode::Root)]
    pub root_mode: RootMode,

    /// List of extensions to compile when a directory is part of <FILES>
    #[arg(long, default_value = ".js,.jsx,.mjs,.cjs", value_name = "EXTS")]
    pub extensions: String,

    /// Use a specific extension for esm/cjs files, e.g. `esm:.esm.js,cjs:.cjs.js`
    #[arg(long, value_name = "EXTMAP", conflicts_with = "keep_file_extension")]
    pub out_file_extension: Option<String>,

    /// The name of the --out-dir subdirectory to output the CJS build
    #[arg(long, default_value = "cjs", value_name = "NAME")]
    pub cjs_dir_name: String,

    /// Do not create a subdirectory for the CJS build in --out-dir
    #[arg(long)]
    pub no_cjs_dir: bool,

    /// Preserve the file extensions of the input files
    #[arg(long)]
    pub keep_file_extension: bool,

    /// Generate an external source map
    #[arg(long)]
    pub source_maps: bool,

    /// Save as many bytes as possible when printing
    #[arg(long)]
    pub minified: bool,

    /// Copy files that will not be compiled into the output directories
    #[arg(long)]
    pub copy_files: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (summary lines suppressed)
    #[arg(short, long)]
    pub quiet: bool,

    /// Files and directories to compile
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,
}

/// How the project root (and its package.json) is discovered.
#[derive(ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RootMode {
    /// Use the current working directory
    #[default]
    Root,
    /// Search ancestor directories upward
    Upward,
    /// Search upward, tolerating a missing package.json
    UpwardOptional,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["dualpack", "src"]);

        assert_eq!(cli.out_dir, PathBuf::from("dist"));
        assert_eq!(cli.cjs_dir_name, "cjs");
        assert_eq!(cli.root_mode, RootMode::Root);
        assert!(!cli.keep_file_extension);
        assert!(!cli.verbose);
        assert_eq!(cli.files, vec![PathBuf::from("src")]);
    }

    #[test]
    fn test_verbose_flag() {
        let cli = Cli::parse_from(["dualpack", "--verbose", "src"]);

        assert!(cli.verbose);
    }

    #[test]
    fn test_keep_and_explicit_map_conflict() {
        let result = Cli::try_parse_from([
            "dualpack",
            "--keep-file-extension",
            "--out-file-extension",
            "esm:.js,cjs:.cjs",
            "src",
        ]);

        assert!(result.is_err());
    }
}

use std::path::PathBuf;

use clap::{ColorChoice, Parser};

/// The qwantz transcriber.
#[derive(Debug, Clone, Parser)]
#[clap(name = "qwantz", version, author)]
pub struct CliArguments {
    /// Paths to one or more strip images and/or directories of them.
    #[clap(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Write one transcript file per strip into this directory instead of
    /// printing to stdout.
    #[clap(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// The directory holding font strips, the mask, dictionaries and the
    /// override table.
    #[clap(long, env = "QWANTZ_ASSETS", default_value = "assets", value_name = "DIR")]
    pub assets: PathBuf,

    /// Parse even strips listed in the override table.
    #[clap(long)]
    pub ignore_overrides: bool,

    /// Suppress warnings on stderr.
    #[clap(long, short)]
    pub quiet: bool,

    /// Set when to use color.
    /// auto = use color if a capable terminal is detected
    #[clap(
        long,
        value_name = "WHEN",
        require_equals = true,
        num_args = 0..=1,
        default_value = "auto",
        default_missing_value = "always",
    )]
    pub color: ColorChoice,
}

// src/cli.rs

use crate::config::{Config, TransformerConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect knowledge units in source code", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (defaults to ./ku-detect.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding one sub-directory per concept model
    #[arg(long, global = true)]
    pub models: Option<PathBuf>,

    /// Only load these concepts, e.g. --only K2,K7
    #[arg(long, value_delimiter = ',', global = true)]
    pub only: Vec<String>,

    /// Smallest window, in normalized lines
    #[arg(long, global = true)]
    pub min_window: Option<usize>,

    /// Largest window, in normalized lines
    #[arg(long, global = true)]
    pub max_window: Option<usize>,

    /// Growth between window sizes
    #[arg(long, global = true)]
    pub window_step: Option<usize>,

    /// Offset between consecutive windows of one size
    #[arg(long, global = true)]
    pub stride: Option<usize>,

    /// Scan with the transformer exported in this directory instead of
    /// the per-concept models
    #[arg(long, global = true)]
    pub transformer: Option<PathBuf>,

    /// Number of concepts the transformer reports (K1..Kn)
    #[arg(long, global = true)]
    pub transformer_concepts: Option<usize>,

    /// Scan worker threads (0 = one per core)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    /// Write results here instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json, global = true)]
    pub format: Format,

    /// Show progress bars
    #[arg(long, global = true)]
    pub progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan the source files directly inside a directory
    Scan {
        dir: PathBuf,
    },
    /// Scan every file revision contributed in a local git repository
    History {
        repo: PathBuf,

        /// Look at no more than this many commits
        #[arg(long)]
        limit: Option<usize>,

        /// Skip this many of the newest commits
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Revisions already analyzed, e.g. --exclude 3f2a9c1,77be0d4
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum Format {
    /// One JSON object per file
    Json,
    /// One row per file, one column per concept
    Csv,
}

impl Args {
    /// Flags win over the config file.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(models) = &self.models {
            config.models_dir = models.clone();
        }
        if !self.only.is_empty() {
            config.models_to_load = self.only.clone();
        }
        if let Some(min) = self.min_window {
            config.window.min_size = min;
        }
        if let Some(max) = self.max_window {
            config.window.max_size = max;
        }
        if let Some(step) = self.window_step {
            config.window.size_step = step;
        }
        if let Some(stride) = self.stride {
            config.window.stride = stride;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(dir) = &self.transformer {
            config
                .transformer
                .get_or_insert_with(TransformerConfig::default)
                .dir = dir.clone();
        }
        if let (Some(concepts), Some(transformer)) =
            (self.transformer_concepts, config.transformer.as_mut())
        {
            transformer.concepts = concepts;
        }
    }
}

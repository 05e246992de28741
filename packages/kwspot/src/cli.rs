//! Command Line Interface for the kwspot keyword spotter
//!
//! This module provides a CLI for preparing resources and running detection
//! over recorded audio.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// kwspot keyword spotter CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the kwspot CLI
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write default model parameters
    InitModel(InitModelCommand),

    /// Build a keyword file from WAV recordings
    BuildKeyword(BuildKeywordCommand),

    /// Summarise a model or keyword file
    Inspect(InspectCommand),

    /// Run a WAV file through the spotter
    Detect(DetectCommand),
}

/// Write default model parameters
#[derive(Parser, Debug)]
pub struct InitModelCommand {
    /// Output path for the model file
    #[arg(short, long, default_value = "model.kwm")]
    pub output: PathBuf,

    /// Samples per frame
    #[arg(long)]
    pub frame_length: Option<usize>,

    /// Samples per analysis window (defaults to the frame length)
    #[arg(long)]
    pub window_length: Option<usize>,

    /// Aggregation across templates (max, average, median, p25 … p95)
    #[arg(long)]
    pub score_mode: Option<kwspot::ScoreMode>,

    /// Enable the band-pass pre-filter with these cut-offs, e.g. `80,4000`
    #[arg(long, value_delimiter = ',', num_args = 2)]
    pub band_pass: Option<Vec<f32>>,
}

/// Build a keyword file from WAV recordings
#[derive(Parser, Debug)]
pub struct BuildKeywordCommand {
    /// Keyword name
    #[arg(short, long)]
    pub name: String,

    /// Model parameters the keyword will be used with
    #[arg(short, long)]
    pub model: PathBuf,

    /// Output path for the keyword file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Recorded samples of the keyword (mono or multi-channel WAV)
    #[arg(required = true)]
    pub samples: Vec<PathBuf>,
}

/// Summarise a model or keyword file
#[derive(Parser, Debug)]
pub struct InspectCommand {
    /// Path to the file to inspect
    pub path: PathBuf,
}

/// Run a WAV file through the spotter
#[derive(Parser, Debug)]
pub struct DetectCommand {
    /// WAV recording to scan
    pub input: PathBuf,

    #[command(flatten)]
    pub source: SpotterSource,

    /// Print the score of every frame
    #[arg(long)]
    pub scores: bool,
}

/// Where the spotter resources come from
#[derive(Args, Debug)]
pub struct SpotterSource {
    /// TOML configuration (model_path, keyword_path, sensitivity)
    #[arg(short, long, conflicts_with_all = ["model", "keyword"])]
    pub config: Option<PathBuf>,

    /// Model parameters file
    #[arg(short, long, requires = "keyword")]
    pub model: Option<PathBuf>,

    /// Keyword file
    #[arg(short, long, requires = "model")]
    pub keyword: Option<PathBuf>,

    /// Detection sensitivity (0.0 to 1.0)
    #[arg(short, long)]
    pub sensitivity: Option<f32>,
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show video metadata and whether it was already fetched
    Info {
        /// Video URL
        #[arg(short, long)]
        url: String,

        /// Directory holding fetched videos
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Download a video with captions, then translate the captions
    Fetch {
        /// Video URL
        #[arg(short, long)]
        url: String,

        /// Directory that receives one folder per video
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Only download; leave captions untranslated
        #[arg(long)]
        no_translate: bool,

        /// Download again even if the video is already present
        #[arg(long)]
        force: bool,

        /// Target language, e.g. "Vietnamese"
        #[arg(short, long)]
        target_language: Option<String>,
    },

    /// Translate the captions of an already fetched video folder
    Translate {
        /// Folder containing caption files
        #[arg(short, long)]
        folder: PathBuf,

        /// Target language, e.g. "Vietnamese"
        #[arg(short, long)]
        target_language: Option<String>,
    },

    /// Translate a single caption file
    TranslateFile {
        /// Input caption file
        #[arg(short, long)]
        input: PathBuf,

        /// Target language, e.g. "Vietnamese"
        #[arg(short, long)]
        target_language: Option<String>,
    },

    /// Clean caption files below a directory in place
    Clean {
        /// Directory to search
        #[arg(short, long, default_value = "download-data")]
        dir: PathBuf,

        /// Strip markup only; keep lines that look like translation boilerplate
        #[arg(long)]
        tags_only: bool,

        /// Language tag of the files to clean
        #[arg(short, long, default_value = "vi")]
        lang_tag: String,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "capfetch.toml")]
        output: PathBuf,
    },
}

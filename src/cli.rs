use clap::Parser;
use std::path::PathBuf;

use ytnote::config::{GeneratorKind, Locale};

#[derive(Parser)]
#[command(
    name = "ytnote",
    about = "Study-note backend for YouTube videos and pasted transcripts",
    version
)]
pub struct Cli {
    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Note generator: gemini (default) or simple (offline)
    #[arg(short, long, value_enum)]
    pub generator: Option<GeneratorKind>,

    /// Model identifier to try, in order (repeat for fallbacks)
    #[arg(short, long = "model")]
    pub models: Vec<String>,

    /// Language of error recovery hints: en (default) or ko
    #[arg(short = 'L', long, value_enum)]
    pub locale: Option<Locale>,

    /// Config file (default: ~/.config/ytnote/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Echo resolved settings to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

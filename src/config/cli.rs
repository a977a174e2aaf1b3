use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "sashido-files")]
#[command(about = "Upload, download, delete and locate files through the storage proxy")]
pub struct CliConfig {
    #[arg(long, short, default_value = "sashido-files.toml")]
    pub config: PathBuf,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Upload a local file
    Upload {
        path: PathBuf,
        #[arg(long, help = "Stored file name, defaults to the local file name")]
        name: Option<String>,
        #[arg(long, help = "Content type, guessed from the extension when omitted")]
        content_type: Option<String>,
    },
    /// Download a stored file
    Download {
        name: String,
        #[arg(long, short, help = "Write to this path instead of stdout")]
        output: Option<PathBuf>,
    },
    /// Delete a stored file
    Delete { name: String },
    /// Print the public URL of a stored file
    Locate {
        name: String,
        #[arg(long)]
        mount: Option<String>,
        #[arg(long)]
        application_id: Option<String>,
    },
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use annotate_video::config::ServeConfig;
use annotate_video::serve;

#[derive(Parser, Debug)]
#[command(author, version, about = "Annotate a shared video timeline with markers and posts")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the annotation HTTP server
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for the database and audio files (overrides config file)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Command::Serve {
            config,
            port,
            data_dir,
        } => {
            let mut serve_config = match config {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path).map_err(|e| {
                        format!("Failed to read config file {}: {}", path.display(), e)
                    })?;
                    toml::from_str::<ServeConfig>(&raw).map_err(|e| {
                        format!("Failed to parse config file {}: {}", path.display(), e)
                    })?
                }
                None => ServeConfig::default(),
            };

            if let Some(port) = port {
                serve_config.port = port;
            }
            if let Some(data_dir) = data_dir {
                serve_config.data_dir = Some(data_dir);
            }

            serve::serve(serve_config)
        }
    }
}

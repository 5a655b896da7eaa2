use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mpnet_embedder::embedder::download::download_model_files;
use mpnet_embedder::{EmbedderConfig, SentenceEmbedder, cosine_similarity};

/// Sentence embeddings with all-mpnet-base-v2.
#[derive(Parser, Debug)]
#[command(name = "mpnet-embed", version, about)]
struct Cli {
    #[command(flatten)]
    opts: EmbedderOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct EmbedderOpts {
    /// JSON config file
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    /// ONNX model file (overrides config)
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// tokenizer.json file (overrides config)
    #[arg(long, global = true)]
    tokenizer: Option<PathBuf>,

    /// Maximum tokens per sentence (overrides config)
    #[arg(long, global = true)]
    max_tokens: Option<usize>,

    /// Skip L2 normalization
    #[arg(long, global = true)]
    no_normalize: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print embeddings as a JSON array, one per text
    Encode {
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Print the cosine similarity of two texts
    Similarity { a: String, b: String },
    /// Download model.onnx and tokenizer.json
    Download {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl EmbedderOpts {
    fn load_config(&self) -> Result<EmbedderConfig> {
        let mut config = EmbedderConfig::load(&self.config)?;
        if let Some(model) = &self.model {
            config.model_path = Some(model.clone());
        }
        if let Some(tokenizer) = &self.tokenizer {
            config.tokenizer_path = Some(tokenizer.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if self.no_normalize {
            config.normalize = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Encode { texts } => {
            let embedder = SentenceEmbedder::new(cli.opts.load_config()?)?;
            let vectors = embedder.encode_batch(texts.as_slice())?;
            let json = serde_json::to_string(&vectors).context("failed to serialize embeddings")?;
            println!("{json}");
        }
        Command::Similarity { a, b } => {
            let embedder = SentenceEmbedder::new(cli.opts.load_config()?)?;
            let vectors = embedder.encode_batch(&[a, b])?;
            println!("{:.6}", cosine_similarity(&vectors[0], &vectors[1]));
        }
        Command::Download { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => EmbedderConfig::load(&cli.opts.config)?.model_dir,
            };
            download_model_files(&dir)?;
        }
    }

    Ok(())
}

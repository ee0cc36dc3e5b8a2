use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use prooftree::backend::{Backend, HttpBackend, LocalBackend};
use prooftree::cli::{Cli, Command};
use prooftree::core::{AsciiView, RenderOptions};
use prooftree::{EntryKind, Explorer, ExplorerOptions, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level);
    debug!("Parsed CLI arguments: {cli:?}");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("prooftree: {err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let view = AsciiView::new(RenderOptions {
        expand_all: cli.expand_all,
    });
    let options = ExplorerOptions {
        harness: cli.harness.clone(),
    };

    match &cli.url {
        Some(url) => {
            let backend = HttpBackend::new(url)?.include_hidden(cli.include_hidden);
            let explorer = Explorer::load(backend, view, &options).await?;
            execute(explorer, cli.command).await
        }
        None => {
            let metadata = tokio::fs::metadata(&cli.root)
                .await
                .with_context(|| cli.root.display().to_string())?;
            if !metadata.is_dir() {
                bail!("{}: not a directory", cli.root.display());
            }
            let backend = LocalBackend::new(&cli.root)?.include_hidden(cli.include_hidden);
            let explorer = Explorer::load(backend, view, &options).await?;
            execute(explorer, cli.command).await
        }
    }
}

async fn execute<B: Backend>(
    mut explorer: Explorer<B, AsciiView>,
    command: Option<Command>,
) -> Result<()> {
    match command.unwrap_or(Command::Show) {
        Command::Show => {}
        Command::Create { path, dir } => {
            let kind = if dir { EntryKind::Dir } else { EntryKind::File };
            let (parent, name) = match path.rsplit_once('/') {
                Some((parent, name)) => (Some(parent), name),
                None => (None, path.as_str()),
            };
            explorer.create_entry(parent, name, kind).await?;
        }
        Command::Delete { path } => {
            if !explorer.tree().contains(&path) {
                warn!(path = %path, "deleting a path the tree does not know");
            }
            explorer.delete_entry(&path).await?;
        }
        Command::Select { path } => {
            if !explorer.select(&path) {
                bail!("{path}: not found");
            }
        }
        Command::Open { path } => match explorer.open(&path).await? {
            Some(content) => {
                print!("{content}");
                return Ok(());
            }
            None => bail!("{path}: not a file"),
        },
        Command::Save { path } => {
            let mut content = String::new();
            tokio::io::stdin()
                .read_to_string(&mut content)
                .await
                .context("failed to read standard input")?;
            explorer.save_file(&path, &content).await?;
            return Ok(());
        }
    }

    print!("{}", explorer.tree().view().frame());
    Ok(())
}

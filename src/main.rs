use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{debug, info};

mod engine;
mod env;
mod error;
mod mods;
mod networking;
mod storage;
mod ui;
mod util;

use engine::Engine;
use engine::state::Outcome;
use error::{Error, Result};
use mods::select::FileFilter;
use mods::{DEFAULT_API_URL, ServerModsClient};
use storage::Manifest;
use ui::progress::{ConsoleProgress, LogProgress, ProgressSink};
use ui::{AssumeYes, Confirm, LinePrompt};

#[derive(Parser, Debug)]
#[command(
    name = "servermods",
    author,
    version,
    about = "Search, install and update Bukkit server mods in a plugins folder"
)]
struct Cli {
    /// Log what is happening under the hood.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Plugins folder to manage (defaults to ./plugins).
    #[arg(long, global = true, env = "SERVERMODS_PLUGINS_DIR")]
    plugins_dir: Option<PathBuf>,

    /// ServerMods API key; falls back to the one saved in the manifest.
    #[arg(long, global = true, env = "SERVERMODS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Remember the given API key in the plugins folder's manifest.
    #[arg(long, global = true, requires = "api_key")]
    save_api_key: bool,

    #[arg(long, global = true, env = "SERVERMODS_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Answer yes to the confirmation prompt.
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find server mods and their slugs.
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Install server mods by slug.
    Install {
        #[arg(required = true)]
        slugs: Vec<String>,
        /// Only consider files from this release channel (release, beta, alpha).
        #[arg(long)]
        channel: Option<String>,
    },
    /// Update everything installed in the plugins folder.
    Update {
        #[arg(long)]
        channel: Option<String>,
    },
    /// Remove installed server mods by slug.
    Uninstall {
        #[arg(required = true)]
        slugs: Vec<String>,
    },
    /// Show what is installed, without going online.
    List,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // A key on the command line is all search needs; the plugins folder is
    // only consulted for a saved one.
    if let Command::Search { query } = &cli.command
        && let Some(key) = &cli.api_key
        && !cli.save_api_key
    {
        return search(ServerModsClient::new(&cli.api_url, key), query).await;
    }

    debug!("Loading persistent storage...");
    let dir = env::resolve_plugins_dir(cli.plugins_dir.as_deref())?;
    let mut manifest = Manifest::load(&dir)?;

    if cli.save_api_key
        && let Some(key) = &cli.api_key
    {
        save_api_key(&mut manifest, key)?;
    }

    if let Command::List = cli.command {
        print!("{}", engine::list_installed(&mut manifest)?);
        return Ok(());
    }

    let api_key = match cli.api_key {
        Some(key) => key,
        None => manifest
            .api_key()
            .map(str::to_owned)
            .ok_or(Error::MissingApiKey)?,
    };

    let client = ServerModsClient::new(cli.api_url, api_key);
    let mut confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(LinePrompt::stdio())
    };
    let mut progress: Box<dyn ProgressSink> = if io::stderr().is_terminal() {
        Box::new(ConsoleProgress::new())
    } else {
        Box::new(LogProgress)
    };

    let outcome: Outcome = match cli.command {
        Command::Search { query } => return search(client, &query).await,
        Command::Install { slugs, channel } => {
            let mut engine = Engine::new(client, FileFilter::jars().with_channel(channel));
            engine
                .install(&mut manifest, &slugs, confirm.as_mut(), progress.as_mut())
                .await?
        }
        Command::Update { channel } => {
            let mut engine = Engine::new(client, FileFilter::jars().with_channel(channel));
            engine
                .update(&mut manifest, confirm.as_mut(), progress.as_mut())
                .await?
        }
        Command::Uninstall { slugs } => {
            let mut engine = Engine::new(client, FileFilter::jars());
            engine
                .uninstall(&mut manifest, &slugs, confirm.as_mut())
                .await?
        }
        Command::List => return Ok(()),
    };
    println!("{}", outcome.message());
    Ok(())
}

async fn search(client: ServerModsClient, queries: &[String]) -> Result<()> {
    let engine = Engine::new(client, FileFilter::jars());
    for (query, projects) in engine.search(queries).await? {
        print!("{}", ui::render_search(&query, &projects));
    }
    Ok(())
}

fn save_api_key(manifest: &mut Manifest, key: &str) -> Result<()> {
    if manifest.api_key() == Some(key) {
        return Ok(());
    }
    manifest.set_api_key(Some(key.to_owned()));
    manifest.save()?;
    info!("storage: saved API key to {}", manifest.path().display());
    Ok(())
}

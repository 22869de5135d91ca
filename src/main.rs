use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use go_ecosystem::cancel::CancelToken;
use go_ecosystem::config::{self, EcoConfig};
use go_ecosystem::logging::init_logging;
use go_ecosystem::parser::GoModParser;
use go_ecosystem::proxy::{FetchClient, ProxyClient};
use go_ecosystem::registry::Registry;
use go_ecosystem::update::resolve::latest_module_version;
use go_ecosystem::update::{UpdateOptions, Updater};

#[derive(Parser)]
#[command(name = "eco")]
#[command(version, about = "Registry of Go modules built from the module index")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level, including every upstream request
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the registry database
    CreateDb,
    /// Read new modules from the index and resolve their latest versions
    Update {
        /// Seconds to spend reading the index
        #[arg(long)]
        duration: Option<u64>,
        /// Only read the index
        #[arg(long)]
        no_resolve: bool,
    },
    /// Print the latest version of one module
    Latest { module_path: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EcoConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let log_file = match cli.command {
        Command::Latest { .. } => None,
        _ => Some(config::log_path()),
    };
    let _guard = init_logging(log_file.as_deref(), cli.debug)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli.command, config))
}

async fn run(command: Command, config: EcoConfig) -> anyhow::Result<()> {
    match command {
        Command::CreateDb => {
            let path = config::db_path();
            let registry = open_registry(&path)?;
            registry.create_schema().context("creating schema")?;
            info!("Created registry at {:?}", path);
            Ok(())
        }
        Command::Update {
            duration,
            no_resolve,
        } => {
            let registry = open_registry(&config::db_path())?;
            registry.create_schema().context("creating schema")?;

            let fetch = Arc::new(FetchClient::from_config(&config.proxy, &config.cache)?);
            let mut options = UpdateOptions::from_config(&config);
            if let Some(secs) = duration {
                options.duration = Duration::from_secs(secs);
            }
            options.skip_resolve = no_resolve;

            let updater = Updater::new(
                registry,
                fetch,
                &config.proxy.proxy_url,
                &config.proxy.index_url,
                options,
            );
            let report = updater.run(&CancelToken::new()).await?;
            println!("{}", report);
            Ok(())
        }
        Command::Latest { module_path } => {
            let fetch = Arc::new(FetchClient::from_config(&config.proxy, &config.cache)?);
            let proxy = ProxyClient::new(fetch, &config.proxy.proxy_url);
            let latest =
                latest_module_version(&proxy, &GoModParser::new(), &module_path, &CancelToken::new())
                    .await
                    .with_context(|| format!("resolving {}", module_path))?;
            match latest {
                Some(version) => println!("{}", version),
                None => println!("{}: every version is retracted", module_path),
            }
            Ok(())
        }
    }
}

fn open_registry(path: &std::path::Path) -> anyhow::Result<Registry> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    }
    Registry::open(path).with_context(|| format!("opening registry {:?}", path))
}

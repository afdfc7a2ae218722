use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use chatdeck::app::{build_http_client, App, AppDeps, AppEvent};
use chatdeck::config::Config;
use chatdeck::console::{self, Channels, ConsoleDialogs};
use chatdeck::instance::{self, Acquired};
use chatdeck::preferences::PreferenceManager;
use chatdeck::protocol::parse_protocol_urls;
use chatdeck::registry::Registry;
use chatdeck::session::HeadlessFactory;
use chatdeck::shell::{LoggingBackend, Platform, Preference, ShellCommand};
use chatdeck::storage::{self, Store};
use chatdeck::trust::{TrustStore, TRUST_FILE};

const STORAGE_FILE: &str = "storage.json";
const SEED_FILE: &str = "servers.json";
const CONFIG_FILE: &str = "config.toml";

/// Get the default data directory path (~/.config/chatdeck/)
fn default_data_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("chatdeck"))
}

#[derive(Parser, Debug)]
#[command(name = "chatdeck", about = "Several chat servers in one window")]
struct Args {
    /// Deep links to add (`rocketchat://host/path`)
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Delete all stored servers, certificates and preferences before starting
    #[arg(long)]
    reset_app_data: bool,

    /// Directory holding storage.json, certificate.json and config.toml
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

fn prepare_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir).context("Failed to create data directory")?;
        tracing::info!(path = %data_dir.display(), "Created data directory");
    }

    // User-only access: the directory holds credentials.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(data_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(data_dir, perms) {
                    tracing::warn!(
                        path = %data_dir.display(),
                        error = %e,
                        "Failed to set data directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %data_dir.display(),
                    error = %e,
                    "Failed to read data directory metadata"
                );
            }
        }
    }
    Ok(())
}

/// Start a fresh process that wipes the data directory.
fn relaunch_with_reset(data_dir: &Path) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate executable")?;
    std::process::Command::new(exe)
        .arg("--reset-app-data")
        .arg("--data-dir")
        .arg(data_dir)
        .spawn()
        .context("Failed to relaunch")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data_dir = match args.data_dir.clone() {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    prepare_data_dir(&data_dir)?;

    let argv: Vec<String> = std::env::args().collect();
    let listener = match instance::acquire(&data_dir, &argv)
        .await
        .context("Failed to check for a running instance")?
    {
        Acquired::Forwarded if args.reset_app_data => {
            eprintln!("Cannot reset app data while another instance is running.");
            return Ok(());
        }
        Acquired::Forwarded => {
            println!("Already running; handed over to the open window.");
            return Ok(());
        }
        Acquired::Primary(listener) => listener,
    };

    // Only the primary may wipe; the live socket stays bound.
    if args.reset_app_data {
        let removed = storage::clear_dir(&data_dir, &[instance::SOCKET_FILE]).with_context(|| {
            format!("Failed to reset app data at '{}'", data_dir.display())
        })?;
        tracing::info!(path = %data_dir.display(), removed, "Reset app data");
        println!("App data reset.");
    }

    let config = Config::load(&data_dir.join(CONFIG_FILE)).context("Failed to load config")?;

    let (instance_tx, instance_rx) = mpsc::unbounded_channel();
    let instance_task = listener.map(|listener| tokio::spawn(listener.serve(instance_tx)));

    // Stores
    let store = Store::open(&data_dir.join(STORAGE_FILE));
    let mut registry = Registry::load(store.clone(), &config);
    if registry.import_seed(&data_dir.join(SEED_FILE)) == 1 {
        let mut prefs = PreferenceManager::new(store.clone(), &config);
        if let Err(e) = prefs.set(Preference::ShowServerList, false) {
            tracing::warn!(error = %e, "Failed to hide server list");
        }
    }
    let trust = TrustStore::load(&data_dir.join(TRUST_FILE));

    let http_client = build_http_client().context("Failed to build HTTP client")?;
    let factory = HeadlessFactory::new(http_client.clone(), config.validation_timeout());
    let (dialogs, questions) = ConsoleDialogs::new();

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);
    let (context_tx, context_rx) = mpsc::unbounded_channel();

    let deps = AppDeps {
        store,
        registry,
        trust,
        http_client,
        factory: Box::new(factory),
        backend: Box::new(LoggingBackend),
        dialogs: Arc::new(dialogs),
        platform: Platform::current(),
    };
    let url_scheme = config.url_scheme.clone();
    let mut app = App::new(config, deps, event_tx, context_tx);
    let notices = app.subscribe_notices();
    app.start();

    for url in parse_protocol_urls(&args.urls, &url_scheme) {
        app.handle_command(ShellCommand::AddHost { url });
    }

    let channels = Channels {
        event_rx,
        context_rx,
        questions,
        notices,
        instance_rx,
    };
    console::run(&mut app, channels).await?;

    // Releases the instance socket before a relaunch binds it.
    if let Some(task) = instance_task {
        task.abort();
        let _ = task.await;
    }

    if app.reset_requested {
        relaunch_with_reset(&data_dir)?;
    }

    println!("Goodbye!");
    Ok(())
}

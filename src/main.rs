use clap::Parser;
use lazysusan::config::{BotConfig, DEFAULT_SECTION};
use lazysusan::plugins::builtin_catalog;
use lazysusan::shared::VERSION;
use lazysusan::transport::{forward_actions, ChannelTransport, LineEventSource, KEEPALIVE_PERIOD};
use lazysusan::Bot;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Events are read as JSON lines on stdin; actions are written as JSON lines on stdout
#[derive(Parser)]
#[command(name = "lazysusan", version, about = "An extensible chat-room bot")]
struct Args {
    /// Select the config section to load the settings from
    #[arg(short, long, value_name = "SECTION", default_value = DEFAULT_SECTION)]
    config: String,

    /// Read settings from this file instead of searching for lazysusan.toml
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Folder containing plugin manifests
    #[arg(short, long, value_name = "DIR")]
    plugin_dir: Option<PathBuf>,

    /// Write logs to this file; `-` keeps stderr
    #[arg(short, long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn init_tracing(log_file: Option<&Path>) -> std::io::Result<()> {
    let writer = match log_file {
        Some(path) if path != Path::new("-") => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        _ => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "lazysusan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_tracing(args.log_file.as_deref()) {
        eprintln!("Cannot open log file: {}", e);
        std::process::exit(1);
    }

    info!(version = VERSION, section = %args.config, "Starting LazySusan");

    let config = match BotConfig::load(&args.config, args.config_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut catalog = builtin_catalog();
    if let Some(dir) = &args.plugin_dir {
        catalog = catalog.with_plugin_dir(dir);
    }

    let (transport, actions) = ChannelTransport::new();
    let writer = tokio::spawn(forward_actions(actions, tokio::io::stdout()));

    let mut bot = Bot::new(config, Arc::new(transport), catalog);
    bot.load_startup_plugins();
    bot.connect();

    let mut events = LineEventSource::new(BufReader::new(tokio::io::stdin()), KEEPALIVE_PERIOD);
    bot.run(&mut events).await;

    // Dropping the bot closes the action channel so the writer can finish
    drop(bot);
    match writer.await {
        Ok(Ok(())) => info!("Shut down cleanly"),
        Ok(Err(e)) => error!(error = %e, "Failed writing actions"),
        Err(e) => error!(error = %e, "Action writer task failed"),
    }
}

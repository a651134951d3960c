//! Shapes Auth - log in to Shapes Inc. and send a message from the terminal.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use shapes_auth::app::App;
use shapes_auth::auth::{AuthFlow, Session, ShapesClient};
use shapes_auth::config::Config;
use shapes_auth::storage::{CookieStore, DurableStore, TokenPersistence};
use shapes_auth::{input, logging};

#[derive(Debug, Parser)]
#[command(name = "shapes-auth", version, about)]
struct Cli {
    /// Path to a config file (defaults to ~/.config/shapes-auth/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address Shapes redirected back to; its `code` parameter is pre-filled
    #[arg(long)]
    callback: Option<String>,

    /// Application id, overriding config and environment
    #[arg(long)]
    app_id: Option<String>,
}

fn build_persistence(config: &Config) -> Result<TokenPersistence> {
    let durable = match config.storage.durable_path {
        Some(ref path) => path.clone(),
        None => DurableStore::default_path()?,
    };
    let cookie = match config.storage.cookie_path {
        Some(ref path) => path.clone(),
        None => CookieStore::default_path()?,
    };
    Ok(TokenPersistence::new(
        Box::new(DurableStore::new(durable)),
        Box::new(CookieStore::new(cookie)),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = logging::default_log_path().and_then(|path| logging::init(&path)) {
        eprintln!("Warning: logging disabled: {:#}", err);
    }

    // Load configuration
    let mut config = match cli.config {
        Some(ref path) => {
            let mut config = Config::load_from_path(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config
        }
        None => Config::load(),
    };
    if let Some(app_id) = cli.app_id {
        config.shapes.app_id = app_id;
    }

    let client = ShapesClient::new(config.shapes.endpoints(), config.shapes.model.clone());
    let flow = AuthFlow::new(
        Session::new(config.shapes.app_id.clone()),
        client,
        build_persistence(&config)?,
        config.shapes.redirect_uri.clone(),
    );
    let mut app = App::new(flow, Duration::from_millis(config.behavior.notice_ms));

    if let Some(ref location) = cli.callback {
        app.handle_callback(location);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let res = input::run_app(&mut terminal, &mut app, &config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

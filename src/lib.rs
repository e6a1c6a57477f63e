//! Bakery storefront backend.
//!
//! Owns the menu, cart, reviews and checkout state for a single-page bakery
//! storefront. The page shell forwards each UI event as a JSON-line
//! invocation on stdin (`{"command": "cart_add", "payload": "croissant"}`)
//! and replaces its regions with the markup returned on stdout.

use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod cart;
pub mod commands;
pub mod config;
mod data_helpers;
pub mod db;
mod diagnostics;
pub mod host;
pub mod menu;
pub mod order;
pub mod render;
pub mod reviews;
pub mod storefront;

pub(crate) use data_helpers::{
    delete_local_json, read_local_json, read_local_json_array, read_local_json_object,
    write_local_json,
};

/// First non-empty trimmed string among `keys`.
pub(crate) fn value_str(v: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Initialise console + rolling file logging. The returned guard must be held
/// for the life of the process; dropping it flushes the file writer.
fn init_logging(data_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bakery_storefront_lib=debug"));

    let log_dir = diagnostics::get_log_dir(data_dir);
    diagnostics::prune_old_logs(&log_dir);
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, diagnostics::LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    // stdout carries the invocation protocol, so the console layer goes to stderr
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

// ============================================================================
// App entry point
// ============================================================================

pub fn run() -> anyhow::Result<()> {
    let data_dir = config::default_data_dir();
    let _guard = init_logging(&data_dir);

    info!(
        "Starting bakery storefront v{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_SHA")
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(start(data_dir))
}

async fn start(data_dir: std::path::PathBuf) -> anyhow::Result<()> {
    let db = Arc::new(db::init(&data_dir).map_err(anyhow::Error::msg)?);
    let config = config::StorefrontConfig::load(data_dir, &db);
    let transport = order::ReqwestTransport::new().map_err(anyhow::Error::msg)?;

    let menu = match menu::load_menu(&config.menu_source).await {
        Ok(menu) => menu,
        Err(error) => {
            warn!(error = %error, "menu load failed, falling back to inline menu");
            menu::inline_menu()
        }
    };

    let sf = storefront::Storefront::init(db, menu, &config.currency);
    let reader = BufReader::new(tokio::io::stdin());
    host::serve(reader, tokio::io::stdout(), sf, config, transport).await?;

    info!("storefront shut down");
    Ok(())
}

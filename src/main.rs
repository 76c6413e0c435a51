use anyhow::Result;

use retroterm::app::App;
use retroterm::{config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure config directory exists
    config::ensure_directories()?;

    // The TUI owns stdout, so logs go to a timestamped file
    let logs_dir = config::logs_dir();
    let log_path = logging::init_file_logging(&logs_dir)?;
    if let Err(e) = logging::cleanup_old_logs(&logs_dir) {
        tracing::warn!("Log cleanup failed: {:#}", e);
    }
    tracing::info!("Logging to {}", log_path.display());

    // Run the application
    let mut app = App::new()?;
    app.run().await
}

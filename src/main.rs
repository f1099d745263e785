#![windows_subsystem = "windows"]

use anyhow::Result;
use interchain_erc20::{config::Config, gui};

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    // GUI overlays persisted user settings on top of this
    let config = Config::default();
    gui::launch(config)?;

    Ok(())
}

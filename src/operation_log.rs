use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::user_settings::APP_DIR_NAME;

/// Log file name
const OPERATION_LOG_FILE: &str = "operation_log.txt";

/// Get the directory where app data is stored (same as settings)
fn app_data_dir() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        let app_dir = config_dir.join(APP_DIR_NAME);
        if !app_dir.exists() {
            let _ = fs::create_dir_all(&app_dir);
        }
        app_dir
    } else {
        PathBuf::from(".")
    }
}

fn log_path() -> PathBuf {
    app_data_dir().join(OPERATION_LOG_FILE)
}

/// Get the full path to the operation log file as a string for display
pub fn log_file_path() -> String {
    log_path().display().to_string()
}

/// Human-readable body for a distribution entry.
pub fn transfer_details(
    symbol: &str,
    amount: &str,
    destination_chain: &str,
    receivers: &[String],
    tx_hash: Option<&str>,
) -> String {
    let mut details = format!(
        "{} {} to {} receiver(s) on {}\n",
        amount,
        symbol,
        receivers.len(),
        destination_chain
    );
    for receiver in receivers {
        details.push_str(&format!("receiver: {}\n", receiver));
    }
    if let Some(hash) = tx_hash {
        details.push_str(&format!("tx: {}\n", hash));
    }
    details
}

fn write_entry(
    out: &mut impl Write,
    timestamp: DateTime<Utc>,
    operation: &str,
    chain_id: u64,
    details: &str,
) -> Result<()> {
    writeln!(
        out,
        "[{}] chain_id={} operation={}",
        timestamp.to_rfc3339(),
        chain_id,
        operation
    )?;

    if details.trim().is_empty() {
        writeln!(out, "  (no additional details)")?;
    } else {
        for line in details.lines() {
            if line.trim().is_empty() {
                writeln!(out)?;
            } else {
                writeln!(out, "  {}", line)?;
            }
        }
    }

    writeln!(out)?;
    Ok(())
}

/// Append a structured log entry describing a user-requested operation.
pub fn append_log(operation: &str, chain_id: u64, details: impl AsRef<str>) -> Result<()> {
    let path = log_path();
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    write_entry(&mut file, Utc::now(), operation, chain_id, details.as_ref())
}

/// Read the entire log file content
pub fn read_log() -> Result<String> {
    let path = log_path();
    if path.exists() {
        Ok(fs::read_to_string(&path)?)
    } else {
        Ok(String::new())
    }
}

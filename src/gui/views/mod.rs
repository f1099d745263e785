//! View modules for the GUI
//!
//! Each submodule adds a `view_*` method on `GuiApp`, called from
//! `App::update` in `app.rs`.
//!
//! - `balances` - ERC20 table with the per-row transfer controls
//! - `activity` - operation log and about panel
//! - `settings` - RPC, distributor and gas payment settings

pub mod activity;
pub mod balances;
pub mod settings;

//! GUI module for the Interchain ERC20 application
//!
//! Built with egui/eframe.
//!
//! - `app` - GuiApp state, job polling and frame layout
//! - `theme` - colors, spacing and styled widget factories (AppTheme)
//! - `notifications` - notification history and toast overlay
//! - `views` - balances, activity log and settings views
//!
//! ```no_run
//! use interchain_erc20::config::Config;
//! use interchain_erc20::gui;
//!
//! let config = Config::default();
//! gui::launch(config).expect("Failed to launch GUI");
//! ```

mod app;
pub mod notifications;
pub mod theme;
pub mod views;

pub use app::{launch, GuiApp, GuiSection};
pub use notifications::{NotificationEntry, Notifications};
pub use theme::{configure_style, AppTheme};

pub mod async_job;
pub mod balance;
pub mod config;
pub mod distribution;
pub mod gui;
pub mod operation_log;
pub mod submitter;
pub mod transfer_form;
pub mod types;
pub mod user_settings;
pub mod utils;

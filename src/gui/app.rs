//! Main GUI application module
//!
//! Owns the GuiApp state, background job polling and the frame layout.

use crate::{
    async_job::{spawn_job, AsyncJob},
    balance::{BalanceSource, MoralisBalanceSource},
    config::{find_network_by_chain_id, Config, EvmNetwork, NETWORKS},
    distribution::DistributorStatus,
    operation_log,
    submitter::WalletSubmitter,
    transfer_form::{SubmissionOutcome, TransferForm},
    types::BalanceRow,
    user_settings::UserSettings,
    utils,
};
use anyhow::{anyhow, Result};
use eframe::{egui, egui::RichText, App, Frame, NativeOptions};
use ethers::types::Address;
use std::collections::HashMap;

use super::notifications::Notifications;
use super::theme::{configure_style, AppTheme};

const NO_LOGS_YET: &str = "No activity yet. Submitted transfers are logged here.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuiSection {
    Balances,
    ActivityLog,
    Settings,
}

/// What a transfer looked like when it was handed to the wallet, for the log.
#[derive(Clone, Debug)]
pub(crate) struct SubmittedSummary {
    pub(crate) symbol: String,
    pub(crate) amount: String,
    pub(crate) destination_chain: String,
    pub(crate) receivers: Vec<String>,
}

#[derive(Default)]
pub(crate) struct BalancesViewState {
    pub(crate) job: Option<AsyncJob<Vec<BalanceRow>>>,
    pub(crate) error: Option<String>,
    /// Wallet and chain of the snapshot currently in the form
    pub(crate) loaded_for: Option<(Address, u64)>,
    pub(crate) submitted: Option<SubmittedSummary>,
}

impl BalancesViewState {
    /// Forget the current snapshot so the next frame fetches a new one.
    pub(crate) fn invalidate(&mut self) {
        self.job = None;
        self.error = None;
        self.loaded_for = None;
    }
}

pub(crate) struct LogViewState {
    pub(crate) content: String,
    pub(crate) job: Option<AsyncJob<String>>,
    pub(crate) error: Option<String>,
    pub(crate) scroll_to_bottom: bool,
}

impl Default for LogViewState {
    fn default() -> Self {
        Self {
            content: NO_LOGS_YET.to_string(),
            job: None,
            error: None,
            scroll_to_bottom: true,
        }
    }
}

impl LogViewState {
    pub(crate) fn is_placeholder(&self) -> bool {
        self.content == NO_LOGS_YET
    }
}

/// Editable copy of the settings; only written back on save.
#[derive(Default)]
pub(crate) struct SettingsFormState {
    pub(crate) rpc_inputs: HashMap<u64, String>,
    pub(crate) distributor_inputs: HashMap<u64, String>,
    pub(crate) gas_payment: String,
    pub(crate) hide_spam: bool,
    pub(crate) validation: HashMap<u64, DistributorStatus>,
    pub(crate) validation_jobs: HashMap<u64, AsyncJob<DistributorStatus>>,
    pub(crate) error: Option<String>,
}

impl SettingsFormState {
    pub(crate) fn from_settings(settings: &UserSettings, config: &Config) -> Self {
        let mut distributor_inputs = HashMap::new();
        for network in NETWORKS {
            let value = settings
                .distributors
                .get(&network.chain_id)
                .cloned()
                .or_else(|| {
                    config
                        .distributors
                        .get(&network.chain_id)
                        .map(|a| format!("{:?}", a))
                })
                .unwrap_or_default();
            distributor_inputs.insert(network.chain_id, value);
        }
        Self {
            rpc_inputs: settings.custom_rpcs.clone(),
            distributor_inputs,
            gas_payment: settings
                .gas_payment
                .clone()
                .unwrap_or_else(|| utils::format_ether(config.gas_payment)),
            hide_spam: settings.hide_spam,
            ..Default::default()
        }
    }
}

pub struct GuiApp {
    pub(crate) config: Config,
    pub(crate) user_settings: UserSettings,
    pub(crate) theme: AppTheme,
    pub(crate) section: GuiSection,
    pub(crate) notifications: Notifications,
    pub(crate) form: TransferForm,
    pub(crate) submitter: WalletSubmitter,
    pub(crate) balances: BalancesViewState,
    pub(crate) log_view: LogViewState,
    pub(crate) settings_form: SettingsFormState,
}

impl GuiApp {
    fn new(config: Config, user_settings: UserSettings, ctx: &egui::Context) -> Self {
        let theme = AppTheme::default();
        configure_style(ctx, &theme);

        let form = TransferForm::new(
            config.registry().source_chain(config.chain_id),
            config.form_policy(),
        );
        let submitter = WalletSubmitter::from_config(&config);
        let settings_form = SettingsFormState::from_settings(&user_settings, &config);

        Self {
            config,
            user_settings,
            theme,
            section: GuiSection::Balances,
            notifications: Notifications::default(),
            form,
            submitter,
            balances: BalancesViewState::default(),
            log_view: LogViewState::default(),
            settings_form,
        }
    }

    /// Move the whole app to another chain. The form is cleared and balances
    /// are fetched again on the next frame.
    pub(crate) fn switch_chain(&mut self, network: &'static EvmNetwork) {
        if network.chain_id == self.config.chain_id {
            return;
        }
        if self.form.awaiting_acknowledgement() {
            self.notifications
                .push("Finish the current transfer before switching chains.");
            return;
        }
        self.activate_chain(network);
        if let Err(e) = self.user_settings.save() {
            tracing::warn!("Failed to persist selected chain: {}", e);
        }
        self.notifications
            .push(format!("Switched to {} ({})", network.label, network.native_token));
    }

    fn activate_chain(&mut self, network: &'static EvmNetwork) {
        self.config.switch_chain(network, &self.user_settings);
        self.user_settings.selected_chain_id = network.chain_id;
        self.submitter = WalletSubmitter::from_config(&self.config);
        self.form
            .set_source_chain(self.config.registry().source_chain(network.chain_id));
        self.balances.invalidate();
        self.balances.submitted = None;
    }

    /// Re-derive everything that depends on settings after a save.
    pub(crate) fn apply_user_settings(&mut self) {
        self.config.apply_settings(&self.user_settings);
        self.submitter = WalletSubmitter::from_config(&self.config);
        self.form.set_policy(self.config.form_policy());

        if self.form.awaiting_acknowledgement() {
            // The new source and snapshot are picked up after the transfer is acknowledged
            tracing::info!("Settings applied; keeping the current snapshot until the transfer is acknowledged");
            return;
        }
        let source = self.config.registry().source_chain(self.config.chain_id);
        if &source != self.form.source() {
            self.form.set_source_chain(source);
        }
        // Spam filtering changes the snapshot itself
        self.balances.invalidate();
    }

    pub(crate) fn start_balance_fetch(&mut self) {
        let Some(wallet) = self.config.wallet_address() else {
            return;
        };
        if self.balances.job.is_some() {
            return;
        }
        let chain_id = self.config.chain_id;
        let source = MoralisBalanceSource::from_config(&self.config);
        self.balances.error = None;
        self.balances.job = Some(spawn_job(move || async move {
            let rows = source.fetch_balances(wallet, chain_id).await?;
            Ok::<_, anyhow::Error>(rows)
        }));
        self.balances.loaded_for = Some((wallet, chain_id));
    }

    pub(crate) fn refresh_logs(&mut self) {
        if self.log_view.job.is_none() {
            self.log_view.scroll_to_bottom = true;
            self.log_view.job = Some(spawn_job(|| async move {
                match operation_log::read_log() {
                    Ok(content) if content.is_empty() => Ok(NO_LOGS_YET.to_string()),
                    Ok(content) => Ok(content),
                    Err(e) => Err(anyhow!("Failed to read log file: {}", e)),
                }
            }));
        }
    }

    /// Open the last transaction in the explorer and start over with a fresh snapshot.
    pub(crate) fn acknowledge_transaction(&mut self) {
        let source = self.config.registry().source_chain(self.config.chain_id);
        if let Some(url) = self.form.acknowledge_and_reset() {
            if let Err(e) = open::that(&url) {
                self.notifications
                    .push(format!("Failed to open {}: {}", url, e));
            }
        }
        if &source != self.form.source() {
            self.form.set_source_chain(source);
        }
        self.balances.submitted = None;
        self.balances.invalidate();
    }

    fn poll_jobs(&mut self) {
        if let Some(job) = &mut self.balances.job {
            if let Some(res) = job.poll() {
                match res {
                    Ok(rows) if self.form.awaiting_acknowledgement() => {
                        tracing::warn!(
                            "Ignoring {} balance rows until the current transfer is acknowledged",
                            rows.len()
                        );
                    }
                    Ok(rows) => {
                        self.form.initialize_from_snapshot(rows);
                        self.balances.error = None;
                    }
                    Err(e) => {
                        self.notifications
                            .push(format!("Balance lookup failed: {}", e));
                        self.balances.error = Some(e.to_string());
                    }
                }
                self.balances.job = None;
            }
        }

        if let Some((row, outcome)) = self.form.poll_submission() {
            self.record_submission(row, &outcome);
        }

        if let Some(job) = &mut self.log_view.job {
            if let Some(res) = job.poll() {
                match res {
                    Ok(content) => {
                        self.log_view.content = content;
                        self.log_view.error = None;
                        self.log_view.scroll_to_bottom = true;
                    }
                    Err(e) => self.log_view.error = Some(e.to_string()),
                }
                self.log_view.job = None;
            }
        }

        let mut finished = Vec::new();
        for (chain_id, job) in self.settings_form.validation_jobs.iter_mut() {
            if let Some(res) = job.poll() {
                let status = res.unwrap_or_else(|e| DistributorStatus::Error(e.to_string()));
                finished.push((*chain_id, status));
            }
        }
        for (chain_id, status) in finished {
            self.settings_form.validation_jobs.remove(&chain_id);
            self.settings_form.validation.insert(chain_id, status);
        }
    }

    fn record_submission(&mut self, row: usize, outcome: &SubmissionOutcome) {
        let chain_id = self.config.chain_id;
        let summary = self.balances.submitted.clone();
        let (operation, tx_hash, message) = match outcome {
            SubmissionOutcome::Confirmed(receipt) => {
                let hash = format!("{:?}", receipt.tx_hash);
                let message = format!(
                    "Transfer sent: {}",
                    utils::ellipsis_text(&hash, 8)
                );
                ("Distribute", Some(hash), message)
            }
            SubmissionOutcome::Failed(reason) => {
                self.balances.submitted = None;
                ("Distribute FAILED", None, format!("Transfer failed: {}", reason))
            }
        };
        self.notifications.push(message);

        let mut details = match &summary {
            Some(s) => operation_log::transfer_details(
                &s.symbol,
                &s.amount,
                &s.destination_chain,
                &s.receivers,
                tx_hash.as_deref(),
            ),
            None => format!("row {}\n", row),
        };
        if let SubmissionOutcome::Failed(reason) = outcome {
            details.push_str(&format!("error: {}\n", reason));
        }
        if let Err(e) = operation_log::append_log(operation, chain_id, details) {
            tracing::warn!("Failed to write operation log: {}", e);
        }
    }

    /// Render a consistent section header
    pub(crate) fn render_section_header(&self, ui: &mut egui::Ui, icon: &str, title: &str) {
        ui.label(
            RichText::new(self.theme.section_header_text(icon, title))
                .size(22.0)
                .strong(),
        );
        ui.separator();
    }

    fn render_top_bar(&mut self, ui: &mut egui::Ui) {
        ui.add_space(self.theme.spacing_sm);
        ui.horizontal_wrapped(|ui| {
            ui.heading(RichText::new("Interchain ERC20").color(self.theme.primary).strong());
            ui.label(
                RichText::new(format!("v{}", env!("CARGO_PKG_VERSION")))
                    .size(12.0)
                    .color(self.theme.text_secondary),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let current = find_network_by_chain_id(self.config.chain_id);
                let display_text = current
                    .map(|n| format!("{} ({})", n.label, n.native_token))
                    .unwrap_or_else(|| format!("Chain {}", self.config.chain_id));
                let mut selected: Option<&'static EvmNetwork> = None;
                let locked = self.form.awaiting_acknowledgement();
                ui.add_enabled_ui(!locked, |ui| {
                    egui::ComboBox::from_id_source("network_selector")
                        .selected_text(display_text)
                        .width(200.0)
                        .show_ui(ui, |ui| {
                            for network in NETWORKS {
                                let label = format!(
                                    "{} · {} · #{}",
                                    network.label, network.native_token, network.chain_id
                                );
                                let is_selected = network.chain_id == self.config.chain_id;
                                if ui.selectable_label(is_selected, label).clicked() {
                                    selected = Some(network);
                                }
                            }
                        });
                })
                .response
                .on_disabled_hover_text("Finish the current transfer before switching chains");
                if let Some(network) = selected {
                    self.switch_chain(network);
                }

                ui.add_space(self.theme.spacing_md);
                let (wallet_text, hover) = match self.config.wallet_address() {
                    Some(address) => {
                        let full = format!("{:?}", address);
                        let mode = if self.config.signer.is_some() {
                            "signing wallet"
                        } else {
                            "watch only"
                        };
                        (utils::ellipsis_text(&full, 6), format!("{} ({})", full, mode))
                    }
                    None => ("No wallet".to_string(), "Set WALLET_PRIVATE_KEY or WALLET_ADDRESS".to_string()),
                };
                ui.label(RichText::new(wallet_text).monospace().color(self.theme.accent_blue))
                    .on_hover_text(hover);
            });
        });
        ui.add_space(self.theme.spacing_xs);
    }

    fn render_nav(&mut self, ui: &mut egui::Ui) {
        ui.add_space(self.theme.spacing_md);
        let nav_items = [
            (GuiSection::Balances, "💰 ERC20 Balances"),
            (GuiSection::ActivityLog, "📜 Activity Log"),
            (GuiSection::Settings, "⚙ Settings"),
        ];

        for (section, label) in nav_items {
            let selected = self.section == section;
            let text_color = if selected {
                self.theme.primary
            } else {
                self.theme.text_secondary
            };
            let response = ui.add(
                egui::Button::new(RichText::new(label).size(14.0).color(text_color))
                    .fill(if selected {
                        self.theme.surface_active
                    } else {
                        egui::Color32::TRANSPARENT
                    })
                    .stroke(egui::Stroke::NONE)
                    .min_size(egui::vec2(ui.available_width(), 28.0)),
            );
            if response.clicked() && !selected {
                self.section = section;
                match section {
                    GuiSection::ActivityLog => self.refresh_logs(),
                    GuiSection::Settings => {
                        self.settings_form =
                            SettingsFormState::from_settings(&self.user_settings, &self.config);
                    }
                    GuiSection::Balances => {}
                }
            }
            ui.add_space(self.theme.spacing_xs);
        }
    }
}

impl App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_jobs();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            self.render_top_bar(ui);
        });

        self.notifications.render(ctx, &self.theme);

        egui::SidePanel::left("nav")
            .resizable(false)
            .default_width(180.0)
            .frame(
                egui::Frame::none()
                    .fill(self.theme.surface)
                    .inner_margin(egui::Margin::symmetric(8.0, 0.0)),
            )
            .show(ctx, |ui| {
                self.render_nav(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(self.theme.spacing_md);
            egui::ScrollArea::vertical().show(ui, |ui| match self.section {
                GuiSection::Balances => self.view_balances(ui),
                GuiSection::ActivityLog => self.view_activity_log(ui),
                GuiSection::Settings => self.view_settings(ui),
            });
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

pub fn launch(mut config: Config) -> Result<()> {
    let user_settings = UserSettings::load();
    config.apply_settings(&user_settings);
    tracing::info!(
        "Starting on {} (chain {}), wallet {:?}",
        config.network_label(),
        config.chain_id,
        config.wallet_address()
    );

    let app_creator = move |cc: &eframe::CreationContext<'_>| {
        Box::new(GuiApp::new(config.clone(), user_settings.clone(), &cc.egui_ctx)) as Box<dyn App>
    };

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1200.0, 760.0])
        .with_min_inner_size([900.0, 560.0]);

    let native_options = NativeOptions {
        viewport,
        persist_window: true,
        ..Default::default()
    };

    eframe::run_native("Interchain ERC20", native_options, Box::new(app_creator))
        .map_err(|e| anyhow!("Failed to start GUI: {}", e))
}

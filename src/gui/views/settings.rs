//! Settings view implementation
//!
//! Per-chain RPC overrides and distribution contracts, the native gas
//! payment attached to each transfer, and spam filtering.

use crate::async_job::spawn_job;
use crate::config::{get_provider, parse_rpc_url, NETWORKS};
use crate::distribution::{validate_distributor, DistributorStatus};
use crate::gui::app::{GuiApp, SettingsFormState};
use crate::user_settings::UserSettings;
use anyhow::{anyhow, Result};
use eframe::egui::{self, RichText};
use ethers::types::Address;
use std::sync::Arc;

/// Apply the edited form on top of `base`. Nothing is written when any field is invalid.
fn build_settings(base: &UserSettings, form: &SettingsFormState) -> Result<UserSettings> {
    let mut updated = base.clone();
    for network in NETWORKS {
        let rpc = form
            .rpc_inputs
            .get(&network.chain_id)
            .cloned()
            .unwrap_or_default();
        if !rpc.trim().is_empty() {
            parse_rpc_url(&rpc).map_err(|e| anyhow!("{}: {}", network.label, e))?;
        }
        updated.set_custom_rpc(network.chain_id, rpc);

        let distributor = form
            .distributor_inputs
            .get(&network.chain_id)
            .map(String::as_str)
            .unwrap_or_default();
        updated
            .set_distributor(network.chain_id, distributor)
            .map_err(|e| anyhow!("{}: {}", network.label, e))?;
    }

    let gas = form.gas_payment.trim();
    if gas.is_empty() {
        updated.gas_payment = None;
    } else {
        ethers::utils::parse_ether(gas)
            .map_err(|_| anyhow!("Gas payment '{}' is not a valid amount", gas))?;
        updated.gas_payment = Some(gas.to_string());
    }
    updated.hide_spam = form.hide_spam;
    Ok(updated)
}

impl GuiApp {
    pub(crate) fn view_settings(&mut self, ui: &mut egui::Ui) {
        self.render_section_header(ui, "⚙", "SETTINGS");
        ui.add_space(self.theme.spacing_md);

        self.theme.frame_panel().show(ui, |ui| {
            ui.label(RichText::new("Chains").size(16.0).strong());
            ui.label(
                RichText::new("Leave RPC empty to use the default endpoint. A chain without a distribution contract can neither send nor receive.")
                    .small()
                    .color(self.theme.text_secondary),
            );
            ui.add_space(self.theme.spacing_sm);

            let mut validate: Option<u64> = None;
            egui::Grid::new("chain_settings_grid")
                .num_columns(5)
                .spacing([self.theme.spacing_md, self.theme.spacing_sm])
                .show(ui, |ui| {
                    for title in ["Chain", "RPC override", "Distribution contract", "", ""] {
                        ui.label(RichText::new(title).strong().color(self.theme.text_secondary));
                    }
                    ui.end_row();

                    for network in NETWORKS {
                        let chain_id = network.chain_id;
                        ui.label(format!("{} (#{})", network.label, chain_id));

                        let rpc = self.settings_form.rpc_inputs.entry(chain_id).or_default();
                        ui.add(
                            egui::TextEdit::singleline(rpc)
                                .hint_text(network.default_rpc)
                                .desired_width(260.0),
                        );

                        let distributor = self
                            .settings_form
                            .distributor_inputs
                            .entry(chain_id)
                            .or_default();
                        if ui
                            .add(
                                egui::TextEdit::singleline(distributor)
                                    .hint_text("0x...")
                                    .desired_width(340.0)
                                    .font(egui::TextStyle::Monospace),
                            )
                            .changed()
                        {
                            self.settings_form.validation.remove(&chain_id);
                        }

                        let checking = self.settings_form.validation_jobs.contains_key(&chain_id);
                        if ui
                            .add_enabled(!checking, self.theme.button_small("Check"))
                            .on_hover_text("Look for sendToMany in the contract code")
                            .clicked()
                        {
                            validate = Some(chain_id);
                        }

                        match self.settings_form.validation.get(&chain_id) {
                            Some(status) => {
                                let color = match status {
                                    DistributorStatus::Compatible => self.theme.success,
                                    DistributorStatus::Checking => self.theme.text_secondary,
                                    _ => self.theme.error,
                                };
                                let label = ui.label(RichText::new(status.display_text()).color(color));
                                if let DistributorStatus::Error(msg) = status {
                                    label.on_hover_text(msg);
                                }
                            }
                            None => {
                                ui.label("");
                            }
                        }
                        ui.end_row();
                    }
                });

            if let Some(chain_id) = validate {
                self.start_distributor_validation(chain_id);
            }
        });

        ui.add_space(self.theme.spacing_md);

        self.theme.frame_panel().show(ui, |ui| {
            ui.label(RichText::new("Transfers").size(16.0).strong());
            ui.add_space(self.theme.spacing_sm);
            egui::Grid::new("transfer_settings_grid")
                .num_columns(2)
                .spacing([self.theme.spacing_md, self.theme.spacing_sm])
                .show(ui, |ui| {
                    ui.label("Gas payment:");
                    ui.horizontal(|ui| {
                        ui.add(
                            egui::TextEdit::singleline(&mut self.settings_form.gas_payment)
                                .desired_width(120.0),
                        );
                        ui.label(
                            RichText::new("native tokens attached to each transfer")
                                .small()
                                .color(self.theme.text_secondary),
                        );
                    });
                    ui.end_row();

                    ui.label("Spam tokens:");
                    ui.checkbox(&mut self.settings_form.hide_spam, "Hide tokens flagged as possible spam");
                    ui.end_row();

                    ui.label("Supported asset:");
                    ui.label(RichText::new(&self.config.supported_asset).monospace());
                    ui.end_row();
                });
        });

        ui.add_space(self.theme.spacing_md);
        if let Some(err) = &self.settings_form.error {
            ui.colored_label(self.theme.error, err);
        }
        ui.horizontal(|ui| {
            let in_flight = self.form.in_flight_row().is_some();
            if ui
                .add_enabled(!in_flight, self.theme.button_primary("Save Settings"))
                .on_disabled_hover_text("Wait for the transfer in flight to finish")
                .clicked()
            {
                self.save_settings_form();
            }
            if ui.add(self.theme.button_secondary("Discard")).clicked() {
                self.settings_form = SettingsFormState::from_settings(&self.user_settings, &self.config);
            }
        });
        ui.label(
            RichText::new(format!("Saved to {}", UserSettings::settings_path_display()))
                .small()
                .color(self.theme.text_secondary),
        );
    }

    pub(crate) fn save_settings_form(&mut self) {
        if self.form.in_flight_row().is_some() {
            self.settings_form.error =
                Some("Settings cannot be saved while a transfer is in flight".to_string());
            return;
        }
        match build_settings(&self.user_settings, &self.settings_form) {
            Ok(updated) => {
                self.user_settings = updated;
                self.settings_form.error = None;
                if let Err(e) = self.user_settings.save() {
                    self.notifications.push(format!("Failed to save settings: {}", e));
                    return;
                }
                self.apply_user_settings();
                self.notifications.push("Settings saved.");
            }
            Err(e) => self.settings_form.error = Some(e.to_string()),
        }
    }

    fn start_distributor_validation(&mut self, chain_id: u64) {
        let Some(network) = crate::config::find_network_by_chain_id(chain_id) else {
            return;
        };
        let raw = self
            .settings_form
            .distributor_inputs
            .get(&chain_id)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let address = match raw.parse::<Address>() {
            Ok(address) => address,
            Err(_) => {
                self.settings_form
                    .validation
                    .insert(chain_id, DistributorStatus::Error(format!("'{}' is not an address", raw)));
                return;
            }
        };
        let rpc_url = self
            .settings_form
            .rpc_inputs
            .get(&chain_id)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| network.default_rpc.to_string());

        self.settings_form
            .validation
            .insert(chain_id, DistributorStatus::Checking);
        let job = spawn_job(move || async move {
            let provider = get_provider(&rpc_url)?;
            Ok::<_, anyhow::Error>(validate_distributor(Arc::new(provider), address).await)
        });
        self.settings_form.validation_jobs.insert(chain_id, job);
    }
}

//! ERC20 balances view
//!
//! One row per token held on the active chain. Rows of the supported asset
//! carry the transfer controls: destination chain, receivers, amount and a
//! send button whose hover text explains why it is disabled.

use crate::config::get_address_explorer_url;
use crate::gui::app::{GuiApp, SubmittedSummary};
use crate::transfer_form::{Destination, DestinationSelection, SubmitControl};
use crate::utils;
use eframe::egui::{self, RichText};

enum RowAction {
    Destination(usize, DestinationSelection),
    Receivers(usize, String),
    Amount(usize, String),
    Submit(usize),
    ViewTransaction,
    OpenUrl(String),
}

impl GuiApp {
    pub(crate) fn view_balances(&mut self, ui: &mut egui::Ui) {
        self.render_section_header(ui, "💰", "ERC20 BALANCES");
        ui.add_space(self.theme.spacing_sm);

        let Some(wallet) = self.config.wallet_address() else {
            self.theme.frame_panel().show(ui, |ui| {
                ui.label(RichText::new("No wallet configured").strong().color(self.theme.warning));
                ui.label(
                    RichText::new(
                        "Set WALLET_PRIVATE_KEY to sign transfers, or WALLET_ADDRESS to view balances only.",
                    )
                    .color(self.theme.text_secondary),
                );
            });
            return;
        };

        let key = (wallet, self.config.chain_id);
        if self.balances.loaded_for != Some(key) && self.balances.job.is_none() {
            self.start_balance_fetch();
        }
        let loading = self.balances.job.is_some();
        let locked = self.form.awaiting_acknowledgement();

        ui.horizontal(|ui| {
            let source = self.form.source();
            ui.label(
                RichText::new(format!("Source chain: {} (#{})", source.chain_name, source.chain_id))
                    .color(self.theme.text_secondary),
            );
            ui.add_space(self.theme.spacing_md);
            if ui
                .add_enabled(!loading && !locked, self.theme.button_small("Refresh"))
                .on_disabled_hover_text(if locked {
                    "Acknowledge the current transfer first"
                } else {
                    "Wait for the current request to finish"
                })
                .clicked()
            {
                self.balances.invalidate();
                self.start_balance_fetch();
            }
            if loading {
                ui.spinner();
            }
        });

        if self.form.source().distributor.is_none() {
            ui.label(
                RichText::new(format!(
                    "No distribution contract configured for {}. Add one in Settings to send from this chain.",
                    self.form.source().chain_name
                ))
                .color(self.theme.warning),
            );
        }
        if self.config.signer.is_none() {
            ui.label(
                RichText::new("Watch-only mode: transfers need WALLET_PRIVATE_KEY.")
                    .color(self.theme.text_secondary),
            );
        }
        if let Some(err) = &self.balances.error {
            ui.colored_label(self.theme.error, err);
        }
        ui.add_space(self.theme.spacing_sm);

        if self.form.is_empty() {
            if !loading && self.balances.error.is_none() {
                self.theme.frame_surface().show(ui, |ui| {
                    ui.label(
                        RichText::new("Looks like you do not have any ERC20 tokens")
                            .color(self.theme.text_secondary),
                    );
                });
            }
            return;
        }

        let actions = self.render_balance_table(ui);
        self.apply_row_actions(actions);

        ui.add_space(self.theme.spacing_sm);
        ui.label(
            RichText::new(format!(
                "{} row(s) with a destination chosen",
                self.form.payload().len()
            ))
            .small()
            .color(self.theme.text_secondary),
        );
    }

    fn render_balance_table(&self, ui: &mut egui::Ui) -> Vec<RowAction> {
        let mut actions = Vec::new();
        let destinations: Vec<Destination> = self
            .config
            .registry()
            .destinations_from(self.config.chain_id);
        let form = &self.form;
        let theme = &self.theme;

        self.theme.frame_panel().show(ui, |ui| {
            egui::Grid::new("erc20_balances_grid")
                .num_columns(7)
                .striped(true)
                .spacing([theme.spacing_md, theme.spacing_sm])
                .show(ui, |ui| {
                    for title in ["Token", "Value", "Address", "Transfer To", "Receivers", "Amount", ""] {
                        ui.label(RichText::new(title).strong().color(theme.text_secondary));
                    }
                    ui.end_row();

                    for (i, row) in form.rows().iter().enumerate() {
                        let token = ui.label(RichText::new(&row.token_symbol).strong());
                        let mut hover = row.token_name.clone();
                        if row.possible_spam {
                            hover.push_str(" (flagged as possible spam)");
                        }
                        token.on_hover_text(hover);

                        ui.label(RichText::new(&row.human_readable_value).monospace());

                        let address = format!("{:?}", row.token_address);
                        if ui
                            .link(RichText::new(utils::ellipsis_text(&address, 6)).monospace())
                            .on_hover_text(address.as_str())
                            .clicked()
                        {
                            if let Some(url) = get_address_explorer_url(self.config.chain_id, &address) {
                                actions.push(RowAction::OpenUrl(url));
                            }
                        }

                        if form.is_pending(i) {
                            let chain = form.destinations()[i]
                                .chain()
                                .map(|d| d.chain_name.clone())
                                .unwrap_or_default();
                            ui.label(RichText::new(format!("✔ {}", chain)).color(theme.success));
                            ui.label("");
                            ui.label("");
                            if ui.add(theme.button_primary("View Transaction")).clicked() {
                                actions.push(RowAction::ViewTransaction);
                            }
                            ui.end_row();
                            continue;
                        }

                        let current = &form.destinations()[i];
                        let selected_text = current
                            .chain()
                            .map(|d| d.chain_name.clone())
                            .unwrap_or_else(|| "Select chain".to_string());
                        egui::ComboBox::from_id_source(("transfer_to", i))
                            .selected_text(selected_text)
                            .width(130.0)
                            .show_ui(ui, |ui| {
                                for destination in &destinations {
                                    let is_selected = current
                                        .chain()
                                        .is_some_and(|d| d.chain_id == destination.chain_id);
                                    if ui
                                        .selectable_label(is_selected, &destination.chain_name)
                                        .clicked()
                                    {
                                        actions.push(RowAction::Destination(
                                            i,
                                            DestinationSelection::Chain(destination.clone()),
                                        ));
                                    }
                                }
                                if destinations.is_empty() {
                                    ui.label(
                                        RichText::new("No other chain has a distributor")
                                            .small()
                                            .color(theme.text_secondary),
                                    );
                                }
                                ui.separator();
                                if ui.selectable_label(false, "Clear").clicked() {
                                    actions.push(RowAction::Destination(i, DestinationSelection::Unset));
                                }
                            });

                        let mut receivers = form.receivers()[i].raw.clone();
                        if ui
                            .add(
                                egui::TextEdit::singleline(&mut receivers)
                                    .hint_text("0xabc..., 0xdef...")
                                    .desired_width(260.0),
                            )
                            .changed()
                        {
                            actions.push(RowAction::Receivers(i, receivers));
                        }

                        let mut amount = form.intents()[i]
                            .as_ref()
                            .map(|intent| intent.amount_text.clone())
                            .unwrap_or_default();
                        let amount_response = ui.add(
                            egui::TextEdit::singleline(&mut amount)
                                .hint_text("0.0")
                                .desired_width(80.0),
                        );
                        if amount_response.changed() {
                            actions.push(RowAction::Amount(i, amount));
                        }

                        if form.in_flight_row() == Some(i) {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label(RichText::new("Confirm in wallet...").small());
                            });
                        } else {
                            let control = form.submit_control(i, &self.submitter);
                            let response =
                                ui.add_enabled(control.is_enabled(), theme.button_primary("Send"));
                            let response = match &control {
                                SubmitControl::Disabled(blocker) => {
                                    response.on_disabled_hover_text(blocker.to_string())
                                }
                                SubmitControl::Enabled => response.on_hover_text(format!(
                                    "Attaches {} {} for cross-chain gas",
                                    utils::format_ether(form.policy().gas_payment),
                                    self.config.native_token()
                                )),
                            };
                            if response.clicked() {
                                actions.push(RowAction::Submit(i));
                            }
                        }
                        ui.end_row();
                    }
                });
        });

        actions
    }

    fn apply_row_actions(&mut self, actions: Vec<RowAction>) {
        for action in actions {
            let result = match action {
                RowAction::Destination(row, selection) => self.form.set_destination(row, selection),
                RowAction::Receivers(row, raw) => self.form.set_receiver_addresses(row, &raw),
                RowAction::Amount(row, raw) => self.form.set_transfer_amount(row, &raw),
                RowAction::Submit(row) => {
                    let summary = self.summarize_row(row);
                    let result = self.form.submit(row, &self.submitter);
                    if result.is_ok() {
                        self.balances.submitted = summary;
                        self.notifications.push("Transfer submitted, waiting for confirmation");
                    }
                    result
                }
                RowAction::ViewTransaction => {
                    self.acknowledge_transaction();
                    // The form was just reset; remaining actions refer to old rows
                    return;
                }
                RowAction::OpenUrl(url) => {
                    if let Err(e) = open::that(&url) {
                        self.notifications.push(format!("Failed to open {}: {}", url, e));
                    }
                    Ok(())
                }
            };
            if let Err(e) = result {
                self.notifications.push(e.to_string());
            }
        }
    }

    fn summarize_row(&self, row: usize) -> Option<SubmittedSummary> {
        let balance = self.form.rows().get(row)?;
        Some(SubmittedSummary {
            symbol: balance.token_symbol.clone(),
            amount: self.form.intents()[row]
                .as_ref()
                .map(|intent| intent.amount_text.trim().to_string())
                .unwrap_or_default(),
            destination_chain: self.form.destinations()[row]
                .chain()
                .map(|d| d.chain_name.clone())
                .unwrap_or_default(),
            receivers: self.form.receivers()[row].entries(),
        })
    }
}

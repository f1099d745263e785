//! Transfer form state.
//!
//! One [`TransferForm`] owns the editable transfer state for a balance
//! snapshot: per row a destination chain, a receiver list and an amount. Every
//! per-row collection is an `Arc<[T]>` that is replaced whole on each edit, so
//! a reader holding an older `Arc` never observes a half-applied update.
//!
//! A row moves through: unset -> edited -> submitted (in flight) -> pending.
//! Pending rows are frozen until [`TransferForm::acknowledge_and_reset`]
//! clears the whole form.

use ethers::types::{Address, TxHash, U256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::async_job::AsyncJob;
use crate::config::compose_tx_explorer_url;
use crate::distribution::{send_to_many_call, TransferCall};
use crate::submitter::{SubmissionReceipt, TransactionSubmitter};
use crate::types::BalanceRow;
use crate::utils::{parse_amount_input, parse_token_amount, split_receivers};

/// A chain a row can be sent to, with the distribution contract deployed there.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub chain_name: String,
    pub chain_id: u64,
    pub distributor: Address,
}

/// Per-row destination. `Unset` clears chain name and id together.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DestinationSelection {
    #[default]
    Unset,
    Chain(Destination),
}

impl DestinationSelection {
    pub fn is_set(&self) -> bool {
        matches!(self, DestinationSelection::Chain(_))
    }

    pub fn chain(&self) -> Option<&Destination> {
        match self {
            DestinationSelection::Chain(d) => Some(d),
            DestinationSelection::Unset => None,
        }
    }
}

/// The chain the wallet is connected to.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceChain {
    pub chain_id: u64,
    pub chain_name: String,
    /// Distribution contract on the source chain; `None` keeps submission disabled
    pub distributor: Option<Address>,
}

/// Settings that shape every submission from the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPolicy {
    /// The one token symbol the distribution contract moves
    pub supported_asset: String,
    /// Native value attached to pay for cross-chain execution
    pub gas_payment: U256,
    /// Explorer URL with a `{tx}` placeholder
    pub explorer_tx_template: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransferIntent {
    pub token_symbol: String,
    pub token_address: Address,
    /// Amount exactly as typed
    pub amount_text: String,
    /// `None` when the text is not a finite, non-negative number
    pub amount: Option<f64>,
    pub pending_tx: bool,
}

/// Receiver text as typed; split only when the payload is derived.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReceiverAddressList {
    pub raw: String,
}

impl ReceiverAddressList {
    pub fn entries(&self) -> Vec<String> {
        split_receivers(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayloadEntry {
    pub row: usize,
    pub destination: Destination,
    pub intent: Option<TransferIntent>,
    pub receivers: Vec<String>,
}

/// Rows that have a destination and are not yet pending.
///
/// Inclusion only requires a destination; the amount may still be unset.
/// Whether a row can actually be sent is answered by
/// [`TransferForm::submit_control`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubmissionPayload {
    pub entries: Vec<PayloadEntry>,
}

impl SubmissionPayload {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_for(&self, row: usize) -> Option<&PayloadEntry> {
        self.entries.iter().find(|e| e.row == row)
    }
}

/// Why a row's send control is disabled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitBlocker {
    #[error("No such row")]
    NoRow,
    #[error("Transfer already submitted")]
    Pending,
    #[error("Another transfer is in flight")]
    InFlight,
    #[error("Only {0} can be distributed")]
    UnsupportedAsset(String),
    #[error("No distribution contract on the source chain")]
    NoSourceContract,
    #[error("Choose a destination chain")]
    NoDestination,
    #[error("Destination must differ from the source chain")]
    SameChain,
    #[error("Enter an amount")]
    NoAmount,
    #[error("Amount must be greater than zero")]
    ZeroAmount,
    #[error("{0}")]
    InvalidAmount(String),
    #[error("Enter at least one receiver")]
    NoReceivers,
    #[error("Invalid receiver address: {0}")]
    InvalidReceiver(String),
    #[error("Wallet is not ready to sign")]
    SubmitterNotReady,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitControl {
    Enabled,
    Disabled(SubmitBlocker),
}

impl SubmitControl {
    pub fn is_enabled(&self) -> bool {
        matches!(self, SubmitControl::Enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("Row {index} out of bounds ({len} rows)")]
    RowOutOfBounds { index: usize, len: usize },
    #[error("Row {0} has a pending transfer")]
    RowPending(usize),
    #[error("Destination chain {0} is the source chain")]
    SameChainDestination(u64),
    #[error("Cannot submit: {0}")]
    NotSubmittable(SubmitBlocker),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Confirmed(SubmissionReceipt),
    Failed(String),
}

/// The last transfer that went through, kept for the explorer link.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedTransfer {
    pub row: usize,
    pub tx_hash: TxHash,
}

struct InFlight {
    row: usize,
    job: AsyncJob<SubmissionReceipt>,
}

pub struct TransferForm {
    rows: Arc<[BalanceRow]>,
    destinations: Arc<[DestinationSelection]>,
    intents: Arc<[Option<TransferIntent>]>,
    receivers: Arc<[ReceiverAddressList]>,
    source: SourceChain,
    policy: FormPolicy,
    in_flight: Option<InFlight>,
    last_submitted: Option<SubmittedTransfer>,
    payload: SubmissionPayload,
}

fn replace_at<T: Clone>(items: &Arc<[T]>, index: usize, value: T) -> Arc<[T]> {
    let mut next = items.to_vec();
    next[index] = value;
    next.into()
}

impl TransferForm {
    pub fn new(source: SourceChain, policy: FormPolicy) -> Self {
        Self {
            rows: Arc::from(Vec::new()),
            destinations: Arc::from(Vec::new()),
            intents: Arc::from(Vec::new()),
            receivers: Arc::from(Vec::new()),
            source,
            policy,
            in_flight: None,
            last_submitted: None,
            payload: SubmissionPayload::default(),
        }
    }

    /// Take a new balance snapshot. All edits and any in-flight submission are dropped.
    pub fn initialize_from_snapshot(&mut self, rows: Vec<BalanceRow>) {
        let len = rows.len();
        if self.in_flight.take().is_some() {
            warn!("Balance snapshot replaced while a transfer was in flight");
        }
        if let Some(submitted) = &self.last_submitted {
            warn!(
                "Balance snapshot replaced before transfer {:?} was acknowledged",
                submitted.tx_hash
            );
        }
        self.rows = rows.into();
        self.destinations = vec![DestinationSelection::Unset; len].into();
        self.intents = vec![None; len].into();
        self.receivers = vec![ReceiverAddressList::default(); len].into();
        self.last_submitted = None;
        self.refresh_payload();
        debug!("Transfer form initialized with {} rows", len);
    }

    /// The wallet moved to another chain; the old snapshot no longer applies.
    pub fn set_source_chain(&mut self, source: SourceChain) {
        if self.awaiting_acknowledgement() {
            warn!(
                "Source chain changed to {} with an unacknowledged transfer",
                source.chain_name
            );
        }
        self.source = source;
        self.clear();
    }

    pub fn set_policy(&mut self, policy: FormPolicy) {
        self.policy = policy;
    }

    pub fn set_destination(
        &mut self,
        row: usize,
        selection: DestinationSelection,
    ) -> Result<(), FormError> {
        self.check_editable(row)?;
        if let DestinationSelection::Chain(dest) = &selection {
            if dest.chain_id == self.source.chain_id {
                return Err(FormError::SameChainDestination(dest.chain_id));
            }
        }
        self.destinations = replace_at(&self.destinations, row, selection);
        self.refresh_payload();
        Ok(())
    }

    pub fn set_receiver_addresses(&mut self, row: usize, raw_text: &str) -> Result<(), FormError> {
        self.check_editable(row)?;
        let list = ReceiverAddressList {
            raw: raw_text.to_string(),
        };
        self.receivers = replace_at(&self.receivers, row, list);
        self.refresh_payload();
        Ok(())
    }

    pub fn set_transfer_amount(&mut self, row: usize, raw_text: &str) -> Result<(), FormError> {
        self.check_editable(row)?;
        let balance = &self.rows[row];
        let intent = TransferIntent {
            token_symbol: balance.token_symbol.clone(),
            token_address: balance.token_address,
            amount_text: raw_text.to_string(),
            amount: parse_amount_input(raw_text),
            pending_tx: false,
        };
        self.intents = replace_at(&self.intents, row, Some(intent));
        self.refresh_payload();
        Ok(())
    }

    /// Recompute the payload from the current per-row state. Pure.
    pub fn derive_payload(&self) -> SubmissionPayload {
        let entries = self
            .destinations
            .iter()
            .enumerate()
            .filter(|(row, _)| !self.is_pending(*row))
            .filter_map(|(row, selection)| {
                selection.chain().map(|destination| PayloadEntry {
                    row,
                    destination: destination.clone(),
                    intent: self.intents[row].clone(),
                    receivers: self.receivers[row].entries(),
                })
            })
            .collect();
        SubmissionPayload { entries }
    }

    /// The payload as of the last mutation.
    pub fn payload(&self) -> &SubmissionPayload {
        &self.payload
    }

    fn refresh_payload(&mut self) {
        self.payload = self.derive_payload();
    }

    pub fn submit_control(&self, row: usize, submitter: &dyn TransactionSubmitter) -> SubmitControl {
        match self.prepare_transfer(row, submitter) {
            Ok(_) => SubmitControl::Enabled,
            Err(blocker) => SubmitControl::Disabled(blocker),
        }
    }

    fn prepare_transfer(
        &self,
        row: usize,
        submitter: &dyn TransactionSubmitter,
    ) -> Result<(Address, TransferCall), SubmitBlocker> {
        let balance = self.rows.get(row).ok_or(SubmitBlocker::NoRow)?;
        if self.is_pending(row) {
            return Err(SubmitBlocker::Pending);
        }
        if self.in_flight.is_some() {
            return Err(SubmitBlocker::InFlight);
        }
        if balance.token_symbol != self.policy.supported_asset {
            return Err(SubmitBlocker::UnsupportedAsset(
                self.policy.supported_asset.clone(),
            ));
        }
        let source_distributor = self.source.distributor.ok_or(SubmitBlocker::NoSourceContract)?;
        let destination = self.destinations[row]
            .chain()
            .ok_or(SubmitBlocker::NoDestination)?;
        if destination.chain_id == self.source.chain_id {
            return Err(SubmitBlocker::SameChain);
        }

        let intent = self.intents[row].as_ref().ok_or(SubmitBlocker::NoAmount)?;
        let amount = intent.amount.ok_or(SubmitBlocker::NoAmount)?;
        if amount == 0.0 {
            return Err(SubmitBlocker::ZeroAmount);
        }
        let scaled = parse_token_amount(&intent.amount_text, balance.decimals)
            .map_err(|e| SubmitBlocker::InvalidAmount(e.to_string()))?;
        if scaled.is_zero() {
            return Err(SubmitBlocker::ZeroAmount);
        }

        let entries = self.receivers[row].entries();
        if entries.is_empty() {
            return Err(SubmitBlocker::NoReceivers);
        }
        let receivers = entries
            .iter()
            .map(|raw| {
                raw.parse::<Address>()
                    .map_err(|_| SubmitBlocker::InvalidReceiver(raw.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !submitter.is_ready() {
            return Err(SubmitBlocker::SubmitterNotReady);
        }

        Ok((
            source_distributor,
            TransferCall {
                destination_chain: destination.chain_name.clone(),
                destination_contract: destination.distributor,
                receivers,
                symbol: balance.token_symbol.clone(),
                token: balance.token_address,
                amount: scaled,
            },
        ))
    }

    /// Hand the row's transfer to `submitter`. Fails closed with the blocker
    /// when the row cannot be sent; nothing is submitted in that case.
    pub fn submit(
        &mut self,
        row: usize,
        submitter: &dyn TransactionSubmitter,
    ) -> Result<(), FormError> {
        let (source_distributor, transfer) = self
            .prepare_transfer(row, submitter)
            .map_err(FormError::NotSubmittable)?;
        let call = send_to_many_call(
            source_distributor,
            self.source.chain_id,
            &transfer,
            self.policy.gas_payment,
        );
        info!(
            "Submitting row {}: {} {} to {} receiver(s) on {}",
            row,
            self.intents[row]
                .as_ref()
                .map(|i| i.amount_text.as_str())
                .unwrap_or_default(),
            transfer.symbol,
            transfer.receivers.len(),
            transfer.destination_chain
        );
        let job = submitter.submit(call);
        self.in_flight = Some(InFlight { row, job });
        Ok(())
    }

    /// Check the in-flight job; when it finishes its result is applied and returned.
    pub fn poll_submission(&mut self) -> Option<(usize, SubmissionOutcome)> {
        let in_flight = self.in_flight.as_mut()?;
        let result = in_flight.job.poll()?;
        let row = in_flight.row;
        let outcome = match result {
            Ok(receipt) => SubmissionOutcome::Confirmed(receipt),
            Err(e) => SubmissionOutcome::Failed(e.to_string()),
        };
        if let Err(e) = self.on_submission_result(row, &outcome) {
            warn!("Dropping submission result: {}", e);
            return None;
        }
        Some((row, outcome))
    }

    /// Apply a submission result. Success marks the row pending; failure
    /// leaves every row as it was and is not retried.
    pub fn on_submission_result(
        &mut self,
        row: usize,
        outcome: &SubmissionOutcome,
    ) -> Result<(), FormError> {
        if self.in_flight.as_ref().is_some_and(|f| f.row == row) {
            self.in_flight = None;
        }
        self.check_row(row)?;

        match outcome {
            SubmissionOutcome::Confirmed(receipt) => {
                let balance = &self.rows[row];
                let intent = match &self.intents[row] {
                    Some(intent) => TransferIntent {
                        pending_tx: true,
                        ..intent.clone()
                    },
                    None => TransferIntent {
                        token_symbol: balance.token_symbol.clone(),
                        token_address: balance.token_address,
                        amount_text: String::new(),
                        amount: None,
                        pending_tx: true,
                    },
                };
                self.intents = replace_at(&self.intents, row, Some(intent));
                self.last_submitted = Some(SubmittedTransfer {
                    row,
                    tx_hash: receipt.tx_hash,
                });
                self.refresh_payload();
                info!("Row {} transfer confirmed in {:?}", row, receipt.tx_hash);
            }
            SubmissionOutcome::Failed(reason) => {
                warn!("Row {} transfer failed: {}", row, reason);
            }
        }
        Ok(())
    }

    /// Explorer link for the last transfer, then a full reset. The caller
    /// opens the link and fetches a fresh snapshot.
    pub fn acknowledge_and_reset(&mut self) -> Option<String> {
        let url = self.last_submitted.as_ref().map(|t| {
            compose_tx_explorer_url(&self.policy.explorer_tx_template, &format!("{:?}", t.tx_hash))
        });
        self.clear();
        url
    }

    fn clear(&mut self) {
        self.rows = Arc::from(Vec::new());
        self.destinations = Arc::from(Vec::new());
        self.intents = Arc::from(Vec::new());
        self.receivers = Arc::from(Vec::new());
        self.in_flight = None;
        self.last_submitted = None;
        self.refresh_payload();
    }

    fn check_row(&self, row: usize) -> Result<(), FormError> {
        if row >= self.rows.len() {
            return Err(FormError::RowOutOfBounds {
                index: row,
                len: self.rows.len(),
            });
        }
        Ok(())
    }

    fn check_editable(&self, row: usize) -> Result<(), FormError> {
        self.check_row(row)?;
        if self.is_pending(row) {
            return Err(FormError::RowPending(row));
        }
        Ok(())
    }

    pub fn is_pending(&self, row: usize) -> bool {
        self.intents
            .get(row)
            .and_then(|i| i.as_ref())
            .is_some_and(|i| i.pending_tx)
    }

    pub fn rows(&self) -> &Arc<[BalanceRow]> {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn destinations(&self) -> &Arc<[DestinationSelection]> {
        &self.destinations
    }

    pub fn intents(&self) -> &Arc<[Option<TransferIntent>]> {
        &self.intents
    }

    pub fn receivers(&self) -> &Arc<[ReceiverAddressList]> {
        &self.receivers
    }

    pub fn source(&self) -> &SourceChain {
        &self.source
    }

    pub fn policy(&self) -> &FormPolicy {
        &self.policy
    }

    pub fn last_submitted(&self) -> Option<&SubmittedTransfer> {
        self.last_submitted.as_ref()
    }

    /// A transfer is in flight, or confirmed but not yet acknowledged.
    /// Replacing the snapshot or the source chain now would lose it.
    pub fn awaiting_acknowledgement(&self) -> bool {
        self.in_flight.is_some() || self.last_submitted.is_some()
    }

    pub fn in_flight_row(&self) -> Option<usize> {
        self.in_flight.as_ref().map(|f| f.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{CallDescriptor, SEND_TO_MANY_SIGNATURE};
    use anyhow::anyhow;
    use ethers::abi::Token;
    use std::cell::RefCell;
    use std::sync::mpsc::{self, Sender};

    const SOURCE_DISTRIBUTOR: &str = "0x1000000000000000000000000000000000000001";
    const POLYGON_DISTRIBUTOR: &str = "0x0000000000000000000000000000000000000abc";
    const RECEIVER_A: &str = "0x254d06f33bDc5b8ee05b2ea472107E300226659A";
    const RECEIVER_B: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    enum Mode {
        Resolve(Result<SubmissionReceipt, String>),
        Hold,
    }

    struct MockSubmitter {
        ready: bool,
        mode: Mode,
        calls: RefCell<Vec<CallDescriptor>>,
        held: RefCell<Vec<Sender<anyhow::Result<SubmissionReceipt>>>>,
    }

    impl MockSubmitter {
        fn with_mode(ready: bool, mode: Mode) -> Self {
            Self {
                ready,
                mode,
                calls: RefCell::new(Vec::new()),
                held: RefCell::new(Vec::new()),
            }
        }

        fn confirming(hash_byte: u8) -> Self {
            Self::with_mode(true, Mode::Resolve(Ok(receipt(hash_byte))))
        }

        fn failing(reason: &str) -> Self {
            Self::with_mode(true, Mode::Resolve(Err(reason.to_string())))
        }

        fn not_ready() -> Self {
            Self::with_mode(false, Mode::Hold)
        }

        fn holding() -> Self {
            Self::with_mode(true, Mode::Hold)
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl TransactionSubmitter for MockSubmitter {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn submit(&self, call: CallDescriptor) -> AsyncJob<SubmissionReceipt> {
            self.calls.borrow_mut().push(call);
            let (tx, rx) = mpsc::channel();
            match &self.mode {
                Mode::Resolve(result) => {
                    let _ = tx.send(result.clone().map_err(|e| anyhow!(e)));
                }
                Mode::Hold => self.held.borrow_mut().push(tx),
            }
            AsyncJob::new(rx)
        }
    }

    fn receipt(hash_byte: u8) -> SubmissionReceipt {
        SubmissionReceipt {
            tx_hash: TxHash::from([hash_byte; 32]),
            block_number: Some(100),
            gas_used: None,
        }
    }

    fn source() -> SourceChain {
        SourceChain {
            chain_id: 43113,
            chain_name: "Avalanche".to_string(),
            distributor: Some(SOURCE_DISTRIBUTOR.parse().unwrap()),
        }
    }

    fn policy() -> FormPolicy {
        FormPolicy {
            supported_asset: "aUSDC".to_string(),
            gas_payment: U256::from(10_000_000_000_000_000u64),
            explorer_tx_template: "https://testnet.axelarscan.io/gmp/{tx}".to_string(),
        }
    }

    fn polygon() -> DestinationSelection {
        DestinationSelection::Chain(Destination {
            chain_name: "Polygon".to_string(),
            chain_id: 80001,
            distributor: POLYGON_DISTRIBUTOR.parse().unwrap(),
        })
    }

    fn snapshot() -> Vec<BalanceRow> {
        vec![
            BalanceRow::new("aUSDC", Address::from([0xaa; 20]), "120.5", 6),
            BalanceRow::new("WETH", Address::from([0xbb; 20]), "0.3", 18),
        ]
    }

    fn form() -> TransferForm {
        let mut form = TransferForm::new(source(), policy());
        form.initialize_from_snapshot(snapshot());
        form
    }

    fn ready_row_zero(form: &mut TransferForm) {
        form.set_destination(0, polygon()).unwrap();
        form.set_receiver_addresses(0, &format!("{},{}", RECEIVER_A, RECEIVER_B))
            .unwrap();
        form.set_transfer_amount(0, "5").unwrap();
    }

    fn confirm_row_zero(form: &mut TransferForm) {
        ready_row_zero(form);
        let submitter = MockSubmitter::confirming(0x11);
        form.submit(0, &submitter).unwrap();
        assert!(form.poll_submission().is_some());
    }

    // ==================== snapshot tests ====================

    #[test]
    fn test_initialize_sizes_all_arrays_unset() {
        for len in [0usize, 1, 7] {
            let mut form = TransferForm::new(source(), policy());
            let rows = (0..len)
                .map(|i| BalanceRow::new(format!("T{}", i), Address::zero(), "1", 18))
                .collect();
            form.initialize_from_snapshot(rows);
            assert_eq!(form.row_count(), len);
            assert_eq!(form.destinations().len(), len);
            assert_eq!(form.intents().len(), len);
            assert_eq!(form.receivers().len(), len);
            assert!(form.destinations().iter().all(|d| !d.is_set()));
            assert!(form.intents().iter().all(Option::is_none));
            assert!(form.receivers().iter().all(|r| r.raw.is_empty()));
        }
    }

    #[test]
    fn test_new_snapshot_discards_edits() {
        let mut form = form();
        ready_row_zero(&mut form);
        form.initialize_from_snapshot(snapshot());
        assert!(form.payload().is_empty());
        assert!(form.intents()[0].is_none());
    }

    #[test]
    fn test_new_snapshot_drops_in_flight_submission() {
        let mut form = form();
        ready_row_zero(&mut form);
        let submitter = MockSubmitter::holding();
        form.submit(0, &submitter).unwrap();
        assert_eq!(form.in_flight_row(), Some(0));

        form.initialize_from_snapshot(snapshot());
        assert_eq!(form.in_flight_row(), None);
        assert!(form.poll_submission().is_none());
    }

    #[test]
    fn test_edit_replaces_arrays_without_touching_old_snapshot() {
        let mut form = form();
        let before = Arc::clone(form.destinations());
        form.set_destination(0, polygon()).unwrap();
        assert!(!before[0].is_set());
        assert!(form.destinations()[0].is_set());
    }

    // ==================== editing tests ====================

    #[test]
    fn test_edits_out_of_bounds_rejected() {
        let mut form = form();
        assert_eq!(
            form.set_transfer_amount(5, "1"),
            Err(FormError::RowOutOfBounds { index: 5, len: 2 })
        );
        assert!(form.set_destination(2, polygon()).is_err());
        assert!(form.set_receiver_addresses(9, "x").is_err());
    }

    #[test]
    fn test_same_chain_destination_rejected() {
        let mut form = form();
        let same = DestinationSelection::Chain(Destination {
            chain_name: "Avalanche".to_string(),
            chain_id: 43113,
            distributor: Address::zero(),
        });
        assert_eq!(
            form.set_destination(0, same),
            Err(FormError::SameChainDestination(43113))
        );
        assert!(!form.destinations()[0].is_set());
    }

    #[test]
    fn test_clear_destination_removes_row_from_payload() {
        let mut form = form();
        form.set_destination(1, polygon()).unwrap();
        assert_eq!(form.payload().len(), 1);
        form.set_destination(1, DestinationSelection::Unset).unwrap();
        assert!(form.payload().is_empty());
    }

    #[test]
    fn test_receiver_text_stored_verbatim() {
        let mut form = form();
        form.set_receiver_addresses(0, " 0x1 ,, not-an-address").unwrap();
        assert_eq!(form.receivers()[0].raw, " 0x1 ,, not-an-address");
    }

    #[test]
    fn test_garbage_amount_is_unset_not_zero() {
        let mut form = form();
        form.set_destination(0, polygon()).unwrap();
        form.set_transfer_amount(0, "abc").unwrap();
        let payload = form.derive_payload();
        let intent = payload.entry_for(0).unwrap().intent.as_ref().unwrap();
        assert_eq!(intent.amount, None);
        assert_ne!(intent.amount, Some(0.0));
        assert!(!intent.pending_tx);
    }

    // ==================== payload tests ====================

    #[test]
    fn test_payload_single_polygon_entry() {
        let mut form = form();
        form.set_destination(0, polygon()).unwrap();
        form.set_receiver_addresses(0, "0x1,0x2").unwrap();
        form.set_transfer_amount(0, "5").unwrap();

        let payload = form.derive_payload();
        assert_eq!(payload.len(), 1);
        let entry = &payload.entries[0];
        assert_eq!(entry.row, 0);
        assert_eq!(entry.destination.chain_name, "Polygon");
        assert_eq!(entry.destination.chain_id, 80001);
        assert_eq!(
            entry.destination.distributor,
            POLYGON_DISTRIBUTOR.parse::<Address>().unwrap()
        );
        assert_eq!(entry.receivers, vec!["0x1", "0x2"]);
        assert_eq!(entry.intent.as_ref().unwrap().amount, Some(5.0));
    }

    #[test]
    fn test_derive_payload_is_idempotent() {
        let mut form = form();
        ready_row_zero(&mut form);
        form.set_destination(1, polygon()).unwrap();
        let first = form.derive_payload();
        let second = form.derive_payload();
        assert_eq!(first, second);
        assert_eq!(&first, form.payload());
    }

    #[test]
    fn test_payload_keeps_row_with_destination_but_no_amount() {
        // Inclusion only needs a destination; readiness is checked separately.
        let mut form = form();
        form.set_destination(1, polygon()).unwrap();
        let entry = form.payload().entry_for(1).cloned().unwrap();
        assert!(entry.intent.is_none());
        assert!(entry.receivers.is_empty());
        assert!(!form
            .submit_control(1, &MockSubmitter::confirming(1))
            .is_enabled());
    }

    #[test]
    fn test_payload_ignores_rows_without_destination() {
        let mut form = form();
        form.set_transfer_amount(0, "5").unwrap();
        form.set_receiver_addresses(0, RECEIVER_A).unwrap();
        assert!(form.payload().is_empty());
    }

    // ==================== submit control tests ====================

    #[test]
    fn test_submit_control_enabled_when_complete() {
        let mut form = form();
        ready_row_zero(&mut form);
        assert_eq!(
            form.submit_control(0, &MockSubmitter::confirming(1)),
            SubmitControl::Enabled
        );
    }

    #[test]
    fn test_submit_control_unsupported_asset() {
        let mut form = form();
        form.set_destination(1, polygon()).unwrap();
        form.set_receiver_addresses(1, RECEIVER_A).unwrap();
        form.set_transfer_amount(1, "0.1").unwrap();
        assert_eq!(
            form.submit_control(1, &MockSubmitter::confirming(1)),
            SubmitControl::Disabled(SubmitBlocker::UnsupportedAsset("aUSDC".to_string()))
        );
    }

    #[test]
    fn test_submit_control_blockers_in_order_of_entry() {
        let submitter = MockSubmitter::confirming(1);
        let mut form = form();
        assert_eq!(
            form.submit_control(0, &submitter),
            SubmitControl::Disabled(SubmitBlocker::NoDestination)
        );
        form.set_destination(0, polygon()).unwrap();
        assert_eq!(
            form.submit_control(0, &submitter),
            SubmitControl::Disabled(SubmitBlocker::NoAmount)
        );
        form.set_transfer_amount(0, "abc").unwrap();
        assert_eq!(
            form.submit_control(0, &submitter),
            SubmitControl::Disabled(SubmitBlocker::NoAmount)
        );
        form.set_transfer_amount(0, "0").unwrap();
        assert_eq!(
            form.submit_control(0, &submitter),
            SubmitControl::Disabled(SubmitBlocker::ZeroAmount)
        );
        form.set_transfer_amount(0, "2").unwrap();
        assert_eq!(
            form.submit_control(0, &submitter),
            SubmitControl::Disabled(SubmitBlocker::NoReceivers)
        );
        form.set_receiver_addresses(0, "0x1").unwrap();
        assert_eq!(
            form.submit_control(0, &submitter),
            SubmitControl::Disabled(SubmitBlocker::InvalidReceiver("0x1".to_string()))
        );
        form.set_receiver_addresses(0, RECEIVER_A).unwrap();
        assert!(form.submit_control(0, &submitter).is_enabled());
    }

    #[test]
    fn test_submit_control_too_many_decimals() {
        let mut form = form();
        ready_row_zero(&mut form);
        form.set_transfer_amount(0, "1.0000001").unwrap();
        match form.submit_control(0, &MockSubmitter::confirming(1)) {
            SubmitControl::Disabled(SubmitBlocker::InvalidAmount(msg)) => {
                assert!(msg.contains("decimal places"))
            }
            other => panic!("unexpected control {:?}", other),
        }
    }

    #[test]
    fn test_submit_control_no_source_contract() {
        let mut form = TransferForm::new(
            SourceChain {
                chain_id: 4002,
                chain_name: "Fantom".to_string(),
                distributor: None,
            },
            policy(),
        );
        form.initialize_from_snapshot(snapshot());
        ready_row_zero(&mut form);
        assert_eq!(
            form.submit_control(0, &MockSubmitter::confirming(1)),
            SubmitControl::Disabled(SubmitBlocker::NoSourceContract)
        );
    }

    #[test]
    fn test_submit_with_not_ready_submitter_makes_no_call() {
        let mut form = form();
        ready_row_zero(&mut form);
        let submitter = MockSubmitter::not_ready();
        assert_eq!(
            form.submit_control(0, &submitter),
            SubmitControl::Disabled(SubmitBlocker::SubmitterNotReady)
        );
        assert_eq!(
            form.submit(0, &submitter),
            Err(FormError::NotSubmittable(SubmitBlocker::SubmitterNotReady))
        );
        assert_eq!(submitter.call_count(), 0);
        assert_eq!(form.in_flight_row(), None);
    }

    // ==================== submission tests ====================

    #[test]
    fn test_submit_builds_send_to_many_call() {
        let mut form = form();
        ready_row_zero(&mut form);
        let submitter = MockSubmitter::holding();
        form.submit(0, &submitter).unwrap();

        let calls = submitter.calls.borrow();
        assert_eq!(calls.len(), 1);
        let call = &calls[0];
        assert_eq!(call.call_target, SOURCE_DISTRIBUTOR.parse::<Address>().unwrap());
        assert_eq!(call.chain_id, 43113);
        assert_eq!(call.function_signature(), SEND_TO_MANY_SIGNATURE);
        assert_eq!(call.native_value, policy().gas_payment);
        assert_eq!(call.arguments[0], Token::String("Polygon".to_string()));
        assert_eq!(
            call.arguments[2],
            Token::Array(vec![
                Token::Address(RECEIVER_A.parse().unwrap()),
                Token::Address(RECEIVER_B.parse().unwrap()),
            ])
        );
        assert_eq!(call.arguments[3], Token::String("aUSDC".to_string()));
        assert_eq!(call.arguments[4], Token::Uint(U256::from(5_000_000u64)));
    }

    #[test]
    fn test_second_submit_blocked_while_in_flight() {
        let mut form = form();
        ready_row_zero(&mut form);
        let submitter = MockSubmitter::holding();
        form.submit(0, &submitter).unwrap();
        assert_eq!(
            form.submit(0, &submitter),
            Err(FormError::NotSubmittable(SubmitBlocker::InFlight))
        );
        assert_eq!(submitter.call_count(), 1);
        assert!(form.poll_submission().is_none());
    }

    #[test]
    fn test_awaiting_acknowledgement_spans_send_until_reset() {
        let mut form = form();
        ready_row_zero(&mut form);
        assert!(!form.awaiting_acknowledgement());

        let submitter = MockSubmitter::holding();
        form.submit(0, &submitter).unwrap();
        assert!(form.awaiting_acknowledgement());

        let sender = submitter.held.borrow_mut().remove(0);
        sender.send(Ok(receipt(0x22))).unwrap();
        assert!(matches!(
            form.poll_submission(),
            Some((0, SubmissionOutcome::Confirmed(_)))
        ));
        assert!(form.awaiting_acknowledgement());

        assert!(form.acknowledge_and_reset().is_some());
        assert!(!form.awaiting_acknowledgement());
    }

    #[test]
    fn test_failed_submission_needs_no_acknowledgement() {
        let mut form = form();
        ready_row_zero(&mut form);
        form.submit(0, &MockSubmitter::failing("reverted")).unwrap();
        assert!(form.poll_submission().is_some());
        assert!(!form.awaiting_acknowledgement());
    }

    #[test]
    fn test_confirmed_submission_marks_row_pending() {
        let mut form = form();
        confirm_row_zero(&mut form);
        assert!(form.is_pending(0));
        assert_eq!(form.in_flight_row(), None);
        assert_eq!(
            form.last_submitted(),
            Some(&SubmittedTransfer {
                row: 0,
                tx_hash: TxHash::from([0x11; 32])
            })
        );
        assert!(form.payload().entry_for(0).is_none());
    }

    #[test]
    fn test_pending_row_survives_edits_to_other_rows() {
        let mut form = form();
        confirm_row_zero(&mut form);
        form.set_destination(1, polygon()).unwrap();
        form.set_transfer_amount(1, "1").unwrap();
        form.set_receiver_addresses(1, RECEIVER_B).unwrap();
        form.set_destination(1, DestinationSelection::Unset).unwrap();
        assert!(form.is_pending(0));
    }

    #[test]
    fn test_pending_row_is_frozen() {
        let mut form = form();
        confirm_row_zero(&mut form);
        let destinations = Arc::clone(form.destinations());
        let intents = Arc::clone(form.intents());
        let receivers = Arc::clone(form.receivers());

        assert_eq!(form.set_transfer_amount(0, "9"), Err(FormError::RowPending(0)));
        assert_eq!(
            form.set_destination(0, DestinationSelection::Unset),
            Err(FormError::RowPending(0))
        );
        assert_eq!(form.set_receiver_addresses(0, ""), Err(FormError::RowPending(0)));

        assert_eq!(form.destinations(), &destinations);
        assert_eq!(form.intents(), &intents);
        assert_eq!(form.receivers(), &receivers);
        assert_eq!(
            form.submit_control(0, &MockSubmitter::confirming(2)),
            SubmitControl::Disabled(SubmitBlocker::Pending)
        );
    }

    #[test]
    fn test_failed_submission_leaves_rows_unchanged() {
        let mut form = form();
        ready_row_zero(&mut form);
        let payload = form.payload().clone();
        let submitter = MockSubmitter::failing("user rejected");
        form.submit(0, &submitter).unwrap();

        let (row, outcome) = form.poll_submission().unwrap();
        assert_eq!(row, 0);
        assert_eq!(outcome, SubmissionOutcome::Failed("user rejected".to_string()));
        assert!(!form.is_pending(0));
        assert!(form.last_submitted().is_none());
        assert_eq!(form.payload(), &payload);
        assert!(form.submit_control(0, &submitter).is_enabled());
    }

    #[test]
    fn test_on_submission_result_out_of_bounds() {
        let mut form = form();
        assert_eq!(
            form.on_submission_result(3, &SubmissionOutcome::Confirmed(receipt(1))),
            Err(FormError::RowOutOfBounds { index: 3, len: 2 })
        );
    }

    #[test]
    fn test_on_submission_result_without_intent_still_pends() {
        let mut form = form();
        form.on_submission_result(1, &SubmissionOutcome::Confirmed(receipt(7)))
            .unwrap();
        assert!(form.is_pending(1));
    }

    // ==================== reset tests ====================

    #[test]
    fn test_acknowledge_and_reset_returns_explorer_url() {
        let mut form = form();
        confirm_row_zero(&mut form);
        let url = form.acknowledge_and_reset().unwrap();
        assert_eq!(
            url,
            format!("https://testnet.axelarscan.io/gmp/0x{}", "11".repeat(32))
        );
    }

    #[test]
    fn test_acknowledge_and_reset_empties_everything() {
        let mut form = form();
        confirm_row_zero(&mut form);
        form.set_destination(1, polygon()).unwrap();
        form.acknowledge_and_reset();

        assert!(form.is_empty());
        assert!(form.destinations().is_empty());
        assert!(form.intents().is_empty());
        assert!(form.receivers().is_empty());
        assert!(form.payload().is_empty());
        assert!(form.last_submitted().is_none());
    }

    #[test]
    fn test_acknowledge_without_submission_has_no_url() {
        let mut form = form();
        assert_eq!(form.acknowledge_and_reset(), None);
        assert!(form.is_empty());
    }

    #[test]
    fn test_set_source_chain_clears_form() {
        let mut form = form();
        ready_row_zero(&mut form);
        let fantom = SourceChain {
            chain_id: 4002,
            chain_name: "Fantom".to_string(),
            distributor: None,
        };
        form.set_source_chain(fantom.clone());
        assert_eq!(form.source(), &fantom);
        assert!(form.is_empty());
        assert!(form.payload().is_empty());
    }
}

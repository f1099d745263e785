//! Distribution contract calls.
//!
//! The distribution contract takes a token from the caller on the source chain
//! and fans it out to many receivers on a destination chain through the
//! interchain gateway. This module only assembles and encodes calls; signing
//! and broadcasting belong to [`crate::submitter`].

use anyhow::{anyhow, Result};
use ethers::abi::{Function, Param, ParamType, StateMutability, Token};
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use std::sync::Arc;

/// sendToMany(string destinationChain, string destinationAddress,
///            address[] destinationAddresses, string symbol, uint256 amount)
pub const SEND_TO_MANY_SIGNATURE: &str = "sendToMany(string,string,address[],string,uint256)";

/// ERC20 approve(address,uint256) selector
pub const ERC20_APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

fn param(name: &str, kind: ParamType) -> Param {
    Param {
        name: name.to_string(),
        kind,
        internal_type: None,
    }
}

#[allow(deprecated)]
pub fn send_to_many_function() -> Function {
    // function sendToMany(...) external payable
    Function {
        name: "sendToMany".to_string(),
        inputs: vec![
            param("destinationChain", ParamType::String),
            param("destinationAddress", ParamType::String),
            param("destinationAddresses", ParamType::Array(Box::new(ParamType::Address))),
            param("symbol", ParamType::String),
            param("amount", ParamType::Uint(256)),
        ],
        outputs: vec![],
        constant: None,
        state_mutability: StateMutability::Payable,
    }
}

#[allow(deprecated)]
fn erc20_allowance_function() -> Function {
    Function {
        name: "allowance".to_string(),
        inputs: vec![
            param("owner", ParamType::Address),
            param("spender", ParamType::Address),
        ],
        outputs: vec![param("", ParamType::Uint(256))],
        constant: None,
        state_mutability: StateMutability::View,
    }
}

#[allow(deprecated)]
fn erc20_approve_function() -> Function {
    Function {
        name: "approve".to_string(),
        inputs: vec![
            param("spender", ParamType::Address),
            param("amount", ParamType::Uint(256)),
        ],
        outputs: vec![param("", ParamType::Bool)],
        constant: None,
        state_mutability: StateMutability::NonPayable,
    }
}

/// Token allowance the caller must have granted before the call can pull funds.
#[derive(Debug, Clone, PartialEq)]
pub struct Allowance {
    pub token: Address,
    pub spender: Address,
    pub amount: U256,
}

impl Allowance {
    pub fn allowance_calldata(&self, owner: Address) -> Result<Bytes> {
        let data = erc20_allowance_function()
            .encode_input(&[Token::Address(owner), Token::Address(self.spender)])?;
        Ok(data.into())
    }

    pub fn approve_calldata(&self) -> Result<Bytes> {
        let data = erc20_approve_function()
            .encode_input(&[Token::Address(self.spender), Token::Uint(self.amount)])?;
        Ok(data.into())
    }
}

/// A fully assembled contract call, ready for a transaction submitter.
#[derive(Debug, Clone)]
pub struct CallDescriptor {
    pub call_target: Address,
    pub chain_id: u64,
    pub function: Function,
    pub arguments: Vec<Token>,
    pub native_value: U256,
    pub allowance: Option<Allowance>,
}

impl CallDescriptor {
    pub fn function_signature(&self) -> String {
        self.function.signature()
    }

    pub fn calldata(&self) -> Result<Bytes> {
        let data = self
            .function
            .encode_input(&self.arguments)
            .map_err(|e| anyhow!("Failed to encode {}: {}", self.function.name, e))?;
        Ok(data.into())
    }
}

/// One row's transfer, resolved to on-chain types.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferCall {
    pub destination_chain: String,
    pub destination_contract: Address,
    pub receivers: Vec<Address>,
    pub symbol: String,
    pub token: Address,
    /// Amount in token base units
    pub amount: U256,
}

/// Build the `sendToMany` call on the source chain's distributor.
pub fn send_to_many_call(
    source_distributor: Address,
    source_chain_id: u64,
    transfer: &TransferCall,
    gas_payment: U256,
) -> CallDescriptor {
    let receivers = transfer
        .receivers
        .iter()
        .map(|a| Token::Address(*a))
        .collect();
    CallDescriptor {
        call_target: source_distributor,
        chain_id: source_chain_id,
        function: send_to_many_function(),
        arguments: vec![
            Token::String(transfer.destination_chain.clone()),
            Token::String(format!("{:?}", transfer.destination_contract)),
            Token::Array(receivers),
            Token::String(transfer.symbol.clone()),
            Token::Uint(transfer.amount),
        ],
        native_value: gas_payment,
        allowance: Some(Allowance {
            token: transfer.token,
            spender: source_distributor,
            amount: transfer.amount,
        }),
    }
}

/// Result of checking a configured distributor address on its chain
#[derive(Debug, Clone, PartialEq)]
pub enum DistributorStatus {
    /// Contract code contains the sendToMany selector
    Compatible,
    /// Contract exists but does not expose sendToMany
    MissingFunction,
    /// Nothing deployed at the address
    NotAContract,
    /// Validation is in progress
    Checking,
    Error(String),
}

impl DistributorStatus {
    pub fn display_text(&self) -> &'static str {
        match self {
            DistributorStatus::Compatible => "Distributor found",
            DistributorStatus::MissingFunction => "Contract lacks sendToMany",
            DistributorStatus::NotAContract => "Address is not a contract",
            DistributorStatus::Checking => "Checking...",
            DistributorStatus::Error(_) => "Validation error",
        }
    }
}

fn code_contains_selector(code: &[u8], selector: &[u8; 4]) -> bool {
    code.windows(4).any(|w| w == selector)
}

/// Check that a distributor is deployed and exposes sendToMany
pub async fn validate_distributor(
    provider: Arc<Provider<Http>>,
    distributor: Address,
) -> DistributorStatus {
    let code = match provider.get_code(distributor, None).await {
        Ok(code) => code,
        Err(e) => return DistributorStatus::Error(format!("Failed to get code: {}", e)),
    };

    if code.is_empty() {
        return DistributorStatus::NotAContract;
    }

    let selector = send_to_many_function().short_signature();
    if code_contains_selector(code.as_ref(), &selector) {
        DistributorStatus::Compatible
    } else {
        DistributorStatus::MissingFunction
    }
}

//! Local signing key used for on-chain withdrawal submission.
//!
//! The key comes from `CASHIER_WALLET_PRIVATE_KEY` and never from the config
//! file. Neither the key nor the signer is ever logged; only the derived
//! address is.

use std::fmt;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

pub const PRIVATE_KEY_ENV_VAR: &str = "CASHIER_WALLET_PRIVATE_KEY";

/// Signer pinned to the chain the contract lives on.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    chain_id: u64,
}

impl Wallet {
    /// Accepts 64 hex digits, optionally `0x`-prefixed and padded with
    /// whitespace.
    pub fn from_private_key(key: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key = key.trim();
        let digits = key.strip_prefix("0x").unwrap_or(key);
        if digits.len() != 64 {
            return Err(BlockchainError::Wallet(format!(
                "private key must be 64 hex digits, got {}",
                digits.len()
            )));
        }

        let signer = digits
            .parse::<PrivateKeySigner>()
            .map_err(|e| BlockchainError::Wallet(format!("unusable private key: {}", e)))?
            .with_chain_id(Some(chain_id));

        tracing::info!(address = %signer.address(), chain_id, "Withdrawal wallet loaded");
        Ok(Self { signer, chain_id })
    }

    pub fn from_env(chain_id: u64) -> BlockchainResult<Self> {
        match std::env::var(PRIVATE_KEY_ENV_VAR) {
            Ok(key) => Self::from_private_key(&key, chain_id),
            Err(_) => Err(BlockchainError::Wallet(format!("{} is not set", PRIVATE_KEY_ENV_VAR))),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

//! On-chain submission of prepared withdrawals.
//!
//! # Responsibilities
//! - Scale the decimal amount into token base units
//! - Call `Withdraw_Web` on the vault contract named by the prepared payload
//! - Bound every RPC call with the configured timeout

use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::primitives::U256;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::time::timeout;

use crate::api::PreparedWithdrawal;
use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;

sol! {
    #[sol(rpc)]
    interface ICashierVault {
        function Withdraw_Web(
            address token,
            uint256 amount,
            string transactionId,
            bytes encodedData,
            uint256 expiry,
            bytes signature
        ) external;
    }
}

/// Turns a prepared payload into an on-chain transaction hash.
#[async_trait]
pub trait WithdrawSubmitter: Send + Sync {
    async fn submit(&self, prepared: &PreparedWithdrawal, amount: Decimal) -> BlockchainResult<String>;
}

/// Scale `amount` to base units (`amount × 10^decimals`). Digits beyond
/// `decimals` are truncated.
pub fn scale_amount(amount: Decimal, decimals: u8) -> BlockchainResult<U256> {
    if amount.is_sign_negative() {
        return Err(BlockchainError::InvalidPayload(format!("negative amount {}", amount)));
    }
    let truncated = amount.trunc_with_scale(u32::from(decimals));
    let mantissa = u128::try_from(truncated.mantissa())
        .map_err(|_| BlockchainError::InvalidPayload(format!("amount {} out of range", amount)))?;
    let exponent = u32::from(decimals).saturating_sub(truncated.scale());

    U256::from(mantissa)
        .checked_mul(U256::from(10u8).pow(U256::from(exponent)))
        .ok_or_else(|| BlockchainError::InvalidPayload(format!("amount {} overflows uint256", amount)))
}

/// [`WithdrawSubmitter`] backed by an alloy HTTP provider and a local signer.
#[derive(Clone)]
pub struct ContractSubmitter {
    provider: DynProvider,
    chain_id: u64,
    timeout_duration: Duration,
}

impl ContractSubmitter {
    pub fn new(config: &BlockchainConfig, wallet: Wallet) -> BlockchainResult<Self> {
        let rpc_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        if wallet.chain_id() != config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: config.chain_id,
                actual: wallet.chain_id(),
            });
        }

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet.signer().clone()))
            .connect_http(rpc_url)
            .erased();

        tracing::info!(
            rpc_url = %config.rpc_url,
            chain_id = config.chain_id,
            from = %wallet.address(),
            "Withdrawal submitter initialized"
        );

        Ok(Self {
            provider,
            chain_id: config.chain_id,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let actual = timeout(self.timeout_duration, self.provider.get_chain_id())
            .await
            .map_err(|_| BlockchainError::Timeout(self.timeout_duration.as_secs()))?
            .map_err(|e| BlockchainError::Rpc(e.to_string()))?;
        if actual != self.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.chain_id,
                actual,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WithdrawSubmitter for ContractSubmitter {
    async fn submit(&self, prepared: &PreparedWithdrawal, amount: Decimal) -> BlockchainResult<String> {
        let scaled = scale_amount(amount, prepared.decimals)?;
        let vault = ICashierVault::new(prepared.contract_address, self.provider.clone());
        let call = vault.Withdraw_Web(
            prepared.token_address,
            scaled,
            prepared.transaction_id.clone(),
            prepared.encoded_data.clone(),
            U256::from(prepared.expiry),
            prepared.signature.clone(),
        );

        let pending = timeout(self.timeout_duration, call.send())
            .await
            .map_err(|_| BlockchainError::Timeout(self.timeout_duration.as_secs()))?
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("revert") {
                    BlockchainError::Reverted(message)
                } else {
                    BlockchainError::Rpc(message)
                }
            })?;

        let hash = pending.tx_hash().to_string();
        tracing::info!(
            tx_hash = %hash,
            transaction_id = %prepared.transaction_id,
            contract = %prepared.contract_address,
            "Withdraw_Web submitted"
        );
        Ok(hash)
    }
}

impl std::fmt::Debug for ContractSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractSubmitter")
            .field("chain_id", &self.chain_id)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_scale_amount() {
        let amount = Decimal::from_str("12.5").unwrap();
        assert_eq!(
            scale_amount(amount, 18).unwrap(),
            U256::from(12_500_000_000_000_000_000u128)
        );
        assert_eq!(scale_amount(amount, 6).unwrap(), U256::from(12_500_000u64));
        assert_eq!(scale_amount(Decimal::from(3), 0).unwrap(), U256::from(3u8));
    }

    #[test]
    fn test_scale_amount_truncates_extra_digits() {
        let amount = Decimal::from_str("1.23456789").unwrap();
        assert_eq!(scale_amount(amount, 2).unwrap(), U256::from(123u64));
    }

    #[test]
    fn test_scale_amount_rejects_negative() {
        let amount = Decimal::from_str("-1").unwrap();
        assert!(matches!(
            scale_amount(amount, 18),
            Err(BlockchainError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_submitter_rejects_wallet_on_other_chain() {
        let config = BlockchainConfig {
            chain_id: 56,
            ..BlockchainConfig::default()
        };
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        assert!(matches!(
            ContractSubmitter::new(&config, wallet),
            Err(BlockchainError::ChainMismatch { expected: 56, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn test_submit_against_unreachable_rpc() {
        let config = BlockchainConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            chain_id: 1,
            rpc_timeout_secs: 2,
        };
        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY, 1).unwrap();
        let submitter = ContractSubmitter::new(&config, wallet).unwrap();
        let prepared = PreparedWithdrawal {
            contract_address: alloy::primitives::Address::ZERO,
            token_address: alloy::primitives::Address::ZERO,
            transaction_id: "wd-1".into(),
            encoded_data: Default::default(),
            expiry: 0,
            signature: Default::default(),
            decimals: 18,
        };
        let err = submitter.submit(&prepared, Decimal::ONE).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Rpc(_) | BlockchainError::Timeout(_)));
    }
}

//! On-chain read access for ERC-4626 vaults
//!
//! Wraps an alloy HTTP provider behind the [`ChainReader`] trait so the
//! collector and block-time resolver can be exercised against scripted
//! fakes in tests. All vault state reads support pinning to a historical
//! block number.

use alloy::{
    eips::BlockId,
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    sol,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use std::str::FromStr;
use tracing::{debug, error, info};

// Minimal ERC-4626 surface: underlying asset plus raw totals
sol! {
    #[sol(rpc)]
    interface IErc4626 {
        function asset() external view returns (address);
        function totalAssets() external view returns (uint256);
        function totalSupply() external view returns (uint256);
    }
}

// Minimal ERC-20 surface for the underlying asset
sol! {
    #[sol(rpc)]
    interface IErc20 {
        function decimals() external view returns (uint8);
    }
}

/// Error types for chain access
#[derive(Debug)]
pub enum ChainError {
    ProviderError(String),
    ContractCallError(String),
    InvalidConfig(String),
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::ProviderError(msg) => write!(f, "Provider error: {}", msg),
            ChainError::ContractCallError(msg) => write!(f, "Contract call error: {}", msg),
            ChainError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

/// Raw vault state as read at one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultState {
    pub total_assets: U256,
    pub total_supply: U256,
}

/// Read-only chain access used by the collection pipeline
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current head block number
    async fn head_block_number(&self) -> Result<u64, ChainError>;

    /// Production timestamp of a block, unix seconds
    async fn block_timestamp(&self, block: u64) -> Result<u64, ChainError>;

    /// Decimals of the vault's underlying asset (`asset()` then `decimals()`)
    async fn asset_decimals(&self, vault: &str) -> Result<u32, ChainError>;

    /// `totalAssets` and `totalSupply`, both pinned to the given block
    async fn vault_state_at(&self, vault: &str, block: u64) -> Result<VaultState, ChainError>;
}

/// Chain reader backed by an EVM JSON-RPC endpoint
pub struct EvmChainClient {
    provider: RootProvider<Http<Client>>,
}

impl EvmChainClient {
    /// Connect to an RPC endpoint and verify it responds.
    ///
    /// A connectivity failure here is fatal for the run, matching the
    /// startup error taxonomy: no collection work starts against an
    /// unreachable endpoint.
    pub async fn connect(rpc_url: &str) -> Result<Self, ChainError> {
        let provider = ProviderBuilder::new().on_http(rpc_url.parse().map_err(|e| {
            ChainError::InvalidConfig(format!("Invalid RPC URL: {}", e))
        })?);

        let chain_id = provider.get_chain_id().await.map_err(|e| {
            error!(error = %e, "Failed to connect to RPC endpoint");
            ChainError::ProviderError(format!("Connection failed: {}", e))
        })?;

        info!(chain_id = chain_id, "Connected to chain RPC");

        Ok(Self { provider })
    }

    fn parse_address(vault: &str) -> Result<Address, ChainError> {
        Address::from_str(vault)
            .map_err(|e| ChainError::InvalidConfig(format!("Invalid vault address {}: {}", vault, e)))
    }
}

#[async_trait]
impl ChainReader for EvmChainClient {
    async fn head_block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::ProviderError(format!("get_block_number failed: {}", e)))
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, ChainError> {
        let blk = self
            .provider
            .get_block_by_number(block.into(), false.into())
            .await
            .map_err(|e| ChainError::ProviderError(format!("get_block {} failed: {}", block, e)))?
            .ok_or_else(|| ChainError::ProviderError(format!("Block {} not found", block)))?;

        Ok(blk.header.timestamp)
    }

    async fn asset_decimals(&self, vault: &str) -> Result<u32, ChainError> {
        let vault_addr = Self::parse_address(vault)?;
        let erc4626 = IErc4626::new(vault_addr, &self.provider);

        let asset_addr = erc4626
            .asset()
            .call()
            .await
            .map_err(|e| ChainError::ContractCallError(format!("asset() failed: {}", e)))?
            ._0;

        let erc20 = IErc20::new(asset_addr, &self.provider);
        let decimals = erc20
            .decimals()
            .call()
            .await
            .map_err(|e| ChainError::ContractCallError(format!("decimals() failed: {}", e)))?
            ._0;

        debug!(vault = %vault, asset = %asset_addr, decimals = decimals, "Resolved asset decimals");

        Ok(u32::from(decimals))
    }

    async fn vault_state_at(&self, vault: &str, block: u64) -> Result<VaultState, ChainError> {
        let vault_addr = Self::parse_address(vault)?;
        let erc4626 = IErc4626::new(vault_addr, &self.provider);
        let pin = BlockId::number(block);

        let total_assets = erc4626
            .totalAssets()
            .block(pin)
            .call()
            .await
            .map_err(|e| {
                ChainError::ContractCallError(format!(
                    "totalAssets() at block {} failed: {}",
                    block, e
                ))
            })?
            ._0;

        let total_supply = erc4626
            .totalSupply()
            .block(pin)
            .call()
            .await
            .map_err(|e| {
                ChainError::ContractCallError(format!(
                    "totalSupply() at block {} failed: {}",
                    block, e
                ))
            })?
            ._0;

        Ok(VaultState {
            total_assets,
            total_supply,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChainError::ProviderError("test".to_string());
        assert!(err.to_string().contains("Provider error"));

        let err = ChainError::ContractCallError("test".to_string());
        assert!(err.to_string().contains("Contract call error"));
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(EvmChainClient::parse_address("not-an-address").is_err());
        assert!(
            EvmChainClient::parse_address("0x8ECC0B419dfe3AE197BC96f2a03636b5E1BE91db").is_ok()
        );
    }
}

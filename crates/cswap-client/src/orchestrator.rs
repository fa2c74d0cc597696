//! user intents → pool engine and disclosure calls
//!
//! stays thin: every decision about prices, shares and delegation lives
//! in the pool and the ledger. this layer picks assets by side, computes
//! expiries and slippage bounds, and turns errors into actionable messages.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use cswap_disclosure::{DisclosureClient, GrantCache, StructuredSigner};
use cswap_ledger::{Address, AssetPair, BalanceHandle, EncryptedLedger, OperatorGrant};
use cswap_pool::{
    AddLiquidityReceipt, ErrorKind, LiquidityQuote, PoolError, RemoveLiquidityReceipt,
    SwapDirection, SwapQuote, SwapReceipt,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{ClientConfig, Side};
use crate::devnet::Devnet;

/// public pool state, safe to display to anyone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolView {
    pub pair: AssetPair,
    pub pool_account: Address,
    pub reserves: (u64, u64),
    pub total_liquidity: u128,
    pub providers: usize,
}

/// an account's decrypted balances plus its plaintext share balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub balance_a: u64,
    pub balance_b: u64,
    pub shares: u128,
}

pub struct Orchestrator {
    config: ClientConfig,
    devnet: Devnet,
    grants: Option<Arc<GrantCache>>,
}

impl Orchestrator {
    pub fn new(config: ClientConfig, devnet: Devnet) -> Self {
        let grants = config.cache_grants.then(|| Arc::new(GrantCache::new()));
        Self {
            config,
            devnet,
            grants,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn devnet(&self) -> &Devnet {
        &self.devnet
    }

    pub fn pair(&self) -> AssetPair {
        self.devnet.engine().pair()
    }

    pub fn pool_account(&self) -> Address {
        self.devnet.engine().pool_account()
    }

    /// persist devnet state after a mutation
    pub fn persist(&self) -> Result<()> {
        self.devnet.save()
    }

    /// bootstrap balance for `account` (devnet faucet)
    pub fn mint(&self, account: &Address, side: Side, amount: u64) -> Result<BalanceHandle> {
        let asset = side.address(&self.pair());
        let handle = self
            .devnet
            .ledger()
            .mint(account, &asset, amount)
            .with_context(|| format!("minting {} {}", amount, self.config.asset_config(side).symbol))?;
        Ok(handle)
    }

    /// authorize the pool as operator on both assets for the configured lifetime
    pub fn enable_pool(&self, owner: &Address) -> Result<Vec<OperatorGrant>> {
        let expiry = self.devnet.clock().now() + self.config.operator_lifetime_secs();
        let pool = self.pool_account();
        let ledger = self.devnet.ledger();

        let grants = self
            .pair()
            .assets()
            .iter()
            .map(|asset| ledger.authorize_operator(owner, asset, &pool, expiry))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("authorizing pool operator")?;

        info!("{} enabled pool {} until {}", owner, pool, expiry);
        Ok(grants)
    }

    /// true while the pool may move both of `owner`'s assets
    pub fn pool_enabled(&self, owner: &Address) -> Result<bool> {
        let pool = self.pool_account();
        let ledger = self.devnet.ledger();
        for asset in self.pair().assets() {
            if !ledger.is_operator(owner, &asset, &pool)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn revoke_pool(&self, owner: &Address) -> Result<()> {
        let pool = self.pool_account();
        for asset in self.pair().assets() {
            self.devnet.ledger().revoke_operator(owner, &asset, &pool)?;
        }
        Ok(())
    }

    pub fn quote_liquidity(&self, amount_a: u64, amount_b: u64) -> Result<LiquidityQuote> {
        Ok(self.devnet.engine().quote_liquidity(amount_a, amount_b)?)
    }

    pub fn add_liquidity(&self, provider: &Address, amount_a: u64, amount_b: u64) -> Result<AddLiquidityReceipt> {
        self.devnet
            .engine()
            .add_liquidity(provider, amount_a, amount_b)
            .map_err(explain)
            .context("adding liquidity")
    }

    pub fn remove_liquidity(&self, provider: &Address, shares: u128) -> Result<RemoveLiquidityReceipt> {
        self.devnet
            .engine()
            .remove_liquidity(provider, shares)
            .map_err(explain)
            .context("removing liquidity")
    }

    pub fn quote_swap(&self, sell: Side, amount_in: u64) -> Result<SwapQuote> {
        Ok(self.devnet.engine().quote_swap(direction(sell), amount_in)?)
    }

    /// sell `amount_in` of `sell`; without an explicit minimum, the
    /// current quote less `slippage_bps` is used
    pub fn swap(
        &self,
        trader: &Address,
        sell: Side,
        amount_in: u64,
        min_amount_out: Option<u64>,
        slippage_bps: u32,
    ) -> Result<SwapReceipt> {
        let engine = self.devnet.engine();
        let min_out = match min_amount_out {
            Some(m) => m,
            None => self.quote_swap(sell, amount_in)?.min_amount_out(slippage_bps).max(1),
        };

        let result = match sell {
            Side::A => engine.swap_exact_a_for_b(trader, amount_in, min_out),
            Side::B => engine.swap_exact_b_for_a(trader, amount_in, min_out),
        };
        result.map_err(explain).context("swapping")
    }

    pub fn pool_view(&self) -> PoolView {
        pool_view(self.devnet.engine())
    }

    /// disclosure client for `signer` against this devnet's service
    pub fn disclosure_client(&self, signer: Arc<dyn StructuredSigner>) -> DisclosureClient {
        let client = DisclosureClient::new(signer, self.devnet.decryption_service(), self.devnet.domain().clone())
            .with_clock(self.devnet.clock().clone())
            .with_duration_days(self.config.disclosure_days);
        match &self.grants {
            Some(cache) => client.with_cache(cache.clone()),
            None => client,
        }
    }

    /// plaintext balance of one asset, visible to `signer` only
    pub async fn decrypt_balance(&self, signer: Arc<dyn StructuredSigner>, side: Side) -> Result<u64> {
        let account = signer.address();
        let handle = self
            .devnet
            .ledger()
            .balance_handle(&account, &side.address(&self.pair()))?;
        let value = self
            .disclosure_client(signer)
            .disclose(handle)
            .await
            .context("decrypting balance")?;
        Ok(value)
    }

    /// both balances in one disclosure round trip
    pub async fn decrypt_balances(&self, signer: Arc<dyn StructuredSigner>) -> Result<AccountView> {
        let account = signer.address();
        let pair = self.pair();
        let ledger = self.devnet.ledger();
        let ha = ledger.balance_handle(&account, &pair.asset_a)?;
        let hb = ledger.balance_handle(&account, &pair.asset_b)?;

        let values: HashMap<BalanceHandle, u64> = self
            .disclosure_client(signer)
            .disclose_batch(&[ha, hb])
            .await
            .context("decrypting balances")?;

        Ok(AccountView {
            balance_a: values.get(&ha).copied().unwrap_or(0),
            balance_b: values.get(&hb).copied().unwrap_or(0),
            shares: self.devnet.engine().liquidity_of(&account),
        })
    }
}

pub fn pool_view<L: EncryptedLedger + ?Sized>(engine: &cswap_pool::PoolEngine<L>) -> PoolView {
    let pool = engine.snapshot();
    PoolView {
        pair: engine.pair(),
        pool_account: engine.pool_account(),
        reserves: pool.reserves(),
        total_liquidity: pool.total_supply(),
        providers: pool.providers().count(),
    }
}

fn direction(sell: Side) -> SwapDirection {
    match sell {
        Side::A => SwapDirection::AToB,
        Side::B => SwapDirection::BToA,
    }
}

/// attach the fix to errors the user can act on
fn explain(e: PoolError) -> anyhow::Error {
    match e.kind() {
        ErrorKind::Delegation => anyhow!("{} (run `cswap enable-pool` to authorize the pool)", e),
        _ => anyhow::Error::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cswap_ledger::ManualClock;

    #[test]
    fn test_delegation_hint() {
        let config = ClientConfig::default();
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let orch = Orchestrator::new(config, Devnet::new(&ClientConfig::default(), clock));
        let alice = Address::derive(b"alice");

        orch.mint(&alice, Side::A, 1_000).unwrap();
        orch.mint(&alice, Side::B, 1_000).unwrap();
        let err = orch.add_liquidity(&alice, 1_000, 1_000).unwrap_err();
        assert!(format!("{:#}", err).contains("enable-pool"));

        orch.enable_pool(&alice).unwrap();
        assert!(orch.pool_enabled(&alice).unwrap());
        orch.add_liquidity(&alice, 1_000, 1_000).unwrap();
        assert_eq!(orch.pool_view().reserves, (1_000, 1_000));
    }
}

//! end-to-end pool flows over the software ledger

use std::sync::Arc;

use cswap_ledger::{
    Address, AssetPair, EncryptedLedger, Error as LedgerError, HandleAccess, ManualClock,
    SoftwareLedger,
};
use cswap_pool::{ErrorKind, PoolEngine, PoolError, SwapDirection};

const DAY: u64 = 86_400;

struct Setup {
    engine: PoolEngine<SoftwareLedger>,
    clock: Arc<ManualClock>,
    pair: AssetPair,
    alice: Address,
    bob: Address,
}

fn setup() -> Setup {
    let usdc = Address::derive(b"usdc");
    let zama = Address::derive(b"zama");
    let pair = AssetPair::new(usdc, zama);
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let ledger = Arc::new(SoftwareLedger::with_clock(vec![usdc, zama], clock.clone()));
    let engine = PoolEngine::new(pair, ledger);

    let alice = Address::derive(b"alice");
    let bob = Address::derive(b"bob");
    let expiry = 1_700_000_000 + 30 * DAY;
    for user in [alice, bob] {
        for asset in pair.assets() {
            engine.ledger().mint(&user, &asset, 10_000_000).unwrap();
            engine
                .ledger()
                .authorize_operator(&user, &asset, &engine.pool_account(), expiry)
                .unwrap();
        }
    }

    Setup {
        engine,
        clock,
        pair,
        alice,
        bob,
    }
}

fn balance(s: &Setup, account: &Address, asset: &Address) -> u64 {
    let ledger = s.engine.ledger();
    let handle = ledger.balance_handle(account, asset).unwrap();
    ledger.reveal(&handle, account).unwrap()
}

#[test]
fn seed_then_swap_usdc_for_zama() {
    let s = setup();
    let seeded = s.engine.add_liquidity(&s.alice, 2_000_000, 1_000_000).unwrap();
    assert_eq!(seeded.shares_minted, 1_414_213);
    assert_eq!(s.engine.reserves(), (2_000_000, 1_000_000));

    let quote = s.engine.quote_swap(SwapDirection::AToB, 100_000).unwrap();
    let receipt = s.engine.swap_exact_a_for_b(&s.bob, 100_000, 1).unwrap();
    assert_eq!(receipt.amount_out, quote.amount_out);

    let (usdc, zama) = s.engine.reserves();
    assert_eq!(usdc, 2_100_000);
    assert!(zama < 1_000_000);
    assert_eq!(zama, 1_000_000 - receipt.amount_out);

    assert_eq!(balance(&s, &s.bob, &s.pair.asset_a), 10_000_000 - 100_000);
    assert_eq!(balance(&s, &s.bob, &s.pair.asset_b), 10_000_000 + receipt.amount_out);
}

#[test]
fn slippage_bound_rejects_without_mutation() {
    let s = setup();
    s.engine.add_liquidity(&s.alice, 2_000_000, 1_000_000).unwrap();
    let quote = s.engine.quote_swap(SwapDirection::AToB, 100_000).unwrap();
    let handle_before = s
        .engine
        .ledger()
        .balance_handle(&s.bob, &s.pair.asset_a)
        .unwrap();

    let err = s
        .engine
        .swap_exact_a_for_b(&s.bob, 100_000, quote.amount_out + 1)
        .unwrap_err();
    assert_eq!(
        err,
        PoolError::SlippageExceeded {
            amount_out: quote.amount_out,
            min_amount_out: quote.amount_out + 1,
        }
    );
    assert_eq!(err.kind(), ErrorKind::Invariant);
    assert_eq!(s.engine.reserves(), (2_000_000, 1_000_000));

    // nothing reached the ledger either
    let handle_after = s
        .engine
        .ledger()
        .balance_handle(&s.bob, &s.pair.asset_a)
        .unwrap();
    assert_eq!(handle_before, handle_after);
}

#[test]
fn dust_swap_below_bound_is_slippage() {
    let s = setup();
    s.engine.add_liquidity(&s.alice, 2_000_000, 1_000_000).unwrap();

    let err = s.engine.swap_exact_a_for_b(&s.bob, 1, 1).unwrap_err();
    assert_eq!(
        err,
        PoolError::SlippageExceeded {
            amount_out: 0,
            min_amount_out: 1,
        }
    );
    assert_eq!(
        s.engine.swap_exact_a_for_b(&s.bob, 1, 0).unwrap_err(),
        PoolError::InsufficientOutputAmount
    );
    assert_eq!(s.engine.reserves(), (2_000_000, 1_000_000));
}

#[test]
fn expired_delegation_fails_atomically() {
    let s = setup();
    s.engine.add_liquidity(&s.alice, 2_000_000, 1_000_000).unwrap();
    let before = s.engine.snapshot();

    s.clock.advance(31 * DAY);
    let err = s.engine.swap_exact_b_for_a(&s.bob, 50_000, 1).unwrap_err();
    assert!(matches!(
        err,
        PoolError::Delegation(LedgerError::OperatorExpired { .. })
    ));
    assert_eq!(err.kind(), ErrorKind::Delegation);
    assert_eq!(s.engine.snapshot(), before);

    // the pool's own outbound leg is untouched too
    let pool = s.engine.pool_account();
    assert_eq!(balance(&s, &pool, &s.pair.asset_a), 2_000_000);

    // re-authorize and retry
    let expiry = s.clock_now() + DAY;
    for asset in s.pair.assets() {
        s.engine
            .ledger()
            .authorize_operator(&s.bob, &asset, &pool, expiry)
            .unwrap();
    }
    s.engine.swap_exact_b_for_a(&s.bob, 50_000, 1).unwrap();
}

#[test]
fn remove_more_than_held() {
    let s = setup();
    let seeded = s.engine.add_liquidity(&s.alice, 2_000_000, 1_000_000).unwrap();

    let err = s.engine.remove_liquidity(&s.bob, 1).unwrap_err();
    assert_eq!(
        err,
        PoolError::InsufficientShares {
            requested: 1,
            available: 0,
        }
    );

    let err = s
        .engine
        .remove_liquidity(&s.alice, seeded.shares_minted + 1)
        .unwrap_err();
    assert!(matches!(err, PoolError::InsufficientShares { .. }));
}

#[test]
fn oversupply_is_absorbed() {
    let s = setup();
    s.engine.add_liquidity(&s.alice, 2_000_000, 1_000_000).unwrap();

    let quote = s.engine.quote_liquidity(400_000, 100_000).unwrap();
    let receipt = s.engine.add_liquidity(&s.bob, 400_000, 100_000).unwrap();
    assert_eq!(receipt.shares_minted, quote.shares);

    // full amounts were taken, nothing refunded
    assert_eq!(s.engine.reserves(), (2_400_000, 1_100_000));
    assert_eq!(balance(&s, &s.bob, &s.pair.asset_a), 10_000_000 - 400_000);

    // alice's shares gained the excess
    let removed = s.engine.remove_liquidity(&s.alice, 1_414_213).unwrap();
    assert!(removed.amount_a > 2_000_000);
}

#[test]
fn full_withdrawal_empties_pool() {
    let s = setup();
    let seeded = s.engine.add_liquidity(&s.alice, 2_000_000, 1_000_000).unwrap();
    s.engine.swap_exact_a_for_b(&s.bob, 100_000, 1).unwrap();

    let removed = s
        .engine
        .remove_liquidity(&s.alice, seeded.shares_minted)
        .unwrap();
    assert_eq!(removed.reserves, (0, 0));
    assert_eq!(s.engine.total_liquidity(), 0);
    assert_eq!(removed.amount_a, 2_100_000);

    // swaps now fail, a new deposit re-seeds
    assert_eq!(
        s.engine.swap_exact_a_for_b(&s.bob, 1_000, 1).unwrap_err(),
        PoolError::InsufficientLiquidity
    );
    let reseeded = s.engine.add_liquidity(&s.bob, 100, 400).unwrap();
    assert_eq!(reseeded.shares_minted, 200);
}

#[test]
fn zero_amounts_rejected_up_front() {
    let s = setup();
    assert_eq!(
        s.engine.add_liquidity(&s.alice, 0, 1).unwrap_err(),
        PoolError::ZeroAmount
    );
    s.engine.add_liquidity(&s.alice, 1_000, 1_000).unwrap();
    assert_eq!(
        s.engine.swap_exact_a_for_b(&s.alice, 0, 0).unwrap_err(),
        PoolError::ZeroAmount
    );
    assert_eq!(
        s.engine.remove_liquidity(&s.alice, 0).unwrap_err(),
        PoolError::ZeroAmount
    );
}

impl Setup {
    fn clock_now(&self) -> u64 {
        use cswap_ledger::Clock;
        self.clock.now()
    }
}

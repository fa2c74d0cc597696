//! pool mutations from many threads against one engine

use std::sync::Arc;
use std::thread;

use cswap_ledger::{Address, AssetPair, EncryptedLedger, HandleAccess, SoftwareLedger};
use cswap_pool::{math, PoolEngine, PoolError, SwapDirection, SwapReceipt};

const WORKERS: usize = 6;
const ROUNDS: usize = 40;
const FUNDS: u64 = 1_000_000_000;

fn balance(engine: &PoolEngine<SoftwareLedger>, account: &Address, asset: &Address) -> u64 {
    let ledger = engine.ledger();
    let handle = ledger.balance_handle(account, asset).unwrap();
    if handle.is_empty() {
        return 0;
    }
    ledger.reveal(&handle, account).unwrap()
}

/// output must match pricing against the reserves right before this swap
fn assert_priced_on_entry_state(receipt: &SwapReceipt) {
    let (after_a, after_b) = receipt.reserves;
    let (reserve_in, reserve_out) = match receipt.direction {
        SwapDirection::AToB => (after_a - receipt.amount_in, after_b + receipt.amount_out),
        SwapDirection::BToA => (after_b - receipt.amount_in, after_a + receipt.amount_out),
    };
    assert_eq!(
        math::swap_output(receipt.amount_in, reserve_in, reserve_out).unwrap(),
        receipt.amount_out
    );
}

#[test]
fn concurrent_mutations_stay_serialized() {
    let pair = AssetPair::new(Address::derive(b"usdc"), Address::derive(b"zama"));
    let ledger = Arc::new(SoftwareLedger::new(pair.assets().to_vec()));
    let engine = Arc::new(PoolEngine::new(pair, ledger));
    let pool = engine.pool_account();

    let users: Vec<Address> = (0..=WORKERS)
        .map(|i| Address::derive(format!("user-{}", i).as_bytes()))
        .collect();
    for user in &users {
        for asset in pair.assets() {
            engine.ledger().mint(user, &asset, FUNDS).unwrap();
            engine
                .ledger()
                .authorize_operator(user, &asset, &pool, u64::MAX)
                .unwrap();
        }
    }
    engine.add_liquidity(&users[0], 200_000_000, 100_000_000).unwrap();

    let handles: Vec<_> = users[1..]
        .iter()
        .copied()
        .enumerate()
        .map(|(i, user)| {
            let engine = engine.clone();
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let amount = 1_000 + (i * 997 + round * 31) as u64;
                    let receipt = if (i + round) % 2 == 0 {
                        engine.swap_exact_a_for_b(&user, amount, 1)
                    } else {
                        engine.swap_exact_b_for_a(&user, amount, 1)
                    };
                    assert_priced_on_entry_state(&receipt.unwrap());

                    if round % 5 == 0 {
                        let added = engine.add_liquidity(&user, 50_000, 25_000).unwrap();
                        match engine.remove_liquidity(&user, added.shares_minted) {
                            Ok(removed) => assert_eq!(removed.shares_burned, added.shares_minted),
                            Err(e) => assert_eq!(e, PoolError::InsufficientLiquidityBurned),
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = engine.snapshot();
    assert!(snapshot.is_consistent());

    // plaintext reserves equal what the pool account holds on the ledger
    let (ra, rb) = engine.reserves();
    assert_eq!(balance(&engine, &pool, &pair.asset_a), ra);
    assert_eq!(balance(&engine, &pool, &pair.asset_b), rb);

    // nothing created or lost across all accounts
    for asset in pair.assets() {
        let held: u64 = users.iter().map(|u| balance(&engine, u, &asset)).sum();
        assert_eq!(held + balance(&engine, &pool, &asset), FUNDS * users.len() as u64);
    }
}

//! delegation and handle-versioning behavior seen through the trait object

use std::sync::Arc;

use cswap_ledger::{
    Address, EncryptedLedger, Error, ErrorKind, HandleAccess, ManualClock, SoftwareLedger,
    Transfer,
};

struct Fixture {
    ledger: Arc<SoftwareLedger>,
    clock: Arc<ManualClock>,
    usdc: Address,
    zama: Address,
    alice: Address,
    bob: Address,
    pool: Address,
}

fn fixture() -> Fixture {
    let usdc = Address::derive(b"usdc");
    let zama = Address::derive(b"zama");
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let ledger = Arc::new(SoftwareLedger::with_clock(vec![usdc, zama], clock.clone()));
    Fixture {
        ledger,
        clock,
        usdc,
        zama,
        alice: Address::derive(b"alice"),
        bob: Address::derive(b"bob"),
        pool: Address::derive(b"pool"),
    }
}

#[test]
fn delegation_expires_and_can_be_renewed() {
    let f = fixture();
    let ledger: Arc<dyn EncryptedLedger> = f.ledger.clone();
    ledger.mint(&f.alice, &f.usdc, 1_000).unwrap();

    let expiry = f.clock.now_plus(30 * 86_400);
    ledger
        .authorize_operator(&f.alice, &f.usdc, &f.pool, expiry)
        .unwrap();

    let t = Transfer::new(f.alice, f.pool, f.usdc, 10);
    ledger.transfer_confidential(&f.pool, &t).unwrap();

    f.clock.advance(31 * 86_400);
    let err = ledger.transfer_confidential(&f.pool, &t).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Delegation);

    // re-authorizing replaces the stale grant
    let renewed = f.clock.now_plus(86_400);
    ledger
        .authorize_operator(&f.alice, &f.usdc, &f.pool, renewed)
        .unwrap();
    ledger.transfer_confidential(&f.pool, &t).unwrap();
}

#[test]
fn grant_is_scoped_to_one_asset() {
    let f = fixture();
    f.ledger.mint(&f.alice, &f.zama, 500).unwrap();
    f.ledger
        .authorize_operator(&f.alice, &f.usdc, &f.pool, u64::MAX)
        .unwrap();

    let err = f
        .ledger
        .transfer_confidential(&f.pool, &Transfer::new(f.alice, f.pool, f.zama, 1))
        .unwrap_err();
    assert!(matches!(err, Error::OperatorNotAuthorized { .. }));
}

#[test]
fn owner_moves_own_balance_without_grant() {
    let f = fixture();
    f.ledger.mint(&f.alice, &f.usdc, 100).unwrap();

    let receipt = f
        .ledger
        .transfer_confidential(&f.alice, &Transfer::new(f.alice, f.bob, f.usdc, 30))
        .unwrap();

    assert_eq!(f.ledger.reveal(&receipt.from_handle, &f.alice).unwrap(), 70);
    assert_eq!(f.ledger.reveal(&receipt.to_handle, &f.bob).unwrap(), 30);
    assert!(f.ledger.reveal(&receipt.to_handle, &f.alice).is_err());
}

#[test]
fn every_write_issues_a_fresh_handle() {
    let f = fixture();
    f.ledger.mint(&f.alice, &f.usdc, 100).unwrap();

    let mut seen = vec![f.ledger.balance_handle(&f.alice, &f.usdc).unwrap()];
    for _ in 0..5 {
        f.ledger
            .transfer_confidential(&f.alice, &Transfer::new(f.alice, f.bob, f.usdc, 1))
            .unwrap();
        let h = f.ledger.balance_handle(&f.alice, &f.usdc).unwrap();
        assert!(!seen.contains(&h));
        seen.push(h);
    }

    // reading does not rotate the handle
    let last = *seen.last().unwrap();
    assert_eq!(f.ledger.balance_handle(&f.alice, &f.usdc).unwrap(), last);
}

#[test]
fn zero_amount_transfer_rejected() {
    let f = fixture();
    f.ledger.mint(&f.alice, &f.usdc, 100).unwrap();
    let err = f
        .ledger
        .transfer_confidential(&f.alice, &Transfer::new(f.alice, f.bob, f.usdc, 0))
        .unwrap_err();
    assert_eq!(err, Error::ZeroAmount);
}

#[test]
fn batch_legs_see_earlier_legs() {
    let f = fixture();
    f.ledger.mint(&f.alice, &f.usdc, 10).unwrap();

    // bob can forward what he just received within the same batch
    f.ledger
        .authorize_operator(&f.alice, &f.usdc, &f.bob, u64::MAX)
        .unwrap();
    let receipts = f
        .ledger
        .execute_batch(
            &f.bob,
            &[
                Transfer::new(f.alice, f.bob, f.usdc, 10),
                Transfer::new(f.bob, f.pool, f.usdc, 10),
            ],
        )
        .unwrap();

    assert_eq!(receipts.len(), 2);
    assert_eq!(f.ledger.reveal(&receipts[1].to_handle, &f.pool).unwrap(), 10);
    assert_eq!(f.ledger.reveal(&receipts[1].from_handle, &f.bob).unwrap(), 0);
}

trait NowPlus {
    fn now_plus(&self, secs: u64) -> u64;
}

impl NowPlus for ManualClock {
    fn now_plus(&self, secs: u64) -> u64 {
        use cswap_ledger::Clock;
        self.now() + secs
    }
}

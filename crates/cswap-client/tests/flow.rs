//! orchestrator flows over a devnet, including persistence and polling

use std::sync::Arc;
use std::time::Duration;

use cswap_client::{
    dev_identity, spawn_poller, ClientConfig, Devnet, Orchestrator, Side, SnapshotSource,
};
use cswap_disclosure::StructuredSigner;
use cswap_ledger::{Clock, ManualClock};

const T0: u64 = 1_700_000_000;
const DAY: u64 = 86_400;

fn orchestrator(clock: Arc<ManualClock>) -> Orchestrator {
    let config = ClientConfig::default();
    let devnet = Devnet::new(&config, clock);
    Orchestrator::new(config, devnet)
}

#[tokio::test]
async fn seed_swap_and_decrypt() {
    let clock = Arc::new(ManualClock::new(T0));
    let orch = orchestrator(clock);
    let alice = dev_identity("alice").unwrap();
    let bob = dev_identity("bob").unwrap();

    for who in [alice.address(), bob.address()] {
        orch.mint(&who, Side::A, 5_000_000).unwrap();
        orch.mint(&who, Side::B, 5_000_000).unwrap();
        orch.enable_pool(&who).unwrap();
    }

    orch.add_liquidity(&alice.address(), 2_000_000, 1_000_000).unwrap();
    let quote = orch.quote_swap(Side::A, 100_000).unwrap();
    let receipt = orch
        .swap(&bob.address(), Side::A, 100_000, None, 50)
        .unwrap();
    assert_eq!(receipt.amount_out, quote.amount_out);
    assert_eq!(orch.pool_view().reserves.0, 2_100_000);

    let view = orch.decrypt_balances(bob.clone()).await.unwrap();
    assert_eq!(view.balance_a, 4_900_000);
    assert_eq!(view.balance_b, 5_000_000 + receipt.amount_out);
    assert_eq!(view.shares, 0);

    let alice_view = orch.decrypt_balances(alice.clone()).await.unwrap();
    assert_eq!(alice_view.shares, 1_414_213);
    assert_eq!(alice_view.balance_a, 3_000_000);

    let single = orch.decrypt_balance(alice, Side::B).await.unwrap();
    assert_eq!(single, 4_000_000);
}

#[tokio::test]
async fn fresh_account_decrypts_to_zero() {
    let orch = orchestrator(Arc::new(ManualClock::new(T0)));
    let carol = dev_identity("carol").unwrap();
    let view = orch.decrypt_balances(carol).await.unwrap();
    assert_eq!((view.balance_a, view.balance_b, view.shares), (0, 0, 0));
}

#[test]
fn explicit_min_out_enforced() {
    let orch = orchestrator(Arc::new(ManualClock::new(T0)));
    let alice = dev_identity("alice").unwrap().address();
    orch.mint(&alice, Side::A, 5_000_000).unwrap();
    orch.mint(&alice, Side::B, 5_000_000).unwrap();
    orch.enable_pool(&alice).unwrap();
    orch.add_liquidity(&alice, 2_000_000, 1_000_000).unwrap();

    let quote = orch.quote_swap(Side::B, 10_000).unwrap();
    let err = orch
        .swap(&alice, Side::B, 10_000, Some(quote.amount_out + 1), 0)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("slippage"));
    assert_eq!(orch.pool_view().reserves, (2_000_000, 1_000_000));
}

#[test]
fn delegation_lapses_after_configured_lifetime() {
    let clock = Arc::new(ManualClock::new(T0));
    let orch = orchestrator(clock.clone());
    let alice = dev_identity("alice").unwrap().address();
    orch.mint(&alice, Side::A, 5_000_000).unwrap();
    orch.mint(&alice, Side::B, 5_000_000).unwrap();
    orch.enable_pool(&alice).unwrap();
    orch.add_liquidity(&alice, 1_000_000, 1_000_000).unwrap();

    clock.advance(30 * DAY);
    assert!(!orch.pool_enabled(&alice).unwrap());
    let err = orch.swap(&alice, Side::A, 1_000, Some(1), 0).unwrap_err();
    assert!(format!("{:#}", err).contains("enable-pool"));
    assert_eq!(orch.pool_view().reserves, (1_000_000, 1_000_000));

    orch.enable_pool(&alice).unwrap();
    orch.swap(&alice, Side::A, 1_000, Some(1), 0).unwrap();
}

#[tokio::test]
async fn devnet_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devnet.json");
    let config = ClientConfig::default();
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(T0));
    let alice = dev_identity("alice").unwrap();

    {
        let devnet = Devnet::open_with_clock(&config, &path, clock.clone()).unwrap();
        let orch = Orchestrator::new(config.clone(), devnet);
        orch.mint(&alice.address(), Side::A, 3_000_000).unwrap();
        orch.mint(&alice.address(), Side::B, 3_000_000).unwrap();
        orch.enable_pool(&alice.address()).unwrap();
        orch.add_liquidity(&alice.address(), 2_000_000, 1_000_000).unwrap();
        orch.persist().unwrap();
    }

    let devnet = Devnet::open_with_clock(&config, &path, clock).unwrap();
    let orch = Orchestrator::new(config, devnet);
    assert_eq!(orch.pool_view().reserves, (2_000_000, 1_000_000));
    assert!(orch.pool_enabled(&alice.address()).unwrap());

    let view = orch.decrypt_balances(alice).await.unwrap();
    assert_eq!((view.balance_a, view.balance_b), (1_000_000, 2_000_000));
    assert_eq!(view.shares, 1_414_213);
}

#[test]
fn config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = ClientConfig::default();
    config.refresh_interval_secs = 3;
    config.relayer_url = Some("https://relayer.example".into());
    config.data_dir = Some(dir.path().to_path_buf());
    config.save(&path).unwrap();

    let loaded = ClientConfig::load_or_default(Some(path.as_path())).unwrap();
    assert_eq!(loaded, config);

    let missing = ClientConfig::load_or_default(Some(dir.path().join("absent.toml").as_path())).unwrap();
    assert_eq!(missing, ClientConfig::default());

    std::fs::write(&path, "disclosure_days = 0\n").unwrap();
    assert!(ClientConfig::load(&path).is_err());
}

#[tokio::test(start_paused = true)]
async fn poller_tracks_pool_and_stops() {
    let orch = orchestrator(Arc::new(ManualClock::new(T0)));
    let alice = dev_identity("alice").unwrap().address();
    orch.mint(&alice, Side::A, 5_000_000).unwrap();
    orch.mint(&alice, Side::B, 5_000_000).unwrap();
    orch.enable_pool(&alice).unwrap();

    let engine = orch.devnet().engine().clone();
    let mut poller = spawn_poller(engine, orch.config().refresh_interval());

    poller.updates.changed().await.unwrap();
    assert_eq!(poller.updates.borrow_and_update().as_ref().unwrap().reserves, (0, 0));

    orch.add_liquidity(&alice, 2_000_000, 1_000_000).unwrap();
    tokio::time::sleep(Duration::from_secs(16)).await;
    poller.updates.changed().await.unwrap();
    let view = poller.updates.borrow_and_update().clone().unwrap();
    assert_eq!(view.reserves, (2_000_000, 1_000_000));
    assert_eq!(view.providers, 1);

    drop(poller.updates);
    poller.handle.await.unwrap();
}

#[tokio::test]
async fn snapshot_source_sees_other_writers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devnet.json");
    let config = ClientConfig::default();
    let alice = dev_identity("alice").unwrap().address();

    let writer = Orchestrator::new(config.clone(), Devnet::open(&config, &path).unwrap());
    writer.mint(&alice, Side::A, 1_000).unwrap();
    writer.mint(&alice, Side::B, 1_000).unwrap();
    writer.enable_pool(&alice).unwrap();
    writer.add_liquidity(&alice, 400, 900).unwrap();
    writer.persist().unwrap();

    let source = SnapshotSource::new(config, path);
    let view = cswap_client::StateSource::fetch(&source).unwrap();
    assert_eq!(view.reserves, (400, 900));
    assert_eq!(view.total_liquidity, 600);
}

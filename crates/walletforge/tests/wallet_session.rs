//! Integration tests for the `WalletSession` facade: mount, operations and
//! display helpers against a scripted wallet.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;
use walletforge::prelude::*;
use walletforge_provider::fake::{FakeProvider, Method};

const ALICE: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";
const WAIT: Duration = Duration::from_secs(2);

type Wallet = WalletSession<FakeProvider, mpsc::UnboundedSender<Notice>>;

fn wallet(fake: FakeProvider) -> (Wallet, mpsc::UnboundedReceiver<Notice>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let wallet = WalletSessionBuilder::new().notifier(tx).build(Some(fake));
    (wallet, rx)
}

fn fake_provider(wallet: &Wallet) -> &FakeProvider {
    wallet
        .controller()
        .provider()
        .expect("wallet built with a provider")
}

async fn wait_for(wallet: &Wallet, mut pred: impl FnMut(&Session) -> bool) -> Session {
    let mut rx = wallet.subscribe();
    let snapshot = timeout(WAIT, rx.wait_for(|s| pred(s)))
        .await
        .expect("timed out")
        .expect("store dropped")
        .clone();
    snapshot
}

// =========================================================================
// Mount / unmount
// =========================================================================

#[tokio::test]
async fn test_mount_probes_standing_grant() {
    let fake = FakeProvider::new(ChainId(137));
    fake.authorize([ALICE]);
    fake.set_balance(ChainId(137), ALICE, "12345678900000000000");
    let (wallet, mut notices) = wallet(fake);

    let account = wallet.mount().await.unwrap();

    assert_eq!(account, Some(Address::new(ALICE)));
    assert_eq!(wallet.balance(), "12.3457");
    assert_eq!(wallet.native_symbol(), Some("MATIC"));
    assert_eq!(wallet.network_name(), Some("Polygon"));
    assert_eq!(
        wallet.explorer_url().as_deref(),
        Some("https://polygonscan.com/address/0x71C7656EC7ab88b098defB751B7401B5f6d8976F")
    );
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Success);
}

#[tokio::test]
async fn test_mount_without_grant_stays_disconnected() {
    let (wallet, mut notices) = wallet(FakeProvider::new(ChainId(1)));

    assert_eq!(wallet.mount().await.unwrap(), None);
    assert_eq!(wallet.phase(), Phase::Disconnected);
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn test_mount_twice_subscribes_once() {
    let (wallet, _notices) = wallet(FakeProvider::new(ChainId(1)));

    wallet.mount().await.unwrap();
    wallet.mount().await.unwrap();

    assert!(wallet.is_mounted());
    assert_eq!(fake_provider(&wallet).subscriber_count(), 1);
}

#[tokio::test]
async fn test_mount_again_with_unchanged_grant_is_silent() {
    let fake = FakeProvider::new(ChainId(1));
    fake.authorize([ALICE]);
    let (wallet, mut notices) = wallet(fake);
    wallet.mount().await.unwrap();
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Success);
    let mut snapshots = wallet.subscribe();
    snapshots.borrow_and_update();

    assert_eq!(wallet.mount().await.unwrap(), Some(Address::new(ALICE)));

    assert!(notices.try_recv().is_err());
    assert!(!snapshots.has_changed().unwrap());
    assert_eq!(fake_provider(&wallet).calls_to(Method::Balance), 1);
}

#[tokio::test]
async fn test_mount_without_probe_skips_authorized_accounts() {
    let fake = FakeProvider::new(ChainId(1));
    fake.authorize([ALICE]);
    let wallet = WalletSessionBuilder::new()
        .probe_on_mount(false)
        .build(Some(fake));

    assert_eq!(wallet.mount().await.unwrap(), None);
    assert_eq!(
        wallet
            .controller()
            .provider()
            .map(|p| p.calls_to(Method::AuthorizedAccounts)),
        Some(0)
    );
}

#[tokio::test]
async fn test_unmount_unsubscribes_and_disconnects() {
    let (wallet, _notices) = wallet(FakeProvider::new(ChainId(1)).with_accounts([ALICE]));
    wallet.mount().await.unwrap();
    wallet.connect().await.unwrap();

    wallet.unmount();

    assert!(!wallet.is_mounted());
    assert_eq!(wallet.phase(), Phase::Disconnected);
    assert!(wallet.handles().is_none());
    let unsubscribed = timeout(WAIT, async {
        while fake_provider(&wallet).subscriber_count() != 0 {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(unsubscribed.is_ok());
}

// =========================================================================
// Operations
// =========================================================================

#[tokio::test]
async fn test_full_dashboard_flow() {
    let fake = FakeProvider::new(ChainId(1)).with_accounts([ALICE]);
    fake.set_balance(ChainId(1), ALICE, "2500000000000000000");
    fake.set_balance(ChainId(137), ALICE, "40000000000000000000");
    let (wallet, mut notices) = wallet(fake);
    wallet.mount().await.unwrap();

    wallet.connect().await.unwrap();
    assert_eq!(wallet.balance(), "2.5000");
    assert_eq!(wallet.native_symbol(), Some("ETH"));

    // The wallet doesn't know Polygon yet: offered once, then switched.
    wallet.switch_network(ChainId(137)).await.unwrap();
    wallet.switch_network(ChainId(137)).await.unwrap();
    let on_polygon = wait_for(&wallet, |s| {
        s.chain_id() == Some(ChainId(137)) && !s.balance_is_stale()
    })
    .await;
    assert_eq!(on_polygon.balance(), "40.0000");
    assert_eq!(fake_provider(&wallet).calls_to(Method::AddChain), 1);

    assert!(wallet.disconnect());
    assert!(!wallet.disconnect());
    assert_eq!(wallet.snapshot(), Session::disconnected());

    let mut messages = Vec::new();
    while let Ok(n) = notices.try_recv() {
        messages.push(n.message);
    }
    assert_eq!(
        messages,
        vec![
            "Wallet connected successfully!".to_string(),
            "Polygon added to your wallet".to_string(),
            "Wallet disconnected".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_no_wallet_reports_unavailable() {
    let (tx, mut notices) = mpsc::unbounded_channel();
    let wallet: Wallet = WalletSessionBuilder::new().notifier(tx).build(None);

    assert_eq!(wallet.mount().await, Ok(None));
    assert!(!wallet.is_mounted());
    assert_eq!(wallet.connect().await, Err(WalletError::ProviderUnavailable));
    assert_eq!(
        wallet.switch_network(ChainId(137)).await,
        Err(WalletError::ProviderUnavailable)
    );
    assert_eq!(wallet.refresh_balance().await, BalanceOutcome::Skipped);

    let first = notices.try_recv().unwrap();
    assert_eq!(first.message, "Please install MetaMask or another Web3 wallet");
}

#[tokio::test]
async fn test_config_from_json_drives_session() {
    let config: SessionConfig = serde_json::from_str(
        r#"{ "balance_fraction_digits": 2, "chain_change": "reload" }"#,
    )
    .unwrap();
    let fake = FakeProvider::new(ChainId(1)).with_accounts([ALICE]);
    fake.set_balance(ChainId(1), ALICE, "1005000000000000000");
    let wallet = WalletSessionBuilder::new().config(config).build(Some(fake));

    wallet.connect().await.unwrap();

    assert_eq!(wallet.balance(), "1.01");
    assert_eq!(wallet.config().chain_change, ChainChangePolicy::Reload);
}

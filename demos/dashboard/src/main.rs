//! A scripted dashboard session against a fake wallet.
//!
//! Run with `RUST_LOG=walletforge=debug` to watch the session layer work.

use std::time::Duration;

use tokio::sync::mpsc;
use walletforge::prelude::*;

type Wallet = WalletSession<FakeProvider, mpsc::UnboundedSender<Notice>>;

const ALICE: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";
const BOB: &str = "0x2546BcD3c84621e976D8185a91A922aE77ECEc30";

#[tokio::main]
async fn main() -> Result<(), WalletforgeError> {
    walletforge::logging::init("walletforge=info,walletforge_session=info,dashboard=info")?;

    let polygon = ChainId::parse("0x89")?;
    let fake = FakeProvider::new(ChainId(1)).with_accounts([ALICE]);
    fake.set_balance(ChainId(1), ALICE, "2500000000000000000");
    fake.set_balance(polygon, ALICE, "118000000000000000000");
    fake.set_balance(polygon, BOB, "7250000000000000");

    // Toasts.
    let (tx, mut rx) = mpsc::unbounded_channel::<Notice>();
    let toasts = tokio::spawn(async move {
        while let Some(notice) = rx.recv().await {
            println!("  [{}] {}", notice.title, notice.message);
        }
    });

    let wallet: Wallet = WalletSessionBuilder::new().notifier(tx).build(Some(fake));

    wallet.mount().await?;
    render("mounted", &wallet);

    wallet.connect().await?;
    render("connected", &wallet);

    // The wallet doesn't know Polygon yet; the first switch offers it.
    wallet.switch_network(polygon).await?;
    wallet.switch_network(polygon).await?;
    settle(&wallet, |s| s.chain_id() == Some(polygon) && !s.balance_is_stale()).await;
    render("switched to polygon", &wallet);

    // The user picks another account in the wallet itself.
    if let Some(fake) = wallet.controller().provider() {
        fake.emit(ProviderEvent::AccountsChanged(vec![BOB.into()]));
    }
    settle(&wallet, |s| {
        s.account().map(Address::as_str) == Some(BOB) && !s.balance_is_stale()
    })
    .await;
    render("account changed", &wallet);

    wallet.disconnect();
    render("disconnected", &wallet);

    wallet.unmount();
    drop(wallet);
    if tokio::time::timeout(Duration::from_secs(1), toasts).await.is_err() {
        tracing::warn!("notice printer did not stop");
    }
    Ok(())
}

/// Waits until the session satisfies `pred`, or gives up after a while.
async fn settle(wallet: &Wallet, pred: impl FnMut(&Session) -> bool) {
    let mut rx = wallet.subscribe();
    match tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred)).await {
        Ok(Ok(_)) => {}
        Ok(Err(_)) | Err(_) => tracing::warn!("session did not settle"),
    }
}

fn render(step: &str, wallet: &Wallet) {
    let snapshot = wallet.snapshot();
    println!("== {step}");
    println!("  phase:   {}", snapshot.phase());
    match (snapshot.account(), snapshot.chain_id()) {
        (Some(account), Some(chain_id)) => {
            println!("  account: {}", account.short());
            println!(
                "  network: {} ({chain_id})",
                wallet.network_name().unwrap_or("Unknown")
            );
            println!(
                "  balance: {} {}",
                snapshot.balance(),
                wallet.native_symbol().unwrap_or("ETH")
            );
            if let Some(url) = wallet.explorer_url() {
                println!("  explorer: {url}");
            }
        }
        _ => println!("  no wallet connected"),
    }
}

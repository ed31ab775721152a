//! End-to-end wallet tests.
//!
//! Each test funds a regtest wallet on a [`MockNode`], drives the public
//! wallet API and checks both the response and what the node accepted. The
//! node verifies every signature, so a passing send also proves the
//! transaction was signed correctly.

use cashkit_core::address::{Address, AddressKind, Network};
use cashkit_core::amount::{Amount, Unit};
use cashkit_core::crypto::OsRandom;
use cashkit_core::error::SourceError;
use cashkit_core::types::Transaction;
use cashkit_wallet::{
    RawSendRequest, SendMaxRequest, SendRequest, Wallet, WalletConfig, WalletError,
};
use cashkit_tests::helpers::*;

fn pay(to: &Address, sats: u64) -> SendRequest {
    SendRequest::new(to.clone(), Amount::from_sat(sats)).unwrap()
}

fn output_values(tx: &Transaction) -> Vec<u64> {
    tx.outputs.iter().map(|o| o.value).collect()
}

// ------------------------------------------------------------------
// Sending
// ------------------------------------------------------------------

#[tokio::test]
async fn send_spends_largest_utxo_and_returns_change() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 1, &[5000, 3000, 1000]);
    let dest = regtest_address(0xaa);

    let resp = wallet.send(vec![pay(&dest, 4000)]).await.unwrap();

    let tx = node.last_transaction().unwrap();
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(output_values(&tx), vec![4000, 774]);
    assert_eq!(tx.outputs[0].script_pubkey, dest.locking_script());
    assert_eq!(
        tx.outputs[1].script_pubkey,
        wallet.address().unwrap().locking_script()
    );
    assert_eq!(resp.transaction_id.len(), 64);
    assert_eq!(resp.balance.sat, 3000 + 1000 + 774);
    assert_eq!(node.balance_of(&dest), 4000);
}

#[tokio::test]
async fn send_absorbs_dust_remainder_into_fee() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 2, &[500]);
    let dest = regtest_address(0xab);

    let resp = wallet.send(vec![pay(&dest, 300)]).await.unwrap();

    let tx = node.last_transaction().unwrap();
    // 500 - 300 - 192 leaves 8, too small for change
    assert_eq!(output_values(&tx), vec![300]);
    assert_eq!(resp.balance.sat, 0);
    assert_eq!(node.balance_of(&dest), 300);
}

#[tokio::test]
async fn send_to_several_recipients_keeps_request_order() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 3, &[10_000]);
    let a = regtest_address(0x01);
    let b = regtest_address(0x02);

    wallet
        .send(vec![pay(&a, 1000), pay(&b, 2000)])
        .await
        .unwrap();

    let tx = node.last_transaction().unwrap();
    // fee for 1 input and 3 outputs is 260
    assert_eq!(output_values(&tx), vec![1000, 2000, 6740]);
    assert_eq!(tx.outputs[0].script_pubkey, a.locking_script());
    assert_eq!(tx.outputs[1].script_pubkey, b.locking_script());
}

#[tokio::test]
async fn change_from_a_previous_send_is_spendable() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 4, &[5000, 3000, 1000]);
    let dest = regtest_address(0xac);

    wallet.send(vec![pay(&dest, 4000)]).await.unwrap();
    let resp = wallet.send(vec![pay(&dest, 3500)]).await.unwrap();

    let tx = node.last_transaction().unwrap();
    assert_eq!(tx.inputs.len(), 3);
    assert_eq!(output_values(&tx), vec![3500, 752]);
    assert_eq!(resp.balance.sat, 752);
    assert_eq!(node.balance_of(&dest), 7500);
    assert_eq!(node.accepted().len(), 2);
}

#[tokio::test]
async fn wide_batch_pays_for_its_wider_output_count() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 19, &[2_000_000]);
    let requests: Vec<SendRequest> = (0..260u32)
        .map(|i| pay(&regtest_address((i % 200) as u8 + 1), 1000))
        .collect();

    // the node refuses anything under one satoshi per byte
    wallet.send(requests).await.unwrap();

    let tx = node.last_transaction().unwrap();
    assert_eq!(tx.outputs.len(), 261);
    let raw = node.accepted().pop().unwrap();
    let fee = 2_000_000 - tx.total_output_value().unwrap();
    assert!(fee >= raw.len() as u64);
}

#[tokio::test]
async fn send_raw_parses_units_at_the_boundary() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 5, &[5000]);
    let dest = regtest_address(0xad);

    let raw = [RawSendRequest::new(dest.encode(), "40", Unit::Bit)];
    wallet.send_raw(&raw).await.unwrap();
    assert_eq!(node.balance_of(&dest), 4000);

    let json = format!(
        r#"[{{"cashaddr": "{dest}", "amount": {{"value": "0.00000100", "unit": "bch"}}}}]"#
    );
    let raw: Vec<RawSendRequest> = serde_json::from_str(&json).unwrap();
    wallet.send_raw(&raw).await.unwrap();
    assert_eq!(node.balance_of(&dest), 4100);
}

#[tokio::test]
async fn send_raw_reports_the_offending_entry() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 6, &[5000]);
    let dest = regtest_address(0xae);

    let raw = [
        RawSendRequest::new(dest.encode(), "100", Unit::Sat),
        RawSendRequest::new(dest.encode(), "1.5", Unit::Sat),
    ];
    let err = wallet.send_raw(&raw).await.unwrap_err();
    assert!(matches!(err, WalletError::InvalidRequest { index: 1, .. }));
    assert!(node.accepted().is_empty());
}

// ------------------------------------------------------------------
// Sweeping
// ------------------------------------------------------------------

#[tokio::test]
async fn send_max_sweeps_everything() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 7, &[5000, 3000]);
    let dest = regtest_address(0xb0);

    assert_eq!(wallet.max_amount_to_send(1).await.unwrap().as_sat(), 7660);

    let resp = wallet
        .send_max(SendMaxRequest::new(dest.clone()))
        .await
        .unwrap();

    let tx = node.last_transaction().unwrap();
    assert_eq!(tx.inputs.len(), 2);
    assert_eq!(output_values(&tx), vec![7660]);
    assert_eq!(resp.balance.sat, 0);
    assert_eq!(node.balance_of(&dest), 7660);
    assert_eq!(wallet.max_amount_to_send(1).await.unwrap(), Amount::ZERO);
}

#[tokio::test]
async fn send_max_below_fee_is_nothing_to_send() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 8, &[100]);

    let err = wallet
        .send_max(SendMaxRequest::new(regtest_address(0xb1)))
        .await
        .unwrap_err();
    assert_eq!(err, WalletError::NothingToSend);
}

#[tokio::test]
async fn max_amount_of_empty_wallet_is_zero() {
    let node = MockNode::new(200);
    let wallet = regtest_wallet(&node, 9);
    assert_eq!(wallet.max_amount_to_send(1).await.unwrap(), Amount::ZERO);
    assert_eq!(wallet.max_amount_to_send(3).await.unwrap(), Amount::ZERO);
}

// ------------------------------------------------------------------
// Failures
// ------------------------------------------------------------------

#[tokio::test]
async fn empty_wallet_has_no_utxos() {
    let node = MockNode::new(200);
    let wallet = regtest_wallet(&node, 10);
    let err = wallet
        .send(vec![pay(&regtest_address(0xc0), 1000)])
        .await
        .unwrap_err();
    assert_eq!(err, WalletError::NoUtxos);
}

#[tokio::test]
async fn overspend_is_insufficient_funds() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 11, &[1000]);
    let err = wallet
        .send(vec![pay(&regtest_address(0xc1), 5000)])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WalletError::InsufficientFunds {
            have: 1000,
            need: 5192
        }
    );
    assert!(node.accepted().is_empty());
}

#[tokio::test]
async fn foreign_network_destination_is_refused() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 12, &[5000]);
    let mainnet = Address::new(Network::Mainnet, AddressKind::P2pkh, [0x33; 20]);

    let err = wallet.send(vec![pay(&mainnet, 1000)]).await.unwrap_err();
    assert_eq!(
        err,
        WalletError::NetworkMismatch {
            expected: Network::Regtest,
            found: Network::Mainnet
        }
    );
    let err = wallet
        .send_max(SendMaxRequest::new(mainnet))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NetworkMismatch { .. }));
}

#[tokio::test]
async fn rejected_submission_leaves_funds_untouched() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 13, &[5000]);
    let dest = regtest_address(0xc2);

    node.reject_next("txn-mempool-conflict");
    let err = wallet.send(vec![pay(&dest, 1000)]).await.unwrap_err();
    assert_eq!(
        err,
        WalletError::SubmissionRejected("txn-mempool-conflict".into())
    );
    assert_eq!(wallet.balance().await.unwrap().sat, 5000);

    // nothing is retried internally; a second call goes through
    wallet.send(vec![pay(&dest, 1000)]).await.unwrap();
    assert_eq!(node.balance_of(&dest), 1000);
}

#[tokio::test]
async fn unreachable_source_surfaces_as_source_error() {
    let node = MockNode::new(200);
    let wallet = funded_wallet(&node, 14, &[5000]);
    node.set_offline(true);

    let err = wallet.balance().await.unwrap_err();
    assert!(matches!(
        err,
        WalletError::Source(SourceError::Unavailable(_))
    ));
}

// ------------------------------------------------------------------
// Eligibility
// ------------------------------------------------------------------

#[tokio::test]
async fn immature_coinbase_is_not_spendable() {
    let node = MockNode::new(10);
    let wallet = regtest_wallet(&node, 15);
    let address = wallet.address().unwrap().clone();
    node.fund_coinbase(&address, 50_000);
    node.fund(&address, 1000);

    assert_eq!(wallet.balance().await.unwrap().sat, 1000);
    assert_eq!(wallet.utxos().await.unwrap().utxos.len(), 2);
    let err = wallet
        .send(vec![pay(&regtest_address(0xd0), 20_000)])
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { have: 1000, .. }));

    node.mine(99);
    assert_eq!(wallet.balance().await.unwrap().sat, 1000);
    node.mine(1);
    assert_eq!(wallet.balance().await.unwrap().sat, 51_000);
    wallet
        .send(vec![pay(&regtest_address(0xd0), 20_000)])
        .await
        .unwrap();
}

#[tokio::test]
async fn unconfirmed_outputs_count_toward_balance() {
    let node = MockNode::new(200);
    let wallet = regtest_wallet(&node, 16);
    node.fund_unconfirmed(wallet.address().unwrap(), 2500);

    let balance = wallet.balance().await.unwrap();
    assert_eq!(balance.sat, 2500);
    assert_eq!(balance.bit, "25");
    assert_eq!(balance.bch, "0.000025");
}

#[tokio::test]
async fn custom_maturity_from_config() {
    let node = MockNode::new(10);
    let config = WalletConfig {
        coinbase_maturity: 5,
        ..WalletConfig::default()
    };
    let svc = services(&node).with_config(config).unwrap();
    let wallet = Wallet::with_key(regtest_key(17), svc);
    node.fund_coinbase(wallet.address().unwrap(), 7000);

    assert_eq!(wallet.balance().await.unwrap().sat, 0);
    node.mine(5);
    assert_eq!(wallet.balance().await.unwrap().sat, 7000);
}

// ------------------------------------------------------------------
// Wallet identity
// ------------------------------------------------------------------

#[tokio::test]
async fn watch_only_sees_balance_but_cannot_sign() {
    let node = MockNode::new(200);
    let funded = funded_wallet(&node, 18, &[4200]);
    let address = funded.deposit_address().unwrap();

    let watcher = Wallet::watch_only(Network::Regtest, &address, services(&node)).unwrap();
    assert!(watcher.is_watch_only());
    assert_eq!(watcher.balance().await.unwrap().sat, 4200);

    let err = watcher
        .send(vec![pay(&regtest_address(0xe0), 1000)])
        .await
        .unwrap_err();
    assert_eq!(err, WalletError::NoKeyMaterial);
    let err = watcher
        .send_max(SendMaxRequest::new(regtest_address(0xe0)))
        .await
        .unwrap_err();
    assert_eq!(err, WalletError::NoKeyMaterial);
    assert_eq!(
        watcher.to_id_string().unwrap(),
        format!("watchonly:regtest:{address}")
    );
}

#[tokio::test]
async fn id_string_restores_the_same_wallet() {
    let node = MockNode::new(200);
    let original = Wallet::generate(Network::Regtest, services(&node), &OsRandom).unwrap();
    let id = original.to_id_string().unwrap();
    assert!(id.starts_with("wif:regtest:c"));

    let restored = Wallet::from_id_string(&id, services(&node)).unwrap();
    assert_eq!(restored.address(), original.address());
    assert_eq!(restored.network(), Network::Regtest);

    node.fund(original.address().unwrap(), 3000);
    restored
        .send(vec![pay(&regtest_address(0xe1), 1000)])
        .await
        .unwrap();
    assert_eq!(original.balance().await.unwrap().sat, 3000 - 1000 - 226);
}

#[tokio::test]
async fn wif_import_checks_network() {
    let node = MockNode::new(200);
    let mainnet_wif = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";

    let err = Wallet::from_wif(Network::Regtest, mainnet_wif, services(&node)).unwrap_err();
    assert!(matches!(err, WalletError::NetworkMismatch { .. }));

    let wallet = Wallet::from_wif(Network::Mainnet, mainnet_wif, services(&node)).unwrap();
    let mut hash = [0u8; 20];
    hex::decode_to_slice("751e76e8199196d454941c45d1b3a323f1433bd6", &mut hash).unwrap();
    assert_eq!(
        wallet.address(),
        Some(&Address::new(Network::Mainnet, AddressKind::P2pkh, hash))
    );
    assert!(wallet.deposit_address().unwrap().starts_with("bitcoincash:q"));
}

#[tokio::test]
async fn unbound_wallet_has_no_key_material() {
    let node = MockNode::new(200);
    let wallet = Wallet::regtest(services(&node));
    assert_eq!(wallet.balance().await.unwrap_err(), WalletError::NoKeyMaterial);
    assert_eq!(wallet.to_id_string().unwrap_err(), WalletError::NoKeyMaterial);
    assert_eq!(wallet.deposit_address().unwrap_err(), WalletError::NoKeyMaterial);
}

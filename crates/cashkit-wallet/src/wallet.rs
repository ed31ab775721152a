//! High-level wallet composition.
//!
//! A [`Wallet`] binds one key (or, watch-only, one address) on one network
//! to the collaborators it needs: a UTXO source, a transaction submitter and
//! a crypto provider. Every operation is an independent pipeline of
//! fetch → select → build → submit; the wallet keeps no state between calls
//! besides its key material, so concurrent sends are not serialized here.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use cashkit_core::address::{Address, Network};
use cashkit_core::amount::Amount;
use cashkit_core::crypto::{CryptoProvider, SecureRandomSource};
use cashkit_core::traits::{TransactionSubmitter, UtxoSource};
use cashkit_core::types::{Hash256, Utxo};

use crate::builder::{SignedTransaction, TransactionBuilder};
use crate::coin_selection::{CoinSelector, FundingSet};
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::fee::FeeEstimator;
use crate::keys::WalletKeyMaterial;
use crate::request::{check_network, validate_batch, RawSendRequest, SendMaxRequest, SendRequest};
use crate::response::{BalanceResponse, SendResponse, UtxoResponse, UtxoView};

/// Collaborators and settings shared by wallets.
#[derive(Clone)]
pub struct WalletServices {
    pub utxo_source: Arc<dyn UtxoSource>,
    pub submitter: Arc<dyn TransactionSubmitter>,
    pub crypto: Arc<dyn CryptoProvider>,
    pub config: WalletConfig,
}

impl WalletServices {
    pub fn new(
        utxo_source: Arc<dyn UtxoSource>,
        submitter: Arc<dyn TransactionSubmitter>,
        crypto: Arc<dyn CryptoProvider>,
    ) -> Self {
        Self {
            utxo_source,
            submitter,
            crypto,
            config: WalletConfig::default(),
        }
    }

    /// Replace the configuration after validating it.
    pub fn with_config(mut self, config: WalletConfig) -> Result<Self, WalletError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }
}

/// Single-key wallet on one network.
pub struct Wallet {
    network: Network,
    key: Option<WalletKeyMaterial>,
    watch_address: Option<Address>,
    services: WalletServices,
}

impl Wallet {
    /// A wallet with no key bound yet.
    pub fn new(network: Network, services: WalletServices) -> Self {
        Self {
            network,
            key: None,
            watch_address: None,
            services,
        }
    }

    pub fn mainnet(services: WalletServices) -> Self {
        Self::new(Network::Mainnet, services)
    }

    pub fn testnet(services: WalletServices) -> Self {
        Self::new(Network::Testnet, services)
    }

    pub fn regtest(services: WalletServices) -> Self {
        Self::new(Network::Regtest, services)
    }

    /// Load a compressed-key WIF. The WIF must belong to `network`.
    pub fn from_wif(
        network: Network,
        wif: &str,
        services: WalletServices,
    ) -> Result<Self, WalletError> {
        let key = WalletKeyMaterial::from_wif(wif, network, services.crypto.as_ref())?;
        Ok(Self::with_key(key, services))
    }

    /// Create a wallet around a freshly drawn key.
    pub fn generate(
        network: Network,
        services: WalletServices,
        rng: &dyn SecureRandomSource,
    ) -> Result<Self, WalletError> {
        let key = WalletKeyMaterial::generate(network, services.crypto.as_ref(), rng)?;
        info!(%network, address = %key.address(), "generated new wallet key");
        Ok(Self::with_key(key, services))
    }

    /// Watch `address` without any signing capability.
    pub fn watch_only(
        network: Network,
        address: &str,
        services: WalletServices,
    ) -> Result<Self, WalletError> {
        let address: Address = address.parse()?;
        check_network(&address, network)?;
        Ok(Self {
            network,
            key: None,
            watch_address: Some(address),
            services,
        })
    }

    pub fn with_key(key: WalletKeyMaterial, services: WalletServices) -> Self {
        Self {
            network: key.network(),
            key: Some(key),
            watch_address: None,
            services,
        }
    }

    /// Restore a wallet from [`to_id_string`](Self::to_id_string) output.
    pub fn from_id_string(id: &str, services: WalletServices) -> Result<Self, WalletError> {
        let mut parts = id.splitn(3, ':');
        let (Some(kind), Some(network), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(WalletError::InvalidWalletId(
                "expected <kind>:<network>:<value>".into(),
            ));
        };
        let network: Network = network
            .parse()
            .map_err(|_| WalletError::InvalidWalletId(format!("unknown network {network}")))?;
        match kind {
            "wif" => Self::from_wif(network, value, services),
            "watchonly" => Self::watch_only(network, value, services),
            other => Err(WalletError::InvalidWalletId(format!("unknown kind {other}"))),
        }
    }

    /// `wif:<network>:<wif>` or `watchonly:<network>:<address>`.
    ///
    /// The `wif` form contains the private key.
    pub fn to_id_string(&self) -> Result<String, WalletError> {
        if let Some(key) = &self.key {
            return Ok(format!("wif:{}:{}", self.network, key.to_wif()));
        }
        if let Some(address) = &self.watch_address {
            return Ok(format!("watchonly:{}:{}", self.network, address));
        }
        Err(WalletError::NoKeyMaterial)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_watch_only(&self) -> bool {
        self.key.is_none() && self.watch_address.is_some()
    }

    /// The address this wallet receives on, if one is bound.
    pub fn address(&self) -> Option<&Address> {
        self.key
            .as_ref()
            .map(|k| k.address())
            .or(self.watch_address.as_ref())
    }

    pub fn deposit_address(&self) -> Result<String, WalletError> {
        Ok(self.bound_address()?.encode())
    }

    pub fn config(&self) -> &WalletConfig {
        &self.services.config
    }

    /// Sum of eligible UTXOs.
    pub async fn balance(&self) -> Result<BalanceResponse, WalletError> {
        let address = self.bound_address()?;
        let (utxos, height) = self.fetch(address).await?;
        let eligible = self.selector().eligible(&utxos, height);
        let total = Amount::sum(eligible.iter().map(|u| u.amount))?;
        Ok(total.into())
    }

    /// Every unspent output the source reports, mature or not.
    pub async fn utxos(&self) -> Result<UtxoResponse, WalletError> {
        let address = self.bound_address()?;
        let utxos = self.services.utxo_source.get_utxos(address).await?;
        Ok(UtxoResponse {
            utxos: utxos.iter().map(UtxoView::from).collect(),
        })
    }

    /// Largest amount a send to `output_count` recipients could carry: all
    /// eligible value minus the change-free fee. Zero for an empty wallet.
    pub async fn max_amount_to_send(&self, output_count: usize) -> Result<Amount, WalletError> {
        let key = self.signing_key()?;
        let (utxos, height) = self.fetch(key.address()).await?;
        let eligible = self.selector().eligible(&utxos, height);
        self.max_from(&eligible, output_count)
    }

    /// Pay every request, returning change to this wallet.
    pub async fn send(&self, requests: Vec<SendRequest>) -> Result<SendResponse, WalletError> {
        let key = self.signing_key()?;
        if requests.is_empty() {
            return Err(WalletError::BuildError("no recipients".into()));
        }
        for r in &requests {
            r.check_network(self.network)?;
        }

        let (utxos, height) = self.fetch(key.address()).await?;
        let (funding, fee) = self
            .selector()
            .fund(&utxos, &requests, &self.estimator(), height)?;
        let signed = self.builder().build(&funding, &requests, key, fee, false)?;

        let txid = self.submit(&signed).await?;
        let balance = self.balance().await?;
        Ok(SendResponse {
            transaction_id: txid.to_hex(),
            balance,
        })
    }

    /// Validate untyped requests at the boundary, then [`send`](Self::send).
    pub async fn send_raw(&self, raw: &[RawSendRequest]) -> Result<SendResponse, WalletError> {
        let requests = validate_batch(raw, self.network)?;
        self.send(requests).await
    }

    /// Sweep every eligible UTXO to one destination with no change.
    pub async fn send_max(&self, request: SendMaxRequest) -> Result<SendResponse, WalletError> {
        let key = self.signing_key()?;
        check_network(&request.destination, self.network)?;

        let (utxos, height) = self.fetch(key.address()).await?;
        let eligible = self.selector().eligible(&utxos, height);
        let max = self.max_from(&eligible, 1)?;
        if max.is_zero() {
            return Err(WalletError::NothingToSend);
        }

        let fee = self.estimator().fee_for(eligible.len(), 1);
        let funding = FundingSet::new(eligible)?;
        let requests = [SendRequest::new(request.destination, max)?];
        let signed = self.builder().build(&funding, &requests, key, fee, true)?;

        let txid = self.submit(&signed).await?;
        let balance = self.balance().await?;
        Ok(SendResponse {
            transaction_id: txid.to_hex(),
            balance,
        })
    }

    fn max_from(&self, eligible: &[Utxo], output_count: usize) -> Result<Amount, WalletError> {
        if eligible.is_empty() {
            return Ok(Amount::ZERO);
        }
        let total = Amount::sum(eligible.iter().map(|u| u.amount))?;
        let fee = self.estimator().fee_for(eligible.len(), output_count);
        let max = total.saturating_sub(fee);
        debug!(
            inputs = eligible.len(),
            total = total.as_sat(),
            fee = fee.as_sat(),
            max = max.as_sat(),
            "max amount to send"
        );
        Ok(max)
    }

    async fn fetch(&self, address: &Address) -> Result<(Vec<Utxo>, u32), WalletError> {
        let utxos = self.services.utxo_source.get_utxos(address).await?;
        let height = self.services.utxo_source.best_height().await?;
        debug!(count = utxos.len(), height, "fetched utxos");
        Ok((utxos, height))
    }

    async fn submit(&self, signed: &SignedTransaction) -> Result<Hash256, WalletError> {
        match self.services.submitter.submit(&signed.bytes).await {
            Ok(txid) => {
                if txid != signed.txid {
                    warn!(
                        local = %signed.txid,
                        remote = %txid,
                        "submitter reported a different txid"
                    );
                }
                info!(
                    network = %self.network,
                    %txid,
                    fee = signed.fee.as_sat(),
                    size = signed.size(),
                    "transaction submitted"
                );
                Ok(txid)
            }
            Err(e) => {
                warn!(txid = %signed.txid, error = %e, "transaction submission failed");
                Err(e.into())
            }
        }
    }

    fn bound_address(&self) -> Result<&Address, WalletError> {
        self.address().ok_or(WalletError::NoKeyMaterial)
    }

    fn signing_key(&self) -> Result<&WalletKeyMaterial, WalletError> {
        self.key.as_ref().ok_or(WalletError::NoKeyMaterial)
    }

    fn selector(&self) -> CoinSelector {
        CoinSelector::new(self.services.config.coinbase_maturity)
    }

    fn estimator(&self) -> FeeEstimator {
        FeeEstimator::from_config(&self.services.config)
    }

    fn builder(&self) -> TransactionBuilder<'_> {
        TransactionBuilder::new(self.services.crypto.as_ref())
            .dust_threshold(self.services.config.dust())
            .fee_per_byte(self.services.config.fee_per_byte)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("network", &self.network)
            .field("address", &self.address().map(|a| a.encode()))
            .field("watch_only", &self.is_watch_only())
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

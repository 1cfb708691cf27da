use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use cert_authz_identity::{Certificate, Identity};
use cert_authz_keystore::{CryptoKeystoreError, EncryptedStore};
use futures_util::{
    FutureExt as _,
    future::{AbortHandle, abortable},
};
use log::{info, warn};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::{
    Error, KeystoreError, Result,
    challenge::{ChallengeDetector, Headers, ResponseMetadata},
    config::AuthorizationConfig,
    credential::Credential,
    obfuscate::Obfuscated,
    transport::{EnrollmentParams, EnrollmentRequest, EnrollmentTransport},
};

/// Where the single credential slot of a manager stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    NoCredential,
    /// An enrollment exchange is in flight
    Obtaining,
    Cached,
}

#[derive(Debug, Default)]
struct Slot {
    credential: Option<Credential>,
    /// Ticket of the exchange in flight, if any
    in_flight: Option<u64>,
    /// Bumped whenever an exchange starts or the slot is cleared. An exchange whose ticket no
    /// longer matches has been superseded and must not write the slot.
    generation: u64,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether a load failed on the entry itself rather than on reaching the store
fn is_undecryptable(error: &CryptoKeystoreError) -> bool {
    matches!(
        error,
        CryptoKeystoreError::AesGcmError
            | CryptoKeystoreError::InvalidPadding
            | CryptoKeystoreError::InvalidCiphertextLength(_)
            | CryptoKeystoreError::InvalidKeySize { .. }
            | CryptoKeystoreError::Base64Error(_)
            | CryptoKeystoreError::JsonError(_)
            | CryptoKeystoreError::PlaintextNotUtf8(_)
    )
}

/// Releases the in-flight marker however the exchange ends, including when its future is
/// dropped before completion
struct InFlight<'a> {
    slot: &'a Mutex<Slot>,
    ticket: u64,
}

impl InFlight<'_> {
    fn is_current(&self) -> bool {
        lock(self.slot).generation == self.ticket
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut slot = lock(self.slot);
        if slot.in_flight == Some(self.ticket) {
            slot.in_flight = None;
        }
    }
}

/// Obtains, caches and clears the authorization credential of one client
///
/// Holds a single credential slot. At most one enrollment exchange runs at a time: starting
/// another one while it is in flight fails with [Error::Busy]. Reads and [Self::clear_authorization_data]
/// are safe at any time and never observe a partially written credential.
pub struct AuthorizationManager {
    config: AuthorizationConfig,
    transport: Arc<dyn EnrollmentTransport>,
    detector: Arc<dyn ChallengeDetector>,
    persistence: Option<EncryptedStore>,
    slot: Mutex<Slot>,
}

impl std::fmt::Debug for AuthorizationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationManager")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .field("detector", &self.detector)
            .field("persistence", &self.persistence)
            .field("state", &self.state())
            .finish()
    }
}

impl AuthorizationManager {
    pub fn new(
        config: AuthorizationConfig,
        transport: Arc<dyn EnrollmentTransport>,
        detector: Arc<dyn ChallengeDetector>,
    ) -> Self {
        Self {
            config,
            transport,
            detector,
            persistence: None,
            slot: Default::default(),
        }
    }

    /// Persists obtained credentials, encrypted, so that [Self::restore] can bring them back
    pub fn with_persistence(mut self, store: EncryptedStore) -> Self {
        self.persistence = Some(store);
        self
    }

    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    pub fn state(&self) -> AuthorizationState {
        let slot = lock(&self.slot);
        if slot.in_flight.is_some_and(|ticket| ticket == slot.generation) {
            AuthorizationState::Obtaining
        } else if slot.credential.is_some() {
            AuthorizationState::Cached
        } else {
            AuthorizationState::NoCredential
        }
    }

    /// Whether a response with this status and these headers asks for authorization
    pub fn is_authorization_required(&self, status: u16, headers: &Headers) -> bool {
        self.detector.is_challenge(status, headers)
    }

    /// Whether a live response asks for authorization. Fails when its metadata cannot be read.
    pub fn is_authorization_required_on(&self, response: &dyn ResponseMetadata) -> Result<bool> {
        Ok(self.detector.is_challenge_on(response)?)
    }

    /// Header value to attach to requests, when a credential is cached
    pub fn get_cached_authorization_header(&self) -> Option<String> {
        lock(&self.slot)
            .credential
            .as_ref()
            .map(|credential| credential.header_value.clone())
    }

    /// Identity the cached credential was issued to
    pub fn identity(&self) -> Option<Identity> {
        lock(&self.slot)
            .credential
            .as_ref()
            .map(|credential| credential.identity.clone())
    }

    /// Runs the enrollment exchange and caches the resulting credential, returning its header value.
    ///
    /// Parameters are validated and the in-flight guard taken when this is called, not when the
    /// future is first polled: a second call while an exchange is in flight resolves to
    /// [Error::Busy]. Starting discards the cached credential, and its persisted copy once the future
    /// is polled, so on any failure none is cached.
    /// If [Self::clear_authorization_data] runs meanwhile, the outcome is discarded and the future
    /// resolves to [Error::Cancelled]. Dropping the future releases the guard.
    pub fn obtain_authorization(&self, params: EnrollmentParams) -> impl Future<Output = Result<String>> + '_ {
        let started = params.validate().and_then(|_| self.begin());
        async move {
            let in_flight = started?;
            self.run(in_flight, params).await
        }
    }

    /// [Self::obtain_authorization] along with a handle aborting it. An aborted exchange resolves
    /// to [Error::Cancelled].
    pub fn obtain_authorization_abortable(
        &self,
        params: EnrollmentParams,
    ) -> (impl Future<Output = Result<String>> + '_, AbortHandle) {
        let (future, handle) = abortable(self.obtain_authorization(params));
        (future.map(|outcome| outcome.unwrap_or(Err(Error::Cancelled))), handle)
    }

    /// Discards the cached credential, including its persisted copy. Idempotent.
    ///
    /// An exchange in flight keeps running but its outcome will be discarded.
    #[cfg_attr(not(test), tracing::instrument(err, skip_all))]
    pub async fn clear_authorization_data(&self) -> Result<()> {
        {
            let mut slot = lock(&self.slot);
            slot.generation += 1;
            slot.credential = None;
        }
        if let Some(store) = &self.persistence {
            store
                .remove(&self.config.storage_key)
                .await
                .map_err(KeystoreError::wrap("removing the persisted credential"))?;
        }
        info!("Cleared authorization data");
        Ok(())
    }

    /// Loads the persisted credential, if any, into the slot and returns its header value.
    ///
    /// An entry which cannot be decrypted, e.g. because the password changed, is removed. Failing to
    /// read the store leaves the entry in place.
    #[cfg_attr(not(test), tracing::instrument(err, skip_all))]
    pub async fn restore(&self) -> Result<Option<String>> {
        let Some(store) = &self.persistence else {
            return Ok(None);
        };
        let generation = {
            let slot = lock(&self.slot);
            if slot.in_flight.is_some() {
                return Err(Error::Busy);
            }
            slot.generation
        };

        let credential = match store.load_json::<Credential>(&self.config.storage_key).await {
            Ok(Some(credential)) => credential,
            Ok(None) => return Ok(None),
            Err(e) => {
                if is_undecryptable(&e) {
                    self.remove_persisted().await;
                }
                return Err(KeystoreError::wrap("restoring the persisted credential")(e).into());
            }
        };

        let mut slot = lock(&self.slot);
        if slot.generation != generation || slot.in_flight.is_some() {
            return Err(Error::Cancelled);
        }
        let header_value = credential.header_value.clone();
        info!(identity = Obfuscated::from(&credential.identity); "Restored persisted credential");
        slot.credential = Some(credential);
        Ok(Some(header_value))
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        let mut slot = lock(&self.slot);
        if slot.in_flight.is_some() {
            return Err(Error::Busy);
        }
        slot.generation += 1;
        slot.in_flight = Some(slot.generation);
        slot.credential = None;
        Ok(InFlight {
            slot: &self.slot,
            ticket: slot.generation,
        })
    }

    #[cfg_attr(not(test), tracing::instrument(err, skip_all))]
    async fn run(&self, in_flight: InFlight<'_>, params: EnrollmentParams) -> Result<String> {
        // the discarded credential must not come back through restore if this exchange never ends
        self.remove_persisted().await;

        let outcome = match self.exchange(&params).await {
            Ok(credential) => self.store(&in_flight, credential).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(header_value) => Ok(header_value),
            Err(e) => {
                warn!(error:% = e; "Failed to obtain authorization");
                // no other exchange can write the entry while this one holds the guard
                self.remove_persisted().await;
                Err(if in_flight.is_current() { e } else { Error::Cancelled })
            }
        }
    }

    async fn exchange(&self, params: &EnrollmentParams) -> Result<Credential> {
        let nonce = self.transport.fetch_nonce().await?;
        let request = EnrollmentRequest::new(nonce, params);
        let response = self.transport.enroll(&request).await?;

        let certificate = Certificate::decode(&response.certificate)?;
        let now = SystemTime::now();
        if !certificate.is_valid_against(&params.public_key, now) {
            return Err(Error::ValidationFailure(
                "certificate is not valid for the enrolled public key at this time",
            ));
        }

        let mut identity = Identity::from_certificate(&certificate, self.config.uid_selection);
        if identity.is_anonymous() {
            return Err(Error::ValidationFailure("certificate does not carry a client id"));
        }
        if params.client_id.as_ref().is_some_and(|expected| *expected != identity.id) {
            return Err(Error::ValidationFailure("certificate was issued to another client"));
        }
        if let Some(claimed) = response.identity.as_ref().filter(|claimed| !claimed.is_anonymous()) {
            if claimed.id != identity.id {
                return Err(Error::ValidationFailure(
                    "server identity does not match the certificate",
                ));
            }
            if identity.display_name.is_empty() {
                identity.display_name = claimed.display_name.clone();
            }
        }
        if response.access_token.trim().is_empty() {
            return Err(Error::ValidationFailure("access token is empty"));
        }

        let obtained_at = now.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
        Ok(Credential {
            header_value: self.config.header_value(response.access_token.trim()),
            obtained_at,
            identity,
        })
    }

    /// Persists then caches the credential, unless the exchange was superseded meanwhile
    async fn store(&self, in_flight: &InFlight<'_>, credential: Credential) -> Result<String> {
        if !in_flight.is_current() {
            return Err(Error::Cancelled);
        }
        if let Some(store) = &self.persistence {
            store
                .save_json(&self.config.storage_key, &credential)
                .await
                .map_err(KeystoreError::wrap("persisting the credential"))?;
        }

        let mut slot = lock(&self.slot);
        if slot.generation != in_flight.ticket {
            // cleared while persisting, the copy just written is removed on the failure path
            return Err(Error::Cancelled);
        }
        let header_value = credential.header_value.clone();
        info!(
            identity = Obfuscated::from(&credential.identity),
            header = Obfuscated::from(&header_value);
            "Obtained authorization"
        );
        slot.credential = Some(credential);
        Ok(header_value)
    }

    async fn remove_persisted(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        if let Err(e) = store.remove(&self.config.storage_key).await {
            warn!(error:% = e; "Failed to remove the persisted credential");
        }
    }
}

//! HTTP client for the Ledger and Identity APIs.
//!
//! | Call | Request |
//! |------|---------|
//! | [`LedgerApi::list`] | `GET /records?ownerId=<id>` |
//! | [`LedgerApi::list_all`] | `GET /records` |
//! | [`LedgerApi::create`] | `POST /records` |
//! | [`LedgerApi::update`] | `PUT /records/{id}` |
//! | [`LedgerApi::delete`] | `DELETE /records/{id}` |
//! | [`IdentityApi::find_by_credentials`] | `GET /identities?email=&password=` |
//! | [`IdentityApi::create`] | `POST /identities` |
//! | [`IdentityApi::list`] | `GET /identities` |
//! | [`IdentityApi::update`] | `PUT /identities/{id}` |
//! | [`IdentityApi::delete`] | `DELETE /identities/{id}` |
//!
//! Responses are decoded through [`crate::wire`].

use std::time::Duration;

use ledger::{ExpenseRecord, Identity, LedgerApi, RemoteError};
use ledger::models::RecordDraft;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::Profile;
use crate::identity::IdentityApi;
use crate::settings::ApiSettings;
use crate::wire::{identity_from_wire, record_from_wire, IdentityBody, WireIdentity, WireRecord};

/// Ledger and Identity API client sharing one connection pool.
#[derive(Clone, Debug)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    records_path: String,
    identities_path: String,
}

fn transport(e: reqwest::Error) -> RemoteError {
    if e.is_decode() {
        RemoteError::Decode(e.to_string())
    } else {
        RemoteError::Transport(e.to_string())
    }
}

impl HttpApi {
    pub fn new(settings: &ApiSettings) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            records_path: settings.records_path.trim_matches('/').to_string(),
            identities_path: settings.identities_path.trim_matches('/').to_string(),
        })
    }

    fn records_url(&self) -> String {
        format!("{}/{}", self.base_url, self.records_path)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{}", self.records_url(), id)
    }

    fn identities_url(&self) -> String {
        format!("{}/{}", self.base_url, self.identities_path)
    }

    fn identity_url(&self, id: &str) -> String {
        format!("{}/{}", self.identities_url(), id)
    }

    /// Send and reject any non-success status.
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, RemoteError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        debug!(status = status.as_u16(), context, "Remote call finished");
        if status.is_success() {
            Ok(response)
        } else {
            Err(RemoteError::status(status.as_u16(), context))
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, RemoteError> {
        self.send(request, context)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn fetch_records(&self, request: RequestBuilder) -> Result<Vec<ExpenseRecord>, RemoteError> {
        let wire: Vec<WireRecord> = self.fetch(request, "Could not load expenses").await?;
        Ok(wire.into_iter().map(record_from_wire).collect())
    }

    async fn fetch_identities(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<Vec<Identity>, RemoteError> {
        let wire: Vec<WireIdentity> = self.fetch(request, context).await?;
        Ok(wire.into_iter().map(identity_from_wire).collect())
    }
}

impl LedgerApi for HttpApi {
    async fn list(&self, owner_id: &str) -> Result<Vec<ExpenseRecord>, RemoteError> {
        let request = self
            .client
            .get(self.records_url())
            .query(&[("ownerId", owner_id)]);
        self.fetch_records(request).await
    }

    async fn list_all(&self) -> Result<Vec<ExpenseRecord>, RemoteError> {
        self.fetch_records(self.client.get(self.records_url())).await
    }

    async fn create(&self, draft: &RecordDraft) -> Result<ExpenseRecord, RemoteError> {
        let request = self.client.post(self.records_url()).json(draft);
        let wire: WireRecord = self.fetch(request, "Could not save the expense").await?;
        Ok(record_from_wire(wire))
    }

    async fn update(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, RemoteError> {
        let request = self.client.put(self.record_url(&record.id)).json(record);
        let wire: WireRecord = self.fetch(request, "Could not update the expense").await?;
        Ok(record_from_wire(wire))
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.send(self.client.delete(self.record_url(id)), "Could not delete the expense")
            .await?;
        Ok(())
    }
}

impl IdentityApi for HttpApi {
    async fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Vec<Identity>, RemoteError> {
        let request = self
            .client
            .get(self.identities_url())
            .query(&[("email", email), ("password", password)]);
        self.fetch_identities(request, "Could not verify credentials").await
    }

    async fn create(&self, profile: &Profile) -> Result<Identity, RemoteError> {
        let body = IdentityBody {
            id: None,
            display_name: &profile.display_name,
            email: &profile.email,
            password: Some(&profile.password),
            role: profile.role,
            monthly_income: profile.monthly_income,
        };
        let request = self.client.post(self.identities_url()).json(&body);
        let wire: WireIdentity = self.fetch(request, "Could not create the account").await?;
        Ok(identity_from_wire(wire))
    }

    async fn list(&self) -> Result<Vec<Identity>, RemoteError> {
        self.fetch_identities(self.client.get(self.identities_url()), "Could not load users")
            .await
    }

    async fn update(
        &self,
        identity: &Identity,
        password: Option<&str>,
    ) -> Result<Identity, RemoteError> {
        let body = IdentityBody {
            id: Some(&identity.id),
            display_name: &identity.display_name,
            email: &identity.email,
            password,
            role: identity.role,
            monthly_income: identity.monthly_income,
        };
        let request = self.client.put(self.identity_url(&identity.id)).json(&body);
        let wire: WireIdentity = self.fetch(request, "Could not update the user").await?;
        Ok(identity_from_wire(wire))
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.send(self.client.delete(self.identity_url(id)), "Could not delete the user")
            .await?;
        Ok(())
    }
}

use async_trait::async_trait;
use shield_credential::{Credential, CredentialKind};
use shield_incident::{Incident, IncidentUpdate};

use crate::model::{QueryWindow, RemediationRecord};
use crate::StorageResult;

/// Storage interface for incident records.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Insert or replace an incident.
    async fn put_incident(&self, incident: Incident) -> StorageResult<()>;

    async fn get_incident(&self, incident_id: &str) -> StorageResult<Option<Incident>>;

    /// List incidents newest-first.
    async fn list_incidents(&self, window: QueryWindow) -> StorageResult<Vec<Incident>>;

    /// Incidents on exactly `package_name@version`.
    async fn list_incidents_for(
        &self,
        package_name: &str,
        version: &str,
    ) -> StorageResult<Vec<Incident>>;

    /// Apply a planned update atomically.
    ///
    /// Fails with `Conflict` if the incident's status is no longer the one the
    /// update was planned against, or if a credential is already attached.
    async fn apply_update(&self, update: &IncidentUpdate) -> StorageResult<Incident>;
}

/// Storage interface for credentials. Credentials are immutable once stored.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store `credential`; with `incident_id`, also append it to that
    /// incident's trail without changing its status.
    async fn put_credential(
        &self,
        credential: Credential,
        incident_id: Option<&str>,
    ) -> StorageResult<()>;

    async fn get_credential(&self, credential_id: &str) -> StorageResult<Option<Credential>>;

    /// Credentials of `kind` whose subject names exactly `package_name@version`.
    async fn list_credentials_by_package_version(
        &self,
        kind: CredentialKind,
        package_name: &str,
        version: &str,
    ) -> StorageResult<Vec<Credential>>;

    async fn list_credentials(&self, kind: Option<CredentialKind>) -> StorageResult<Vec<Credential>>;
}

/// Storage interface for remediation actions.
#[async_trait]
pub trait RemediationStore: Send + Sync {
    async fn record_remediation(&self, record: RemediationRecord) -> StorageResult<()>;

    async fn list_remediations(&self, incident_id: &str) -> StorageResult<Vec<RemediationRecord>>;
}

/// Full storage contract used by the agents.
pub trait ShieldStorage: IncidentStore + CredentialStore + RemediationStore + Send + Sync {}

impl<T> ShieldStorage for T where T: IncidentStore + CredentialStore + RemediationStore + Send + Sync {}

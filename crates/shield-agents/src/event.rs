use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A newly published package version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseEvent {
    #[serde(default = "new_event_id")]
    pub id: String,
    pub package_name: String,
    pub new_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Package manifest (e.g. package.json contents)
    #[serde(default, alias = "metadata")]
    pub manifest: serde_json::Value,
    /// Excerpt of the released source, scanned for obfuscation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sample: Option<String>,
}

impl ReleaseEvent {
    pub fn new(package_name: impl Into<String>, new_version: impl Into<String>) -> Self {
        Self {
            id: new_event_id(),
            package_name: package_name.into(),
            new_version: new_version.into(),
            prev_version: None,
            repo_url: None,
            timestamp: Utc::now(),
            manifest: serde_json::Value::Object(Default::default()),
            content_sample: None,
        }
    }

    pub fn with_prev_version(mut self, prev_version: impl Into<String>) -> Self {
        self.prev_version = Some(prev_version.into());
        self
    }

    pub fn with_repo_url(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = Some(repo_url.into());
        self
    }

    pub fn with_manifest(mut self, manifest: serde_json::Value) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_content_sample(mut self, sample: impl Into<String>) -> Self {
        self.content_sample = Some(sample.into());
        self
    }
}

fn new_event_id() -> String {
    Uuid::new_v4().to_string()
}

/// Payload of a `verification_request` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub incident_id: String,
    /// The scanner's RiskFinding credential
    pub credential_id: String,
    pub package_name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_version: Option<String>,
}

/// Payload of `verification_result` and `patch_request` messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub incident_id: String,
    pub verified: bool,
    pub credential_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_event_fills_defaults() {
        let event: ReleaseEvent = serde_json::from_value(serde_json::json!({
            "package_name": "lodash-utils",
            "new_version": "1.0.1",
            "metadata": {"scripts": {"postinstall": "node x.js"}}
        }))
        .unwrap();
        assert!(!event.id.is_empty());
        assert!(event.prev_version.is_none());
        assert_eq!(event.manifest["scripts"]["postinstall"], "node x.js");
    }

    #[test]
    fn builder_sets_optional_fields() {
        let event = ReleaseEvent::new("a", "2.0.0")
            .with_prev_version("1.9.0")
            .with_repo_url("https://example.com/a")
            .with_content_sample("eval(x)");
        assert_eq!(event.prev_version.as_deref(), Some("1.9.0"));
        assert_eq!(event.content_sample.as_deref(), Some("eval(x)"));
        assert!(event.manifest.as_object().is_some_and(|m| m.is_empty()));
    }
}

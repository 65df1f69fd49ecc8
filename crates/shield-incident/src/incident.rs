use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shield_detection::{overall_confidence, RiskIndicator};

use crate::severity::Severity;

/// Lifecycle state of an incident.
///
/// `Detected -> {Verified, FalsePositive}`, `Verified -> Mitigated`.
/// Nothing returns to `Detected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Detected,
    Verified,
    FalsePositive,
    Mitigated,
}

impl IncidentStatus {
    /// Detected and Verified incidents block their exact package version.
    pub fn is_blocking(&self) -> bool {
        matches!(self, IncidentStatus::Detected | IncidentStatus::Verified)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::FalsePositive | IncidentStatus::Mitigated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Detected => "detected",
            IncidentStatus::Verified => "verified",
            IncidentStatus::FalsePositive => "false_positive",
            IncidentStatus::Mitigated => "mitigated",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A suspected problem with one package version.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub package_name: String,
    pub version: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub title: String,
    pub description: String,
    pub indicators: Vec<RiskIndicator>,
    #[serde(default)]
    pub affected_projects: Vec<String>,
    /// Every credential minted about this incident, in attach order.
    #[serde(default, alias = "credentials")]
    pub credential_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    /// Open a `Detected` incident, or `None` when there is nothing to report.
    pub fn open(
        package_name: impl Into<String>,
        version: impl Into<String>,
        indicators: Vec<RiskIndicator>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        if indicators.is_empty() {
            return None;
        }
        let package_name = package_name.into();
        let version = version.into();
        let confidence = overall_confidence(&indicators);
        let severity = Severity::classify(&indicators, confidence);

        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: format!("Suspicious package: {package_name}@{version}"),
            description: format!(
                "Scanner detected {} risk indicator(s) with {:.0}% confidence",
                indicators.len(),
                confidence * 100.0
            ),
            package_name,
            version,
            severity,
            status: IncidentStatus::Detected,
            indicators,
            affected_projects: Vec::new(),
            credential_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_affected_projects(mut self, projects: Vec<String>) -> Self {
        self.affected_projects = projects;
        self
    }

    /// Maximum confidence across the indicators.
    pub fn confidence(&self) -> f64 {
        overall_confidence(&self.indicators)
    }

    pub fn concerns(&self, package_name: &str, version: &str) -> bool {
        self.package_name == package_name && self.version == version
    }

    /// Blocks `package_name@version`.
    pub fn blocks(&self, package_name: &str, version: &str) -> bool {
        self.status.is_blocking() && self.concerns(package_name, version)
    }

    pub fn has_credential(&self, credential_id: &str) -> bool {
        self.credential_ids.iter().any(|id| id == credential_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shield_detection::IndicatorKind;

    fn indicators() -> Vec<RiskIndicator> {
        vec![
            RiskIndicator::new(IndicatorKind::Typosquat, "Pattern match", 0.9, "lodash-utils"),
            RiskIndicator::new(IndicatorKind::ObfuscatedCode, "eval", 0.65, "eval"),
        ]
    }

    #[test]
    fn open_derives_severity_and_text() {
        let incident = Incident::open("lodash-utils", "1.0.1", indicators(), Utc::now()).unwrap();
        assert_eq!(incident.status, IncidentStatus::Detected);
        assert_eq!(incident.severity, Severity::Critical);
        assert_eq!(incident.title, "Suspicious package: lodash-utils@1.0.1");
        assert_eq!(
            incident.description,
            "Scanner detected 2 risk indicator(s) with 90% confidence"
        );
        assert!(incident.credential_ids.is_empty());
        assert_eq!(incident.confidence(), 0.9);
    }

    #[test]
    fn no_indicators_no_incident() {
        assert!(Incident::open("a", "1", vec![], Utc::now()).is_none());
    }

    #[test]
    fn blocking_statuses() {
        assert!(IncidentStatus::Detected.is_blocking());
        assert!(IncidentStatus::Verified.is_blocking());
        assert!(!IncidentStatus::FalsePositive.is_blocking());
        assert!(!IncidentStatus::Mitigated.is_blocking());

        let mut incident = Incident::open("evil", "2.0.0", indicators(), Utc::now()).unwrap();
        assert!(incident.blocks("evil", "2.0.0"));
        assert!(!incident.blocks("evil", "2.0.1"));
        incident.status = IncidentStatus::FalsePositive;
        assert!(!incident.blocks("evil", "2.0.0"));
    }

    #[test]
    fn wire_names() {
        let incident = Incident::open("evil", "2.0.0", indicators(), Utc::now()).unwrap();
        let value = serde_json::to_value(&incident).unwrap();
        assert_eq!(value["status"], "detected");
        assert_eq!(value["severity"], "critical");
        assert_eq!(value["indicators"][0]["type"], "typosquat");
        assert_eq!(
            serde_json::to_value(IncidentStatus::FalsePositive).unwrap(),
            "false_positive"
        );
    }
}

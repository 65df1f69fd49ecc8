//! Configuration for the Swarm Shield agents.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shield_credential::{
    CredentialIssuer, Ed25519Signer, IssuerKeyRing, ProofSigner, ProofVerifier, SharedKeyMac,
    TrustedIssuers,
};
use shield_detection::DetectionConfig;
use shield_gate::GatePolicy;
use shield_verifier::RecheckConfig;

use crate::error::{AgentError, AgentResult};

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldConfig {
    /// Agent identities
    #[serde(default)]
    pub agents: AgentIdentities,

    /// Proof scheme and key material
    #[serde(default)]
    pub signing: SigningConfig,

    /// Detection thresholds and reference packages
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Verifier confirmation threshold and attestation lifetimes
    #[serde(default)]
    pub recheck: RecheckConfig,

    /// CI gate trust policy
    #[serde(default)]
    pub gate: GatePolicy,

    /// Issuers whose risk findings the verifier accepts
    #[serde(default = "default_trusted_scanners")]
    pub trusted_scanners: TrustedIssuers,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            agents: AgentIdentities::default(),
            signing: SigningConfig::default(),
            detection: DetectionConfig::default(),
            recheck: RecheckConfig::default(),
            gate: GatePolicy::default(),
            trusted_scanners: default_trusted_scanners(),
        }
    }
}

impl ShieldConfig {
    /// Layer defaults, then `path` if it exists, then `SHIELD_` variables.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `SHIELD_DETECTION__SIMILARITY_THRESHOLD=0.9`.
    pub fn load(path: Option<&str>) -> AgentResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&ShieldConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SHIELD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: ShieldConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds outside [0, 1] and unusable attestation lifetimes.
    pub fn validate(&self) -> AgentResult<()> {
        let thresholds = [
            ("detection.similarity_threshold", self.detection.similarity_threshold),
            ("detection.pattern_confidence", self.detection.pattern_confidence),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(AgentError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        self.recheck
            .validate()
            .map_err(|e| AgentError::Config(e.to_string()))
    }

    /// Build the proof keys the configured scheme calls for.
    pub fn proof_keys(&self) -> AgentResult<ProofKeys> {
        self.signing.proof_keys()
    }
}

/// Identities the three agents sign and register as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentities {
    #[serde(default = "default_scanner_id")]
    pub scanner: String,
    #[serde(default = "default_verifier_id")]
    pub verifier: String,
    #[serde(default = "default_ci_id")]
    pub ci: String,
}

impl Default for AgentIdentities {
    fn default() -> Self {
        Self {
            scanner: default_scanner_id(),
            verifier: default_verifier_id(),
            ci: default_ci_id(),
        }
    }
}

/// Which proof scheme credentials are minted and checked with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningScheme {
    /// HMAC-SHA256 over one secret held by every agent
    #[default]
    SharedKey,
    /// Per-issuer Ed25519 keys
    Ed25519,
}

/// Key material for one issuer under the Ed25519 scheme.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerKeyConfig {
    pub issuer_id: String,
    /// Hex-encoded 32-byte secret; only the issuing agent needs it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
    /// Hex-encoded 32-byte public key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_key: Option<String>,
}

impl fmt::Debug for IssuerKeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerKeyConfig")
            .field("issuer_id", &self.issuer_id)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .field("verifying_key", &self.verifying_key)
            .finish()
    }
}

/// Signing configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    #[serde(default)]
    pub scheme: SigningScheme,

    #[serde(default = "default_shared_secret")]
    pub shared_secret: String,

    #[serde(default)]
    pub issuers: Vec<IssuerKeyConfig>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            scheme: SigningScheme::default(),
            shared_secret: default_shared_secret(),
            issuers: Vec::new(),
        }
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("scheme", &self.scheme)
            .field("shared_secret", &"<redacted>")
            .field("issuers", &self.issuers)
            .finish()
    }
}

impl SigningConfig {
    pub fn proof_keys(&self) -> AgentResult<ProofKeys> {
        match self.scheme {
            SigningScheme::SharedKey => {
                if self.shared_secret.is_empty() {
                    return Err(AgentError::Config("shared_secret is empty".into()));
                }
                let mac = Arc::new(SharedKeyMac::new(self.shared_secret.as_bytes().to_vec()));
                Ok(ProofKeys {
                    verifier: mac.clone(),
                    shared: Some(mac),
                    signers: HashMap::new(),
                })
            }
            SigningScheme::Ed25519 => {
                let mut ring = IssuerKeyRing::new();
                let mut signers: HashMap<String, Arc<dyn ProofSigner>> = HashMap::new();
                for entry in &self.issuers {
                    if let Some(secret) = &entry.signing_key {
                        let signer = Ed25519Signer::from_hex(&entry.issuer_id, secret)?;
                        ring.register(entry.issuer_id.clone(), signer.verifying_key());
                        signers.insert(entry.issuer_id.clone(), Arc::new(signer));
                    }
                    if let Some(public) = &entry.verifying_key {
                        ring.register_hex(&entry.issuer_id, public)?;
                    }
                }
                Ok(ProofKeys {
                    verifier: Arc::new(ring),
                    shared: None,
                    signers,
                })
            }
        }
    }
}

/// Resolved signers and the verifier every agent checks proofs with.
#[derive(Clone)]
pub struct ProofKeys {
    verifier: Arc<dyn ProofVerifier>,
    shared: Option<Arc<SharedKeyMac>>,
    signers: HashMap<String, Arc<dyn ProofSigner>>,
}

impl ProofKeys {
    pub fn verifier(&self) -> Arc<dyn ProofVerifier> {
        self.verifier.clone()
    }

    pub fn signer_for(&self, issuer_id: &str) -> AgentResult<Arc<dyn ProofSigner>> {
        if let Some(shared) = &self.shared {
            return Ok(shared.clone());
        }
        self.signers
            .get(issuer_id)
            .cloned()
            .ok_or_else(|| AgentError::MissingSigningKey(issuer_id.to_string()))
    }

    /// An issuer minting as `issuer_id`.
    pub fn issuer(&self, issuer_id: &str) -> AgentResult<CredentialIssuer> {
        Ok(CredentialIssuer::new(issuer_id, self.signer_for(issuer_id)?))
    }
}

// Default value helpers
fn default_scanner_id() -> String {
    "did:simulator:scanner".to_string()
}

fn default_verifier_id() -> String {
    "did:simulator:verifier".to_string()
}

fn default_ci_id() -> String {
    "did:simulator:ci".to_string()
}

fn default_shared_secret() -> String {
    "swarm-shield-demo-key-2024".to_string()
}

fn default_trusted_scanners() -> TrustedIssuers {
    TrustedIssuers::new([default_scanner_id()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shield_credential::CredentialSubject;

    #[test]
    fn defaults_reproduce_reference_constants() {
        let config = ShieldConfig::default();
        assert_eq!(config.signing.scheme, SigningScheme::SharedKey);
        assert_eq!(config.detection.similarity_threshold, 0.85);
        assert_eq!(config.recheck.confirm_threshold, 0.7);
        assert_eq!(config.recheck.verified_attestation_ttl_hours, 24);
        assert_eq!(config.recheck.false_positive_attestation_ttl_hours, 168);
        assert!(config.trusted_scanners.contains("did:simulator:scanner"));
        assert!(config.gate.trusted_verifiers.contains("did:zynd:verifier"));
        assert_eq!(config.agents.ci, "did:simulator:ci");
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = ShieldConfig::load(Some("/nonexistent/shield-config")).unwrap();
        assert_eq!(config.agents.scanner, "did:simulator:scanner");
        assert_eq!(config.detection.reference_packages.len(), 30);
    }

    #[test]
    fn load_rejects_negative_attestation_lifetime() {
        let path = std::env::temp_dir().join(format!("shield-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[recheck]\nverified_attestation_ttl_hours = -5\n").unwrap();

        let err = ShieldConfig::load(path.to_str()).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, AgentError::Config(_)));
        assert!(err.to_string().contains("verified_attestation_ttl_hours"));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = ShieldConfig::default();
        config.recheck.false_positive_attestation_ttl_hours = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = ShieldConfig::default();
        config.detection.similarity_threshold = 1.2;
        assert!(config.validate().is_err());

        let mut config = ShieldConfig::default();
        config.recheck.confirm_threshold = -0.5;
        assert!(config.validate().is_err());

        ShieldConfig::default().validate().unwrap();
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut signing = SigningConfig::default();
        signing.issuers.push(IssuerKeyConfig {
            issuer_id: "did:a".into(),
            signing_key: Some("00".repeat(32)),
            verifying_key: None,
        });
        let rendered = format!("{signing:?}");
        assert!(!rendered.contains("swarm-shield-demo-key-2024"));
        assert!(!rendered.contains(&"00".repeat(32)));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn shared_key_signs_for_any_issuer() {
        let keys = SigningConfig::default().proof_keys().unwrap();
        let cred = keys
            .issuer("did:anyone")
            .unwrap()
            .verified_incident(CredentialSubject::package("a", "1"), "n", Utc::now())
            .unwrap();
        assert!(cred.verify(keys.verifier().as_ref()));
    }

    #[test]
    fn ed25519_scheme_binds_keys_to_issuers() {
        let signing = SigningConfig {
            scheme: SigningScheme::Ed25519,
            issuers: vec![IssuerKeyConfig {
                issuer_id: "did:simulator:verifier".into(),
                signing_key: Some("07".repeat(32)),
                verifying_key: None,
            }],
            ..SigningConfig::default()
        };
        let keys = signing.proof_keys().unwrap();
        let cred = keys
            .issuer("did:simulator:verifier")
            .unwrap()
            .safe_to_use(
                CredentialSubject::package("a", "1"),
                chrono::Duration::hours(1),
                Utc::now(),
            )
            .unwrap();
        assert!(cred.verify(keys.verifier().as_ref()));
        assert!(matches!(
            keys.issuer("did:simulator:scanner"),
            Err(AgentError::MissingSigningKey(_))
        ));
    }

    #[test]
    fn malformed_key_is_a_config_failure() {
        let signing = SigningConfig {
            scheme: SigningScheme::Ed25519,
            issuers: vec![IssuerKeyConfig {
                issuer_id: "did:a".into(),
                signing_key: None,
                verifying_key: Some("not-hex".into()),
            }],
            ..SigningConfig::default()
        };
        assert!(matches!(signing.proof_keys(), Err(AgentError::Credential(_))));
    }
}

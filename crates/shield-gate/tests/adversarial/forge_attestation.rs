//! Adversarial test: forged, tampered, or mis-typed attestations never unlock
//! a blocked release.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ed25519_dalek::SigningKey;
use shield_credential::*;
use shield_gate::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const VERIFIER: &str = "did:simulator:verifier";

fn shared_gate() -> (TrustEvaluator, Arc<SharedKeyMac>) {
    let scheme = Arc::new(SharedKeyMac::new(b"fabric-key".to_vec()));
    (TrustEvaluator::new(scheme.clone(), GatePolicy::default()), scheme)
}

fn subject() -> CredentialSubject {
    CredentialSubject::package("lodash-utils", "1.0.1").with_incident("inc-1")
}

// ---------------------------------------------------------------------------
// Tests: Tampering
// ---------------------------------------------------------------------------

#[test]
fn extended_expiry_breaks_proof() {
    let (gate, scheme) = shared_gate();
    let now = Utc::now();
    let mut att = CredentialIssuer::new(VERIFIER, scheme)
        .safe_to_use(subject(), Duration::hours(1), now - Duration::hours(2))
        .unwrap();
    att.expiration_time = Some(now + Duration::days(30));

    let decision = gate.decide_at(true, &[att], now);
    assert!(!decision.allowed);
    assert_eq!(decision.assessments[0].reason, "Invalid signature");
}

#[test]
fn retargeted_version_breaks_proof() {
    let (gate, scheme) = shared_gate();
    let mut att = CredentialIssuer::new(VERIFIER, scheme)
        .safe_to_use(subject(), Duration::hours(24), Utc::now())
        .unwrap();
    att.subject.version = "1.0.2".into();
    assert!(!gate.decide(true, &[att]).allowed);
}

#[test]
fn rewritten_issuer_breaks_proof() {
    let (gate, scheme) = shared_gate();
    let mut att = CredentialIssuer::new("did:simulator:scanner", scheme)
        .safe_to_use(subject(), Duration::hours(24), Utc::now())
        .unwrap();
    att.issuer_id = VERIFIER.into();
    assert!(!gate.decide(true, &[att]).allowed);
}

#[test]
fn stripped_or_blank_proof_is_rejected() {
    let (gate, scheme) = shared_gate();
    let att = CredentialIssuer::new(VERIFIER, scheme)
        .safe_to_use(subject(), Duration::hours(24), Utc::now())
        .unwrap();

    let mut stripped = att.clone();
    stripped.proof = None;
    let mut blank = att;
    if let Some(proof) = blank.proof.as_mut() {
        proof.signature.clear();
    }
    let decision = gate.decide(true, &[stripped, blank]);
    assert!(!decision.allowed);
    assert!(decision.assessments.iter().all(|a| !a.valid));
}

#[test]
fn key_outside_the_fabric_cannot_sign() {
    let (gate, _) = shared_gate();
    let outsider = Arc::new(SharedKeyMac::new(b"guessed-key".to_vec()));
    let att = CredentialIssuer::new(VERIFIER, outsider)
        .safe_to_use(subject(), Duration::hours(24), Utc::now())
        .unwrap();
    assert!(!gate.decide(true, &[att]).allowed);
}

// ---------------------------------------------------------------------------
// Tests: Wrong credential kind
// ---------------------------------------------------------------------------

#[test]
fn verdict_credentials_are_not_attestations() {
    let (gate, scheme) = shared_gate();
    let issuer = CredentialIssuer::new(VERIFIER, scheme);
    let now = Utc::now();
    let fp = issuer.false_positive(subject(), "benign", now).unwrap();
    let verified = issuer.verified_incident(subject(), "confirmed", now).unwrap();

    let decision = gate.decide(true, &[fp, verified]);
    assert!(!decision.allowed);
    assert!(decision.assessments[0].reason.contains("SafeToUseAttestation"));
}

#[test]
fn claims_swapped_under_the_same_proof_are_rejected() {
    let (gate, scheme) = shared_gate();
    let issuer = CredentialIssuer::new(VERIFIER, scheme);
    let mut finding = issuer
        .risk_finding(subject(), vec!["x".into()], 0.9, vec![], Utc::now())
        .unwrap();
    finding.claims = CredentialClaims::SafeToUse(SafeToUseClaims::default());
    finding.expiration_time = Some(Utc::now() + Duration::hours(24));
    assert!(!gate.decide(true, &[finding]).allowed);
}

// ---------------------------------------------------------------------------
// Tests: Per-issuer keys
// ---------------------------------------------------------------------------

#[test]
fn impersonating_a_trusted_verifier_fails_with_issuer_keys() {
    let verifier_key = Ed25519Signer::new(SigningKey::from_bytes(&[1u8; 32]));
    let scanner_key = Arc::new(Ed25519Signer::new(SigningKey::from_bytes(&[2u8; 32])));

    let mut ring = IssuerKeyRing::new();
    ring.register(VERIFIER, verifier_key.verifying_key());
    ring.register("did:simulator:scanner", scanner_key.verifying_key());
    let gate = TrustEvaluator::new(Arc::new(ring), GatePolicy::default());

    // The scanner is a legitimate fabric member but signs as the verifier.
    let forged = CredentialIssuer::new(VERIFIER, scanner_key.clone())
        .safe_to_use(subject(), Duration::hours(24), Utc::now())
        .unwrap();
    assert!(!gate.decide(true, &[forged]).allowed);

    // Under its own name it verifies but is not a trusted verifier.
    let honest = CredentialIssuer::new("did:simulator:scanner", scanner_key)
        .safe_to_use(subject(), Duration::hours(24), Utc::now())
        .unwrap();
    let decision = gate.decide(true, &[honest]);
    assert!(!decision.allowed);
    assert!(decision.assessments[0].reason.contains("not in trusted list"));

    let genuine = CredentialIssuer::new(VERIFIER, Arc::new(verifier_key))
        .safe_to_use(subject(), Duration::hours(24), Utc::now())
        .unwrap();
    assert!(gate.decide(true, &[genuine]).allowed);
}

#[test]
fn hmac_proof_is_not_accepted_by_a_key_ring() {
    let mut ring = IssuerKeyRing::new();
    ring.register(
        VERIFIER,
        Ed25519Signer::new(SigningKey::from_bytes(&[3u8; 32])).verifying_key(),
    );
    let gate = TrustEvaluator::new(Arc::new(ring), GatePolicy::default());
    let att = CredentialIssuer::new(VERIFIER, Arc::new(SharedKeyMac::new(b"k".to_vec())))
        .safe_to_use(subject(), Duration::hours(24), Utc::now())
        .unwrap();
    assert!(!gate.decide(true, &[att]).allowed);
}

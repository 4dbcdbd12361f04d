//! Email OTP flow for registration.
//!
//! Registration is a three-step flow: send a code, verify it, then create
//! the account. Each flow moves through an explicit state machine:
//!
//! ```text
//! Unverified --SendOtp--> OtpSent --VerifyOtp--> OtpVerified --Register--> Registered
//! ```
//!
//! `Unverified` is the implicit state before a flow record exists and
//! `Registered` is terminal: completing a flow consumes it. A flow expires
//! 5 minutes after its code is sent, the validity the email promises.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{AuthError, CoreError, StoreError};
use crate::identity::IdentityStore;
use crate::models::Registration;

/// Minutes an issued code stays valid.
const OTP_VALIDITY_MINUTES: i64 = 5;

/// States of one registration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpState {
    Unverified,
    OtpSent,
    OtpVerified,
    Registered,
}

impl OtpState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::OtpSent => "otp_sent",
            Self::OtpVerified => "otp_verified",
            Self::Registered => "registered",
        }
    }
}

/// A freshly issued OTP challenge, ready to be mailed.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    pub flow_id: String,
    pub code: String,
    pub email: String,
}

struct OtpFlow {
    registration: Registration,
    code: String,
    state: OtpState,
    sent_at: DateTime<Utc>,
}

impl OtpFlow {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.sent_at + Duration::minutes(OTP_VALIDITY_MINUTES)
    }
}

/// Registry of in-flight registration flows, keyed by flow id.
pub struct OtpFlows {
    flows: RwLock<HashMap<String, OtpFlow>>,
}

impl Default for OtpFlows {
    fn default() -> Self {
        Self::new()
    }
}

impl OtpFlows {
    pub fn new() -> Self {
        Self {
            flows: RwLock::new(HashMap::new()),
        }
    }

    /// Validate a registration and issue its OTP challenge.
    ///
    /// The full identity validation chain runs first: invalid input never
    /// gets a flow or a code. Expired flows are pruned on this write path.
    pub async fn begin(
        &self,
        identity: &IdentityStore,
        registration: Registration,
    ) -> Result<OtpChallenge, CoreError> {
        identity.validate_new(&registration)?;

        let code = rand::thread_rng().gen_range(100000..=999999u32).to_string();
        let challenge = OtpChallenge {
            flow_id: Uuid::new_v4().to_string(),
            code: code.clone(),
            email: registration.email.clone(),
        };

        let now = Utc::now();
        let mut flows = self.flows.write().await;
        flows.retain(|_, f| !f.is_expired(now));
        flows.insert(
            challenge.flow_id.clone(),
            OtpFlow {
                registration,
                code,
                state: OtpState::OtpSent,
                sent_at: now,
            },
        );
        info!(flow = %challenge.flow_id, "issued registration OTP");
        Ok(challenge)
    }

    /// Check a submitted code against the one that was sent.
    ///
    /// A wrong code leaves the flow in `OtpSent` so the user may retry; an
    /// expired code discards the flow entirely.
    pub async fn verify(&self, flow_id: &str, submitted: &str) -> Result<(), CoreError> {
        let mut flows = self.flows.write().await;
        let flow = flows
            .get_mut(flow_id)
            .ok_or_else(|| StoreError::not_found("registration flow", flow_id))?;

        if flow.is_expired(Utc::now()) {
            flows.remove(flow_id);
            return Err(AuthError::OtpExpired.into());
        }
        if flow.state != OtpState::OtpSent {
            return Err(AuthError::FlowOutOfOrder {
                state: flow.state.as_str().to_string(),
                action: "verify the OTP".to_string(),
            }
            .into());
        }
        if flow.code != submitted {
            debug!(flow = flow_id, "OTP mismatch");
            return Err(AuthError::InvalidOtp.into());
        }

        flow.state = OtpState::OtpVerified;
        info!(flow = flow_id, "OTP verified");
        Ok(())
    }

    /// Consume a verified flow, handing back the registration details.
    ///
    /// Only legal from `OtpVerified`; the flow reaches `Registered` and is
    /// removed, so it cannot be completed twice.
    pub async fn take_verified(&self, flow_id: &str) -> Result<Registration, CoreError> {
        let mut flows = self.flows.write().await;
        let flow = flows
            .get(flow_id)
            .ok_or_else(|| StoreError::not_found("registration flow", flow_id))?;

        if flow.is_expired(Utc::now()) {
            flows.remove(flow_id);
            return Err(AuthError::OtpExpired.into());
        }
        if flow.state != OtpState::OtpVerified {
            return Err(AuthError::FlowOutOfOrder {
                state: flow.state.as_str().to_string(),
                action: "complete registration".to_string(),
            }
            .into());
        }

        // Terminal transition: the flow record is consumed.
        match flows.remove(flow_id) {
            Some(flow) => Ok(flow.registration),
            None => Err(StoreError::not_found("registration flow", flow_id).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;

    fn sample_registration() -> Registration {
        Registration {
            username: "alice".into(),
            college_id: "ABCD123456".into(),
            email: "alice@example.com".into(),
            date_of_birth: "2001-04-12".into(),
            password: "pw1".into(),
            confirm_password: "pw1".into(),
        }
    }

    fn identity_store() -> (tempfile::TempDir, IdentityStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::new(dir.path());
        (dir, store)
    }

    fn wrong_code(right: &str) -> String {
        if right == "100000" {
            "100001".to_string()
        } else {
            "100000".to_string()
        }
    }

    #[tokio::test]
    async fn test_full_flow() {
        let (_dir, identity) = identity_store();
        let flows = OtpFlows::new();

        let challenge = flows.begin(&identity, sample_registration()).await.unwrap();
        assert_eq!(challenge.code.len(), 6);
        assert_eq!(challenge.email, "alice@example.com");

        flows.verify(&challenge.flow_id, &challenge.code).await.unwrap();
        let registration = flows.take_verified(&challenge.flow_id).await.unwrap();
        assert_eq!(registration.username, "alice");

        // The flow was consumed; it cannot be completed twice.
        let result = flows.take_verified(&challenge.flow_id).await;
        assert!(matches!(
            result,
            Err(CoreError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_invalid_registration_gets_no_flow() {
        let (_dir, identity) = identity_store();
        let flows = OtpFlows::new();

        let mut bad = sample_registration();
        bad.college_id = "short".into();
        let result = flows.begin(&identity, bad).await;
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::MalformedCollegeId(_)))
        ));
        assert!(flows.flows.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_code_allows_retry() {
        let (_dir, identity) = identity_store();
        let flows = OtpFlows::new();
        let challenge = flows.begin(&identity, sample_registration()).await.unwrap();

        let result = flows.verify(&challenge.flow_id, &wrong_code(&challenge.code)).await;
        assert!(matches!(result, Err(CoreError::Auth(AuthError::InvalidOtp))));

        // The flow is still waiting in OtpSent; the right code works.
        flows.verify(&challenge.flow_id, &challenge.code).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_code_discards_flow() {
        let (_dir, identity) = identity_store();
        let flows = OtpFlows::new();
        let challenge = flows.begin(&identity, sample_registration()).await.unwrap();

        flows
            .flows
            .write()
            .await
            .get_mut(&challenge.flow_id)
            .unwrap()
            .sent_at = Utc::now() - Duration::minutes(OTP_VALIDITY_MINUTES + 1);

        let result = flows.verify(&challenge.flow_id, &challenge.code).await;
        assert!(matches!(result, Err(CoreError::Auth(AuthError::OtpExpired))));
        assert!(flows.flows.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_take_verified_requires_verification() {
        let (_dir, identity) = identity_store();
        let flows = OtpFlows::new();
        let challenge = flows.begin(&identity, sample_registration()).await.unwrap();

        let result = flows.take_verified(&challenge.flow_id).await;
        assert!(matches!(
            result,
            Err(CoreError::Auth(AuthError::FlowOutOfOrder { .. }))
        ));
    }

    #[tokio::test]
    async fn test_verify_twice_is_out_of_order() {
        let (_dir, identity) = identity_store();
        let flows = OtpFlows::new();
        let challenge = flows.begin(&identity, sample_registration()).await.unwrap();

        flows.verify(&challenge.flow_id, &challenge.code).await.unwrap();
        let result = flows.verify(&challenge.flow_id, &challenge.code).await;
        assert!(matches!(
            result,
            Err(CoreError::Auth(AuthError::FlowOutOfOrder { .. }))
        ));
    }

    #[test]
    fn test_state_names() {
        assert_eq!(OtpState::Unverified.as_str(), "unverified");
        assert_eq!(OtpState::OtpSent.as_str(), "otp_sent");
        assert_eq!(OtpState::OtpVerified.as_str(), "otp_verified");
        assert_eq!(OtpState::Registered.as_str(), "registered");
    }
}

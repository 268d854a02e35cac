use std::fmt::{Debug, Formatter};
use stevedore_core::time::{now, DateTime};
use stevedore_core::utils::Redact;
use stevedore_core::SigningCredential;

/// Credential that holds the access key and secret key.
///
/// The secret is never logged: `Debug` output is redacted.
#[derive(Default, Clone)]
pub struct Credential {
    /// Access key id for aws services.
    pub access_key_id: String,
    /// Secret access key for aws services.
    pub secret_access_key: String,
    /// Session token for aws services.
    pub session_token: Option<String>,
    /// Expiration time for this credential.
    pub expires_in: Option<DateTime>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl SigningCredential for Credential {
    fn is_valid(&self) -> bool {
        if (self.access_key_id.is_empty() || self.secret_access_key.is_empty())
            && self.session_token.is_none()
        {
            return false;
        }
        // Take 120s as buffer to avoid edge cases.
        if let Some(valid) = self
            .expires_in
            .map(|v| v > now() + chrono::TimeDelta::try_minutes(2).expect("in bounds"))
        {
            return valid;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential {
            access_key_id: "AKIDEXAMPLEKEYID".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: None,
            expires_in: None,
        };
        let out = format!("{cred:?}");
        assert!(!out.contains("wJalrXUtnFEMI"));
        assert!(out.contains("***"));
    }

    #[test]
    fn test_is_valid() {
        let cred = Credential {
            access_key_id: "ak".to_string(),
            secret_access_key: "sk".to_string(),
            ..Default::default()
        };
        assert!(cred.is_valid());

        assert!(!Credential::default().is_valid());

        let expired = Credential {
            access_key_id: "ak".to_string(),
            secret_access_key: "sk".to_string(),
            expires_in: Some(now()),
            ..Default::default()
        };
        assert!(!expired.is_valid());
    }
}

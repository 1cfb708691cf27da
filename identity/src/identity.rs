use crate::{certificate::Certificate, client_id::UidSelection};

/// Represents the identity claims identifying a client
///
/// Extracted either from a certificate subject or from a server response. Absent claims are
/// empty strings. Uniqueness of `id` is only guaranteed per issuing authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Client identifier e.g. `alice123`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    /// Authority which vouched for this identity e.g. `Example Issuing CA`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub authenticated_by: String,
    /// Name as displayed in the application e.g. `Alice Smith`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub display_name: String,
}

impl Identity {
    /// Builds the identity claimed by a certificate: the UID attribute of the subject, the issuer
    /// common name (or the whole issuer when it has none) and the subject common name.
    pub fn from_certificate(certificate: &Certificate, selection: UidSelection) -> Self {
        Self {
            id: certificate.client_id(selection),
            authenticated_by: certificate
                .issuer_common_name()
                .unwrap_or_else(|| certificate.issuer()),
            display_name: certificate.common_name().unwrap_or_default(),
        }
    }

    /// Parses an identity object as returned by the backend
    pub fn from_json(json: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(json)
    }

    /// Whether this identity carries no client identifier
    pub fn is_anonymous(&self) -> bool {
        self.id.is_empty()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize as _;
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestCertificate, TestCertificateParams, UID_OID};

    #[test]
    fn should_build_identity_from_certificate() {
        let cert = TestCertificate::generate(&TestCertificateParams {
            subject: format!("CN=Alice Smith,{UID_OID}=alice123"),
            ..TestCertificateParams::valid_now()
        })
        .certificate();

        let identity = Identity::from_certificate(&cert, UidSelection::First);
        assert_eq!(identity.id, "alice123");
        assert_eq!(identity.display_name, "Alice Smith");
        // self-signed, so the issuer is the subject itself
        assert_eq!(identity.authenticated_by, "Alice Smith");
        assert!(!identity.is_anonymous());
    }

    #[test]
    fn certificate_without_claims_should_yield_empty_identity() {
        let cert = TestCertificate::generate(&TestCertificateParams {
            subject: "O=example".to_string(),
            ..TestCertificateParams::valid_now()
        })
        .certificate();

        let identity = Identity::from_certificate(&cert, UidSelection::First);
        assert!(identity.is_anonymous());
        assert_eq!(identity.display_name, "");
        assert_eq!(identity.authenticated_by, "O=example");
    }

    #[test]
    fn should_parse_server_identity() {
        let identity =
            Identity::from_json(br#"{"id":"bob456","authenticatedBy":"idp","displayName":"Bob"}"#).unwrap();
        assert_eq!(
            identity,
            Identity {
                id: "bob456".into(),
                authenticated_by: "idp".into(),
                display_name: "Bob".into(),
            }
        );
    }

    #[test]
    fn missing_or_null_claims_should_be_empty() {
        let identity = Identity::from_json(br#"{"id":"bob456","displayName":null}"#).unwrap();
        assert_eq!(identity.id, "bob456");
        assert_eq!(identity.authenticated_by, "");
        assert_eq!(identity.display_name, "");
    }

    #[test]
    fn should_serialize_camel_case() {
        let json = serde_json::to_value(Identity {
            id: "a".into(),
            authenticated_by: "b".into(),
            display_name: "c".into(),
        })
        .unwrap();
        assert_eq!(json["authenticatedBy"], "b");
        assert_eq!(json["displayName"], "c");
    }
}

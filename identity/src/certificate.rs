use base64::Engine as _;
use x509_cert::der::{Decode as _, oid::ObjectIdentifier};

use crate::{
    client_id::{UidSelection, client_id_from_subject},
    error::{CertificateError, CertificateResult, DecodeError},
};

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";
const PEM_ARMOR_PREFIX: &str = "-----BEGIN";

const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Short names used when rendering a distinguished name. Anything else renders as its dotted OID.
const ATTRIBUTE_SHORT_NAMES: &[(ObjectIdentifier, &str)] = &[
    (COMMON_NAME, "CN"),
    (ObjectIdentifier::new_unwrap("2.5.4.5"), "SERIALNUMBER"),
    (ObjectIdentifier::new_unwrap("2.5.4.6"), "C"),
    (ObjectIdentifier::new_unwrap("2.5.4.7"), "L"),
    (ObjectIdentifier::new_unwrap("2.5.4.8"), "ST"),
    (ObjectIdentifier::new_unwrap("2.5.4.10"), "O"),
    (ObjectIdentifier::new_unwrap("2.5.4.11"), "OU"),
    (ObjectIdentifier::new_unwrap("0.9.2342.19200300.100.1.1"), "UID"),
    (ObjectIdentifier::new_unwrap("0.9.2342.19200300.100.1.25"), "DC"),
    (ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1"), "E"),
];

/// A parsed X.509 certificate along with the DER bytes it was parsed from.
///
/// Immutable once parsed. Every accessor is infallible: attribute values which are not valid
/// UTF-8 are rendered lossily instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    inner: x509_cert::Certificate,
    der: Vec<u8>,
}

impl Certificate {
    /// Decodes a certificate from its textual form.
    ///
    /// Accepts either a PEM document (`-----BEGIN CERTIFICATE-----`) or the standard base64
    /// encoding of the DER bytes. Line breaks and other ASCII whitespace inside the base64 text
    /// are ignored.
    ///
    /// # Errors
    /// * [CertificateError::InvalidArgument] when the text is empty
    /// * [CertificateError::Decode] when the text is not base64/PEM or does not hold a certificate
    pub fn decode(encoded: &str) -> CertificateResult<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CertificateError::InvalidArgument("encoded certificate is empty"));
        }

        if encoded.starts_with(PEM_ARMOR_PREFIX) {
            let pem = pem::parse(encoded)?;
            if pem.tag() != PEM_CERTIFICATE_TAG {
                return Err(DecodeError::UnexpectedPemTag(pem.tag().to_string()))?;
            }
            return Self::from_der(pem.contents());
        }

        let compact = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect::<String>();
        let der = base64::prelude::BASE64_STANDARD.decode(compact)?;
        Self::from_der(&der)
    }

    /// Parses DER encoded certificate bytes
    pub fn from_der(der: &[u8]) -> CertificateResult<Self> {
        if der.is_empty() {
            return Err(CertificateError::InvalidArgument("certificate bytes are empty"));
        }
        let inner = x509_cert::Certificate::from_der(der)?;
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    /// Subject attributes as `(key, value)` pairs, in encoding order
    pub fn subject_fields(&self) -> Vec<(String, String)> {
        name_fields(&self.inner.tbs_certificate.subject)
    }

    /// Subject rendered as `KEY=VALUE` attributes separated by `", "`
    pub fn subject(&self) -> String {
        render_fields(&self.subject_fields())
    }

    /// Issuer attributes as `(key, value)` pairs, in encoding order
    pub fn issuer_fields(&self) -> Vec<(String, String)> {
        name_fields(&self.inner.tbs_certificate.issuer)
    }

    /// Issuer rendered the same way as [Self::subject]
    pub fn issuer(&self) -> String {
        render_fields(&self.issuer_fields())
    }

    /// Value of the first subject common name, if any
    pub fn common_name(&self) -> Option<String> {
        first_common_name(&self.inner.tbs_certificate.subject)
    }

    /// Value of the first issuer common name, if any
    pub fn issuer_common_name(&self) -> Option<String> {
        first_common_name(&self.inner.tbs_certificate.issuer)
    }

    /// 'Not Before' as Unix timestamp
    pub fn not_before(&self) -> u64 {
        self.inner.tbs_certificate.validity.not_before.to_unix_duration().as_secs()
    }

    /// 'Not After' as Unix timestamp
    pub fn not_after(&self) -> u64 {
        self.inner.tbs_certificate.validity.not_after.to_unix_duration().as_secs()
    }

    /// Raw content of the 'Subject Public Key' bit string
    pub fn public_key(&self) -> &[u8] {
        self.inner
            .tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes()
    }

    /// Client identifier carried by the subject. See [client_id_from_subject]
    pub fn client_id(&self, selection: UidSelection) -> String {
        client_id_from_subject(&self.subject(), selection)
    }

    /// The DER bytes this certificate was parsed from
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding of the certificate
    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(PEM_CERTIFICATE_TAG, self.der.clone()))
    }
}

impl std::str::FromStr for Certificate {
    type Err = CertificateError;

    fn from_str(s: &str) -> CertificateResult<Self> {
        Self::decode(s)
    }
}

impl<'a> TryFrom<&'a [u8]> for Certificate {
    type Error = CertificateError;

    fn try_from(der: &'a [u8]) -> CertificateResult<Self> {
        Self::from_der(der)
    }
}

fn attribute_key(oid: &ObjectIdentifier) -> String {
    ATTRIBUTE_SHORT_NAMES
        .iter()
        .find(|(known, _)| known == oid)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| oid.to_string())
}

fn name_fields(name: &x509_cert::name::Name) -> Vec<(String, String)> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .map(|atv| {
            (
                attribute_key(&atv.oid),
                String::from_utf8_lossy(atv.value.value()).into_owned(),
            )
        })
        .collect()
}

fn first_common_name(name: &x509_cert::name::Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == COMMON_NAME)
        .map(|atv| String::from_utf8_lossy(atv.value.value()).into_owned())
}

fn render_fields(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::test_utils::{DC_OID, TestCertificate, TestCertificateParams, UID_OID};

    fn alice() -> TestCertificate {
        TestCertificate::generate(&TestCertificateParams {
            subject: format!("CN=Alice Smith,{UID_OID}=alice123"),
            not_before: 1_704_466_382,
            not_after: 2_019_826_382,
        })
    }

    #[test]
    fn should_decode_base64_der() {
        let generated = alice();
        let cert = Certificate::decode(&generated.base64()).unwrap();
        assert_eq!(cert.as_der(), generated.der.as_slice());
        assert_eq!(cert.not_before(), 1_704_466_382);
        assert_eq!(cert.not_after(), 2_019_826_382);
        assert_eq!(cert.public_key(), generated.public_key.as_slice());
    }

    #[test]
    fn should_decode_pem() {
        let generated = alice();
        let cert = Certificate::decode(&generated.pem()).unwrap();
        assert_eq!(cert.as_der(), generated.der.as_slice());
        assert_eq!(Certificate::decode(&cert.to_pem()).unwrap(), cert);
    }

    #[test]
    fn should_ignore_line_breaks_in_base64() {
        let generated = alice();
        let wrapped = generated
            .base64()
            .as_bytes()
            .chunks(64)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(Certificate::decode(&wrapped).is_ok());
    }

    #[test]
    fn should_render_subject_with_short_names() {
        let cert = alice().certificate();
        let subject = cert.subject();
        assert!(subject.contains("CN=Alice Smith"), "{subject}");
        assert!(subject.contains("UID=alice123"), "{subject}");
        assert_eq!(cert.common_name().as_deref(), Some("Alice Smith"));
        assert_eq!(cert.subject_fields().len(), 2);
    }

    #[test]
    fn should_render_domain_components_and_unknown_attributes() {
        let cert = TestCertificate::generate(&TestCertificateParams {
            subject: format!("{DC_OID}=example,2.5.4.42=Alice"),
            ..TestCertificateParams::valid_now()
        })
        .certificate();
        let keys = cert.subject_fields().into_iter().map(|(key, _)| key).collect::<Vec<_>>();
        assert!(keys.contains(&"DC".to_string()), "{keys:?}");
        // givenName has no short name here
        assert!(keys.contains(&"2.5.4.42".to_string()), "{keys:?}");
        assert_eq!(cert.client_id(UidSelection::First), "");
        assert_eq!(cert.common_name(), None);
    }

    #[test]
    fn self_signed_issuer_should_match_subject() {
        let cert = alice().certificate();
        assert_eq!(cert.issuer(), cert.subject());
        assert_eq!(cert.issuer_common_name().as_deref(), Some("Alice Smith"));
    }

    #[test]
    fn should_extract_client_id_from_generated_certificate() {
        let cert = alice().certificate();
        assert_eq!(cert.client_id(UidSelection::First), "alice123");
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   \n\t")]
    fn should_reject_empty_input(#[case] input: &str) {
        assert!(matches!(
            Certificate::decode(input),
            Err(CertificateError::InvalidArgument(_))
        ));
    }

    #[rstest]
    #[case::not_base64("this is definitely not base64 !!")]
    #[case::not_a_certificate("aGVsbG8gd29ybGQ=")]
    #[case::truncated_pem("-----BEGIN CERTIFICATE-----\nMIIC")]
    fn should_fail_decoding_garbage(#[case] input: &str) {
        assert!(matches!(Certificate::decode(input), Err(CertificateError::Decode(_))));
    }

    #[test]
    fn should_reject_non_certificate_pem() {
        let key = pem::encode(&pem::Pem::new("PRIVATE KEY", vec![1, 2, 3]));
        assert!(matches!(
            Certificate::decode(&key),
            Err(CertificateError::Decode(DecodeError::UnexpectedPemTag(tag))) if tag == "PRIVATE KEY"
        ));
    }
}

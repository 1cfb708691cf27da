//! Self-signed certificate generation for tests. Panics on any failure.

use core::time::Duration;
use std::str::FromStr as _;

use base64::Engine as _;
use x509_cert::{
    builder::{Builder as _, CertificateBuilder, Profile},
    der::{Encode as _, asn1::GeneralizedTime},
    name::Name,
    serial_number::SerialNumber,
    time::Validity,
};

use crate::certificate::Certificate;

/// Dotted form of the `UID` attribute type, usable in [TestCertificateParams::subject]
pub const UID_OID: &str = "0.9.2342.19200300.100.1.1";
/// Dotted form of the `DC` attribute type
pub const DC_OID: &str = "0.9.2342.19200300.100.1.25";

/// Params for generating a test certificate
#[derive(Debug, Clone)]
pub struct TestCertificateParams {
    /// RFC 4514 subject, also used as issuer
    pub subject: String,
    /// Unix timestamp
    pub not_before: u64,
    /// Unix timestamp
    pub not_after: u64,
}

impl TestCertificateParams {
    /// Valid from one hour ago until one hour from now
    pub fn valid_now() -> Self {
        let now = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .expect("clock is after the epoch")
            .as_secs();
        Self {
            subject: "CN=Test Client".to_string(),
            not_before: now - 3600,
            not_after: now + 3600,
        }
    }
}

/// A generated certificate along with the public key it certifies
#[derive(Debug, Clone)]
pub struct TestCertificate {
    /// DER encoding
    pub der: Vec<u8>,
    /// Raw content of the 'Subject Public Key' bit string
    pub public_key: Vec<u8>,
}

impl TestCertificate {
    /// Generates a self-signed P-256 certificate for a fresh key pair
    pub fn generate(params: &TestCertificateParams) -> Self {
        let signing_key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let spki = spki::SubjectPublicKeyInfoOwned::from_key(*signing_key.verifying_key())
            .expect("encoding the public key");
        let public_key = spki.subject_public_key.raw_bytes().to_vec();

        let subject = Name::from_str(&params.subject).expect("subject is a valid RFC 4514 name");
        let validity = Validity {
            not_before: GeneralizedTime::from_unix_duration(Duration::from_secs(params.not_before))
                .expect("not_before is representable")
                .into(),
            not_after: GeneralizedTime::from_unix_duration(Duration::from_secs(params.not_after))
                .expect("not_after is representable")
                .into(),
        };

        let builder = CertificateBuilder::new(
            Profile::Root,
            SerialNumber::from(u64::from(rand::random::<u32>()) + 1),
            validity,
            subject,
            spki,
            &signing_key,
        )
        .expect("building the certificate");
        let certificate = builder
            .build::<p256::ecdsa::DerSignature>()
            .expect("signing the certificate");

        Self {
            der: certificate.to_der().expect("encoding the certificate"),
            public_key,
        }
    }

    /// Standard base64 of the DER bytes, as sent over the wire
    pub fn base64(&self) -> String {
        base64::prelude::BASE64_STANDARD.encode(&self.der)
    }

    /// PEM encoding
    pub fn pem(&self) -> String {
        pem::encode(&pem::Pem::new("CERTIFICATE", self.der.clone()))
    }

    /// Parsed form
    pub fn certificate(&self) -> Certificate {
        Certificate::from_der(&self.der).expect("generated certificate parses")
    }
}

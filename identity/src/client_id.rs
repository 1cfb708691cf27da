use crate::{
    certificate::Certificate,
    error::{CertificateError, CertificateResult},
};

/// Attribute keys containing this literal are considered to carry the client identifier
const UID_MARKER: &str = "UID";

/// Which attribute wins when a subject carries more than one UID-like attribute.
///
/// Subjects with several such attributes are ambiguous; the default picks the first one in
/// subject order. [UidSelection::Last] reproduces what older clients did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum UidSelection {
    /// First matching attribute in subject order
    #[default]
    First,
    /// Last matching attribute in subject order
    Last,
}

/// Extracts the client identifier from a subject of the form `KEY=VALUE, KEY=VALUE, ...`.
///
/// An attribute matches when its key contains `UID`; its value is everything after the first
/// `=`. Attributes without `=` are skipped. Never fails: no match yields an empty string.
pub fn client_id_from_subject(subject: &str, selection: UidSelection) -> String {
    let mut candidates = subject.split(',').filter_map(|attribute| {
        let (key, value) = attribute.trim().split_once('=')?;
        key.contains(UID_MARKER).then_some(value)
    });

    let found = match selection {
        UidSelection::First => candidates.next(),
        UidSelection::Last => candidates.last(),
    };
    found.map(str::to_string).unwrap_or_default()
}

/// Extracts the client identifier from a certificate subject.
///
/// Only an absent certificate is an error; a subject without UID yields an empty string.
pub fn extract_client_id(certificate: Option<&Certificate>, selection: UidSelection) -> CertificateResult<String> {
    let certificate = certificate.ok_or(CertificateError::InvalidArgument("certificate is absent"))?;
    Ok(certificate.client_id(selection))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::leading("UID=alice123, DC=example", "alice123")]
    #[case::trailing("DC=example, UID=bob456", "bob456")]
    #[case::no_spaces("CN=Bob,UID=bob456,DC=example", "bob456")]
    #[case::missing("CN=Carol, DC=example", "")]
    #[case::empty("", "")]
    #[case::key_contains_marker("X-UID=dave, DC=example", "dave")]
    #[case::value_keeps_later_equals("UID=a=b, DC=example", "a=b")]
    #[case::attribute_without_equals("UID, DC=example", "")]
    #[case::lowercase_is_not_a_match("uid=erin, DC=example", "")]
    fn should_extract_uid(#[case] subject: &str, #[case] expected: &str) {
        assert_eq!(client_id_from_subject(subject, UidSelection::First), expected);
        assert_eq!(client_id_from_subject(subject, UidSelection::Last), expected);
    }

    #[test]
    fn selection_should_decide_between_several_uids() {
        let subject = "UID=first, CN=Someone, UID=second";
        assert_eq!(client_id_from_subject(subject, UidSelection::First), "first");
        assert_eq!(client_id_from_subject(subject, UidSelection::Last), "second");
    }

    #[test]
    fn default_selection_should_be_first() {
        assert_eq!(UidSelection::default(), UidSelection::First);
    }

    #[test]
    fn absent_certificate_should_be_invalid_argument() {
        assert!(matches!(
            extract_client_id(None, UidSelection::First),
            Err(CertificateError::InvalidArgument(_))
        ));
    }
}

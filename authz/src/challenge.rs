//! Deciding from an HTTP response whether the request failed for lack of authorization

use std::collections::HashMap;

use typed_builder::TypedBuilder;

/// Header name to ordered header values, as the transport delivered them
///
/// Names are compared exactly as given: normalizing their case is up to the transport.
pub type Headers = HashMap<String, Vec<String>>;

/// Status code of `401 Unauthorized`
pub const UNAUTHORIZED: u16 = 401;

/// Header carrying the challenge in an unauthorized response
pub const WWW_AUTHENTICATE: &str = "WWW-Authenticate";

/// Response metadata read through a stateful handle, e.g. a live connection.
///
/// Reading may fail, for instance when the connection was reset while the response was inspected.
pub trait ResponseMetadata {
    fn status(&self) -> std::io::Result<u16>;
    fn headers(&self) -> std::io::Result<Headers>;
}

/// Decides whether a response is an authorization challenge
pub trait ChallengeDetector: std::fmt::Debug + Send + Sync {
    /// Decision from a status code and the response headers
    fn is_challenge(&self, status: u16, headers: &Headers) -> bool;

    /// Decision from a live response handle. Fails when its metadata cannot be read.
    fn is_challenge_on(&self, response: &dyn ResponseMetadata) -> std::io::Result<bool> {
        let status = response.status()?;
        let headers = response.headers()?;
        Ok(self.is_challenge(status, &headers))
    }
}

/// For backends which do not use this protocol: never a challenge
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChallenge;

impl ChallengeDetector for NoChallenge {
    fn is_challenge(&self, _status: u16, _headers: &Headers) -> bool {
        false
    }
}

/// Recognizes a challenge by its status code and/or a challenge header
///
/// With `require_header` unset, either a recognized status or a matching challenge header is
/// enough. With it set, both are needed.
#[derive(Debug, Clone, TypedBuilder)]
pub struct StatusChallengeDetector {
    /// Status codes signaling a challenge
    #[builder(default = vec![UNAUTHORIZED], setter(transform = |iter: impl IntoIterator<Item = u16>| iter.into_iter().collect()))]
    pub statuses: Vec<u16>,
    /// Header carrying the challenge, `None` to decide on the status alone
    #[builder(default = Some(WWW_AUTHENTICATE.to_string()), setter(strip_option(fallback = challenge_header_opt), into))]
    pub challenge_header: Option<String>,
    /// Authentication scheme the challenge header must announce (e.g. `Bearer`), any when unset
    #[builder(default, setter(strip_option(fallback = scheme_opt), into))]
    pub scheme: Option<String>,
    /// Whether the challenge header is required on top of a recognized status
    #[builder(default)]
    pub require_header: bool,
}

impl Default for StatusChallengeDetector {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StatusChallengeDetector {
    fn has_challenge_header(&self, headers: &Headers) -> bool {
        let Some(values) = self.challenge_header.as_ref().and_then(|name| headers.get(name)) else {
            return false;
        };
        match &self.scheme {
            None => !values.is_empty(),
            Some(scheme) => values.iter().any(|value| {
                value
                    .split_whitespace()
                    .next()
                    .is_some_and(|announced| announced.eq_ignore_ascii_case(scheme))
            }),
        }
    }
}

impl ChallengeDetector for StatusChallengeDetector {
    fn is_challenge(&self, status: u16, headers: &Headers) -> bool {
        let status_matches = self.statuses.contains(&status);
        if self.require_header {
            status_matches && self.has_challenge_header(headers)
        } else {
            status_matches || self.has_challenge_header(headers)
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn headers(entries: &[(&str, &[&str])]) -> Headers {
        entries
            .iter()
            .map(|(name, values)| (name.to_string(), values.iter().map(ToString::to_string).collect()))
            .collect()
    }

    struct Connection {
        status: std::io::Result<u16>,
        headers: Headers,
    }

    impl ResponseMetadata for Connection {
        fn status(&self) -> std::io::Result<u16> {
            match &self.status {
                Ok(status) => Ok(*status),
                Err(e) => Err(std::io::Error::new(e.kind(), e.to_string())),
            }
        }

        fn headers(&self) -> std::io::Result<Headers> {
            Ok(self.headers.clone())
        }
    }

    #[rstest]
    #[case(200)]
    #[case(401)]
    #[case(403)]
    fn no_challenge_should_never_require_authorization(#[case] status: u16) {
        let headers = headers(&[(WWW_AUTHENTICATE, &["Bearer"])]);
        assert!(!NoChallenge.is_challenge(status, &headers));
    }

    #[rstest]
    #[case::unauthorized(401, &[], true)]
    #[case::ok(200, &[], false)]
    #[case::forbidden(403, &[], false)]
    #[case::header_alone(200, &[(WWW_AUTHENTICATE, &["Bearer realm=\"api\""] as &[&str])], true)]
    #[case::empty_header(200, &[(WWW_AUTHENTICATE, &[] as &[&str])], false)]
    #[case::other_header(200, &[("X-Other", &["Bearer"] as &[&str])], false)]
    #[case::case_sensitive_name(200, &[("www-authenticate", &["Bearer"] as &[&str])], false)]
    fn default_detector_should_accept_status_or_header(
        #[case] status: u16,
        #[case] entries: &[(&str, &[&str])],
        #[case] expected: bool,
    ) {
        let detector = StatusChallengeDetector::default();
        assert_eq!(detector.is_challenge(status, &headers(entries)), expected);
    }

    #[rstest]
    #[case::status_only(401, &[], false)]
    #[case::both(401, &[(WWW_AUTHENTICATE, &["bearer error=\"invalid_token\""] as &[&str])], true)]
    #[case::wrong_scheme(401, &[(WWW_AUTHENTICATE, &["Basic realm=\"api\""] as &[&str])], false)]
    #[case::any_value(401, &[(WWW_AUTHENTICATE, &["Basic", "Bearer"] as &[&str])], true)]
    #[case::header_only(200, &[(WWW_AUTHENTICATE, &["Bearer"] as &[&str])], false)]
    fn strict_detector_should_require_both(
        #[case] status: u16,
        #[case] entries: &[(&str, &[&str])],
        #[case] expected: bool,
    ) {
        let detector = StatusChallengeDetector::builder()
            .scheme("Bearer")
            .require_header(true)
            .build();
        assert_eq!(detector.is_challenge(status, &headers(entries)), expected);
    }

    #[test]
    fn detector_should_accept_custom_statuses_without_header() {
        let detector = StatusChallengeDetector::builder()
            .statuses([401, 407])
            .challenge_header_opt(None)
            .build();
        assert!(detector.is_challenge(407, &Headers::new()));
        assert!(!detector.is_challenge(200, &headers(&[(WWW_AUTHENTICATE, &["Bearer"])])));
    }

    #[test]
    fn live_connection_should_be_inspected() {
        let detector = StatusChallengeDetector::default();
        let connection = Connection {
            status: Ok(401),
            headers: Headers::new(),
        };
        assert!(detector.is_challenge_on(&connection).unwrap());
    }

    #[test]
    fn unreadable_connection_should_fail() {
        let connection = Connection {
            status: Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            headers: Headers::new(),
        };
        let err = StatusChallengeDetector::default()
            .is_challenge_on(&connection)
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
        assert!(NoChallenge.is_challenge_on(&connection).is_err());
    }
}

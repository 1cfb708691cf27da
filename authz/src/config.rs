use cert_authz_identity::UidSelection;
use typed_builder::TypedBuilder;

/// Storage key of the persisted credential when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "authorization-credential";

/// Configuration parameters for [AuthorizationManager][crate::AuthorizationManager]
///
/// These can be set directly or via the [builder][AuthorizationConfig::builder].
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct AuthorizationConfig {
    /// Scheme prefixing the access token in the header value
    #[builder(default = "Bearer".to_string(), setter(into))]
    pub header_scheme: String,
    /// Key the credential is persisted under
    #[builder(default = DEFAULT_STORAGE_KEY.to_string(), setter(into))]
    pub storage_key: String,
    /// Which UID attribute identifies the client when the certificate subject carries several
    #[builder(default)]
    pub uid_selection: UidSelection,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AuthorizationConfig {
    pub(crate) fn header_value(&self, access_token: &str) -> String {
        if self.header_scheme.is_empty() {
            access_token.to_string()
        } else {
            format!("{} {access_token}", self.header_scheme)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_should_produce_bearer_headers() {
        let config = AuthorizationConfig::default();
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.uid_selection, UidSelection::First);
        assert_eq!(config.header_value("abc"), "Bearer abc");
    }

    #[test]
    fn empty_scheme_should_yield_the_bare_token() {
        let config = AuthorizationConfig::builder().header_scheme("").build();
        assert_eq!(config.header_value("abc"), "abc");
    }
}

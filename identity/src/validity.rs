use web_time::{SystemTime, UNIX_EPOCH};

use crate::certificate::Certificate;

/// Margin absorbing clock drift between this client and the certificate issuer
pub const CLOCK_SKEW_TOLERANCE: core::time::Duration = core::time::Duration::from_secs(60);

/// Whether `reference_secs` falls inside `[not_before, not_after]` widened by
/// [CLOCK_SKEW_TOLERANCE] on both ends.
///
/// The lower bound is checked against `reference + tolerance` so that a certificate issued by a
/// server whose clock runs slightly ahead is accepted right away. The upper bound is checked
/// against `reference - tolerance`, so a certificate stays usable for at most one tolerance
/// period after it expired.
pub fn is_within_validity(not_before: u64, not_after: u64, reference_secs: u64) -> bool {
    let tolerance = CLOCK_SKEW_TOLERANCE.as_secs();
    let Some(ahead) = reference_secs.checked_add(tolerance) else {
        return false;
    };
    let behind = reference_secs.saturating_sub(tolerance);
    not_before <= ahead && behind <= not_after
}

/// Checks the certificate is time-valid at `reference_time` (see [is_within_validity]) and
/// that it certifies exactly `expected_public_key`.
///
/// Never fails: anything that prevents the check, e.g. a reference time before the Unix epoch,
/// is reported as `false`.
pub fn is_valid_against(certificate: &Certificate, expected_public_key: &[u8], reference_time: SystemTime) -> bool {
    let Ok(reference) = reference_time.duration_since(UNIX_EPOCH) else {
        return false;
    };
    is_within_validity(certificate.not_before(), certificate.not_after(), reference.as_secs())
        && certificate.public_key() == expected_public_key
}

impl Certificate {
    /// See [is_valid_against]
    pub fn is_valid_against(&self, expected_public_key: &[u8], reference_time: SystemTime) -> bool {
        is_valid_against(self, expected_public_key, reference_time)
    }
}

//! Trace ids for outbound attempts.

use rand::Rng;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 9;

/// Generates `X-Request-ID` values of the form `<epochMillis>-<9 base36 chars>`.
///
/// Every attempt gets a fresh id, including retries of the same logical
/// call, so server-side tracing can tell attempts apart.
///
/// # Example
///
/// ```rust
/// use shop_api_client::clients::RequestIdGenerator;
///
/// let id = RequestIdGenerator.generate();
/// let (millis, suffix) = id.split_once('-').unwrap();
/// assert!(millis.parse::<i64>().is_ok());
/// assert_eq!(suffix.len(), 9);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestIdGenerator;

impl RequestIdGenerator {
    /// Returns a new request id.
    #[must_use]
    pub fn generate(self) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
            .collect();
        format!("{millis}-{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_format_is_millis_dash_base36() {
        let id = RequestIdGenerator.generate();
        let (millis, suffix) = id.split_once('-').unwrap();

        let millis: i64 = millis.parse().unwrap();
        assert!(millis > 1_600_000_000_000);
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..10_000).map(|_| RequestIdGenerator.generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }
}

//! Correlation ids for log records.

use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a request id from the operating system's CSPRNG.
///
/// Ids are UUID v4 strings. If the OS source fails, a
/// `fallback-<nanos>-<counter>` id is returned instead and a warning logged.
pub fn generate_request_id() -> String {
    request_id_from(&mut OsRng)
}

pub(crate) fn request_id_from<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; 16];
    match rng.try_fill_bytes(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(err) => {
            warn!(error = %err, "random source unavailable, using fallback request id");
            fallback_request_id()
        }
    }
}

fn fallback_request_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("fallback-{:x}-{:x}", nanos, seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "entropy pool closed",
            )))
        }
    }

    #[test]
    fn ids_are_uuid_v4() {
        let id = generate_request_id();
        let parsed = uuid::Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn ids_are_distinct() {
        let ids: HashSet<_> = (0..1000).map(|_| generate_request_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn failing_source_falls_back() {
        let first = request_id_from(&mut BrokenRng);
        let second = request_id_from(&mut BrokenRng);
        assert!(first.starts_with("fallback-"));
        assert_ne!(first, second);
    }
}

use std::time::SystemTime;

use bridge_api::message::unix_seconds;

/// Object key generator for one destination.
///
/// Keys look like `1700000000-00000000000000000042-9f1c2ab3`: the flush second
/// (zero-padded, so lexical order is time order), a per-destination flush
/// sequence, and a run id drawn once per process. Two flushes in the same
/// second never share a key.
#[derive(Debug, Clone)]
pub struct ObjectKeys {
    run_id: String,
    sequence: u64,
}

impl ObjectKeys {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            sequence: 0,
        }
    }

    pub fn next(&mut self, at: SystemTime) -> String {
        let key = format!("{:010}-{:020}-{}", unix_seconds(at), self.sequence, self.run_id);
        self.sequence += 1;
        key
    }
}

/// Short random id distinguishing this process's keys from a restart's.
pub fn new_run_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn same_second_keys_differ_and_sort() {
        let mut keys = ObjectKeys::new("abcd1234");
        let at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let a = keys.next(at);
        let b = keys.next(at);
        assert_eq!(a, "1700000000-00000000000000000000-abcd1234");
        assert_eq!(b, "1700000000-00000000000000000001-abcd1234");
        assert!(a < b);
    }

    #[test]
    fn order_holds_past_eight_digit_sequences() {
        let mut keys = ObjectKeys::new("abcd1234");
        keys.sequence = 99_999_999;
        let at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let a = keys.next(at);
        let b = keys.next(at);
        assert!(a < b, "{a} should sort before {b}");

        // The widest sequence still lines up with the narrowest.
        keys.sequence = u64::MAX - 1;
        let last = keys.next(at);
        assert_eq!(last.len(), a.len());
    }

    #[test]
    fn run_id_is_eight_hex_chars() {
        let id = new_run_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

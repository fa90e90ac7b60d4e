/// Sortable identifiers for membership rows
///
/// Layout (128 bits, Crockford base32, 26 chars):
/// - 48 bits: unix time in milliseconds
/// - 80 bits: random suffix, strictly increasing within one millisecond
///
/// Each call seeds a `SmallRng` from the OS CSPRNG; the fast generator only
/// produces the suffix, which needs to be collision resistant, not secret.
use crate::models::MembershipLinkId;
use chrono::{DateTime, Utc};
use rand::rngs::{OsRng, SmallRng};
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Mutex;

const ENCODING: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ENCODED_LEN: usize = 26;
const TIMESTAMP_MAX: u64 = (1 << 48) - 1;
const RANDOM_BITS: u32 = 80;
const RANDOM_MAX: u128 = (1 << RANDOM_BITS) - 1;
/// Largest increment applied to the suffix inside one millisecond
const MAX_STEP: u128 = 1 << 32;

#[derive(Debug, Default)]
struct Cursor {
    timestamp_ms: u64,
    random: u128,
}

/// Mints a fresh `MembershipLinkId` per call
#[derive(Debug, Default)]
pub struct MembershipIdGenerator {
    last: Mutex<Option<Cursor>>,
}

impl MembershipIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_id(&self, now: DateTime<Utc>) -> MembershipLinkId {
        let mut rng = SmallRng::seed_from_u64(OsRng.next_u64());
        let now_ms = (now.timestamp_millis().max(0) as u64).min(TIMESTAMP_MAX);

        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (timestamp_ms, random) = match last.as_ref() {
            // Same millisecond (or a clock step backwards): stay after the previous id.
            Some(prev) if now_ms <= prev.timestamp_ms => {
                let step = rng.gen_range(1..=MAX_STEP);
                match prev.random.checked_add(step).filter(|r| *r <= RANDOM_MAX) {
                    Some(random) => (prev.timestamp_ms, random),
                    None if prev.timestamp_ms < TIMESTAMP_MAX => {
                        (prev.timestamp_ms + 1, rng.gen::<u128>() & RANDOM_MAX)
                    }
                    // Id space exhausted: saturate rather than sort backwards.
                    None => (prev.timestamp_ms, (prev.random + 1).min(RANDOM_MAX)),
                }
            }
            _ => (now_ms, rng.gen::<u128>() & RANDOM_MAX),
        };

        *last = Some(Cursor {
            timestamp_ms,
            random,
        });
        drop(last);

        MembershipLinkId::from_encoded(encode(timestamp_ms, random))
    }
}

fn encode(timestamp_ms: u64, random: u128) -> String {
    let mut value = ((timestamp_ms as u128) << RANDOM_BITS) | random;
    let mut buf = [0u8; ENCODED_LEN];
    for slot in buf.iter_mut().rev() {
        *slot = ENCODING[(value & 0x1f) as usize];
        value >>= 5;
    }
    buf.iter().map(|b| *b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_encoded_shape() {
        let id = MembershipIdGenerator::new().new_id(base_time());
        assert_eq!(id.as_str().len(), ENCODED_LEN);
        assert!(id.as_str().bytes().all(|b| ENCODING.contains(&b)));
    }

    #[test]
    fn test_timestamp_prefix_is_stable_for_same_millisecond() {
        assert_eq!(&encode(1_714_564_800_000, 0)[..10], &encode(1_714_564_800_000, RANDOM_MAX)[..10]);
        assert_eq!(encode(0, 0), "0".repeat(ENCODED_LEN));
    }

    #[test]
    fn test_ten_thousand_increasing_timestamps_are_distinct_and_sorted() {
        let generator = MembershipIdGenerator::new();
        let start = base_time();

        let ids: Vec<String> = (0..10_000)
            .map(|i| generator.new_id(start + Duration::milliseconds(i)).to_string())
            .collect();

        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_repeated_calls_in_same_millisecond_strictly_increase() {
        let generator = MembershipIdGenerator::new();
        let now = base_time();

        let ids: Vec<MembershipLinkId> = (0..1_000).map(|_| generator.new_id(now)).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_clock_step_backwards_keeps_order() {
        let generator = MembershipIdGenerator::new();
        let first = generator.new_id(base_time());
        let second = generator.new_id(base_time() - Duration::seconds(5));
        assert!(first < second);
    }

    #[test]
    fn test_suffix_overflow_rolls_into_next_millisecond() {
        let generator = MembershipIdGenerator::new();
        *generator.last.lock().unwrap() = Some(Cursor {
            timestamp_ms: 1_000,
            random: RANDOM_MAX,
        });

        let id = generator.new_id(Utc.timestamp_millis_opt(1_000).unwrap());
        assert_eq!(&id.as_str()[..10], &encode(1_001, 0)[..10]);
    }

    #[test]
    fn test_exhausted_id_space_never_sorts_backwards() {
        let generator = MembershipIdGenerator::new();
        let near_end = RANDOM_MAX - 3;
        *generator.last.lock().unwrap() = Some(Cursor {
            timestamp_ms: TIMESTAMP_MAX,
            random: near_end,
        });
        let previous = encode(TIMESTAMP_MAX, near_end);
        let now = Utc::now();

        let ids: Vec<String> = (0..5).map(|_| generator.new_id(now).to_string()).collect();

        assert!(ids[0] > previous);
        assert!(ids.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(ids[4], encode(TIMESTAMP_MAX, RANDOM_MAX));
    }
}

//! Property tests for timestamps and digests

use chrono::{TimeZone, Utc};
use fretlog_model::{Document, DocumentDigest, TaskRecord, Timestamp, TimestampKey};
use proptest::prelude::*;
use serde_json::json;

// 2000-01-01 .. 2040-01-01
fn millis() -> impl Strategy<Value = i64> {
    946_684_800_000_i64..2_208_988_800_000_i64
}

proptest! {
    #[test]
    fn prop_encodings_of_one_instant_share_a_key(ms in millis()) {
        let text = Timestamp::from_instant(Utc.timestamp_millis_opt(ms).unwrap());
        prop_assert_eq!(text.key(), Timestamp::Millis(ms).key());
        prop_assert_eq!(text.key(), TimestampKey::Instant(ms));
    }

    #[test]
    fn prop_is_after_agrees_with_key_order(a in millis(), b in millis()) {
        let (a, b) = (Timestamp::Millis(a), Timestamp::Millis(b));
        prop_assert_eq!(a.is_after(&b), a.key() > b.key());
        prop_assert!(!(a.is_after(&b) && b.is_after(&a)));
    }

    #[test]
    fn prop_completion_recency_is_asymmetric(a in proptest::option::of(millis()), b in proptest::option::of(millis())) {
        let record = |ms: Option<i64>| {
            let record = TaskRecord::new("daily-1");
            match ms {
                Some(ms) => record.completed_at(Timestamp::Millis(ms)),
                None => record,
            }
        };
        let (x, y) = (record(a), record(b));
        prop_assert!(!(x.completed_after(&y) && y.completed_after(&x)));
        prop_assert!(!x.completed_after(&x));
    }

    #[test]
    fn prop_digest_ignores_key_order(answers in proptest::collection::btree_map("[a-z]{1,8}", "[a-z]{0,8}", 0..8)) {
        let mut forward = Document::default();
        let mut backward = Document::default();
        for (k, v) in &answers {
            forward.inspection_data.insert(k.clone(), json!(v));
        }
        for (k, v) in answers.iter().rev() {
            backward.inspection_data.insert(k.clone(), json!(v));
        }
        prop_assert_eq!(DocumentDigest::of(&forward).unwrap(), DocumentDigest::of(&backward).unwrap());
    }
}

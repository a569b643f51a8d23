//! Property-based tests for the board layout codec.
//!
//! Uses proptest to verify:
//! 1. Any layout survives encode → decode.
//! 2. Random bytes never cause a panic in `decode` (returns `Err` gracefully).
//! 3. Layouts tagged with a foreign version are rejected.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use taskboard_proto::layout::{BoardLayout, CodecError, ColumnLayout, LAYOUT_VERSION, decode, encode};
use taskboard_proto::task::TaskId;

fn arb_column() -> impl Strategy<Value = ColumnLayout> {
    (
        "[A-Za-z ]{0,16}",
        prop::collection::vec("[0-9a-f-]{1,36}".prop_map(TaskId::from), 0..12),
    )
        .prop_map(|(label, items)| ColumnLayout { label, items })
}

fn arb_layout() -> impl Strategy<Value = BoardLayout> {
    (
        prop_oneof![Just("category"), Just("priority"), Just("status")],
        prop::collection::vec(arb_column(), 0..8),
    )
        .prop_map(|(grouping, columns)| BoardLayout {
            grouping: grouping.to_string(),
            columns,
        })
}

proptest! {
    #[test]
    fn layout_round_trip(layout in arb_layout()) {
        let bytes = encode(&layout).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), layout);
    }

    #[test]
    fn random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode(&bytes);
    }

    #[test]
    fn foreign_version_is_rejected(layout in arb_layout(), version in any::<u8>()) {
        prop_assume!(version != LAYOUT_VERSION);
        let mut bytes = encode(&layout).unwrap();
        bytes[0] = version;
        let rejected = matches!(decode(&bytes), Err(CodecError::UnsupportedVersion { found }) if found == version);
        prop_assert!(rejected);
    }
}

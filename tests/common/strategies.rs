use proptest::prelude::*;

/// Peer node ids, excluding the node under test ("node-a"), deduplicated
pub fn peer_ids_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set("node-[b-z][0-9]{0,2}", 0..8)
        .prop_map(|peers| peers.into_iter().collect())
}

/// Which queue an earlier instance of a periodic task sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residence {
    Global,
    Delayed,
    Processing,
    OwnLocal,
    PeerLocal,
}

pub fn residence_strategy() -> impl Strategy<Value = Residence> {
    prop_oneof![
        Just(Residence::Global),
        Just(Residence::Delayed),
        Just(Residence::Processing),
        Just(Residence::OwnLocal),
        Just(Residence::PeerLocal),
    ]
}

/// Future offsets for `runAt`, in milliseconds
pub fn run_at_offset_strategy() -> impl Strategy<Value = i64> {
    1i64..600_000
}

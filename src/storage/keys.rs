//! Storage key layout and the prefix dispatch table.

use crate::model::Pubkey;

pub const USER_UNDELEGATIONS: &str = "user_undelegations";
pub const RESERVERS_ADDRESSES: &str = "reservers_addresses";
pub const USERS_RESERVES: &str = "users_reserves";
pub const USERS_RESERVES_ITEM: &str = "users_reserves.item";
pub const USERS_RESERVE_POINTS: &str = "users_reserve_points";
pub const RESERVE_POINTS: &str = "reserve_points";
pub const RESERVE_UNDELEGATIONS: &str = "reserve_undelegations";
pub const EGLD_RESERVE: &str = "egld_reserve";
pub const LIQUID_TOKEN_ID: &str = "liquid_token_id";
pub const UNDELEGATE_NOW_FEE: &str = "undelegate_now_fee";
pub const PROVIDER_ADDRESS: &str = "provider_address";
pub const UNBOND_PERIOD: &str = "unbond_period";
pub const STATE: &str = "state";
pub const EGLD_IN_LP: &str = "egld_in_lp";
pub const LEGLD_IN_LP: &str = "legld_in_lp";
pub const EXCESS_LP_EGLD: &str = "excess_lp_egld";
pub const EXCESS_LP_LEGLD: &str = "excess_lp_legld";

/// Raw storage key bytes: a literal prefix plus an optional suffix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageKey(Vec<u8>);

impl StorageKey {
    pub fn named(prefix: &str) -> Self {
        StorageKey(prefix.as_bytes().to_vec())
    }

    /// `prefix ++ pubkey`
    pub fn for_user(prefix: &str, user: &Pubkey) -> Self {
        let mut raw = prefix.as_bytes().to_vec();
        raw.extend_from_slice(user.as_bytes());
        StorageKey(raw)
    }

    /// `prefix ++ u32be(index)`, i.e. eight zero-padded hex digits once
    /// the key is hex-encoded.
    pub fn item(prefix: &str, index: u32) -> Self {
        let mut raw = prefix.as_bytes().to_vec();
        raw.extend_from_slice(&index.to_be_bytes());
        StorageKey(raw)
    }

    pub fn from_raw(raw: Vec<u8>) -> Self {
        StorageKey(raw)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(s).map(StorageKey)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

// ── Prefix dispatch ─────────────────────────────────────────────────

/// Record kinds the reconciler understands, one per key shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// `user_undelegations ++ pubkey` → repeated undelegations.
    UserUndelegations,
    /// `reservers_addresses ++ pubkey` → index into `users_reserves.item`.
    ReserverIndex,
    /// `users_reserves.item ++ u32be` → reserve amount.
    ReserveItem,
    /// `users_reserve_points ++ pubkey` → reserve points.
    UserReservePoints,
    /// `users_reserves` → packed `(pubkey, amount)` blob.
    PackedReserves,
    /// `reserve_undelegations` → repeated undelegations.
    ReserveUndelegations,
}

impl RecordKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            RecordKind::UserUndelegations => USER_UNDELEGATIONS,
            RecordKind::ReserverIndex => RESERVERS_ADDRESSES,
            RecordKind::ReserveItem => USERS_RESERVES_ITEM,
            RecordKind::UserReservePoints => USERS_RESERVE_POINTS,
            RecordKind::PackedReserves => USERS_RESERVES,
            RecordKind::ReserveUndelegations => RESERVE_UNDELEGATIONS,
        }
    }

    /// Exact byte length of the suffix after the prefix.
    pub fn suffix_len(&self) -> usize {
        match self {
            RecordKind::UserUndelegations
            | RecordKind::ReserverIndex
            | RecordKind::UserReservePoints => 32,
            RecordKind::ReserveItem => 4,
            RecordKind::PackedReserves | RecordKind::ReserveUndelegations => 0,
        }
    }
}

/// Longest prefix first, so `users_reserves.item` wins over `users_reserves`.
const DISPATCH: [RecordKind; 6] = [
    RecordKind::ReserveUndelegations,
    RecordKind::UserReservePoints,
    RecordKind::ReserverIndex,
    RecordKind::ReserveItem,
    RecordKind::UserUndelegations,
    RecordKind::PackedReserves,
];

/// How a key matched the dispatch table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified<'a> {
    /// Known kind with a correctly sized suffix.
    Record(RecordKind, &'a [u8]),
    /// Known prefix, but the suffix has the wrong size (`.len`, `.info`, ...).
    OtherSuffix(RecordKind),
    /// No known prefix.
    Unknown,
}

pub fn classify(key: &[u8]) -> Classified<'_> {
    for kind in DISPATCH {
        let prefix = kind.prefix().as_bytes();
        if let Some(suffix) = key.strip_prefix(prefix) {
            if suffix.len() == kind.suffix_len() {
                return Classified::Record(kind, suffix);
            }
            return Classified::OtherSuffix(kind);
        }
    }
    Classified::Unknown
}

mod ledger_common;

use alloy::primitives::U256;

use salsa_recon::invariants::{self, DEFAULT_TOLERANCE, Invariant};
use salsa_recon::model::amount::{egld, to_egld};
use salsa_recon::model::{ContractState, ReserveShape};
use salsa_recon::reconcile::{ReconError, reconcile};
use salsa_recon::storage::RawState;
use salsa_recon::storage::keys::{self, StorageKey};

use ledger_common::*;

// ── Helpers ──────────────────────────────────────────────────────────

/// Three reservers holding 500 EGLD in a packed blob, 200 EGLD of it
/// undelegating, and two users with pending undelegations.
fn synthetic_state() -> RawState {
    StateBuilder::new()
        .scalars(egld(10_000), egld(500), egld(300), egld(9_500))
        .named(
            keys::USERS_RESERVES,
            packed_reserves(&[
                (user(1), egld(100)),
                (user(2), egld(250)),
                (user(3), egld(150)),
            ]),
        )
        .named(
            keys::RESERVE_UNDELEGATIONS,
            undelegations(&[(egld(120), 40), (egld(80), 42)]),
        )
        .for_user(
            keys::USER_UNDELEGATIONS,
            &user(7),
            undelegations(&[(egld(5), 40), (egld(6), 41)]),
        )
        .for_user(
            keys::USER_UNDELEGATIONS,
            &user(8),
            undelegations(&[(egld(1), 43)]),
        )
        .build()
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn synthetic_dataset_reconciles_without_mismatch() {
    let state = reconcile(&synthetic_state()).unwrap();

    assert_eq!(state.global.state, ContractState::Active);
    assert_eq!(state.global.liquid_token_id, "LEGLD-d74da9");
    assert_eq!(state.global.unbond_period, 10);
    assert_eq!(state.global.provider_address, user(200));
    assert_eq!(state.global.undelegate_now_fee_percent(), 2.0);

    assert_eq!(state.reserve_shape, ReserveShape::PackedBlob);
    assert_eq!(state.reserves.len(), 3);
    assert_eq!(state.reserves[&user(2)], egld(250));
    assert_eq!(state.total_reserve_shares(), egld(500));
    assert_eq!(state.total_reserve_undelegations(), egld(200));

    assert_eq!(state.user_undelegations.len(), 2);
    assert_eq!(state.user_undelegations[&user(7)].len(), 2);
    assert_eq!(state.user_undelegations[&user(7)][1].unbond_epoch, 41);
    assert_eq!(state.total_user_undelegations(), egld(12));

    let report = invariants::check(&state, DEFAULT_TOLERANCE);
    assert!(report.all_passed());
    assert!(report.checks.iter().all(|c| c.drift == 0.0));
}

#[test]
fn indexed_reserve_follows_index_to_item() {
    let pk = user(5);
    let raw = StateBuilder::new()
        .scalars(egld(1_000), egld(500), egld(500), egld(1_000))
        .for_user(keys::RESERVERS_ADDRESSES, &pk, top_u64(3))
        .key(StorageKey::item(keys::USERS_RESERVES_ITEM, 3), top(egld(500)))
        .key(StorageKey::item(keys::USERS_RESERVES_ITEM, 4), top(egld(1)))
        .build();

    let state = reconcile(&raw).unwrap();

    assert_eq!(state.reserve_shape, ReserveShape::IndexedItems);
    assert_eq!(state.reserves.len(), 1);
    assert_eq!(to_egld(state.reserves[&pk]), 500.0);
    assert!(invariants::check(&state, DEFAULT_TOLERANCE).all_passed());
}

#[test]
fn indexed_reserve_with_absent_item_reads_zero() {
    let raw = StateBuilder::new()
        .scalars(egld(1_000), egld(500), egld(500), egld(1_000))
        .for_user(keys::RESERVERS_ADDRESSES, &user(5), top_u64(1))
        .for_user(keys::RESERVERS_ADDRESSES, &user(6), top_u64(2))
        .key(StorageKey::item(keys::USERS_RESERVES_ITEM, 2), top(egld(500)))
        .build();

    let state = reconcile(&raw).unwrap();

    assert_eq!(state.reserve_shape, ReserveShape::IndexedItems);
    assert_eq!(state.reserves[&user(5)], U256::ZERO);
    assert_eq!(state.reserves[&user(6)], egld(500));
    assert!(invariants::check(&state, DEFAULT_TOLERANCE).all_passed());
}

#[test]
fn points_convert_pro_rata_to_reserve() {
    let raw = StateBuilder::new()
        .scalars(egld(1_000), egld(100), egld(100), egld(1_000))
        .named(keys::EGLD_RESERVE, top(egld(100)))
        .named(keys::RESERVE_POINTS, top_u64(4))
        .for_user(keys::USERS_RESERVE_POINTS, &user(1), top_u64(1))
        .for_user(keys::USERS_RESERVE_POINTS, &user(2), top_u64(3))
        .build();

    let state = reconcile(&raw).unwrap();

    assert_eq!(state.reserve_shape, ReserveShape::Points);
    assert_eq!(state.reserves[&user(1)], egld(25));
    assert_eq!(state.reserves[&user(2)], egld(75));
    assert!(invariants::check(&state, DEFAULT_TOLERANCE).all_passed());
}

#[test]
fn zero_total_points_with_holders_is_an_error() {
    let raw = StateBuilder::new()
        .named(keys::EGLD_RESERVE, top(egld(100)))
        .for_user(keys::USERS_RESERVE_POINTS, &user(1), top_u64(1))
        .build();
    assert!(matches!(
        reconcile(&raw),
        Err(ReconError::ZeroReservePoints { users: 1 })
    ));
}

#[test]
fn points_layout_wins_over_older_layouts() {
    let raw = StateBuilder::new()
        .named(keys::EGLD_RESERVE, top(egld(10)))
        .named(keys::RESERVE_POINTS, top_u64(1))
        .for_user(keys::USERS_RESERVE_POINTS, &user(1), top_u64(1))
        .named(keys::USERS_RESERVES, packed_reserves(&[(user(2), egld(99))]))
        .build();

    let state = reconcile(&raw).unwrap();
    assert_eq!(state.reserve_shape, ReserveShape::Points);
    assert!(!state.reserves.contains_key(&user(2)));
}

#[test]
fn malformed_user_queue_aborts_the_pass() {
    let mut broken = undelegations(&[(egld(1), 10)]);
    broken.truncate(broken.len() - 3);

    let raw = StateBuilder::new()
        .for_user(keys::USER_UNDELEGATIONS, &user(1), undelegations(&[(egld(2), 9)]))
        .for_user(keys::USER_UNDELEGATIONS, &user(2), broken)
        .build();

    match reconcile(&raw) {
        Err(ReconError::MalformedRecord {
            key,
            offset,
            decoded,
            ..
        }) => {
            assert!(key.starts_with(keys::USER_UNDELEGATIONS));
            assert_eq!(offset, 0);
            assert_eq!(decoded, 0);
        }
        other => panic!("expected malformed record, got {other:?}"),
    }
}

#[test]
fn malformed_packed_blob_aborts_the_pass() {
    let mut blob = packed_reserves(&[(user(1), egld(10)), (user(2), egld(20))]);
    blob.truncate(40);
    let raw = StateBuilder::new()
        .named(keys::USERS_RESERVES, blob)
        .build();
    assert!(matches!(
        reconcile(&raw),
        Err(ReconError::MalformedRecord { decoded: 0, .. })
    ));
}

#[test]
fn user_key_with_short_suffix_is_rejected() {
    let mut key = keys::USER_UNDELEGATIONS.as_bytes().to_vec();
    key.extend_from_slice(&[7u8; 31]);
    let raw = StateBuilder::new()
        .key(StorageKey::from_raw(key), undelegations(&[(egld(1), 1)]))
        .build();
    assert!(matches!(
        reconcile(&raw),
        Err(ReconError::MalformedKey { len: 31, .. })
    ));
}

#[test]
fn mapper_metadata_keys_are_skipped() {
    let raw = StateBuilder::new()
        .named("users_reserves.len", top_u64(2))
        .named("reserve_undelegations.info", vec![0, 0, 0, 1])
        .build();
    let state = reconcile(&raw).unwrap();
    assert_eq!(state.reserve_shape, ReserveShape::Empty);
    assert!(state.reserve_undelegations.is_empty());
}

#[test]
fn absent_reserve_undelegations_is_an_empty_queue() {
    let raw = StateBuilder::new()
        .scalars(egld(10), egld(50), egld(50), egld(10))
        .named(keys::USERS_RESERVES, packed_reserves(&[(user(1), egld(50))]))
        .build();
    let state = reconcile(&raw).unwrap();
    assert!(state.reserve_undelegations.is_empty());
    assert!(invariants::check(&state, DEFAULT_TOLERANCE).all_passed());
}

#[test]
fn mismatch_is_reported_not_raised() {
    let raw = StateBuilder::new()
        .scalars(egld(1_000), egld(500), egld(500), egld(1_000))
        .named(keys::USERS_RESERVES, packed_reserves(&[(user(1), egld(400))]))
        .build();

    let state = reconcile(&raw).unwrap();
    let report = invariants::check(&state, DEFAULT_TOLERANCE);

    assert!(!report.all_passed());
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].invariant, Invariant::ReserveMatchesShares);
    assert_eq!(failures[0].invariant.label(), "egld reserve mismatch (1)");
    assert!((failures[0].drift - 100.0).abs() < 1e-9);
    // Reconciled data is left as decoded.
    assert_eq!(state.reserves[&user(1)], egld(400));
}

#[test]
fn drift_within_tolerance_passes() {
    let raw = StateBuilder::new()
        .scalars(egld(1), egld(500), egld(500), egld(1))
        .named(
            keys::USERS_RESERVES,
            packed_reserves(&[(user(1), egld(500) - U256::from(1_000_000u64))]),
        )
        .build();
    let state = reconcile(&raw).unwrap();
    assert!(invariants::check(&state, DEFAULT_TOLERANCE).all_passed());
    assert!(!invariants::check(&state, 0.0).all_passed());
}

#[test]
fn unknown_contract_state_is_an_error() {
    let raw = StateBuilder::new().view("getState", top_u64(7)).build();
    assert!(matches!(reconcile(&raw), Err(ReconError::UnknownState(7))));
}

#[test]
fn missing_view_is_an_error() {
    let mut raw = StateBuilder::new().build();
    raw.views.remove("getEgldReserve");
    assert!(matches!(reconcile(&raw), Err(ReconError::Fetch(_))));
}

#[test]
fn token_price_is_staked_over_supply() {
    let state = reconcile(&synthetic_state()).unwrap();
    let price = state.global.token_price();
    assert!((price - 10_000.0 / 9_500.0).abs() < 1e-12);

    let empty = reconcile(&StateBuilder::new().build()).unwrap();
    assert_eq!(empty.global.token_price(), 1.0);
}

#[test]
fn withdrawable_entries_follow_epoch() {
    let state = reconcile(&synthetic_state()).unwrap();
    let queue = &state.user_undelegations[&user(7)];
    assert!(queue[0].is_withdrawable(40));
    assert!(!queue[1].is_withdrawable(40));
}

#[test]
fn snapshot_file_round_trips() {
    let raw = synthetic_state();
    let path = std::env::temp_dir().join(format!("salsa-recon-{}.json", std::process::id()));
    raw.save(&path).unwrap();
    let loaded = RawState::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.storage, raw.storage);
    assert_eq!(loaded.views, raw.views);
    let a = reconcile(&raw).unwrap();
    let b = reconcile(&loaded).unwrap();
    assert_eq!(a.reserves, b.reserves);
    assert_eq!(a.user_undelegations, b.user_undelegations);
}

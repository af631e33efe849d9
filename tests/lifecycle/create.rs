use sdls_sadb::{
    FrameType, SaCandidate, SaDao, SaFilter, SaState, SaStore, SadbError, SpiScid,
};

use crate::tc;

fn spi_follows_highest_in_use<S: SaStore>(dao: &SaDao<S>) {
    assert_eq!(dao.create(&tc(0)).unwrap().id.spi, 1);
    assert_eq!(dao.create(&tc(0)).unwrap().id.spi, 2);
    dao.create(&tc(1).with_spi(40)).unwrap();
    assert_eq!(dao.create(&tc(2)).unwrap().id.spi, 41);

    // the counter is per (scid, frame type)
    let aos = dao
        .create(&SaCandidate::new(FrameType::Aos, 46, 1, 0, 0))
        .unwrap();
    assert_eq!(aos.id.spi, 1);
    let other = dao.create(&SaCandidate::new(FrameType::Tc, 12, 0, 0, 0)).unwrap();
    assert_eq!(other.id, SpiScid::new(1, 12));
}

#[test]
fn spi_assignment() {
    on_both_stores!(spi_follows_highest_in_use);
}

fn duplicate_leaves_store_unchanged<S: SaStore>(dao: &SaDao<S>) {
    let first = dao
        .create(&tc(0).with_spi(20).with_encryption("1", vec![0x01]))
        .unwrap();
    let err = dao.create(&tc(5).with_spi(20)).unwrap_err();
    assert!(matches!(err, SadbError::Duplicate { .. }));
    assert_eq!(
        err.to_string(),
        "SA create failed: an SA with the SPI/SCID combination 20/46 already exists"
    );

    let all = dao.list(FrameType::Tc, &SaFilter::all()).unwrap();
    assert_eq!(all, vec![first]);
}

#[test]
fn duplicate_identity_is_rejected() {
    on_both_stores!(duplicate_leaves_store_unchanged);
}

fn same_identity_in_other_family<S: SaStore>(dao: &SaDao<S>) {
    dao.create(&tc(0).with_spi(3)).unwrap();
    let tm = SaCandidate::new(FrameType::Tm, 46, 0, 0, 0).with_spi(3);
    assert!(dao.create(&tm).is_ok());
}

#[test]
fn identity_is_scoped_by_frame_type() {
    on_both_stores!(same_identity_in_other_family);
}

fn initial_state<S: SaStore>(dao: &SaDao<S>) {
    assert_eq!(dao.create(&tc(0)).unwrap().state, SaState::Unkeyed);
    let keyed = dao
        .create(&tc(1).with_authentication("9", vec![0x02]))
        .unwrap();
    assert_eq!(keyed.state, SaState::Keyed);
}

#[test]
fn initial_state_reflects_bound_keys() {
    on_both_stores!(initial_state);
}

fn lookup_and_listing<S: SaStore>(dao: &SaDao<S>) {
    let a = dao.create(&tc(0).with_encryption("1", vec![0x01])).unwrap();
    let b = dao.create(&tc(1)).unwrap();
    dao.start(FrameType::Tc, a.id, false).unwrap();

    assert_eq!(dao.get(FrameType::Tc, b.id).unwrap(), Some(b.clone()));
    assert_eq!(dao.get(FrameType::Tc, SpiScid::new(77, 46)).unwrap(), None);

    let active = dao.list_active(FrameType::Tc).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, a.id);

    let inactive = dao
        .list(
            FrameType::Tc,
            &SaFilter {
                activity: sdls_sadb::Activity::Inactive,
                ..SaFilter::default()
            },
        )
        .unwrap();
    assert_eq!(inactive, vec![b]);
    assert!(dao.status());
}

#[test]
fn get_and_list() {
    on_both_stores!(lookup_and_listing);
}

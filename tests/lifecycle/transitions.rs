use sdls_sadb::{FrameType, SaDao, SaState, SaStore, SadbError, SpiScid};

use crate::tc;

fn start_stop_and_force<S: SaStore>(dao: &SaDao<S>) {
    let first = dao.create(&tc(0).with_spi(6)).unwrap();
    assert_eq!(first.id, SpiScid::new(6, 46));
    assert_eq!(first.state, SaState::Unkeyed);

    let keyed = dao
        .rekey_encryption(FrameType::Tc, first.id, "130", &[0x01])
        .unwrap();
    assert_eq!(keyed.state, SaState::Keyed);
    assert_eq!(keyed.params.ekid.as_deref(), Some("130"));

    let running = dao.start(FrameType::Tc, first.id, false).unwrap();
    assert_eq!(running.state, SaState::Operational);

    let second = dao.create(&tc(0).with_encryption("131", vec![0x01])).unwrap();
    let err = dao.start(FrameType::Tc, second.id, false).unwrap_err();
    match &err {
        SadbError::Conflict {
            conflicting, gvcid, ..
        } => {
            assert_eq!(*conflicting, first.id);
            assert_eq!(*gvcid, first.gvcid());
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert!(err.to_string().contains("SA 6/46 is already operational"));
    assert_eq!(
        dao.get(FrameType::Tc, second.id).unwrap().unwrap().state,
        SaState::Keyed
    );

    let forced = dao.start(FrameType::Tc, second.id, true).unwrap();
    assert_eq!(forced.state, SaState::Operational);
    assert_eq!(
        dao.get(FrameType::Tc, first.id).unwrap().unwrap().state,
        SaState::Keyed
    );
    assert_eq!(dao.list_active(FrameType::Tc).unwrap().len(), 1);
}

#[test]
fn rekey_start_conflict_and_forced_start() {
    on_both_stores!(start_stop_and_force);
}

fn other_channels_do_not_conflict<S: SaStore>(dao: &SaDao<S>) {
    let a = dao.create(&tc(0)).unwrap();
    let b = dao.create(&tc(1)).unwrap();
    let tm = dao
        .create(&sdls_sadb::SaCandidate::new(FrameType::Tm, 46, 0, 0, 0))
        .unwrap();
    dao.start(FrameType::Tc, a.id, false).unwrap();
    dao.start(FrameType::Tc, b.id, false).unwrap();
    dao.start(FrameType::Tm, tm.id, false).unwrap();
    assert_eq!(dao.list_active(FrameType::Tc).unwrap().len(), 2);
}

#[test]
fn exclusivity_is_per_channel() {
    on_both_stores!(other_channels_do_not_conflict);
}

fn double_start_and_bad_stop<S: SaStore>(dao: &SaDao<S>) {
    let sa = dao.create(&tc(0).with_encryption("1", vec![0x01])).unwrap();

    let err = dao.stop(FrameType::Tc, sa.id).unwrap_err();
    assert!(matches!(err, SadbError::NotOperational { .. }));
    assert_eq!(dao.get(FrameType::Tc, sa.id).unwrap().unwrap().state, SaState::Keyed);

    dao.start(FrameType::Tc, sa.id, false).unwrap();
    let err = dao.start(FrameType::Tc, sa.id, true).unwrap_err();
    assert!(matches!(err, SadbError::AlreadyOperational { .. }));

    let stopped = dao.stop(FrameType::Tc, sa.id).unwrap();
    assert_eq!(stopped.state, SaState::Keyed);
    assert!(matches!(
        dao.stop(FrameType::Tc, sa.id),
        Err(SadbError::NotOperational { .. })
    ));
}

#[test]
fn stop_requires_operational() {
    on_both_stores!(double_start_and_bad_stop);
}

fn expire_from_every_state<S: SaStore>(dao: &SaDao<S>) {
    let fresh = dao.create(&tc(0)).unwrap();
    let keyed = dao
        .create(&tc(1).with_encryption("1", vec![0x01]).with_authentication("2", vec![0x01]))
        .unwrap();
    let running = dao.create(&tc(2).with_encryption("3", vec![0x01])).unwrap();
    dao.start(FrameType::Tc, running.id, false).unwrap();

    for id in [fresh.id, keyed.id, running.id] {
        let expired = dao.expire(FrameType::Tc, id).unwrap();
        assert_eq!(expired.state, SaState::Expired);
        assert_eq!(expired.params.ekid, None);
        assert_eq!(expired.params.akid, None);
    }

    // expiry is distinguishable from a never-keyed SA but behaves like one
    let never_keyed = dao.create(&tc(3)).unwrap();
    let expired = dao.get(FrameType::Tc, fresh.id).unwrap().unwrap();
    assert_ne!(expired.state, never_keyed.state);
    assert!(expired.state.is_unkeyed() && never_keyed.state.is_unkeyed());
    assert_eq!(expired.state.sdls_code(), never_keyed.state.sdls_code());

    let rekeyed = dao
        .rekey_authentication(FrameType::Tc, expired.id, "5", &[0x01])
        .unwrap();
    assert_eq!(rekeyed.state, SaState::Keyed);
}

#[test]
fn expire_clears_keys() {
    on_both_stores!(expire_from_every_state);
}

fn missing_targets<S: SaStore>(dao: &SaDao<S>) {
    let ghost = SpiScid::new(404, 46);
    let results = [
        dao.expire(FrameType::Tc, ghost).err(),
        dao.start(FrameType::Tc, ghost, true).err(),
        dao.stop(FrameType::Tc, ghost).err(),
        dao.rekey_encryption(FrameType::Tc, ghost, "1", &[0x01]).err(),
        dao.delete(FrameType::Tc, ghost).err(),
    ];
    for err in results {
        assert!(err.is_some_and(|e| e.is_not_found()));
    }
}

#[test]
fn operations_on_missing_sa_fail() {
    on_both_stores!(missing_targets);
}

fn delete_removes<S: SaStore>(dao: &SaDao<S>) {
    let sa = dao.create(&tc(0)).unwrap();
    dao.delete(FrameType::Tc, sa.id).unwrap();
    assert!(dao.get(FrameType::Tc, sa.id).unwrap().is_none());
    assert!(dao.delete(FrameType::Tc, sa.id).unwrap_err().is_not_found());
}

#[test]
fn delete_is_permanent() {
    on_both_stores!(delete_removes);
}

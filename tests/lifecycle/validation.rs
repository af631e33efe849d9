use sdls_sadb::validator::{verify_arsn, verify_iv};
use sdls_sadb::{FrameType, SaDao, SaStore, SaUpdate, SadbError, ServiceType, UpdateOutcome};

use crate::tc;

fn arsn_update_scenario<S: SaStore>(dao: &SaDao<S>) {
    let sa = dao.create(&tc(0)).unwrap();

    let arsn = verify_arsn(Some("0x0000000002"), Some(5)).unwrap().unwrap();
    let outcome = dao
        .update(FrameType::Tc, sa.id, &SaUpdate::new().arsn(arsn, 5))
        .unwrap();
    assert!(outcome.is_changed());
    let stored = dao.get(FrameType::Tc, sa.id).unwrap().unwrap();
    assert_eq!(stored.params.arsn, vec![0x00, 0x00, 0x00, 0x00, 0x02]);
    assert_eq!(stored.params.arsn_len, 5);

    // declared length disagrees with the value
    let err = dao
        .update(FrameType::Tc, sa.id, &SaUpdate::new().arsn(vec![0x07; 3], 5))
        .unwrap_err();
    assert!(matches!(err, SadbError::Validation { field: "ARSN", .. }));
    let kept = dao.get(FrameType::Tc, sa.id).unwrap().unwrap();
    assert_eq!(kept.params.arsn, vec![0x00, 0x00, 0x00, 0x00, 0x02]);
}

#[test]
fn arsn_update_keeps_prior_value_on_mismatch() {
    on_both_stores!(arsn_update_scenario);
}

fn length_mismatches_are_not_persisted<S: SaStore>(dao: &SaDao<S>) {
    let sa = dao.create(&tc(0).with_encryption("1", vec![0x01])).unwrap();

    let bad_iv = SaUpdate::new().iv(Some(vec![0; 12]), 16);
    assert!(dao.update(FrameType::Tc, sa.id, &bad_iv).unwrap_err().is_validation());

    // GCM mandates a 12-byte IV even when value and declaration agree
    let wrong_size = SaUpdate::new().iv(Some(vec![0; 16]), 16);
    assert!(dao.update(FrameType::Tc, sa.id, &wrong_size).unwrap_err().is_validation());

    let bad_abm = SaUpdate::new().abm(vec![0xff; 4], 19);
    assert!(dao.update(FrameType::Tc, sa.id, &bad_abm).unwrap_err().is_validation());

    assert_eq!(dao.get(FrameType::Tc, sa.id).unwrap().unwrap(), sa);

    let mut bad_candidate = tc(1);
    bad_candidate.params.iv = Some(vec![1, 2, 3]);
    assert!(dao.create(&bad_candidate).unwrap_err().is_validation());
    assert_eq!(dao.list(FrameType::Tc, &Default::default()).unwrap().len(), 1);
}

#[test]
fn declared_lengths_must_match_values() {
    on_both_stores!(length_mismatches_are_not_persisted);
}

fn no_op_update_is_reported<S: SaStore>(dao: &SaDao<S>) {
    let sa = dao.create(&tc(0)).unwrap();
    let same = SaUpdate::new().arsnw(sa.params.arsnw);
    assert!(matches!(
        dao.update(FrameType::Tc, sa.id, &same).unwrap(),
        UpdateOutcome::Unchanged(_)
    ));
    assert!(!dao
        .update(FrameType::Tc, sa.id, &SaUpdate::new())
        .unwrap()
        .is_changed());
}

#[test]
fn unchanged_update_is_distinct() {
    on_both_stores!(no_op_update_is_reported);
}

fn update_leaves_keys_and_state<S: SaStore>(dao: &SaDao<S>) {
    let sa = dao.create(&tc(0).with_encryption("1", vec![0x01])).unwrap();
    dao.start(FrameType::Tc, sa.id, false).unwrap();

    let update = SaUpdate::new()
        .service_type(ServiceType::AuthenticatedEncryption)
        .arsnw(64)
        .header_lengths(12, 4, 2, 16);
    let updated = dao.update(FrameType::Tc, sa.id, &update).unwrap().into_sa();
    assert_eq!(updated.service_type(), ServiceType::AuthenticatedEncryption);
    assert!(updated.params.encryption_enabled());
    assert!(updated.params.authentication_enabled());
    assert_eq!(updated.params.arsnw, 64);
    assert_eq!(updated.params.shsnf_len, 4);
    assert_eq!(updated.params.ekid.as_deref(), Some("1"));
    assert!(updated.is_operational());
}

#[test]
fn update_touches_only_mutable_fields() {
    on_both_stores!(update_leaves_keys_and_state);
}

#[test]
fn null_iv_means_absent() {
    assert_eq!(verify_iv(Some("null"), 12, Some(&[0x01])).unwrap(), None);
}

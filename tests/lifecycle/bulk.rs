use sdls_sadb::{FrameType, SaCandidate, SaDao, SaFilter, SaPatch, SaStore, SpiScid};

use crate::tc;

fn invalid(vcid: u8) -> SaCandidate {
    let mut c = tc(vcid);
    c.params.abm_len = 3;
    c
}

fn partial_batches<S: SaStore>(dao: &SaDao<S>) {
    // valid/invalid interleaved in several orders
    let batches: [Vec<SaCandidate>; 3] = [
        vec![invalid(0), tc(1), tc(2), invalid(3)],
        vec![tc(4), invalid(5), invalid(6), tc(7), tc(8)],
        vec![invalid(9)],
    ];
    let mut persisted = 0;
    for batch in batches {
        let n = batch.len();
        let m = batch.iter().filter(|c| c.params.abm_len == 3).count();
        let report = dao.bulk_import(&batch, false).unwrap();
        assert_eq!(report.attempted, n);
        assert_eq!(report.succeeded, n - m);
        assert_eq!(report.failed, m);
        assert_eq!(report.errors.len(), m);
        persisted += n - m;
        assert_eq!(dao.list(FrameType::Tc, &SaFilter::all()).unwrap().len(), persisted);
    }
}

#[test]
fn import_reports_n_minus_m() {
    on_both_stores!(partial_batches);
}

fn overwrite<S: SaStore>(dao: &SaDao<S>) {
    dao.create(&tc(0).with_spi(1)).unwrap();
    dao.create(&tc(0).with_spi(2)).unwrap();

    let rows = vec![tc(3).with_spi(1), tc(4).with_spi(2).with_arsnw(9), tc(5)];
    let rejected = dao.bulk_import(&rows, false).unwrap();
    assert_eq!(rejected.succeeded, 1);
    assert_eq!(rejected.failed, 2);

    let replaced = dao.bulk_import(&rows[..2], true).unwrap();
    assert!(replaced.is_success());
    let all = dao.list(FrameType::Tc, &SaFilter::all()).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].vcid, 3);
    assert_eq!(all[1].params.arsnw, 9);
}

#[test]
fn import_with_overwrite_replaces() {
    on_both_stores!(overwrite);
}

#[test]
fn report_serializes_for_front_ends() {
    let dao = crate::memory_dao();
    let report = dao.bulk_import(&[tc(0), invalid(1)], false).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["attempted"], 2);
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["errors"][0]["index"], 1);
    assert!(json["errors"][0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid ABM"));
}

#[test]
fn candidates_parse_from_json() {
    let rows: Vec<SaCandidate> = serde_json::from_str(
        r#"[
            {"frame_type": "TC", "spi": 3, "scid": 46, "tfvn": 0, "vcid": 1, "mapid": 0,
             "ekid": "130", "ecs": "0x01", "ecs_len": 1, "iv": "X'000000000000000000000001'"},
            {"frame_type": "TM", "scid": 46, "tfvn": 0, "vcid": 1, "mapid": 0, "iv": "null"}
        ]"#,
    )
    .unwrap();
    assert_eq!(rows[0].params.iv.as_ref().map(Vec::len), Some(12));
    assert_eq!(rows[1].params.iv, None);

    let dao = crate::memory_dao();
    let report = dao.bulk_import(&rows, false).unwrap();
    assert!(report.is_success());
    assert_eq!(dao.list_active(FrameType::Tc).unwrap().len(), 0);
}

fn iv_patch_from_json<S: SaStore>(dao: &SaDao<S>) {
    dao.create(&tc(0).with_spi(1)).unwrap();
    let patches: Vec<SaPatch> = serde_json::from_str(
        r#"[{"frame_type":"TC","id":{"spi":1,"scid":46},"iv":"000000000000000000000001","iv_len":12}]"#,
    )
    .unwrap();
    assert_eq!(
        patches[0].update.iv,
        Some(Some(vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]))
    );

    let report = dao.bulk_update(&patches).unwrap();
    assert!(report.is_success());
    let stored = dao.get(FrameType::Tc, SpiScid::new(1, 46)).unwrap().unwrap();
    assert_eq!(stored.params.iv.as_ref().map(|iv| iv[11]), Some(0x01));
}

#[test]
fn json_patch_updates_iv() {
    on_both_stores!(iv_patch_from_json);
}

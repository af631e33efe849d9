use sdls_sadb::config::SadbConfig;
use sdls_sadb::{FrameType, SaDao, SaState, SaUpdate, SqliteStore};

use crate::tc;

#[test]
fn sqlite_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sadb.sqlite");

    let id = {
        let dao = SaDao::new(SqliteStore::open(&path).unwrap());
        let sa = dao.create(&tc(0).with_encryption("130", vec![0x01])).unwrap();
        dao.start(FrameType::Tc, sa.id, false).unwrap();
        dao.update(
            FrameType::Tc,
            sa.id,
            &SaUpdate::new().arsn(vec![0, 0, 0, 0, 2], 5),
        )
        .unwrap();
        sa.id
    };

    let dao = SaDao::new(SqliteStore::open(&path).unwrap());
    let sa = dao.get(FrameType::Tc, id).unwrap().unwrap();
    assert_eq!(sa.state, SaState::Operational);
    assert_eq!(sa.params.ekid.as_deref(), Some("130"));
    assert_eq!(sa.params.arsn, vec![0, 0, 0, 0, 2]);
}

#[test]
fn expired_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sadb.sqlite");

    let id = {
        let dao = SaDao::new(SqliteStore::open(&path).unwrap());
        let sa = dao.create(&tc(0)).unwrap();
        dao.expire(FrameType::Tc, sa.id).unwrap();
        sa.id
    };

    let dao = SaDao::new(SqliteStore::open(&path).unwrap());
    assert_eq!(
        dao.get(FrameType::Tc, id).unwrap().unwrap().state,
        SaState::Expired
    );
}

#[test]
fn rolled_back_import_row_is_absent_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sadb.sqlite");
    {
        let dao = SaDao::new(SqliteStore::open(&path).unwrap());
        let mut bad = tc(1);
        bad.params.arsn_len = 2;
        let report = dao.bulk_import(&[tc(0), bad, tc(2)], false).unwrap();
        assert_eq!(report.succeeded, 2);
    }
    let dao = SaDao::new(SqliteStore::open(&path).unwrap());
    let all = dao.list(FrameType::Tc, &Default::default()).unwrap();
    assert_eq!(all.iter().map(|sa| sa.vcid).collect::<Vec<_>>(), vec![0, 2]);
}

#[test]
fn store_opens_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.sqlite");
    let config = SadbConfig::from_toml_str(&format!(
        "[store]\npath = {:?}\n\n[logging]\nlevel = \"warn\"\n",
        path.to_string_lossy()
    ))
    .unwrap();

    let dao = SaDao::new(config.store.open_sqlite().unwrap());
    assert!(dao.status());
    dao.create(&tc(0)).unwrap();
    assert!(path.exists());
}

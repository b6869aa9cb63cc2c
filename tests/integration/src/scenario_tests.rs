//! End-to-end scenarios across the facade, the adapter and the config layer.

use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::{BufRead, BufReader, Read};
use tempfile::TempDir;
use vault_adapter::{DETAILS, Filesystem, InfoUpdate, VaultFs};
use vault_fs::{ConfigStore, OpenerConfig, Repo, Whence};
use vault_test_utils::{Backend, TestVault};

#[rstest]
#[case(Backend::Mem)]
#[case(Backend::File)]
fn adapter_and_facade_share_one_tree(#[case] backend: Backend) {
    let vault = TestVault::new(backend);
    let fs = VaultFs::new(vault.create());

    fs.makedirs("projects/alpha", false).unwrap();
    fs.writebytes("projects/alpha/readme.md", b"# alpha\n").unwrap();

    let repo = fs.repo();
    assert!(repo.is_file("/projects/alpha/readme.md"));
    repo.write_all("/projects/alpha/notes.txt", b"from the facade")
        .unwrap();

    assert_eq!(
        fs.listdir("/projects/alpha").unwrap(),
        vec!["notes.txt", "readme.md"]
    );
    assert_eq!(
        fs.readbytes("/projects/alpha/notes.txt").unwrap(),
        b"from the facade"
    );

    let info = fs.getinfo("/projects/alpha/notes.txt", &[DETAILS]).unwrap();
    assert_eq!(info.size(), Some(15));
}

#[test]
fn line_oriented_editing_session() {
    let repo = TestVault::mem().create();
    repo.create_dir("/logs").unwrap();

    {
        let mut file = repo.open("/logs/app.log", "w+").unwrap();
        file.writelines(["start\n", "ready\n"]).unwrap();
        file.seek(0, Whence::Start).unwrap();
        let lines: Vec<Vec<u8>> = file.lines().map(|line| line.unwrap()).collect();
        assert_eq!(lines, vec![b"start\n".to_vec(), b"ready\n".to_vec()]);
    }

    {
        let mut file = repo.open("/logs/app.log", "a").unwrap();
        file.seek(0, Whence::Start).unwrap();
        file.write(b"stop\n").unwrap();
        file.close().unwrap();
    }

    // Handles are std readers, so std adapters compose with them
    let file = repo.open("/logs/app.log", "r").unwrap();
    let lines: Vec<String> = BufReader::new(file).lines().map(|l| l.unwrap()).collect();
    assert_eq!(lines, vec!["start", "ready", "stop"]);
}

#[test]
fn config_file_drives_the_opener() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("vault.json");
    let vault = TestVault::file();

    let config = OpenerConfig {
        uri: Some(vault.uri().to_string()),
        create: true,
        version_limit: 2,
        ..OpenerConfig::default()
    };
    let store = ConfigStore::new();
    store.save(&config_path, &config).unwrap();

    let loaded: OpenerConfig = store.load(&config_path).unwrap();
    assert_eq!(loaded, config);

    let uri = loaded.uri.clone().unwrap();
    let repo = loaded.opener().open(&uri, vault.passphrase()).unwrap();
    for i in 0..4 {
        repo.write_all("/f", format!("{i}").as_bytes()).unwrap();
    }
    assert_eq!(repo.info().version_limit, 2);
    assert_eq!(repo.history("/f").unwrap().len(), 2);
}

#[test]
fn adapter_metadata_round_trips_through_setinfo() {
    let vault = TestVault::mem();
    let fs = VaultFs::new(vault.create());
    fs.writebytes("/doc", b"content").unwrap();

    let update: InfoUpdate =
        serde_json::from_str(r#"{"details": {"modified": "2015-06-07T08:09:10Z"}}"#).unwrap();
    fs.setinfo("/doc", &update).unwrap();

    let info = fs.getinfo("/doc", &[DETAILS]).unwrap();
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["details"]["modified"], "2015-06-07T08:09:10Z");
    assert_eq!(
        fs.repo().metadata("/doc").unwrap().modified,
        info.details.unwrap().modified
    );
}

#[test]
fn handles_outliving_the_repository_fail_cleanly() {
    let vault = TestVault::mem();
    let fs = VaultFs::new(vault.create());
    fs.writebytes("/f", b"abc").unwrap();

    let mut reader = fs.openbin("/f", "r").unwrap();
    let mut writer = fs.openbin("/g", "w").unwrap();
    writer.write(b"never committed").unwrap();

    let repo: Repo = fs.into_inner();
    repo.close();

    let mut buf = Vec::new();
    let err = reader.read_to_end(&mut buf).unwrap_err();
    assert!(matches!(
        err.downcast::<vault_fs::Error>(),
        Ok(vault_fs::Error::RepoClosed { .. })
    ));
    assert!(matches!(
        writer.close(),
        Err(vault_fs::Error::RepoClosed { .. })
    ));
    assert!(reader.close().is_ok());
}

#[test]
fn concurrent_adapter_clients_on_one_repository() {
    use std::sync::Arc;
    use std::thread;

    let vault = TestVault::mem();
    let fs = Arc::new(VaultFs::new(vault.create()));
    fs.makedir("/shared", false).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|id| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for i in 0..5 {
                    let path = format!("/shared/w{id}-{i}");
                    fs.writebytes(&path, path.as_bytes()).unwrap();
                    fs.copy(&path, &format!("{path}.bak"), false).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("Worker should not panic");
    }

    let names = fs.listdir("/shared").unwrap();
    assert_eq!(names.len(), 40);
    for name in names.iter().filter(|n| n.ends_with(".bak")) {
        let original = format!("/shared/{}", name.trim_end_matches(".bak"));
        assert_eq!(
            fs.readbytes(&format!("/shared/{name}")).unwrap(),
            original.as_bytes()
        );
    }
}

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use std::io::{Read, Write};
use vault_adapter::{Filesystem, FsError, InfoUpdate, ResourceType, VaultFs};
use vault_fs::RepoOpener;
use vault_test_utils::TestVault;

struct Env {
    fs: VaultFs,
    _vault: TestVault,
}

#[fixture]
fn env() -> Env {
    let vault = TestVault::mem();
    Env {
        fs: VaultFs::new(vault.create()),
        _vault: vault,
    }
}

#[rstest]
fn probes_accept_relative_paths(env: Env) {
    env.fs.makedir("docs", false).unwrap();
    env.fs.writebytes("docs/a.txt", b"alpha").unwrap();

    assert!(env.fs.exists("/docs"));
    assert!(env.fs.isdir("docs"));
    assert!(env.fs.isfile("docs/a.txt"));
    assert!(!env.fs.isfile("docs"));
    assert!(!env.fs.exists("bad\0path"));
}

#[rstest]
fn listdir_names_children(env: Env) {
    env.fs.makedirs("/a/b", false).unwrap();
    env.fs.writebytes("/a/f", b"").unwrap();
    assert_eq!(env.fs.listdir("/a").unwrap(), vec!["b", "f"]);
    assert!(matches!(
        env.fs.listdir("/a/f"),
        Err(FsError::DirectoryExpected { .. })
    ));
    assert!(matches!(
        env.fs.listdir("/none"),
        Err(FsError::ResourceNotFound { .. })
    ));
}

#[rstest]
fn makedir_recreate(env: Env) {
    env.fs.makedir("/d", false).unwrap();
    assert!(matches!(
        env.fs.makedir("/d", false),
        Err(FsError::DirectoryExists { path }) if path == "/d"
    ));
    env.fs.makedir("/d", true).unwrap();
    assert!(matches!(
        env.fs.makedir("/missing/d", false),
        Err(FsError::ResourceNotFound { .. })
    ));
}

#[rstest]
fn makedirs_respects_exist_ok(env: Env) {
    env.fs.makedirs("/x/y/z", false).unwrap();
    assert!(env.fs.isdir("/x/y"));
    env.fs.makedirs("/x/y/z", true).unwrap();
    assert!(matches!(
        env.fs.makedirs("/x/y/z", false),
        Err(FsError::DirectoryExists { .. })
    ));

    env.fs.writebytes("/x/file", b"").unwrap();
    assert!(matches!(
        env.fs.makedirs("/x/file/sub", true),
        Err(FsError::DirectoryExpected { .. })
    ));
}

#[rstest]
fn openbin_streams(env: Env) {
    let mut file = env.fs.openbin("/stream.bin", "wb+").unwrap();
    file.write_all(b"through std io").unwrap();
    file.close().unwrap();

    let mut file = env.fs.openbin("/stream.bin", "rb").unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    assert_eq!(text, "through std io");

    assert!(matches!(
        env.fs.openbin("/absent", "r"),
        Err(FsError::ResourceNotFound { .. })
    ));
    assert!(matches!(
        env.fs.openbin("/stream.bin/child", "w"),
        Err(FsError::ResourceNotFound { .. })
    ));
    assert!(matches!(
        env.fs.openbin("/stream.bin", "rw"),
        Err(FsError::InvalidArgument { .. })
    ));
}

#[rstest]
fn remove_and_removedir(env: Env) {
    env.fs.makedirs("/d/e", false).unwrap();
    env.fs.writebytes("/d/f", b"x").unwrap();

    assert!(matches!(env.fs.remove("/d"), Err(FsError::FileExpected { .. })));
    assert!(matches!(
        env.fs.removedir("/d/f"),
        Err(FsError::DirectoryExpected { .. })
    ));
    assert!(matches!(
        env.fs.removedir("/d"),
        Err(FsError::DirectoryNotEmpty { .. })
    ));
    assert!(matches!(env.fs.removedir("/"), Err(FsError::RemoveRoot { .. })));

    env.fs.remove("/d/f").unwrap();
    env.fs.removedir("/d/e").unwrap();
    env.fs.removedir("/d").unwrap();
    assert!(env.fs.listdir("/").unwrap().is_empty());
}

#[rstest]
fn removetree_clears_subtree(env: Env) {
    env.fs.makedirs("/t/a/b", false).unwrap();
    env.fs.writebytes("/t/a/b/leaf", b"1").unwrap();
    env.fs.writebytes("/t/top", b"2").unwrap();
    env.fs.writebytes("/keep", b"3").unwrap();

    env.fs.removetree("/t").unwrap();
    assert!(!env.fs.exists("/t"));
    assert_eq!(env.fs.readbytes("/keep").unwrap(), b"3");

    env.fs.removetree("/").unwrap();
    assert!(env.fs.isdir("/"));
    assert!(env.fs.listdir("/").unwrap().is_empty());
}

#[rstest]
fn getinfo_filters_namespaces(env: Env) {
    env.fs.makedir("/dir", false).unwrap();
    env.fs.writebytes("/dir/file.txt", b"12345").unwrap();

    let basic = env.fs.getinfo("/dir/file.txt", &[]).unwrap();
    assert_eq!(basic.name(), "file.txt");
    assert!(basic.is_file());
    assert!(basic.details.is_none());

    let detailed = env
        .fs
        .getinfo("/dir/file.txt", &["details", "access", "bogus"])
        .unwrap();
    assert_eq!(detailed.size(), Some(5));
    assert_eq!(detailed.resource_type(), Some(ResourceType::File));

    let dir = env.fs.getinfo("/dir", &["details"]).unwrap();
    assert!(dir.is_dir());
    assert_eq!(dir.resource_type(), Some(ResourceType::Directory));

    let root = env.fs.getinfo("/", &[]).unwrap();
    assert_eq!(root.name(), "");

    assert!(matches!(
        env.fs.getinfo("/nope", &[]),
        Err(FsError::ResourceNotFound { .. })
    ));
}

#[rstest]
fn info_serializes_by_namespace(env: Env) {
    env.fs.writebytes("/f", b"abc").unwrap();

    let json = serde_json::to_value(env.fs.getinfo("/f", &[]).unwrap()).unwrap();
    assert_eq!(json["basic"]["name"], "f");
    assert!(json.get("details").is_none());

    let json = serde_json::to_value(env.fs.getinfo("/f", &["details"]).unwrap()).unwrap();
    assert_eq!(json["details"]["size"], 3);
    assert_eq!(json["details"]["type"], "file");
}

#[rstest]
fn setinfo_updates_modified(env: Env) {
    env.fs.writebytes("/f", b"").unwrap();
    let when = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();

    env.fs.setinfo("/f", &InfoUpdate::modified(when)).unwrap();
    let info = env.fs.getinfo("/f", &["details"]).unwrap();
    assert_eq!(info.details.unwrap().modified, when);

    // Unknown namespaces and fields are ignored
    let update: InfoUpdate =
        serde_json::from_str(r#"{"access": {"user": "x"}, "details": {"accessed": 1}}"#).unwrap();
    env.fs.setinfo("/f", &update).unwrap();

    assert!(matches!(
        env.fs.setinfo("/missing", &InfoUpdate::default()),
        Err(FsError::ResourceNotFound { .. })
    ));
}

#[rstest]
fn move_file_contract(env: Env) {
    env.fs.makedir("/dir", false).unwrap();
    env.fs.writebytes("/a", b"A").unwrap();
    env.fs.writebytes("/b", b"B").unwrap();

    assert!(matches!(
        env.fs.move_file("/dir", "/moved", false),
        Err(FsError::FileExpected { .. })
    ));
    assert!(matches!(
        env.fs.move_file("/a", "/b", false),
        Err(FsError::DestinationExists { path }) if path == "/b"
    ));
    env.fs.move_file("/a", "/b", true).unwrap();
    assert_eq!(env.fs.readbytes("/b").unwrap(), b"A");
    assert!(!env.fs.exists("/a"));

    env.fs.move_file("/b", "/dir/b", false).unwrap();
    assert_eq!(env.fs.listdir("/dir").unwrap(), vec!["b"]);
}

#[rstest]
fn copy_contract(env: Env) {
    env.fs.writebytes("/src", b"data").unwrap();
    env.fs.copy("/src", "/dst", false).unwrap();
    assert_eq!(env.fs.readbytes("/dst").unwrap(), b"data");

    assert!(matches!(
        env.fs.copy("/src", "/dst", false),
        Err(FsError::DestinationExists { .. })
    ));
    assert!(matches!(
        env.fs.copy("/none", "/x", false),
        Err(FsError::ResourceNotFound { .. })
    ));
}

#[test]
fn capabilities_reflect_repository() {
    let vault = TestVault::mem();
    let fs = VaultFs::new(vault.create());
    let caps = fs.capabilities();
    assert!(!caps.case_insensitive);
    assert!(caps.thread_safe);
    assert!(caps.supports_rename);
    assert!(caps.unicode_paths);
    assert!(caps.virtual_fs);
    assert!(!caps.read_only);
    assert_eq!(caps.invalid_path_chars, "\0");
    assert_eq!(caps.max_sys_path_length, None);
    fs.close();

    let read_only = VaultFs::new(
        RepoOpener::new()
            .read_only(true)
            .open(vault.uri(), vault.passphrase())
            .unwrap(),
    );
    assert!(read_only.capabilities().read_only);
    assert!(matches!(
        read_only.makedir("/x", false),
        Err(FsError::ResourceReadOnly { .. })
    ));
}

#[test]
fn open_reports_authentication_failure() {
    let vault = TestVault::mem();
    drop(vault.create());
    assert!(matches!(
        VaultFs::open(vault.uri(), "wrong", false),
        Err(FsError::AuthenticationFailed { .. })
    ));
    assert!(matches!(
        VaultFs::open("mem://never-created-adapter-volume", "pw", false),
        Err(FsError::ResourceNotFound { .. })
    ));
}

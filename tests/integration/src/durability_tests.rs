//! On-disk behaviour of `file://` repositories.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use vault_fs::{Error, Repo, RepoOpener};
use vault_store::ObjectId;
use vault_test_utils::TestVault;

fn repo_dir(vault: &TestVault) -> PathBuf {
    vault
        .root()
        .expect("file vault has a root")
        .join("vault")
}

/// Object directories on disk, excluding the directory tree itself.
fn file_objects(dir: &Path) -> Vec<PathBuf> {
    let tree = ObjectId::TREE.to_string();
    let mut objects: Vec<PathBuf> = fs::read_dir(dir.join("objects"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.file_name().and_then(|n| n.to_str()) != Some(tree.as_str()))
        .collect();
    objects.sort();
    objects
}

#[test]
fn layout_is_created_on_disk() {
    let vault = TestVault::file();
    let _repo = vault.create();
    let dir = repo_dir(&vault);

    assert!(dir.join("superblock.toml").is_file());
    assert!(dir.join("vault.lock").is_file());
    assert!(dir.join("objects").join(ObjectId::TREE.to_string()).is_dir());

    let superblock = fs::read_to_string(dir.join("superblock.toml")).unwrap();
    assert!(superblock.contains("version_limit"));
    assert!(!superblock.contains(vault.passphrase()));
}

#[test]
fn mutations_survive_reopen() {
    let vault = TestVault::file();
    {
        let repo = vault.create();
        TestVault::seed(
            &repo,
            &[
                ("/inbox/a.txt", b"alpha"),
                ("/inbox/b.txt", b"beta"),
                ("/archive/.keep", b""),
            ],
        );
        repo.rename("/inbox/a.txt", "/archive/a.txt", false).unwrap();
        repo.copy("/inbox/b.txt", "/archive/b.txt", false).unwrap();
        repo.remove_file("/inbox/b.txt").unwrap();
        repo.write_all("/archive/a.txt", b"alpha, edited").unwrap();
    }

    let repo = vault.open();
    TestVault::assert_listing(&repo, "/", &["archive", "inbox"]);
    TestVault::assert_listing(&repo, "/archive", &[".keep", "a.txt", "b.txt"]);
    TestVault::assert_listing(&repo, "/inbox", &[]);
    TestVault::assert_content(&repo, "/archive/a.txt", b"alpha, edited");
    TestVault::assert_content(&repo, "/archive/b.txt", b"beta");
    assert_eq!(repo.history("/archive/a.txt").unwrap().len(), 2);
}

#[test]
fn removed_files_release_their_objects() {
    let vault = TestVault::file();
    let repo = vault.create();
    let dir = repo_dir(&vault);

    TestVault::seed(&repo, &[("/d/one", b"1"), ("/d/two", b"2"), ("/three", b"3")]);
    assert_eq!(file_objects(&dir).len(), 3);

    repo.remove_file("/three").unwrap();
    assert_eq!(file_objects(&dir).len(), 2);

    repo.remove_tree("/d").unwrap();
    assert!(file_objects(&dir).is_empty());
}

#[test]
fn overwriting_rename_drops_the_replaced_object() {
    let vault = TestVault::file();
    let repo = vault.create();
    let dir = repo_dir(&vault);

    TestVault::seed(&repo, &[("/keep", b"new"), ("/old", b"old")]);
    repo.rename("/keep", "/old", true).unwrap();

    assert_eq!(file_objects(&dir).len(), 1);
    TestVault::assert_content(&repo, "/old", b"new");
}

#[test]
fn corrupted_tree_is_detected_on_open() {
    let vault = TestVault::file();
    {
        let repo = vault.create();
        TestVault::seed(&repo, &[("/f", b"x")]);
    }

    let tree_dir = repo_dir(&vault)
        .join("objects")
        .join(ObjectId::TREE.to_string());
    for entry in fs::read_dir(&tree_dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().and_then(|e| e.to_str()) == Some("bin") {
            fs::write(&path, b"{ not the tree }").unwrap();
        }
    }

    let err = RepoOpener::new()
        .open(vault.uri(), vault.passphrase())
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Storage {
                source: vault_store::Error::Corrupted { .. },
                ..
            }
        ),
        "got {err:?}"
    );
}

#[test]
fn lock_spans_independent_openers() {
    let vault = TestVault::file();
    let writer = vault.create();

    let err = RepoOpener::new()
        .open(vault.uri(), vault.passphrase())
        .unwrap_err();
    assert!(matches!(err, Error::Locked { .. }), "got {err:?}");

    // A reader sees committed state while the writer keeps working
    TestVault::seed(&writer, &[("/live", b"v1")]);
    let reader = vault.open_read_only();
    TestVault::assert_content(&reader, "/live", b"v1");

    writer.close();
    drop(reader);
    vault.open();
}

#[test]
fn destroy_removes_state_but_allows_recreate() {
    let vault = TestVault::file();
    drop(vault.create());
    let dir = repo_dir(&vault);

    Repo::destroy(vault.uri()).unwrap();
    assert!(!dir.join("superblock.toml").exists());
    assert!(!Repo::exists(vault.uri()).unwrap());

    let repo = vault.create();
    assert!(repo.read_dir("/").unwrap().is_empty());
}

//! Shared repositories across threads, writer exclusivity and snapshots.

use std::sync::{Arc, Barrier};
use std::thread;
use vault_fs::{Error, Whence};
use vault_test_utils::TestVault;

#[test]
fn second_writable_handle_is_in_use() {
    let repo = TestVault::mem().create();
    let _writer = repo.open("/f", "w").unwrap();

    assert!(matches!(repo.open("/f", "a"), Err(Error::InUse { .. })));
    assert!(matches!(repo.open("/f", "r+"), Err(Error::InUse { .. })));
    // Readers are unaffected
    repo.open("/f", "r").unwrap();
}

#[test]
fn closing_writer_releases_the_file() {
    let repo = TestVault::mem().create();
    let mut writer = repo.open("/f", "w").unwrap();
    writer.close().unwrap();
    repo.open("/f", "a").unwrap();

    {
        let _dropped = repo.open("/g", "w").unwrap();
    }
    repo.open("/g", "w").unwrap();
}

#[test]
fn readers_keep_their_snapshot() {
    let repo = TestVault::mem().create();
    TestVault::seed(&repo, &[("/doc", b"version one")]);

    let mut reader = repo.open("/doc", "r").unwrap();
    assert_eq!(reader.read(Some(7)).unwrap(), b"version");

    repo.write_all("/doc", b"version two, longer").unwrap();

    assert_eq!(reader.read(None).unwrap(), b" one");
    reader.seek(0, Whence::Start).unwrap();
    assert_eq!(reader.read(None).unwrap(), b"version one");
    TestVault::assert_content(&repo, "/doc", b"version two, longer");
}

#[test]
fn writer_commits_after_rename() {
    let repo = TestVault::mem().create();
    let mut writer = repo.open("/before", "w").unwrap();
    writer.write(b"moved while open").unwrap();

    repo.rename("/before", "/after", false).unwrap();
    writer.close().unwrap();

    TestVault::assert_content(&repo, "/after", b"moved while open");
}

#[test]
fn writer_of_removed_file_fails_on_commit() {
    let repo = TestVault::mem().create();
    let mut writer = repo.open("/gone", "w").unwrap();
    writer.write(b"orphan").unwrap();

    repo.remove_file("/gone").unwrap();
    assert!(matches!(writer.close(), Err(Error::NotFound { .. })));
    assert!(!repo.path_exists("/gone"));
}

#[test]
fn threads_write_distinct_files() {
    let repo = Arc::new(TestVault::mem().create());
    repo.create_dir("/out").unwrap();

    let num_threads = 8;
    let barrier = Arc::new(Barrier::new(num_threads));
    let handles: Vec<_> = (0..num_threads)
        .map(|id| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..10 {
                    let path = format!("/out/t{id}-{i}");
                    repo.write_all(&path, path.as_bytes()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread should not panic");
    }

    let entries = repo.read_dir("/out").unwrap();
    assert_eq!(entries.len(), num_threads * 10);
    for entry in entries {
        TestVault::assert_content(&repo, entry.path.as_str(), entry.path.as_str().as_bytes());
    }
}

#[test]
fn listings_never_observe_partial_moves() {
    let repo = Arc::new(TestVault::mem().create());
    TestVault::seed(&repo, &[("/a/payload", b"x")]);
    repo.create_dir("/b").unwrap();

    let mover = {
        let repo = Arc::clone(&repo);
        thread::spawn(move || {
            for i in 0..50 {
                let (src, dst) = if i % 2 == 0 {
                    ("/a/payload", "/b/payload")
                } else {
                    ("/b/payload", "/a/payload")
                };
                repo.rename(src, dst, false).unwrap();
            }
        })
    };

    for _ in 0..200 {
        let in_a = repo.read_dir("/a").unwrap().len();
        let in_b = repo.read_dir("/b").unwrap().len();
        // Each listing is a consistent snapshot
        assert!(in_a <= 1 && in_b <= 1);
    }
    mover.join().expect("Mover should not panic");
    assert!(repo.is_file("/a/payload"));
}

#[test]
fn concurrent_exclusive_creates_have_one_winner() {
    let repo = Arc::new(TestVault::mem().create());
    let num_threads = 6;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                repo.open("/race", "x")
                    .and_then(|mut file| file.close())
                    .is_ok()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().expect("Thread should not panic"))
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
}

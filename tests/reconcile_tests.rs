mod common;

use anyhow::Result;
use common::TestTree;
use hashdb::interop;
use hashdb::reconcile::VerifyOptions;
use hashdb::storage::migrations::CURRENT_VERSION;
use hashdb::storage::{EntryKind, Snapshot};
use hashdb::utils::hash::SHA512_EMPTY;
use std::collections::BTreeSet;
use std::fs;

#[test]
fn test_init_then_delete_scenario() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("a.txt", "hi")?;
    tree.write("b.txt", "")?;
    let ctx = tree.ctx()?;
    let store = ctx.store();

    let mut snapshot = store.create(&ctx.work_dir)?;
    ctx.reconciler().update(&mut snapshot)?;
    store.save(&snapshot)?;

    assert_eq!(snapshot.len(), 2);
    assert_eq!(
        snapshot.get(&tree.path("b.txt")).and_then(|e| e.digest.as_deref()),
        Some(SHA512_EMPTY)
    );

    fs::remove_file(tree.path("a.txt"))?;
    let loaded = store.load(&ctx.work_dir)?;
    let diff = ctx.reconciler().status(&loaded)?;

    assert_eq!(diff.removed, BTreeSet::from([tree.path("a.txt")]));
    assert!(diff.added.is_empty());
    assert!(diff.modified.is_empty());
    Ok(())
}

#[test]
fn test_save_load_round_trip_after_update() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("one", "1")?;
    tree.write("deep/er/two", "22")?;
    #[cfg(unix)]
    tree.symlink("one", "link")?;
    let ctx = tree.ctx()?;
    let store = ctx.store();

    let mut snapshot = Snapshot::new(ctx.work_dir.clone());
    ctx.reconciler().update(&mut snapshot)?;
    store.save(&snapshot)?;

    assert_eq!(store.load(&ctx.work_dir)?, snapshot);
    Ok(())
}

#[test]
fn test_second_update_is_empty_after_reload() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("x", "x")?;
    tree.write("y/z", "z")?;
    let ctx = tree.ctx()?;
    let store = ctx.store();

    let mut snapshot = store.create(&ctx.work_dir)?;
    ctx.reconciler().update(&mut snapshot)?;
    store.save(&snapshot)?;

    let mut reloaded = store.load(&ctx.work_dir)?;
    assert!(ctx.reconciler().update(&mut reloaded)?.is_empty());
    Ok(())
}

#[test]
fn test_mtime_noise_not_reported_but_restamped() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("vfat.txt", "content")?;
    tree.set_mtime("vfat.txt", 1_500_000_000)?;
    let ctx = tree.ctx()?;

    let mut snapshot = Snapshot::new(ctx.work_dir.clone());
    ctx.reconciler().update(&mut snapshot)?;
    tree.set_mtime("vfat.txt", 1_500_000_002)?;

    let diff = ctx.reconciler().update(&mut snapshot)?;
    assert!(diff.modified.is_empty());
    assert_eq!(
        snapshot.get(&tree.path("vfat.txt")).and_then(|e| e.mtime),
        Some(1_500_000_002.0)
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_dangling_symlink_retarget_is_modified() -> Result<()> {
    let tree = TestTree::new()?;
    tree.symlink("nowhere-a", "link")?;
    let ctx = tree.ctx()?;

    let mut snapshot = Snapshot::new(ctx.work_dir.clone());
    ctx.reconciler().update(&mut snapshot)?;
    let entry = snapshot.get(&tree.path("link")).expect("link tracked");
    assert_eq!(entry.kind, Some(EntryKind::Symlink));

    fs::remove_file(tree.path("link"))?;
    tree.symlink("nowhere-b", "link")?;

    let diff = ctx.reconciler().update(&mut snapshot)?;
    assert_eq!(diff.modified, BTreeSet::from([tree.path("link")]));
    Ok(())
}

#[test]
fn test_split_scenario() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("sub/x", "x")?;
    tree.write("top/y", "y")?;
    tree.write("sub2/z", "z")?;
    let ctx = tree.ctx()?;

    let mut snapshot = Snapshot::new(ctx.work_dir.clone());
    ctx.reconciler().update(&mut snapshot)?;

    let extracted = interop::split(&snapshot, &tree.path("sub"))?;
    assert_eq!(extracted.root, tree.path("sub"));
    assert_eq!(
        extracted.entries.keys().cloned().collect::<Vec<_>>(),
        vec![tree.path("sub/x")]
    );

    let store = ctx.store();
    store.save(&extracted)?;
    let reloaded = store.load(&tree.path("sub"))?;
    assert_eq!(reloaded.root, tree.path("sub"));
    assert_eq!(reloaded.len(), 1);
    Ok(())
}

#[test]
fn test_verify_clean_tree() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("a", "a")?;
    tree.write("b", "")?;
    let ctx = tree.ctx()?;

    let mut snapshot = Snapshot::new(ctx.work_dir.clone());
    ctx.reconciler().update(&mut snapshot)?;

    let report = ctx.reconciler().verify(&snapshot, VerifyOptions::default())?;
    assert!(report.is_clean());
    assert!(report.refreshed.is_empty());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_version_one_database_is_migrated() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("target.txt", "target body")?;
    tree.symlink("target.txt", "link")?;
    let ctx = tree.ctx()?;
    let hasher = ctx.hasher();

    // Version 1 hashed what the link pointed at and had no "type".
    let legacy = serde_json::json!({
        "version": 1,
        "files": {
            "target.txt": {"size": 11, "mtime": 1.0, "hash": hasher.hash_bytes(b"target body")},
            "link": {"size": 11, "mtime": 1.0, "hash": hasher.hash_bytes(b"target body")},
        }
    });
    fs::write(tree.path("hash_db.json"), serde_json::to_vec(&legacy)?)?;

    let snapshot = ctx.store().load(&ctx.work_dir)?;
    assert_eq!(snapshot.version, CURRENT_VERSION);

    let link = snapshot.get(&tree.path("link")).expect("link kept");
    assert_eq!(link.kind, Some(EntryKind::Symlink));
    assert_eq!(link.digest, Some(hasher.hash_bytes(b"target.txt")));

    let target = snapshot.get(&tree.path("target.txt")).expect("target kept");
    assert_eq!(target.kind, Some(EntryKind::File));
    assert_eq!(target.mtime, Some(1.0));
    Ok(())
}

#[test]
fn test_newer_database_is_refused() -> Result<()> {
    let tree = TestTree::new()?;
    tree.write("hash_db.json", r#"{"version": 99, "files": {}}"#)?;
    let ctx = tree.ctx()?;

    let err = ctx.store().load(&ctx.work_dir).expect_err("newer schema");
    assert!(matches!(err, hashdb::HashDbError::UnsupportedVersion { found: 99, .. }));
    Ok(())
}

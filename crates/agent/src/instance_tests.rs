// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use super::*;

fn fake_process(root: &Path, pid: u32, argv: &[&str]) -> anyhow::Result<()> {
    let dir = root.join(pid.to_string());
    std::fs::create_dir_all(&dir)?;
    let mut cmdline = Vec::new();
    for arg in argv {
        cmdline.extend_from_slice(arg.as_bytes());
        cmdline.push(0);
    }
    std::fs::write(dir.join("cmdline"), cmdline)?;
    Ok(())
}

fn guard(probe: impl InstanceProbe + 'static) -> InstanceGuard {
    InstanceGuard::new(Box::new(probe))
}

#[test]
fn background_sibling_is_detected() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    fake_process(root.path(), 1, &["/sbin/init"])?;
    fake_process(root.path(), 4242, &["/usr/local/bin/hookcast", "--background", "http://h:1"])?;

    let table = ProcessTable::new(root.path(), "hookcast", 100);
    assert_eq!(guard(table).try_acquire(BACKGROUND_ROLE), Acquire::AlreadyRunning);
    Ok(())
}

#[test]
fn empty_table_acquires() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    fake_process(root.path(), 1, &["/sbin/init"])?;

    let table = ProcessTable::new(root.path(), "hookcast", 100);
    assert_eq!(guard(table).try_acquire(BACKGROUND_ROLE), Acquire::Acquired);
    Ok(())
}

#[test]
fn interactive_sibling_without_marker_is_ignored() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    fake_process(root.path(), 77, &["hookcast", "http://h:1"])?;

    let table = ProcessTable::new(root.path(), "hookcast", 100);
    assert!(!table.detect_running_instance(BACKGROUND_ROLE)?);
    Ok(())
}

#[test]
fn other_executable_with_marker_is_ignored() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    fake_process(root.path(), 77, &["/usr/bin/other", "--background"])?;

    let table = ProcessTable::new(root.path(), "hookcast", 100);
    assert!(!table.detect_running_instance(BACKGROUND_ROLE)?);
    Ok(())
}

#[test]
fn own_pid_is_excluded() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    fake_process(root.path(), 100, &["hookcast", "--background", "http://h:1"])?;

    let table = ProcessTable::new(root.path(), "hookcast", 100);
    assert!(!table.detect_running_instance(BACKGROUND_ROLE)?);
    Ok(())
}

#[test]
fn non_pid_entries_and_unreadable_processes_are_skipped() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    std::fs::create_dir_all(root.path().join("self"))?;
    std::fs::write(root.path().join("self").join("cmdline"), b"hookcast\0--background\0")?;
    // Directory without a cmdline file, as if the process just exited.
    std::fs::create_dir_all(root.path().join("555"))?;

    let table = ProcessTable::new(root.path(), "hookcast", 100);
    assert!(!table.detect_running_instance(BACKGROUND_ROLE)?);
    Ok(())
}

#[test]
fn missing_procfs_is_treated_as_not_running() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let table = ProcessTable::new(root.path().join("absent"), "hookcast", 100);
    assert!(table.detect_running_instance(BACKGROUND_ROLE).is_err());
    assert_eq!(guard(table).try_acquire(BACKGROUND_ROLE), Acquire::Acquired);
    Ok(())
}

#[test]
fn held_lock_is_detected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let lock = LockFile::new(dir.path().join("run").join("hookcast.lock"));

    let hold = lock.hold()?;
    assert!(hold.is_some());
    assert_eq!(guard(lock.clone()).try_acquire(BACKGROUND_ROLE), Acquire::AlreadyRunning);
    assert!(lock.hold()?.is_none());

    drop(hold);
    assert_eq!(guard(lock).try_acquire(BACKGROUND_ROLE), Acquire::Acquired);
    Ok(())
}

#[test]
fn probing_a_free_lock_does_not_keep_it() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let lock = LockFile::new(dir.path().join("hookcast.lock"));

    assert!(!lock.detect_running_instance(BACKGROUND_ROLE)?);
    assert!(!lock.detect_running_instance(BACKGROUND_ROLE)?);
    assert!(lock.hold()?.is_some());
    Ok(())
}

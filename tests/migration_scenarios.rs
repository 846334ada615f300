mod common;

use common::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use storage_migrate::{CancelToken, FailureKind, MigrationCoordinator, PathSwitchCoordinator, Phase, SyncGuard};

fn coordinator(fx: &Fixture, fs: FaultyFs) -> MigrationCoordinator {
    MigrationCoordinator::new(fx.env(fs)).with_poll_interval(FAST_POLL)
}

#[test]
fn scenario_a_full_migration_succeeds() {
    let fx = Fixture::new();
    let before = snapshot_tree(&fx.src_data());

    let outcome = coordinator(&fx, fx.fs()).run(&fx.request());

    assert!(outcome.is_success(), "{:?}", outcome.failure());
    assert_eq!(snapshot_tree(&fx.dst_data()), before);
    assert_eq!(before.len(), 3);
    assert!(!fx.src_data().exists(), "source data folder should be removed");
    assert!(fx.src_root.exists(), "source root itself stays");

    let mut alice = fx.storage_paths(USER);
    alice.sort();
    assert_eq!(alice, vec![fx.dst_root.join("data/a.txt"), fx.dst_root.join("data/docs/b.txt")]);
    // Records of other users are left alone.
    assert_eq!(fx.storage_paths("bob"), vec![fx.src_root.join("data/docs/deep/c.bin")]);

    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);
    assert_eq!(fx.listener.finished(), vec![(fx.dst_root.clone(), true)]);
}

#[test]
fn scenario_b_insufficient_space_never_creates_destination() {
    let fx = Fixture::new();
    let outcome = coordinator(&fx, fx.fs().free_space(5)).run(&fx.request());

    match outcome.failure() {
        Some(FailureKind::InsufficientSpace { required, available }) => {
            assert_eq!(*required, 10);
            assert_eq!(*available, 5);
        }
        other => panic!("expected InsufficientSpace, got {other:?}"),
    }
    assert!(!fx.dst_data().exists());
    assert!(fx.journal.position(|e| e.starts_with("sync ")).is_none(), "sync must not be touched");
    assert!(fx.journal.position(|e| e.starts_with("mkdir ")).is_none());
    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);
    assert_eq!(fx.listener.finished(), vec![(fx.src_root.clone(), false)]);
}

#[test]
fn scenario_c_existing_destination_fails_before_pausing_sync() {
    let fx = Fixture::new();
    std::fs::create_dir_all(fx.dst_data()).unwrap();
    std::fs::write(fx.dst_data().join("keep.txt"), "keep").unwrap();

    let outcome = coordinator(&fx, fx.fs()).run(&fx.request());

    assert!(matches!(outcome.failure(), Some(FailureKind::DestinationAlreadyExists { .. })));
    assert_eq!(outcome.code(), 12);
    assert_eq!(std::fs::read_to_string(fx.dst_data().join("keep.txt")).unwrap(), "keep");
    assert!(!fx.listener.phases().contains(&Phase::PausingSync));
    assert!(fx.journal.position(|e| e.starts_with("sync ") || e.starts_with("rm")).is_none());
    assert_eq!(snapshot_tree(&fx.src_data()).len(), 3);
}

#[test]
fn scenario_d_index_failure_rolls_back_destination() {
    let fx = Fixture::with_failing_index();
    let before = snapshot_tree(&fx.src_data());

    let outcome = coordinator(&fx, fx.fs()).run(&fx.request());

    let Some(kind @ FailureKind::IndexUpdateFailed { .. }) = outcome.failure() else {
        panic!("expected IndexUpdateFailed, got {:?}", outcome.failure());
    };
    let cause = std::error::Error::source(kind).expect("cause kept");
    assert!(cause.to_string().contains("read-only"));

    assert!(!fx.dst_data().exists(), "rollback should remove the copy");
    assert_eq!(snapshot_tree(&fx.src_data()), before);
    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);
    // Index records untouched.
    assert!(fx.storage_paths(USER).iter().all(|p| p.starts_with(&fx.src_root)));

    let phases = fx.listener.phases();
    assert_eq!(
        &phases[phases.len() - 4..],
        &[Phase::UpdatingIndex, Phase::RollingBack, Phase::RestoringSyncState, Phase::Failed]
    );
}

#[test]
fn scenario_e_unreadable_source_then_path_switch() {
    let fx = Fixture::new();
    let fs = fx.fs().unreadable(&fx.src_root);

    let outcome = coordinator(&fx, fs.clone()).run(&fx.request());
    let kind = outcome.failure().expect("should fail");
    assert!(kind.is_not_readable());

    let switched = PathSwitchCoordinator::new(fx.env(fs))
        .with_poll_interval(FAST_POLL)
        .run(&fx.request());
    assert!(switched.is_success());
    assert!(
        fx.journal
            .position(|e| e.starts_with("mkdir") || e.starts_with("copy") || e.starts_with("rm") || e.starts_with("remove"))
            .is_none(),
        "no file may be touched: {:?}",
        fx.journal.entries()
    );
    assert_eq!(snapshot_tree(&fx.src_data()).len(), 3);
    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);
    assert_eq!(
        fx.listener.finished(),
        vec![(fx.src_root.clone(), false), (fx.dst_root.clone(), true)]
    );
}

#[test]
fn copy_failure_removes_partial_destination() {
    let fx = Fixture::new();
    let before = snapshot_tree(&fx.src_data());

    let outcome = coordinator(&fx, fx.fs().fail_copy_on("c.bin")).run(&fx.request());

    assert!(matches!(outcome.failure(), Some(FailureKind::CopyFailed { .. })));
    assert!(!fx.dst_data().exists());
    assert!(fx.dst_root.exists(), "target root itself is not removed");
    assert_eq!(snapshot_tree(&fx.src_data()), before);
    assert!(fx.journal.position(|e| e == "index").is_none());
    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);
}

#[test]
fn unclean_rollback_keeps_original_failure() {
    let fx = Fixture::new();
    let fs = fx.fs().fail_copy_on("c.bin").fail_remove_on("a.txt");

    let outcome = coordinator(&fx, fs).run(&fx.request());

    assert!(matches!(outcome.failure(), Some(FailureKind::CopyFailed { .. })));
    assert!(fx.dst_data().join("a.txt").exists(), "the undeletable file is left behind");
    assert!(!fx.dst_data().join("docs").exists());
    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);
    assert_eq!(fx.listener.finished().len(), 1);
}

#[test]
fn index_is_updated_before_source_is_removed() {
    let fx = Fixture::new();
    let src_data = fx.src_data().display().to_string();

    assert!(coordinator(&fx, fx.fs()).run(&fx.request()).is_success());

    let index_at = fx.journal.position(|e| e == "index").expect("index rewritten");
    let first_source_removal = fx
        .journal
        .position(|e| (e.starts_with("remove ") || e.starts_with("rmdir ")) && e.contains(&src_data))
        .expect("source removed");
    assert!(index_at < first_source_removal, "{:?}", fx.journal.entries());
}

#[test]
fn sync_is_disabled_for_the_whole_copy() {
    let fx = Fixture::new();
    assert!(coordinator(&fx, fx.fs()).run(&fx.request()).is_success());

    let paused = fx.journal.position(|e| e == "sync alice=false").expect("alice paused");
    let first_copy = fx.journal.position(|e| e.starts_with("copy ")).expect("copied");
    let last_copy = fx.journal.last_position(|e| e.starts_with("copy ")).unwrap();
    let restored = fx.journal.position(|e| e == "sync alice=true").expect("alice restored");
    assert!(paused < first_copy);
    assert!(last_copy < restored);
    let last_removal = fx.journal.last_position(|e| e.starts_with("rmdir ")).unwrap();
    assert!(last_removal < restored, "restore happens after cleanup");
}

#[test]
fn sync_snapshot_failure_fails_without_pausing() {
    let fx = Fixture::with_failing_sync_reads();

    let outcome = coordinator(&fx, fx.fs()).run(&fx.request());

    assert!(matches!(outcome.failure(), Some(FailureKind::SyncStateUnavailable { .. })));
    assert!(fx.journal.position(|e| e.starts_with("sync ")).is_none());
    assert!(!fx.dst_data().exists());
    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);
}

#[test]
fn refused_pause_fails_before_copying_and_restores_snapshot() {
    let fx = Fixture::new();
    fx.sync.refuse_pause_for("alice");
    let before = snapshot_tree(&fx.src_data());

    let outcome = coordinator(&fx, fx.fs()).run(&fx.request());

    let Some(FailureKind::SyncPauseFailed { reason }) = outcome.failure() else {
        panic!("expected SyncPauseFailed, got {:?}", outcome.failure());
    };
    assert!(reason.contains("alice"), "{reason}");
    assert_eq!(outcome.code(), 17);
    assert!(fx.journal.position(|e| e.starts_with("copy ") || e.starts_with("mkdir ")).is_none());
    assert!(!fx.dst_data().exists());
    assert_eq!(snapshot_tree(&fx.src_data()), before);
    assert!(fx.storage_paths(USER).iter().all(|p| p.starts_with(&fx.src_root)));

    // bob was paused before the failure surfaced and gets his flag back.
    let bob_paused = fx.journal.position(|e| e == "sync bob=false").expect("bob paused");
    assert!(fx.journal.last_position(|e| e == "sync bob=false").unwrap() > bob_paused);
    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);

    let phases = fx.listener.phases();
    assert_eq!(
        &phases[phases.len() - 4..],
        &[Phase::PausingSync, Phase::RollingBack, Phase::RestoringSyncState, Phase::Failed]
    );
    assert_eq!(fx.listener.finished(), vec![(fx.src_root.clone(), false)]);
}

#[test]
fn failed_restore_is_skipped_and_keeps_success() {
    let fx = Fixture::new();
    fx.sync.fail_restore_for("alice");

    let outcome = coordinator(&fx, fx.fs()).run(&fx.request());

    assert!(outcome.is_success(), "{:?}", outcome.failure());
    let refused = fx.journal.position(|e| e == "sync alice=true refused").expect("restore attempted");
    let bob_restored = fx.journal.last_position(|e| e == "sync bob=false").unwrap();
    assert!(refused < bob_restored, "{:?}", fx.journal.entries());
    assert_eq!(fx.flags(), vec![Some(false), Some(false)]);
    assert_eq!(fx.listener.finished(), vec![(fx.dst_root.clone(), true)]);
}

#[test]
fn failed_restore_keeps_original_failure() {
    let fx = Fixture::with_failing_index();
    fx.sync.fail_restore_for("bob");

    let outcome = coordinator(&fx, fx.fs()).run(&fx.request());

    assert!(matches!(outcome.failure(), Some(FailureKind::IndexUpdateFailed { .. })));
    assert!(fx.journal.position(|e| e == "sync bob=false refused").is_some());
    // alice still gets her flag back.
    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);
    assert!(!fx.dst_data().exists());
}

#[test]
fn restore_counts_accounts_it_could_not_write() {
    let fx = Fixture::new();
    let guard = SyncGuard::new(&*fx.sync, &fx.accounts, CancelToken::new());
    let snapshot = guard.snapshot().unwrap();
    guard.pause_all().unwrap();
    fx.sync.fail_restore_for("alice");

    assert_eq!(guard.restore(Some(snapshot)), 1);
    assert_eq!(fx.flags(), vec![Some(false), Some(false)]);
    assert_eq!(fx.journal.entries().iter().filter(|e| *e == "sync bob=false").count(), 2);
}

#[test]
fn unwritable_target_is_rejected() {
    let fx = Fixture::new();
    let outcome = coordinator(&fx, fx.fs().unwritable(&fx.dst_root)).run(&fx.request());
    assert!(matches!(outcome.failure(), Some(FailureKind::NotWritable { path }) if *path == fx.dst_root));
}

#[test]
fn absent_source_data_produces_empty_destination() {
    let fx = Fixture::new();
    std::fs::remove_dir_all(fx.src_data()).unwrap();

    let outcome = coordinator(&fx, fx.fs()).run(&fx.request());

    assert!(outcome.is_success());
    assert!(fx.dst_data().is_dir());
    assert!(snapshot_tree(&fx.dst_data()).is_empty());
    assert!(!fx.src_data().exists());
}

#[test]
fn copy_waits_for_running_sync_to_finish() {
    let fx = Fixture::new();
    fx.sync.inner.set_active(&fx.accounts[0], true);
    let sync = Arc::clone(&fx.sync);
    let alice = fx.accounts[0].clone();

    let started = Instant::now();
    let finisher = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        sync.inner.set_active(&alice, false);
    });
    let outcome = coordinator(&fx, fx.fs()).run(&fx.request());
    finisher.join().unwrap();

    assert!(outcome.is_success());
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn cancelled_wait_proceeds_with_copy() {
    let fx = Fixture::new();
    fx.sync.inner.set_active(&fx.accounts[0], true);
    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        trigger.request();
    });

    let outcome = MigrationCoordinator::new(fx.env(fx.fs()))
        .with_poll_interval(Duration::from_secs(60))
        .with_cancel(cancel)
        .run(&fx.request());
    canceller.join().unwrap();

    assert!(outcome.is_success());
    assert_eq!(snapshot_tree(&fx.dst_data()).len(), 3);
    assert_eq!(fx.flags(), vec![Some(true), Some(false)]);
}

#[test]
fn every_run_finishes_exactly_once_with_terminal_phase_last() {
    let setups: [fn(&Fixture) -> FaultyFs; 3] = [
        |fx| fx.fs(),
        |fx| fx.fs().free_space(0),
        |fx| fx.fs().fail_copy_on("b.txt"),
    ];
    for fs_setup in setups {
        let fx = Fixture::new();
        let outcome = coordinator(&fx, fs_setup(&fx)).run(&fx.request());
        assert_eq!(fx.listener.finished().len(), 1);
        let phases = fx.listener.phases();
        assert_eq!(phases.first(), Some(&Phase::Preparing));
        let last = *phases.last().unwrap();
        assert_eq!(last, if outcome.is_success() { Phase::Done } else { Phase::Failed });
        assert_eq!(phases.iter().filter(|p| p.is_terminal()).count(), 1);
        assert!(phases.contains(&Phase::RestoringSyncState));
    }
}

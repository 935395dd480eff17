//! Waits under injected faults and shrinking clusters.

mod harness;

use std::time::Duration;

use fleet_converge::query::ListUnitFiles;
use fleet_converge::{ClusterDriver, ConvergeError, PollPredicate};
use harness::Scenario;

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_absorbed() {
    let s = Scenario::start().await;

    s.fleetctl(&["submit", &s.unit("hello.service")]).await;
    s.sim.fail_next_queries(3);

    let files = s.poller.wait_for_unit_files(&s.member, 1).await.unwrap();
    assert!(files.contains_key("hello.service"));
}

#[tokio::test(start_paused = true)]
async fn test_failures_only_time_out_with_last_error() {
    let s = Scenario::start().await;
    s.sim.fail_next_queries(u32::MAX);

    let err = s
        .poller
        .await_condition(&s.member, &ListUnitFiles, &PollPredicate::count(0), Duration::from_secs(2))
        .await
        .unwrap_err();

    match err {
        ConvergeError::ConvergenceTimeout {
            last_snapshot,
            last_error,
            ..
        } => {
            assert!(last_snapshot.is_none());
            assert!(last_error.unwrap().contains("context deadline exceeded"));
        }
        other => panic!("expected ConvergenceTimeout, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_destroyed_member_fails_fast() {
    let s = Scenario::start().await;
    s.sim.destroy_member(&s.member).await.unwrap();

    let start = tokio::time::Instant::now();
    let err = s.poller.wait_for_units(&s.member, 1).await.unwrap_err();

    assert!(matches!(err, ConvergeError::TargetUnavailable { .. }));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_membership_mismatch_names_extra_unit() {
    let s = Scenario::start().await;
    let units: Vec<String> = ["a.service", "b.service", "c.service"]
        .iter()
        .map(|name| {
            let path = s.dir.path().join(name);
            fleet_testing::fixtures::copy_unit(&path, &s.dir.path().join("hello.service")).unwrap();
            path.to_string_lossy().into_owned()
        })
        .collect();
    s.fleetctl_units("submit", &[], &units).await;

    let err = s
        .poller
        .await_exact_membership(
            &s.member,
            &ListUnitFiles,
            ["a.service", "b.service"],
            Duration::from_secs(3),
        )
        .await
        .unwrap_err();

    match err {
        ConvergeError::MembershipMismatch {
            missing,
            unexpected,
            ..
        } => {
            assert!(missing.is_empty());
            assert_eq!(unexpected.into_iter().collect::<Vec<_>>(), vec!["c.service"]);
        }
        other => panic!("expected MembershipMismatch, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_machines_follow_membership() {
    let s = Scenario::start().await;
    let second = s.sim.create_member().await.unwrap();
    let third = s.sim.create_member().await.unwrap();

    s.poller.wait_for_machines(&s.member, 3).await.unwrap();

    s.sim.destroy_member(&third).await.unwrap();
    let machines = s.poller.wait_for_machines(&second, 2).await.unwrap();
    assert_eq!(machines.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_independent_waits_run_concurrently() {
    let s = Scenario::start().await;

    s.fleetctl(&["submit", &s.unit("hello.service")]).await;
    s.fleetctl(&["start", &s.unit("hello@1.service")]).await;

    let files = s.poller.clone();
    let active = s.poller.clone();
    let (files, active) = tokio::join!(
        files.wait_for_unit_files(&s.member, 2),
        active.wait_for_active_units(&s.member, 1),
    );

    assert_eq!(files.unwrap().len(), 2);
    assert!(active.unwrap().contains_key("hello@1.service"));
}

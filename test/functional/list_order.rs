//! `list-unit-files` ordering.

mod harness;

use fleet_converge::check_sorted;
use fleet_testing::fixtures;
use harness::Scenario;

#[tokio::test(start_paused = true)]
async fn test_list_unit_files_order() {
    const N: usize = 20;
    let s = Scenario::start().await;

    let paths = fixtures::instance_paths(s.dir.path(), "hello", N);
    for path in &paths {
        s.fleetctl(&["submit", &path.to_string_lossy()]).await;
    }

    s.poller.wait_for_unit_files(&s.member, N).await.unwrap();

    let names = s
        .poller
        .list_names(&s.member, &["list-unit-files", "--no-legend", "--fields", "unit"])
        .await
        .unwrap();

    check_sorted(&names).unwrap();

    let expected: Vec<String> = (1..=N).map(|i| format!("hello@{i:02}.service")).collect();
    assert_eq!(names, expected);
}

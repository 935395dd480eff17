//! Unit lifecycle scenarios.
//!
//! Every mutation is followed by a convergence wait, never a fixed sleep.
//!
//! ```bash
//! cargo test -p fleet-functional --test unit_actions
//! ```

mod harness;

use fleet_converge::query::ListUnitFiles;
use fleet_testing::fixtures;
use harness::Scenario;
use rstest::rstest;

/// A launch verb and the listing it shows up in.
#[derive(Debug, Clone, Copy)]
enum Verb {
    Submit,
    Load,
    Start,
}

impl Verb {
    fn command(self) -> &'static str {
        match self {
            Verb::Submit => "submit",
            Verb::Load => "load",
            Verb::Start => "start",
        }
    }

    /// Command that undoes this verb.
    fn teardown(self) -> &'static str {
        match self {
            Verb::Submit => "destroy",
            Verb::Load => "unload",
            Verb::Start => "stop",
        }
    }

    /// Wait until the listing this verb affects holds `count` entries.
    async fn wait(self, s: &Scenario, count: usize) {
        let result: Result<usize, String> = match self {
            Verb::Submit => s
                .poller
                .wait_for_unit_files(&s.member, count)
                .await
                .map(|files| files.len())
                .map_err(|e| e.to_string()),
            Verb::Load => s
                .poller
                .wait_for_units(&s.member, count)
                .await
                .map(|units| units.len())
                .map_err(|e| e.to_string()),
            Verb::Start => s
                .poller
                .wait_for_active_units(&s.member, count)
                .await
                .map(|units| units.len())
                .map_err(|e| e.to_string()),
        };
        if let Err(e) = result {
            panic!("{} did not converge to {count}: {e}", self.command());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_unit_runnable() {
    let s = Scenario::start().await;

    s.fleetctl(&["start", &s.unit("hello.service")]).await;
    let active = s.poller.wait_for_active_units(&s.member, 1).await.unwrap();

    let unit = active.get("hello.service").expect("hello.service is not listed");
    assert_eq!(unit.sub_state, "running");
    assert!(unit.machine().is_some());
}

#[rstest]
#[case::submit(Verb::Submit, 9)]
#[case::load(Verb::Load, 6)]
#[case::start(Verb::Start, 3)]
#[tokio::test(start_paused = true)]
async fn test_batch_lifecycle(#[case] verb: Verb, #[case] n: usize) {
    let s = Scenario::start().await;
    let units = s.template_instances(n);

    s.fleetctl_units(verb.command(), &[], &units).await;
    verb.wait(&s, n).await;

    s.fleetctl_units(verb.teardown(), &[], &units).await;
    verb.wait(&s, 0).await;

    // The same batch launches again once torn down.
    s.fleetctl_units(verb.command(), &[], &units).await;
    verb.wait(&s, n).await;

    s.fleetctl_units(verb.teardown(), &[], &units).await;
    verb.wait(&s, 0).await;
}

#[rstest]
#[case::submit(Verb::Submit)]
#[case::load(Verb::Load)]
#[case::start(Verb::Start)]
#[tokio::test(start_paused = true)]
async fn test_replace_unit(#[case] verb: Verb) {
    let s = Scenario::start().await;
    let path = s.unit("hello.service");

    s.fleetctl(&[verb.command(), &path]).await;
    verb.wait(&s, 1).await;

    fixtures::rewrite_unit(path.as_ref(), path.as_ref(), "sleep 2", "sleep 1").unwrap();

    // Without --replace the changed body is refused.
    let refused = s
        .poller
        .driver()
        .run_command(&s.member, &[verb.command(), &path])
        .await;
    assert!(refused.is_err());

    s.fleetctl(&[verb.command(), "--replace", &path]).await;
    verb.wait(&s, 1).await;

    let cat = s.fleetctl(&["cat", "hello.service"]).await;
    assert!(cat.stdout.contains("sleep 2"), "cat shows old body: {}", cat.stdout);

    s.fleetctl(&["destroy", "hello.service"]).await;
    s.poller.wait_for_unit_files(&s.member, 0).await.unwrap();
}

#[rstest]
#[case::submit(Verb::Submit)]
#[case::load(Verb::Load)]
#[case::start(Verb::Start)]
#[tokio::test(start_paused = true)]
async fn test_replace_multiple_units(#[case] verb: Verb) {
    const N: usize = 9;
    let s = Scenario::start().await;
    let template = s.dir.path().join("hello.service");

    let units: Vec<String> = (1..=N)
        .map(|i| {
            let path = s.unit(&format!("hello{i}.service"));
            fixtures::copy_unit(path.as_ref(), &template).unwrap();
            path
        })
        .collect();

    s.fleetctl_units(verb.command(), &[], &units).await;
    verb.wait(&s, N).await;

    for path in &units {
        fixtures::rewrite_unit(path.as_ref(), &template, "sleep 2", "sleep 1").unwrap();
        s.fleetctl(&[verb.command(), "--replace", path]).await;
    }
    verb.wait(&s, N).await;

    for i in 1..=N {
        let cat = s.fleetctl(&["cat", &format!("hello{i}.service")]).await;
        assert!(cat.stdout.contains("sleep 2"), "hello{i}.service was not replaced");
    }

    s.fleetctl_units("destroy", &[], &units).await;
    s.poller.wait_for_unit_files(&s.member, 0).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unit_cat() {
    let s = Scenario::start().await;
    let path = s.unit("hello.service");

    s.fleetctl(&["submit", &path]).await;
    let files = s.poller.wait_for_unit_files(&s.member, 1).await.unwrap();
    assert!(files.get("hello.service").is_some_and(|f| f.is_settled()));

    let cat = s.fleetctl(&["cat", "hello.service"]).await;
    let body = std::fs::read_to_string(&path).unwrap();
    assert_eq!(cat.stdout.trim(), body.trim());
}

#[tokio::test(start_paused = true)]
async fn test_unit_status() {
    let s = Scenario::start().await;
    let path = s.unit("hello.service");

    s.fleetctl(&["load", &path]).await;
    let loaded = s.poller.wait_for_units(&s.member, 1).await.unwrap();
    assert!(loaded.get("hello.service").is_some_and(|u| u.is_loaded()));

    let status = s.fleetctl(&["status", "hello.service"]).await;
    assert!(status.stdout.contains("Loaded: loaded"), "{}", status.stdout);

    s.fleetctl(&["start", "hello.service"]).await;
    s.poller.wait_for_active_units(&s.member, 1).await.unwrap();

    let status = s.fleetctl(&["status", "hello.service"]).await;
    assert!(status.stdout.contains("Active: active"), "{}", status.stdout);
}

#[tokio::test(start_paused = true)]
async fn test_submit_destroy_resubmit() {
    let s = Scenario::start().await;
    let path = s.unit("hello.service");
    let timeout = s.poller.config().timeout;

    s.fleetctl(&["submit", &path]).await;
    s.poller
        .await_exact_membership(&s.member, &ListUnitFiles, ["hello.service"], timeout)
        .await
        .unwrap();

    s.fleetctl(&["destroy", "hello.service"]).await;
    s.poller.wait_for_unit_files(&s.member, 0).await.unwrap();

    s.fleetctl(&["submit", &path]).await;
    let files = s.poller.wait_for_unit_files(&s.member, 1).await.unwrap();
    assert!(files.contains_key("hello.service"));
}

//! Shared scenario setup: a simulated cluster with one member and a scratch
//! directory holding the hello unit files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fleet_converge::{ClusterDriver, CommandOutput, Member, PollConfig, Poller};
use fleet_testing::{fixtures, SimConfig, SimulatedCluster};
use tempfile::TempDir;

/// Directory holding the checked-in unit files.
pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/units")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleet_converge=debug,fleet_testing=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

pub struct Scenario {
    pub sim: Arc<SimulatedCluster>,
    pub poller: Poller,
    pub member: Member,
    pub dir: TempDir,
}

impl Scenario {
    /// One member, joined, with `hello.service` and `hello@.service` written out.
    pub async fn start() -> Self {
        Self::with_config(SimConfig::default()).await
    }

    pub async fn with_config(config: SimConfig) -> Self {
        init_tracing();

        let sim = Arc::new(SimulatedCluster::new(config));
        let member = sim.create_member().await.expect("create member");
        let poller = Poller::new(sim.clone(), PollConfig::default());

        poller
            .wait_for_machines(&member, 1)
            .await
            .expect("member never joined");

        let dir = tempfile::tempdir().expect("tempdir");
        fixtures::hello_unit(dir.path()).expect("write hello.service");
        fixtures::hello_template(dir.path()).expect("write hello@.service");

        Self {
            sim,
            poller,
            member,
            dir,
        }
    }

    /// Path of a unit file in the scratch directory.
    pub fn unit(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    /// Run fleetctl and fail the scenario on a non-zero exit or an `Error`
    /// on stderr.
    pub async fn fleetctl(&self, args: &[&str]) -> CommandOutput {
        let output = self
            .poller
            .driver()
            .run_command(&self.member, args)
            .await
            .unwrap_or_else(|e| panic!("fleetctl {args:?} failed: {e}"));
        assert!(
            !output.stderr.contains("Error"),
            "fleetctl {args:?} reported: {}",
            output.stderr
        );
        output
    }

    /// Run `verb` over several unit paths in one command.
    pub async fn fleetctl_units(&self, verb: &str, flags: &[&str], units: &[String]) -> CommandOutput {
        let mut args: Vec<&str> = vec![verb];
        args.extend_from_slice(flags);
        args.extend(units.iter().map(String::as_str));
        self.fleetctl(&args).await
    }

    /// Paths `hello@1.service`..`hello@{n}.service`, backed by the template.
    pub fn template_instances(&self, n: usize) -> Vec<String> {
        (1..=n).map(|i| self.unit(&format!("hello@{i}.service"))).collect()
    }
}

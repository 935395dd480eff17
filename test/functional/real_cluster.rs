//! Smoke test against a live cluster.
//!
//! Needs `fleetctl` on PATH (or `FLEETCTL_BIN`) and `FLEET_ENDPOINTS`
//! pointing at a running fleet:
//!
//! ```bash
//! FLEET_ENDPOINTS=http://172.17.8.101:2379 \
//!     cargo test -p fleet-functional --test real_cluster -- --ignored
//! ```

mod harness;

use std::sync::Arc;

use anyhow::{Context, Result};
use fleet_converge::{ClusterDriver, PollConfig, Poller};
use fleet_platform::{FleetctlDriver, PlatformConfig};
use harness::{fixture_dir, init_tracing};

#[tokio::test]
#[ignore = "needs a running fleet cluster"]
async fn test_submit_and_destroy_on_live_cluster() -> Result<()> {
    init_tracing();

    let driver = Arc::new(FleetctlDriver::new(PlatformConfig::from_env()?));
    let member = driver.create_member().await?;
    let poller = Poller::new(driver.clone(), PollConfig::from_env()?);

    let path = fixture_dir().join("hello.service");
    let path = path.to_string_lossy();

    driver
        .run_command(&member, &["submit", &path])
        .await
        .context("submit hello.service")?;
    let files = poller.wait_for_unit_files(&member, 1).await?;
    anyhow::ensure!(files.contains_key("hello.service"), "hello.service not listed");

    driver
        .run_command(&member, &["destroy", "hello.service"])
        .await
        .context("destroy hello.service")?;
    poller.wait_for_unit_files(&member, 0).await?;

    Ok(())
}

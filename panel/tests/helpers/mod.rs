#![allow(dead_code)]

pub mod http;
pub mod logging;
pub mod mock_gateway;

pub use http::DevConfigServer;
pub use logging::TestLogger;
pub use mock_gateway::MockGateway;

use std::time::Duration;

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

//! Await-condition utility used for container polling

use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("condition not met within {waited:?} ({attempts} probes)")]
pub struct WaitTimeout {
    pub waited: Duration,
    pub attempts: u32,
}

/// Probe `condition` immediately and then every `interval` until it yields a
/// value or `deadline` has elapsed.
///
/// Runs on tokio time, so a paused test clock drives it deterministically.
pub async fn wait_until<T, F>(
    mut condition: F,
    interval: Duration,
    deadline: Duration,
) -> Result<T, WaitTimeout>
where
    F: FnMut() -> Option<T>,
{
    let start = Instant::now();
    let mut attempts = 0;
    loop {
        attempts += 1;
        if let Some(value) = condition() {
            return Ok(value);
        }

        let waited = start.elapsed();
        if waited >= deadline {
            return Err(WaitTimeout { waited, attempts });
        }
        tokio::time::sleep(interval.min(deadline - waited)).await;
    }
}

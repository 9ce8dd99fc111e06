//! Global wall-clock budget for one `answer` call.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancels its token once `limit` has elapsed.
///
/// Stages hold clones of the token and stop starting new work when it
/// fires; in-flight task sets are aborted by their owners.
#[derive(Debug)]
pub struct Budget {
    deadline: Instant,
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Budget {
    pub fn start(limit: Duration) -> Self {
        let token = CancellationToken::new();
        let deadline = Instant::now() + limit;
        let timer_token = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            tracing::debug!(budget_ms = limit.as_millis() as u64, "budget elapsed");
            timer_token.cancel();
        });

        Self { deadline, token, timer }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_exhausted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl Drop for Budget {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

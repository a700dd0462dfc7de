/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Cooperative cancellation of a migration run.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::Semaphore;

/// The `CancellationSignal` lets a signal handler request a graceful stop.
///
/// The pipeline polls [Self::is_signaled()] between documents, while async
/// tasks can wait for the signal.
pub struct CancellationSignal {
    signaled: AtomicBool,
    semaphore: Semaphore,
}

impl CancellationSignal {
    /// Return a new instance.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            signaled: AtomicBool::default(),
            semaphore: Semaphore::new(0),
        })
    }

    /// Wait for signal.
    pub async fn wait_for_signal(&self) {
        let _ = self.semaphore.acquire().await;
    }

    /// Return `true` once a stop has been requested.
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Relaxed)
    }

    /// Request a stop and wake any awaiting task.
    pub fn signal(&self) {
        // Only add permits once.
        if !self.signaled.swap(true, Ordering::Relaxed) {
            self.semaphore.add_permits(Semaphore::MAX_PERMITS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_wakes_waiters() {
        let cancel = CancellationSignal::new();
        assert!(!cancel.is_signaled());
        let waiter = {
            let cancel = Arc::clone(&cancel);
            tokio::spawn(async move { cancel.wait_for_signal().await })
        };
        cancel.signal();
        cancel.signal();
        assert!(cancel.is_signaled());
        assert!(waiter.await.is_ok());
    }
}

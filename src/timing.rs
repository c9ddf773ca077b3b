//! Time capabilities injected into the fetcher and the store
//!
//! Every pause in a crawl (page settle, extraction retry, store retry) goes through
//! a [`Waiter`], and every collection timestamp comes from a [`Clock`], so tests can
//! substitute zero-delay and fixed-time fakes.

use chrono::NaiveDateTime;
use std::time::Duration;

/// Source of collection timestamps
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Fixed-duration pause
#[allow(async_fn_in_trait)]
pub trait Waiter {
    async fn wait(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioWaiter;

impl Waiter for TokioWaiter {
    async fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

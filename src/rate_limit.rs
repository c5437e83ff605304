//! Per-caller sliding-window limiter applied in front of report creation.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug)]
pub struct CallerRateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<Uuid, VecDeque<Instant>>>,
}

impl CallerRateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// `max_requests` per rolling minute.
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Records a hit for `caller` and returns whether it is within budget.
    pub async fn check(&self, caller: Uuid) -> bool {
        self.check_at(caller, Instant::now()).await
    }

    async fn check_at(&self, caller: Uuid, now: Instant) -> bool {
        let mut hits = self.hits.lock().await;

        // drop callers whose whole window has lapsed
        hits.retain(|_, q| q.back().is_some_and(|ts| now.duration_since(*ts) < self.window));

        let q = hits.entry(caller).or_default();
        while let Some(ts) = q.front() {
            if now.duration_since(*ts) >= self.window {
                q.pop_front();
            } else {
                break;
            }
        }

        if q.len() >= self.max_requests {
            return false;
        }
        q.push_back(now);
        true
    }
}

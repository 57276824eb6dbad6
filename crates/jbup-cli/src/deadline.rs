//! Per-plugin time budget

use crate::errors::TransportError;
use std::time::{Duration, Instant};

/// Wall-clock limit for one plugin attempt, checked between redirect hops
/// and download chunks. `None` means no limit.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn after(limit: Duration) -> Self {
        Self {
            start: Instant::now(),
            limit: Some(limit),
        }
    }

    pub fn none() -> Self {
        Self {
            start: Instant::now(),
            limit: None,
        }
    }

    pub fn check(&self) -> Result<(), TransportError> {
        match self.limit {
            Some(limit) if self.start.elapsed() > limit => {
                Err(TransportError::DeadlineExceeded(limit))
            }
            _ => Ok(()),
        }
    }
}

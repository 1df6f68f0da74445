#![allow(dead_code)]

use async_trait::async_trait;
use ee_stats_core::contract::ObjectCopier;
use ee_stats_core::errors::CommandError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory stand-in for a bucket: `copy` writes the stored object to disk.
#[derive(Default)]
pub struct FakeBucket {
    objects: HashMap<String, String>,
    delay: Duration,
    delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, locator: &str, content: &str) -> Self {
        self.objects.insert(locator.to_string(), content.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay for one locator only, overriding `with_delay`.
    pub fn with_delay_for(mut self, locator: &str, delay: Duration) -> Self {
        self.delays.insert(locator.to_string(), delay);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectCopier for FakeBucket {
    async fn copy(&self, source: &str, destination: &Path) -> Result<(), CommandError> {
        self.calls.lock().unwrap().push(source.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = self.delays.get(source).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let Some(content) = self.objects.get(source) else {
            return Err(CommandError::Failed {
                program: "gsutil".into(),
                status: "exit status: 1".into(),
                stderr: format!("CommandException: No URLs matched: {source}"),
            });
        };
        let target = if destination.is_dir() {
            destination.join(source.rsplit('/').next().unwrap())
        } else {
            destination.to_path_buf()
        };
        std::fs::write(target, content).unwrap();
        Ok(())
    }
}

//! Admission control for breed page crawls
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Tracking how many page crawls are in flight, and the peak reached
//!
//! A page crawl holds its [`AdmissionSlot`] for its whole lifetime, including
//! reference enrichment and the store insert, so the limit also bounds the
//! outbound connections a crawl opens against the catalog.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Fixed-capacity gate in front of page crawls
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// One unit of admission; the slot is returned to the gate on drop
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl AdmissionGate {
    /// Creates a gate admitting at most `capacity` crawls at once
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits for a free slot
    ///
    /// Returns None only if the gate has been closed.
    pub async fn admit(&self) -> Option<AdmissionSlot> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);

        Some(AdmissionSlot {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Stops admitting; pending and future [`AdmissionGate::admit`] calls
    /// return None
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of slots held at the same time since creation
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        // Runs before the permit field is dropped, so in_flight never
        // exceeds the number of permits handed out.
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

//! Test utilities and mock transports for slicewatch development.
//!
//! Provides [`init_tracing`] for test logging, canned [`scenarios`] that
//! reproduce the known aliasing failures, and transports that bend the
//! arrival order in ways [`SimTransport`](slicewatch_transport::SimTransport)
//! does not.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod scenarios;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use smallvec::smallvec;

use slicewatch_core::SeqNo;
use slicewatch_sched::Delivery;
use slicewatch_transport::{Arrival, Arrivals, Transport, TransportError};

/// Install a fmt subscriber honouring `RUST_LOG`, once per process.
///
/// Later calls are no-ops, so every test may call it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Delivers in reverse hand-off order.
///
/// Delivery handed off at `t` arrives at `horizon - t`, so with a horizon
/// past the last hand-off the consumer sees the highest sequence number
/// first.
#[derive(Clone, Copy, Debug)]
pub struct ReverseTransport {
    pub horizon: Duration,
    pub pacing: Duration,
}

impl ReverseTransport {
    pub fn new(horizon: Duration) -> Self {
        Self {
            horizon,
            pacing: Duration::from_millis(1),
        }
    }
}

impl Transport for ReverseTransport {
    fn relay(&mut self, delivery: Delivery, sent_at: Duration) -> Result<Arrivals, TransportError> {
        let at = self.horizon.saturating_sub(sent_at).max(sent_at);
        Ok(smallvec![Arrival::at(delivery, at)])
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }
}

/// Wraps a transport and records the sequence numbers it relays.
///
/// The log is shared, so a clone of [`log`](Self::log) taken before the
/// transport is moved into a session still sees every relay.
#[derive(Debug)]
pub struct RecordingTransport<T> {
    inner: T,
    log: Arc<Mutex<Vec<SeqNo>>>,
}

impl<T: Transport> RecordingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            log: Arc::default(),
        }
    }

    /// Handle to the relay log.
    pub fn log(&self) -> Arc<Mutex<Vec<SeqNo>>> {
        Arc::clone(&self.log)
    }

    /// Sequence numbers relayed so far, in hand-off order.
    pub fn relayed(&self) -> Vec<SeqNo> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> Transport for RecordingTransport<T> {
    fn relay(&mut self, delivery: Delivery, sent_at: Duration) -> Result<Arrivals, TransportError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(delivery.seq);
        self.inner.relay(delivery, sent_at)
    }

    fn pacing(&self) -> Duration {
        self.inner.pacing()
    }

    fn finish(&mut self) -> Result<(), TransportError> {
        self.inner.finish()
    }
}

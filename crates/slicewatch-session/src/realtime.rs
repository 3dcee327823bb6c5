//! Realtime runner: producer and consumer on separate threads.
//!
//! ```text
//!   producer thread (scoped)                 calling thread (consumer)
//!   ────────────────────────                 ─────────────────────────
//!   park_timeout(until next event)
//!   Send    → transport.relay()
//!   Arrive  → tx.send(Arrival) ──bounded──▶  rx.recv_deadline(deadline)
//!                                            tag ReadOnly, collect
//!   check cancel before every event  ◀────── cancel.store(true) + unpark
//! ```
//!
//! The producer owns the timeline and the transport for the duration of
//! the stream. On timeout the consumer raises the cancel flag, wakes the
//! producer and drops its receiver, so a producer blocked on a full
//! channel also returns. The producer is joined before the runner returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};

use slicewatch_core::SessionId;
use slicewatch_sched::Delivery;
use slicewatch_tracker::OwnershipTracker;
use slicewatch_transport::{Transport, TransportError};

use crate::consumer::{Consumer, Streamed};
use crate::error::SessionError;
use crate::timeline::{Event, Timeline};

/// Producer-to-consumer messages.
enum Message {
    /// The first delivery was handed off.
    Streaming,
    /// A delivery arrived.
    Arrival(Delivery),
    /// The transport failed; nothing more will arrive.
    Failed(TransportError),
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn run<T: Transport + ?Sized>(
    session: SessionId,
    outbound: Vec<Delivery>,
    transport: &mut T,
    tracker: &OwnershipTracker,
    deadline: Duration,
    channel_capacity: usize,
    mut on_first_send: impl FnMut(),
) -> Result<Streamed, SessionError> {
    let (tx, rx) = crossbeam_channel::bounded(channel_capacity);
    let cancel = AtomicBool::new(false);
    let timeline = Timeline::new(outbound, transport.pacing());
    let start = Instant::now();
    // `None`: the deadline lies past what `Instant` can represent.
    let deadline_at = start.checked_add(deadline);

    thread::scope(|scope| {
        let cancel = &cancel;
        let producer = thread::Builder::new()
            .name(format!("slicewatch-producer-{}", session.get()))
            .spawn_scoped(scope, move || produce(timeline, transport, tx, cancel, start))
            .map_err(|e| SessionError::ThreadSpawnFailed {
                reason: e.to_string(),
            })?;

        let mut consumer = Consumer::new(tracker);
        let mut timed_out = false;
        let mut failure = None;
        loop {
            let message = match deadline_at {
                Some(at) => rx.recv_deadline(at),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match message {
                Ok(Message::Streaming) => on_first_send(),
                Ok(Message::Arrival(delivery)) => consumer.receive(delivery),
                Ok(Message::Failed(e)) => {
                    failure = Some(e);
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    timed_out = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        cancel.store(true, Ordering::Release);
        producer.thread().unpark();
        drop(rx);
        let sent = producer.join().map_err(|_| SessionError::ProducerPanicked)?;

        if let Some(e) = failure {
            return Err(e.into());
        }
        if timed_out {
            tracing::debug!(
                %session, sent, received = consumer.data_bytes(), ?deadline,
                "realtime deadline reached, producer cancelled"
            );
        }
        let elapsed = if timed_out { deadline } else { start.elapsed() };
        Ok(consumer.finish(sent, timed_out, elapsed))
    })
}

/// Producer loop. Returns the number of deliveries handed off.
fn produce<T: Transport + ?Sized>(
    mut timeline: Timeline,
    transport: &mut T,
    tx: Sender<Message>,
    cancel: &AtomicBool,
    start: Instant,
) -> usize {
    while let Some(next) = timeline.next_at() {
        if !wait_until(start.checked_add(next), cancel) {
            return timeline.sent();
        }
        let Some((at, event)) = timeline.pop() else {
            break;
        };
        match event {
            Event::Send(delivery) => {
                if timeline.sent() == 1 && tx.send(Message::Streaming).is_err() {
                    return timeline.sent();
                }
                match transport.relay(delivery, at) {
                    Ok(arrivals) => timeline.schedule(arrivals),
                    Err(e) => {
                        let _ = tx.send(Message::Failed(e));
                        return timeline.sent();
                    }
                }
                if timeline.all_sent() {
                    if let Err(e) = transport.finish() {
                        let _ = tx.send(Message::Failed(e));
                        return timeline.sent();
                    }
                }
            }
            Event::Arrive(delivery) => {
                if tx.send(Message::Arrival(delivery)).is_err() {
                    return timeline.sent();
                }
            }
        }
    }

    // Arrivals that never happen keep the stream open until the consumer
    // gives up.
    if timeline.never() > 0 {
        while !cancel.load(Ordering::Acquire) {
            thread::park();
        }
    }
    timeline.sent()
}

/// Sleep until `when`, or until cancelled if `when` is unrepresentable.
/// Returns `false` if cancelled first.
fn wait_until(when: Option<Instant>, cancel: &AtomicBool) -> bool {
    loop {
        if cancel.load(Ordering::Acquire) {
            return false;
        }
        let Some(when) = when else {
            thread::park();
            continue;
        };
        let now = Instant::now();
        if now >= when {
            return true;
        }
        thread::park_timeout(when - now);
    }
}

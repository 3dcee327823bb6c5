//! The event order both runners follow.
//!
//! Two kinds of event: the producer handing delivery `i` to the transport
//! at `i × pacing`, and the consumer receiving an arrival at its arrival
//! time. Events are taken earliest first; on a tie the hand-off goes
//! first, then arrivals by sequence number. The lockstep runner walks this
//! order on a virtual clock, the realtime runner sleeps between events.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use slicewatch_core::SeqNo;
use slicewatch_sched::Delivery;
use slicewatch_transport::Arrivals;

/// The next thing to happen.
pub(crate) enum Event {
    /// Hand a delivery to the transport.
    Send(Delivery),
    /// Give a relayed delivery to the consumer.
    Arrive(Delivery),
}

pub(crate) struct Timeline {
    outbound: std::vec::IntoIter<Delivery>,
    next_send: Option<Delivery>,
    next_send_at: Duration,
    pacing: Duration,
    pending: BinaryHeap<Reverse<(Duration, SeqNo, usize)>>,
    slots: Vec<Option<Delivery>>,
    sent: usize,
    never: usize,
}

impl Timeline {
    pub(crate) fn new(outbound: Vec<Delivery>, pacing: Duration) -> Self {
        let mut outbound = outbound.into_iter();
        let next_send = outbound.next();
        Self {
            outbound,
            next_send,
            next_send_at: Duration::ZERO,
            pacing,
            pending: BinaryHeap::new(),
            slots: Vec::new(),
            sent: 0,
            never: 0,
        }
    }

    /// Time of the next event, or `None` when nothing is left that will
    /// ever happen.
    pub(crate) fn next_at(&self) -> Option<Duration> {
        let send = self.next_send.as_ref().map(|_| self.next_send_at);
        let arrive = self.pending.peek().map(|Reverse((at, _, _))| *at);
        match (send, arrive) {
            (Some(s), Some(a)) => Some(s.min(a)),
            (s, a) => s.or(a),
        }
    }

    /// Take the next event with its time.
    pub(crate) fn pop(&mut self) -> Option<(Duration, Event)> {
        let arrive_at = self.pending.peek().map(|Reverse((at, _, _))| *at);
        let send_first = match (&self.next_send, arrive_at) {
            (Some(_), Some(a)) => self.next_send_at <= a,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if send_first {
            let at = self.next_send_at;
            let delivery = self.next_send.take()?;
            self.next_send = self.outbound.next();
            self.next_send_at = at.saturating_add(self.pacing);
            self.sent += 1;
            return Some((at, Event::Send(delivery)));
        }
        let Reverse((at, _, slot)) = self.pending.pop()?;
        let delivery = self.slots.get_mut(slot)?.take()?;
        Some((at, Event::Arrive(delivery)))
    }

    /// Queue what the transport returned for a hand-off.
    pub(crate) fn schedule(&mut self, arrivals: Arrivals) {
        for arrival in arrivals {
            match arrival.at {
                Some(at) => {
                    let slot = self.slots.len();
                    self.pending.push(Reverse((at, arrival.delivery.seq, slot)));
                    self.slots.push(Some(arrival.delivery));
                }
                None => self.never += 1,
            }
        }
    }

    /// Whether every delivery has been handed off.
    pub(crate) fn all_sent(&self) -> bool {
        self.next_send.is_none()
    }

    /// Deliveries handed off so far.
    pub(crate) fn sent(&self) -> usize {
        self.sent
    }

    /// Arrivals the transport said will never happen.
    pub(crate) fn never(&self) -> usize {
        self.never
    }
}

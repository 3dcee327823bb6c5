//! Lockstep runner: the whole stream on a virtual clock.
//!
//! No threads and no sleeping. Events are processed in timeline order on
//! the calling thread; the first event past the deadline cancels the rest.
//! A stream left waiting on arrivals that will never happen has its
//! virtual clock jump to the deadline.

use std::time::Duration;

use slicewatch_core::SessionId;
use slicewatch_sched::Delivery;
use slicewatch_tracker::OwnershipTracker;
use slicewatch_transport::Transport;

use crate::consumer::{Consumer, Streamed};
use crate::error::SessionError;
use crate::timeline::{Event, Timeline};

pub(crate) fn run<T: Transport + ?Sized>(
    session: SessionId,
    outbound: Vec<Delivery>,
    transport: &mut T,
    tracker: &OwnershipTracker,
    deadline: Duration,
    mut on_first_send: impl FnMut(),
) -> Result<Streamed, SessionError> {
    let mut timeline = Timeline::new(outbound, transport.pacing());
    let mut consumer = Consumer::new(tracker);
    let mut now = Duration::ZERO;
    let mut timed_out = false;

    while let Some(at) = timeline.next_at() {
        if at > deadline {
            timed_out = true;
            break;
        }
        let Some((at, event)) = timeline.pop() else {
            break;
        };
        now = at;
        match event {
            Event::Send(delivery) => {
                if timeline.sent() == 1 {
                    on_first_send();
                }
                let arrivals = transport.relay(delivery, at)?;
                timeline.schedule(arrivals);
                if timeline.all_sent() {
                    transport.finish()?;
                }
            }
            Event::Arrive(delivery) => consumer.receive(delivery),
        }
    }

    if !timed_out && timeline.never() > 0 {
        timed_out = true;
    }
    if timed_out {
        now = deadline;
        tracing::debug!(
            %session, sent = timeline.sent(), received = consumer.data_bytes(),
            never = timeline.never(), ?deadline, "lockstep deadline reached"
        );
    }
    Ok(consumer.finish(timeline.sent(), timed_out, now))
}

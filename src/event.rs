//! Change notifications delivered to the caller.

use futures::channel::mpsc;
use serde::Serialize;

use crate::state::DeviceState;

/// Something the caller may want to react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Event {
    /// The light started or stopped answering heartbeats.
    AliveChanged(bool),
    PowerChanged(bool),
    BrightnessChanged(u8),
    TemperatureChanged(u8),
    /// Fired once after any of the above, carrying the full new state.
    StateChanged(DeviceState),
    /// A message with an id the registry does not decode.
    Unknown { id: u8, payload: Vec<u8> },
}

/// Receives events from the dispatcher task.
///
/// Any `FnMut(&Event)` closure is an observer. Observers run on the
/// dispatcher task, so slow work blocks message handling; hand events off
/// through [`event_channel`] when that matters.
pub trait Observer: Send + 'static {
    fn notify(&mut self, event: &Event);
}

impl<F> Observer for F
where
    F: FnMut(&Event) + Send + 'static,
{
    fn notify(&mut self, event: &Event) {
        self(event)
    }
}

/// An observer that forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::UnboundedSender<Event>);

impl Observer for EventSender {
    fn notify(&mut self, event: &Event) {
        // The receiver going away just means nobody is listening anymore.
        let _ = self.0.unbounded_send(event.clone());
    }
}

/// Create an observer paired with the stream of events it receives.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// use neewer_rs::{Event, Observer, event_channel};
///
/// let (mut observer, mut events) = event_channel();
/// observer.notify(&Event::PowerChanged(true));
/// let event = futures::executor::block_on(events.next());
/// assert_eq!(event, Some(Event::PowerChanged(true)));
/// ```
pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded();
    (EventSender(tx), rx)
}

/// An observer that drops every event.
pub fn ignore_events() -> impl Observer {
    |_: &Event| {}
}

//! Message id to decoder mapping.

use std::collections::HashMap;

use strum::IntoEnumIterator;

use crate::errors::Error;
use crate::frame;
use crate::message::{DecodeFn, Message};
use crate::types::MessageKind;

type Result<T> = std::result::Result<T, Error>;

/// Maps message ids to their payload decoders.
///
/// Built once per driver and shared with the receiver task. Ids that are not
/// registered decode to [`Message::Generic`] rather than failing.
///
/// # Example
///
/// ```
/// use neewer_rs::{Message, MessageRegistry};
///
/// let registry = MessageRegistry::new();
/// assert_eq!(registry.decode(0x03, &[]).unwrap(), Message::HostHeartbeat);
/// assert_eq!(
///     registry.decode(0x42, &[0x01]).unwrap(),
///     Message::Generic { id: 0x42, payload: vec![0x01] },
/// );
/// ```
#[derive(Clone)]
pub struct MessageRegistry {
    decoders: HashMap<u8, (MessageKind, DecodeFn)>,
}

impl Default for MessageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MessageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

impl MessageRegistry {
    /// A registry that decodes every known message kind.
    pub fn new() -> Self {
        Self::with_kinds(MessageKind::iter())
    }

    /// A registry that decodes only `kinds`; everything else stays opaque.
    pub fn with_kinds(kinds: impl IntoIterator<Item = MessageKind>) -> Self {
        let decoders = kinds
            .into_iter()
            .map(|kind| (kind.id(), (kind, Message::decoder(kind))))
            .collect();
        MessageRegistry { decoders }
    }

    pub fn is_registered(&self, id: u8) -> bool {
        self.decoders.contains_key(&id)
    }

    /// Registered kinds in id order.
    pub fn kinds(&self) -> Vec<MessageKind> {
        let mut kinds: Vec<MessageKind> = self.decoders.values().map(|(k, _)| *k).collect();
        kinds.sort_by_key(MessageKind::id);
        kinds
    }

    /// Decode a payload received under message `id`.
    pub fn decode(&self, id: u8, payload: &[u8]) -> Result<Message> {
        match self.decoders.get(&id) {
            Some((_, decode)) => decode(payload),
            None => Ok(Message::Generic {
                id,
                payload: payload.to_vec(),
            }),
        }
    }

    /// Decode the first frame in `data` into a message.
    ///
    /// Always returns the bytes left to process, even on failure: a frame with
    /// a bad payload is skipped whole, and a framing failure resynchronises on
    /// the next header byte. Repeated calls therefore always make progress.
    pub fn parse<'a>(&self, data: &'a [u8]) -> (Result<Message>, &'a [u8]) {
        match frame::decode(data) {
            Ok((frame, rest)) => (self.decode(frame.id, &frame.payload), rest),
            Err(err) => {
                let rest = frame::resync(data, &err);
                (Err(err), rest)
            }
        }
    }

    /// Decode every frame in a datagram, keeping failures in place.
    pub fn parse_all(&self, mut data: &[u8]) -> Vec<Result<Message>> {
        let mut results = Vec::new();
        while !data.is_empty() {
            let (result, rest) = self.parse(data);
            results.push(result);
            data = rest;
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Light, Power, StateValue};
    use crate::types::StateKind;

    #[test]
    fn test_all_kinds_registered() {
        let registry = MessageRegistry::new();
        let ids: Vec<u8> = registry.kinds().iter().map(MessageKind::id).collect();
        assert_eq!(ids, vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert!(!registry.is_registered(0x08));
    }

    #[test]
    fn test_unregistered_kind_is_opaque() {
        let registry = MessageRegistry::with_kinds([MessageKind::HostHeartbeat]);
        assert_eq!(
            registry.decode(0x07, &[0x01, 0x01]).unwrap(),
            Message::Generic {
                id: 0x07,
                payload: vec![0x01, 0x01]
            }
        );
    }

    #[test]
    fn test_two_frames_in_one_datagram() {
        let registry = MessageRegistry::new();
        let mut datagram = Message::HostHeartbeat.encode().unwrap();
        let report = Message::StateReport(StateValue::Light(Light::new(60, 40).unwrap()));
        datagram.extend(report.encode().unwrap());

        let results = registry.parse_all(&datagram);
        assert_eq!(results, vec![Ok(Message::HostHeartbeat), Ok(report)]);
    }

    #[test]
    fn test_bad_payload_does_not_hide_next_frame() {
        let registry = MessageRegistry::new();
        // QueryState with an extra byte is framed correctly but invalid.
        let mut datagram = frame::encode(0x06, &[0x01, 0x02]).unwrap();
        let power = Message::StateReport(StateValue::Power(Power { on: true }));
        datagram.extend(power.encode().unwrap());

        let results = registry.parse_all(&datagram);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Err(Error::invalid_length(1, 2)));
        assert_eq!(results[1], Ok(power));
    }

    #[test]
    fn test_corrupt_frame_is_skipped() {
        let registry = MessageRegistry::new();
        let mut datagram = Message::QueryState(StateKind::Power).encode().unwrap();
        let last = datagram.len() - 1;
        datagram[last] ^= 0x01;
        datagram.extend(Message::HostHeartbeat.encode().unwrap());

        let results = registry.parse_all(&datagram);
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(Error::ChecksumMismatch { .. })));
        assert_eq!(results[1], Ok(Message::HostHeartbeat));
    }
}

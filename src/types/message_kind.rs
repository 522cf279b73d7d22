//! Message identifiers.

use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, IntoStaticStr};

/// The message types the driver knows how to decode.
///
/// Ids outside this set are still accepted and carried as
/// [`Message::Generic`](crate::Message::Generic).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum MessageKind {
    Broadcast = 0x01,
    ConnectRequest = 0x02,
    HostHeartbeat = 0x03,
    ClientHeartbeat = 0x04,
    SetState = 0x05,
    QueryState = 0x06,
    StateReport = 0x07,
}

impl MessageKind {
    pub fn id(&self) -> u8 {
        *self as u8
    }
}

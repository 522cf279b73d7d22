/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Socket setup, read or write failed.
    Transport,
    /// The outer frame was short, had a bad header, or failed its checksum.
    Framing,
    /// A frame was intact but its payload did not match the message contract.
    Payload,
    /// The driver is not connected or its queues have been torn down.
    Lifecycle,
    /// Configuration could not be loaded.
    Config,
}

/// All error types that can occur when talking to a Neewer light.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A network socket operation failed while communicating with the light.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// Fewer bytes remain than the structure being decoded requires.
    #[error("data too short")]
    TooShort,

    /// A frame did not start with the fixed header byte.
    #[error("invalid header byte {0:#04x}")]
    BadHeader(u8),

    /// The trailing checksum byte does not match the frame contents.
    #[error("checksum mismatch: computed {expected:#04x}, received {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// A frame payload exceeds the one-byte length field.
    #[error("payload of {0} bytes does not fit in a frame")]
    PayloadTooLarge(usize),

    /// A length-value part exceeds the two-byte length field.
    #[error("part of {0} bytes is too large to encode")]
    PartTooLarge(usize),

    /// Attempted to length-value encode an empty list.
    #[error("no parts to encode")]
    NoParts,

    /// A length-value payload had the wrong number of parts.
    #[error("invalid number of parts: {0}")]
    InvalidPartCount(usize),

    /// A textual IP address could not be parsed.
    #[error("invalid IP address {0:?}")]
    InvalidIp(String),

    /// A payload had an unexpected length.
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Brightness outside 0-100.
    #[error("brightness must be between 0 and 100, got {0}")]
    InvalidBrightness(u8),

    /// Temperature outside 29-70.
    #[error("temperature must be between 29 and 70, got {0}")]
    InvalidTemperature(u8),

    /// The state-kind discriminant is neither power nor light.
    #[error("unknown state kind {0:#04x}")]
    UnknownStateKind(u8),

    /// A state payload carried neither power nor light.
    #[error("no state to encode")]
    NoState,

    /// A state payload carried both power and light.
    #[error("both power and light states are set")]
    BothStates,

    /// The driver has no running connection.
    #[error("not connected")]
    NotConnected,

    /// The outbound queue was closed before the message could be enqueued.
    #[error("outbound queue closed")]
    QueueClosed,

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new invalid length error
    pub fn invalid_length(expected: usize, actual: usize) -> Self {
        Error::InvalidLength { expected, actual }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Socket { .. } => ErrorKind::Transport,
            Error::TooShort
            | Error::BadHeader(_)
            | Error::ChecksumMismatch { .. }
            | Error::PayloadTooLarge(_) => ErrorKind::Framing,
            Error::PartTooLarge(_)
            | Error::NoParts
            | Error::InvalidPartCount(_)
            | Error::InvalidIp(_)
            | Error::InvalidLength { .. }
            | Error::InvalidBrightness(_)
            | Error::InvalidTemperature(_)
            | Error::UnknownStateKind(_)
            | Error::NoState
            | Error::BothStates => ErrorKind::Payload,
            Error::NotConnected | Error::QueueClosed => ErrorKind::Lifecycle,
            Error::JsonLoad(_) => ErrorKind::Config,
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_taxonomy() {
        let io = std::io::Error::other("boom");
        assert_eq!(Error::socket("send", io).kind(), ErrorKind::Transport);
        assert_eq!(Error::BadHeader(0x81).kind(), ErrorKind::Framing);
        assert_eq!(Error::BothStates.kind(), ErrorKind::Payload);
        assert_eq!(Error::QueueClosed.kind(), ErrorKind::Lifecycle);
    }

    #[test]
    fn test_display() {
        let err = Error::ChecksumMismatch {
            expected: 0x10,
            actual: 0x11,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: computed 0x10, received 0x11"
        );
    }
}

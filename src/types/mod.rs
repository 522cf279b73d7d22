//! Value types for light control parameters.

mod brightness;
mod message_kind;
mod state_kind;
mod temperature;

pub use brightness::Brightness;
pub use message_kind::MessageKind;
pub use state_kind::StateKind;
pub use temperature::Temperature;

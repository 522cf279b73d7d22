//! State-kind discriminant.

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::errors::Error;

/// Selects which domain of device state a payload refers to.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum StateKind {
    Power = 0x01,
    Light = 0x02,
}

impl StateKind {
    pub fn id(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for StateKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0x01 => Ok(StateKind::Power),
            0x02 => Ok(StateKind::Light),
            other => Err(Error::UnknownStateKind(other)),
        }
    }
}

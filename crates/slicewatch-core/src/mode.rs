//! Access modes and actors.

use std::fmt;

/// Whether a view's bytes may change after creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Any holder may mutate the referenced bytes; concurrent writers
    /// must synchronize.
    #[default]
    MutableShared,
    /// The referenced bytes must not change while any reader is outstanding.
    ReadOnly,
}

impl AccessMode {
    /// Whether this mode forbids mutation.
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::ReadOnly)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MutableShared => write!(f, "mutable-shared"),
            Self::ReadOnly => write!(f, "read-only"),
        }
    }
}

/// A participant that can hold views and mutate backing stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Actor {
    /// The side that generates and slices the payload.
    Producer,
    /// The transport relaying deliveries.
    Transport,
    /// The side that receives deliveries.
    Consumer,
    /// Any additional participant a test introduces.
    Custom(u16),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => write!(f, "producer"),
            Self::Transport => write!(f, "transport"),
            Self::Consumer => write!(f, "consumer"),
            Self::Custom(n) => write!(f, "actor-{n}"),
        }
    }
}

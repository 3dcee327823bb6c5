//! Arena configuration parameters.

/// How freshly allocated payload bytes are filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillMode {
    /// Bytes drawn from the arena's seeded ChaCha stream.
    #[default]
    Random,
    /// `byte[i] = i % 251`. Deterministic without a seed, and no two
    /// adjacent 250-byte windows are equal, which keeps mismatch offsets
    /// unambiguous.
    Pattern,
    /// All zero.
    Zero,
}

/// Configuration for a [`BufferArena`](crate::BufferArena).
///
/// All values are fixed at construction.
#[derive(Clone, Debug)]
pub struct ArenaConfig {
    /// Seed for [`FillMode::Random`].
    pub seed: u64,
    /// Fill strategy for `allocate` and `allocate_chunked`.
    pub fill: FillMode,
    /// Copy the referenced bytes into a private store on every `view` call.
    ///
    /// Default: `false` (zero-copy, the property under test).
    pub copy_on_view: bool,
    /// Fork a store on capacity growth instead of reallocating in place.
    ///
    /// Default: `false`.
    pub copy_on_grow: bool,
}

impl ArenaConfig {
    /// Salt mixed into the session seed for the payload fill stream.
    pub const FILL_SEED_SALT: u64 = 0xA5E1_F111_0000_0001;

    /// Byte value of the synchronization marker view.
    pub const MARKER_BYTE: u8 = 0x7E;

    /// Create a config with the given seed and defaults for everything else.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            fill: FillMode::Random,
            copy_on_view: false,
            copy_on_grow: false,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_zero_copy() {
        let config = ArenaConfig::new(42);
        assert_eq!(config.seed, 42);
        assert!(!config.copy_on_view);
        assert!(!config.copy_on_grow);
        assert_eq!(config.fill, FillMode::Random);
    }
}

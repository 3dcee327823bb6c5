//! A single actor's recorded interest in a view.

use slicewatch_arena::View;
use slicewatch_core::{AccessMode, Actor, ByteRange, Stamp, ViewId};

/// A reader or writer claim on a view.
///
/// A claim is live from `claimed_at` until `released_at` (exclusive at
/// both ends: an event stamped exactly at either bound cannot exist,
/// since every stamp is unique).
#[derive(Clone, Debug)]
pub struct Claim {
    pub(crate) view: View,
    pub(crate) actor: Actor,
    pub(crate) mode: AccessMode,
    pub(crate) claimed_at: Stamp,
    pub(crate) released_at: Option<Stamp>,
}

impl Claim {
    /// The claimed view.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Shorthand for `self.view().id()`.
    pub fn view_id(&self) -> ViewId {
        self.view.id()
    }

    /// Store-relative range the claim covers.
    pub fn range(&self) -> ByteRange {
        self.view.range()
    }

    /// Who holds the claim.
    pub fn actor(&self) -> Actor {
        self.actor
    }

    /// Reader (`ReadOnly`) or writer (`MutableShared`).
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// When the claim was recorded.
    pub fn claimed_at(&self) -> Stamp {
        self.claimed_at
    }

    /// When the claim was released, if it has been.
    pub fn released_at(&self) -> Option<Stamp> {
        self.released_at
    }

    /// Whether the claim has not been released.
    pub fn is_open(&self) -> bool {
        self.released_at.is_none()
    }

    /// Whether the claim was live at `at`.
    pub fn live_at(&self, at: Stamp) -> bool {
        self.claimed_at < at && self.released_at.is_none_or(|r| at < r)
    }
}

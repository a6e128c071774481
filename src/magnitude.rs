//! Vote magnitude normalization.
//!
//! Callers express preference strength on an external scale
//! ([`VoteMagnitude`]); internally every vote carries a canonical signed
//! magnitude on `CANONICAL_MIN..=CANONICAL_MAX`, zero meaning no preference.
//! The service stores magnitudes on `0..=100`, so the wire value is the
//! canonical value shifted by the midpoint.
//!
//! The vote entry point also accepts the legacy argument arrangement where the
//! magnitude sits between the two items. [`VoteArgs`] resolves either
//! arrangement once, at the API boundary, into a canonical [`VoteRequest`].

use serde::Serialize;

use crate::error::SorterError;
use crate::options::VoteMagnitude;
use crate::resources::{Attribute, AttributeId, Item, ItemId};

pub const CANONICAL_MIN: i32 = -50;
pub const CANONICAL_MAX: i32 = 50;

/// Midpoint of the `positive` scale and offset between canonical and wire.
pub const MIDPOINT: i32 = 50;

impl VoteMagnitude {
    /// Inclusive range of values accepted on this scale.
    pub fn range(&self) -> (i32, i32) {
        match self {
            VoteMagnitude::Equal => (CANONICAL_MIN, CANONICAL_MAX),
            VoteMagnitude::Positive => (CANONICAL_MIN + MIDPOINT, CANONICAL_MAX + MIDPOINT),
        }
    }

    /// Convert an external value to the canonical scale. Out-of-range values
    /// are rejected, never clamped.
    pub fn normalize(&self, value: i32) -> Result<i32, SorterError> {
        let (min, max) = self.range();
        if !(min..=max).contains(&value) {
            return Err(SorterError::validation(format!(
                "magnitude {value} is outside the {self} scale ({min}..={max})"
            )));
        }
        Ok(match self {
            VoteMagnitude::Equal => value,
            VoteMagnitude::Positive => value - MIDPOINT,
        })
    }

    /// Express a canonical value on this scale, clamped into range. Only for
    /// presenting values read from the service.
    pub fn present(&self, canonical: i32) -> i32 {
        let canonical = canonical.clamp(CANONICAL_MIN, CANONICAL_MAX);
        match self {
            VoteMagnitude::Equal => canonical,
            VoteMagnitude::Positive => canonical + MIDPOINT,
        }
    }
}

pub(crate) fn canonical_to_wire(canonical: i32) -> i32 {
    canonical + MIDPOINT
}

pub(crate) fn wire_to_canonical(wire: i32) -> i32 {
    wire.saturating_sub(MIDPOINT)
}

/// One positional argument of a vote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteArg {
    Item(ItemId),
    Magnitude(i32),
}

impl From<ItemId> for VoteArg {
    fn from(id: ItemId) -> Self {
        VoteArg::Item(id)
    }
}

impl From<&Item> for VoteArg {
    fn from(item: &Item) -> Self {
        VoteArg::Item(item.id)
    }
}

impl From<i32> for VoteArg {
    fn from(magnitude: i32) -> Self {
        VoteArg::Magnitude(magnitude)
    }
}

/// The two supported argument arrangements, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteArgs {
    /// `(left, right, magnitude)`.
    MagnitudeLast {
        left: ItemId,
        right: ItemId,
        magnitude: i32,
    },
    /// `(left, magnitude, right)`. Deprecated arrangement.
    MagnitudeMiddle {
        left: ItemId,
        magnitude: i32,
        right: ItemId,
    },
}

impl VoteArgs {
    /// Work out the arrangement from the kind of each slot.
    pub fn from_positional(
        first: impl Into<VoteArg>,
        second: impl Into<VoteArg>,
        third: impl Into<VoteArg>,
    ) -> Result<Self, SorterError> {
        use VoteArg::{Item as I, Magnitude as M};

        match (first.into(), second.into(), third.into()) {
            (I(left), I(right), M(magnitude)) => Ok(VoteArgs::MagnitudeLast {
                left,
                right,
                magnitude,
            }),
            (I(left), M(magnitude), I(right)) => Ok(VoteArgs::MagnitudeMiddle {
                left,
                magnitude,
                right,
            }),
            (a, b, c) => Err(SorterError::validation(format!(
                "ambiguous vote arguments ({}, {}, {}): expected two items and one magnitude \
                 in the second or third position",
                slot_kind(a),
                slot_kind(b),
                slot_kind(c)
            ))),
        }
    }

    /// Canonical `(left, right, magnitude)` triple, magnitude still external.
    pub fn into_triple(self) -> (ItemId, ItemId, i32) {
        match self {
            VoteArgs::MagnitudeLast {
                left,
                right,
                magnitude,
            }
            | VoteArgs::MagnitudeMiddle {
                left,
                magnitude,
                right,
            } => (left, right, magnitude),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, VoteArgs::MagnitudeMiddle { .. })
    }
}

fn slot_kind(arg: VoteArg) -> &'static str {
    match arg {
        VoteArg::Item(_) => "item",
        VoteArg::Magnitude(_) => "magnitude",
    }
}

/// A validated vote with its magnitude on the canonical scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteRequest {
    pub left: ItemId,
    pub right: ItemId,
    pub magnitude: i32,
    pub attribute: Option<AttributeId>,
}

impl VoteRequest {
    pub fn new(
        args: VoteArgs,
        scale: VoteMagnitude,
        attribute: Option<&Attribute>,
    ) -> Result<Self, SorterError> {
        let (left, right, external) = args.into_triple();
        let magnitude = scale.normalize(external)?;
        Ok(Self {
            left,
            right,
            magnitude,
            attribute: attribute.map(|a| a.id),
        })
    }

    pub(crate) fn payload(&self, tag_id: i64) -> VotePayload {
        VotePayload {
            tag_id,
            left_item_id: self.left.0,
            right_item_id: self.right.0,
            magnitude: canonical_to_wire(self.magnitude),
            attribute: self.attribute.map(|a| a.0),
        }
    }
}

/// Wire body of a vote submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct VotePayload {
    pub tag_id: i64,
    pub left_item_id: i64,
    pub right_item_id: i64,
    pub magnitude: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<i64>,
}

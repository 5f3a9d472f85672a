// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The category dispatch table.
//!
//! A pure mapping from classifier category to reaction. The reactions with
//! unconditional outcomes carry their terminal number status in the
//! variant docs; send-dependent and judgment-dependent outcomes resolve
//! in the router.

use leadloop_core::types::IntentCategory;

/// What the router does with a classified reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Identity confirmed: number becomes `confirmed`, lead goes to a human.
    Confirm,
    /// Customer asked who/what: send the presentation; on delivery the
    /// number becomes `objection`.
    SendPresentation,
    /// Customer denied being the person: the name-match judgment picks
    /// between `fake_mismatch` (silent) and `denied` (apology).
    JudgeDenial,
    /// A relative or acquaintance answered: send the hand-off request; on
    /// delivery the number becomes `relative`.
    HandOffToRelative,
    /// Nothing actionable: the number stays `in_progress`.
    Hold,
}

/// The reaction for a classifier category.
pub fn reaction_for(category: IntentCategory) -> Reaction {
    match category {
        IntentCategory::Confirmation => Reaction::Confirm,
        IntentCategory::Objection => Reaction::SendPresentation,
        IntentCategory::Denial => Reaction::JudgeDenial,
        IntentCategory::Relative => Reaction::HandOffToRelative,
        IntentCategory::Neutral | IntentCategory::Unclassified => Reaction::Hold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_reaction() {
        assert_eq!(reaction_for(IntentCategory::Confirmation), Reaction::Confirm);
        assert_eq!(
            reaction_for(IntentCategory::Objection),
            Reaction::SendPresentation
        );
        assert_eq!(reaction_for(IntentCategory::Denial), Reaction::JudgeDenial);
        assert_eq!(
            reaction_for(IntentCategory::Relative),
            Reaction::HandOffToRelative
        );
        assert_eq!(reaction_for(IntentCategory::Neutral), Reaction::Hold);
        assert_eq!(reaction_for(IntentCategory::Unclassified), Reaction::Hold);
    }
}

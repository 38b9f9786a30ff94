//! Which directives a container broadcasts when its stack changes shape.
//!
//! Plans are `(index, state)` pairs in broadcast order. Indices refer to
//! insertion order; the last toast is always the active one.

use crate::types::StackState;

pub type Plan = Vec<(usize, StackState)>;

/// Expanded to collapsed: secondary and tertiary slots first, then every
/// older toast hidden, newest first. The top toast is already active.
pub fn collapse(count: usize) -> Plan {
    let mut plan = Plan::with_capacity(count.saturating_sub(1));
    if let Some(index) = count.checked_sub(2) {
        plan.push((index, StackState::Secondary));
    }
    if let Some(index) = count.checked_sub(3) {
        plan.push((index, StackState::Tertiary));
    }
    plan.extend((0..count.saturating_sub(3)).rev().map(|index| (index, StackState::Hide)));
    plan
}

/// Collapsed to expanded: every toast is told to activate.
pub fn expand(count: usize) -> Plan {
    (0..count).map(|index| (index, StackState::Activate)).collect()
}

/// A toast was pushed on top of a collapsed stack of `count` (new top
/// included); the three slots beneath it each move back one role.
pub fn added(count: usize) -> Plan {
    shifted(count, [StackState::Secondary, StackState::Tertiary, StackState::Hide], 2)
}

/// A toast is leaving a collapsed stack; `remaining` excludes it. The
/// three newest survivors each move forward one role.
pub fn removed(remaining: usize) -> Plan {
    shifted(
        remaining,
        [StackState::Activate, StackState::Secondary, StackState::Tertiary],
        1,
    )
}

fn shifted(count: usize, states: [StackState; 3], first_offset: usize) -> Plan {
    states
        .into_iter()
        .enumerate()
        .filter_map(|(step, state)| {
            count
                .checked_sub(first_offset + step)
                .map(|index| (index, state))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{Plan, added, collapse, expand, removed};

    fn render(plan: &Plan) -> String {
        plan.iter()
            .map(|(index, state)| format!("{state}@{index}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn collapsing_five_skips_the_top() {
        insta::assert_snapshot!(
            render(&collapse(5)),
            @"secondary@3 tertiary@2 hide@1 hide@0"
        );
    }

    #[test]
    fn collapsing_small_stacks() {
        assert!(collapse(0).is_empty());
        assert!(collapse(1).is_empty());
        insta::assert_snapshot!(render(&collapse(2)), @"secondary@0");
    }

    #[test]
    fn expanding_activates_everyone() {
        insta::assert_snapshot!(
            render(&expand(3)),
            @"activate@0 activate@1 activate@2"
        );
    }

    #[test]
    fn additions_and_removals_shift_by_one_slot() {
        insta::assert_snapshot!(render(&added(5)), @"secondary@3 tertiary@2 hide@1");
        insta::assert_snapshot!(render(&added(2)), @"secondary@0");
        insta::assert_snapshot!(
            render(&removed(4)),
            @"activate@3 secondary@2 tertiary@1"
        );
        assert!(removed(0).is_empty());
    }
}

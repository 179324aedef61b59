//! Property-based tests for roster construction.

use proptest::prelude::*;

use outlay_shared::types::{ApprovalRuleId, CompanyId, UserId};

use crate::workflow::roster::{ApproverEntry, RosterSource, RuleSnapshot, build_roster};
use crate::workflow::types::PolicyKind;

/// Strategy for distinct sequence positions in arbitrary order.
fn arb_sequence_orders() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::hash_set(1i32..1000, 0..10)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

fn rule_from(orders: &[i32], requires_manager: bool) -> RuleSnapshot {
    RuleSnapshot {
        id: ApprovalRuleId::new(),
        company_id: CompanyId::new(),
        name: "Props".to_string(),
        kind: PolicyKind::Specific,
        percentage_threshold: None,
        requires_manager_approval: requires_manager,
        is_active: true,
        approvers: orders
            .iter()
            .map(|&sequence_order| ApproverEntry {
                user_id: UserId::new(),
                sequence_order,
                auto_approve: false,
            })
            .collect(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Rule approvers appear in ascending sequence order.
    #[test]
    fn prop_roster_sorted_by_sequence(orders in arb_sequence_orders()) {
        let rule = rule_from(&orders, false);
        let roster = build_roster(&rule, None);

        let positions: Vec<i32> = roster
            .entries()
            .iter()
            .filter_map(|e| match e.source {
                RosterSource::Rule { sequence_order } => Some(sequence_order),
                RosterSource::Manager => None,
            })
            .collect();
        let mut sorted = orders.clone();
        sorted.sort_unstable();
        prop_assert_eq!(positions, sorted);
    }

    /// The manager is prepended exactly when required and present.
    #[test]
    fn prop_manager_prepended_when_required(
        orders in arb_sequence_orders(),
        requires_manager in any::<bool>(),
        has_manager in any::<bool>(),
    ) {
        let rule = rule_from(&orders, requires_manager);
        let manager = has_manager.then(UserId::new);
        let roster = build_roster(&rule, manager);

        let with_manager = requires_manager && has_manager;
        prop_assert_eq!(roster.len(), orders.len() + usize::from(with_manager));
        if with_manager {
            prop_assert_eq!(roster.occupant(0).map(|e| e.user_id), manager);
            prop_assert_eq!(roster.occupant(0).map(|e| e.source), Some(RosterSource::Manager));
        }
    }

    /// Building twice from the same inputs gives the same roster.
    #[test]
    fn prop_roster_is_deterministic(orders in arb_sequence_orders(), has_manager in any::<bool>()) {
        let rule = rule_from(&orders, true);
        let manager = has_manager.then(UserId::new);
        prop_assert_eq!(build_roster(&rule, manager), build_roster(&rule, manager));
    }
}

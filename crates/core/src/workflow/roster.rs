//! Approval rosters.
//!
//! A roster is the ordered list of users who must act on an expense. It is
//! derived from the expense's approval rule plus, when the rule asks for it,
//! the submitter's direct manager in front. Rosters are rebuilt for every
//! decision and never mutated.

use serde::{Deserialize, Serialize};

use outlay_shared::types::{ApprovalRuleId, CompanyId, UserId};

use crate::workflow::error::WorkflowError;
use crate::workflow::types::PolicyKind;

/// One designated approver on a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverEntry {
    /// The approving user.
    pub user_id: UserId,
    /// 1-based position; unique per rule, gaps allowed.
    pub sequence_order: i32,
    /// Approval by this user resolves the expense immediately.
    pub auto_approve: bool,
}

/// Consistent read of an approval rule and its approvers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    /// Rule ID.
    pub id: ApprovalRuleId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Human-readable name.
    pub name: String,
    /// Policy kind.
    pub kind: PolicyKind,
    /// Percentage threshold (1-100), only meaningful for quorum kinds.
    pub percentage_threshold: Option<i32>,
    /// Whether the submitter's manager must approve first.
    pub requires_manager_approval: bool,
    /// False once the rule is retired; in-flight expenses still use it.
    pub is_active: bool,
    /// Designated approvers, ordered by `sequence_order`.
    pub approvers: Vec<ApproverEntry>,
}

impl RuleSnapshot {
    /// Returns the evaluation policy for this rule.
    #[must_use]
    pub fn policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            kind: self.kind,
            threshold: self.percentage_threshold,
        }
    }

    /// Checks the rule can drive a decision.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let orders: Vec<i32> = self.approvers.iter().map(|a| a.sequence_order).collect();
        validate_rule_shape(self.kind, self.percentage_threshold, &orders)
    }
}

/// Validates a policy kind, its threshold, and approver positions.
///
/// Quorum kinds need a threshold in 1..=100. Positions must be at least 1
/// and unique.
pub fn validate_rule_shape(
    kind: PolicyKind,
    threshold: Option<i32>,
    sequence_orders: &[i32],
) -> Result<(), WorkflowError> {
    if kind.uses_quorum() {
        match threshold {
            Some(t) if (1..=100).contains(&t) => {}
            Some(t) => {
                return Err(WorkflowError::Configuration(format!(
                    "percentage threshold {t} is outside 1-100"
                )));
            }
            None => {
                return Err(WorkflowError::Configuration(format!(
                    "{kind} rule requires a percentage threshold"
                )));
            }
        }
    }

    let mut seen = std::collections::HashSet::with_capacity(sequence_orders.len());
    for &order in sequence_orders {
        if order < 1 {
            return Err(WorkflowError::Configuration(format!(
                "sequence order {order} must be at least 1"
            )));
        }
        if !seen.insert(order) {
            return Err(WorkflowError::Configuration(format!(
                "sequence order {order} is used more than once"
            )));
        }
    }

    Ok(())
}

/// Policy the evaluator applies to a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalPolicy {
    /// Policy kind.
    pub kind: PolicyKind,
    /// Percentage threshold for quorum kinds.
    pub threshold: Option<i32>,
}

impl ApprovalPolicy {
    /// Plain sequential policy, used for expenses without a rule.
    #[must_use]
    pub const fn sequential() -> Self {
        Self {
            kind: PolicyKind::Specific,
            threshold: None,
        }
    }
}

/// Where a roster entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RosterSource {
    /// The submitter's direct manager.
    Manager,
    /// A designated approver on the rule.
    Rule {
        /// Position on the rule.
        sequence_order: i32,
    },
}

/// One position in a roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// User occupying this position.
    pub user_id: UserId,
    /// Approval at this position resolves the expense.
    pub auto_approve: bool,
    /// Origin of the entry.
    pub source: RosterSource,
}

/// Immutable, ordered approval roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterSnapshot {
    entries: Vec<RosterEntry>,
}

impl RosterSnapshot {
    /// Number of positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nobody can approve.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `step`, if the step is inside the roster.
    #[must_use]
    pub fn occupant(&self, step: i32) -> Option<&RosterEntry> {
        usize::try_from(step).ok().and_then(|i| self.entries.get(i))
    }

    /// Returns true if the user holds any position.
    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.entries.iter().any(|e| e.user_id == user_id)
    }

    /// All entries in order.
    #[must_use]
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }
}

/// Builds the roster for a rule.
///
/// Approvers are ordered by sequence position. When the rule requires
/// manager approval and the submitter has a manager, the manager takes
/// position 0. A missing manager is skipped.
#[must_use]
pub fn build_roster(rule: &RuleSnapshot, manager: Option<UserId>) -> RosterSnapshot {
    let mut approvers: Vec<&ApproverEntry> = rule.approvers.iter().collect();
    approvers.sort_by_key(|a| a.sequence_order);

    let mut entries = Vec::with_capacity(approvers.len() + 1);
    if rule.requires_manager_approval
        && let Some(manager_id) = manager
    {
        entries.push(manager_entry(manager_id));
    }
    entries.extend(approvers.into_iter().map(|a| RosterEntry {
        user_id: a.user_id,
        auto_approve: a.auto_approve,
        source: RosterSource::Rule {
            sequence_order: a.sequence_order,
        },
    }));

    RosterSnapshot { entries }
}

/// Roster for an expense submitted without a rule: the manager alone.
#[must_use]
pub fn default_roster(manager: Option<UserId>) -> RosterSnapshot {
    RosterSnapshot {
        entries: manager.map(manager_entry).into_iter().collect(),
    }
}

fn manager_entry(user_id: UserId) -> RosterEntry {
    RosterEntry {
        user_id,
        auto_approve: false,
        source: RosterSource::Manager,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rule(kind: PolicyKind, threshold: Option<i32>, approvers: Vec<ApproverEntry>) -> RuleSnapshot {
        RuleSnapshot {
            id: ApprovalRuleId::new(),
            company_id: CompanyId::new(),
            name: "Travel".to_string(),
            kind,
            percentage_threshold: threshold,
            requires_manager_approval: false,
            is_active: true,
            approvers,
        }
    }

    fn approver(user_id: UserId, sequence_order: i32, auto_approve: bool) -> ApproverEntry {
        ApproverEntry {
            user_id,
            sequence_order,
            auto_approve,
        }
    }

    #[test]
    fn test_build_roster_orders_by_sequence() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let rule = rule(
            PolicyKind::Specific,
            None,
            vec![approver(c, 10, false), approver(a, 1, false), approver(b, 4, true)],
        );

        let roster = build_roster(&rule, None);

        let ids: Vec<UserId> = roster.entries().iter().map(|e| e.user_id).collect();
        assert_eq!(ids, vec![a, b, c]);
        assert!(roster.occupant(1).is_some_and(|e| e.auto_approve));
        assert_eq!(
            roster.occupant(2).map(|e| e.source),
            Some(RosterSource::Rule { sequence_order: 10 })
        );
    }

    #[test]
    fn test_build_roster_prepends_manager() {
        let (manager, alice) = (UserId::new(), UserId::new());
        let mut rule = rule(PolicyKind::Specific, None, vec![approver(alice, 1, false)]);
        rule.requires_manager_approval = true;

        let roster = build_roster(&rule, Some(manager));

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.occupant(0).map(|e| e.user_id), Some(manager));
        assert_eq!(roster.occupant(0).map(|e| e.source), Some(RosterSource::Manager));
        assert_eq!(roster.occupant(1).map(|e| e.user_id), Some(alice));
    }

    #[test]
    fn test_build_roster_skips_missing_manager() {
        let alice = UserId::new();
        let mut rule = rule(PolicyKind::Specific, None, vec![approver(alice, 1, false)]);
        rule.requires_manager_approval = true;

        let roster = build_roster(&rule, None);

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.occupant(0).map(|e| e.user_id), Some(alice));
    }

    #[test]
    fn test_build_roster_ignores_manager_when_not_required() {
        let alice = UserId::new();
        let rule = rule(PolicyKind::Specific, None, vec![approver(alice, 1, false)]);

        let roster = build_roster(&rule, Some(UserId::new()));

        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_default_roster() {
        let manager = UserId::new();
        let roster = default_roster(Some(manager));
        assert_eq!(roster.len(), 1);
        assert!(roster.contains(manager));
        assert!(default_roster(None).is_empty());
    }

    #[test]
    fn test_occupant_out_of_range() {
        let roster = default_roster(Some(UserId::new()));
        assert!(roster.occupant(-1).is_none());
        assert!(roster.occupant(1).is_none());
    }

    #[rstest]
    #[case(PolicyKind::Specific, None, true)]
    #[case(PolicyKind::Specific, Some(500), true)]
    #[case(PolicyKind::Percentage, Some(1), true)]
    #[case(PolicyKind::Percentage, Some(100), true)]
    #[case(PolicyKind::Percentage, Some(0), false)]
    #[case(PolicyKind::Percentage, Some(101), false)]
    #[case(PolicyKind::Percentage, None, false)]
    #[case(PolicyKind::Hybrid, Some(60), true)]
    #[case(PolicyKind::Hybrid, None, false)]
    fn test_validate_threshold(
        #[case] kind: PolicyKind,
        #[case] threshold: Option<i32>,
        #[case] valid: bool,
    ) {
        let rule = rule(kind, threshold, vec![approver(UserId::new(), 1, false)]);
        assert_eq!(rule.validate().is_ok(), valid);
    }

    #[test]
    fn test_validate_sequence_orders() {
        assert!(validate_rule_shape(PolicyKind::Specific, None, &[1, 3, 7]).is_ok());
        assert!(matches!(
            validate_rule_shape(PolicyKind::Specific, None, &[0]),
            Err(WorkflowError::Configuration(_))
        ));
        assert!(matches!(
            validate_rule_shape(PolicyKind::Specific, None, &[2, 2]),
            Err(WorkflowError::Configuration(_))
        ));
    }

    #[test]
    fn test_policy_from_rule() {
        let rule = rule(PolicyKind::Hybrid, Some(60), Vec::new());
        assert_eq!(
            rule.policy(),
            ApprovalPolicy {
                kind: PolicyKind::Hybrid,
                threshold: Some(60)
            }
        );
        assert_eq!(ApprovalPolicy::sequential().kind, PolicyKind::Specific);
    }
}

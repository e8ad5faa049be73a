use crate::core::reconcile::{reconcile, ReconcileOptions};
use crate::domain::model::{BillingSnapshot, Member, MembershipStatus, Payment, Plan};
use crate::domain::money::Money;
use crate::domain::report::{DuesReport, DuesRow, DuesSummary, SkippedMembership};
use std::collections::HashMap;

/// Reconciles every membership in the snapshot and summarises what the gym
/// is owed. `only_overdue` filters the rows but not the summary.
pub fn build_dues_report(
    snapshot: &BillingSnapshot,
    gym_id: &str,
    options: ReconcileOptions,
    only_overdue: bool,
) -> DuesReport {
    let plans: HashMap<&str, &Plan> = snapshot.plans.iter().map(|p| (p.id.as_str(), p)).collect();
    let members: HashMap<&str, &Member> =
        snapshot.members.iter().map(|m| (m.id.as_str(), m)).collect();

    let mut payments_by_membership: HashMap<&str, Vec<Payment>> = HashMap::new();
    for payment in &snapshot.payments {
        payments_by_membership
            .entry(payment.membership_id.as_str())
            .or_default()
            .push(payment.clone());
    }

    let orphaned = payments_by_membership
        .keys()
        .filter(|id| !snapshot.memberships.iter().any(|m| m.id == **id))
        .count();
    if orphaned > 0 {
        tracing::warn!(
            "⚠️ Payments reference {} unknown memberships and were ignored",
            orphaned
        );
    }

    let mut memberships: Vec<_> = snapshot.memberships.iter().collect();
    memberships.sort_by(|a, b| a.id.cmp(&b.id));

    let mut rows = Vec::new();
    let mut skipped = Vec::new();

    for membership in memberships {
        let Some(plan) = plans.get(membership.plan_id.as_str()) else {
            tracing::warn!(
                "Membership {} references unknown plan {}",
                membership.id,
                membership.plan_id
            );
            skipped.push(SkippedMembership {
                membership_id: membership.id.clone(),
                reason: format!("plan '{}' not found", membership.plan_id),
            });
            continue;
        };

        let payments = payments_by_membership
            .get(membership.id.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        match reconcile(membership, plan, payments, options) {
            Ok(result) => rows.push(DuesRow {
                membership_id: membership.id.clone(),
                member_id: membership.member_id.clone(),
                member_name: members
                    .get(membership.member_id.as_str())
                    .map(|m| m.full_name.clone()),
                plan_name: plan.name.clone(),
                status: result.status,
                periods_due: result.periods_due,
                periods_paid: result.periods_paid,
                periods_owed: result.periods_owed,
                periods_prepaid: result.periods_prepaid,
                amount_owed: result.amount_owed,
                paid_through: result.paid_through,
                next_due_date: result.next_due_date,
                duplicate_payments: result.duplicate_payments.len(),
                unmatched_payments: result.unmatched_payments.len(),
            }),
            Err(e) => {
                tracing::warn!("Skipping membership {}: {}", membership.id, e);
                skipped.push(SkippedMembership {
                    membership_id: membership.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let summary = DuesSummary {
        gym_id: gym_id.to_string(),
        as_of: options.as_of,
        memberships: rows.len(),
        overdue: rows
            .iter()
            .filter(|r| r.status == MembershipStatus::Overdue)
            .count(),
        periods_owed: rows.iter().map(|r| u64::from(r.periods_owed)).sum(),
        amount_owed: rows.iter().map(|r| r.amount_owed).sum::<Money>(),
        skipped: skipped.len(),
    };

    if only_overdue {
        rows.retain(|r| r.status == MembershipStatus::Overdue);
    }

    DuesReport {
        summary,
        rows,
        skipped,
    }
}

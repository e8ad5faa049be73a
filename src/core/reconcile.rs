//! Membership billing-period reconciliation.
//!
//! A membership is split into consecutive periods of `duration_months`
//! months, always measured from the original start date. Each period owns
//! the `duration_months` calendar months beginning at the month it starts
//! in, and a payment tagged with any of those months covers it. A period is
//! owed once it is due (start + grace days) and no payment covers it.

use crate::domain::model::{Membership, MembershipStatus, Payment, Plan};
use crate::domain::money::Money;
use crate::domain::month::YearMonth;
use crate::utils::error::{BillingError, Result};
use chrono::{Days, Months, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Payments tagged further ahead than this many periods past the last due
/// one are treated as unmatched.
pub const MAX_ADVANCE_PERIODS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub as_of: NaiveDate,
    pub grace_days: u32,
}

impl ReconcileOptions {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            grace_days: 0,
        }
    }

    pub fn with_grace_days(mut self, grace_days: u32) -> Self {
        self.grace_days = grace_days;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    Paid,
    Unpaid,
    Prepaid,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingPeriod {
    pub index: u32,
    pub start: NaiveDate,
    /// Inclusive, clipped to the membership end date.
    pub end: NaiveDate,
    pub due_date: NaiveDate,
    pub first_month: YearMonth,
    pub last_month: YearMonth,
    pub status: PeriodStatus,
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub membership_id: String,
    pub status: MembershipStatus,
    pub periods: Vec<BillingPeriod>,
    pub periods_due: u32,
    pub periods_paid: u32,
    pub periods_owed: u32,
    pub periods_prepaid: u32,
    pub amount_owed: Money,
    pub total_paid: Money,
    pub paid_through: Option<NaiveDate>,
    pub next_due_date: Option<NaiveDate>,
    pub duplicate_payments: Vec<String>,
    pub unmatched_payments: Vec<String>,
}

struct Credit<'a> {
    payment_id: &'a str,
    amount: Money,
}

struct Schedule<'a> {
    membership: &'a Membership,
    duration: u32,
    grace_days: u32,
    start_month: YearMonth,
}

impl<'a> Schedule<'a> {
    fn overflow(&self) -> BillingError {
        BillingError::ReconciliationError {
            membership_id: self.membership.id.clone(),
            message: "billing period date is out of range".to_string(),
        }
    }

    fn period_start(&self, index: u32) -> Result<NaiveDate> {
        index
            .checked_mul(self.duration)
            .and_then(|months| {
                self.membership
                    .start_date
                    .checked_add_months(Months::new(months))
            })
            .ok_or_else(|| self.overflow())
    }

    fn exists(&self, start: NaiveDate) -> bool {
        self.membership.end_date.map_or(true, |end| start <= end)
    }

    fn due_date(&self, start: NaiveDate) -> Result<NaiveDate> {
        start
            .checked_add_days(Days::new(u64::from(self.grace_days)))
            .ok_or_else(|| self.overflow())
    }

    fn index_for_month(&self, month: YearMonth) -> Option<u32> {
        let offset = month.months_since(self.start_month);
        if offset < 0 {
            return None;
        }
        u32::try_from(offset / i64::from(self.duration)).ok()
    }

    /// 只在期間存在時回傳
    fn period(
        &self,
        index: u32,
        status: PeriodStatus,
        payment_id: Option<String>,
    ) -> Result<Option<BillingPeriod>> {
        let start = self.period_start(index)?;
        if !self.exists(start) {
            return Ok(None);
        }

        let next_index = index.checked_add(1).ok_or_else(|| self.overflow())?;
        let next_start = self.period_start(next_index)?;
        let mut end = next_start.pred_opt().ok_or_else(|| self.overflow())?;
        if let Some(membership_end) = self.membership.end_date {
            end = end.min(membership_end);
        }

        let first_month = self
            .start_month
            .add_months(i64::from(index) * i64::from(self.duration))
            .ok_or_else(|| self.overflow())?;
        let last_month = first_month
            .add_months(i64::from(self.duration) - 1)
            .ok_or_else(|| self.overflow())?;

        Ok(Some(BillingPeriod {
            index,
            start,
            end,
            due_date: self.due_date(start)?,
            first_month,
            last_month,
            status,
            payment_id,
        }))
    }

    /// 截至 as_of 已到期的期數
    fn due_count(&self, as_of: NaiveDate) -> Result<u32> {
        let mut count = 0u32;
        loop {
            let start = self.period_start(count)?;
            if !self.exists(start) || self.due_date(start)? > as_of {
                return Ok(count);
            }
            count += 1;
        }
    }
}

fn validate_inputs(membership: &Membership, plan: &Plan) -> Result<()> {
    let fail = |message: String| BillingError::ReconciliationError {
        membership_id: membership.id.clone(),
        message,
    };

    if plan.duration_months == 0 {
        return Err(fail(format!("plan '{}' has a zero-month duration", plan.id)));
    }
    if membership.plan_id != plan.id {
        return Err(fail(format!(
            "membership references plan '{}' but plan '{}' was supplied",
            membership.plan_id, plan.id
        )));
    }
    if membership.gym_id != plan.gym_id {
        return Err(fail(format!(
            "plan '{}' belongs to gym '{}'",
            plan.id, plan.gym_id
        )));
    }
    if let Some(end) = membership.end_date {
        if end < membership.start_date {
            return Err(fail(format!(
                "end date {} is before start date {}",
                end, membership.start_date
            )));
        }
    }
    Ok(())
}

/// Works out which billing periods of `membership` are covered by
/// `payments` and how many are owed as of `options.as_of`.
pub fn reconcile(
    membership: &Membership,
    plan: &Plan,
    payments: &[Payment],
    options: ReconcileOptions,
) -> Result<Reconciliation> {
    validate_inputs(membership, plan)?;

    let schedule = Schedule {
        membership,
        duration: plan.duration_months,
        grace_days: options.grace_days,
        start_month: YearMonth::from_date(membership.start_date),
    };
    let due_count = schedule.due_count(options.as_of)?;
    let advance_limit = due_count.saturating_add(MAX_ADVANCE_PERIODS);

    // 依付款日期排序，先付的優先入帳
    let mut ordered: Vec<&Payment> = payments.iter().filter(|p| !p.voided).collect();
    ordered.sort_by(|a, b| a.paid_on.cmp(&b.paid_on).then_with(|| a.id.cmp(&b.id)));

    let mut credited: BTreeMap<u32, Credit<'_>> = BTreeMap::new();
    let mut duplicate_payments = Vec::new();
    let mut unmatched_payments = Vec::new();

    for payment in ordered {
        if payment.gym_id != membership.gym_id || payment.membership_id != membership.id {
            unmatched_payments.push(payment.id.clone());
            continue;
        }

        let index = match schedule.index_for_month(payment.payment_month) {
            Some(index) if index < advance_limit => index,
            _ => {
                unmatched_payments.push(payment.id.clone());
                continue;
            }
        };

        let within_membership = schedule
            .period_start(index)
            .map(|start| schedule.exists(start))
            .unwrap_or(false);
        if !within_membership {
            unmatched_payments.push(payment.id.clone());
            continue;
        }

        if credited.contains_key(&index) {
            tracing::debug!(
                "Payment {} duplicates period {} of membership {}",
                payment.id,
                index,
                membership.id
            );
            duplicate_payments.push(payment.id.clone());
        } else {
            credited.insert(
                index,
                Credit {
                    payment_id: &payment.id,
                    amount: payment.amount,
                },
            );
        }
    }

    let mut periods = Vec::new();
    let mut periods_paid = 0u32;
    let mut periods_owed = 0u32;
    let mut periods_prepaid = 0u32;

    for index in 0..due_count {
        let payment_id = credited.get(&index).map(|c| c.payment_id.to_string());
        let status = if payment_id.is_some() {
            periods_paid += 1;
            PeriodStatus::Paid
        } else {
            periods_owed += 1;
            PeriodStatus::Unpaid
        };
        if let Some(period) = schedule.period(index, status, payment_id)? {
            periods.push(period);
        }
    }

    for (index, credit) in credited.range(due_count..) {
        if let Some(period) = schedule.period(
            *index,
            PeriodStatus::Prepaid,
            Some(credit.payment_id.to_string()),
        )? {
            periods_prepaid += 1;
            periods.push(period);
        }
    }

    // 第一個未繳的期間
    let mut first_uncovered = 0u32;
    while credited.contains_key(&first_uncovered) {
        first_uncovered += 1;
    }

    // 下一個尚未到期且未繳的期間
    let mut upcoming = first_uncovered.max(due_count);
    while credited.contains_key(&upcoming) {
        upcoming = upcoming.checked_add(1).ok_or_else(|| schedule.overflow())?;
    }
    if let Some(period) = schedule.period(upcoming, PeriodStatus::Upcoming, None)? {
        periods.push(period);
    }
    periods.sort_by_key(|p| p.index);

    let next_due_date = {
        let start = schedule.period_start(first_uncovered)?;
        if schedule.exists(start) {
            Some(schedule.due_date(start)?)
        } else {
            None
        }
    };

    let paid_through = match first_uncovered.checked_sub(1) {
        Some(last_paid) => schedule
            .period(last_paid, PeriodStatus::Paid, None)?
            .map(|p| p.end),
        None => None,
    };

    let status = if options.as_of < membership.start_date {
        MembershipStatus::Pending
    } else if periods_owed > 0 {
        MembershipStatus::Overdue
    } else if membership.end_date.is_some_and(|end| end < options.as_of) {
        MembershipStatus::Expired
    } else {
        MembershipStatus::Active
    };

    Ok(Reconciliation {
        membership_id: membership.id.clone(),
        status,
        periods,
        periods_due: due_count,
        periods_paid,
        periods_owed,
        periods_prepaid,
        amount_owed: plan.price.times(periods_owed),
        total_paid: credited.values().map(|c| c.amount).sum(),
        paid_through,
        next_due_date,
        duplicate_payments,
        unmatched_payments,
    })
}

use crate::domain::model::MembershipStatus;
use crate::domain::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 會籍欠費報表的一列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuesRow {
    pub membership_id: String,
    pub member_id: String,
    pub member_name: Option<String>,
    pub plan_name: String,
    pub status: MembershipStatus,
    pub periods_due: u32,
    pub periods_paid: u32,
    pub periods_owed: u32,
    pub periods_prepaid: u32,
    #[serde(rename = "amount_owed_cents")]
    pub amount_owed: Money,
    pub paid_through: Option<NaiveDate>,
    pub next_due_date: Option<NaiveDate>,
    pub duplicate_payments: usize,
    pub unmatched_payments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMembership {
    pub membership_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuesSummary {
    pub gym_id: String,
    pub as_of: NaiveDate,
    pub memberships: usize,
    pub overdue: usize,
    pub periods_owed: u64,
    #[serde(rename = "amount_owed_cents")]
    pub amount_owed: Money,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuesReport {
    pub summary: DuesSummary,
    pub rows: Vec<DuesRow>,
    pub skipped: Vec<SkippedMembership>,
}

use crate::domain::money::Money;
use crate::domain::month::YearMonth;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub gym_id: String,
    pub name: String,
    pub duration_months: u32,
    #[serde(rename = "price_cents")]
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub gym_id: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub gym_id: String,
    pub member_id: String,
    pub plan_id: String,
    pub start_date: NaiveDate,
    /// 最後一天（含）
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    #[default]
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub gym_id: String,
    pub membership_id: String,
    pub payment_month: YearMonth,
    #[serde(rename = "amount_cents")]
    pub amount: Money,
    pub paid_on: NaiveDate,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub voided: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Active,
    Overdue,
    Expired,
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Active => "active",
            MembershipStatus::Overdue => "overdue",
            MembershipStatus::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// 資料來源：匯出的 CSV 目錄，或後端的 REST 介面
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataSource {
    Local {
        dir: String,
    },
    Api {
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
    },
}

/// One gym's billing data as extracted from the source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingSnapshot {
    pub plans: Vec<Plan>,
    pub members: Vec<Member>,
    pub memberships: Vec<Membership>,
    pub payments: Vec<Payment>,
}

impl BillingSnapshot {
    /// 移除其他健身房的資料，回傳被移除的筆數
    pub fn retain_gym(&mut self, gym_id: &str) -> usize {
        let before = self.len();
        self.plans.retain(|p| p.gym_id == gym_id);
        self.members.retain(|m| m.gym_id == gym_id);
        self.memberships.retain(|m| m.gym_id == gym_id);
        self.payments.retain(|p| p.gym_id == gym_id);
        before - self.len()
    }

    pub fn len(&self) -> usize {
        self.plans.len() + self.members.len() + self.memberships.len() + self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

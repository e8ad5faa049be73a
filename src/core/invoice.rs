use crate::domain::model::PaymentMethod;
use crate::domain::money::Money;
use crate::utils::error::{BillingError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_BPS: u32 = 10_000;

/// 發票號碼，例如 POS-000123
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceNumber {
    prefix: String,
    sequence: u64,
}

impl InvoiceNumber {
    pub fn new(prefix: impl Into<String>, sequence: u64) -> Result<Self> {
        let prefix = prefix.into();
        validate_non_empty_string("invoice.prefix", &prefix)?;
        if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(BillingError::validation(format!(
                "Invoice prefix '{}' must be alphanumeric",
                prefix
            )));
        }
        Ok(Self { prefix, sequence })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn next(&self) -> Result<Self> {
        let sequence = self.sequence.checked_add(1).ok_or_else(|| {
            BillingError::validation(format!("Invoice sequence exhausted after {}", self))
        })?;
        Ok(Self {
            prefix: self.prefix.clone(),
            sequence,
        })
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:06}", self.prefix, self.sequence)
    }
}

impl FromStr for InvoiceNumber {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, sequence) = s
            .trim()
            .rsplit_once('-')
            .ok_or_else(|| BillingError::validation(format!("Invalid invoice number: '{}'", s)))?;
        let sequence = sequence
            .parse()
            .map_err(|_| BillingError::validation(format!("Invalid invoice number: '{}'", s)))?;
        InvoiceNumber::new(prefix, sequence)
    }
}

impl TryFrom<String> for InvoiceNumber {
    type Error = BillingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<InvoiceNumber> for String {
    fn from(value: InvoiceNumber) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: u32,
    #[serde(rename = "unit_price_cents")]
    pub unit_price: Money,
    #[serde(default)]
    pub discount_bps: u32,
}

impl InvoiceLine {
    pub fn gross(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    pub fn discount(&self) -> Money {
        self.gross().apply_bps(self.discount_bps)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub gym_id: String,
    pub number: InvoiceNumber,
    pub issued_on: NaiveDate,
    #[serde(default)]
    pub member_id: Option<String>,
    pub lines: Vec<InvoiceLine>,
    #[serde(default)]
    pub tax_rate_bps: u32,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub voided: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    #[serde(rename = "subtotal_cents")]
    pub subtotal: Money,
    #[serde(rename = "discount_cents")]
    pub discount: Money,
    #[serde(rename = "tax_cents")]
    pub tax: Money,
    #[serde(rename = "total_cents")]
    pub total: Money,
}

impl Invoice {
    /// 折扣逐行計算，稅額以折扣後小計計算
    pub fn totals(&self) -> InvoiceTotals {
        let subtotal: Money = self.lines.iter().map(InvoiceLine::gross).sum();
        let discount: Money = self.lines.iter().map(InvoiceLine::discount).sum();
        let taxable = subtotal - discount;
        let tax = taxable.apply_bps(self.tax_rate_bps);

        InvoiceTotals {
            subtotal,
            discount,
            tax,
            total: taxable + tax,
        }
    }
}

impl Validate for Invoice {
    fn validate(&self) -> Result<()> {
        if self.lines.is_empty() {
            return Err(BillingError::validation(format!(
                "Invoice {} has no lines",
                self.number
            )));
        }

        for (i, line) in self.lines.iter().enumerate() {
            if line.quantity == 0 {
                return Err(BillingError::validation(format!(
                    "Invoice {} line {} has zero quantity",
                    self.number,
                    i + 1
                )));
            }
            if line.unit_price.is_negative() {
                return Err(BillingError::validation(format!(
                    "Invoice {} line {} has a negative price",
                    self.number,
                    i + 1
                )));
            }
            validate_range("invoice.lines.discount_bps", line.discount_bps, 0, MAX_BPS)?;
        }

        validate_range("invoice.tax_rate_bps", self.tax_rate_bps, 0, MAX_BPS)?;
        Ok(())
    }
}

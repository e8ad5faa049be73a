use crate::core::invoice::Invoice;
use crate::domain::model::{Payment, PaymentMethod};
use crate::domain::money::Money;
use crate::utils::error::{BillingError, Result};
use crate::utils::validation::{validate_gym_id, validate_non_empty_string, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSession {
    pub gym_id: String,
    pub register_id: String,
    pub business_date: NaiveDate,
    #[serde(rename = "opening_float_cents")]
    pub opening_float: Money,
}

impl Validate for RegisterSession {
    fn validate(&self) -> Result<()> {
        validate_gym_id("session.gym_id", &self.gym_id)?;
        validate_non_empty_string("session.register_id", &self.register_id)?;
        if self.opening_float.is_negative() {
            return Err(BillingError::validation("Opening float cannot be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterClosing {
    pub gym_id: String,
    pub register_id: String,
    pub business_date: NaiveDate,
    #[serde(rename = "opening_float_cents")]
    pub opening_float: Money,
    pub totals_by_method: BTreeMap<PaymentMethod, Money>,
    #[serde(rename = "invoice_total_cents")]
    pub invoice_total: Money,
    #[serde(rename = "membership_payment_total_cents")]
    pub membership_payment_total: Money,
    #[serde(rename = "expected_cash_cents")]
    pub expected_cash: Money,
    #[serde(rename = "counted_cash_cents")]
    pub counted_cash: Money,
    /// 正值為溢收，負值為短收
    #[serde(rename = "difference_cents")]
    pub difference: Money,
    pub invoice_count: usize,
    pub payment_count: usize,
    pub voided_invoices: usize,
}

impl RegisterClosing {
    pub fn is_balanced(&self) -> bool {
        self.difference == Money::ZERO
    }

    pub fn total_takings(&self) -> Money {
        self.invoice_total + self.membership_payment_total
    }
}

/// Closes one register for its business date.
///
/// Only non-voided invoices issued and membership payments received on the
/// business date for the session's gym are counted.
pub fn close_register(
    session: &RegisterSession,
    invoices: &[Invoice],
    payments: &[Payment],
    counted_cash: Money,
) -> Result<RegisterClosing> {
    session.validate()?;
    if counted_cash.is_negative() {
        return Err(BillingError::validation("Counted cash cannot be negative"));
    }

    let mut totals_by_method: BTreeMap<PaymentMethod, Money> = BTreeMap::new();
    let mut invoice_total = Money::ZERO;
    let mut invoice_count = 0;
    let mut voided_invoices = 0;

    for invoice in invoices
        .iter()
        .filter(|i| i.gym_id == session.gym_id && i.issued_on == session.business_date)
    {
        if invoice.voided {
            voided_invoices += 1;
            continue;
        }
        invoice.validate()?;

        let total = invoice.totals().total;
        *totals_by_method.entry(invoice.method).or_default() += total;
        invoice_total += total;
        invoice_count += 1;
    }

    let mut membership_payment_total = Money::ZERO;
    let mut payment_count = 0;

    for payment in payments.iter().filter(|p| {
        !p.voided && p.gym_id == session.gym_id && p.paid_on == session.business_date
    }) {
        *totals_by_method.entry(payment.method).or_default() += payment.amount;
        membership_payment_total += payment.amount;
        payment_count += 1;
    }

    let cash_takings = totals_by_method
        .get(&PaymentMethod::Cash)
        .copied()
        .unwrap_or_default();
    let expected_cash = session.opening_float + cash_takings;
    let difference = counted_cash - expected_cash;

    tracing::debug!(
        "Register {} on {}: {} invoices, {} payments, expected cash {}",
        session.register_id,
        session.business_date,
        invoice_count,
        payment_count,
        expected_cash
    );

    Ok(RegisterClosing {
        gym_id: session.gym_id.clone(),
        register_id: session.register_id.clone(),
        business_date: session.business_date,
        opening_float: session.opening_float,
        totals_by_method,
        invoice_total,
        membership_payment_total,
        expected_cash,
        counted_cash,
        difference,
        invoice_count,
        payment_count,
        voided_invoices,
    })
}

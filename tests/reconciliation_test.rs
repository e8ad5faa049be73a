use chrono::NaiveDate;
use gym_billing::{
    reconcile, Membership, MembershipStatus, Money, Payment, PaymentMethod, PeriodStatus, Plan,
    ReconcileOptions,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn annual_plan() -> Plan {
    Plan {
        id: "annual".to_string(),
        gym_id: "gym-a".to_string(),
        name: "Annual".to_string(),
        duration_months: 12,
        price: Money::from_cents(30_000),
    }
}

fn membership(start: NaiveDate, end: Option<NaiveDate>) -> Membership {
    Membership {
        id: "ms-1".to_string(),
        gym_id: "gym-a".to_string(),
        member_id: "mem-1".to_string(),
        plan_id: "annual".to_string(),
        start_date: start,
        end_date: end,
    }
}

fn payment(id: &str, month: &str, paid_on: NaiveDate) -> Payment {
    Payment {
        id: id.to_string(),
        gym_id: "gym-a".to_string(),
        membership_id: "ms-1".to_string(),
        payment_month: month.parse().unwrap(),
        amount: Money::from_cents(30_000),
        paid_on,
        method: PaymentMethod::Transfer,
        voided: false,
    }
}

#[test]
fn test_annual_plan_spanning_calendar_years() {
    let payments = vec![
        payment("y1", "2023-09", date(2023, 9, 1)),
        // tagged with a month inside the second year window
        payment("y2", "2025-03", date(2024, 9, 2)),
    ];
    let result = reconcile(
        &membership(date(2023, 9, 1), None),
        &annual_plan(),
        &payments,
        ReconcileOptions::new(date(2025, 10, 1)),
    )
    .unwrap();

    assert_eq!(result.periods_due, 3);
    assert_eq!(result.periods_paid, 2);
    assert_eq!(result.periods_owed, 1);
    assert_eq!(result.amount_owed, Money::from_cents(30_000));
    assert_eq!(result.paid_through, Some(date(2025, 8, 31)));
    assert_eq!(result.next_due_date, Some(date(2025, 9, 1)));

    let second = &result.periods[1];
    assert_eq!(second.first_month.to_string(), "2024-09");
    assert_eq!(second.last_month.to_string(), "2025-08");
    assert_eq!(second.payment_id.as_deref(), Some("y2"));
}

#[test]
fn test_reconciling_on_start_date_owes_first_period() {
    let start = date(2024, 5, 10);
    let result = reconcile(
        &membership(start, None),
        &annual_plan(),
        &[],
        ReconcileOptions::new(start),
    )
    .unwrap();

    assert_eq!(result.status, MembershipStatus::Overdue);
    assert_eq!(result.periods_owed, 1);
    assert_eq!(result.periods[0].status, PeriodStatus::Unpaid);
    assert_eq!(result.paid_through, None);
}

#[test]
fn test_grace_period_keeps_new_member_active() {
    let start = date(2024, 5, 10);
    let result = reconcile(
        &membership(start, None),
        &annual_plan(),
        &[],
        ReconcileOptions::new(date(2024, 5, 12)).with_grace_days(7),
    )
    .unwrap();

    assert_eq!(result.status, MembershipStatus::Active);
    assert_eq!(result.periods_due, 0);
    assert_eq!(result.next_due_date, Some(date(2024, 5, 17)));
    assert_eq!(result.periods.len(), 1);
    assert_eq!(result.periods[0].status, PeriodStatus::Upcoming);
}

#[test]
fn test_payment_from_other_gym_is_not_credited() {
    let mut foreign = payment("x", "2024-05", date(2024, 5, 10));
    foreign.gym_id = "gym-b".to_string();

    let result = reconcile(
        &membership(date(2024, 5, 10), None),
        &annual_plan(),
        &[foreign],
        ReconcileOptions::new(date(2024, 6, 1)),
    )
    .unwrap();

    assert_eq!(result.periods_owed, 1);
    assert_eq!(result.unmatched_payments, vec!["x".to_string()]);
    assert_eq!(result.total_paid, Money::ZERO);
}

#[test]
fn test_single_day_membership() {
    let day = date(2024, 2, 29);
    let result = reconcile(
        &membership(day, Some(day)),
        &annual_plan(),
        &[payment("p", "2024-02", day)],
        ReconcileOptions::new(date(2024, 3, 1)),
    )
    .unwrap();

    assert_eq!(result.periods.len(), 1);
    assert_eq!(result.periods[0].start, day);
    assert_eq!(result.periods[0].end, day);
    assert_eq!(result.status, MembershipStatus::Expired);
    assert_eq!(result.next_due_date, None);
}

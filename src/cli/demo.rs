use chrono::{Datelike, Local, Months, NaiveDate};
use rand::Rng;
use rust_decimal::Decimal;

use crate::cli::open_ledger;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::models::{TransactionDraft, TransactionKind};
use crate::settings::load_settings;
use crate::store::Store;

/// Recurring monthly expenses: (day, category, base amount in whole THB).
const MONTHLY: &[(u32, &str, i64)] = &[
    (1, "other", 9500),   // rent
    (5, "health", 1200),  // gym
    (12, "shopping", 900),
    (20, "shopping", 1400),
    (25, "health", 600),
];

/// Grocery/meal runs: (day, base amount).
const FOOD_DAYS: &[(u32, i64)] = &[(2, 420), (6, 180), (9, 350), (13, 240), (17, 510), (21, 160), (24, 380), (27, 290)];

fn seed_month<S: Store>(
    ledger: &Ledger<S>,
    user_id: &str,
    first_day: NaiveDate,
    count: &mut usize,
) -> Result<()> {
    let mut rng = rand::thread_rng();
    let mut insert = |kind: TransactionKind, category: &str, day: u32, amount: Decimal, description: &str| -> Result<()> {
        let date = first_day.with_day(day).unwrap_or(first_day);
        ledger.insert(
            user_id,
            TransactionDraft {
                kind,
                category: category.to_string(),
                date,
                amount,
                description: description.to_string(),
            },
        )?;
        *count += 1;
        Ok(())
    };

    // Salary lands on the 28th, with a little monthly variation.
    let salary = Decimal::new(3_200_000 + rng.gen_range(0..200_000), 2);
    insert(TransactionKind::Income, "salary", 28, salary, "Monthly salary")?;
    if first_day.month() % 3 == 0 {
        insert(
            TransactionKind::Income,
            "bonus",
            28,
            Decimal::new(500_000, 2),
            "Quarterly bonus",
        )?;
    }
    if first_day.month() % 4 == 0 {
        insert(
            TransactionKind::Income,
            "investment",
            15,
            Decimal::new(rng.gen_range(80_000..240_000), 2),
            "Dividend payout",
        )?;
    }

    for &(day, category, base) in MONTHLY {
        let amount = Decimal::new(base * 100 + rng.gen_range(0..5_000), 2);
        insert(TransactionKind::Expense, category, day, amount, "")?;
    }
    for &(day, base) in FOOD_DAYS {
        let amount = Decimal::new(base * 100 + rng.gen_range(0..8_000), 2);
        insert(TransactionKind::Expense, "food", day, amount, "")?;
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let settings = load_settings();
    let ledger = open_ledger()?;

    let this_month = Local::now().date_naive().with_day(1).unwrap();
    let mut count = 0;
    for offset in (0..3u32).rev() {
        let first_day = this_month
            .checked_sub_months(Months::new(offset))
            .unwrap_or(this_month);
        seed_month(&ledger, &settings.user_id, first_day, &mut count)?;
    }

    println!("Loaded {count} sample transactions across the last 3 months.");
    println!("Try: daybook report, daybook list, daybook export");
    Ok(())
}

//! Account balance calculations under each account's natural sign.

use closebook_shared::DateRange;
use closebook_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::account::NormalBalance;
use super::types::AccountPosting;

/// Debit/credit totals and natural-sign balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Sign convention used for `balance`.
    pub normal_balance: NormalBalance,
    /// Total debit amount.
    pub debit_total: Decimal,
    /// Total credit amount.
    pub credit_total: Decimal,
    /// Net balance under the account's natural sign.
    pub balance: Decimal,
}

impl AccountBalance {
    /// Creates an empty balance.
    #[must_use]
    pub fn new(account_id: AccountId, normal_balance: NormalBalance) -> Self {
        Self {
            account_id,
            normal_balance,
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }

    /// Adds one posting's amounts.
    pub fn apply(&mut self, debit: Decimal, credit: Decimal) {
        self.debit_total += debit;
        self.credit_total += credit;
        self.balance = self
            .normal_balance
            .balance_change(self.debit_total, self.credit_total);
    }

    /// Folds a sequence of postings into a balance.
    #[must_use]
    pub fn from_postings<'a>(
        account_id: AccountId,
        normal_balance: NormalBalance,
        postings: impl IntoIterator<Item = &'a AccountPosting>,
    ) -> Self {
        let mut balance = Self::new(account_id, normal_balance);
        for posting in postings {
            balance.apply(posting.debit, posting.credit);
        }
        balance
    }
}

/// Balance before and after one ledger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// 1-based position within the listing.
    pub line_number: u32,
    /// Balance before this line.
    pub previous_balance: Decimal,
    /// Balance after this line.
    pub current_balance: Decimal,
}

impl RunningBalance {
    /// Running balance for the first line after `opening`.
    #[must_use]
    pub fn first_line(opening: Decimal, balance_change: Decimal) -> Self {
        Self {
            line_number: 1,
            previous_balance: opening,
            current_balance: opening + balance_change,
        }
    }

    /// Running balance for the line following `previous`.
    #[must_use]
    pub fn next_line(previous: &Self, balance_change: Decimal) -> Self {
        Self {
            line_number: previous.line_number + 1,
            previous_balance: previous.current_balance,
            current_balance: previous.current_balance + balance_change,
        }
    }
}

/// One row of an account ledger listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedgerLine {
    /// The confirmed posting.
    pub posting: AccountPosting,
    /// Balance around this line.
    pub running: RunningBalance,
}

/// General-ledger listing of one account over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedger {
    /// The account listed.
    pub account_id: AccountId,
    /// Dates covered.
    pub range: DateRange,
    /// Balance of all confirmed postings dated before `range.start`.
    pub opening_balance: Decimal,
    /// Confirmed postings inside the range, in date then sequence order.
    pub lines: Vec<AccountLedgerLine>,
    /// Balance after the last line.
    pub closing_balance: Decimal,
}

impl AccountLedger {
    /// Builds the listing from every confirmed posting up to `range.end`.
    ///
    /// `postings` must be sorted by date; those dated before the range only
    /// feed the opening balance.
    #[must_use]
    pub fn build(
        account_id: AccountId,
        normal_balance: NormalBalance,
        range: DateRange,
        postings: Vec<AccountPosting>,
    ) -> Self {
        let (before, within): (Vec<_>, Vec<_>) = postings
            .into_iter()
            .filter(|p| p.date <= range.end)
            .partition(|p| p.date < range.start);

        let opening_balance =
            AccountBalance::from_postings(account_id, normal_balance, &before).balance;

        let mut lines: Vec<AccountLedgerLine> = Vec::with_capacity(within.len());
        for posting in within {
            let change = normal_balance.balance_change(posting.debit, posting.credit);
            let running = match lines.last() {
                Some(prev) => RunningBalance::next_line(&prev.running, change),
                None => RunningBalance::first_line(opening_balance, change),
            };
            lines.push(AccountLedgerLine { posting, running });
        }

        let closing_balance = lines
            .last()
            .map_or(opening_balance, |l| l.running.current_balance);

        Self {
            account_id,
            range,
            opening_balance,
            lines,
            closing_balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use closebook_shared::types::LedgerEntryId;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn posting(date: NaiveDate, debit: Decimal, credit: Decimal) -> AccountPosting {
        AccountPosting {
            entry_id: LedgerEntryId::new(),
            entry_number: "JE-000001".to_string(),
            date,
            description: "test".to_string(),
            debit,
            credit,
        }
    }

    #[test]
    fn test_credit_normal_balance() {
        let account = AccountId::new();
        let postings = [
            posting(date(1, 5), Decimal::ZERO, dec!(100.00)),
            posting(date(1, 6), dec!(18.00), Decimal::ZERO),
        ];
        let balance = AccountBalance::from_postings(account, NormalBalance::Credit, &postings);
        assert_eq!(balance.debit_total, dec!(18.00));
        assert_eq!(balance.credit_total, dec!(100.00));
        assert_eq!(balance.balance, dec!(82.00));
    }

    #[test]
    fn test_account_ledger_splits_opening_balance() {
        let range = DateRange::new(date(2, 1), date(2, 28)).unwrap();
        let postings = vec![
            posting(date(1, 10), dec!(500.00), Decimal::ZERO),
            posting(date(2, 3), Decimal::ZERO, dec!(120.00)),
            posting(date(2, 20), dec!(20.00), Decimal::ZERO),
            posting(date(3, 1), dec!(999.00), Decimal::ZERO),
        ];

        let ledger = AccountLedger::build(AccountId::new(), NormalBalance::Debit, range, postings);

        assert_eq!(ledger.opening_balance, dec!(500.00));
        assert_eq!(ledger.lines.len(), 2);
        assert_eq!(ledger.lines[0].running.previous_balance, dec!(500.00));
        assert_eq!(ledger.lines[0].running.current_balance, dec!(380.00));
        assert_eq!(ledger.lines[1].running.line_number, 2);
        assert_eq!(ledger.closing_balance, dec!(400.00));
    }

    #[test]
    fn test_empty_account_ledger_closes_at_opening() {
        let range = DateRange::new(date(2, 1), date(2, 28)).unwrap();
        let postings = vec![posting(date(1, 10), dec!(75.00), Decimal::ZERO)];
        let ledger = AccountLedger::build(AccountId::new(), NormalBalance::Debit, range, postings);
        assert!(ledger.lines.is_empty());
        assert_eq!(ledger.closing_balance, dec!(75.00));
    }

    fn balance_change_strategy() -> impl Strategy<Value = Decimal> {
        (-100_000i64..100_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// **Property 3.1: Running balance chain consistency**
        ///
        /// *For any* sequence of lines, each previous balance SHALL equal the
        /// prior line's current balance and the final balance SHALL equal the
        /// opening balance plus the sum of all changes.
        #[test]
        fn prop_running_balance_chain(
            opening in balance_change_strategy(),
            changes in prop::collection::vec(balance_change_strategy(), 1..20),
        ) {
            let mut running = RunningBalance::first_line(opening, changes[0]);
            for change in &changes[1..] {
                let next = RunningBalance::next_line(&running, *change);
                prop_assert_eq!(next.previous_balance, running.current_balance);
                running = next;
            }
            let total: Decimal = changes.iter().copied().sum();
            prop_assert_eq!(running.current_balance, opening + total);
            prop_assert_eq!(running.line_number as usize, changes.len());
        }
    }
}

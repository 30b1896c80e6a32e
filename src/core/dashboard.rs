//! Dashboard aggregation
//!
//! Read-only summaries folded from a [`LedgerSnapshot`]. Nothing is materialized:
//! every call derives the figures from the current accounts and transactions, so
//! the result is never stale and costs one pass over active records.

use crate::types::{Account, AccountClass, AccountId, LedgerError, Transaction};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

/// Number of transactions reported as recent activity
pub const RECENT_TRANSACTIONS: usize = 10;

/// Active accounts (creation order) and active transactions (newest first),
/// read together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// Summary statistics consumed by the UI and report generators
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_balance: Decimal,
    pub company_balance: Decimal,
    pub personal_balance: Decimal,
    /// Sum of positive balances
    pub total_cash: Decimal,
    /// Sum of the absolute values of negative balances
    pub total_debt: Decimal,
    pub transaction_count: usize,
    pub recent_transactions: Vec<Transaction>,
    pub accounts: Vec<Account>,
}

fn add(total: Decimal, value: Decimal, account: &str) -> Result<Decimal, LedgerError> {
    total
        .checked_add(value)
        .ok_or_else(|| LedgerError::arithmetic_overflow("dashboard", account))
}

impl DashboardStats {
    /// Fold a snapshot into dashboard figures
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if a total leaves the decimal range.
    pub fn fold(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let mut stats = DashboardStats {
            total_balance: Decimal::ZERO,
            company_balance: Decimal::ZERO,
            personal_balance: Decimal::ZERO,
            total_cash: Decimal::ZERO,
            total_debt: Decimal::ZERO,
            transaction_count: snapshot.transactions.len(),
            recent_transactions: Vec::new(),
            accounts: Vec::new(),
        };

        for account in &snapshot.accounts {
            let balance = account.balance;
            stats.total_balance = add(stats.total_balance, balance, &account.id)?;
            match account.class {
                AccountClass::Company => {
                    stats.company_balance = add(stats.company_balance, balance, &account.id)?
                }
                AccountClass::Personal => {
                    stats.personal_balance = add(stats.personal_balance, balance, &account.id)?
                }
            }
            if balance > Decimal::ZERO {
                stats.total_cash = add(stats.total_cash, balance, &account.id)?;
            } else if balance < Decimal::ZERO {
                stats.total_debt = add(stats.total_debt, balance.abs(), &account.id)?;
            }
        }

        stats.recent_transactions = snapshot
            .transactions
            .into_iter()
            .take(RECENT_TRANSACTIONS)
            .collect();
        stats.accounts = snapshot.accounts;
        Ok(stats)
    }
}

/// An account whose stored balance differs from its active history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDrift {
    pub account_id: AccountId,
    pub stored_balance: Decimal,
    pub history_balance: Decimal,
}

/// Compare every active account's balance with the signed sum of its active
/// transactions
///
/// Drift is expected after a transaction is soft-deleted, since deletion does not
/// reverse balances.
pub fn reconcile(snapshot: &LedgerSnapshot) -> Result<Vec<BalanceDrift>, LedgerError> {
    let mut history: HashMap<&str, Decimal> = HashMap::new();
    for txn in &snapshot.transactions {
        let sum = history.entry(txn.account_id.as_str()).or_default();
        *sum = add(*sum, txn.signed_amount(), &txn.account_id)?;
    }

    Ok(snapshot
        .accounts
        .iter()
        .filter_map(|account| {
            let history_balance = history
                .get(account.id.as_str())
                .copied()
                .unwrap_or_default();
            (history_balance != account.balance).then(|| BalanceDrift {
                account_id: account.id.clone(),
                stored_balance: account.balance,
                history_balance,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewAccount, NewTransaction};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn account(id: &str, class: AccountClass, balance: Decimal) -> Account {
        NewAccount::new("owner", class, id, "USD").into_account(id.to_string(), balance, Utc::now())
    }

    fn txn(account_id: &str, n: usize) -> Transaction {
        NewTransaction::income(account_id, dec!(1), "entry").into_transaction(
            format!("t{}", n),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_fold_company_and_personal() {
        let snapshot = LedgerSnapshot {
            accounts: vec![
                account("a", AccountClass::Company, dec!(500)),
                account("b", AccountClass::Personal, dec!(-200)),
            ],
            transactions: Vec::new(),
        };

        let stats = DashboardStats::fold(snapshot).unwrap();

        assert_eq!(stats.total_balance, dec!(300));
        assert_eq!(stats.total_cash, dec!(500));
        assert_eq!(stats.total_debt, dec!(200));
        assert_eq!(stats.company_balance, dec!(500));
        assert_eq!(stats.personal_balance, dec!(-200));
        assert_eq!(stats.accounts.len(), 2);
    }

    #[test]
    fn test_fold_keeps_ten_most_recent() {
        let snapshot = LedgerSnapshot {
            accounts: vec![account("a", AccountClass::Company, dec!(0))],
            transactions: (0..15).map(|n| txn("a", n)).collect(),
        };

        let stats = DashboardStats::fold(snapshot).unwrap();

        assert_eq!(stats.transaction_count, 15);
        assert_eq!(stats.recent_transactions.len(), RECENT_TRANSACTIONS);
        assert_eq!(stats.recent_transactions[0].id, "t0");
    }

    #[test]
    fn test_fold_empty() {
        let stats = DashboardStats::fold(LedgerSnapshot::default()).unwrap();

        assert_eq!(stats.total_balance, Decimal::ZERO);
        assert_eq!(stats.transaction_count, 0);
        assert!(stats.recent_transactions.is_empty());
    }

    #[test]
    fn test_fold_overflow() {
        let snapshot = LedgerSnapshot {
            accounts: vec![
                account("a", AccountClass::Company, Decimal::MAX),
                account("b", AccountClass::Company, Decimal::MAX),
            ],
            transactions: Vec::new(),
        };

        assert!(matches!(
            DashboardStats::fold(snapshot),
            Err(LedgerError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn test_reconcile_reports_drift_only() {
        let snapshot = LedgerSnapshot {
            accounts: vec![
                account("a", AccountClass::Company, dec!(2)),
                account("b", AccountClass::Company, dec!(5)),
                account("c", AccountClass::Company, dec!(0)),
            ],
            transactions: vec![txn("a", 1), txn("a", 2), txn("b", 3)],
        };

        let drift = reconcile(&snapshot).unwrap();

        assert_eq!(
            drift,
            vec![BalanceDrift {
                account_id: "b".to_string(),
                stored_balance: dec!(5),
                history_balance: dec!(1),
            }]
        );
    }
}

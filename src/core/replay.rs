//! Command replay
//!
//! This module turns a stream of [`LedgerCommand`]s (read from CSV by the
//! `io` module) into calls on a [`Ledger`]. Commands address accounts by name
//! and label entries with free-form references; the `Replayer` keeps the
//! name → id and reference → entry registries.
//!
//! The registries are `DashMap`s so one `Replayer` can be shared by many tokio
//! tasks. Commands that touch the same names or references must still be applied
//! in order; [`LedgerCommand::keys`] exposes what a command touches so the batch
//! processor can group them.

use crate::core::ledger::Ledger;
use crate::core::transfer::TransferRequest;
use crate::types::{
    Account, AccountClass, AccountId, ErrorKind, LedgerError, NewAccount, NewTransaction,
    PairId, TransactionId, TransactionType,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// An income or expense line
#[derive(Debug, Clone, PartialEq)]
pub struct EntryCommand {
    pub account: String,
    pub amount: Decimal,
    pub description: String,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
}

/// One replayable ledger command
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    Open {
        name: String,
        class: AccountClass,
        currency: String,
        initial_balance: Decimal,
    },
    Income(EntryCommand),
    Expense(EntryCommand),
    Transfer {
        from: String,
        to: String,
        amount: Decimal,
        description: String,
        date: Option<DateTime<Utc>>,
        /// Used as the pair id
        reference: Option<String>,
    },
    /// Administrative override to an absolute balance
    Correct { account: String, balance: Decimal },
    Close { account: String },
    /// Soft-delete a referenced income/expense entry
    Void { reference: String },
}

/// A command tagged with the input line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedCommand {
    pub line: u64,
    pub command: LedgerCommand,
}

fn account_key(name: &str) -> String {
    format!("account:{}", name)
}

fn reference_key(label: &str) -> String {
    format!("ref:{}", label)
}

impl LedgerCommand {
    /// Registry keys this command reads or writes
    ///
    /// Two commands sharing a key must run in input order.
    pub fn keys(&self) -> Vec<String> {
        match self {
            LedgerCommand::Open { name, .. } => vec![account_key(name)],
            LedgerCommand::Income(entry) | LedgerCommand::Expense(entry) => {
                let mut keys = vec![account_key(&entry.account)];
                keys.extend(entry.reference.as_deref().map(reference_key));
                keys
            }
            LedgerCommand::Transfer {
                from,
                to,
                reference,
                ..
            } => {
                let mut keys = vec![account_key(from), account_key(to)];
                keys.extend(reference.as_deref().map(reference_key));
                keys
            }
            LedgerCommand::Correct { account, .. } | LedgerCommand::Close { account } => {
                vec![account_key(account)]
            }
            LedgerCommand::Void { reference } => vec![reference_key(reference)],
        }
    }
}

/// What a reference label points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    Entry(TransactionId),
    Transfer(PairId),
}

/// Applies commands to a ledger
#[derive(Debug)]
pub struct Replayer {
    ledger: Ledger,
    owner: String,
    accounts: DashMap<String, AccountId>,
    references: DashMap<String, RefTarget>,
}

impl Replayer {
    /// Create a replayer opening accounts on behalf of `owner`
    pub fn new(ledger: Ledger, owner: impl Into<String>) -> Self {
        Replayer {
            ledger,
            owner: owner.into(),
            accounts: DashMap::new(),
            references: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn resolve(&self, name: &str) -> Result<AccountId, LedgerError> {
        self.accounts
            .get(name)
            .map(|id| id.value().clone())
            .ok_or_else(|| LedgerError::account_not_found(name))
    }

    fn claim_reference(&self, label: Option<&str>) -> Result<(), LedgerError> {
        match label {
            Some(label) if self.references.contains_key(label) => Err(LedgerError::validation(
                format!("reference '{}' already used", label),
            )),
            _ => Ok(()),
        }
    }

    fn record(&self, tx_type: TransactionType, entry: EntryCommand) -> Result<(), LedgerError> {
        let account_id = self.resolve(&entry.account)?;
        self.claim_reference(entry.reference.as_deref())?;

        let mut new = NewTransaction::new(account_id, tx_type, entry.amount, entry.description);
        new.category = entry.category;
        new.date = entry.date;
        let delta = tx_type.signed(entry.amount);

        let txn = self.ledger.perform_transaction(new, delta)?;
        if let Some(label) = entry.reference {
            self.references.insert(label, RefTarget::Entry(txn.id));
        }
        Ok(())
    }

    /// Apply one command
    ///
    /// # Errors
    ///
    /// Whatever the ledger rejects, plus `AccountNotFound` for unknown names and
    /// `Validation` for reused names or references and for voiding a transfer.
    pub fn apply(&self, command: LedgerCommand) -> Result<(), LedgerError> {
        match command {
            LedgerCommand::Open {
                name,
                class,
                currency,
                initial_balance,
            } => {
                if self.accounts.contains_key(&name) {
                    return Err(LedgerError::validation(format!(
                        "account '{}' is already open",
                        name
                    )));
                }
                let account = self.ledger.create_account(
                    NewAccount::new(self.owner.as_str(), class, name.as_str(), currency)
                        .with_initial_balance(initial_balance),
                )?;
                self.accounts.insert(name, account.id);
                Ok(())
            }
            LedgerCommand::Income(entry) => self.record(TransactionType::Income, entry),
            LedgerCommand::Expense(entry) => self.record(TransactionType::Expense, entry),
            LedgerCommand::Transfer {
                from,
                to,
                amount,
                description,
                date,
                reference,
            } => {
                let from = self.resolve(&from)?;
                let to = self.resolve(&to)?;
                self.claim_reference(reference.as_deref())?;

                let mut request = TransferRequest::new(from, to, amount, description);
                if let Some(label) = &reference {
                    request = request.with_pair_id(label.as_str());
                }
                if let Some(date) = date {
                    request = request.with_date(date);
                }

                self.ledger.transfer(&request)?;
                if let Some(label) = reference {
                    self.references
                        .insert(label, RefTarget::Transfer(request.pair_id));
                }
                Ok(())
            }
            LedgerCommand::Correct { account, balance } => {
                let id = self.resolve(&account)?;
                self.ledger.adjust_account_balance(&id, balance)?;
                Ok(())
            }
            LedgerCommand::Close { account } => {
                let id = self.resolve(&account)?;
                self.ledger.delete_account(&id)?;
                self.accounts.remove(&account);
                Ok(())
            }
            LedgerCommand::Void { reference } => {
                let target = self
                    .references
                    .get(&reference)
                    .map(|target| target.value().clone())
                    .ok_or_else(|| {
                        LedgerError::validation(format!("unknown reference '{}'", reference))
                    })?;
                match target {
                    RefTarget::Entry(id) => {
                        self.ledger.delete_transaction(&id)?;
                        self.references.remove(&reference);
                        Ok(())
                    }
                    RefTarget::Transfer(pair_id) => Err(LedgerError::validation(format!(
                        "transfer {} cannot be voided; record a compensating transfer",
                        pair_id
                    ))),
                }
            }
        }
    }

    /// Apply a command, logging and skipping rejected ones
    ///
    /// # Errors
    ///
    /// Only storage and consistency faults are returned; they stop the replay.
    pub fn apply_or_skip(&self, line: u64, command: LedgerCommand) -> Result<(), LedgerError> {
        debug!(line, ?command, "Applying command");
        match self.apply(command) {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.kind(), ErrorKind::Storage | ErrorKind::ConsistencyFault) => {
                Err(e)
            }
            Err(e) => {
                warn!(line, error = %e, "Skipping rejected command");
                Ok(())
            }
        }
    }

    /// Active accounts sorted by name
    pub fn final_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let mut accounts = self.ledger.get_accounts()?;
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn open(name: &str, balance: Decimal) -> LedgerCommand {
        LedgerCommand::Open {
            name: name.to_string(),
            class: AccountClass::Company,
            currency: "USD".to_string(),
            initial_balance: balance,
        }
    }

    fn entry(account: &str, amount: Decimal, reference: Option<&str>) -> EntryCommand {
        EntryCommand {
            account: account.to_string(),
            amount,
            description: "entry".to_string(),
            category: None,
            date: None,
            reference: reference.map(str::to_string),
        }
    }

    fn transfer(from: &str, to: &str, amount: Decimal, reference: Option<&str>) -> LedgerCommand {
        LedgerCommand::Transfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            description: "move".to_string(),
            date: None,
            reference: reference.map(str::to_string),
        }
    }

    fn balances(replayer: &Replayer) -> Vec<(String, Decimal)> {
        replayer
            .final_accounts()
            .unwrap()
            .into_iter()
            .map(|a| (a.name, a.balance))
            .collect()
    }

    #[rstest]
    #[case::open(open("A", dec!(1)), vec!["account:A"])]
    #[case::income(LedgerCommand::Income(entry("A", dec!(1), Some("r1"))), vec!["account:A", "ref:r1"])]
    #[case::transfer(transfer("A", "B", dec!(1), None), vec!["account:A", "account:B"])]
    #[case::void(LedgerCommand::Void { reference: "r1".to_string() }, vec!["ref:r1"])]
    fn test_keys(#[case] command: LedgerCommand, #[case] expected: Vec<&str>) {
        assert_eq!(command.keys(), expected);
    }

    #[test]
    fn test_replay_sequence() {
        let replayer = Replayer::new(Ledger::in_memory(), "local");
        let commands = vec![
            open("Bank", dec!(100)),
            open("Card", dec!(0)),
            LedgerCommand::Expense(entry("Card", dec!(40), Some("e1"))),
            transfer("Bank", "Card", dec!(40), Some("t1")),
            transfer("Bank", "Card", dec!(500), None),
            LedgerCommand::Income(entry("Bank", dec!(5), None)),
        ];
        for (line, command) in commands.into_iter().enumerate() {
            replayer.apply_or_skip(line as u64, command).unwrap();
        }

        assert_eq!(
            balances(&replayer),
            vec![
                ("Bank".to_string(), dec!(65)),
                ("Card".to_string(), dec!(0)),
            ]
        );
    }

    #[test]
    fn test_void_entry_keeps_balance_and_rejects_transfer() {
        let replayer = Replayer::new(Ledger::in_memory(), "local");
        replayer.apply(open("A", dec!(10))).unwrap();
        replayer.apply(open("B", dec!(0))).unwrap();
        replayer
            .apply(LedgerCommand::Income(entry("A", dec!(5), Some("gift"))))
            .unwrap();
        replayer
            .apply(transfer("A", "B", dec!(3), Some("move")))
            .unwrap();

        replayer
            .apply(LedgerCommand::Void {
                reference: "gift".to_string(),
            })
            .unwrap();
        let err = replayer
            .apply(LedgerCommand::Void {
                reference: "move".to_string(),
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            balances(&replayer),
            vec![("A".to_string(), dec!(12)), ("B".to_string(), dec!(3))]
        );
        assert_eq!(replayer.ledger().reconcile().unwrap().len(), 1);
    }

    #[test]
    fn test_names_and_references_are_unique() {
        let replayer = Replayer::new(Ledger::in_memory(), "local");
        replayer.apply(open("A", dec!(0))).unwrap();

        assert!(replayer.apply(open("A", dec!(0))).is_err());
        replayer
            .apply(LedgerCommand::Income(entry("A", dec!(1), Some("r"))))
            .unwrap();
        assert!(replayer
            .apply(LedgerCommand::Income(entry("A", dec!(1), Some("r"))))
            .is_err());
    }

    #[test]
    fn test_close_frees_the_name() {
        let replayer = Replayer::new(Ledger::in_memory(), "local");
        replayer.apply(open("A", dec!(7))).unwrap();

        replayer
            .apply(LedgerCommand::Close {
                account: "A".to_string(),
            })
            .unwrap();
        assert_eq!(
            replayer
                .apply(LedgerCommand::Income(entry("A", dec!(1), None)))
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        replayer.apply(open("A", dec!(1))).unwrap();

        assert_eq!(balances(&replayer), vec![("A".to_string(), dec!(1))]);
    }

    #[test]
    fn test_correct_sets_absolute_balance() {
        let replayer = Replayer::new(Ledger::in_memory(), "local");
        replayer.apply(open("A", dec!(20))).unwrap();

        replayer
            .apply(LedgerCommand::Correct {
                account: "A".to_string(),
                balance: dec!(-3.5),
            })
            .unwrap();

        assert_eq!(balances(&replayer), vec![("A".to_string(), dec!(-3.5))]);
        assert!(replayer.ledger().reconcile().unwrap().is_empty());
    }
}

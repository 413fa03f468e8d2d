//! Account: balance, margin and the append-only transaction ledger.

use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    MarginLock,
    MarginRelease,
    ProfitTrade,
    LossTrade,
    Reset,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdrawal => "WITHDRAWAL",
            TransactionKind::MarginLock => "MARGIN_LOCK",
            TransactionKind::MarginRelease => "MARGIN_RELEASE",
            TransactionKind::ProfitTrade => "PROFIT_TRADE",
            TransactionKind::LossTrade => "LOSS_TRADE",
            TransactionKind::Reset => "RESET",
        }
    }
}

/// One ledger entry. `amount` is signed so that replaying
/// `balance[i] = balance[i-1] + amount[i]` from the opening deposit
/// reproduces the account balance exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRecord {
    pub timestamp: NaiveDateTime,
    pub kind: TransactionKind,
    pub amount: f64,
    pub balance_after: f64,
    pub note: String,
}

/// Trading account. Every balance-affecting operation appends exactly one
/// ledger record carrying the post-mutation balance; the ledger is the
/// single source of truth for balance history.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    initial_time: NaiveDateTime,
    initial_balance: f64,
    balance: f64,
    margin: f64,
    ledger: Vec<LedgerRecord>,
}

impl Account {
    pub fn new(initial_time: NaiveDateTime, initial_balance: f64) -> Self {
        let mut account = Account {
            initial_time,
            initial_balance,
            balance: initial_balance,
            margin: 0.0,
            ledger: Vec::new(),
        };
        account.commit(
            initial_time,
            TransactionKind::Deposit,
            initial_balance,
            "initial deposit",
        );
        account
    }

    fn commit(&mut self, timestamp: NaiveDateTime, kind: TransactionKind, amount: f64, note: &str) {
        self.ledger.push(LedgerRecord {
            timestamp,
            kind,
            amount,
            balance_after: self.balance,
            note: note.to_string(),
        });
    }

    pub fn deposit(&mut self, timestamp: NaiveDateTime, amount: f64, note: &str) -> f64 {
        self.balance += amount;
        self.commit(timestamp, TransactionKind::Deposit, amount, note);
        self.balance
    }

    pub fn withdraw(&mut self, timestamp: NaiveDateTime, amount: f64, note: &str) -> f64 {
        self.balance -= amount;
        self.commit(timestamp, TransactionKind::Withdrawal, -amount, note);
        self.balance
    }

    /// Move `amount` from spendable balance into locked margin.
    pub fn margin_lock(&mut self, timestamp: NaiveDateTime, amount: f64, note: &str) -> f64 {
        self.balance -= amount;
        self.margin += amount;
        self.commit(timestamp, TransactionKind::MarginLock, -amount, note);
        self.balance
    }

    /// Return `amount` of locked margin to the spendable balance.
    pub fn margin_release(&mut self, timestamp: NaiveDateTime, amount: f64, note: &str) -> f64 {
        self.balance += amount;
        self.margin -= amount;
        self.commit(timestamp, TransactionKind::MarginRelease, amount, note);
        self.balance
    }

    /// Settle a closed trade: release its margin, then book the profit.
    /// Zero profit releases margin only and appends no profit record.
    pub fn close_trade(
        &mut self,
        timestamp: NaiveDateTime,
        margin: f64,
        profit: f64,
        note: &str,
    ) -> f64 {
        self.margin_release(timestamp, margin, note);

        let kind = if profit > 0.0 {
            TransactionKind::ProfitTrade
        } else if profit < 0.0 {
            TransactionKind::LossTrade
        } else {
            return self.balance;
        };

        self.balance += profit;
        self.commit(timestamp, kind, profit, note);
        self.balance
    }

    /// Reset the balance to its initial value, recording the adjustment.
    pub fn reset_balance(&mut self, timestamp: NaiveDateTime, note: &str) -> f64 {
        let amount = self.initial_balance - self.balance;
        self.balance = self.initial_balance;
        self.commit(timestamp, TransactionKind::Reset, amount, note);
        self.balance
    }

    /// Truncate the ledger, retaining the opening deposit as the anchor for
    /// balance reconstruction.
    pub fn clear_ledger(&mut self) {
        self.ledger.truncate(1);
    }

    pub fn ledger(&self) -> &[LedgerRecord] {
        &self.ledger
    }

    pub fn initial_time(&self) -> NaiveDateTime {
        self.initial_time
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn replay(account: &Account) -> f64 {
        let ledger = account.ledger();
        let mut balance = 0.0;
        for record in ledger {
            balance += record.amount;
        }
        balance
    }

    #[test]
    fn new_account_books_opening_deposit() {
        let account = Account::new(ts(0), 10_000.0);
        assert!((account.balance() - 10_000.0).abs() < f64::EPSILON);
        assert!((account.margin() - 0.0).abs() < f64::EPSILON);
        assert_eq!(account.ledger().len(), 1);
        let first = &account.ledger()[0];
        assert_eq!(first.kind, TransactionKind::Deposit);
        assert!((first.amount - 10_000.0).abs() < f64::EPSILON);
        assert!((first.balance_after - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deposit_and_withdraw() {
        let mut account = Account::new(ts(0), 10_000.0);
        account.deposit(ts(1), 500.0, "top up");
        assert!((account.balance() - 10_500.0).abs() < f64::EPSILON);
        account.withdraw(ts(2), 1_500.0, "payout");
        assert!((account.balance() - 9_000.0).abs() < f64::EPSILON);
        assert_eq!(account.ledger().len(), 3);
        assert!((account.ledger()[2].amount - (-1_500.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn margin_lock_and_release_conserve_funds() {
        let mut account = Account::new(ts(0), 10_000.0);
        account.margin_lock(ts(1), 1_100.0, "open #0");
        assert!((account.balance() - 8_900.0).abs() < f64::EPSILON);
        assert!((account.margin() - 1_100.0).abs() < f64::EPSILON);

        account.margin_release(ts(2), 1_100.0, "close #0");
        assert!((account.balance() - 10_000.0).abs() < f64::EPSILON);
        assert!((account.margin() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn close_trade_books_profit_record() {
        let mut account = Account::new(ts(0), 10_000.0);
        account.margin_lock(ts(1), 1_100.0, "open #0");
        account.close_trade(ts(2), 1_100.0, 500.0, "close #0");

        assert!((account.balance() - 10_500.0).abs() < f64::EPSILON);
        let last = account.ledger().last().unwrap();
        assert_eq!(last.kind, TransactionKind::ProfitTrade);
        assert!((last.amount - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn close_trade_books_loss_record() {
        let mut account = Account::new(ts(0), 10_000.0);
        account.margin_lock(ts(1), 1_100.0, "open #0");
        account.close_trade(ts(2), 1_100.0, -250.0, "close #0");

        assert!((account.balance() - 9_750.0).abs() < f64::EPSILON);
        let last = account.ledger().last().unwrap();
        assert_eq!(last.kind, TransactionKind::LossTrade);
    }

    #[test]
    fn close_trade_with_zero_profit_releases_margin_only() {
        let mut account = Account::new(ts(0), 10_000.0);
        account.margin_lock(ts(1), 1_100.0, "open #0");
        let before = account.ledger().len();
        account.close_trade(ts(2), 1_100.0, 0.0, "close #0");

        assert!((account.balance() - 10_000.0).abs() < f64::EPSILON);
        // one MARGIN_RELEASE record, no profit record
        assert_eq!(account.ledger().len(), before + 1);
        assert_eq!(
            account.ledger().last().unwrap().kind,
            TransactionKind::MarginRelease
        );
    }

    #[test]
    fn reset_balance_records_adjustment() {
        let mut account = Account::new(ts(0), 10_000.0);
        account.withdraw(ts(1), 4_000.0, "");
        account.reset_balance(ts(2), "reset");

        assert!((account.balance() - 10_000.0).abs() < f64::EPSILON);
        let last = account.ledger().last().unwrap();
        assert_eq!(last.kind, TransactionKind::Reset);
        assert!((last.amount - 4_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ledger_replay_reproduces_balance() {
        let mut account = Account::new(ts(0), 10_000.0);
        account.deposit(ts(1), 123.45, "");
        account.margin_lock(ts(2), 1_100.0, "");
        account.withdraw(ts(3), 50.0, "");
        account.close_trade(ts(4), 1_100.0, -77.7, "");
        account.margin_lock(ts(5), 900.0, "");
        account.close_trade(ts(6), 900.0, 0.0, "");
        account.deposit(ts(7), 1.0, "");

        assert!((replay(&account) - account.balance()).abs() < 1e-9);
    }

    #[test]
    fn clear_ledger_keeps_opening_deposit() {
        let mut account = Account::new(ts(0), 10_000.0);
        account.deposit(ts(1), 500.0, "");
        account.withdraw(ts(2), 200.0, "");
        account.clear_ledger();

        assert_eq!(account.ledger().len(), 1);
        assert_eq!(account.ledger()[0].kind, TransactionKind::Deposit);
        assert!((account.ledger()[0].amount - 10_000.0).abs() < f64::EPSILON);
    }
}

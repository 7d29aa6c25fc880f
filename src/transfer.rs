// 💸 Transfer Engine - atomic balance mutation + immutable ledger append
//
// The whole transfer is one immediate (write-serializing) transaction:
// debit, credit, balance read-back, ledger insert. It commits together or
// not at all; a busy store retries the whole unit, never a prefix of it.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, TellerError};
use crate::money::Amount;

/// How many times a busy/locked store is retried before giving up.
const MAX_RETRIES: u32 = 3;

/// Immutable ledger entry. Captures both post-update balances so every
/// committed row can be audited against the account table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: String,
    pub from_account: String,
    pub to_account: String,
    pub timestamp: DateTime<Utc>,
    pub amount: Amount,
    pub from_balance_after: Amount,
    pub to_balance_after: Amount,
}

/// Move `amount` between two accounts of the same owner.
///
/// Fails with `InvalidAmount` before touching the store, `AccountNotFound`
/// when either side does not resolve under `user_id`, and `TransferFailed`
/// when both sides name the same account or anything breaks inside the
/// transactional scope. No partial balance change is ever observable.
///
/// No minimum-balance check: the source balance may go negative.
pub fn transfer(
    conn: &mut Connection,
    user_id: &str,
    from_account: &str,
    to_account: &str,
    amount: Amount,
) -> Result<TransferRecord> {
    if !amount.is_positive() {
        return Err(TellerError::InvalidAmount(format!(
            "transfer amount must be positive, got {amount}"
        )));
    }
    if from_account == to_account {
        return Err(TellerError::TransferFailed(format!(
            "source and destination are the same account ({from_account})"
        )));
    }

    let mut attempt = 0;
    loop {
        match transfer_once(conn, user_id, from_account, to_account, amount) {
            Ok(record) => {
                debug!(
                    transfer_id = %record.id,
                    from = from_account,
                    to = to_account,
                    %amount,
                    "transfer committed"
                );
                return Ok(record);
            }
            Err(TellerError::Store(e)) if is_busy(&e) && attempt < MAX_RETRIES => {
                attempt += 1;
                warn!(attempt, "ledger store busy, retrying whole transfer");
            }
            Err(TellerError::Store(e)) => {
                return Err(TellerError::TransferFailed(e.to_string()));
            }
            Err(other) => return Err(other),
        }
    }
}

/// One attempt at the full transactional sequence.
fn transfer_once(
    conn: &mut Connection,
    user_id: &str,
    from_account: &str,
    to_account: &str,
    amount: Amount,
) -> Result<TransferRecord> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Debit. Zero rows means the account does not exist for this owner:
    // dropping `tx` rolls everything back.
    let debited = tx.execute(
        "UPDATE accounts SET balance = balance - ?1
         WHERE account_number = ?2 AND user_id = ?3",
        params![amount.minor_units(), from_account, user_id],
    )?;
    if debited == 0 {
        return Err(TellerError::AccountNotFound(from_account.to_string()));
    }

    // Credit
    let credited = tx.execute(
        "UPDATE accounts SET balance = balance + ?1
         WHERE account_number = ?2 AND user_id = ?3",
        params![amount.minor_units(), to_account, user_id],
    )?;
    if credited == 0 {
        return Err(TellerError::AccountNotFound(to_account.to_string()));
    }

    // Read back both post-update balances within the same scope
    let from_balance_after: i64 = tx.query_row(
        "SELECT balance FROM accounts WHERE account_number = ?1",
        params![from_account],
        |row| row.get(0),
    )?;
    let to_balance_after: i64 = tx.query_row(
        "SELECT balance FROM accounts WHERE account_number = ?1",
        params![to_account],
        |row| row.get(0),
    )?;

    let record = TransferRecord {
        id: Uuid::new_v4().to_string(),
        from_account: from_account.to_string(),
        to_account: to_account.to_string(),
        timestamp: Utc::now(),
        amount,
        from_balance_after: Amount::from_minor(from_balance_after),
        to_balance_after: Amount::from_minor(to_balance_after),
    };

    tx.execute(
        "INSERT INTO transfers (
            transfer_id, from_account, to_account, transfer_datetime,
            amount, from_balance_after, to_balance_after
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id,
            record.from_account,
            record.to_account,
            record.timestamp.to_rfc3339(),
            record.amount.minor_units(),
            record.from_balance_after.minor_units(),
            record.to_balance_after.minor_units(),
        ],
    )?;

    tx.commit()?;
    Ok(record)
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == ErrorCode::DatabaseBusy || err.code == ErrorCode::DatabaseLocked
    )
}

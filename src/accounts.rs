// 🏦 Account Resolver - natural-language entities to ledger accounts
//
// "Not found" is a value, not an exception: resolution returns Option and
// the caller decides what to tell the user. Type-keyword matching orders by
// account number so repeated queries always pick the same row.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::classifier::ExtractedEntities;
use crate::error::Result;
use crate::money::Amount;

// ============================================================================
// ACCOUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier (10-12 digit account number).
    pub number: String,
    /// Display label, not unique ("Compte Courant", "Livret Jeune", ...).
    pub name: String,
    pub user_id: String,
    pub balance: Amount,
}

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        number: row.get(0)?,
        name: row.get(1)?,
        user_id: row.get(2)?,
        balance: Amount::from_minor(row.get(3)?),
    })
}

const ACCOUNT_COLUMNS: &str = "account_number, account_name, user_id, balance";

/// Exact lookup by account number, optionally scoped to a user.
pub fn get_account_by_number(
    conn: &Connection,
    account_number: &str,
    user_id: Option<&str>,
) -> Result<Option<Account>> {
    let account = match user_id {
        Some(uid) => conn
            .query_row(
                &format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts
                     WHERE account_number = ?1 AND user_id = ?2"
                ),
                params![account_number, uid],
                account_from_row,
            )
            .optional()?,
        None => conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = ?1"),
                params![account_number],
                account_from_row,
            )
            .optional()?,
    };

    Ok(account)
}

/// Case-insensitive substring match against display names.
///
/// Ordering by account number makes the winner deterministic when several
/// accounts share a type keyword.
pub fn get_account_by_name(
    conn: &Connection,
    name_fragment: &str,
    user_id: Option<&str>,
) -> Result<Option<Account>> {
    let pattern = format!("%{}%", name_fragment);

    let account = match user_id {
        Some(uid) => conn
            .query_row(
                &format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts
                     WHERE LOWER(account_name) LIKE LOWER(?1) AND user_id = ?2
                     ORDER BY account_number
                     LIMIT 1"
                ),
                params![pattern, uid],
                account_from_row,
            )
            .optional()?,
        None => conn
            .query_row(
                &format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts
                     WHERE LOWER(account_name) LIKE LOWER(?1)
                     ORDER BY account_number
                     LIMIT 1"
                ),
                params![pattern],
                account_from_row,
            )
            .optional()?,
    };

    Ok(account)
}

/// Resolve extracted entities to a single account.
///
/// Account number wins over type keyword; no entity at all resolves to None.
pub fn resolve(
    conn: &Connection,
    entities: &ExtractedEntities,
    user_id: Option<&str>,
) -> Result<Option<Account>> {
    if let Some(account_id) = &entities.account_id {
        return get_account_by_number(conn, account_id, user_id);
    }

    if let Some(account_type) = &entities.account_type {
        return get_account_by_name(conn, account_type, user_id);
    }

    Ok(None)
}

/// All accounts, ordered by display name.
pub fn list_accounts(conn: &Connection, user_id: Option<&str>) -> Result<Vec<Account>> {
    let sql = match user_id {
        Some(_) => format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = ?1 ORDER BY account_name"
        ),
        None => format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY account_name"),
    };

    let mut stmt = conn.prepare(&sql)?;
    let accounts = match user_id {
        Some(uid) => stmt
            .query_map(params![uid], account_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map([], account_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    Ok(accounts)
}

/// Sum of balances across accounts (all accounts, or one user's).
pub fn total_balance(conn: &Connection, user_id: Option<&str>) -> Result<Amount> {
    let total: Option<i64> = match user_id {
        Some(uid) => conn.query_row(
            "SELECT SUM(balance) FROM accounts WHERE user_id = ?1",
            params![uid],
            |row| row.get(0),
        )?,
        None => conn.query_row("SELECT SUM(balance) FROM accounts", [], |row| row.get(0))?,
    };

    Ok(Amount::from_minor(total.unwrap_or(0)))
}

// ============================================================================
// TRANSFER HISTORY VIEWS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "DEBIT",
            Direction::Credit => "CREDIT",
        }
    }
}

/// One ledger row viewed from a specific account's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferView {
    pub transfer_id: String,
    pub direction: Direction,
    /// The account on the other side of the transfer.
    pub counterparty: String,
    pub amount: Amount,
    pub date_time: String,
    /// This account's balance right after the transfer committed.
    pub balance_after: Amount,
}

/// Most recent transfers touching an account, labeled DEBIT/CREDIT relative
/// to that account. Scoped queries return nothing when the account does not
/// belong to the user.
pub fn recent_transfers(
    conn: &Connection,
    account_number: &str,
    user_id: Option<&str>,
    limit: usize,
) -> Result<Vec<TransferView>> {
    // Ownership check first when scoped
    if let Some(uid) = user_id {
        if get_account_by_number(conn, account_number, Some(uid))?.is_none() {
            return Ok(Vec::new());
        }
    }

    let mut stmt = conn.prepare(
        "SELECT transfer_id, from_account, to_account, amount, transfer_datetime,
                from_balance_after, to_balance_after
         FROM transfers
         WHERE from_account = ?1 OR to_account = ?1
         ORDER BY transfer_datetime DESC, id DESC
         LIMIT ?2",
    )?;

    let views = stmt
        .query_map(params![account_number, limit as i64], |row| {
            let transfer_id: String = row.get(0)?;
            let from_account: String = row.get(1)?;
            let to_account: String = row.get(2)?;
            let amount: i64 = row.get(3)?;
            let date_time: String = row.get(4)?;
            let from_balance_after: i64 = row.get(5)?;
            let to_balance_after: i64 = row.get(6)?;

            let (direction, counterparty, balance_after) = if from_account == account_number {
                (Direction::Debit, to_account, from_balance_after)
            } else {
                (Direction::Credit, from_account, to_balance_after)
            };

            Ok(TransferView {
                transfer_id,
                direction,
                counterparty,
                amount: Amount::from_minor(amount),
                date_time,
                balance_after: Amount::from_minor(balance_after),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(views)
}

// ============================================================================
// TESTS
// ============================================================================

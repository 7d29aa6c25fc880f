// 🗄️ Ledger & preference store - SQLite schema and setup
//
// One shared database file holds the account ledger (accounts + append-only
// transfer records) and the personalization tables (accumulated preferences +
// behavior log). WAL mode for crash recovery.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::money::Amount;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Accounts Table (mutable balances, owned by the transfer engine)
    // Balances are INTEGER minor units - exact, never floats.
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            account_number TEXT PRIMARY KEY,
            account_name TEXT NOT NULL,
            user_id TEXT NOT NULL,
            balance INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // ==========================================================================
    // Transfers Table (append-only ledger)
    // Every committed row captures both post-update balances.
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transfers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transfer_id TEXT UNIQUE NOT NULL,
            from_account TEXT NOT NULL,
            to_account TEXT NOT NULL,
            transfer_datetime TEXT NOT NULL,
            amount INTEGER NOT NULL,
            from_balance_after INTEGER NOT NULL,
            to_balance_after INTEGER NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // User Preferences Table (monotonically accumulated confidence)
    // UNIQUE key makes the per-entry UPSERT a single atomic statement.
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_preferences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            preference_category TEXT NOT NULL,
            preference_value TEXT NOT NULL,
            confidence_score REAL NOT NULL DEFAULT 0.0,
            last_updated TEXT NOT NULL,
            UNIQUE(user_id, preference_category, preference_value)
        )",
        [],
    )?;

    // ==========================================================================
    // Behavior Log Table (append-only, never mutated)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_behavior_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            action_type TEXT NOT NULL,
            action_details TEXT,
            timestamp TEXT NOT NULL,
            session_id TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transfers_from ON transfers(from_account)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transfers_to ON transfers(to_account)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_preferences_user ON user_preferences(user_id, confidence_score)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_behavior_user ON user_behavior_log(user_id)",
        [],
    )?;

    Ok(())
}

/// Create an account row. Used by setup/seeding and tests; the conversational
/// core itself never creates accounts.
pub fn create_account(
    conn: &Connection,
    account_number: &str,
    account_name: &str,
    user_id: &str,
    opening_balance: Amount,
) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (account_number, account_name, user_id, balance)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            account_number,
            account_name,
            user_id,
            opening_balance.minor_units()
        ],
    )?;

    Ok(())
}

/// Seed a small demo ledger (idempotent: skipped when accounts already exist).
pub fn seed_demo_accounts(conn: &Connection, user_id: &str) -> Result<usize> {
    let existing: i64 = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;

    if existing > 0 {
        return Ok(0);
    }

    let demo = [
        ("1111111111", "Compte Courant", 150_000),
        ("2222222222", "Compte Épargne", 520_000),
        ("3333333333", "Livret Jeune", 80_000),
    ];

    for (number, name, balance_minor) in demo {
        create_account(conn, number, name, user_id, Amount::from_minor(balance_minor))?;
    }

    Ok(demo.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_seed_demo_accounts_once() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let first = seed_demo_accounts(&conn, "alice").unwrap();
        let second = seed_demo_accounts(&conn, "alice").unwrap();

        assert_eq!(first, 3);
        assert_eq!(second, 0, "seeding twice must not duplicate accounts");
    }

    #[test]
    fn test_duplicate_account_number_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        create_account(&conn, "1234567890", "Checking", "bob", Amount::from_major(10)).unwrap();
        let dup = create_account(&conn, "1234567890", "Other", "bob", Amount::ZERO);
        assert!(dup.is_err());
    }
}

// Teller demo CLI - a minimal conversational loop over the core engine
//
// Stands in for the external LLM tool loop: reads raw text, feeds it to the
// assistant, and renders the structured outcomes. `transfer <from> <to>
// <amount>` plays the role of the "execute transfer" tool call.

use anyhow::Result;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

use teller_core::{
    seed_demo_accounts, Amount, Assistant, CommandAck, Outcome, Reply, TellerError,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let db_path = args.get(1).map(String::as_str).unwrap_or("teller.db");

    let mut assistant = Assistant::open(Path::new(db_path))?;
    let mut user_id = String::from("alice");

    let seeded = seed_demo_accounts(assistant.connection(), &user_id)?;
    if seeded > 0 {
        println!("✓ Seeded {} demo accounts for '{}'", seeded, user_id);
    }

    println!("🏦 Teller - type 'exit' to quit, 'user <name>' to switch accounts");
    println!("   direct transfer: transfer <from> <to> <amount>\n");

    let stdin = io::stdin();
    loop {
        print!("{}> ", user_id);
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // Tool-call shorthand for the demo
        if let Some(rest) = line.strip_prefix("transfer ") {
            run_transfer(&mut assistant, &user_id, rest);
            continue;
        }
        if line == "reset" {
            let deleted = assistant.reset_preferences(&user_id)?;
            println!("✓ Forgot {} learned preferences", deleted);
            continue;
        }

        match assistant.handle_message(&user_id, line) {
            Ok(Reply::Command(CommandAck::Exit)) => {
                println!("👋 Bye!");
                break;
            }
            Ok(Reply::Command(CommandAck::Cleared)) => {
                print!("\x1B[2J\x1B[1;1H");
                io::stdout().flush()?;
            }
            Ok(Reply::Command(CommandAck::SwitchedUser(name))) => {
                println!("✓ Active user is now '{}'", name);
                user_id = name;
            }
            Ok(Reply::Answer { result, outcome }) => {
                render_outcome(&outcome);
                if std::env::var("TELLER_DEBUG").is_ok() {
                    println!(
                        "   [{} @ {:.2} via {:?}]",
                        result.intent, result.confidence, result.method
                    );
                }
            }
            Err(e) => println!("❌ {}", e),
        }
    }

    Ok(())
}

fn run_transfer(assistant: &mut Assistant, user_id: &str, rest: &str) {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let &[from, to, raw_amount] = parts.as_slice() else {
        println!("Usage: transfer <from-account> <to-account> <amount>");
        return;
    };

    let Some(amount) = Amount::parse_user_input(raw_amount) else {
        println!("❌ Invalid amount: '{}'", raw_amount);
        return;
    };

    match assistant.execute_transfer(user_id, from, to, amount) {
        Ok(record) => {
            println!("💸 Transferred {} from {} to {}", record.amount, from, to);
            println!(
                "   New balances: {} → {}, {} → {}",
                from, record.from_balance_after, to, record.to_balance_after
            );
        }
        Err(TellerError::AccountNotFound(account)) => {
            println!("❌ No such account: {}", account);
        }
        Err(e) => println!("❌ {}", e),
    }
}

fn render_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Balance { account } => {
            println!(
                "💰 Balance of {} ({}): {}",
                account.name, account.number, account.balance
            );
        }
        Outcome::TotalBalance { total, accounts } => {
            println!("💰 Total across your {} accounts: {}", accounts, total);
        }
        Outcome::AccountDetails { account } => {
            println!("📋 {} — number {}, balance {}", account.name, account.number, account.balance);
        }
        Outcome::AccountList { accounts, total } => {
            println!("📋 Your accounts:");
            for (i, account) in accounts.iter().enumerate() {
                println!("  {}. {} ({}) — {}", i + 1, account.name, account.number, account.balance);
            }
            println!("💎 Total: {}", total);
        }
        Outcome::History { account, transfers } => {
            if transfers.is_empty() {
                println!("📊 No transfers yet for {}", account.name);
                return;
            }
            println!("📊 Recent transfers — {}", account.name);
            for t in transfers {
                let sign = match t.direction {
                    teller_core::Direction::Debit => "-",
                    teller_core::Direction::Credit => "+",
                };
                println!(
                    "  {} {}{}  ({} {})  balance after: {}",
                    t.date_time,
                    sign,
                    t.amount,
                    t.direction.as_str(),
                    t.counterparty,
                    t.balance_after
                );
            }
        }
        Outcome::TransferGuidance { suggested_amount } => {
            println!("💸 To transfer funds use: transfer <from-account> <to-account> <amount>");
            if let Some(amount) = suggested_amount {
                println!("   (you mentioned {})", amount);
            }
        }
        Outcome::NoSuchAccount { searched } => {
            println!("❌ No account found for '{}'", searched);
        }
        Outcome::Informational { intent, suggestions } => {
            println!("ℹ️  I understood '{}' but can't act on it here.", intent);
            if !suggestions.is_empty() {
                println!("   You often ask about: {}", suggestions.join(", "));
            }
        }
        Outcome::Clarification { intent, confidence, .. } => {
            println!(
                "🤔 I'm not sure what you meant (best guess '{}' at {:.2}). Can you rephrase?",
                intent, confidence
            );
        }
    }
}

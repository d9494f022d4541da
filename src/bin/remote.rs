use std::{
    error::Error,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use clap::Parser;
use serde::{Deserialize, Serialize};

use mybank::{
    category::{Category, TransactionType, categories_for},
    client::{ApiClient, NewTransaction},
    transaction::parse_amount,
};

/// The interactive command line front-end talking to a running server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The base URL of the server.
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// File path where the session cookies are stored between runs.
    #[arg(long, default_value = ".mybank_session")]
    session_file: PathBuf,

    /// Log out and delete the stored session, then exit.
    #[arg(long)]
    logout: bool,
}

/// The saved session: who is logged in and the cookie header to restore.
#[derive(Debug, Serialize, Deserialize)]
struct Session {
    email: String,
    cookies: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();
    let client = ApiClient::new(&args.base_url)?;

    if args.logout {
        if let Some(session) = load_session(&args.session_file) {
            client.restore_session_cookies(&session.cookies);
            client.log_out()?;
            fs::remove_file(&args.session_file)?;
            println!("Logged out {}.", session.email);
        } else {
            println!("No stored session.");
        }

        return Ok(());
    }

    let email = establish_session(&client, &args.session_file)?;
    println!("Logged in as {email}.");

    loop {
        println!("\nWelcome to MyBank, would you like to:");
        println!("1 - Add income/spending");
        println!("2 - List transactions");
        println!("3 - See stats");
        println!("q - Quit");

        let input = prompt("-> ")?;
        let Some(command) = Command::parse(&input) else {
            println!("Unknown option {input:?}");
            continue;
        };

        match command {
            Command::AddTransaction => add_transaction(&client)?,
            Command::ListTransactions => list_transactions(&client)?,
            Command::ShowStats => show_stats(&client)?,
            Command::Quit => return Ok(()),
        }
    }
}

/// A top-level menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    AddTransaction,
    ListTransactions,
    ShowStats,
    Quit,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        match input {
            "1" => Some(Command::AddTransaction),
            "2" => Some(Command::ListTransactions),
            "3" => Some(Command::ShowStats),
            "q" | "Q" => Some(Command::Quit),
            _ => None,
        }
    }
}

fn prompt(message: &str) -> Result<String, io::Error> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;

    Ok(line.trim().to_string())
}

fn load_session(path: &Path) -> Option<Session> {
    let contents = fs::read_to_string(path).ok()?;

    serde_json::from_str(&contents).ok()
}

fn save_session(path: &Path, session: &Session) -> Result<(), Box<dyn Error>> {
    fs::write(path, serde_json::to_string(session)?)?;

    Ok(())
}

/// Restore the stored session if the server still accepts it, otherwise log
/// in interactively. Returns the email of the logged in user.
fn establish_session(client: &ApiClient, session_file: &Path) -> Result<String, Box<dyn Error>> {
    if let Some(session) = load_session(session_file) {
        client.restore_session_cookies(&session.cookies);

        if client.is_authenticated()? {
            return Ok(session.email);
        }

        println!("Stored session has expired, please log in again.");
    }

    loop {
        let email = prompt("Enter your email: ")?;
        let password = rpassword::prompt_password("Enter your password: ")?;

        if !client.log_in(&email, &password)? {
            println!("Invalid email or password, try again.");
            continue;
        }

        if let Some(cookies) = client.session_cookies() {
            save_session(session_file, &Session { email: email.clone(), cookies })?;
        }

        return Ok(email);
    }
}

fn add_transaction(client: &ApiClient) -> Result<(), Box<dyn Error>> {
    println!("\nEnter the amount and select [income] or [spending]");

    let amount = match parse_amount(&prompt("Enter Amount: ")?) {
        Ok(amount) => amount,
        Err(error) => {
            println!("{error}");
            return Ok(());
        }
    };

    let transaction_type: TransactionType =
        match prompt("Enter if is income or spending: ")?.parse() {
            Ok(transaction_type) => transaction_type,
            Err(error) => {
                println!("{error}");
                return Ok(());
            }
        };

    println!("\nNow select what category is this {transaction_type}");
    println!("Categories: {}", categories_for(transaction_type).join(" "));
    let category = match Category::new(&prompt("Select category: ")?, transaction_type) {
        Ok(category) => category,
        Err(error) => {
            println!("{error}");
            return Ok(());
        }
    };

    let description = prompt(&format!("More details about this {transaction_type}: "))?;

    let transaction = client.create_transaction(&NewTransaction {
        amount,
        transaction_type,
        category: category.as_str().to_string(),
        description,
        date: None,
    })?;

    println!(
        "{} added as {} {} in {}",
        transaction.amount, transaction.category, transaction.transaction_type, transaction.date
    );

    Ok(())
}

fn list_transactions(client: &ApiClient) -> Result<(), Box<dyn Error>> {
    let transactions = client.list_all_transactions(50)?;

    if transactions.is_empty() {
        println!("No transactions recorded yet.");
        return Ok(());
    }

    for transaction in transactions {
        println!(
            "{} {:>10.2} {:<16} {}",
            transaction.date, transaction.amount, transaction.category, transaction.description
        );
    }

    Ok(())
}

fn show_stats(client: &ApiClient) -> Result<(), Box<dyn Error>> {
    let month = match prompt("Month as YYYY-MM (blank for latest): ")?.as_str() {
        "" => None,
        raw => Some(raw.to_string()),
    };

    let stats = client.stats(month.as_deref())?;

    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}

use std::{
    error::Error,
    io::{self, Write},
    path::Path,
};

use clap::Parser;
use rusqlite::Connection;
use time::OffsetDateTime;

use mybank::{
    PasswordHash, ValidatedPassword,
    backup::{export_backup, seed_from_backup},
    category::{Category, TransactionType, categories_for},
    db::initialize,
    report::{
        YearMonth, all_time_totals, calendar_breakdown, category_breakdown, round2,
        trailing_window_totals,
    },
    transaction::{
        TransactionDraft, count_all_transactions, create_transaction,
        list_transactions_for_report, parse_amount,
    },
    user::{User, authenticate, create_user, get_user_by_email},
};

/// The interactive command line front-end working directly on the database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, default_value = "mybank.db")]
    db_path: String,

    /// The email to log in with. Prompted for when not given.
    #[arg(long)]
    email: Option<String>,

    /// File path to a legacy backup file to seed an empty database from.
    #[arg(long, default_value = "data.txt")]
    seed_path: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();

    let conn = Connection::open(&args.db_path)?;
    initialize(&conn)?;

    let email = match args.email {
        Some(email) => email,
        None => prompt("Enter your email: ")?,
    };
    let user = log_in_or_register(&email, &conn)?;

    if count_all_transactions(&conn)? == 0 {
        let seeded = seed_from_backup(Path::new(&args.seed_path), user.id, &conn)?;
        if seeded > 0 {
            println!("Imported {seeded} transactions from {}", args.seed_path);
        }
    }

    loop {
        println!("\nWelcome to MyBank, would you like to:");
        println!("1 - Add income/spending");
        println!("2 - See stats");
        println!("3 - Export backup");
        println!("q - Quit");

        let input = prompt("-> ")?;
        let Some(command) = Command::parse(&input) else {
            println!("Unknown option {input:?}");
            continue;
        };

        match command {
            Command::AddTransaction => add_transaction(&user, &conn)?,
            Command::ShowStats => show_stats(&user, &conn)?,
            Command::ExportBackup => {
                let count = export_backup(Path::new(&args.seed_path), user.id, &conn)?;
                println!("Wrote {count} transactions to {}", args.seed_path);
            }
            Command::Quit => return Ok(()),
        }
    }
}

/// A top-level menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    AddTransaction,
    ShowStats,
    ExportBackup,
    Quit,
}

impl Command {
    fn parse(input: &str) -> Option<Self> {
        match input {
            "1" => Some(Command::AddTransaction),
            "2" => Some(Command::ShowStats),
            "3" => Some(Command::ExportBackup),
            "q" | "Q" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// A report selected from the stats menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Report {
    AllTimeTotals,
    TrailingWindows,
    MonthlyBreakdown,
    CategoryBreakdown,
}

impl Report {
    fn parse(input: &str) -> Option<Self> {
        match input {
            "1" => Some(Report::AllTimeTotals),
            "2" => Some(Report::TrailingWindows),
            "3" => Some(Report::MonthlyBreakdown),
            "4" => Some(Report::CategoryBreakdown),
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

fn log_in_or_register(email: &str, conn: &Connection) -> Result<User, Box<dyn Error>> {
    if get_user_by_email(email, conn).is_err() {
        println!("No user registered for {email}.");
        if prompt("Register now? [y/N] ")?.to_lowercase() != "y" {
            return Err("no user to log in as".into());
        }

        let password = loop {
            let first = rpassword::prompt_password("Choose a password: ")?;
            if let Err(error) = ValidatedPassword::new(&first) {
                println!("{error}");
                continue;
            }

            let second = rpassword::prompt_password("Enter the same password again: ")?;
            if first != second {
                println!("Passwords must match, try again.");
                continue;
            }

            break first;
        };

        let password_hash = PasswordHash::from_raw_password(&password, PasswordHash::DEFAULT_COST)?;
        let user = create_user(email, password_hash, conn)?;
        println!("Registered {}.", user.email);

        return Ok(user);
    }

    loop {
        let password = rpassword::prompt_password("Enter your password: ")?;

        match authenticate(email, &password, conn) {
            Ok(user) => return Ok(user),
            Err(mybank::Error::InvalidCredentials) => println!("Wrong password, try again."),
            Err(error) => return Err(error.into()),
        }
    }
}

fn add_transaction(user: &User, conn: &Connection) -> Result<(), Box<dyn Error>> {
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

    let draft = TransactionDraft::new(amount, transaction_type, category, &description, None)?;
    let transaction = create_transaction(draft, user.id, conn)?;

    println!(
        "{} added as {} {} in {}",
        transaction.amount, transaction.category, transaction.transaction_type, transaction.date
    );

    Ok(())
}

fn show_stats(user: &User, conn: &Connection) -> Result<(), Box<dyn Error>> {
    println!("\nWhat do you wanna see?");
    println!("1 - total spending/income");
    println!("2 - spending/income in last 1, 3, 4, or 12 months");
    println!("3 - spending/income table for every month");
    println!("4 - spending by category");

    let input = prompt("-> ")?;
    let Some(report) = Report::parse(&input) else {
        println!("Unknown option {input:?}");
        return Ok(());
    };

    let transactions = list_transactions_for_report(user.id, conn)?;

    match report {
        Report::AllTimeTotals => {
            let totals = all_time_totals(&transactions);
            println!("You earned a total of ${}", round2(totals.income));
            println!("And spent a total of ${}", round2(totals.spending));
        }
        Report::TrailingWindows => {
            let today = OffsetDateTime::now_utc().date();
            println!();
            for window in trailing_window_totals(&transactions, today) {
                let months = window.days / 30;
                println!(
                    "Last {months} months, you earned ${}",
                    round2(window.totals.income)
                );
                println!("And spent ${}", round2(window.totals.spending));
            }
        }
        Report::MonthlyBreakdown => {
            for (year, months) in calendar_breakdown(&transactions) {
                println!("\n{year}");
                for (month, totals) in months {
                    println!(
                        "Month {month:02}: Income: ${} / Spending: ${}",
                        round2(totals.income),
                        round2(totals.spending)
                    );
                }
            }
        }
        Report::CategoryBreakdown => {
            let month = match prompt("Month as YYYY-MM (blank for latest): ")?.as_str() {
                "" => None,
                raw => match raw.parse::<YearMonth>() {
                    Ok(month) => Some(month),
                    Err(error) => {
                        println!("{error}");
                        return Ok(());
                    }
                },
            };

            let breakdown = category_breakdown(&transactions, month);
            match breakdown.month {
                Some(month) => println!("\n{month}"),
                None => {
                    println!("No transactions recorded yet.");
                    return Ok(());
                }
            }

            for (label, totals) in [("income", &breakdown.income), ("spending", &breakdown.spending)]
            {
                println!("{label}");
                for entry in totals {
                    println!("  {}: ${}", entry.category, round2(entry.total));
                }
            }
        }
    }

    Ok(())
}

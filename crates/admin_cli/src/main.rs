use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{AccountKind, CreateAccountCmd, Currency, Engine, Money};
use migration::MigratorTrait;
use sea_orm::{ActiveValue, Database, EntityTrait};

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub username: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "gruzzolo_admin")]
#[command(about = "Admin utilities for Gruzzolo (bootstrap users/accounts, audit balances)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./gruzzolo.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Account(Account),
    /// Report accounts whose stored balance drifted from the ledger.
    Audit(OwnerArgs),
    /// Rewrite drifted balances from the ledger.
    Reconcile(OwnerArgs),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    List(AccountListArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    /// cash | bank | e_wallet | emergency
    #[arg(long, value_parser = parse_kind)]
    kind: AccountKind,
    /// Opening balance in major units, e.g. `100.50`.
    #[arg(long, default_value = "0")]
    opening: String,
    #[arg(long, default_value = "EUR", value_parser = parse_currency)]
    currency: Currency,
}

#[derive(Args, Debug)]
struct AccountListArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    include_deleted: bool,
}

#[derive(Args, Debug)]
struct OwnerArgs {
    #[arg(long)]
    owner: String,
}

fn parse_kind(raw: &str) -> Result<AccountKind, String> {
    AccountKind::try_from(raw).map_err(|err| err.to_string())
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let cli = Cli::parse();

    let db = Database::connect(&cli.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    let engine = Engine::builder().database(db.clone()).build().await?;

    match cli.command {
        Command::User(user) => match user.command {
            UserCommand::Create(args) => {
                let model = users::ActiveModel {
                    username: ActiveValue::Set(args.username.clone()),
                };
                users::Entity::insert(model).exec(&db).await?;
                println!("created user {}", args.username);
            }
        },
        Command::Account(account) => match account.command {
            AccountCommand::Create(args) => {
                let opening: Money = args.opening.parse()?;
                let account = engine
                    .create_account(
                        CreateAccountCmd::new(args.owner, args.name, args.kind)
                            .opening_balance_minor(opening.minor())
                            .currency(args.currency),
                    )
                    .await?;
                println!(
                    "created account {} ({}) with balance {}",
                    account.name,
                    account.id,
                    Money::new(account.balance_minor).display_with(account.currency),
                );
            }
            AccountCommand::List(args) => {
                let accounts = engine
                    .list_accounts(&args.owner, args.include_deleted)
                    .await?;
                for account in accounts {
                    println!(
                        "{}  {:10}  {:9}  {}{}",
                        account.id,
                        account.kind.as_str(),
                        Money::new(account.balance_minor).display_with(account.currency),
                        account.name,
                        if account.deleted { "  (deleted)" } else { "" },
                    );
                }
            }
        },
        Command::Audit(args) => {
            let drifts = engine.audit_balances(&args.owner).await?;
            if drifts.is_empty() {
                println!("all balances agree with the ledger");
            } else {
                for drift in drifts {
                    println!(
                        "{}  {}: stored {} / derived {} (off by {})",
                        drift.account_id,
                        drift.name,
                        Money::new(drift.stored_minor),
                        Money::new(drift.derived_minor),
                        Money::new(drift.drift_minor()),
                    );
                }
                std::process::exit(1);
            }
        }
        Command::Reconcile(args) => {
            let rewritten = engine.recompute_balances(&args.owner).await?;
            println!("rewrote {rewritten} drifted balance(s)");
        }
    }

    Ok(())
}

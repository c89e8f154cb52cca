//! Command handlers. Every invocation restores the stored session first.

use api::{
    AppError, Credentials, Dashboard, FileSessionStore, HttpApi, IdentityChanges, Registration,
    SessionLifecycle, Settings,
};
use ledger::month::{month_label, month_short_label};
use ledger::{ExpenseForm, ExpenseRecord, Identity, LedgerError, RemoteError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cli::{AdminCommands, Cli, Commands, EditArgs, ExpenseArgs, SelectArgs};

type Client = Dashboard<HttpApi, HttpApi, FileSessionStore>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    Settings(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    App(#[from] AppError),
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let mut settings = Settings::new().map_err(|e| CliError::Settings(e.to_string()))?;
    if let Some(url) = cli.url {
        settings.api.base_url = url;
    }
    debug!(base_url = %settings.api.base_url, data_dir = %settings.data_dir().display(), "Settings loaded");

    let http = HttpApi::new(&settings.api)?;
    let store = FileSessionStore::new(settings.data_dir());
    let session = SessionLifecycle::new(http.clone(), store, settings.ttl());
    let mut client: Client = Dashboard::new(session, http, settings.ledger_config());
    // Signing in or out must still work when the stored session cannot be loaded.
    if let Err(e) = client.start().await {
        match cli.command {
            Commands::Login { .. } | Commands::Register(_) | Commands::Logout => {
                warn!(error = %e, "Could not restore the previous session");
            }
            _ => return Err(e.into()),
        }
    }

    match cli.command {
        Commands::Login { email, password } => {
            let identity = client.login(&Credentials::new(email, password)).await?;
            println!("Signed in as {}", identity.label());
        }
        Commands::Register(args) => {
            let registration = Registration {
                display_name: args.name,
                email: args.email,
                password: args.password,
                confirm_password: args.confirm,
                monthly_income: args.income,
            };
            let identity = client.register(&registration).await?;
            println!("Account created, signed in as {}", identity.label());
        }
        Commands::Logout => {
            client.logout()?;
            println!("Signed out");
        }
        Commands::Whoami => whoami(&mut client),
        Commands::List(select) => list(&mut client, &select)?,
        Commands::Add(args) => add(&mut client, args).await?,
        Commands::Edit { id, fields } => edit(&mut client, &id, fields).await?,
        Commands::Rm { id } => {
            client.delete_expense(&id).await?;
            println!("Deleted {id}");
        }
        Commands::Summary { year } => summary(&mut client, year)?,
        Commands::Admin(command) => admin(&mut client, command).await?,
    }
    Ok(())
}

fn whoami(client: &mut Client) {
    match client.identity() {
        Some(identity) => {
            println!("{} <{}>", identity.label(), identity.email);
            if identity.is_admin() {
                println!("Role: administrator");
            } else if identity.monthly_income > 0.0 {
                println!("Monthly income: {}", client.format_currency(identity.monthly_income));
            }
        }
        None => println!("Not signed in"),
    }
}

fn apply_selection(client: &mut Client, select: &SelectArgs) {
    if let Some(year) = select.year {
        client.select_year(year);
    }
    if let Some(month) = &select.month {
        client.select_month(month);
    }
    // Let the selection settle on the available years before paging.
    client.month_view();
    if let Some(page) = select.page {
        client.go_to_page(page);
    }
}

fn require_signed_in(client: &mut Client) -> Result<Identity, CliError> {
    client.identity().ok_or(CliError::App(AppError::NotSignedIn))
}

fn list(client: &mut Client, select: &SelectArgs) -> Result<(), CliError> {
    require_signed_in(client)?;
    apply_selection(client, select);
    let view = client.month_view();
    let Some(year) = view.year else {
        println!("No expenses yet");
        return Ok(());
    };
    println!("{} {}", month_label(&view.month), year);
    if view.records.is_empty() {
        println!("  (nothing recorded)");
    }
    for record in &view.records {
        print_record(client, record);
    }
    println!(
        "Total: {}  [{}]  page {}/{}",
        client.format_currency(view.total),
        view.status,
        view.page,
        view.total_pages
    );
    Ok(())
}

fn print_record(client: &Client, record: &ExpenseRecord) {
    println!(
        "  {:<8} {:<10} {:<24} {:<14} {:>12}",
        record.id,
        record.date,
        record.description,
        record.category,
        client.format_currency(record.amount)
    );
}

async fn add(client: &mut Client, args: ExpenseArgs) -> Result<(), CliError> {
    if let Some(month) = &args.month {
        client.select_month(month);
    }
    let form = ExpenseForm {
        description: args.description,
        category: args.category,
        amount: args.amount,
        date: args.date,
    };
    let record = client.add_expense(&form).await?;
    println!("Added {} to {}", record.id, month_label(&record.month));
    Ok(())
}

async fn edit(client: &mut Client, id: &str, fields: EditArgs) -> Result<(), CliError> {
    require_signed_in(client)?;
    let current = client.begin_edit(id)?;
    let form = ExpenseForm {
        description: fields.description.unwrap_or(current.description),
        category: fields.category.unwrap_or(current.category),
        amount: fields.amount.unwrap_or_else(|| current.amount.to_string()),
        date: fields.date.unwrap_or(current.date),
    };
    let record = client.save_expense(id, &form).await?;
    print_record(client, &record);
    Ok(())
}

fn summary(client: &mut Client, year: Option<i32>) -> Result<(), CliError> {
    require_signed_in(client)?;
    if let Some(year) = year {
        client.select_year(year);
    }
    client.month_view();
    let Some(summary) = client.annual_summary() else {
        println!("No expenses yet");
        return Ok(());
    };
    println!("{}", summary.year);
    for (index, total) in summary.months.iter().enumerate() {
        println!("  {:<4} {:>12}", month_short_label(index as u32 + 1), client.format_currency(*total));
    }
    println!("  {:<4} {:>12}", "All", client.format_currency(summary.total_for_year()));
    Ok(())
}

fn print_identity(client: &Client, identity: &Identity) {
    println!(
        "  {:<6} {:<24} {:<28} {:>12}",
        identity.id,
        identity.label(),
        identity.email,
        client.format_currency(identity.monthly_income)
    );
}

async fn admin(client: &mut Client, command: AdminCommands) -> Result<(), CliError> {
    match command {
        AdminCommands::Users => {
            for identity in client.admin_identities().await? {
                print_identity(client, &identity);
            }
        }
        AdminCommands::AddUser(args) => {
            let registration = Registration {
                display_name: args.name,
                email: args.email,
                confirm_password: args.password.clone(),
                password: args.password,
                monthly_income: args.income,
            };
            let identity = client
                .admin_create_identity(&registration, args.role.into())
                .await?;
            print_identity(client, &identity);
        }
        AdminCommands::EditUser { id, fields } => {
            let changes = IdentityChanges {
                display_name: fields.name,
                email: fields.email,
                password: fields.password,
                monthly_income: fields.income,
                role: fields.role.map(Into::into),
            };
            let identity = client.admin_update_identity(&id, &changes).await?;
            print_identity(client, &identity);
        }
        AdminCommands::DeleteUser { id } => {
            client.admin_delete_identity(&id).await?;
            println!("Deleted user {id} and their records");
        }
        AdminCommands::Records { owner } => {
            let records = client.admin_records(owner.as_deref()).await?;
            for record in &records {
                print_record(client, record);
            }
            println!("{} record(s)", records.len());
        }
        AdminCommands::AddRecord { owner, expense } => {
            if let Some(month) = &expense.month {
                client.select_month(month);
            }
            let form = ExpenseForm {
                description: expense.description,
                category: expense.category,
                amount: expense.amount,
                date: expense.date,
            };
            let record = client.admin_add_expense(&owner, &form).await?;
            println!("Added {} to {} for user {owner}", record.id, month_label(&record.month));
        }
        AdminCommands::EditRecord { id, fields } => {
            let current = client
                .admin_records(None)
                .await?
                .into_iter()
                .find(|record| record.id == id)
                .ok_or_else(|| AppError::from(LedgerError::UnknownRecord(id.clone())))?;
            let form = ExpenseForm {
                description: fields.description.unwrap_or(current.description),
                category: fields.category.unwrap_or(current.category),
                amount: fields.amount.unwrap_or_else(|| current.amount.to_string()),
                date: fields.date.unwrap_or(current.date),
            };
            let record = client.admin_save_expense(&id, &form).await?;
            print_record(client, &record);
        }
        AdminCommands::DeleteRecord { id } => {
            client.admin_delete_expense(&id).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}

use anyhow::{anyhow, Context, Result};
use apptrack::config::Config;
use apptrack::db::Database;
use apptrack::{Application, ApplicationInput, ApplicationPatch, ApplicationService, Error, TagsInput};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Track job applications from saved to offer")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true, env = "APPTRACK_DB")]
    db: Option<PathBuf>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Record a new application
    Add {
        #[command(flatten)]
        fields: FieldArgs,

        /// Full JSON payload instead of flags
        #[arg(long, conflicts_with_all = ["company", "position"])]
        payload: Option<String>,
    },

    /// List applications, newest first
    List {
        /// Filter by status (saved, applied, interviewing, offer, rejected, ghosted)
        #[arg(short, long)]
        status: Option<String>,

        /// Search company, position, notes and tags
        #[arg(short, long)]
        query: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one application
    Show {
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Change fields of an application
    Update {
        id: i64,

        #[command(flatten)]
        fields: FieldArgs,

        /// Unset an optional field (repeatable)
        #[arg(long, value_name = "FIELD")]
        clear: Vec<String>,

        /// JSON patch instead of flags
        #[arg(long)]
        payload: Option<String>,
    },

    /// Move an application to another status
    Status {
        id: i64,
        /// New status
        value: String,
    },

    /// Delete an application
    Remove { id: i64 },

    /// Open applications with a follow-up due
    Followups {
        /// Day to check against (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Args)]
struct FieldArgs {
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    position: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    link: Option<String>,
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    status: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    applied: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    follow_up: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    salary_min: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    salary_max: Option<f64>,
    #[arg(long)]
    contact_name: Option<String>,
    #[arg(long)]
    contact_email: Option<String>,
    #[arg(long)]
    resume: Option<String>,
    /// low, medium, high, urgent
    #[arg(long)]
    priority: Option<String>,
    /// Comma separated
    #[arg(long)]
    tags: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl FieldArgs {
    fn into_input(self) -> ApplicationInput {
        ApplicationInput {
            company: self.company,
            position: self.position,
            location: self.location,
            job_link: self.link,
            source: self.source,
            status: self.status,
            applied_date: self.applied,
            follow_up_date: self.follow_up,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            contact_name: self.contact_name,
            contact_email: self.contact_email,
            resume_version: self.resume,
            priority: self.priority,
            tags: self.tags.map(TagsInput::Csv),
            notes: self.notes,
        }
    }

    fn into_patch(self) -> ApplicationPatch {
        ApplicationPatch {
            company: self.company.map(Some),
            position: self.position.map(Some),
            location: self.location.map(Some),
            job_link: self.link.map(Some),
            source: self.source.map(Some),
            status: self.status.map(Some),
            applied_date: self.applied.map(Some),
            follow_up_date: self.follow_up.map(Some),
            salary_min: self.salary_min.map(Some),
            salary_max: self.salary_max.map(Some),
            contact_name: self.contact_name.map(Some),
            contact_email: self.contact_email.map(Some),
            resume_version: self.resume.map(Some),
            priority: self.priority.map(Some),
            tags: self.tags.map(|t| Some(TagsInput::Csv(t))),
            notes: self.notes.map(Some),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::resolve(cli.db.clone(), cli.verbose);
    if let Err(err) = config.init_tracing() {
        return report(&err);
    }

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn run(command: Commands, config: &Config) -> Result<()> {
    let db = Database::open(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;
    let service = ApplicationService::new(db);

    if !matches!(command, Commands::Init) {
        service.store().ensure_initialized()?;
    }

    match command {
        Commands::Init => {
            service.store().init()?;
            println!("Database initialized at {}", service.store().path().display());
        }

        Commands::Add { fields, payload } => {
            let input = match payload {
                Some(json) => serde_json::from_str::<ApplicationInput>(&json)
                    .context("Invalid JSON payload")?,
                None => fields.into_input(),
            };
            let app = service.create(input)?;
            println!("Added application #{} ({} - {})", app.id, app.company, app.position);
        }

        Commands::List { status, query, json } => {
            let apps = service.list(status.as_deref(), query.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&apps)?);
            } else {
                print_table(&apps);
            }
        }

        Commands::Show { id, json } => {
            let app = service.get(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&app)?);
            } else {
                print_details(&app);
            }
        }

        Commands::Update {
            id,
            fields,
            clear,
            payload,
        } => {
            let mut patch = match payload {
                Some(json) => serde_json::from_str::<ApplicationPatch>(&json)
                    .context("Invalid JSON patch")?,
                None => fields.into_patch(),
            };
            for field in &clear {
                if !patch.clear(field) {
                    return Err(anyhow!("'{}' is not an optional field that can be cleared", field));
                }
            }
            if patch.is_empty() {
                return Err(anyhow!("Nothing to update. Pass at least one field, --clear or --payload"));
            }
            let app = service.update(id, &patch)?;
            println!("Updated application #{}", app.id);
        }

        Commands::Status { id, value } => {
            let app = service.set_status(id, &value)?;
            println!("Application #{} is now {}", app.id, app.status);
        }

        Commands::Remove { id } => {
            service.remove(id)?;
            println!("Removed application #{}", id);
        }

        Commands::Followups { date } => {
            let today = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let apps = service.follow_ups(today)?;
            if apps.is_empty() {
                println!("No follow-ups due.");
            } else {
                println!("{:<6} {:<12} {:<12} {:<24} {:<24}", "ID", "DUE", "STATUS", "COMPANY", "POSITION");
                println!("{}", "-".repeat(80));
                for app in apps {
                    println!(
                        "{:<6} {:<12} {:<12} {:<24} {:<24}",
                        app.id,
                        app.follow_up_date.map(|d| d.to_string()).unwrap_or_default(),
                        app.status,
                        truncate(&app.company, 22),
                        truncate(&app.position, 22)
                    );
                }
            }
        }
    }

    Ok(())
}

fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(Error::Validation(v)) => {
            eprintln!("Application rejected:");
            for field in &v.errors {
                eprintln!("  {}", field);
            }
        }
        Some(e @ (Error::InvalidStatus(_) | Error::InvalidPriority(_) | Error::NotFound(_))) => {
            eprintln!("Error: {}", e);
        }
        _ => eprintln!("Error: {:#}", err),
    }
    ExitCode::from(exit_code(err))
}

/// 2 for bad input, 3 for a missing id, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::Validation(_) | Error::InvalidStatus(_) | Error::InvalidPriority(_)) => 2,
        Some(Error::NotFound(_)) => 3,
        _ => 1,
    }
}

fn print_table(apps: &[Application]) {
    if apps.is_empty() {
        println!("No applications found.");
        return;
    }
    println!(
        "{:<6} {:<13} {:<8} {:<22} {:<24} {:<11} {:<20}",
        "ID", "STATUS", "PRIORITY", "COMPANY", "POSITION", "APPLIED", "TAGS"
    );
    println!("{}", "-".repeat(108));
    for app in apps {
        println!(
            "{:<6} {:<13} {:<8} {:<22} {:<24} {:<11} {:<20}",
            app.id,
            app.status,
            app.priority,
            truncate(&app.company, 20),
            truncate(&app.position, 22),
            app.applied_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            truncate(&app.tags.join(", "), 20)
        );
    }
    println!("\n{} application(s)", apps.len());
}

fn print_details(app: &Application) {
    println!("Application #{}", app.id);
    println!("Company: {}", app.company);
    println!("Position: {}", app.position);
    println!("Status: {}", app.status);
    println!("Priority: {}", app.priority);
    if let Some(location) = &app.location {
        println!("Location: {}", location);
    }
    if let Some(link) = &app.job_link {
        println!("Link: {}", link);
    }
    if let Some(source) = &app.source {
        println!("Source: {}", source);
    }
    if let Some(date) = app.applied_date {
        println!("Applied: {}", date);
    }
    if let Some(date) = app.follow_up_date {
        println!("Follow up: {}", date);
    }
    match (app.salary_min, app.salary_max) {
        (Some(min), Some(max)) => println!("Salary: ${} - ${}", min, max),
        (Some(min), None) => println!("Salary: ${}+", min),
        (None, Some(max)) => println!("Salary: up to ${}", max),
        (None, None) => {}
    }
    match (&app.contact_name, &app.contact_email) {
        (Some(name), Some(email)) => println!("Contact: {} <{}>", name, email),
        (Some(name), None) => println!("Contact: {}", name),
        (None, Some(email)) => println!("Contact: {}", email),
        (None, None) => {}
    }
    if let Some(resume) = &app.resume_version {
        println!("Resume: {}", resume);
    }
    if !app.tags.is_empty() {
        println!("Tags: {}", app.tags.join(", "));
    }
    println!("Created: {}", app.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated: {}", app.updated_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(notes) = &app.notes {
        println!("\n--- Notes ---\n{}", notes);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use noteshare::auth::{register, verifier_for, CredentialVerifier, RegisterForm};
use noteshare::catalog::{owned_by, total_downloads, CatalogQuery, SortMode};
use noteshare::db::NoteDb;
use noteshare::models::{Branch, Note, NoteRequest, Semester};
use noteshare::session::{ProfileChanges, Session};
use noteshare::settings::Settings;
use noteshare::storage::FileStorage;
use noteshare::summary::{GeminiClient, SummaryService};
use noteshare::upload::{FileMeta, UploadForm};
use prettytable::{Cell, Row, Table};
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "noteshare")]
#[command(about = "Share and find study notes with your peers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a new account")]
    Register {
        #[arg(short, long, help = "Full name")]
        name: String,

        #[arg(short, long, help = "Email address")]
        email: String,

        #[arg(short, long, default_value = "", help = "Password")]
        password: String,

        #[arg(short, long, default_value = "CSE", help = "Branch: CSE, ECE, MECH, CIVIL, IT or OTHER")]
        branch: Branch,

        #[arg(short, long, default_value_t = 1, help = "Year of study (1-4)")]
        year: u8,
    },

    #[command(about = "Log in with your email")]
    Login {
        #[arg(short, long, help = "Email address")]
        email: String,

        #[arg(short, long, default_value = "", help = "Password")]
        password: String,
    },

    #[command(about = "Log out")]
    Logout,

    #[command(about = "Show the logged-in user")]
    Whoami,

    #[command(about = "Browse the shared catalog")]
    Browse {
        #[arg(short, long, default_value = "", help = "Search title, subject and description")]
        query: String,

        #[arg(short, long, help = "Only this branch")]
        branch: Option<Branch>,

        #[arg(short, long, help = "Only this semester (1-8)")]
        semester: Option<Semester>,

        #[arg(long, default_value = "newest", help = "Sort by: newest or popular")]
        sort: SortMode,
    },

    #[command(about = "Share a note (only its metadata is stored)")]
    Upload {
        #[arg(short, long, help = "Path to the document")]
        file: String,

        #[arg(short, long, help = "Note title")]
        title: String,

        #[arg(long, help = "Subject")]
        subject: String,

        #[arg(short, long, help = "What topics does this cover?")]
        description: String,

        #[arg(short, long, default_value = "CSE", help = "Branch")]
        branch: Branch,

        #[arg(short, long, default_value = "1", help = "Semester (1-8)")]
        semester: Semester,
    },

    #[command(about = "Download a note")]
    Download {
        #[arg(short, long, help = "Note ID")]
        id: String,
    },

    #[command(about = "Delete one of your notes")]
    Delete {
        #[arg(short, long, help = "Note ID")]
        id: String,
    },

    #[command(about = "List the notes you shared")]
    Mine,

    #[command(about = "Ask peers for notes on a subject")]
    Request {
        #[arg(short, long, help = "Subject, topic, etc.")]
        subject: String,
    },

    #[command(about = "List note requests")]
    Requests,

    #[command(about = "Edit your profile")]
    Profile {
        #[arg(short, long, help = "New name")]
        name: Option<String>,

        #[arg(short, long, help = "New year (1-4)")]
        year: Option<u8>,

        #[arg(short, long, help = "New branch")]
        branch: Option<Branch>,
    },

    #[command(about = "Get AI highlights for a note")]
    Summary {
        #[arg(short, long, help = "Note ID")]
        id: String,
    },
}

struct App {
    settings: Settings,
    db: NoteDb<FileStorage>,
    session: Session,
    verifier: Box<dyn CredentialVerifier>,
}

#[tokio::main]
async fn main() {
    noteshare::init_tracing("warn");
    let cli = Cli::parse();

    if let Err(e) = run_command(cli.command).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_command(command: Commands) -> Result<()> {
    let settings = Settings::new().context("Failed to load settings")?;
    let db = NoteDb::new(FileStorage::new(&settings.storage.dir)?);
    let session = Session::restore(&db)?;
    let verifier = verifier_for(settings.auth.verify_passwords);
    let mut ctx = App {
        settings,
        db,
        session,
        verifier,
    };

    match command {
        Commands::Register {
            name,
            email,
            password,
            branch,
            year,
        } => signup(&ctx, RegisterForm { name, email, password, branch, year })?,
        Commands::Login { email, password } => login(&mut ctx, &email, &password)?,
        Commands::Logout => {
            ctx.session.logout(&ctx.db)?;
            println!("✅ Logged out successfully!");
        }
        Commands::Whoami => whoami(&ctx),
        Commands::Browse {
            query,
            branch,
            semester,
            sort,
        } => browse(&ctx, CatalogQuery { query, branch, semester, sort })?,
        Commands::Upload {
            file,
            title,
            subject,
            description,
            branch,
            semester,
        } => {
            let form = UploadForm {
                title,
                subject,
                description,
                branch,
                semester,
                file: Some(file_meta(&file)?),
            };
            upload(&ctx, form)?;
        }
        Commands::Download { id } => download(&ctx, &id)?,
        Commands::Delete { id } => delete(&ctx, &id)?,
        Commands::Mine => mine(&ctx)?,
        Commands::Request { subject } => {
            let subject = subject.trim();
            if subject.is_empty() {
                bail!("Subject cannot be empty");
            }
            ctx.db.add_request(NoteRequest::new(subject.to_string()))?;
            println!("📣 Your request for \"{}\" has been broadcast to your peers!", subject);
        }
        Commands::Requests => requests(&ctx)?,
        Commands::Profile { name, year, branch } => {
            let user = ctx
                .session
                .update_profile(&ctx.db, ProfileChanges { name, year, branch })?;
            println!("✅ Profile updated!");
            println!("👤 {} · {} · Year {}", user.name, user.branch, user.year);
        }
        Commands::Summary { id } => summary(&ctx, &id).await?,
    }

    Ok(())
}

fn signup(ctx: &App, form: RegisterForm) -> Result<()> {
    let user = register(&ctx.db, form, ctx.verifier.as_ref())?;

    println!("✅ Account created! Please login.");
    println!("👤 Name: {}", user.name);
    println!("🆔 User ID: {}", user.id);
    println!("\n💡 Log in using: noteshare login -e {}", user.email);
    Ok(())
}

fn login(ctx: &mut App, email: &str, password: &str) -> Result<()> {
    let user = ctx
        .session
        .login(&ctx.db, email, password, ctx.verifier.as_ref())?
        .ok_or_else(|| anyhow!("Invalid email or password."))?;

    println!("✅ Login successful!");
    println!("👤 Welcome back, {}!", user.name);
    Ok(())
}

fn whoami(ctx: &App) {
    match ctx.session.current() {
        Some(user) => {
            println!("👤 Logged in as: {} <{}>", user.name, user.email);
            println!("🏫 {} · Year {}", user.branch, user.year);
            println!("🆔 User ID: {}", user.id);
        }
        None => {
            println!("❌ Not logged in");
            println!("💡 Use 'noteshare login -e <email>' to log in");
        }
    }
}

fn file_meta(path: &str) -> Result<FileMeta> {
    let path = Path::new(path);
    let metadata = fs::metadata(path).with_context(|| format!("File not found: {}", path.display()))?;
    if !metadata.is_file() {
        bail!("Not a file: {}", path.display());
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(FileMeta {
        name,
        size: metadata.len(),
        mime_type: mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    })
}

fn upload(ctx: &App, form: UploadForm) -> Result<()> {
    let user = ctx.session.require()?;
    let note = form.into_note(user, ctx.settings.upload.max_file_size)?;
    ctx.db.save_note(note.clone())?;

    println!("✅ Note uploaded successfully!");
    println!("📄 {} ({})", note.title, note.file_name);
    println!("🆔 Note ID: {}", note.id);
    println!("📊 Size: {:.2} KB", note.file_size as f64 / 1024.0);
    Ok(())
}

fn browse(ctx: &App, query: CatalogQuery) -> Result<()> {
    let notes = query.apply(&ctx.db.notes()?);

    if notes.is_empty() {
        println!("📭 No notes found.");
        println!("💡 Can't find what you need? Use 'noteshare request -s <subject>'");
        return Ok(());
    }

    println!("\n📚 {} note(s), sorted by {}\n", notes.len(), query.sort);
    print_notes(&notes);
    Ok(())
}

fn print_notes(notes: &[Note]) {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Title"),
        Cell::new("Subject"),
        Cell::new("Branch"),
        Cell::new("Semester"),
        Cell::new("By"),
        Cell::new("Downloads"),
        Cell::new("Shared"),
    ]));

    for note in notes {
        let short_id: String = note.id.chars().take(8).collect();
        table.add_row(Row::new(vec![
            Cell::new(&short_id),
            Cell::new(&note.title),
            Cell::new(&note.subject),
            Cell::new(note.branch.label()),
            Cell::new(&note.semester.to_string()),
            Cell::new(&note.uploader_name),
            Cell::new(&note.download_count.to_string()),
            Cell::new(
                &note
                    .created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d")
                    .to_string(),
            ),
        ]));
    }

    table.printstd();
    println!();
}

/// Accepts a full id or a unique prefix of one, as printed by `browse`.
fn resolve_note(ctx: &App, id: &str) -> Result<Note> {
    let notes = ctx.db.notes()?;
    if let Some(note) = notes.iter().find(|n| n.id == id) {
        return Ok(note.clone());
    }

    let mut matches = notes.into_iter().filter(|n| n.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(note), None) => Ok(note),
        (Some(_), Some(_)) => bail!("Note ID '{}' is ambiguous", id),
        _ => bail!("Note not found with ID: {}", id),
    }
}

fn download(ctx: &App, id: &str) -> Result<()> {
    let note = resolve_note(ctx, id)?;
    ctx.db.update_note_download(&note.id)?;
    println!("⬇️  Starting download for: {}", note.file_name);
    println!("📊 Downloads: {}", note.download_count + 1);
    Ok(())
}

fn delete(ctx: &App, id: &str) -> Result<()> {
    let user = ctx.session.require()?;
    let note = resolve_note(ctx, id)?;
    if note.uploader_id != user.id {
        bail!("Only the uploader can delete '{}'", note.title);
    }

    ctx.db.delete_note(&note.id)?;
    println!("🗑️  Deleted '{}'", note.title);
    Ok(())
}

fn mine(ctx: &App) -> Result<()> {
    let user = ctx.session.require()?;
    let notes = owned_by(&ctx.db.notes()?, &user.id);

    if notes.is_empty() {
        println!("📭 You haven't shared any notes yet.");
        println!("💡 Use 'noteshare upload -f <file> ...' to upload your first note");
        return Ok(());
    }

    println!("\n📚 My Shared Notes ({})", notes.len());
    println!("⬇️  Total downloads: {}\n", total_downloads(&notes));
    print_notes(&notes);
    Ok(())
}

fn requests(ctx: &App) -> Result<()> {
    let requests = ctx.db.requests()?;
    if requests.is_empty() {
        println!("📭 No note requests yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(Row::new(vec![Cell::new("Subject"), Cell::new("Requested")]));
    for request in requests {
        table.add_row(Row::new(vec![
            Cell::new(&request.subject),
            Cell::new(
                &request
                    .timestamp
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
        ]));
    }
    table.printstd();
    Ok(())
}

async fn summary(ctx: &App, id: &str) -> Result<()> {
    let note = resolve_note(ctx, id)?;
    let gemini = GeminiClient::new(
        ctx.settings.summary.api_key.clone(),
        ctx.settings.summary.model.clone(),
        ctx.settings.summary.base_url.clone(),
    );
    let service = SummaryService::new(Arc::new(gemini));

    println!("✨ AI highlights for '{}':", note.title);
    for highlight in service
        .request_summary(&note.title, &note.description, &note.subject)
        .await
    {
        println!("   • {}", highlight);
    }
    Ok(())
}

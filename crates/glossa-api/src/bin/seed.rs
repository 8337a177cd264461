//! glossa-seed: populate a glossa database with users and sample translations.

use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use glossa_api::services::{build_export_cache, AuthService, ExportCacheHandle};
use glossa_api::ServerConfig;
use glossa_core::{CreateLocaleRequest, Locale, LocaleRepository, NewTranslation, TranslationRepository};
use glossa_db::Database;

/// Locales created by `translations` when missing, as `(code, name)`.
const DEFAULT_LOCALES: &[(&str, &str)] = &[("en", "English"), ("fr", "French"), ("es", "Spanish")];

const DEFAULT_TAGS: &[&str] = &["mobile", "desktop", "web", "marketing", "legal"];

const WORDS: &[&str] = &[
    "account", "button", "cancel", "checkout", "confirm", "dashboard", "email", "error", "footer",
    "header", "help", "home", "login", "menu", "profile", "save", "search", "settings", "title",
    "welcome",
];

#[derive(Parser)]
#[command(name = "glossa-seed")]
#[command(author, version, about = "Seed data for glossa")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user, or reset the name and password of an existing one
    User {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Bulk-insert sample translations across the default locales
    Translations {
        /// Number of translations to insert
        #[arg(short, long, default_value_t = 100_000)]
        count: usize,

        /// Rows per insert statement
        #[arg(long, default_value_t = 1_000)]
        chunk_size: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glossa_seed=info,glossa_api=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    let db = Database::connect_with_config(
        &config.database_url,
        config.db_pool.clone(),
    )
    .await?;
    if config.run_migrations {
        db.migrate().await?;
    }

    match cli.command {
        Commands::User {
            name,
            email,
            password,
        } => {
            let auth = AuthService::new(std::sync::Arc::new(db.users.clone()), config.token_ttl);
            let user = auth.register_user(&name, &email, &password).await?;
            println!("User {} <{}> ready (id {})", user.name, user.email, user.id);
        }
        Commands::Translations { count, chunk_size } => {
            anyhow::ensure!(chunk_size > 0, "--chunk-size must be positive");
            let cache = ExportCacheHandle::new(
                build_export_cache(&config).await,
                config.export_cache_ttl,
            );
            seed_translations(&db, &cache, count, chunk_size).await?;
        }
    }

    Ok(())
}

async fn ensure_locales(db: &Database) -> anyhow::Result<Vec<Locale>> {
    let mut locales = Vec::with_capacity(DEFAULT_LOCALES.len());
    for (code, name) in DEFAULT_LOCALES {
        let locale = match db.locales.find_by_code(code).await? {
            Some(locale) => locale,
            None => {
                db.locales
                    .create(CreateLocaleRequest {
                        code: code.to_string(),
                        name: name.to_string(),
                    })
                    .await?
            }
        };
        locales.push(locale);
    }
    Ok(locales)
}

fn sample_value(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(2..=8);
    (0..len)
        .filter_map(|_| WORDS.choose(rng).copied())
        .collect::<Vec<_>>()
        .join(" ")
}

async fn seed_translations(
    db: &Database,
    cache: &ExportCacheHandle,
    count: usize,
    chunk_size: usize,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let locales = ensure_locales(db).await?;
    let tag_ids: Vec<i64> = db.tags.ensure(DEFAULT_TAGS).await?.iter().map(|t| t.id).collect();

    // Keys are scoped to this run so repeated seeding never collides.
    let run_id = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let mut inserted = 0usize;
    let mut linked = 0u64;

    let indices: Vec<usize> = (0..count).collect();
    for chunk in indices.chunks(chunk_size) {
        let rows: Vec<NewTranslation> = chunk
            .iter()
            .map(|i| {
                let locale = &locales[i % locales.len()];
                NewTranslation {
                    locale_id: locale.id,
                    key: format!("seed.{}.{}.{}", run_id, WORDS[i % WORDS.len()], i),
                    value: sample_value(&mut rng),
                    tag_ids: Vec::new(),
                }
            })
            .collect();

        let ids = db.translations.insert_bulk(rows).await?;
        let pairs: Vec<(i64, i64)> = ids
            .iter()
            .flat_map(|id| {
                let n = rng.gen_range(1..=3);
                tag_ids
                    .choose_multiple(&mut rng, n)
                    .map(|tag| (*id, *tag))
                    .collect::<Vec<_>>()
            })
            .collect();
        linked += db.translations.attach_tags_bulk(&pairs).await?;
        inserted += ids.len();

        info!(subsystem = "seed", inserted, total = count, "Chunk inserted");
    }

    for locale in &locales {
        cache.invalidate(&locale.code).await;
    }

    info!(
        subsystem = "seed",
        row_count = inserted,
        tag_links = linked,
        duration_ms = start.elapsed().as_millis() as u64,
        "Seeding complete"
    );
    println!("Inserted {} translations ({} tag links)", inserted, linked);
    Ok(())
}

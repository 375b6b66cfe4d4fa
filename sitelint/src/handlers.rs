use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitelint_core::config::AuditConfig;
use sitelint_core::data::Database;
use sitelint_core::report::{
    ReportFormat, gather_report_data, generate_json_report, generate_text_report, save_report,
};
use sitelint_core::run::execute_audit;
use sitelint_crawler::RenderMode;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const DB_FILE_NAME: &str = "sitelint.db";

pub fn print_banner() {
    println!();
    println!("{}", "  ███ sitelint".bright_cyan().bold());
    println!("{}", "  single-origin SEO audit engine".bright_black());
    println!();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Expand a user-supplied config directory and point at the database
/// file inside it.
pub fn resolve_database_path(dir: &str) -> PathBuf {
    let expanded = shellexpand::tilde(dir);
    Path::new(expanded.as_ref()).join(DB_FILE_NAME)
}

/// Translate parsed CLI arguments into a frozen run configuration.
pub fn build_audit_config(args: &ArgMatches) -> AuditConfig {
    let url = args.get_one::<Url>("url").unwrap();

    let patterns = |name: &str| {
        args.get_many::<String>(name)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    };

    AuditConfig {
        seed_url: url.as_str().to_string(),
        max_pages: *args.get_one::<usize>("max-pages").unwrap(),
        max_depth: *args.get_one::<usize>("max-depth").unwrap(),
        concurrency: *args.get_one::<usize>("threads").unwrap(),
        respect_robots: !args.get_flag("no-robots"),
        include_patterns: patterns("include"),
        exclude_patterns: patterns("exclude"),
        render_mode: args
            .get_one::<String>("render")
            .unwrap()
            .parse()
            .unwrap_or(RenderMode::Hybrid),
        max_render_pages: *args.get_one::<usize>("max-render-pages").unwrap(),
        ..Default::default()
    }
}

fn open_database(args: &ArgMatches) -> Database {
    let db_dir = args.get_one::<String>("database").unwrap();
    let db_path = resolve_database_path(db_dir);

    if !Database::exists(&db_path) {
        eprintln!(
            "{} No database at {}. Run {} first.",
            "✗".red().bold(),
            db_path.display(),
            "sitelint init".bright_white().bold()
        );
        std::process::exit(1);
    }

    match Database::new(&db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{} Failed to open database: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_init(args: &ArgMatches) {
    print_divider();
    println!("{}", "  SITELINT INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let dir_arg = args.get_one::<String>("PATH").unwrap();
    let force = args.get_flag("force");
    let expanded_config_dir = shellexpand::tilde(dir_arg);
    let config_dir = Path::new(expanded_config_dir.as_ref());
    let db_path = config_dir.join(DB_FILE_NAME);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );

    if Database::exists(&db_path) {
        if !force {
            println!();
            println!("{}", "⚠ WARNING".yellow().bold());
            println!(
                "A database already exists at {}.",
                db_path.display().to_string().bright_white()
            );
            println!("Re-run with {} to replace it.", "--force".bright_white());
            return;
        }
        println!("{} Removing existing database", "→".yellow().bold());
        Database::drop(&db_path);
    }

    if let Err(e) = std::fs::create_dir_all(config_dir) {
        eprintln!(
            "{} Failed to create config directory: {}",
            "✗".red().bold(),
            e
        );
        std::process::exit(1);
    }

    match Database::new(&db_path) {
        Ok(_) => {
            println!();
            println!("{} Sitelint initialization complete!", "✓".green().bold());
            println!(
                "{} Database: {}",
                "✓".green().bold(),
                db_path.display().to_string().bright_white()
            );
        }
        Err(e) => {
            eprintln!("{} Failed to create database: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub async fn handle_audit(args: &ArgMatches) {
    let db = Arc::new(Mutex::new(open_database(args)));
    let config = build_audit_config(args);

    println!("\n🔍 Auditing {}", config.seed_url.bright_white().bold());
    println!("Workers: {}", config.concurrency);
    println!("Max pages: {}", config.max_pages);
    println!("Max depth: {}", config.max_depth);
    println!("Rendering: {}", config.render_mode.as_str());
    println!(
        "robots.txt: {}\n",
        if config.respect_robots {
            "respected"
        } else {
            "ignored"
        }
    );

    // Ctrl-C flips the cancel flag; the run finishes with partial data.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Starting audit...");

    let progress = {
        let spinner = spinner.clone();
        Arc::new(move |pct: u8, msg: String| {
            spinner.set_message(format!("[{:>3}%] {}", pct, msg));
        })
    };

    match execute_audit(db.clone(), config, cancel, Some(progress)).await {
        Ok(run_id) => {
            spinner.finish_and_clear();
            println!("{} Audit complete! Run: {}\n", "✓".green().bold(), run_id);

            let db = db.lock().unwrap();
            emit_report(&db, &run_id, args);
        }
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("{} Audit failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub fn handle_report(args: &ArgMatches) {
    let db = open_database(args);

    let run_id = match args.get_one::<String>("run") {
        Some(id) => id.clone(),
        None => {
            // Default to the newest run of any status.
            match db.list_runs() {
                Ok(runs) if !runs.is_empty() => runs[0].id.clone(),
                Ok(_) => {
                    eprintln!("{} No audit runs stored yet.", "✗".red().bold());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("{} Failed to list runs: {}", "✗".red().bold(), e);
                    std::process::exit(1);
                }
            }
        }
    };

    emit_report(&db, &run_id, args);
}

fn emit_report(db: &Database, run_id: &str, args: &ArgMatches) {
    let format = args
        .get_one::<String>("format")
        .map(String::as_str)
        .and_then(ReportFormat::from_str)
        .unwrap_or(ReportFormat::Text);
    let output = args.get_one::<PathBuf>("output");

    let data = match gather_report_data(db, run_id) {
        Ok(Some(data)) => data,
        Ok(None) => {
            eprintln!("{} No run with id {}", "✗".red().bold(), run_id);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} Failed to read run: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let content = match format {
        ReportFormat::Text => generate_text_report(&data),
        ReportFormat::Json => match generate_json_report(&data) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("{} Failed to serialize report: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        },
    };

    match output {
        Some(path) => match save_report(&content, path) {
            Ok(()) => println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            ),
            Err(e) => {
                eprintln!("{} Failed to save report: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        },
        None => print!("{}", content),
    }
}

pub fn handle_runs(args: &ArgMatches) {
    let db = open_database(args);

    let runs = match db.list_runs() {
        Ok(runs) => runs,
        Err(e) => {
            eprintln!("{} Failed to list runs: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if runs.is_empty() {
        println!("No audit runs stored yet.");
        return;
    }

    print_divider();
    println!(
        "  {:<38} {:<10} {:<22} {}",
        "RUN".bold(),
        "STATUS".bold(),
        "STARTED".bold(),
        "SEED".bold()
    );
    print_divider();

    for run in runs {
        let status = match run.status.as_str() {
            "completed" => run.status.green().to_string(),
            "failed" => run.status.red().to_string(),
            _ => run.status.yellow().to_string(),
        };

        let started = chrono::DateTime::<chrono::Utc>::from_timestamp(run.started_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| run.started_at.to_string());

        println!("  {:<38} {:<10} {:<22} {}", run.id, status, started, run.seed_url);

        if let Some(stats_json) = run.stats.as_deref()
            && let Ok(stats) =
                serde_json::from_str::<sitelint_core::model::RunStats>(stats_json)
        {
            println!(
                "  {:<38} {} pages, {} issues ({} new, {} resolved)",
                "",
                stats.pages_crawled,
                stats.total_issues,
                stats.new_issues,
                stats.resolved_issues
            );
        }
        if let Some(error) = run.error_message.as_deref() {
            println!("  {:<38} {}", "", error.red());
        }
    }
}

use sitelint::commands::command_argument_builder;
use sitelint::handlers;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        handlers::print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("init", primary_command)) => handlers::handle_init(primary_command),
        Some(("audit", primary_command)) => handlers::handle_audit(primary_command).await,
        Some(("report", primary_command)) => handlers::handle_report(primary_command),
        Some(("runs", primary_command)) => handlers::handle_runs(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

use clap::{arg, command};
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitelint")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitelint")
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the sitelint database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the sitelint database")
                        .default_value("~/.config/sitelint/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("audit")
                .about(
                    "Audit a single origin: crawl, conditionally render, analyze and diff \
                against the previous completed run.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The seed URL; the crawl never leaves its registrable domain")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"max-pages" <NUM>)
                        .required(false)
                        .help("Hard cap on fetched pages")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("500"),
                )
                .arg(
                    arg!(--"max-depth" <NUM>)
                        .required(false)
                        .help("Maximum link depth from the seed")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("3"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async worker 'threads' in the fetch pool.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"render" <MODE>)
                        .required(false)
                        .help("Headless rendering: hybrid renders only pages that look empty")
                        .value_parser(["hybrid", "always", "never"])
                        .default_value("hybrid"),
                )
                .arg(
                    arg!(--"max-render-pages" <NUM>)
                        .required(false)
                        .help("Hard cap on pages sent to the headless browser")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("20"),
                )
                .arg(
                    arg!(--"no-robots")
                        .required(false)
                        .help("Ignore robots.txt disallow rules")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"include" <PATTERN>)
                        .required(false)
                        .help("Only crawl URLs containing this substring (repeatable)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"exclude" <PATTERN>)
                        .required(false)
                        .help("Skip URLs containing this substring (repeatable)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-d --"database" <PATH>)
                        .required(false)
                        .help("Directory holding the sitelint database")
                        .default_value("~/.config/sitelint/"),
                ),
        )
        .subcommand(
            command!("report")
                .about("Generate a report for a stored audit run")
                .arg(
                    arg!(-r --"run" <RUN_ID>)
                        .required(false)
                        .help("The run to report on (default: the most recent run)"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-d --"database" <PATH>)
                        .required(false)
                        .help("Directory holding the sitelint database")
                        .default_value("~/.config/sitelint/"),
                ),
        )
        .subcommand(
            command!("runs")
                .about("List stored audit runs, newest first")
                .arg(
                    arg!(-d --"database" <PATH>)
                        .required(false)
                        .help("Directory holding the sitelint database")
                        .default_value("~/.config/sitelint/"),
                ),
        )
}

use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitepulse")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitepulse")
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("audit")
                .about(
                    "Discover a site's sitemaps, categorize its pages, and stream PageSpeed \
                scores as they come in.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Base URL of the site to audit")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-b --"batch-size" <SIZE>)
                        .required(false)
                        .help("How many sitemap documents to expand concurrently")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(-t --"max-in-flight" <NUM_JOBS>)
                        .required(false)
                        .help("Maximum concurrent PageSpeed jobs")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("4"),
                )
                .arg(
                    arg!(-k --"api-key" <KEY>)
                        .required(false)
                        .help("PageSpeed Insights API key (default: $PAGESPEED_API_KEY)"),
                )
                .arg(
                    arg!(--"skip-pagespeed")
                        .required(false)
                        .help("Only discover and categorize; do not collect PageSpeed metrics")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}

use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use indicatif::{ProgressBar, ProgressStyle};
use sitepulse_core::audit::{AuditOptions, execute_audit};
use sitepulse_core::pagespeed::PageSpeedConfig;
use sitepulse_core::print_banner;
use sitepulse_core::report::{format_score_line, generate_audit_report, generate_json_report};
use sitepulse_core::session::AuditSession;
use std::time::Duration;
use url::Url;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    match chosen_command.subcommand() {
        Some(("audit", primary_command)) => {
            if let Err(e) = handle_audit(primary_command, quiet).await {
                eprintln!("{} {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

async fn handle_audit(args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let url = args.get_one::<Url>("url").expect("url is required by clap");
    let batch_size = *args.get_one::<usize>("batch-size").unwrap_or(&5);
    let max_in_flight = *args.get_one::<usize>("max-in-flight").unwrap_or(&4);
    let skip_pagespeed = args.get_flag("skip-pagespeed");
    let format = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");

    let pagespeed = if skip_pagespeed {
        None
    } else {
        let api_key = match args.get_one::<String>("api-key") {
            Some(key) => key.clone(),
            None => std::env::var("PAGESPEED_API_KEY").map_err(|_| {
                anyhow!("No PageSpeed API key; pass --api-key, set PAGESPEED_API_KEY, or use --skip-pagespeed")
            })?,
        };
        let mut config = PageSpeedConfig::new(api_key);
        config.max_in_flight = max_in_flight;
        Some(config)
    };

    let mut options = AuditOptions::new(url.as_str()).with_batch_size(batch_size);
    if let Some(config) = pagespeed {
        options = options.with_pagespeed(config);
    }

    let session = AuditSession::new();
    let mut rx = session.subscribe();

    let spinner = if quiet {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Auditing {}...", url));
        Some(pb)
    };

    let outcome = execute_audit(options, &session).await;

    if let Some(ref pb) = spinner {
        pb.finish_and_clear();
    }

    let outcome = outcome.with_context(|| format!("Audit of {} failed", url))?;

    match format {
        "json" => println!("{}", generate_json_report(&outcome.pages)),
        _ => print!("{}", generate_audit_report(&outcome.pages, url.as_str())),
    }

    let Some(job) = outcome.metrics_job else {
        return Ok(());
    };

    if !quiet {
        println!(
            "{} Streaming PageSpeed results ({} pages, Ctrl-C to stop)...\n",
            "→".blue(),
            outcome.pages.page_urls().len()
        );
    }

    // Print results as the engine pushes them.
    let printer = tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            println!("{}", format_score_line(&event));
        }
    });

    tokio::select! {
        result = job => {
            if let Err(e) = result {
                eprintln!("{} Metrics job failed: {}", "✗".red().bold(), e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n{} Cancelling in-flight PageSpeed jobs...", "→".yellow());
            session.cancel();
        }
    }

    // Dropping our sender closes the channel once the engine's clones are
    // gone, which ends the printer.
    drop(session);
    printer.await.ok();

    if !quiet {
        println!("\n{} Audit complete", "✓".green().bold());
    }

    Ok(())
}

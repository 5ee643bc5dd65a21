//! spackle CLI - a source package manager for HPC software

use anyhow::Result;
use clap::Parser;
use miette::{GraphicalReportHandler, GraphicalTheme};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use spackle::core::SpecError;
use spackle::util::GlobalContext;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        render_parse_error(&e);
        std::process::exit(1);
    }
}

/// Point at the offending part of malformed spec text.
fn render_parse_error(e: &anyhow::Error) {
    let parse = e.chain().find_map(|cause| match cause.downcast_ref::<SpecError>() {
        Some(SpecError::Parse(parse)) => Some(parse),
        _ => None,
    });
    let Some(parse) = parse else {
        return;
    };

    let mut out = String::new();
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
    if handler.render_report(&mut out, parse).is_ok() {
        eprint!("{}", out);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("spackle=debug")
    } else {
        EnvFilter::new("spackle=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_registry_root(cli.registry);
    ctx.set_install_root(cli.install_root);

    // Execute command
    match cli.command {
        Commands::Spec(args) => commands::spec::execute(args, &ctx),
        Commands::Install(args) => commands::install::execute(args, &ctx),
        Commands::Uninstall(args) => commands::uninstall::execute(args, &ctx),
        Commands::Find(args) => commands::find::execute(args, &ctx),
        Commands::List(args) => commands::list::execute(args, &ctx),
        Commands::Info(args) => commands::info::execute(args, &ctx),
        Commands::Providers(args) => commands::providers::execute(args, &ctx),
        Commands::Graph(args) => commands::graph::execute(args, &ctx),
        Commands::Dependents(args) => commands::dependents::execute(args, &ctx),
        Commands::Location(args) => commands::location::execute(args, &ctx),
    }
}

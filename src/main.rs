//! parkive: manage image sources in a notes archive and publish it with git.
//!
//! Every command runs against the nearest ancestor directory containing a
//! `.parkive` directory. Log verbosity is taken from `PARKIVE_LOG_LEVEL`
//! (TRACE, DEBUG, INFO, WARNING, ERROR, CRITICAL; default WARNING).

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands, FileSelection, GitCommand, SourceCommand, ToolCommand};
use colored::Colorize;
use parkive::config::{self, Config};
use parkive::git::Git;
use parkive::publish::{PublishReport, Publisher};
use parkive::sources::Sources;
use parkive::{rewriter, scope, wordcount};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let root = config::locate_project_root()?;
    debug!(root = %root.display(), "found project root");
    let config = Config::load(&root)?;

    match args.command {
        Commands::Source(command) => cmd_source(&root, &config, command),
        Commands::Git(command) => cmd_git(&root, &config, command),
        Commands::Tool(ToolCommand::Wc { selection }) => cmd_wc(&root, &config, selection),
    }
}

fn init_logging() {
    let level = std::env::var("PARKIVE_LOG_LEVEL").unwrap_or_default();
    let directive = match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "INFO" => "info",
        "ERROR" | "CRITICAL" => "error",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn cmd_source(root: &Path, config: &Config, command: SourceCommand) -> Result<()> {
    let mut sources = Sources::load(root)?;

    match command {
        SourceCommand::Add { name, base_url } => {
            let normalized = sources.add(&name, &base_url)?;
            debug!(path = %sources.path().display(), "saved sources");
            success(&format!("added source '{name}' => {normalized}"));
        }
        SourceCommand::Remove { name } => {
            let removed = sources.remove(&name)?;
            debug!(path = %sources.path().display(), "saved sources");
            success(&format!("removed source '{name}' ({removed})"));
        }
        SourceCommand::List { json } => {
            let all: Vec<_> = sources.iter().collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            } else if all.is_empty() {
                warning("No sources configured.");
            } else {
                for source in all {
                    info(&format!("{}\t{}", source.name, source.base_url));
                }
            }
        }
        SourceCommand::Inspect { name, files, json } => {
            let base_url = sources.require(&name)?;
            let targets = scope::files_to_process(root, &config.scope(None), files.as_deref())?;
            let usage = rewriter::count_in_files(&targets, base_url)?;

            if json {
                #[derive(Serialize)]
                struct Inspection<'a> {
                    name: &'a str,
                    base_url: &'a str,
                    images: usize,
                    files: Vec<(String, usize)>,
                }
                let inspection = Inspection {
                    name: &name,
                    base_url,
                    images: usage.total,
                    files: usage
                        .files
                        .iter()
                        .filter(|f| f.count > 0)
                        .map(|f| (display_path(root, &f.path), f.count))
                        .collect(),
                };
                println!("{}", serde_json::to_string_pretty(&inspection)?);
            } else {
                info(&format!("name: {name}"));
                info(&format!("base_url: {base_url}"));
                info(&format!("images: {}", usage.total));
            }
        }
        SourceCommand::Change {
            src,
            tgt,
            selection,
            json,
        } => {
            let source_prefix = sources.require(&src)?;
            let target_prefix = sources.require(&tgt)?;
            let targets = select_files(root, config, &selection)?;
            debug!(files = targets.len(), "selected files");

            let stats = rewriter::rewrite_files(&targets, source_prefix, target_prefix)
                .with_context(|| format!("changing source '{src}' => '{tgt}'"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            success(&format!(
                "changed source '{src}' => '{tgt}', replaced {} urls in {} files.",
                stats.replacements, stats.changed_files
            ));
        }
    }

    Ok(())
}

fn cmd_git(root: &Path, config: &Config, command: GitCommand) -> Result<()> {
    let publisher = Publisher::new(Git::new(root), &config.publish);
    let (result, json) = match command {
        GitCommand::Sync { json } => (publisher.sync(), json),
        GitCommand::Snapshot { message, json } => (publisher.snapshot(message.as_deref()), json),
    };

    match result {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_trace(&report);
                success(&format!("{} finished.", report.kind));
            }
            Ok(())
        }
        Err(failure) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&failure.report)?);
            } else {
                print_trace(&failure.report);
            }
            Err(failure.into())
        }
    }
}

fn cmd_wc(root: &Path, config: &Config, selection: FileSelection) -> Result<()> {
    let targets = select_files(root, config, &selection)?;

    let mut total_words = 0;
    for path in &targets {
        let words = wordcount::count_mixed_words(&rewriter::read_text(path)?);
        total_words += words;
        info(&format!("{}\t{words}", display_path(root, path)));
    }

    info(&format!("total files: {}", targets.len()));
    success(&format!("total words: {total_words}"));
    Ok(())
}

fn select_files(root: &Path, config: &Config, selection: &FileSelection) -> Result<Vec<PathBuf>> {
    if let Some(globs) = &selection.globs {
        debug!(?globs, "overriding scan_glob");
    }
    let scope = config.scope(selection.globs.clone());
    Ok(scope::files_to_process(root, &scope, selection.files.as_deref())?)
}

fn display_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
        Err(_) => path.display().to_string(),
    }
}

fn print_trace(report: &PublishReport) {
    for entry in &report.trace {
        if entry.succeeded {
            println!("{} {}", "✓".green(), entry.command);
        } else {
            println!("{} {}", "✗".red(), entry.command);
        }
    }
}

fn success(message: &str) {
    println!("{}", message.green().bold());
}

fn info(message: &str) {
    println!("{}", message.cyan().dimmed().bold());
}

fn warning(message: &str) {
    println!("{}", message.yellow().bold());
}

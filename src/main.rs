mod analysis;
mod builder;
mod cli;
mod config;
mod graph;
mod index;
mod output;
mod parser;
mod walker;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use analysis::dead_code::classify_dead_code;
use analysis::entrypoints::{EntrypointRule, select_entrypoints};
use analysis::integrity;
use analysis::reachability::mark_reachable;
use analysis::simplify::simplify;
use analysis::trace::trace_to_roots;
use builder::{BuildOutcome, build_graph};
use cli::{Cli, Commands};
use config::Config;
use graph::CodeGraph;
use output::{AnalyzeStats, print_summary, to_document};
use walker::walk_project;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            path,
            json,
            output,
            simplified,
        } => run_analyze(&path, json, output, simplified),
        Commands::Trace {
            target,
            path,
            max_depth,
            max_paths,
            json,
        } => run_trace(&path, &target, max_depth, max_paths, json),
        Commands::Dead { path, json, verdict } => run_dead(&path, json, verdict),
    }
}

/// Shared front half of every command: discover, build, verify, mark.
/// Returns the marked graph plus what the summary needs.
struct Analysis {
    graph: CodeGraph,
    files: Vec<PathBuf>,
    roots: Vec<petgraph::stable_graph::NodeIndex>,
    files_parsed: usize,
    files_skipped: usize,
    warnings: usize,
}

fn analyze(root: &Path) -> Result<Analysis> {
    let config = Config::load(root);
    let files = walk_project(root, &config)?;

    let BuildOutcome {
        mut graph,
        warnings,
        files_parsed,
        files_skipped,
    } = build_graph(root, &files, &config)?;

    // Integrity violations signal an extraction bug, not a property of the
    // analyzed code — itemize and abort.
    if let Err(err) = integrity::verify(&graph) {
        for violation in &err.violations {
            eprintln!("integrity: {violation}");
        }
        return Err(err.into());
    }

    let rules = config
        .entrypoints
        .iter()
        .map(EntrypointRule::compile)
        .collect::<Result<Vec<_>>>()
        .context("invalid entrypoint configuration")?;
    let roots = select_entrypoints(&graph, &rules);
    mark_reachable(&mut graph, &roots);

    Ok(Analysis {
        graph,
        files,
        roots,
        files_parsed,
        files_skipped,
        warnings: warnings.len(),
    })
}

fn run_analyze(root: &Path, json: bool, output: Option<PathBuf>, simplified: bool) -> Result<()> {
    let started = Instant::now();
    let analysis = analyze(root)?;

    let view;
    let graph = if simplified {
        view = simplify(&analysis.graph);
        &view
    } else {
        &analysis.graph
    };
    let doc = to_document(graph);

    if let Some(path) = &output {
        let rendered = serde_json::to_string_pretty(&doc)?;
        std::fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        let stats = AnalyzeStats::collect(
            graph,
            analysis.files_parsed,
            analysis.files_skipped,
            analysis.roots.len(),
            analysis.warnings,
            started.elapsed().as_secs_f64(),
        );
        print_summary(&stats, false);
    }
    Ok(())
}

fn run_trace(
    root: &Path,
    target: &str,
    max_depth: usize,
    max_paths: usize,
    json: bool,
) -> Result<()> {
    let analysis = analyze(root)?;
    let paths = trace_to_roots(&analysis.graph, target, &analysis.roots, max_depth, max_paths);

    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    if paths.is_empty() {
        println!("no path from any entrypoint to {target}");
        return Ok(());
    }
    for (i, path) in paths.iter().enumerate() {
        println!("path {}:", i + 1);
        for step in path {
            match (step.edge_kind, step.resolution_case) {
                (Some(kind), Some(case)) => {
                    println!("  -[{} / {}]-> {}", kind.as_str(), case.as_str(), step.node)
                }
                (Some(kind), None) => println!("  -[{}]-> {}", kind.as_str(), step.node),
                _ => println!("  {}", step.node),
            }
        }
    }
    Ok(())
}

fn run_dead(root: &Path, json: bool, verdict_filter: Option<String>) -> Result<()> {
    let analysis = analyze(root)?;

    // Naive substring corroboration over the discovered sources. Library
    // consumers plug in their own search; this is supporting evidence only.
    let sources: Vec<(PathBuf, String)> = analysis
        .files
        .iter()
        .filter_map(|path| {
            let rel = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            std::fs::read_to_string(path).ok().map(|text| (rel, text))
        })
        .collect();
    let search = |name: &str| -> Vec<PathBuf> {
        sources
            .iter()
            .filter(|(_, text)| text.contains(name))
            .map(|(rel, _)| rel.clone())
            .collect()
    };

    let mut verdicts = classify_dead_code(&analysis.graph, search);
    if let Some(filter) = &verdict_filter {
        verdicts.retain(|v| v.verdict.as_str() == filter);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
        return Ok(());
    }
    for verdict in &verdicts {
        println!(
            "{:<12} {} ({}:{}) {}",
            verdict.verdict.as_str(),
            verdict.id,
            verdict.file.display(),
            verdict.line,
            verdict.reason
        );
    }
    Ok(())
}

//! DocAgent — summarize documents and answer questions about them.

use std::path::PathBuf;

use anyhow::Context;
use docagent_core::{AgentConfig, QualityMode};
use docagent_service::{DocumentAgent, SessionSummary};
use docagent_summarize::SummarizeOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn resolve_data_dir() -> PathBuf {
    std::env::var("DOCAGENT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn print_help() {
    println!("DocAgent — hybrid document summarization and question answering");
    println!();
    println!("Usage: docagent <command> [options]");
    println!();
    println!("Commands:");
    println!("  summarize <file> [--mode fast|balanced|high] [--verbose] [--no-chunking] [--json]");
    println!("                           Summarize a text, Markdown or HTML file");
    println!("  ask <file> <question>... [--mode m] [--json]");
    println!("                           Summarize a file, then answer questions about it");
    println!("  help                     Show this help message");
    println!();
    println!("Environment:");
    println!("  DOCAGENT_DATA_DIR        Data directory (models/, docagent.json, llm-config.json)");
    println!("  RUST_LOG                 Log filter (default: info)");
}

/// Options and positional arguments of one command line.
struct Invocation {
    positional: Vec<String>,
    options: SummarizeOptions,
    json: bool,
}

fn parse_args(args: &[String]) -> anyhow::Result<Invocation> {
    let mut positional = Vec::new();
    let mut options = SummarizeOptions::default();
    let mut json = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--mode" => {
                let value = iter.next().context("--mode needs a value")?;
                options.quality_mode = value.parse::<QualityMode>()?;
            }
            "--verbose" | "-v" => options.verbose = true,
            "--no-chunking" => options.use_chunking = false,
            "--json" => json = true,
            flag if flag.starts_with("--") => anyhow::bail!("unknown option: {}", flag),
            _ => positional.push(arg.clone()),
        }
    }
    Ok(Invocation {
        positional,
        options,
        json,
    })
}

fn print_summary(result: &SessionSummary) {
    if let Some(title) = &result.title {
        println!("# {}", title);
        println!();
    }
    println!("{}", result.output.summary);
    println!();
    println!(
        "[{} | {} -> {} chars, ratio {:.3}, {} ms]",
        result.output.strategy.approach,
        result.metrics.original_length,
        result.metrics.summary_length,
        result.metrics.compression_ratio,
        result.metrics.processing_ms
    );
    if let Some(trace) = &result.output.trace {
        println!();
        for line in trace {
            println!("  {}", line);
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    if matches!(command, "help" | "--help" | "-h") {
        print_help();
        return Ok(());
    }
    if !matches!(command, "summarize" | "ask") {
        eprintln!("Unknown command: {}. Use 'docagent help' for usage.", command);
        std::process::exit(1);
    }

    let invocation = parse_args(&args[2..])?;
    let Some(file) = invocation.positional.first().map(PathBuf::from) else {
        eprintln!("Usage: docagent {} <file> ...", command);
        std::process::exit(1);
    };

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());
    let config = AgentConfig::from_env(&data_dir)?;
    let agent = DocumentAgent::initialize(config).context("failed to load models")?;

    let summary = agent
        .summarize_file(&file, &invocation.options)
        .with_context(|| format!("failed to summarize {}", file.display()))?;

    match command {
        "summarize" => {
            if invocation.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        _ => {
            let questions = &invocation.positional[1..];
            if questions.is_empty() {
                eprintln!("Usage: docagent ask <file> <question>...");
                std::process::exit(1);
            }
            let answers = agent.ask_many(&summary.session_id, questions)?;
            if invocation.json {
                println!("{}", serde_json::to_string_pretty(&answers)?);
            } else {
                for qa in &answers {
                    println!("Q: {}", qa.question);
                    match &qa.result.message {
                        Some(message) if qa.result.is_error() => println!("A: (error) {}", message),
                        _ => println!("A: {} ({:.0}%)", qa.result.answer, qa.result.confidence * 100.0),
                    }
                    println!();
                }
            }
        }
    }

    Ok(())
}

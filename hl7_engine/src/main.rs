use hl7_engine::config::compile_time::batch_processing::MAX_WORKER_THREADS;
use hl7_engine::config::runtime::RuntimeConfig;
use hl7_engine::diagnostics::{report, Outcome};
use hl7_engine::loader::GrammarLoader;
use hl7_engine::registry::Grammar;
use hl7_engine::{batch, logging, pipeline};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parsed command line
#[derive(Debug)]
struct CliOptions {
    runtime: RuntimeConfig,
    grammar_root: PathBuf,
    version: String,
    input: Option<PathBuf>,
    batch: batch::BatchConfig,
    explain: Vec<String>,
    report: bool,
    quiet: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("hl7_engine");

    if args.iter().skip(1).any(|a| a == "--help") {
        print_help(program);
        return Ok(());
    }

    let options = match parse_args(&args[1.min(args.len())..]) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("Usage: {} <grammar-root> <version> <message-file|directory> [options]", program);
            eprintln!("       {} --help", program);
            std::process::exit(1);
        }
    };

    let logging_preferences = if options.quiet {
        logging::config::get_quiet_preferences()
    } else {
        options.runtime.logging.clone()
    };
    logging::config::init_runtime_preferences(logging_preferences)?;
    logging::init_global_logging()?;

    let loader = GrammarLoader::new(&options.grammar_root)
        .with_preferences(options.runtime.loader.clone())
        .with_grammar_preferences(options.runtime.grammar.clone());
    let grammar = match loader.load_version(&options.version) {
        Ok(grammar) => grammar,
        Err(error) => {
            eprintln!("Failed to load grammar {}: {}", options.version, error);
            logging::print_cargo_style_summary();
            std::process::exit(1);
        }
    };

    let mut failed = print_grammar_summary(&options.version, &grammar);

    for path in &options.explain {
        match grammar.explain(path) {
            Ok(explanation) => println!("\n{}", explanation),
            Err(error) => {
                eprintln!("\nerror[{}]: {}", error.error_code(), error);
                failed = true;
            }
        }
    }

    match &options.input {
        Some(input) if input.is_file() => {
            failed |= process_single_file(&grammar, input, &options);
        }
        Some(input) if input.is_dir() => {
            failed |= process_directory_batch(grammar, input, &options);
        }
        Some(input) => {
            eprintln!("Error: Input must be a message file or directory");
            eprintln!("  Path: {}", input.display());
            failed = true;
        }
        None => {}
    }

    logging::print_cargo_style_summary();

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn print_help(program_name: &str) {
    println!("HL7 v2 Engine v{}", env!("CARGO_PKG_VERSION"));
    println!("Grammar finalization and message parsing");
    println!();
    println!("USAGE:");
    println!("    {} <grammar-root> <version> <message-file>            # Parse one message", program_name);
    println!("    {} <grammar-root> <version> <directory> [options]     # Parse a directory", program_name);
    println!("    {} <grammar-root> <version> --explain TYPE            # Describe a grammar entity", program_name);
    println!();
    println!("ARGUMENTS:");
    println!("    <grammar-root>   Directory with one subdirectory of JSON definitions per version");
    println!("    <version>        Version subdirectory to load, e.g. 2.3");
    println!("    <message-file>   File holding one message, segments separated by CR");
    println!("    <directory>      Directory of message files");
    println!();
    println!("OPTIONS:");
    println!("    --help              Show this help message");
    println!("    --config FILE       Load preferences from a TOML file");
    println!("    --sequential        Parse on the calling thread only");
    println!("    --threads N         Maximum worker threads (default: auto, max {})", MAX_WORKER_THREADS);
    println!("    --no-recursive      Don't search subdirectories");
    println!("    --max-files N       Limit maximum files to parse");
    println!("    --fail-fast         Stop at the first malformed or unreadable message");
    println!("    --explain TYPE      Explain an entity or constituent path, e.g. MSH.9");
    println!("    --report            Print a drill-down diagnostic report per message");
    println!("    --quiet             Only report problems");
    println!();
    println!("LIMITS:");
    println!("    {}", hl7_engine::config::build_info::source_info());
    println!();
    println!("EXIT STATUS:");
    println!("    1 when the grammar has errors or any message is malformed");
}

fn parse_args(args: &[String]) -> Result<CliOptions, String> {
    let runtime = match args.iter().position(|a| a == "--config") {
        Some(i) => RuntimeConfig::load(Path::new(option_value(args, i, "--config")?))?,
        None => RuntimeConfig::default(),
    };

    let mut positional = Vec::new();
    let mut batch_config = batch::BatchConfig {
        progress_reporting: true,
        parser: runtime.parser.clone(),
        file_processor: runtime.file_processor.clone(),
        ..batch::BatchConfig::from_preferences(&runtime.batch)
    };
    let mut explain = Vec::new();
    let mut report = false;
    let mut quiet = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
            }
            "--sequential" => {
                batch_config.max_threads = 1;
            }
            "--threads" => {
                let threads = option_value(args, i, "--threads")?
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid thread count '{}'", args[i + 1]))?;
                batch_config.max_threads = threads.clamp(1, MAX_WORKER_THREADS);
                i += 1;
            }
            "--no-recursive" => {
                batch_config.recursive = false;
            }
            "--max-files" => {
                let max_files = option_value(args, i, "--max-files")?
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid max files '{}'", args[i + 1]))?;
                batch_config.max_files = Some(max_files);
                i += 1;
            }
            "--fail-fast" => {
                batch_config.fail_fast = true;
            }
            "--explain" => {
                explain.push(option_value(args, i, "--explain")?.to_string());
                i += 1;
            }
            "--report" => {
                report = true;
            }
            "--quiet" => {
                quiet = true;
                batch_config.progress_reporting = false;
            }
            other if other.starts_with("--") => {
                eprintln!("Warning: Unknown option '{}'", other);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let grammar_root = positional
        .next()
        .map(PathBuf::from)
        .ok_or("Missing <grammar-root>")?;
    let version = positional.next().ok_or("Missing <version>")?;
    let input = positional.next().map(PathBuf::from);
    if input.is_none() && explain.is_empty() {
        return Err("Missing <message-file|directory>".to_string());
    }
    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument '{}'", extra));
    }

    Ok(CliOptions {
        runtime,
        grammar_root,
        version,
        input,
        batch: batch_config,
        explain,
        report,
        quiet,
    })
}

fn option_value<'a>(args: &'a [String], i: usize, option: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", option))
}

/// Print grammar statistics and errors. Returns true when the grammar has errors.
fn print_grammar_summary(version: &str, grammar: &Grammar) -> bool {
    println!("Grammar {}: {}", version, grammar.stats());

    if !grammar.has_errors() {
        return false;
    }

    eprintln!("\nGrammar errors ({}):", grammar.errors().len() + grammar.suppressed_error_count());
    for error in grammar.errors() {
        eprintln!("  error[{}]: {}", error.error_code(), error);
    }
    if grammar.suppressed_error_count() > 0 {
        eprintln!("  ... {} more not shown", grammar.suppressed_error_count());
    }
    true
}

fn print_outcome(path: &Path, result: &pipeline::PipelineResult, options: &CliOptions) {
    let malformed = result.outcome() == Outcome::Malformed;
    if options.quiet && !malformed && !options.report {
        return;
    }

    println!(
        "{}: {} {} ({})",
        path.display(),
        result.message_type().unwrap_or("unknown"),
        result.outcome(),
        result.stats
    );
    if malformed && !options.report {
        for error in result.message.status.fatal() {
            println!("  error[{}]: {}", error.code, error.message);
        }
    }
    if options.report {
        print!("{}", report::render(&result.message));
    }
}

/// Returns true when the message could not be parsed or parsed malformed
fn process_single_file(grammar: &Grammar, path: &Path, options: &CliOptions) -> bool {
    match pipeline::parse_message_file_with_preferences(
        grammar,
        path,
        &options.batch.parser,
        &options.batch.file_processor,
    ) {
        Ok(result) => {
            print_outcome(path, &result, options);
            !result.is_well_formed()
        }
        Err(error) => {
            eprintln!("{}: FAILED: {}", path.display(), error);
            true
        }
    }
}

/// Returns true when any message failed or parsed malformed
fn process_directory_batch(grammar: Grammar, dir_path: &Path, options: &CliOptions) -> bool {
    let config = &options.batch;
    if !options.quiet {
        println!("\nStarting batch parsing: {}", dir_path.display());
        println!(
            "Configuration: {} threads, recursive={}, fail_fast={}",
            config.max_threads, config.recursive, config.fail_fast
        );
        if let Some(max_files) = config.max_files {
            println!("File limit: {} files maximum", max_files);
        }
    }

    match batch::process_directory_with_config(Arc::new(grammar), dir_path, config) {
        Ok(results) => {
            for (path, result) in &results.successful_files {
                print_outcome(path, result, options);
            }
            print_batch_results(&results);
            !results.all_well_formed()
        }
        Err(error) => {
            eprintln!("Batch parsing failed: {}", error);
            true
        }
    }
}

fn print_batch_results(results: &batch::BatchResults) {
    println!("\nBatch Parsing Summary:");
    println!("  Files discovered: {}", results.files_discovered);
    println!("  Files processed: {}", results.files_processed);
    println!(
        "  Well-formed: {} ({:.1}%)",
        results.well_formed_count(),
        results.well_formed_rate() * 100.0
    );
    println!("  Malformed: {}", results.malformed_count());
    println!("  Failed: {}", results.failure_count());
    println!(
        "  Total time: {:.2}s",
        results.processing_duration.as_secs_f64()
    );

    if results.failure_count() > 0 {
        println!("\nFailed Files:");
        for (file_path, error) in &results.failed_files {
            println!("  {}: {}", file_path.display(), error);
        }
    }
}

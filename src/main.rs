// src/main.rs

use chrono::TimeZone;
use clap::Parser;
use ku_detect::classifier::{load_classifiers_from_dir, load_transformer, LoadedClassifiers};
use ku_detect::cli::{Args, Command, Format};
use ku_detect::export::{CsvSink, JsonLinesSink, ResultSink};
use ku_detect::history::{collect_contributions, HistoryOptions};
use ku_detect::sources::{batch_from_contributions, read_source_dir};
use ku_detect::{Config, Error, ExecutionReport, Executor, FileBatch, JavaNormalizer, Normalizer};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let start_time = Instant::now();

    let code = match run(&args) {
        Ok(report) if report.is_complete() => ExitCode::SUCCESS,
        Ok(report) => {
            for (classifier, reason) in &report.failures {
                eprintln!("  {classifier} failed: {reason}");
            }
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    };

    eprintln!("Total time: {:.2?}", start_time.elapsed());
    code
}

fn run(args: &Args) -> Result<ExecutionReport, Error> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.window.validate()?;

    let normalizer: Arc<dyn Normalizer> = Arc::new(JavaNormalizer);
    let loaded = match &config.transformer {
        Some(transformer) => LoadedClassifiers {
            classifiers: vec![load_transformer(
                &transformer.dir,
                transformer.concepts,
                transformer.max_tokens,
                Arc::clone(&normalizer),
            )?],
            ..LoadedClassifiers::default()
        },
        None => load_classifiers_from_dir(
            &config.models_dir,
            &config.models_to_load,
            Arc::clone(&normalizer),
        )?,
    };
    if loaded.classifiers.is_empty() {
        return Err(Error::NoClassifiers(config.models_dir.clone()));
    }

    let mut files = load_files(args, &config, normalizer.as_ref())?;
    eprintln!(
        "Scanning {} files with {} classifiers ({} skipped).",
        files.len(),
        loaded.classifiers.len(),
        loaded.skipped.len()
    );

    let executor = Executor::new(config.threads)?.with_progress(args.progress);
    let mut report = executor.execute(&mut files, &loaded.classifiers, &config.window)?;
    report.failures.extend(loaded.skipped);
    eprintln!(
        "Scan finished in {:.2?} on {} threads.",
        report.elapsed,
        executor.threads()
    );

    let concepts: Vec<String> = loaded
        .classifiers
        .iter()
        .flat_map(|c| c.concept_names())
        .collect();
    write_results(args, &files, concepts)?;

    Ok(report)
}

fn load_files(
    args: &Args,
    config: &Config,
    normalizer: &dyn Normalizer,
) -> Result<FileBatch, Error> {
    match &args.command {
        Command::Scan { dir } => read_source_dir(dir, &config.file_extension, normalizer),
        Command::History {
            repo,
            limit,
            skip,
            exclude,
        } => {
            let opts = HistoryOptions {
                extension: config.file_extension.clone(),
                limit: *limit,
                skip: *skip,
                exclude: exclude.iter().cloned().collect(),
                show_progress: args.progress,
            };
            let contributions = collect_contributions(repo, &opts)?;

            let first = contributions.iter().map(|c| c.timestamp).min();
            let last = contributions.iter().map(|c| c.timestamp).max();
            if let (Some(first), Some(last)) = (first, last) {
                if let (Some(from), Some(to)) = (
                    chrono::Utc.timestamp_opt(first, 0).single(),
                    chrono::Utc.timestamp_opt(last, 0).single(),
                ) {
                    eprintln!(
                        "Contributions span from {} to {}.",
                        from.to_rfc2822(),
                        to.to_rfc2822()
                    );
                }
            }

            Ok(batch_from_contributions(&contributions, normalizer))
        }
    }
}

fn write_results(args: &Args, files: &FileBatch, concepts: Vec<String>) -> Result<(), Error> {
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    let mut sink: Box<dyn ResultSink> = match args.format {
        Format::Json => Box::new(JsonLinesSink::new(writer)),
        Format::Csv => Box::new(CsvSink::new(writer, concepts)),
    };

    for (id, record) in files {
        sink.write_record(id, record)?;
    }
    sink.finish()
}

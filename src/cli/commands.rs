//! Command implementations for the NetCDF extractor CLI
//!
//! Bridges the synchronous library engines onto the async CLI: each long
//! operation runs on a blocking worker thread, reports progress through an
//! indicatif bar and observes the shared cancellation token.

use crate::catalog::{self, Catalog};
use crate::cli::args::{Args, Commands, ExtractArgs, RenderArgs, ScanArgs, ScanFormat};
use crate::extract::{BatchTextExtractor, ExtractionReport};
use crate::params::ExtractionParametersBuilder;
use crate::progress::{CancellationToken, Completion, NullSink, ProgressSink};
use crate::render::RasterRenderer;
use crate::{Error, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::task;
use tracing::{debug, info};

/// Main command dispatcher
pub async fn run(args: Args, cancel: CancellationToken) -> Result<()> {
    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    match args.command.clone() {
        Some(Commands::Scan(scan_args)) => run_scan(&args, scan_args, cancel).await,
        Some(Commands::Extract(extract_args)) => run_extract(&args, extract_args, cancel).await,
        Some(Commands::Render(render_args)) => run_render(&args, render_args, cancel).await,
        None => Ok(()),
    }
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ncextract={}", args.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// Progress sink backed by an indicatif bar
struct BarSink {
    bar: ProgressBar,
}

impl ProgressSink for BarSink {
    fn set_title(&self, title: &str) {
        self.bar.set_prefix(title.to_string());
    }

    fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn set_progress(&self, completed: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(completed);
    }
}

fn make_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {prefix} {msg}",
            )
            .unwrap()
            .progress_chars("#>-"),
    );
    bar
}

/// Run an engine closure on a blocking worker with a progress bar attached.
async fn run_engine<T, F>(quiet: bool, work: F) -> Result<Completion<T>>
where
    T: Send + 'static,
    F: FnOnce(&dyn ProgressSink) -> Result<Completion<T>> + Send + 'static,
{
    let bar = if quiet { None } else { Some(make_progress_bar()) };
    let worker_bar = bar.clone();
    let outcome = task::spawn_blocking(move || match worker_bar {
        Some(bar) => work(&BarSink { bar }),
        None => work(&NullSink),
    })
    .await
    .map_err(|join_error| Error::worker(join_error.to_string()))?;

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    outcome
}

async fn run_scan(args: &Args, scan_args: ScanArgs, cancel: CancellationToken) -> Result<()> {
    info!("Scanning {}", scan_args.source.display());
    let directory = scan_args.source.clone();
    let completion = run_engine(args.quiet, move |sink| {
        catalog::scan(&directory, sink, &cancel)
    })
    .await?;

    match completion {
        Completion::Cancelled => {
            println!("{}", "Scan cancelled".bright_yellow());
            Ok(())
        }
        Completion::Done(catalog) => {
            match scan_args.format {
                ScanFormat::Json => println!("{}", serde_json::to_string_pretty(&catalog)?),
                ScanFormat::Table => print_catalog(&catalog),
            }
            Ok(())
        }
    }
}

fn print_catalog(catalog: &Catalog) {
    for entry in &catalog.entries {
        println!("\n{}", entry.path.display().to_string().bright_cyan());
        if entry.variables.is_empty() {
            println!("  (no gridded variables)");
        }
        for variable in &entry.variables {
            let data_type = variable
                .data_type
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "unsupported".to_string());
            if variable.description.is_empty() {
                println!("  {}  rank {}  {}", variable.name, variable.rank, data_type);
            } else {
                println!(
                    "  {}  rank {}  {}  {}",
                    variable.name, variable.rank, data_type, variable.description
                );
            }
        }
    }
    for failure in &catalog.failures {
        println!(
            "\n{} {}: {}",
            "Unreadable".bright_red(),
            failure.path.display(),
            failure.reason
        );
    }
    println!(
        "\n{} {} file(s), {} unreadable",
        "Scanned".bright_green().bold(),
        catalog.entries.len(),
        catalog.failures.len()
    );
}

async fn run_extract(
    args: &Args,
    extract_args: ExtractArgs,
    cancel: CancellationToken,
) -> Result<()> {
    let start_time = Instant::now();

    let mut builder = ExtractionParametersBuilder::new();
    for source in &extract_args.sources {
        builder.add_file(source);
        for variable in &extract_args.variables.0 {
            builder.add_variable(source, variable);
        }
    }
    let missing_value = if extract_args.missing_value.is_empty() {
        None
    } else {
        Some(extract_args.missing_value.clone())
    };
    builder
        .destination_dir(extract_args.destination.clone())
        .separator(extract_args.separator.clone())
        .missing_value(missing_value)
        .single_document(extract_args.single_document)
        .include_header(!extract_args.no_header)
        .reclaim_memory(!extract_args.keep_buffers)
        .period_size(extract_args.period_size)
        .period_unit(extract_args.period_unit)
        .start_date(extract_args.start_date)
        .time_format(extract_args.time_format.clone())
        .time_variable(extract_args.time_variable.clone());
    let params = builder.build()?;

    info!("Extracting {} file(s)", params.file_count());
    let completion = run_engine(args.quiet, move |sink| {
        BatchTextExtractor::new(params).run(sink, &cancel)
    })
    .await?;

    match completion {
        Completion::Cancelled => {
            println!("{}", "Extraction cancelled".bright_yellow());
            Ok(())
        }
        Completion::Done(report) => {
            print_extraction_summary(&report, start_time);
            Ok(())
        }
    }
}

fn print_extraction_summary(report: &ExtractionReport, start_time: Instant) {
    println!("\n{}", "Extraction Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Files exported:".bright_cyan(),
        report.files_exported
    );
    println!(
        "  {} {}",
        "Files skipped:".bright_cyan(),
        report.files_skipped
    );
    println!("  {} {}", "Rows written:".bright_cyan(), report.rows_written);
    println!(
        "  {} {:.2}s",
        "Elapsed:".bright_cyan(),
        start_time.elapsed().as_secs_f64()
    );
    for output in &report.outputs {
        println!("  {} {}", "Wrote".bright_cyan(), output.display());
    }
    for failure in &report.failures {
        println!(
            "  {} {}: {}",
            "Failed".bright_red(),
            failure.path.display(),
            failure.reason
        );
    }
}

async fn run_render(
    args: &Args,
    render_args: RenderArgs,
    cancel: CancellationToken,
) -> Result<()> {
    if let Some(dir) = &render_args.output_dir
        && !dir.is_dir()
    {
        return Err(Error::DestinationNotADirectory { path: dir.clone() });
    }

    let mut rendered = 0usize;
    let mut failures: Vec<(String, Error)> = Vec::new();
    for variable in &render_args.variables.0 {
        if cancel.is_cancelled() {
            println!("{}", "Rendering cancelled".bright_yellow());
            break;
        }

        let source = render_args.source.clone();
        let name = variable.clone();
        let renderer = RasterRenderer {
            upscale: render_args.upscale,
            invert_latitude: !render_args.no_invert_lat,
        };
        let token = cancel.clone();
        let completion = run_engine(args.quiet, move |sink| {
            renderer.render(&source, &name, None, sink, &token)
        })
        .await;

        match completion {
            Ok(Completion::Cancelled) => {
                println!("{}", "Rendering cancelled".bright_yellow());
                break;
            }
            Ok(Completion::Done(image)) => {
                let target = image_destination(
                    &render_args.source,
                    variable,
                    render_args.output_dir.as_deref(),
                );
                image.save(&target)?;
                println!("  {} {}", "Wrote".bright_cyan(), target.display());
                rendered += 1;
            }
            // One bad variable never aborts the rest of the batch.
            Err(error) => failures.push((variable.clone(), error)),
        }
    }

    println!(
        "\n{} {} image(s), {} failed",
        "Rendered".bright_green().bold(),
        rendered,
        failures.len()
    );
    for (variable, error) in &failures {
        println!("  {} {}: {}", "Failed".bright_red(), variable, error);
    }
    Ok(())
}

/// PNG path for one rendered variable: `<stem>_<variable>.png`.
fn image_destination(source: &Path, variable: &str, output_dir: Option<&Path>) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = format!("{stem}_{variable}.png");
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| source.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::destination_for;

    #[test]
    fn test_image_destination_naming() {
        let path = image_destination(Path::new("/data/sst_2020.nc"), "sst", None);
        assert_eq!(path, Path::new("/data/sst_2020_sst.png"));

        let path = image_destination(Path::new("/data/sst_2020.nc"), "sst", Some(Path::new("/out")));
        assert_eq!(path, Path::new("/out/sst_2020_sst.png"));
    }

    #[test]
    fn test_text_destination_naming() {
        let path = destination_for(Path::new("/data/grid.nc"), None);
        assert_eq!(path, Path::new("/data/grid.txt"));

        let path = destination_for(Path::new("/data/grid.cdf"), Some(Path::new("/out")));
        assert_eq!(path, Path::new("/out/grid.txt"));
    }
}

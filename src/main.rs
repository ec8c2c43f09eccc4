use clap::Parser;
use ncextract::cli::{args::Args, commands};
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    // Create async runtime and run the main command logic with signal handling
    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        // Cancellation token shared by every long-running engine
        let cancellation_token = CancellationToken::new();

        // First Ctrl+C cancels cooperatively; the engines finish their
        // current step, flush whole rows and return a cancelled outcome.
        let signal_token = cancellation_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nReceived CTRL+C, finishing the current step...");
                signal_token.cancel();
            }
        });

        commands::run(args, cancellation_token).await
    });

    match result {
        Ok(()) => {
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("ncextract - NetCDF Batch Extraction Tool");
    println!("========================================");
    println!();
    println!("Decode gridded NetCDF variables and stream them as delimited text,");
    println!("or render them as false-color raster images.");
    println!();
    println!("USAGE:");
    println!("    ncextract <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    scan        List the extractable variables of every file in a directory");
    println!("    extract     Extract gridded variables to delimited text (main command)");
    println!("    render      Render gridded variables as false-color PNG images");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # List what a directory of datasets contains:");
    println!("    ncextract scan /data/sst --format table");
    println!();
    println!("    # Extract two variables from a batch of files:");
    println!("    ncextract extract /data/sst/*.nc --variables sst,anom \\");
    println!("                      --destination ./out --period-unit day");
    println!();
    println!("    # Concatenate a year of files into one document:");
    println!("    ncextract extract /data/sst/2020_*.nc -x sst --single-document");
    println!();
    println!("    # Render a quick-look image:");
    println!("    ncextract render /data/sst/2020_01.nc -x sst --upscale 4");
    println!();
    println!("For detailed help on any command, use:");
    println!("    ncextract <COMMAND> --help");
}

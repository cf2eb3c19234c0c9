use cdn_image_downloader::{config, logging, output, process};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cdn-image-downloader")]
#[command(about = "Download CDN images referenced in markdown posts and link them locally")]
#[command(long_about = "\
Download CDN images referenced in markdown posts and link them locally

Scans the posts directory for markdown files, downloads every image whose
URL points at an allow-listed host into <root>/image/, and rewrites the
image references to the local copies:

  ![x](https://cdn.nlark.com/a/b/pic.png \"t\")  →  ![x](image/pic-<digest>.png \"t\")
  <img src=\"https://cdn.nlark.com/a/b/pic\">      →  <img src=\"image/pic-<digest>.png\">

<digest> is the first 10 hex characters of the URL's SHA-256; the
extension comes from the URL or, failing that, the Content-Type.

Plain links, bare URLs, and fenced code blocks are never touched. Images
already present in the image directory are not downloaded again.

Hosts and the posts directory come from the config file. Run
'cdn-image-downloader gen-config' to print a documented one.")]
#[command(version)]
struct Cli {
    /// Config file (defaults are used if it does not exist)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// List updated files and log cache hits and other per-reference decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Download images and rewrite references (the default)
    Run,
    /// List image references without downloading or writing anything
    Check,
    /// Print a config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let config = config::load_config(&cli.config)?;
            let summary = process::run(&config)?;
            output::print_run_output(&summary, &config.root_dir, cli.verbose);
        }
        Command::Check => {
            let config = config::load_config(&cli.config)?;
            let reports = process::check(&config)?;
            output::print_check_output(&reports, &config.root_dir);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

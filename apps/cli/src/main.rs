use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use kinoscope_core::{
    ApiClient, ArtifactDownloader, ArtifactFormat, ArtifactKind, CandidateFile, ClientConfig,
    DownloadRequest, ErrorFeed, Operation, RequestOptions, UploadOptions, UploadSession,
    first_candidate, format_record_readable,
};
use tracing_subscriber::EnvFilter;

use crate::cache::{get_record_path, get_root_cache_dir, load_record, save_record};

mod cache;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// Parses `KIND:FORMAT`, e.g. `analysis:pdf` or `transcript:txt`.
fn parse_fetch(value: &str) -> Result<DownloadRequest, String> {
    let (kind, format) = value
        .split_once(':')
        .ok_or_else(|| format!("expected KIND:FORMAT, got `{}`", value))?;
    let kind: ArtifactKind = kind.parse().map_err(|e| format!("{}", e))?;
    let format: ArtifactFormat = format.parse().map_err(|e| format!("{}", e))?;
    Ok(DownloadRequest::Artifact { kind, format })
}

#[derive(Parser)]
#[command(name = "kinoscope")]
#[command(
    about = "Upload videos for remote analysis and download transcripts, summaries and highlight reels"
)]
struct Cli {
    /// Analysis server base URL (overrides KINOSCOPE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Do not send cookies with requests
    #[arg(long, global = true)]
    omit_credentials: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a video and print its analysis
    Analyze {
        /// Video file. When several are given only the first is uploaded.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Skip transcription
        #[arg(long)]
        no_transcription: bool,

        /// Skip the summary
        #[arg(long)]
        no_summary: bool,

        /// Also render a highlight reel
        #[arg(long)]
        highlight: bool,

        /// Download an artifact once the analysis is ready (KIND:FORMAT, repeatable)
        #[arg(long = "fetch", value_name = "KIND:FORMAT", value_parser = parse_fetch)]
        fetch: Vec<DownloadRequest>,

        /// Download the highlight reel once the analysis is ready
        #[arg(long)]
        fetch_highlights: bool,

        /// Directory for downloaded files
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Download an analysis or transcript document
    Download {
        /// Filename reported by the server for the analyzed video
        filename: String,

        /// analysis or transcript
        kind: ArtifactKind,

        /// txt, docx or pdf
        format: ArtifactFormat,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Download the highlight reel of an analyzed video
    Highlights {
        filename: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the most recent analysis again
    Show,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_error(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}

struct App {
    session: UploadSession,
    downloader: ArtifactDownloader,
    feed: ErrorFeed,
    request: RequestOptions,
    download_dir: PathBuf,
    record_path: PathBuf,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = ClientConfig::from_env()?;
        if let Some(api_url) = &cli.api_url {
            config = config.with_base_url(api_url)?;
        }
        let client = ApiClient::new(&config)?;
        let request = if cli.omit_credentials {
            RequestOptions::omit_credentials()
        } else {
            client.default_request()
        };
        tracing::debug!(base_url = %client.base_url(), ?request, "client configured");

        Ok(Self {
            session: UploadSession::new(client.clone()),
            downloader: ArtifactDownloader::new(client),
            feed: ErrorFeed::new(),
            request,
            download_dir: config.download_dir,
            record_path: get_record_path(&get_root_cache_dir()),
        })
    }

    fn out_dir(&self, out: Option<PathBuf>) -> PathBuf {
        out.unwrap_or_else(|| self.download_dir.clone())
    }

    /// Prints the feed's current error; `false` when one was shown.
    fn report_current(&self) -> bool {
        match self.feed.current() {
            Some(event) => {
                print_error(&event.message);
                false
            }
            None => true,
        }
    }

    async fn analyze(
        &self,
        files: Vec<PathBuf>,
        options: UploadOptions,
        mut wanted: Vec<DownloadRequest>,
        out: PathBuf,
    ) -> Result<bool> {
        let total = files.len();
        let Some(path) = first_candidate(files) else {
            return Ok(true);
        };
        if total > 1 {
            println!(
                "{} Only the first file is uploaded {}",
                style("!").yellow().bold(),
                style(format!("({} ignored)", total - 1)).dim()
            );
        }

        let file = match CandidateFile::from_path(&path).await {
            Ok(file) => file,
            Err(err) => {
                self.feed.report(Operation::Upload, &err);
                return Ok(self.report_current());
            }
        };

        let step_start = Instant::now();
        let spinner = create_spinner(&format!("Uploading and analyzing {}...", file.name));
        let record = match self.session.submit_with(&file, options, self.request).await {
            Ok(record) => {
                spinner.finish_and_clear();
                record
            }
            Err(err) => {
                spinner.finish_and_clear();
                self.feed.report(Operation::Upload, &err);
                return Ok(self.report_current());
            }
        };
        self.feed.dismiss();
        println!(
            "{} Analyzed {}",
            style("✓").green().bold(),
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        );

        if let Err(err) = save_record(&record, &self.record_path).await {
            tracing::warn!(error = %err, "could not cache analysis");
        }

        println!("{}", style("─".repeat(60)).dim());
        println!("{}", format_record_readable(&record));

        let available = record.available_downloads();
        wanted.retain(|request| {
            let offered = available.contains(request);
            if !offered {
                println!(
                    "{} {} is not available for this video",
                    style("!").yellow().bold(),
                    request
                );
            }
            offered
        });

        let mut ok = true;
        for request in wanted {
            ok &= self.fetch(record.filename(), request, &out).await;
        }
        Ok(ok)
    }

    async fn fetch(&self, filename: &str, request: DownloadRequest, out: &Path) -> bool {
        let spinner = create_spinner(&format!("Downloading {}...", request));
        match self
            .downloader
            .download(filename, request, self.request, out)
            .await
        {
            Ok(saved) => {
                spinner.finish_and_clear();
                self.feed.dismiss();
                println!(
                    "{} Saved {} {}",
                    style("✓").green().bold(),
                    saved.path.display(),
                    style(format!("({} bytes)", saved.size)).dim()
                );
                true
            }
            Err(err) => {
                spinner.finish_and_clear();
                self.feed.report(Operation::from(request), &err);
                self.report_current()
            }
        }
    }

    async fn show(&self) -> Result<bool> {
        let Some(record) = load_record(&self.record_path).await? else {
            println!("No analysis yet. Run `kinoscope analyze <FILE>` first.");
            return Ok(true);
        };

        println!("{}", format_record_readable(&record));
        let downloads = record.available_downloads();
        if !downloads.is_empty() {
            println!("{}", style("Downloads").cyan().bold());
            for request in downloads {
                let command = match request {
                    DownloadRequest::Artifact { kind, format } => format!(
                        "kinoscope download {} {} {}",
                        record.filename(),
                        kind,
                        format
                    ),
                    DownloadRequest::Highlight => {
                        format!("kinoscope highlights {}", record.filename())
                    }
                };
                println!("  {}", style(command).dim());
            }
        }
        Ok(true)
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let app = App::new(&cli)?;

    match cli.command {
        Command::Analyze {
            files,
            no_transcription,
            no_summary,
            highlight,
            mut fetch,
            fetch_highlights,
            out,
        } => {
            if fetch_highlights {
                fetch.push(DownloadRequest::Highlight);
            }
            let options = UploadOptions {
                transcription: !no_transcription,
                summary: !no_summary,
                highlight,
            };
            let out = app.out_dir(out);
            app.analyze(files, options, fetch, out).await
        }
        Command::Download {
            filename,
            kind,
            format,
            out,
        } => {
            let out = app.out_dir(out);
            Ok(app
                .fetch(&filename, DownloadRequest::Artifact { kind, format }, &out)
                .await)
        }
        Command::Highlights { filename, out } => {
            let out = app.out_dir(out);
            Ok(app.fetch(&filename, DownloadRequest::Highlight, &out).await)
        }
        Command::Show => app.show().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await.context("kinoscope failed") {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(err) => {
            print_error(&format!("{:#}", err));
            std::process::exit(1);
        }
    }
}

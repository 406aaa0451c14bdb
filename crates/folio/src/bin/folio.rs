// ABOUTME: CLI binary for Folio: downloads novels from their listing URLs into text files.
// ABOUTME: Also inspects saved HTML pages offline to show what the extractors would find.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use folio::{extract_content, read_listing, Page, Patterns, Spider, SpiderBuilder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Download web novels from their table-of-contents page")]
struct Args {
    /// Directory that receives `<novel name>.txt`
    #[arg(short = 'o', long = "output-dir", default_value = "novels")]
    output_dir: PathBuf,

    /// Pause between chapter requests, in milliseconds
    #[arg(long = "delay-ms", default_value_t = 500)]
    delay_ms: u64,

    /// Listing page timeout, in seconds
    #[arg(long = "timeout-secs", default_value_t = 30)]
    timeout_secs: u64,

    /// Per-chapter timeout, in seconds
    #[arg(long = "chapter-timeout-secs", default_value_t = 20)]
    chapter_timeout_secs: u64,

    /// Override the User-Agent header
    #[arg(long = "user-agent")]
    user_agent: Option<String>,

    /// JSON file whose keys replace the built-in extraction patterns
    #[arg(long = "patterns")]
    patterns: Option<PathBuf>,

    /// Allow fetching from private/local networks
    #[arg(long = "allow-private-networks")]
    allow_private_networks: bool,

    /// Saved HTML page to inspect (requires --url)
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// URL the saved page was fetched from (required with --html)
    #[arg(long = "url")]
    url: Option<String>,

    /// Print inspection results as JSON
    #[arg(long = "json")]
    json_output: bool,

    /// With --html, treat the page as a chapter and print its body text
    #[arg(long = "chapter")]
    chapter: bool,

    /// Print elapsed time in ms to stderr
    #[arg(long = "timing")]
    timing: bool,

    /// Listing URLs of the novels to download
    #[arg()]
    urls: Vec<String>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,folio=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_patterns(path: Option<&Path>) -> Result<Patterns, String> {
    match path {
        Some(p) => Patterns::from_path(p).map_err(|e| e.to_string()),
        None => Ok(Patterns::builtin()),
    }
}

/// Runs the extractors over a saved page and renders the result for stdout.
fn inspect(page: &Page, url: &str, patterns: &Patterns, args: &Args) -> Result<String, String> {
    if args.chapter {
        let text = extract_content(page, patterns)
            .ok_or_else(|| format!("no chapter content found in {}", url))?;
        if args.json_output {
            let value = serde_json::json!({ "url": url, "content": text.as_str() });
            return serde_json::to_string_pretty(&value).map_err(|e| e.to_string());
        }
        return Ok(text.into_string());
    }

    let novel = read_listing(page, url, patterns).map_err(|e| e.to_string())?;
    if args.json_output {
        return serde_json::to_string_pretty(&novel).map_err(|e| e.to_string());
    }

    let mut out = format!("{}\n{} chapters\n", novel.name, novel.chapters.len());
    for chapter in &novel.chapters {
        out.push_str(&format!("{}\t{}\n", chapter.title, chapter.url));
    }
    Ok(out.trim_end().to_string())
}

fn build_spider(args: &Args, patterns: Patterns) -> Result<Spider<folio::HttpRenderer>, String> {
    let mut builder = SpiderBuilder::new()
        .output_dir(&args.output_dir)
        .request_delay(Duration::from_millis(args.delay_ms))
        .listing_timeout(Duration::from_secs(args.timeout_secs))
        .chapter_timeout(Duration::from_secs(args.chapter_timeout_secs))
        .allow_private_networks(args.allow_private_networks)
        .patterns(patterns);
    if let Some(ua) = &args.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    builder.build().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Validate args
    if args.url.is_some() && args.html.is_none() {
        eprintln!("error: --url is only valid together with --html");
        return ExitCode::from(1);
    }

    if args.html.is_some() && args.url.is_none() {
        eprintln!("error: --url is required when using --html");
        return ExitCode::from(1);
    }

    if args.html.is_none() && args.urls.is_empty() {
        eprintln!("error: at least one URL is required, or use --html with --url");
        return ExitCode::from(1);
    }

    if args.html.is_some() && !args.urls.is_empty() {
        eprintln!("error: cannot use both --html and positional URLs");
        return ExitCode::from(1);
    }

    init_tracing();

    let patterns = match load_patterns(args.patterns.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error loading patterns: {}", e);
            return ExitCode::from(1);
        }
    };

    let start = Instant::now();
    let mut had_error = false;

    if let (Some(html_path), Some(url)) = (&args.html, &args.url) {
        // Offline inspect mode
        match fs::read_to_string(html_path) {
            Ok(html) => {
                let page = Page::parse(&html, url.as_str());
                match inspect(&page, url, &patterns, &args) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("error inspecting {:?}: {}", html_path, e);
                        had_error = true;
                    }
                }
            }
            Err(e) => {
                eprintln!("error reading file {:?}: {}", html_path, e);
                had_error = true;
            }
        }
    } else {
        // Download mode
        let spider = match build_spider(&args, patterns) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }
        };

        for url in &args.urls {
            match spider.run(url).await {
                Ok(report) => {
                    let path = report
                        .path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    println!(
                        "{}: {} chapters ({} failed) -> {}",
                        url, report.chapters_total, report.chapters_failed, path
                    );
                }
                Err(e) => {
                    eprintln!("error downloading {}: {}", url, e);
                    had_error = true;
                }
            }
        }
    }

    if args.timing {
        let _ = writeln!(io::stderr(), "elapsed: {}ms", start.elapsed().as_millis());
    }

    if had_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

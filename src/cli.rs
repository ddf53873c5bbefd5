use clap::{Parser, Subcommand};

/// site-auditor cli
#[derive(Parser)]
#[command(name = "site-auditor")]
#[command(about = "Crawl a website and produce a scored SEO audit report")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full SEO audit against a site
    Audit {
        /// seed url
        #[arg(short, long, help = "The URL to audit; scheme defaults to https")]
        url: String,

        /// page budget
        #[arg(
            short,
            long,
            help = "Maximum number of pages to crawl (default: crawl everything up to 9999)"
        )]
        max_pages: Option<usize>,

        /// honor robots.txt rules
        #[arg(
            long,
            help = "Skip URLs disallowed by robots.txt and honor Crawl-delay (off by default for complete audits)"
        )]
        respect_robots: bool,

        /// global deadline in seconds
        #[arg(long, help = "Cancel outstanding fetches after this many seconds")]
        deadline_secs: Option<u64>,

        /// report output file
        #[arg(
            short,
            long,
            default_value = "audit-report.json",
            help = "Path for the JSON report"
        )]
        output: String,

        /// also write a per-issue csv
        #[arg(long, help = "Write a flat CSV of all issues next to the JSON report")]
        csv: Option<String>,

        /// log dir
        #[arg(long, default_value = "./logs", help = "Directory for log files")]
        log_dir: String,
    },
}

impl Cli {
    /// parse args
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

use std::time::Duration;

use site_auditor::audit::{audit, AuditOptions};
use site_auditor::cli::{Cli, Commands};
use site_auditor::{export, logging, url_utils};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Audit {
            url,
            max_pages,
            respect_robots,
            deadline_secs,
            output,
            csv,
            log_dir,
        } => {
            logging::init_logging(&log_dir)?;

            let seed = url_utils::normalize_url_for_cli(&url);

            println!("Starting SEO audit");
            println!("  URL:            {}", seed);
            println!(
                "  Max pages:      {}",
                max_pages.map_or("unlimited".to_string(), |n| n.to_string())
            );
            println!(
                "  Robots.txt:     {}",
                if respect_robots { "respected" } else { "ignored (audit mode)" }
            );

            let options = AuditOptions {
                max_pages,
                respect_robots,
                deadline: deadline_secs.map(Duration::from_secs),
            };

            let report = audit(&seed, options).await?;

            let overview = &report.audit_stats.site_overview;
            println!();
            println!("Audit complete in {:.2}s", report.execution_time);
            println!("  Pages crawled:  {}", overview.total_crawled_pages);
            println!("  Average score:  {}/100", overview.average_seo_score);
            println!(
                "  Issues:         {} total ({} critical, {} high, {} medium, {} low)",
                overview.total_issues,
                overview.critical_issues_count,
                overview.high_issues_count,
                overview.medium_issues_count,
                overview.low_issues_count,
            );

            export::write_json(&report, &output)?;
            println!("  Report:         {}", output);

            if let Some(csv_path) = csv {
                export::write_issues_csv(&report, &csv_path)?;
                println!("  Issues CSV:     {}", csv_path);
            }
        }
    }

    Ok(())
}

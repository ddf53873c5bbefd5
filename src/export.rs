//! Report file output: pretty JSON and a flat per-issue CSV.

use std::io::Write;
use std::path::Path;

use crate::models::{Issue, IssueCategory};
use crate::report::AuditReport;

/// Write the full report as pretty-printed JSON.
pub fn write_json<P: AsRef<Path>>(report: &AuditReport, path: P) -> crate::Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write every issue as one CSV row: url, category, code, severity, message.
pub fn write_issues_csv<P: AsRef<Path>>(report: &AuditReport, path: P) -> crate::Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    let mut writer = std::io::BufWriter::new(file);

    writeln!(writer, "url,category,code,severity,message")?;

    let summary = &report.audit_issues.issues_summary;
    for issues in [&summary.critical, &summary.high, &summary.medium, &summary.low] {
        for issue in issues.iter() {
            writeln!(
                writer,
                "{},{},{},{},{}",
                csv_escape(&issue.url),
                category_label(issue),
                issue.code,
                issue.severity.as_str(),
                csv_escape(&issue.message),
            )?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn category_label(issue: &Issue) -> &'static str {
    match issue.category {
        IssueCategory::Technical => "technical",
        IssueCategory::Onpage => "onpage",
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}

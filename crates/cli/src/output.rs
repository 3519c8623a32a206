//! Output formatting for detection reports

use anyhow::Result;
use waffer_common::DetectionReport;

/// Print a report in the specified format
pub fn print_report(report: &DetectionReport, format: &str) -> Result<()> {
    // Normalize format string
    let format = format.trim().to_lowercase();
    match format.as_str() {
        "json" | "j" | "" => println!("{}", render_json(report)?),
        "text" | "table" | "t" => print!("{}", render_text(report)),
        _ => {
            eprintln!("Warning: Unknown format '{}', using json", format);
            println!("{}", render_json(report)?);
        }
    }
    Ok(())
}

/// Pretty-printed JSON with keys url, found, baseline_status, baseline_headers, error.
pub fn render_json(report: &DetectionReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Human-readable table of candidates and their evidence.
pub fn render_text(report: &DetectionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("\nTarget: {}\n", report.url));

    if let Some(error) = report.error {
        out.push_str(&format!("Error: {}\n\n", error));
        return out;
    }

    if let Some(status) = report.baseline_status {
        out.push_str(&format!("Baseline status: {}\n", status));
    }

    if report.candidates.is_empty() {
        out.push_str("\nNo WAF detected.\n\n");
        return out;
    }

    out.push_str(&format!("\n{:-<80}\n", ""));
    out.push_str(&format!("{:<24} {:<7} {:<47}\n", "WAF", "SCORE", "EVIDENCE"));
    out.push_str(&format!("{:-<80}\n", ""));

    for candidate in &report.candidates {
        let mut first = true;
        for evidence in &candidate.matches {
            let line = format!("{}: {}", evidence.channel, evidence.pattern);
            if first {
                out.push_str(&format!(
                    "{:<24} {:<7} {}\n",
                    truncate(&candidate.waf, 24),
                    candidate.score,
                    line
                ));
                first = false;
            } else {
                out.push_str(&format!("{:<24} {:<7} {}\n", "", "", line));
            }
        }
    }

    out.push_str(&format!("{:-<80}\n", ""));
    out.push_str(&format!(
        "\nCandidates: {} (method: {})\n\n",
        report.candidates.len(),
        report
            .top()
            .map(|c| c.method.as_str())
            .unwrap_or("passive")
    ));
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let cut: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

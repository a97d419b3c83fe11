//! Static HTML rendering of an [`AggregateReport`].

use std::fmt::{self, Write};

use crate::models::AggregateReport;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlOptions {
    /// Append a table of dependencies declared with differing versions.
    pub show_conflicts: bool,
}

/// Render the report as a standalone HTML document.
pub fn render(report: &AggregateReport, options: HtmlOptions) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "  <meta charset=\"utf-8\">")?;
    writeln!(out, "  <title>Dependencies</title>")?;
    write_styles(&mut out)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;

    writeln!(out, "<table>")?;
    writeln!(out, "  <thead>")?;
    writeln!(out, "    <tr><th>Name</th><th>Version</th><th>Description</th></tr>")?;
    writeln!(out, "  </thead>")?;
    writeln!(out, "  <tbody>")?;
    for entry in report.entries() {
        writeln!(
            out,
            "    <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(entry.name),
            escape_html(entry.version),
            escape_html(entry.description.unwrap_or_default()),
        )?;
    }
    writeln!(out, "  </tbody>")?;
    writeln!(out, "</table>")?;

    let conflicts = report.conflicts();
    if options.show_conflicts && !conflicts.is_empty() {
        writeln!(out, "<h2>Version conflicts</h2>")?;
        writeln!(out, "<table class=\"conflicts\">")?;
        writeln!(out, "  <thead>")?;
        writeln!(out, "    <tr><th>Name</th><th>Reported</th><th>Declared by</th></tr>")?;
        writeln!(out, "  </thead>")?;
        writeln!(out, "  <tbody>")?;
        for conflict in conflicts {
            let declared: Vec<String> = conflict
                .declarations
                .iter()
                .map(|d| {
                    format!(
                        "{} ({})",
                        escape_html(&d.application.display().to_string()),
                        escape_html(&d.spec)
                    )
                })
                .collect();
            writeln!(
                out,
                "    <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(conflict.identifier),
                escape_html(conflict.reported_version),
                declared.join("<br>"),
            )?;
        }
        writeln!(out, "  </tbody>")?;
        writeln!(out, "</table>")?;
    }

    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(out)
}

fn write_styles(out: &mut String) -> fmt::Result {
    writeln!(out, "  <style>")?;
    writeln!(out, "    body {{ font-family: sans-serif; margin: 2rem; }}")?;
    writeln!(out, "    table {{ border-collapse: collapse; width: 100%; }}")?;
    writeln!(out, "    th, td {{ border: 1px solid #ccc; padding: 4px 8px; text-align: left; }}")?;
    writeln!(out, "    th {{ background: #f0f2f7; }}")?;
    writeln!(out, "  </style>")
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Declaration, DependencyMetadata};
    use std::path::PathBuf;

    fn meta(name: &str, version: &str, description: Option<&str>) -> DependencyMetadata {
        DependencyMetadata {
            name: name.to_string(),
            version: version.to_string(),
            description: description.map(str::to_string),
        }
    }

    fn rows(html: &str) -> Vec<&str> {
        html.lines()
            .map(str::trim)
            .filter(|l| l.starts_with("<tr><td>"))
            .collect()
    }

    #[test]
    fn test_one_row_per_dependency_in_order() {
        let mut report = AggregateReport::default();
        report.record("left-pad".into(), meta("left-pad", "1.0.0", Some("pad left")));
        report.record("bare".into(), meta("bare", "0.1.0", None));

        let html = render(&report, HtmlOptions::default()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<th>Name</th><th>Version</th><th>Description</th>"));
        assert_eq!(
            rows(&html),
            vec![
                "<tr><td>left-pad</td><td>1.0.0</td><td>pad left</td></tr>",
                "<tr><td>bare</td><td>0.1.0</td><td></td></tr>",
            ]
        );
    }

    #[test]
    fn test_empty_report_has_empty_body() {
        let html = render(&AggregateReport::default(), HtmlOptions::default()).unwrap();
        assert!(rows(&html).is_empty());
        assert!(html.contains("<tbody>"));
    }

    #[test]
    fn test_markup_is_escaped() {
        let mut report = AggregateReport::default();
        report.record(
            "xss".into(),
            meta("xss", "1.0.0", Some("<script>alert('x')</script> & more")),
        );

        let html = render(&report, HtmlOptions::default()).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
    }

    #[test]
    fn test_conflicts_table_is_opt_in() {
        let mut report = AggregateReport::default();
        report.record("foo".into(), meta("foo", "1.0.0", None));
        for (app, spec) in [("/apps/a", "1.0.0"), ("/apps/b", "2.0.0")] {
            report.declare(
                "foo",
                Declaration {
                    application: PathBuf::from(app),
                    spec: spec.to_string(),
                },
            );
        }

        let plain = render(&report, HtmlOptions::default()).unwrap();
        assert!(!plain.contains("Version conflicts"));

        let detailed = render(&report, HtmlOptions { show_conflicts: true }).unwrap();
        assert!(detailed.contains("Version conflicts"));
        assert!(detailed.contains("/apps/a (1.0.0)<br>/apps/b (2.0.0)"));
    }
}

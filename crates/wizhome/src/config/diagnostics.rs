use std::ops::Range;

/// A problem found while validating a config file, pointing at the offending
/// span of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Dotted path of the field, e.g. `home.devices[1].name`
    pub field_path: String,
    pub message: String,
    pub span: Range<usize>,
    pub label: String,
    /// Earlier definition this one conflicts with, if any
    pub related: Option<Range<usize>>,
}

/// Format all diagnostics for display using Ariadne
pub fn format_diagnostics(file_id: &str, content: &str, diagnostics: &[Diagnostic]) -> String {
    use ariadne::Label;
    use ariadne::Report;
    use ariadne::ReportKind;
    use ariadne::Source;

    let mut output = Vec::new();

    for diagnostic in diagnostics {
        let mut report = Report::build(
            ReportKind::Error,
            (file_id.to_string(), diagnostic.span.clone()),
        )
        .with_config(ariadne::Config::default().with_color(false))
        .with_message(format!("{}: {}", diagnostic.field_path, diagnostic.message))
        .with_label(
            Label::new((file_id.to_string(), diagnostic.span.clone()))
                .with_message(&diagnostic.label),
        );

        if let Some(related) = &diagnostic.related {
            report = report.with_label(
                Label::new((file_id.to_string(), related.clone()))
                    .with_message("first defined here"),
            );
        }

        report
            .finish()
            .write((file_id.to_string(), Source::from(content)), &mut output)
            .ok();
    }

    String::from_utf8_lossy(&output).to_string()
}

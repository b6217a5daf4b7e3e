//! Purpose: `fillrate` CLI entry point and command dispatch support.
//! Role: Binary crate root; parses args, runs commands, emits reports on stdout.
//! Invariants: Human output goes to terminals; JSON envelopes go to pipes or --json.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `core::error::to_exit_code`.
use std::io::{self, IsTerminal};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint,
    error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing::debug;

mod command_dispatch;

use fillrate::core::count::{LeafCounts, missing_leaf_paths};
use fillrate::core::error::{EXIT_BELOW_MIN, Error, ErrorKind, to_exit_code};
use fillrate::core::load::{RecordSource, load_record};
use fillrate::core::report::{CompletenessReport, SectionStats, record_id_field};
use fillrate::notice::{Notice, notice_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint(clap_error_hint(&err)),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;

    command_dispatch::dispatch_command(cli.command, color_mode)
        .map_err(add_parse_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("FILLRATE_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "fillrate",
    version,
    about = "Completeness reports for nested JSON records",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"A record is one JSON document (object, array, or scalar). Every scalar
field is a leaf; a leaf is filled unless it is null or "".

Mental model:
  - `report` summarizes a record (leaves, sections, percent)
  - `missing` lists the paths of unfilled leaves
  - `check` gates on a minimum completeness percent
"#,
    after_help = r#"EXAMPLES
  $ fillrate report survey.json
  $ fillrate report survey.json --id-field phone_number --missing
  $ curl -s https://api.example.com/session/8 | fillrate report -
  $ fillrate check survey.json --min 80 || echo incomplete

LEARN MORE
  $ fillrate <command> --help"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Summarize completeness of one record",
        long_about = r#"Count filled versus total leaf fields and print a summary.

Reads one JSON document from a file path, or from stdin with `-`."#,
        after_help = r#"EXAMPLES
  $ fillrate report survey.json
  $ fillrate report survey.json --id-field phone_number
  $ fillrate report survey.json --missing
  $ fillrate report survey.json --json | jq '.report.percent'

NOTES
  - Human output on terminals; JSON envelope when piped or with --json.
  - Sections are the top-level members of an object record.
  - An unknown or unfilled --id-field emits a notice on stderr."#
    )]
    Report {
        #[arg(help = "Record path, or - for stdin", value_hint = ValueHint::FilePath)]
        record: String,
        #[arg(
            long = "id-field",
            value_name = "FIELD",
            help = "Top-level field shown as the record id"
        )]
        id_field: Option<String>,
        #[arg(long, help = "Include unfilled leaf paths in the report")]
        missing: bool,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "List unfilled leaf paths in one record",
        long_about = r#"Print the path of every leaf that is null or the empty string.

Paths use dots for object members and [index] for array elements,
e.g. family_members[0].name."#,
        after_help = r#"EXAMPLES
  $ fillrate missing survey.json
  $ fillrate missing survey.json --json | jq '.missing.count'

NOTES
  - One path per line on terminals; JSON envelope when piped or with --json."#
    )]
    Missing {
        #[arg(help = "Record path, or - for stdin", value_hint = ValueHint::FilePath)]
        record: String,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Gate on a minimum completeness percent",
        long_about = r#"Compute completeness and compare it against a minimum.

Exits 0 when the record meets the minimum and 10 when it is below,
so the command composes with shell conditionals and CI steps."#,
        after_help = r#"EXAMPLES
  $ fillrate check survey.json --min 80
  $ fillrate check survey.json --min 80 --json
  $ fillrate check survey.json --min 80 && publish survey.json

NOTES
  - --min takes a percent from 0 to 100.
  - A record with no leaves is 0% complete and only meets --min 0."#
    )]
    Check {
        #[arg(help = "Record path, or - for stdin", value_hint = ValueHint::FilePath)]
        record: String,
        #[arg(
            long,
            value_name = "PERCENT",
            help = "Minimum completeness percent (0-100)"
        )]
        min: f64,
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Print version info as JSON",
        long_about = r#"Emit version info as JSON (stable, machine-readable)."#,
        after_help = r#"EXAMPLES
  $ fillrate version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout.
Install the generated file in your shell's completion directory (or
source it) to enable tab completion."#,
        after_help = r#"EXAMPLES
  $ fillrate completion bash > ~/.local/share/bash-completion/completions/fillrate
  $ fillrate completion zsh > ~/.zfunc/_fillrate
  $ fillrate completion fish > ~/.config/fish/completions/fillrate.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn add_parse_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Parse || err.hint().is_some() {
        return err;
    }
    err.with_hint("Record must be one JSON document. Check the reported line and column.")
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::NotFound => {
            err.with_hint("Check the record path, or pass - to read from stdin.")
        }
        ErrorKind::Permission => {
            err.with_hint("Permission denied. Check file permissions on the record.")
        }
        ErrorKind::Io => err.with_hint("I/O error. Check the path and filesystem."),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with FILLRATE_LOG=debug and share command/context if it persists.",
    )
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);
    match usage {
        Some(usage) => format!("Usage: {usage}. See `fillrate --help`."),
        None => "Try `fillrate --help`.".to_string(),
    }
}

fn rfc3339_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

// Percent values in envelopes are rounded to one decimal so piped output
// matches the human rendering.
fn rounded_percent(counts: &LeafCounts) -> f64 {
    (counts.percent() * 10.0).round() / 10.0
}

fn format_percent(counts: &LeafCounts) -> String {
    format!("{:.1}%", counts.percent())
}

fn report_json(report: &CompletenessReport) -> Value {
    let mut inner = Map::new();
    inner.insert("source".to_string(), json!(report.source));
    if let Some(record_id) = &report.record_id {
        inner.insert("record_id".to_string(), json!(record_id));
    }
    if let Some(generated) = rfc3339_now() {
        inner.insert("generated".to_string(), json!(generated));
    }
    inner.insert("counts".to_string(), json!(report.counts));
    inner.insert("empty".to_string(), json!(report.counts.empty()));
    inner.insert("percent".to_string(), json!(rounded_percent(&report.counts)));
    inner.insert(
        "sections".to_string(),
        Value::Array(report.sections.iter().map(section_json).collect()),
    );
    if let Some(missing) = &report.missing {
        inner.insert("missing".to_string(), json!(missing));
    }

    let mut outer = Map::new();
    outer.insert("report".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn section_json(section: &SectionStats) -> Value {
    json!({
        "name": section.name,
        "counts": section.counts,
        "percent": rounded_percent(&section.counts),
    })
}

fn missing_json(source: &str, paths: &[String]) -> Value {
    json!({
        "missing": {
            "source": source,
            "count": paths.len(),
            "paths": paths,
        }
    })
}

fn check_json(report: &CompletenessReport, min_percent: f64, meets: bool) -> Value {
    json!({
        "check": {
            "source": report.source,
            "counts": report.counts,
            "percent": rounded_percent(&report.counts),
            "min_percent": min_percent,
            "status": if meets { "ok" } else { "below" },
        }
    })
}

fn emit_report_human(report: &CompletenessReport) {
    println!("{}: {} complete", report.source, format_percent(&report.counts));
    if let Some(record_id) = &report.record_id {
        println!("  record id:  {record_id}");
    }
    println!(
        "  leaves:     {} total, {} filled, {} empty",
        report.counts.total,
        report.counts.filled,
        report.counts.empty()
    );
    if !report.sections.is_empty() {
        println!();
        for line in section_table_lines(&report.sections) {
            println!("  {line}");
        }
    }
    if let Some(missing) = &report.missing {
        println!();
        println!("  missing ({}):", missing.len());
        for path in missing {
            println!("    {path}");
        }
    }
}

fn section_table_lines(sections: &[SectionStats]) -> Vec<String> {
    let headers = ["SECTION", "FILLED", "TOTAL", "COMPLETE"];
    let aligns = [Align::Left, Align::Right, Align::Right, Align::Right];
    let rows = sections
        .iter()
        .map(|section| {
            vec![
                section.name.clone(),
                section.counts.filled.to_string(),
                section.counts.total.to_string(),
                format_percent(&section.counts),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows, &aligns)
}

#[derive(Copy, Clone, Debug)]
enum Align {
    Left,
    Right,
}

fn render_table(headers: &[&str], rows: &[Vec<String>], aligns: &[Align]) -> Vec<String> {
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if idx < widths.len() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }
    }

    let header_cells = headers
        .iter()
        .map(|header| header.to_string())
        .collect::<Vec<_>>();
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_table_line(&header_cells, &widths, aligns));
    for row in rows {
        lines.push(format_table_line(row, &widths, aligns));
    }
    lines
}

fn format_table_line(cells: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        let pad = width.saturating_sub(cell.chars().count());
        match aligns.get(idx).copied().unwrap_or(Align::Left) {
            Align::Left => {
                line.push_str(cell);
                line.push_str(&" ".repeat(pad));
            }
            Align::Right => {
                line.push_str(&" ".repeat(pad));
                line.push_str(cell);
            }
        }
    }
    line.trim_end().to_string()
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("fillrate {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "fillrate",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_notice(notice: &Notice, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {} (source: {})", notice.message, notice.source);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Parse => "invalid JSON".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    if let Some(column) = err.column() {
        inner.insert("column".to_string(), json!(column));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let (Some(line), Some(column)) = (err.line(), err.column()) {
        lines.push(format!(
            "{} line {line}, column {column}",
            colorize_label("at:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{
        Align, CompletenessReport, LeafCounts, SectionStats, check_json, format_percent,
        missing_json, render_table, report_json, rounded_percent, section_table_lines,
    };
    use serde_json::json;

    fn counts(filled: u64, total: u64) -> LeafCounts {
        LeafCounts { filled, total }
    }

    #[test]
    fn percent_formats_with_one_decimal() {
        assert_eq!(format_percent(&counts(2, 5)), "40.0%");
        assert_eq!(format_percent(&counts(1, 3)), "33.3%");
        assert_eq!(format_percent(&counts(0, 0)), "0.0%");
    }

    #[test]
    fn rounded_percent_matches_the_human_rendering() {
        assert_eq!(rounded_percent(&counts(1, 3)), 33.3);
        assert_eq!(rounded_percent(&counts(2, 3)), 66.7);
        assert_eq!(rounded_percent(&counts(0, 0)), 0.0);
    }

    #[test]
    fn render_table_aligns_columns() {
        let headers = ["NAME", "N"];
        let rows = vec![
            vec!["long_section_name".to_string(), "5".to_string()],
            vec!["x".to_string(), "123".to_string()],
        ];
        let lines = render_table(&headers, &rows, &[Align::Left, Align::Right]);
        assert_eq!(lines.len(), 3);
        // Every line pads to the same width; the numeric column is
        // right-aligned so digits line up.
        assert_eq!(lines[0].len(), lines[1].len());
        assert_eq!(lines[1].len(), lines[2].len());
        assert!(lines[1].ends_with("  5"));
        assert!(lines[2].ends_with("123"));
        assert!(lines[2].starts_with("x "));
    }

    #[test]
    fn section_table_has_one_row_per_section() {
        let sections = vec![
            SectionStats {
                name: "a".to_string(),
                counts: counts(1, 2),
            },
            SectionStats {
                name: "b".to_string(),
                counts: counts(0, 3),
            },
        ];
        let lines = section_table_lines(&sections);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("SECTION"));
        assert!(lines[1].contains("50.0%"));
        assert!(lines[2].contains("0.0%"));
    }

    #[test]
    fn report_envelope_carries_documented_keys() {
        let record = json!({"a": null, "b": "x"});
        let report = CompletenessReport::build("record.json", &record)
            .with_record_id("0000000008")
            .with_missing_from(&record);

        let value = report_json(&report);
        let inner = value.get("report").expect("report object");
        assert_eq!(inner["source"], "record.json");
        assert_eq!(inner["record_id"], "0000000008");
        assert_eq!(inner["counts"]["filled"], 1);
        assert_eq!(inner["counts"]["total"], 2);
        assert_eq!(inner["empty"], 1);
        assert_eq!(inner["percent"], 50.0);
        assert_eq!(inner["sections"].as_array().expect("sections").len(), 2);
        assert_eq!(inner["missing"], json!(["a"]));
    }

    #[test]
    fn check_envelope_reports_status() {
        let report = CompletenessReport::build("-", &json!({"a": 1, "b": null}));
        let ok = check_json(&report, 30.0, true);
        assert_eq!(ok["check"]["status"], "ok");
        assert_eq!(ok["check"]["min_percent"], 30.0);

        let below = check_json(&report, 80.0, false);
        assert_eq!(below["check"]["status"], "below");
        assert_eq!(below["check"]["percent"], 50.0);
    }

    #[test]
    fn missing_envelope_counts_paths() {
        let paths = vec!["a".to_string(), "d.e".to_string()];
        let value = missing_json("record.json", &paths);
        assert_eq!(value["missing"]["count"], 2);
        assert_eq!(value["missing"]["paths"], json!(["a", "d.e"]));
    }
}

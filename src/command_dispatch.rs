//! Purpose: Hold top-level CLI command dispatch for `fillrate`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Command behavior, output envelopes, and exit code semantics stay unchanged.
//! Invariants: Helpers in `main.rs` remain the source of emission logic.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "fillrate", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Report {
            record,
            id_field,
            missing,
            json,
        } => {
            let source = RecordSource::from_arg(&record);
            let value = load_record(&source)?;
            let mut report = CompletenessReport::build(source.label(), &value);
            if let Some(field) = id_field {
                match record_id_field(&value, &field) {
                    Some(record_id) => report = report.with_record_id(record_id),
                    None => emit_notice(&missing_id_field_notice(&source, &field), color_mode),
                }
            }
            if missing {
                report = report.with_missing_from(&value);
            }
            debug!(
                leaves = report.counts.total,
                sections = report.sections.len(),
                "report built"
            );
            if json || !io::stdout().is_terminal() {
                emit_json(report_json(&report));
            } else {
                emit_report_human(&report);
            }
            Ok(RunOutcome::ok())
        }
        Command::Missing { record, json } => {
            let source = RecordSource::from_arg(&record);
            let value = load_record(&source)?;
            let paths = missing_leaf_paths(&value);
            debug!(unfilled = paths.len(), "missing paths collected");
            if json || !io::stdout().is_terminal() {
                emit_json(missing_json(&source.label(), &paths));
            } else {
                for path in &paths {
                    println!("{path}");
                }
            }
            Ok(RunOutcome::ok())
        }
        Command::Check { record, min, json } => {
            if !(0.0..=100.0).contains(&min) {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("--min must be a percent from 0 to 100")
                    .with_hint("Use a value like --min 80 or --min 92.5."));
            }
            let source = RecordSource::from_arg(&record);
            let value = load_record(&source)?;
            let report = CompletenessReport::build(source.label(), &value);
            let meets = report.meets_minimum(min);
            if json || !io::stdout().is_terminal() {
                emit_json(check_json(&report, min, meets));
            } else {
                let verdict = if meets { "meets" } else { "below" };
                println!(
                    "{}: {} complete ({verdict} minimum {min:.1}%)",
                    report.source,
                    format_percent(&report.counts)
                );
            }
            let exit_code = if meets { 0 } else { EXIT_BELOW_MIN };
            Ok(RunOutcome::with_code(exit_code))
        }
    }
}

fn missing_id_field_notice(source: &RecordSource, field: &str) -> Notice {
    let mut details = Map::new();
    details.insert("field".to_string(), json!(field));
    Notice {
        kind: "missing-id-field".to_string(),
        time: rfc3339_now().unwrap_or_default(),
        cmd: "report".to_string(),
        source: source.label(),
        message: format!("record has no filled scalar field {field}"),
        details,
    }
}

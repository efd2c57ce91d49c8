//! State serializer: one file representing the entire workspace.
//!
//! Records are emitted in a fixed order, so two exports of the same state
//! are byte-identical. Each record-producing step is independently fault
//! tolerant: a record that fails to serialize is skipped with a diagnostic
//! and the export continues. I/O failures abort immediately; bytes already
//! written stay on disk for the caller to deal with.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use relay_common::{CapturedPair, ExchangeEntry};
use tracing::{info, warn};

use crate::codec::{CodecError, RowBuilder};
use crate::error::StateError;
use crate::log::ExchangeLog;
use crate::workspace::Workspace;

/// Extension enforced on every exported state file.
pub const STATE_FILE_EXTENSION: &str = "authrelay";

/// Totals reported after an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Where the file actually landed, after extension enforcement.
    pub path: PathBuf,
    pub records_written: usize,
    pub records_skipped: usize,
    pub exchanges_written: usize,
}

/// Append the state-file extension when the chosen name lacks it.
pub fn enforce_extension(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case(STATE_FILE_EXTENSION) => path.to_path_buf(),
        _ => {
            let mut name = path.as_os_str().to_os_string();
            name.push(".");
            name.push(STATE_FILE_EXTENSION);
            PathBuf::from(name)
        }
    }
}

/// Serialize the whole workspace and exchange log to `path`.
///
/// Does not mutate the workspace. The exchange log is walked through a
/// snapshot taken under its lock, so captures arriving mid-export cannot
/// tear the file.
pub fn export_state(
    workspace: &Workspace,
    log: &ExchangeLog,
    path: &Path,
) -> Result<ExportSummary, StateError> {
    let path = enforce_extension(path);
    let mut out = BufWriter::new(File::create(&path)?);
    let mut summary = ExportSummary {
        path: path.clone(),
        records_written: 0,
        records_skipped: 0,
        exchanges_written: 0,
    };

    emit(
        &mut out,
        &mut summary,
        "ReplaceString",
        RowBuilder::tagged("ReplaceString")
            .payload(workspace.replace_string.as_bytes())
            .finish(),
    )?;

    if let Some(ai) = &workspace.ai {
        emit(
            &mut out,
            &mut summary,
            "ApiKey",
            RowBuilder::tagged("ApiKey").payload(ai.api_key.as_bytes()).finish(),
        )?;
        if !ai.model.is_empty() {
            emit(
                &mut out,
                &mut summary,
                "AiModel",
                RowBuilder::tagged("AiModel").text(&ai.model).finish(),
            )?;
        }
        let endpoint = ai.endpoint.trim();
        if !endpoint.is_empty() && endpoint != crate::workspace::AiConfig::DEFAULT_ENDPOINT {
            emit(
                &mut out,
                &mut summary,
                "AiApiUrl",
                RowBuilder::tagged("AiApiUrl").payload(endpoint.as_bytes()).finish(),
            )?;
        }
    }

    let filter_sets = [
        ("EDFilter", &workspace.endpoint_filters),
        ("EDFilterUnauth", &workspace.endpoint_filters_unauth),
        ("IFFilter", &workspace.interception_filters),
    ];
    for (tag, set) in filter_sets {
        for pattern in set.iter() {
            emit(
                &mut out,
                &mut summary,
                tag,
                RowBuilder::tagged(tag).payload(pattern.as_bytes()).finish(),
            )?;
        }
    }

    emit(
        &mut out,
        &mut summary,
        "AndOrType",
        RowBuilder::tagged("AndOrType")
            .text(workspace.combinator.as_str())
            .finish(),
    )?;
    emit(
        &mut out,
        &mut summary,
        "AndOrTypeUnauth",
        RowBuilder::tagged("AndOrTypeUnauth")
            .text(workspace.combinator_unauth.as_str())
            .finish(),
    )?;

    // Generic match/replace rules share the table with header rules but are
    // not persisted; only header kinds are unambiguous on restore.
    for rule in workspace.rules.iter().filter(|rule| rule.kind.is_header()) {
        match serde_json::to_string(rule) {
            Ok(json) => emit(
                &mut out,
                &mut summary,
                "TemporaryHeader",
                RowBuilder::tagged("TemporaryHeader")
                    .payload(json.as_bytes())
                    .finish(),
            )?,
            Err(err) => {
                warn!("skipping TemporaryHeader record for {:?}: {}", rule.key(), err);
                summary.records_skipped += 1;
            }
        }
    }

    match serde_json::to_string(&workspace.toggles) {
        Ok(json) => emit(
            &mut out,
            &mut summary,
            "CheckBoxes",
            RowBuilder::tagged("CheckBoxes").text(json).finish(),
        )?,
        Err(err) => {
            warn!("skipping CheckBoxes record: {}", err);
            summary.records_skipped += 1;
        }
    }

    emit(
        &mut out,
        &mut summary,
        "RemoveDuplicates",
        RowBuilder::tagged("RemoveDuplicates")
            .text(if workspace.export_options.remove_duplicates {
                "true"
            } else {
                "false"
            })
            .finish(),
    )?;

    for set in &workspace.saved_headers {
        match serde_json::to_string(set) {
            Ok(json) => emit(
                &mut out,
                &mut summary,
                "SavedHeader",
                RowBuilder::tagged("SavedHeader")
                    .payload(json.as_bytes())
                    .finish(),
            )?,
            Err(err) => {
                warn!("skipping SavedHeader record {:?}: {}", set.title, err);
                summary.records_skipped += 1;
            }
        }
    }

    for entry in log.snapshot() {
        let written = summary.records_written;
        emit(&mut out, &mut summary, "exchange", exchange_row(&entry))?;
        if summary.records_written > written {
            summary.exchanges_written += 1;
        }
    }

    out.flush()?;
    info!(
        "✓ Exported state to {} ({} records, {} exchanges, {} skipped)",
        path.display(),
        summary.records_written,
        summary.exchanges_written,
        summary.records_skipped
    );
    Ok(summary)
}

/// Write one encoded row, or skip it with a diagnostic when encoding failed.
fn emit(
    out: &mut impl Write,
    summary: &mut ExportSummary,
    label: &str,
    row: Result<String, CodecError>,
) -> Result<(), StateError> {
    match row {
        Ok(line) => {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
            summary.records_written += 1;
        }
        Err(err) => {
            warn!("skipping {} record: {}", label, err);
            summary.records_skipped += 1;
        }
    }
    Ok(())
}

/// Encode one exchange entry as a legacy positional row.
fn exchange_row(entry: &ExchangeEntry) -> Result<String, CodecError> {
    let mut row = pair_fields(RowBuilder::positional(), &entry.baseline);
    row = pair_fields(row, &entry.replay);
    row = match &entry.unauthenticated {
        Some(pair) => pair_fields(row, pair),
        // Empty host field signals an absent unauthenticated pair.
        None => row.text("").text("").text("").text("").text(""),
    };
    row.text(&entry.status)
        .text(&entry.status_unauthenticated)
        .finish()
}

fn pair_fields(row: RowBuilder, pair: &CapturedPair) -> RowBuilder {
    row.text(&pair.service.host)
        .text(pair.service.port)
        .text(&pair.service.protocol)
        .payload(&pair.request)
        .payload(&pair.response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforce_extension() {
        assert_eq!(
            enforce_extension(Path::new("session")),
            PathBuf::from("session.authrelay")
        );
        assert_eq!(
            enforce_extension(Path::new("session.txt")),
            PathBuf::from("session.txt.authrelay")
        );
        assert_eq!(
            enforce_extension(Path::new("session.authrelay")),
            PathBuf::from("session.authrelay")
        );
        assert_eq!(
            enforce_extension(Path::new("session.AUTHRELAY")),
            PathBuf::from("session.AUTHRELAY")
        );
    }
}

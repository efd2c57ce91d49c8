//! State restorer: rebuilds a workspace and exchange log from a state file.
//!
//! Rows are processed strictly in file order on the calling thread. Tagged
//! rows go to their handler; any other row is assumed to be a legacy
//! positional exchange record, the one record kind the original file format
//! never tagged. Malformed rule, filter and saved-header rows are skipped
//! with a diagnostic; malformed scalar and exchange rows abort the restore
//! and leave the workspace in whatever state the prior rows produced.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::Regex;
use relay_common::{http, CapturedPair, ExchangeEntry, HttpService, MatchReplaceRule, SavedHeaderSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::{self, CodecError, Row};
use crate::error::StateError;
use crate::log::{ExchangeLog, ViewSync};
use crate::workspace::{FilterCombinator, Workspace};

/// Host-application callbacks fired after a restore pass.
///
/// Every method defaults to a no-op so headless callers can pass `&mut ()`.
pub trait RestoreHooks {
    /// The most recently restored exchange carried this `Cookie` header,
    /// staged for one-click reuse by the fetch-header feature.
    fn stage_cookie_header(&mut self, header: String) {
        let _ = header;
    }

    /// The most recently restored exchange carried this `Authorization`
    /// header.
    fn stage_authorization_header(&mut self, header: String) {
        let _ = header;
    }

    /// Saved header sets were restored; the selector should repopulate its
    /// choices and select the first title.
    fn saved_header_sets_loaded(&mut self, titles: &[String]) {
        let _ = titles;
    }
}

impl RestoreHooks for () {}

/// Totals reported after a successful restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub rows_read: usize,
    /// Rows dropped by row-scoped failures or unknown record kinds.
    pub rows_skipped: usize,
    pub filters_added: usize,
    pub rules_added: usize,
    pub saved_header_sets: usize,
    pub exchanges_appended: usize,
}

/// A failure confined to a single row; logged and skipped, never propagated.
#[derive(Debug, Error)]
enum RowError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid port number: {0}")]
    Port(#[from] std::num::ParseIntError),

    #[error("{0}")]
    Invalid(&'static str),
}

/// Restore a state file into the workspace and exchange log.
///
/// Saved header sets are replaced; filter sets and the rule table are merged
/// with duplicate detection, so importing the same file twice never
/// duplicates an entry. Restored exchanges are appended under the log lock
/// and announced to the view in append order.
pub fn import_state(
    workspace: &mut Workspace,
    log: &ExchangeLog,
    view: &ViewSync,
    hooks: &mut dyn RestoreHooks,
    path: &Path,
) -> Result<RestoreSummary, StateError> {
    let reader = BufReader::new(File::open(path)?);

    workspace.saved_headers.clear();

    let mut summary = RestoreSummary::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        if line.is_empty() {
            continue;
        }
        summary.rows_read += 1;

        let row = Row::parse(&line);
        match row.tag() {
            "ReplaceString" => {
                workspace.replace_string = scalar_payload(&row, line_no)?;
            }
            "ApiKey" => {
                if workspace.ai.is_some() {
                    let key = scalar_payload(&row, line_no)?;
                    if let Some(ai) = workspace.ai.as_mut() {
                        ai.api_key = key;
                    }
                }
            }
            "AiModel" => {
                if workspace.ai.is_some() {
                    let model = row
                        .text(1)
                        .map_err(|err| StateError::malformed(line_no, row.tag(), err))?
                        .to_string();
                    if let Some(ai) = workspace.ai.as_mut() {
                        ai.model = model;
                    }
                }
            }
            "AiApiUrl" => {
                if workspace.ai.is_some() {
                    let endpoint = scalar_payload(&row, line_no)?;
                    if let Some(ai) = workspace.ai.as_mut() {
                        ai.endpoint = endpoint;
                    }
                }
            }
            "EDFilter" | "EDFilterUnauth" | "IFFilter" => match row.payload_text(1) {
                Ok(pattern) => {
                    let set = match row.tag() {
                        "EDFilter" => &mut workspace.endpoint_filters,
                        "EDFilterUnauth" => &mut workspace.endpoint_filters_unauth,
                        _ => &mut workspace.interception_filters,
                    };
                    if set.insert(pattern) {
                        summary.filters_added += 1;
                    }
                }
                Err(err) => skip_row(&mut summary, line_no, row.tag(), &err),
            },
            "AndOrType" => {
                workspace.combinator = parse_combinator(&row, line_no)?;
            }
            "AndOrTypeUnauth" => {
                workspace.combinator_unauth = parse_combinator(&row, line_no)?;
            }
            "MatchReplace" | "TemporaryHeader" => match restore_rule(workspace, &row) {
                Ok(true) => summary.rules_added += 1,
                Ok(false) => debug!("line {}: duplicate rule ignored", line_no),
                Err(err) => skip_row(&mut summary, line_no, row.tag(), &err),
            },
            "CheckBoxes" => {
                let raw = row
                    .text(1)
                    .map_err(|err| StateError::malformed(line_no, row.tag(), err))?;
                let values: BTreeMap<String, bool> = serde_json::from_str(raw)
                    .map_err(|err| StateError::malformed(line_no, row.tag(), err))?;
                let ignored = workspace.toggles.apply(&values);
                if ignored > 0 {
                    debug!("line {}: {} unknown toggle names ignored", line_no, ignored);
                }
            }
            "RemoveDuplicates" => {
                let raw = row
                    .text(1)
                    .map_err(|err| StateError::malformed(line_no, row.tag(), err))?;
                workspace.export_options.remove_duplicates = serde_json::from_str(raw)
                    .map_err(|err| StateError::malformed(line_no, row.tag(), err))?;
            }
            "SavedHeader" => match restore_saved_header(&row) {
                Ok(set) => {
                    workspace.saved_headers.push(set);
                    summary.saved_header_sets += 1;
                }
                Err(err) => skip_row(&mut summary, line_no, row.tag(), &err),
            },
            tag => {
                if row.len() == codec::EXCHANGE_FIELD_COUNT {
                    let entry = decode_exchange(&row)
                        .map_err(|err| StateError::exchange(line_no, err))?;
                    let index = log.append(entry);
                    view.notify_insert(index);
                    summary.exchanges_appended += 1;
                } else if codec::is_tag_shaped(tag) {
                    // A record kind from a newer writer; old readers keep
                    // the rest of the file.
                    debug!(
                        "line {}: skipping unknown record kind {:?} ({} fields)",
                        line_no,
                        tag,
                        row.len()
                    );
                    summary.rows_skipped += 1;
                } else {
                    return Err(StateError::exchange(
                        line_no,
                        format!(
                            "expected {} fields, found {}",
                            codec::EXCHANGE_FIELD_COUNT,
                            row.len()
                        ),
                    ));
                }
            }
        }
    }

    run_post_pass(workspace, log, hooks, &summary);

    info!(
        "✓ Restored state from {}: {} exchanges, {} filters, {} rules, {} rows skipped",
        path.display(),
        summary.exchanges_appended,
        summary.filters_added,
        summary.rules_added,
        summary.rows_skipped
    );
    Ok(summary)
}

/// Stage reusable headers from the newest entry and refresh the saved-header
/// selector. Convenience wiring for the host, not a correctness requirement.
fn run_post_pass(
    workspace: &Workspace,
    log: &ExchangeLog,
    hooks: &mut dyn RestoreHooks,
    summary: &RestoreSummary,
) {
    if summary.exchanges_appended > 0 {
        if let Some(entry) = log.last() {
            if let Some(cookie) = http::header_value(&entry.baseline.request, "Cookie") {
                hooks.stage_cookie_header(format!("Cookie: {}", cookie));
            }
            if let Some(auth) = http::header_value(&entry.baseline.request, "Authorization") {
                hooks.stage_authorization_header(format!("Authorization: {}", auth));
            }
        }
    }

    if !workspace.saved_headers.is_empty() {
        let titles: Vec<String> = workspace
            .saved_headers
            .iter()
            .map(|set| set.title.clone())
            .collect();
        hooks.saved_header_sets_loaded(&titles);
    }
}

fn skip_row(summary: &mut RestoreSummary, line_no: usize, tag: &str, err: &dyn std::fmt::Display) {
    warn!("line {}: skipping {} record: {}", line_no, tag, err);
    summary.rows_skipped += 1;
}

fn scalar_payload(row: &Row, line: usize) -> Result<String, StateError> {
    row.payload_text(1)
        .map_err(|err| StateError::malformed(line, row.tag(), err))
}

fn parse_combinator(row: &Row, line: usize) -> Result<FilterCombinator, StateError> {
    let value = row
        .text(1)
        .map_err(|err| StateError::malformed(line, row.tag(), err))?;
    FilterCombinator::parse(value)
        .ok_or_else(|| StateError::malformed(line, row.tag(), format!("unknown combinator {:?}", value)))
}

fn restore_rule(workspace: &mut Workspace, row: &Row) -> Result<bool, RowError> {
    let raw = row.payload(1)?;
    let rule: MatchReplaceRule = serde_json::from_slice(&raw)?;
    if rule.regex {
        // Validate now so a broken pattern cannot enter the table.
        Regex::new(&rule.pattern)?;
    }
    Ok(workspace.rules.insert(rule))
}

fn restore_saved_header(row: &Row) -> Result<SavedHeaderSet, RowError> {
    let raw = row.payload(1)?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Decode a legacy positional exchange row.
fn decode_exchange(row: &Row) -> Result<ExchangeEntry, RowError> {
    let baseline =
        decode_pair(row, 0)?.ok_or(RowError::Invalid("baseline host field is empty"))?;
    let replay = decode_pair(row, 5)?.ok_or(RowError::Invalid("replay host field is empty"))?;
    let unauthenticated = decode_pair(row, 10)?;
    let status = row.text(15)?.to_string();
    let status_unauthenticated = row.text(16)?.to_string();
    Ok(ExchangeEntry::new(
        baseline,
        replay,
        unauthenticated,
        status,
        status_unauthenticated,
    ))
}

/// Decode one host/port/protocol/request/response quintet starting at
/// `base`. An empty host field signals an absent pair.
fn decode_pair(row: &Row, base: usize) -> Result<Option<CapturedPair>, RowError> {
    let host = row.text(base)?;
    if host.is_empty() {
        return Ok(None);
    }
    let port: u16 = row.text(base + 1)?.parse()?;
    let protocol = row.text(base + 2)?.to_string();
    let request = row.payload(base + 3)?;
    let response = row.payload(base + 4)?;
    Ok(Some(CapturedPair::new(
        HttpService::new(host, port, protocol),
        request,
        response,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RowBuilder;

    #[test]
    fn test_decode_pair_absent_when_host_empty() {
        let line = RowBuilder::positional()
            .text("")
            .text("")
            .text("")
            .text("")
            .text("")
            .finish()
            .unwrap();
        let row = Row::parse(&line);
        assert!(decode_pair(&row, 0).unwrap().is_none());
    }

    #[test]
    fn test_decode_pair_rejects_bad_port() {
        let line = RowBuilder::positional()
            .text("example.com")
            .text("not-a-port")
            .text("https")
            .payload(b"req")
            .payload(b"resp")
            .finish()
            .unwrap();
        let row = Row::parse(&line);
        assert!(matches!(decode_pair(&row, 0), Err(RowError::Port(_))));
    }

    #[test]
    fn test_restore_rule_rejects_broken_regex_pattern() {
        let mut workspace = Workspace::default();
        let json = r#"{"type":"header-regex","match":"(unclosed","replace":"x","regexMatch":true}"#;
        let line = RowBuilder::tagged("TemporaryHeader")
            .payload(json.as_bytes())
            .finish()
            .unwrap();
        let row = Row::parse(&line);

        assert!(matches!(
            restore_rule(&mut workspace, &row),
            Err(RowError::Pattern(_))
        ));
        assert!(workspace.rules.is_empty());
    }
}

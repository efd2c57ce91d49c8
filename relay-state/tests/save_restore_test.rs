//! End-to-end export/import coverage over a real file.

use relay_common::{status, CapturedPair, ExchangeEntry, HttpService, MatchReplaceRule, RuleKind, SavedHeaderSet};
use relay_state::workspace::AiConfig;
use relay_state::{export_state, import_state, ExchangeLog, FilterCombinator, ViewSync, Workspace};

fn pair(host: &str, request: &[u8]) -> CapturedPair {
    CapturedPair::new(
        HttpService::new(host, 443, "https"),
        request.to_vec(),
        b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok".to_vec(),
    )
}

fn entry_with_unauth(host: &str) -> ExchangeEntry {
    let request = format!(
        "GET /admin HTTP/1.1\r\nHost: {}\r\nCookie: session=abc123\r\nAuthorization: Bearer tok\r\n\r\n",
        host
    );
    ExchangeEntry::new(
        pair(host, request.as_bytes()),
        pair(host, request.as_bytes()),
        Some(pair(host, request.as_bytes())),
        status::BYPASSED,
        status::ENFORCED,
    )
}

fn entry_without_unauth(host: &str) -> ExchangeEntry {
    let request = format!("POST /orders HTTP/1.1\r\nHost: {}\r\n\r\n", host);
    ExchangeEntry::new(
        pair(host, request.as_bytes()),
        pair(host, request.as_bytes()),
        None,
        status::ENFORCED,
        status::NOT_EVALUATED,
    )
}

fn populated_workspace() -> Workspace {
    let mut workspace = Workspace::default();
    workspace.replace_string = "Cookie: session=lowpriv".to_string();
    workspace.ai = Some(AiConfig {
        api_key: "sk-test-key".to_string(),
        model: "qwen2.5".to_string(),
        endpoint: AiConfig::DEFAULT_ENDPOINT.to_string(),
    });
    workspace.endpoint_filters.insert("^https://app\\.example\\.com/api/");
    workspace.endpoint_filters.insert("/v2/");
    workspace.endpoint_filters_unauth.insert("/public/");
    workspace.interception_filters.insert("example.com");
    workspace.combinator = FilterCombinator::Or;
    workspace.combinator_unauth = FilterCombinator::And;
    workspace
        .rules
        .insert(MatchReplaceRule::new(RuleKind::HeaderSimple, "Cookie: admin", "Cookie: user", false));
    workspace
        .rules
        .insert(MatchReplaceRule::new(RuleKind::HeaderRegex, "^X-Role:.*$", "X-Role: guest", true));
    workspace.toggles.set("autoScroll", true);
    workspace.toggles.set("doUnauthorizedRequest", true);
    workspace.export_options.remove_duplicates = true;
    workspace.saved_headers.push(SavedHeaderSet {
        title: "tenant-a".to_string(),
        headers: vec!["Cookie: session=a".to_string(), "X-Tenant: a".to_string()],
    });
    workspace.saved_headers.push(SavedHeaderSet {
        title: "tenant-b".to_string(),
        headers: vec!["Cookie: session=b".to_string()],
    });
    workspace
}

#[test]
fn test_round_trip_restores_every_state_subset() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = populated_workspace();
    let log = ExchangeLog::new();
    log.append(entry_with_unauth("app.example.com"));
    log.append(entry_without_unauth("app.example.com"));

    let summary = export_state(&workspace, &log, &dir.path().join("session")).unwrap();
    assert_eq!(summary.records_skipped, 0);
    assert_eq!(summary.exchanges_written, 2);

    let mut restored = Workspace::default();
    restored.ai = Some(AiConfig::default());
    let restored_log = ExchangeLog::new();
    let (view, _rx) = ViewSync::channel();

    let restore = import_state(&mut restored, &restored_log, &view, &mut (), &summary.path).unwrap();
    assert_eq!(restore.rows_skipped, 0);
    assert_eq!(restore.exchanges_appended, 2);

    assert_eq!(restored.replace_string, workspace.replace_string);
    assert_eq!(restored.ai, workspace.ai);
    assert_eq!(restored.endpoint_filters, workspace.endpoint_filters);
    assert_eq!(restored.endpoint_filters_unauth, workspace.endpoint_filters_unauth);
    assert_eq!(restored.interception_filters, workspace.interception_filters);
    assert_eq!(restored.combinator, workspace.combinator);
    assert_eq!(restored.combinator_unauth, workspace.combinator_unauth);
    assert_eq!(restored.rules, workspace.rules);
    assert_eq!(restored.toggles, workspace.toggles);
    assert_eq!(restored.export_options, workspace.export_options);
    assert_eq!(restored.saved_headers, workspace.saved_headers);

    // Exchange entries come back equal, numbering recomputed from 1.
    assert_eq!(restored_log.snapshot(), log.snapshot());
    assert_eq!(restored_log.get(0).unwrap().number, 1);
    assert_eq!(restored_log.get(1).unwrap().number, 2);
}

#[test]
fn test_generic_match_replace_rules_are_not_exported() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = populated_workspace();
    workspace
        .rules
        .insert(MatchReplaceRule::new(RuleKind::MatchReplace, "admin=true", "admin=false", false));

    let log = ExchangeLog::new();
    let summary = export_state(&workspace, &log, &dir.path().join("rules")).unwrap();

    let mut restored = Workspace::default();
    let restored_log = ExchangeLog::new();
    let (view, _rx) = ViewSync::channel();
    import_state(&mut restored, &restored_log, &view, &mut (), &summary.path).unwrap();

    let kinds: Vec<RuleKind> = restored.rules.iter().map(|rule| rule.kind).collect();
    assert_eq!(kinds, vec![RuleKind::HeaderSimple, RuleKind::HeaderRegex]);
}

#[test]
fn test_double_import_is_idempotent_for_filters_and_rules() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = populated_workspace();
    let log = ExchangeLog::new();
    let summary = export_state(&workspace, &log, &dir.path().join("twice")).unwrap();

    let mut restored = Workspace::default();
    let restored_log = ExchangeLog::new();
    let (view, _rx) = ViewSync::channel();
    import_state(&mut restored, &restored_log, &view, &mut (), &summary.path).unwrap();
    let filters_after_first = restored.endpoint_filters.len();
    let rules_after_first = restored.rules.len();

    let second = import_state(&mut restored, &restored_log, &view, &mut (), &summary.path).unwrap();
    assert_eq!(second.filters_added, 0);
    assert_eq!(second.rules_added, 0);
    assert_eq!(restored.endpoint_filters.len(), filters_after_first);
    assert_eq!(restored.rules.len(), rules_after_first);

    // Saved headers are replaced, not accumulated.
    assert_eq!(restored.saved_headers.len(), workspace.saved_headers.len());
}

#[test]
fn test_exports_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = populated_workspace();
    let log = ExchangeLog::new();
    log.append(entry_with_unauth("app.example.com"));

    let first = export_state(&workspace, &log, &dir.path().join("a")).unwrap();
    let second = export_state(&workspace, &log, &dir.path().join("b")).unwrap();

    let bytes_a = std::fs::read(&first.path).unwrap();
    let bytes_b = std::fs::read(&second.path).unwrap();
    assert!(!bytes_a.is_empty());
    assert_eq!(bytes_a, bytes_b);
}

#[test]
fn test_placeholder_endpoint_is_never_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = Workspace::default();
    workspace.ai = Some(AiConfig {
        api_key: "sk-test".to_string(),
        model: String::new(),
        endpoint: AiConfig::DEFAULT_ENDPOINT.to_string(),
    });

    let log = ExchangeLog::new();
    let summary = export_state(&workspace, &log, &dir.path().join("secrets")).unwrap();

    let contents = std::fs::read_to_string(&summary.path).unwrap();
    assert!(!contents.contains("AiApiUrl"));
    assert!(!contents.contains("AiModel"));
    assert!(contents.contains("ApiKey"));

    // A non-placeholder endpoint is written, payload-encoded.
    workspace.ai.as_mut().unwrap().endpoint = "https://ai.internal/v1".to_string();
    let summary = export_state(&workspace, &log, &dir.path().join("secrets2")).unwrap();
    let contents = std::fs::read_to_string(&summary.path).unwrap();
    assert!(contents.contains("AiApiUrl"));
    assert!(!contents.contains("https://ai.internal/v1"));
}

#[test]
fn test_secret_rows_are_ignored_without_ai_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut workspace = Workspace::default();
    workspace.ai = Some(AiConfig {
        api_key: "sk-test".to_string(),
        model: "m1".to_string(),
        endpoint: AiConfig::DEFAULT_ENDPOINT.to_string(),
    });

    let log = ExchangeLog::new();
    let summary = export_state(&workspace, &log, &dir.path().join("noai")).unwrap();

    let mut restored = Workspace::default();
    let restored_log = ExchangeLog::new();
    let (view, _rx) = ViewSync::channel();
    import_state(&mut restored, &restored_log, &view, &mut (), &summary.path).unwrap();

    assert!(restored.ai.is_none());
}

#[test]
fn test_export_enforces_file_extension() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::default();
    let log = ExchangeLog::new();

    let summary = export_state(&workspace, &log, &dir.path().join("plain-name")).unwrap();
    assert_eq!(
        summary.path.file_name().unwrap().to_str().unwrap(),
        "plain-name.authrelay"
    );
    assert!(summary.path.exists());
}

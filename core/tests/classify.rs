use chrono::DateTime;
use chrono::Utc;
use pretty_assertions::assert_eq;
use regex::Regex;
use rotor_core::classify::Classification;
use rotor_core::classify::RemoteAsset;
use rotor_core::classify::RetentionPolicy;
use rotor_core::classify::classify;
use rotor_core::template::AssetNameTemplate;
use rotor_core::template::ShortCommit;

fn asset(id: u64, name: &str, created_at: &str) -> RemoteAsset {
    RemoteAsset {
        id,
        name: name.to_string(),
        created_at: DateTime::parse_from_rfc3339(created_at)
            .unwrap()
            .with_timezone(&Utc),
    }
}

fn template() -> AssetNameTemplate {
    AssetNameTemplate::parse("app-$$.zip").unwrap()
}

fn commit() -> ShortCommit {
    ShortCommit::parse("feed12345").unwrap()
}

fn keep(max: u32) -> RetentionPolicy {
    RetentionPolicy {
        max_releases: Some(max),
        match_pattern: None,
    }
}

const NEW_NAME: &str = "app-20240601-feed12.zip";

#[test]
fn retention_queues_from_the_nth_match() {
    let assets = vec![
        asset(1, "app-20240101-aaaaaa.zip", "2024-01-01T00:00:00Z"),
        asset(2, "app-20240102-bbbbbb.zip", "2024-01-02T00:00:00Z"),
        asset(3, "app-20240103-cccccc.zip", "2024-01-03T00:00:00Z"),
        asset(4, "app-20240104-dddddd.zip", "2024-01-04T00:00:00Z"),
    ];
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &keep(2));
    assert_eq!(
        result,
        Classification {
            to_delete: vec![2, 3, 4],
            replace_id: None,
            already_released: false,
        }
    );
}

#[test]
fn retention_keeps_everything_below_the_window() {
    let assets = vec![
        asset(1, "app-20240101-aaaaaa.zip", "2024-01-01T00:00:00Z"),
        asset(2, "app-20240102-bbbbbb.zip", "2024-01-02T00:00:00Z"),
    ];
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &keep(3));
    assert_eq!(result, Classification::default());
}

#[test]
fn missing_window_disables_pruning() {
    let assets = vec![
        asset(1, "app-20240101-aaaaaa.zip", "2024-01-01T00:00:00Z"),
        asset(2, "app-20240102-bbbbbb.zip", "2024-01-02T00:00:00Z"),
        asset(3, "app-20240103-cccccc.zip", "2024-01-03T00:00:00Z"),
    ];
    let policy = RetentionPolicy::default();
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &policy);
    assert_eq!(result, Classification::default());
}

#[test]
fn zero_window_queues_every_match() {
    let assets = vec![
        asset(1, "app-20240101-aaaaaa.zip", "2024-01-01T00:00:00Z"),
        asset(2, "app-20240102-bbbbbb.zip", "2024-01-02T00:00:00Z"),
    ];
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &keep(0));
    assert_eq!(result.to_delete, vec![1, 2]);
}

#[test]
fn exact_collision_takes_precedence_and_is_not_counted() {
    // The colliding asset would also satisfy the structural branch; it must
    // be classified as a replacement only, leaving the counter untouched.
    let assets = vec![
        asset(1, NEW_NAME, "2024-06-01T00:00:00Z"),
        asset(2, "app-20240102-bbbbbb.zip", "2024-06-02T00:00:00Z"),
    ];
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &keep(1));
    assert_eq!(result.replace_id, Some(1));
    assert_eq!(result.to_delete, vec![2]);
    assert!(!result.already_released);
}

#[test]
fn current_commit_short_circuits_classification() {
    // Asset 3 would be queued for deletion if it were ever inspected; the
    // released marker on asset 2 must stop the pass before that happens.
    let assets = vec![
        asset(1, "app-20240101-aaaaaa.zip", "2024-01-01T00:00:00Z"),
        asset(2, "app-20240102-feed12.zip", "2024-01-02T00:00:00Z"),
        asset(3, "app-20240103-cccccc.zip", "2024-01-03T00:00:00Z"),
    ];
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &keep(1));
    assert!(result.already_released);
    assert_eq!(result.to_delete, vec![1]);
}

#[test]
fn commit_must_sit_right_before_the_suffix() {
    // The commit appears in the name but not as the `-<commit><suffix>`
    // tail, so this is a plain structural match, not a release of ours.
    let assets = vec![asset(1, "app-feed12-20240101.zip", "2024-01-01T00:00:00Z")];
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &keep(1));
    assert!(!result.already_released);
    assert_eq!(result.to_delete, vec![1]);
}

#[test]
fn pattern_branch_counts_matches() {
    let policy = RetentionPolicy {
        max_releases: Some(2),
        match_pattern: Some(Regex::new(r"^nightly-.*\.tar\.gz$").unwrap()),
    };
    let assets = vec![
        asset(1, "nightly-1.tar.gz", "2024-01-01T00:00:00Z"),
        asset(2, "nightly-2.tar.gz", "2024-01-02T00:00:00Z"),
        asset(3, "nightly-3.tar.gz", "2024-01-03T00:00:00Z"),
    ];
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &policy);
    assert_eq!(result.to_delete, vec![2, 3]);
}

#[test]
fn pattern_and_structural_matches_share_one_counter() {
    // One name matches the pattern, the other only the template split; the
    // second match overall is the first to be queued.
    let policy = RetentionPolicy {
        max_releases: Some(2),
        match_pattern: Some(Regex::new(r"^nightly-").unwrap()),
    };
    let assets = vec![
        asset(1, "nightly-1.tar.gz", "2024-01-01T00:00:00Z"),
        asset(2, "app-20240102-bbbbbb.zip", "2024-01-02T00:00:00Z"),
    ];
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &policy);
    assert_eq!(result.to_delete, vec![2]);
}

#[test]
fn unrelated_names_are_ignored() {
    let assets = vec![
        asset(1, "README.md", "2024-01-01T00:00:00Z"),
        asset(2, "other-20240102-bbbbbb.deb", "2024-01-02T00:00:00Z"),
    ];
    let result = classify(&assets, NEW_NAME, &template(), &commit(), &keep(0));
    assert_eq!(result, Classification::default());
}

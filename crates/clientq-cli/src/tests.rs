use chrono::{Duration, TimeZone, Utc};
use clap::Parser;
use clientq_core::auth::{AuthSession, AuthUser};
use clientq_core::models::Role;
use clientq_core::queue::QueueSnapshot;
use clientq_core::{ClientId, ClientRecord, Notification, PendingRecord};
use pretty_assertions::assert_eq;

use crate::cli::{AuthCommands, Cli, Commands, CompletionShell};
use crate::commands::common::{
    format_client_lines, format_pending_lines, join_text, preview, require_admin,
};
use crate::commands::completions::render_completions;
use crate::commands::config::{mask_secret, merge_profile};
use crate::commands::watch::describe_changes;
use crate::config_profiles::CliProfile;
use crate::error::CliError;

fn pending(id: i64, title: &str) -> PendingRecord {
    PendingRecord {
        id: ClientId::new(id),
        title: title.to_string(),
        text: format!("{title} notes"),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        created_by: "alice".to_string(),
    }
}

fn session(role: Role) -> AuthSession {
    AuthSession {
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: i64::MAX,
        user: AuthUser {
            id: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            role,
        },
    }
}

#[test]
fn preview_collapses_whitespace_and_truncates() {
    assert_eq!(preview("  two\n lines ", 20), "two lines");
    assert_eq!(preview("abcdefghij", 8), "abcde...");
}

#[test]
fn join_text_rejects_blank_input() {
    assert_eq!(
        join_text(&["New".to_string(), "customer".to_string()]).unwrap(),
        "New customer"
    );
    assert!(matches!(join_text(&[" ".to_string()]), Err(CliError::EmptyText)));
    assert!(matches!(join_text(&[]), Err(CliError::EmptyText)));
}

#[test]
fn client_lines_star_own_records() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut other = ClientRecord::from(pending(2, "Globex"));
    other.created_by = "bob".to_string();
    let clients = vec![ClientRecord::from(pending(1, "Acme")), other];

    let lines = format_client_lines(&clients, Some("alice"), now);
    assert!(lines[0].starts_with('*'));
    assert!(lines[0].contains("Acme"));
    assert!(lines[0].ends_with("2h ago"));
    assert!(lines[1].starts_with(' '));
}

#[test]
fn pending_lines_show_relative_age() {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let lines = format_pending_lines(&[pending(7, "Acme")], created + Duration::seconds(30));
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("     7"));
    assert!(lines[0].ends_with("just now"));
}

#[test]
fn admin_commands_require_admin_role() {
    assert!(require_admin(&session(Role::Admin)).is_ok());
    assert!(matches!(
        require_admin(&session(Role::User)),
        Err(CliError::AdminRequired)
    ));
}

#[test]
fn describe_changes_reports_arrivals_expiry_and_removals() {
    let empty = QueueSnapshot::default();
    let loaded = QueueSnapshot {
        pending: vec![pending(1, "Acme")],
        notifications: Vec::new(),
    };
    assert_eq!(describe_changes(&empty, &loaded), vec!["Pending #1: Acme"]);

    let streamed = QueueSnapshot {
        pending: vec![pending(2, "Globex"), pending(1, "Acme")],
        notifications: vec![Notification::for_record(&pending(2, "Globex"))],
    };
    assert_eq!(
        describe_changes(&loaded, &streamed),
        vec!["New client #2: Globex - Globex notes"]
    );

    let expired = QueueSnapshot {
        pending: streamed.pending.clone(),
        notifications: Vec::new(),
    };
    assert_eq!(
        describe_changes(&streamed, &expired),
        vec!["Notification for #2 dismissed"]
    );

    let resolved = QueueSnapshot {
        pending: vec![pending(1, "Acme")],
        notifications: Vec::new(),
    };
    assert_eq!(
        describe_changes(&expired, &resolved),
        vec!["Client #2 left the queue"]
    );
}

#[test]
fn merge_profile_prefers_flags_then_env_then_existing() {
    let existing = CliProfile {
        supabase_url: Some("https://old.supabase.co".to_string()),
        supabase_anon_key: Some("old-key".to_string()),
        clients_table: Some("clients".to_string()),
        pending_table: None,
        notification_ttl_secs: Some(5),
    };
    let explicit = CliProfile {
        supabase_url: Some(" https://new.supabase.co ".to_string()),
        notification_ttl_secs: Some(10),
        ..CliProfile::default()
    };

    let merged = merge_profile(explicit, &existing, |key| {
        (key == "SUPABASE_ANON_KEY").then(|| "env-key".to_string())
    });

    assert_eq!(merged.supabase_url.as_deref(), Some("https://new.supabase.co"));
    assert_eq!(merged.supabase_anon_key.as_deref(), Some("env-key"));
    assert_eq!(merged.clients_table.as_deref(), Some("clients"));
    assert_eq!(merged.pending_table, None);
    assert_eq!(merged.notification_ttl_secs, Some(10));
}

#[test]
fn mask_secret_hides_most_of_the_key() {
    assert_eq!(mask_secret("abc"), "***");
    assert_eq!(mask_secret("eyJhbGciOiJIUzI1NiJ9"), "eyJhbG***");
}

#[test]
fn approve_parses_numeric_id() {
    let cli = Cli::try_parse_from(["clientq", "approve", "42"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Approve { id }) if id == ClientId::new(42)));
    assert!(Cli::try_parse_from(["clientq", "reject", "abc"]).is_err());
}

#[test]
fn signup_accepts_admin_flag_and_global_profile() {
    let cli = Cli::try_parse_from([
        "clientq",
        "auth",
        "signup",
        "--email",
        "a@example.com",
        "--password",
        "secret",
        "--admin",
        "--profile",
        "work",
    ])
    .unwrap();
    let Some(Commands::Auth {
        command: AuthCommands::Signup { admin, profile, .. },
    }) = cli.command
    else {
        panic!("expected auth signup");
    };
    assert!(admin);
    assert_eq!(profile.as_deref(), Some("work"));
}

#[test]
fn completions_mention_binary_name() {
    let rendered = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(rendered.contains("clientq"));
}

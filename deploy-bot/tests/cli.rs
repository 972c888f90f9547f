use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary with an empty environment, no log file and no `.env` in reach.
fn bot(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("deploy-bot").expect("Binary exists");
    cmd.current_dir(workdir.path())
        .env_clear()
        .env("LOG_FILE", "");
    cmd
}

#[test]
fn check_env_prints_masked_json_report() {
    let workdir = TempDir::new().unwrap();
    let script = workdir.path().join("lune_sync.luau");
    std::fs::write(&script, "-- sync").unwrap();

    let output = bot(&workdir)
        .arg("check-env")
        .env("DISCORD_TOKEN", "discord-token-value")
        .env("GITHUB_TOKEN", "ghp_abcdefghijkl")
        .env("GITHUB_REPO", "owner/repo")
        .env("ROBLOX_API_KEY", "key")
        .env("PLACE_ID", "111")
        .env("UNIVERSE_ID", "0")
        .env("LUNE_SCRIPT_PATH", &script)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(report["GITHUB_TOKEN"], "ghp_...ijkl");
    assert_eq!(report["DISCORD_TOKEN"], "disc...alue");
    assert_eq!(report["ROBLOX_API_KEY"], "***");
    assert_eq!(report["GITHUB_REPO"], "owner/repo");
    assert_eq!(report["validations"]["place_id_positive"], true);
    assert_eq!(report["validations"]["universe_id_positive"], false);
    assert_eq!(report["validations"]["lune_script_exists"], true);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("ghp_abcdefghijkl"), "secrets never printed");
}

#[test]
fn sync_without_github_token_fails() {
    let workdir = TempDir::new().unwrap();
    bot(&workdir)
        .arg("sync")
        .env("GITHUB_REPO", "owner/repo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}

#[test]
fn run_without_discord_token_fails_before_connecting() {
    let workdir = TempDir::new().unwrap();
    bot(&workdir)
        .arg("run")
        .env("GITHUB_TOKEN", "ghp_abcdefghijkl")
        .env("GITHUB_REPO", "owner/repo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DISCORD_TOKEN"));
}

#[test]
fn bare_invocation_starts_the_bot() {
    let workdir = TempDir::new().unwrap();
    bot(&workdir)
        .env("GITHUB_TOKEN", "ghp_abcdefghijkl")
        .env("GITHUB_REPO", "owner/repo")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DISCORD_TOKEN"))
        .stderr(predicate::str::contains("Usage").not());
}

#[test]
fn malformed_place_id_fails() {
    let workdir = TempDir::new().unwrap();
    bot(&workdir)
        .arg("sync")
        .env("GITHUB_TOKEN", "ghp_abcdefghijkl")
        .env("GITHUB_REPO", "owner/repo")
        .env("PLACE_ID", "12ab")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PLACE_ID must be a valid integer"));
}

#[test]
fn file_command_prints_repository_file() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/repos/owner/repo/contents/data/items.json")
        .match_header("authorization", "token ghp_abcdefghijkl")
        .with_status(200)
        .with_body(r#"{"encoding":"base64","content":"eyJzd29yZCI6MX0K\n"}"#)
        .create();

    let workdir = TempDir::new().unwrap();
    bot(&workdir)
        .args(["file", "data/items.json"])
        .env("GITHUB_TOKEN", "ghp_abcdefghijkl")
        .env("GITHUB_REPO", "owner/repo")
        .env("GITHUB_API_URL", server.url())
        .assert()
        .success()
        .stdout("{\"sword\":1}\n");
    mock.assert();
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use deploy_bot::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Some(Commands::CheckEnv),
    };
    run(cli).await.expect("check-env never fails");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

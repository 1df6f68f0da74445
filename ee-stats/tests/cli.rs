use assert_cmd::Command;
use predicates::prelude::*;
use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

#[test]
fn missing_publisher_id_prints_usage_and_fails() {
    let tmp = tempfile::tempdir().unwrap();
    Command::cargo_bin("ee-stats")
        .expect("Binary exists")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn invalid_publisher_id_fails_before_any_work() {
    let tmp = tempfile::tempdir().unwrap();
    Command::cargo_bin("ee-stats")
        .expect("Binary exists")
        .current_dir(tmp.path())
        .arg("../escape")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid publisher id"));
    assert!(!tmp.path().join("data").exists());
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// A `gsutil` stand-in serving `gs://` objects from a local directory.
    fn fake_gsutil(dir: &Path) -> PathBuf {
        let script = dir.join("fake-gsutil");
        fs::write(
            &script,
            r#"#!/bin/sh
src="$2"
dest="$3"
path="$FAKE_BUCKET/${src#gs://}"
if [ ! -f "$path" ]; then
  echo "CommandException: No URLs matched: $src" >&2
  exit 1
fi
cp "$path" "$dest"
"#,
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn put(bucket: &Path, object: &str, content: &str) {
        let path = bucket.join(object);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn end_to_end_run_writes_sorted_output() {
        let tmp = tempfile::tempdir().unwrap();
        let bucket = tmp.path().join("bucket");
        put(
            &bucket,
            "earthengine-stats/providers/acme/index.txt",
            "gs://stats/acme/earthengine_stats_b.csv\n\ngs://stats/acme/earthengine_stats_a.csv\n",
        );
        put(
            &bucket,
            "stats/acme/earthengine_stats_a.csv",
            "Interval,Dataset,Count\n2024-02-01/2024-03-01,f/p/t/x/v/c,2\n",
        );
        put(
            &bucket,
            "stats/acme/earthengine_stats_b.csv",
            "Interval,Dataset,Count\n2024-01-01/2024-02-01,f/p/t/x/v/c,1\n",
        );
        let gsutil = fake_gsutil(tmp.path());

        Command::cargo_bin("ee-stats")
            .expect("Binary exists")
            .current_dir(tmp.path())
            .env("FAKE_BUCKET", &bucket)
            .env("EE_STATS_GSUTIL", &gsutil)
            .args(["acme", "--skip-login", "--concurrency", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Combined 2 files"));

        let combined = fs::read_to_string(tmp.path().join("data/acme-combined.csv")).unwrap();
        assert_eq!(
            combined,
            "Start,End,Folder,Project,Type,Product,Version,ImageCollection,Count\n\
             2024-01-01,2024-02-01,f,p,t,x,v,c,1\n\
             2024-02-01,2024-03-01,f,p,t,x,v,c,2\n"
        );
    }

    #[test]
    fn partial_download_failure_exits_non_zero_but_writes_output() {
        let tmp = tempfile::tempdir().unwrap();
        let bucket = tmp.path().join("bucket");
        put(
            &bucket,
            "earthengine-stats/providers/acme/index.txt",
            "gs://stats/acme/earthengine_stats_a.csv\ngs://stats/acme/earthengine_stats_gone.csv\n",
        );
        put(
            &bucket,
            "stats/acme/earthengine_stats_a.csv",
            "Interval,Count\n2024,1\n",
        );
        let gsutil = fake_gsutil(tmp.path());
        let config = tmp.path().join("config.yaml");
        fs::write(&config, "download:\n  retries: 0\n").unwrap();

        Command::cargo_bin("ee-stats")
            .expect("Binary exists")
            .current_dir(tmp.path())
            .env("FAKE_BUCKET", &bucket)
            .env("EE_STATS_GSUTIL", &gsutil)
            .arg("acme")
            .arg("--skip-login")
            .arg("--config")
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("earthengine_stats_gone.csv"));

        assert!(tmp.path().join("data/acme-combined.csv").is_file());
    }

    #[test]
    fn failed_login_aborts_with_message() {
        let tmp = tempfile::tempdir().unwrap();
        Command::cargo_bin("ee-stats")
            .expect("Binary exists")
            .current_dir(tmp.path())
            .env("EE_STATS_GCLOUD", "false")
            .arg("acme")
            .assert()
            .failure()
            .stderr(predicate::str::contains("not logged in"));
        assert!(!tmp.path().join("data").exists());
    }
}

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let msg = format!("{:?}", event);
        self.events.lock().unwrap().push(msg);
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

    use clap::Parser;
    use ee_stats::cli::{run, Cli};

    // An empty publisher id fails validation right after the first event.
    let cli = Cli::parse_from(["ee-stats", ""]);
    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

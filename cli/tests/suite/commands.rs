use std::path::Path;

use anyhow::Result;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn census_command(workdir: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("repo-census")?;
    cmd.current_dir(workdir)
        .env_remove("GITHUB_TOKEN")
        .env_remove("GH_TOKEN")
        .env_remove("RUST_LOG")
        .arg("--color")
        .arg("never");
    Ok(cmd)
}

/// Config whose clone command writes a one-line file instead of running git.
fn write_fake_clone_config(workdir: &Path) -> Result<()> {
    std::fs::write(
        workdir.join("census.toml"),
        r#"
clone_command = ["sh", "-c", "case \"$1\" in *missing*) echo 'fatal: repository not found' >&2; exit 128;; esac; echo line > \"$2/f.txt\"", "sh"]
"#,
    )?;
    Ok(())
}

#[test]
fn sample_without_source_fails() -> Result<()> {
    let workdir = TempDir::new()?;

    census_command(workdir.path())?
        .arg("sample")
        .assert()
        .failure()
        .stderr(contains("repository source not found"));

    assert!(!workdir.path().join("clone_test_results.csv").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn sample_writes_results_and_logs() -> Result<()> {
    let workdir = TempDir::new()?;
    write_fake_clone_config(workdir.path())?;
    std::fs::write(
        workdir.path().join("repositorios_k6.csv"),
        "repositório,stars\ngrafana/k6,25000\ngrafana/missing,1\ngrafana/xk6,3\n",
    )?;

    census_command(workdir.path())?
        .args(["sample", "--sample-size", "2"])
        .assert()
        .success()
        .stdout(contains("Cloning grafana/k6 -> "))
        .stdout(contains("Cloned grafana/k6 OK: lines=1 time="))
        .stdout(contains(
            "Clone failed for grafana/missing (exit=128). See clone_logs/grafana__missing.log",
        ))
        .stdout(contains(
            "Done. Results saved to clone_test_results.csv. Logs in clone_logs/",
        ));

    let results = std::fs::read_to_string(workdir.path().join("clone_test_results.csv"))?;
    let statuses: Vec<_> = results
        .lines()
        .skip(1)
        .map(|line| line.split(',').take(3).collect::<Vec<_>>().join(","))
        .collect();
    assert_eq!(
        statuses,
        vec!["grafana/k6,ok,1", "grafana/missing,clone_failed,0"]
    );
    assert!(workdir.path().join("clone_logs/grafana__k6.log").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn retry_is_idempotent() -> Result<()> {
    let workdir = TempDir::new()?;
    write_fake_clone_config(workdir.path())?;
    let args = ["retry", "grafana/k6", "grafana/missing", "grafana/xk6"];

    census_command(workdir.path())?
        .args(args)
        .assert()
        .success()
        .stdout(contains("Retrying 3 repos with timeout=600s and workers=2..."))
        .stdout(contains("OK: grafana/k6 lines=1 popularity=0"))
        .stdout(contains("FAIL: grafana/missing reason=clone_failed: fatal: repository not found"))
        .stdout(contains("Done. Added 2 repos to scripts/processed_k6_repos.csv."))
        .stdout(contains("Failures:"))
        .stdout(contains("- grafana/missing: clone_failed: fatal: repository not found"));

    let processed = workdir.path().join("scripts/processed_k6_repos.csv");
    let first = std::fs::read_to_string(&processed)?;

    census_command(workdir.path())?
        .args(args)
        .assert()
        .success()
        .stdout(contains("Done. Added 0 repos to scripts/processed_k6_repos.csv."));

    let second = std::fs::read_to_string(&processed)?;
    assert_eq!(first, second);
    assert_eq!(second.lines().count(), 3);
    assert!(second.contains("grafana/k6,https://github.com/grafana/k6,0,1"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn retry_reads_list_file() -> Result<()> {
    let workdir = TempDir::new()?;
    write_fake_clone_config(workdir.path())?;
    std::fs::write(
        workdir.path().join("failed.txt"),
        "# from last night\ngrafana/k6\n\ngrafana/xk6\n",
    )?;

    census_command(workdir.path())?
        .args(["retry", "--workers", "1", "--list", "failed.txt"])
        .assert()
        .success()
        .stdout(contains("Retrying 2 repos with timeout=600s and workers=1..."))
        .stdout(contains("Done. Added 2 repos"));
    Ok(())
}

#[test]
fn retry_without_repositories_fails() -> Result<()> {
    let workdir = TempDir::new()?;

    census_command(workdir.path())?
        .arg("retry")
        .assert()
        .failure()
        .stderr(contains("no repositories to retry"));
    Ok(())
}

#[test]
fn unknown_config_key_is_reported() -> Result<()> {
    let workdir = TempDir::new()?;
    std::fs::write(workdir.path().join("census.toml"), "max_worker = 3\n")?;

    census_command(workdir.path())?
        .arg("sample")
        .assert()
        .failure()
        .stderr(contains("failed to parse config"));
    Ok(())
}

use assert_cmd::Command;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("bookshelf-cli").unwrap();
    cmd.env_remove("RUST_LOG").env("BOOKSHELF_ENV", "local");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let output = cli().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("migrate"));
}

#[test]
fn migrate_applies_schema_once() {
    let db = std::env::temp_dir().join(format!("bookshelf-cli-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&db);
    let url = format!("sqlite://{}", db.display());

    let first = cli()
        .args(["--database-url", &url, "migrate"])
        .output()
        .unwrap();
    assert!(first.status.success());
    assert!(String::from_utf8_lossy(&first.stdout).contains("applied 1 migration(s)"));

    let second = cli()
        .args(["--database-url", &url, "migrate"])
        .output()
        .unwrap();
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).contains("applied 0 migration(s)"));

    let _ = std::fs::remove_file(&db);
}

#[test]
fn unknown_environment_fails() {
    cli().env("BOOKSHELF_ENV", "qa").arg("migrate").assert().failure();
}

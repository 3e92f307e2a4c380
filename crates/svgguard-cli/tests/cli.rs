use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CLEAN: &str = "<svg viewBox=\"0 0 10 10\"><rect width=\"10\" height=\"10\"/></svg>\n";
const DIRTY: &str = "<svg><rect onclick=\"steal()\"/></svg>";

fn package(files: &[(&str, &str)]) -> Result<TempDir, Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(dir)
}

fn svgguard() -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("svgguard")?;
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn clean_package_passes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = package(&[("assets/logo.svg", CLEAN)])?;
    svgguard()?
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(fs::read_to_string(dir.path().join("assets/logo.svg"))?, CLEAN);
    Ok(())
}

#[test]
fn dirty_file_is_rewritten_with_warning() -> Result<(), Box<dyn std::error::Error>> {
    let dir = package(&[("assets/icon.svg", DIRTY)])?;
    svgguard()?
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "warning: The markup in assets/icon.svg has been edited for security reasons.",
        ));
    assert_eq!(
        fs::read_to_string(dir.path().join("assets/icon.svg"))?,
        "<svg><rect/></svg>"
    );
    Ok(())
}

#[test]
fn check_mode_reports_without_writing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = package(&[("icon.svg", DIRTY)])?;
    svgguard()?
        .arg("--check")
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("would sanitise icon.svg"));
    assert_eq!(fs::read_to_string(dir.path().join("icon.svg"))?, DIRTY);
    Ok(())
}

#[test]
fn unparseable_file_fails_with_json_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = package(&[("broken.svg", "<svg><g></svg>")])?;
    let output = svgguard()?
        .args(["--json", "--jobs", "2"])
        .arg(dir.path())
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let errors: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(errors[0]["class"], "ValidationError");
    assert_eq!(errors[0]["key"], "unparseable_svg");
    assert_eq!(errors[0]["data"]["file"], "broken.svg");
    Ok(())
}

#[test]
fn locale_file_overrides_messages() -> Result<(), Box<dyn std::error::Error>> {
    let dir = package(&[("icon.svg", DIRTY)])?;
    let locales = TempDir::new()?;
    let catalog = locales.path().join("fr.json");
    fs::write(
        &catalog,
        r#"{"txt.apps.admin.warning.app_build.sanitised_svg": "Le balisage de %{file} a été modifié."}"#,
    )?;
    svgguard()?
        .arg("--locale-file")
        .arg(&catalog)
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Le balisage de icon.svg a été modifié."));
    Ok(())
}

#[test]
fn file_over_size_limit_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = package(&[("big.svg", CLEAN)])?;
    svgguard()?
        .args(["--max-size", "8"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("big.svg could not be parsed"));
    Ok(())
}

#[test]
fn missing_directory_is_a_usage_failure() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    svgguard()?
        .arg(dir.path().join("nope"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("is not a directory"));
    Ok(())
}

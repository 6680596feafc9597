use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_site(source: &Path) -> std::io::Result<()> {
    fs::create_dir_all(source.join("posts"))?;
    fs::write(
        source.join("_site.toml"),
        r#"
author = "Wendy Testaburger"
title = "Test Blog"
base_url = "https://example.com/"
"#,
    )?;
    fs::write(
        source.join("generate.toml"),
        r#"
[[paths]]
name = "source"
pattern = "/#slug"
kind = "page"

[[paths]]
name = "homepage"
pattern = "/"
kind = "paginated"
per_page = 1
order_by = ["-published"]

[[paths]]
name = "year"
pattern = "/#year/"
kind = "calendar_year"

[[paths]]
name = "feed"
pattern = "/index.atom"
kind = "atom"
"#,
    )?;
    fs::write(
        source.join("posts/hello.markdown"),
        "---\ntitle = \"Hello & welcome\"\npublished = 2015-12-25T12:30:00Z\n---\nFirst *post*.\n",
    )?;
    fs::write(
        source.join("posts/again.toml"),
        "title = \"Again\"\npublished = 2016-02-29T12:30:00Z\nbody = \"<p>Second.</p>\"\n",
    )?;
    fs::write(source.join("site.css"), "body {}\n")?;
    Ok(())
}

#[test]
fn generate_writes_html_feed_and_assets() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_site(&dir.path().join("source"))?;

    #[allow(deprecated)]
    Command::cargo_bin("flourish")?
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .success();

    let output = dir.path().join("output");
    let hello = fs::read_to_string(output.join("posts/hello.html"))?;
    assert!(hello.contains("<em>post</em>"));
    assert!(hello.contains("&copy; 2015\u{2013}2016 Wendy Testaburger"));

    let index = fs::read_to_string(output.join("index.html"))?;
    assert!(index.contains("href=\"/posts/again\""));
    assert!(index.contains("Page 1 of 2"));
    assert!(output.join("page-2.html").exists());

    let year = fs::read_to_string(output.join("2016/index.html"))?;
    assert!(year.contains("<h1>2016</h1>"));
    assert!(year.contains("February"));

    let feed = fs::read_to_string(output.join("index.atom"))?;
    assert!(feed.contains("<id>https://example.com/posts/hello</id>"));
    assert!(feed.contains("Hello &amp; welcome"));

    assert_eq!(fs::read_to_string(output.join("site.css"))?, "body {}\n");
    Ok(())
}

#[test]
fn generate_single_path_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("source");
    let output = dir.path().join("public");
    write_site(&source)?;

    #[allow(deprecated)]
    Command::cargo_bin("flourish")?
        .args(["--source", source.to_str().unwrap()])
        .args(["--output", output.to_str().unwrap()])
        .args(["generate", "--format", "json", "/posts/again"])
        .assert()
        .success();

    let written = fs::read_to_string(output.join("posts/again.html"))?;
    let written: Value = serde_json::from_str(&written)?;
    assert_eq!(written["template"], "page.html");
    assert_eq!(written["context"]["title"], "Again");
    assert_eq!(written["context"]["current_path"], "/posts/again");
    assert!(!output.join("index.html").exists());
    Ok(())
}

#[test]
fn generate_reports_missing_site_config() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("source"))?;

    #[allow(deprecated)]
    Command::cargo_bin("flourish")?
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load site"));
    Ok(())
}

#[test]
fn future_flags_conflict() -> Result<(), Box<dyn std::error::Error>> {
    #[allow(deprecated)]
    Command::cargo_bin("flourish")?
        .args(["generate", "--include-future", "--exclude-future"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
    Ok(())
}

#[test]
fn generate_logs_each_diagnostic_once() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let source = dir.path().join("source");
    write_site(&source)?;
    fs::write(source.join("ghost.bio.html"), "<p>Boo.</p>")?;

    #[allow(deprecated)]
    let assert = Command::cargo_bin("flourish")?
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .success();

    let stderr = String::from_utf8(assert.get_output().stderr.clone())?;
    assert_eq!(stderr.matches("has no document \"ghost\"").count(), 1);
    assert!(stderr.contains("Finished with"));
    Ok(())
}

use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(), Box<dyn std::error::Error>>;

fn retroarc() -> Result<Command, Box<dyn std::error::Error>> {
    Ok(Command::cargo_bin("retroarc")?)
}

#[test]
fn add_list_extract() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let story: Vec<u8> = b"all work and no play makes jack a dull boy. ".repeat(500);
    let story_path = temp_dir.path().join("story.txt");
    let arc_path = temp_dir.path().join("test.arc");
    std::fs::write(&story_path, &story)?;

    retroarc()?
        .arg("add")
        .arg(&arc_path)
        .arg(&story_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 files"));

    retroarc()?
        .arg("list")
        .arg(&arc_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("story.txt"));

    let out_dir = temp_dir.path().join("out");
    std::fs::create_dir(&out_dir)?;
    retroarc()?
        .arg("extract")
        .arg(&arc_path)
        .arg("-d")
        .arg(&out_dir)
        .assert()
        .success();
    assert_eq!(std::fs::read(out_dir.join("story.txt"))?, story);
    Ok(())
}

#[test]
fn print_and_delete() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let verse = b"tyger tyger, burning bright, in the forests of the night\n".repeat(100);
    let verse_path = temp_dir.path().join("verse.txt");
    let other_path = temp_dir.path().join("other.txt");
    let arc_path = temp_dir.path().join("test.arc");
    std::fs::write(&verse_path, &verse)?;
    std::fs::write(&other_path, b"nothing to see here\n")?;

    retroarc()?
        .arg("add")
        .arg(&arc_path)
        .arg(&verse_path)
        .arg(&other_path)
        .assert()
        .success();

    retroarc()?
        .arg("print")
        .arg(&arc_path)
        .arg("verse.txt")
        .assert()
        .success()
        .stdout(predicate::str::contains("===== verse.txt ====="))
        .stdout(predicate::str::contains("tyger tyger"));

    retroarc()?
        .arg("delete")
        .arg(&arc_path)
        .arg("verse.txt")
        .assert()
        .success()
        .stderr(predicate::str::contains("1 files"));

    retroarc()?
        .arg("list")
        .arg(&arc_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("verse.txt").not())
        .stdout(predicate::str::contains("other.txt"));
    Ok(())
}

#[test]
fn wildcard_extract() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let arc_path = temp_dir.path().join("test.arc");
    let txt_path = temp_dir.path().join("notes.txt");
    let bin_path = temp_dir.path().join("image.bin");
    let notes = b"remember to water the plants. ".repeat(200);
    std::fs::write(&txt_path, &notes)?;
    std::fs::write(&bin_path, [0u8, 1, 2, 3].repeat(64))?;

    retroarc()?
        .arg("add")
        .arg(&arc_path)
        .arg(&txt_path)
        .arg(&bin_path)
        .assert()
        .success();

    let out_dir = temp_dir.path().join("out");
    std::fs::create_dir(&out_dir)?;
    retroarc()?
        .arg("extract")
        .arg(&arc_path)
        .arg("*.txt")
        .arg("-d")
        .arg(&out_dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 files"));
    assert!(out_dir.join("notes.txt").exists());
    assert!(!out_dir.join("image.bin").exists());
    Ok(())
}

#[test]
fn add_rejects_wildcards() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let arc_path = temp_dir.path().join("test.arc");
    retroarc()?
        .arg("add")
        .arg(&arc_path)
        .arg("*.txt")
        .assert()
        .failure();
    Ok(())
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line tests for the `docucap` binary.

#![allow(deprecated)] // cargo_bin deprecation

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;

/// Write a 400x300 photo of a light page on a dark desk.
fn page_photo(dir: &Path) -> PathBuf {
    let image = RgbImage::from_fn(400, 300, |x, y| {
        let on_page = (60..340).contains(&x) && (50..250).contains(&y);
        if on_page { Rgb([232, 230, 225]) } else { Rgb([28, 30, 35]) }
    });
    let path = dir.join("page.png");
    image.save(&path).unwrap();
    path
}

fn docucap() -> Command {
    Command::cargo_bin("docucap").unwrap()
}

#[test]
fn analyze_prints_one_record_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let photo = page_photo(dir.path());

    let output = docucap()
        .args(["analyze", "--frames", "4"])
        .arg(&photo)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(output).unwrap();
    let records: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r["corners"].as_array().map(Vec::len) == Some(8)));
    assert_eq!(records[0]["stability_score"], 0.0);
}

#[test]
fn analyze_rejects_bad_rotation() {
    let dir = tempfile::tempdir().unwrap();
    let photo = page_photo(dir.path());

    docucap()
        .args(["analyze", "--rotate", "45"])
        .arg(&photo)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rotation must be"));
}

#[test]
fn missing_image_is_reported() {
    docucap()
        .args(["analyze", "/nonexistent/page.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn enhance_with_explicit_corners_writes_rectified_image() {
    let dir = tempfile::tempdir().unwrap();
    let photo = page_photo(dir.path());
    let out = dir.path().join("scan.png");

    docucap()
        .arg("enhance")
        .arg(&photo)
        .arg("--output")
        .arg(&out)
        .args(["--corners", "60,50,340,50,340,250,60,250", "--mode", "sauvola"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"width\":280"));

    let written = image::open(&out).unwrap();
    assert_eq!((written.width(), written.height()), (280, 200));
}

#[test]
fn enhance_honours_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let photo = page_photo(dir.path());
    let out = dir.path().join("sized.png");

    docucap()
        .arg("enhance")
        .arg(&photo)
        .arg("-o")
        .arg(&out)
        .args(["--corners", "60,50,340,50,340,250,60,250"])
        .args(["--width", "210", "--height", "297"])
        .assert()
        .success();

    let written = image::open(&out).unwrap();
    assert_eq!((written.width(), written.height()), (210, 297));
}

#[test]
fn enhance_with_guide_crops_upright_page() {
    let dir = tempfile::tempdir().unwrap();
    let photo = page_photo(dir.path());
    let out = dir.path().join("guide.png");

    docucap()
        .arg("enhance")
        .arg(&photo)
        .arg("-o")
        .arg(&out)
        .args(["--guide", "40,30,360,270", "--mode", "whiten"])
        .assert()
        .success();

    let written = image::open(&out).unwrap();
    assert_eq!((written.width(), written.height()), (320, 240));
}

#[test]
fn corners_and_guide_conflict() {
    docucap()
        .args(["enhance", "page.png", "-o", "out.png"])
        .args(["--corners", "0,0,1,0,1,1,0,1", "--guide", "0,0,1,1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let photo = page_photo(dir.path());
    let config = dir.path().join("engine.json");
    std::fs::write(&config, r#"{"quality": {"stability_window": 0}}"#).unwrap();

    docucap()
        .arg("--config")
        .arg(&config)
        .arg("analyze")
        .arg(&photo)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn partial_config_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let photo = page_photo(dir.path());
    let config = dir.path().join("engine.json");
    std::fs::write(&config, r#"{"detector": {"canny_low": 20.0}}"#).unwrap();

    docucap()
        .arg("-c")
        .arg(&config)
        .arg("analyze")
        .arg(&photo)
        .assert()
        .success()
        .stdout(predicate::str::contains("document_found"));
}

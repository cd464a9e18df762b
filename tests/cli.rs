use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use rstest::*;

const DATASET: &str = "tests/dataset";

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

/// 为测试图片生成颜色向量
#[fixture]
fn conf_dir() -> TempDir {
    let conf_dir = TempDir::new().unwrap();
    Command::cargo_bin("antipode")
        .unwrap()
        .arg("-c")
        .arg(conf_dir.path())
        .args(["add", DATASET, "--kind", "color", "--delay-ms", "0"])
        .assert()
        .success();
    conf_dir
}

#[rstest]
fn stats_after_add(conf_dir: TempDir) -> Result<()> {
    cargo_run!("antipode", "-c", conf_dir.path(), "stats", "--output-format", "json")
        .success()
        .stdout(predicate::str::contains(r#""totalImages": 5"#))
        .stdout(predicate::str::contains(r#""withColor": 5"#))
        .stdout(predicate::str::contains(r#""withClip": 0"#));
    Ok(())
}

#[rstest]
fn add_twice_skips(conf_dir: TempDir) -> Result<()> {
    cargo_run!("antipode", "-c", conf_dir.path(), "add", DATASET, "--kind", "color", "--delay-ms", "0")
        .success();
    cargo_run!("antipode", "-c", conf_dir.path(), "stats", "--output-format", "json")
        .success()
        .stdout(predicate::str::contains(r#""totalImages": 5"#));
    Ok(())
}

#[rstest]
fn search_color_similar(conf_dir: TempDir) -> Result<()> {
    cargo_run!(
        "antipode",
        "-c",
        conf_dir.path(),
        "search",
        "red.ppm",
        "--domain",
        "color",
        "--strangers",
        "0",
        "--image-dir",
        DATASET
    )
    .success()
    .stdout(predicate::str::starts_with("0.5000\tsplit.ppm"))
    // green.ppm 带有 no-similar 标签
    .stdout(predicate::str::contains("green.ppm").not())
    .stdout(predicate::str::contains("red.ppm").not());
    Ok(())
}

#[rstest]
fn search_hex(conf_dir: TempDir) -> Result<()> {
    cargo_run!("antipode", "-c", conf_dir.path(), "search", "--hex", "#0000ff", "--image-dir", DATASET)
        .success()
        .stdout(predicate::str::is_match(r"^[0-9.]+\tblue\.ppm")?);
    Ok(())
}

#[rstest]
fn antipode_complementary(conf_dir: TempDir) -> Result<()> {
    cargo_run!(
        "antipode",
        "-c",
        conf_dir.path(),
        "antipode",
        "blue.ppm",
        "--domain",
        "color",
        "--method",
        "complementary",
        "--image-dir",
        DATASET
    )
    .success()
    .stdout(predicate::str::starts_with("# Complementary"))
    .stdout(predicate::str::is_match(r"\n[0-9.]+\tyellow\.ppm\n")?);
    Ok(())
}

#[rstest]
#[case::histogram("histogram")]
#[case::lightness("lightness")]
#[case::negative("negative")]
fn antipode_color_methods(conf_dir: TempDir, #[case] method: &str) -> Result<()> {
    cargo_run!(
        "antipode",
        "-c",
        conf_dir.path(),
        "antipode",
        "red.ppm",
        "--domain",
        "color",
        "--method",
        method,
        "--output-format",
        "json",
        "--image-dir",
        DATASET
    )
    .success()
    .stdout(predicate::str::contains(format!(r#""method": "{method}""#)))
    .stdout(predicate::str::contains(r#""imageId": "red.ppm""#).not());
    Ok(())
}

#[rstest]
fn antipode_invalid_method(conf_dir: TempDir) -> Result<()> {
    cargo_run!(
        "antipode",
        "-c",
        conf_dir.path(),
        "antipode",
        "blue.ppm",
        "--domain",
        "clip",
        "--method",
        "complementary"
    )
    .failure()
    .stderr(predicate::str::contains("negate, stranger, otherwise, reflectroid"));
    Ok(())
}

#[rstest]
fn clip_without_embedding(conf_dir: TempDir) -> Result<()> {
    cargo_run!("antipode", "-c", conf_dir.path(), "search", "red.ppm", "--domain", "clip")
        .failure()
        .stderr(predicate::str::contains("red.ppm"));
    Ok(())
}

#[test]
fn count_out_of_range() -> Result<()> {
    let conf_dir = TempDir::new()?;
    cargo_run!("antipode", "-c", conf_dir.path(), "search", "red.ppm", "--count", "21").failure();
    Ok(())
}

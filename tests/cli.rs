//! 命令行集成测试

use std::fs;
use std::path::Path;

use assert_cmd::Command;

const CONFIG_VARS: [&str; 8] = [
    "SHOPIFY_STORE_DOMAIN",
    "SHOPIFY_ADMIN_ACCESS_TOKEN",
    "SHOPIFY_API_VERSION",
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
    "OPENAI_BASE_URL",
    "TRANSLATION_CACHE",
    "RUST_LOG",
];

/// 在空目录中运行，避免读取到开发者的 `.env`
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("catalog-translate").unwrap();
    cmd.current_dir(dir).env("NO_COLOR", "1");
    for var in CONFIG_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_env_docs_lists_variables() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli(dir.path()).arg("env-docs").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SHOPIFY_ADMIN_ACCESS_TOKEN"));
    assert!(stdout.contains("TRANSLATION_CACHE"));
    println!("✅ env-docs printed {} bytes", stdout.len());
}

#[test]
fn test_help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli(dir.path()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for sub in ["translate", "register", "fetch", "env-docs"] {
        assert!(stdout.contains(sub), "{} missing from help", sub);
    }
}

#[test]
fn test_register_requires_store_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli(dir.path())
        .args(["register", "--id", "1", "--title-en", "Phone"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SHOPIFY_STORE_DOMAIN"), "stderr: {}", stderr);
    println!("✅ Missing store configuration aborts the run");
}

#[test]
fn test_register_needs_an_input_source() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli(dir.path()).arg("register").output().unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_translate_without_api_key_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("products.json");
    fs::write(&input, r#"[{"id": "1", "title_ar": "هاتف"}]"#).unwrap();

    let output = cli(dir.path())
        .args(["translate", "--in", "products.json"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("OPENAI_API_KEY"), "stderr: {}", stderr);
    assert!(!dir.path().join("products_translated.json").exists());
    println!("✅ Missing API key aborts before any record is processed");
}

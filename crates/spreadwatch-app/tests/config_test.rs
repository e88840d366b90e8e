//! Configuration file loading with environment overrides.

use spreadwatch_app::{AppConfig, AppError};

#[test]
fn test_load_file_with_env_override() {
    let path = std::env::temp_dir().join(format!("spreadwatch-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        r#"
        [api]
        base_url = "https://admin.example.com/api"
        timeout_ms = 5000

        [[tables]]
        name = "exchanges"
        endpoint = "/admin/exchanges"
        sort_cycle = "two_way"
        columns = [{ field = "name", kind = "text" }]
        "#,
    )
    .unwrap();

    std::env::set_var("SPREADWATCH__API__TIMEOUT_MS", "2500");
    let loaded = AppConfig::load(&path);
    std::env::remove_var("SPREADWATCH__API__TIMEOUT_MS");
    std::fs::remove_file(&path).ok();

    let config = loaded.unwrap();
    assert_eq!(config.api.base_url, "https://admin.example.com/api");
    assert_eq!(config.api.timeout_ms, 2500);
    assert_eq!(config.tables.len(), 1);
    assert_eq!(config.tables[0].name, "exchanges");

    assert!(matches!(
        AppConfig::load("/nonexistent/spreadwatch.toml"),
        Err(AppError::Config(_))
    ));
}

#[test]
fn test_load_keeps_label_key_case() {
    let path = std::env::temp_dir().join(format!("spreadwatch-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(
        &path,
        r#"
        [labels]
        "View.Users" = "Users"
        createdAt = "Joined"
        "value.yes" = "Y"
        "#,
    )
    .unwrap();

    let loaded = AppConfig::load(&path);
    std::fs::remove_file(&path).ok();

    let labels = loaded.unwrap().labels;
    assert_eq!(labels.get("View.Users").map(String::as_str), Some("Users"));
    assert_eq!(labels.get("createdAt").map(String::as_str), Some("Joined"));
    assert_eq!(labels.get("value.yes").map(String::as_str), Some("Y"));
    assert!(!labels.contains_key("createdat"));
    assert_eq!(labels.len(), 3);
}

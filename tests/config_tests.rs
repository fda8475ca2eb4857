//! Configuration loading tests. These mutate process environment
//! variables, so they are serialized.

use poster_portal::config::{AppConfig, Env};
use serial_test::serial;

fn set(key: &str, value: &str) {
    unsafe { std::env::set_var(key, value) }
}

fn unset(key: &str) {
    unsafe { std::env::remove_var(key) }
}

#[test]
#[serial]
fn local_config_loads_with_database_url_only() {
    set("APP_ENV", "local");
    set("DATABASE_URL", "postgres://localhost:5432/poster_portal");
    unset("JWT_SECRET");
    unset("PUBLIC_BASE_URL");

    let config = AppConfig::load();

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.db_url, "postgres://localhost:5432/poster_portal");
    assert_eq!(config.s3_bucket, "poster-surfaces");
    // Sensible fallbacks for local development.
    assert_eq!(config.public_base_url, "http://localhost:3000");
    assert!(!config.jwt_secret.is_empty());
}

#[test]
#[serial]
fn explicit_base_url_and_secret_win_over_defaults() {
    set("APP_ENV", "local");
    set("DATABASE_URL", "postgres://localhost:5432/poster_portal");
    set("JWT_SECRET", "configured-secret");
    set("PUBLIC_BASE_URL", "https://posters.health.example");

    let config = AppConfig::load();

    assert_eq!(config.jwt_secret, "configured-secret");
    assert_eq!(config.public_base_url, "https://posters.health.example");

    unset("JWT_SECRET");
    unset("PUBLIC_BASE_URL");
}

#[test]
#[serial]
fn default_config_needs_no_environment() {
    let config = AppConfig::default();

    assert_eq!(config.env, Env::Local);
    assert!(config.db_url.starts_with("postgres://"));
    assert!(!config.jwt_secret.is_empty());
}

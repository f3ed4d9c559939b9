use serial_test::serial;
use std::fs;
use tempfile::tempdir;

use media_organizer::config::{CONFIG_ENV_VAR, default_config_path};
use media_organizer::{ConflictPolicy, LogLevel, load_config};

fn set_env(value: &std::path::Path) {
    unsafe {
        std::env::set_var(CONFIG_ENV_VAR, value);
    }
}

fn clear_env() {
    unsafe {
        std::env::remove_var(CONFIG_ENV_VAR);
    }
}

#[test]
#[serial]
fn env_var_selects_the_config_file() {
    let td = tempdir().unwrap();
    let cfg = td.path().join("organizer.xml");
    fs::write(
        &cfg,
        r#"<config>
  <max_concurrent_moves>5</max_concurrent_moves>
  <on_conflict>overwrite</on_conflict>
  <log_level>debug</log_level>
  <preserve_metadata>false</preserve_metadata>
</config>"#,
    )
    .unwrap();
    set_env(&cfg);

    assert_eq!(default_config_path().unwrap(), cfg);
    let loaded = load_config(None).unwrap();
    clear_env();

    assert_eq!(loaded.path.as_deref(), Some(cfg.as_path()));
    assert!(loaded.created_template.is_none());
    let c = loaded.config;
    assert_eq!(c.max_concurrent_moves, 5);
    assert_eq!(c.on_conflict, ConflictPolicy::Overwrite);
    assert_eq!(c.log_level, LogLevel::Debug);
    assert!(!c.preserve_metadata);
}

#[test]
#[serial]
fn env_var_pointing_at_a_directory_uses_config_xml_inside() {
    let td = tempdir().unwrap();
    fs::write(td.path().join("config.xml"), "<config><stats_window>7</stats_window></config>").unwrap();
    set_env(td.path());
    let loaded = load_config(None);
    clear_env();
    assert_eq!(loaded.unwrap().config.stats_window, 7);
}

#[test]
#[serial]
fn env_var_pointing_at_a_missing_file_is_an_error() {
    let td = tempdir().unwrap();
    let missing = td.path().join("nope.xml");
    set_env(&missing);
    let res = load_config(None);
    clear_env();
    let err = format!("{:#}", res.unwrap_err());
    assert!(err.contains(CONFIG_ENV_VAR), "{err}");
    assert!(!missing.exists(), "no template is written for an explicit path");
}

#[test]
#[serial]
fn explicit_path_beats_env_var() {
    let td = tempdir().unwrap();
    let env_cfg = td.path().join("env.xml");
    let flag_cfg = td.path().join("flag.xml");
    fs::write(&env_cfg, "<config><stats_window>1</stats_window></config>").unwrap();
    fs::write(&flag_cfg, "<config><stats_window>2</stats_window></config>").unwrap();
    set_env(&env_cfg);
    let loaded = load_config(Some(&flag_cfg));
    clear_env();
    assert_eq!(loaded.unwrap().config.stats_window, 2);
}

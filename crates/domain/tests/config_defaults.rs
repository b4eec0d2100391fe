use rc_domain::config::{AdvancePolicy, Config};

#[test]
fn default_catch_up_budget_is_ten_thousand() {
    let config = Config::default();
    assert_eq!(config.engine.catch_up_budget, 10_000);
}

#[test]
fn default_state_path_is_data_dir() {
    let config = Config::default();
    assert_eq!(
        config.storage.ledger_file(),
        std::path::PathBuf::from("data").join("ledger.json")
    );
}

#[test]
fn empty_file_parses_to_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.calendar.first_weekday, "sunday");
    assert_eq!(config.calendar.timezone, "UTC");
    assert_eq!(config.engine.advance_policy, AdvancePolicy::Sequential);
    assert_eq!(config.observability.log_filter, "warn");
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[calendar]
first_weekday = "monday"
timezone = "Europe/Berlin"

[engine]
catch_up_budget = 500
advance_policy = "fast_forward"

[storage]
state_path = "/var/lib/recurra"

[observability]
log_filter = "debug"
json_logs = true
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.calendar.first_weekday(), Some(chrono::Weekday::Mon));
    assert_eq!(config.calendar.tz(), chrono_tz::Europe::Berlin);
    assert_eq!(config.engine.catch_up_budget, 500);
    assert_eq!(config.engine.advance_policy, AdvancePolicy::FastForward);
    assert_eq!(
        config.storage.state_path,
        std::path::PathBuf::from("/var/lib/recurra")
    );
    assert!(config.observability.json_logs);
    assert!(config.validate().is_empty());
}

#[test]
fn config_roundtrips_through_toml() {
    let config = Config::default();
    let text = toml::to_string_pretty(&config).unwrap();
    let back: Config = toml::from_str(&text).unwrap();
    assert_eq!(back.engine.catch_up_budget, config.engine.catch_up_budget);
    assert_eq!(back.calendar.first_weekday, config.calendar.first_weekday);
}

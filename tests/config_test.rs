use fanreduce::config::{Config, EngineConfig, EngineOverrides};
use fanreduce::error::Error;

// Environment variables are process-wide, so every env case lives in one test.
#[test]
fn config_from_env_reads_engine_sizing() {
    unsafe {
        std::env::set_var("FANREDUCE_WORKERS", "3");
        std::env::set_var("FANREDUCE_INPUT_CAPACITY", "16");
        std::env::remove_var("FANREDUCE_OUTPUT_CAPACITY");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.engine.workers, 3);
    assert_eq!(config.engine.input_capacity, 16);
    assert_eq!(config.engine.output_capacity, 0);
    assert!(!config.log_level.is_empty());

    unsafe {
        std::env::set_var("FANREDUCE_WORKERS", "many");
    }
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    // Zero is left for a later layer to override; the final value is what
    // gets validated.
    unsafe {
        std::env::set_var("FANREDUCE_WORKERS", "0");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.engine.workers, 0);
    assert!(matches!(config.engine.validate(), Err(Error::Config(_))));
    let rescued = config.engine.merge(EngineOverrides {
        workers: Some(4),
        ..EngineOverrides::default()
    });
    assert!(rescued.validate().is_ok());

    unsafe {
        std::env::remove_var("FANREDUCE_WORKERS");
        std::env::remove_var("FANREDUCE_INPUT_CAPACITY");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.engine, EngineConfig::default());
}

#[test]
fn default_engine_config_is_rendezvous() {
    let config = EngineConfig::default();
    assert!(config.workers >= 1);
    assert_eq!(config.input_capacity, 0);
    assert_eq!(config.output_capacity, 0);
    assert!(config.validate().is_ok());
}

#[test]
fn engine_config_from_toml_table() {
    let config = EngineConfig::from_toml_str(
        r#"
        [engine]
        workers = 6
        output_capacity = 32
        "#,
    )
    .unwrap();

    assert_eq!(config.workers, 6);
    assert_eq!(config.input_capacity, 0);
    assert_eq!(config.output_capacity, 32);
}

#[test]
fn toml_without_engine_table_uses_defaults() {
    let config = EngineConfig::from_toml_str("").unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn toml_with_zero_workers_is_rejected() {
    let result = EngineConfig::from_toml_str("[engine]\nworkers = 0\n");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn toml_with_wrong_type_is_a_parse_error() {
    let result = EngineConfig::from_toml_str("[engine]\nworkers = \"four\"\n");
    assert!(matches!(result, Err(Error::Toml(_))));
}

#[test]
fn load_reports_missing_file() {
    let result = EngineConfig::load(std::path::Path::new("/nonexistent/fanreduce.toml"));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn load_reads_file_from_disk() {
    let path = std::env::temp_dir().join(format!("fanreduce-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "[engine]\nworkers = 2\ninput_capacity = 4\n").unwrap();

    let config = EngineConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.workers, 2);
    assert_eq!(config.input_capacity, 4);
}

// ---------------------------------------------------------------------------
// Layering
// ---------------------------------------------------------------------------

#[test]
fn file_layer_keeps_env_values_it_does_not_set() {
    let from_env = EngineConfig::default()
        .with_workers(2)
        .with_output_capacity(8);
    let file = EngineOverrides::from_toml_str("[engine]\nworkers = 6\n").unwrap();

    let merged = from_env.merge(file);
    assert_eq!(merged.workers, 6);
    assert_eq!(merged.input_capacity, 0);
    assert_eq!(merged.output_capacity, 8);
}

#[test]
fn flags_override_file_and_env() {
    let from_env = EngineConfig::default().with_input_capacity(1);
    let file = EngineOverrides::from_toml_str(
        "[engine]\nworkers = 6\ninput_capacity = 2\noutput_capacity = 3\n",
    )
    .unwrap();
    let flags = EngineOverrides {
        input_capacity: Some(9),
        ..EngineOverrides::default()
    };

    let merged = from_env.merge(file).merge(flags);
    assert_eq!(
        merged,
        EngineConfig {
            workers: 6,
            input_capacity: 9,
            output_capacity: 3,
        }
    );
}

#[test]
fn overrides_are_not_validated_on_their_own() {
    let file = EngineOverrides::from_toml_str("[engine]\nworkers = 0\n").unwrap();
    assert_eq!(file.workers, Some(0));
    assert_eq!(file.input_capacity, None);

    let merged = EngineConfig::default().merge(file);
    assert!(merged.validate().is_err());
}

#[test]
fn empty_overrides_change_nothing() {
    let base = EngineConfig::default().with_workers(3).with_input_capacity(5);
    assert_eq!(base.merge(EngineOverrides::default()), base);
}

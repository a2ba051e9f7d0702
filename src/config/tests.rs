use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_are_applied() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:8000");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.database.url.is_none());
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.cache.capacity_bytes.get(), 128 * 1024 * 1024);
    assert!(!settings.cache.hide_nsfw);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn cache_overrides_apply_to_render_command() {
    let mut raw = RawSettings::default();
    raw.cache.capacity_bytes = Some(1024);

    let args = CliArgs::parse_from([
        "boardcache",
        "render",
        "--board",
        "all",
        "--cache-capacity-bytes",
        "2048",
        "--cache-hide-nsfw",
        "true",
        "--database-url",
        "postgres://localhost/boards",
    ]);
    raw.apply_command_overrides(args.command.as_ref());
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.cache.capacity_bytes.get(), 2048);
    assert!(settings.cache.hide_nsfw);
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://localhost/boards")
    );
}

#[test]
fn zero_cache_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.capacity_bytes = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero capacity");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.capacity_bytes",
            ..
        }
    ));
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero port");
    assert!(matches!(err, LoadError::Invalid { key: "server.port", .. }));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
fn blank_database_url_is_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["boardcache"]);
    assert!(args.command.is_none());
}

#[test]
fn render_requires_a_target() {
    let result = CliArgs::try_parse_from(["boardcache", "render"]);
    assert!(result.is_err());
}

#[test]
fn render_parses_thread_target() {
    let args = CliArgs::parse_from(["boardcache", "render", "--thread", "42", "--last", "5"]);
    match args.command {
        Some(Command::Render(render)) => {
            assert_eq!(render.thread, Some(42));
            assert_eq!(render.last, 5);
            assert!(render.board.is_none());
            assert!(!render.html);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn render_rejects_thread_and_board_together() {
    let result = CliArgs::try_parse_from([
        "boardcache",
        "render",
        "--thread",
        "42",
        "--board",
        "a",
    ]);
    assert!(result.is_err());
}

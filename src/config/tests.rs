use super::*;

fn raw_with_notion() -> RawSettings {
    let mut raw = RawSettings::default();
    raw.notion.secret = Some("secret_abc".to_string());
    raw.notion.database_id = Some("db-123".to_string());
    raw
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = raw_with_notion();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw, true).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_cover_everything_but_credentials() {
    let settings = Settings::from_raw(raw_with_notion(), true).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:8000");
    assert_eq!(settings.server.max_body_bytes, 1024 * 1024);
    assert_eq!(
        settings.compiler.program,
        PathBuf::from(DEFAULT_COMPILER_PROGRAM)
    );
    assert_eq!(
        settings.compiler.work_dir,
        PathBuf::from(DEFAULT_COMPILER_WORK_DIR)
    );
    assert_eq!(settings.compiler.timeout, Duration::from_secs(60));

    let notion = settings.notion.expect("notion settings");
    assert_eq!(notion.api_base.as_str(), "https://api.notion.com/");
    assert_eq!(notion.api_version, "2022-06-28");
    assert_eq!(notion.timeout, Duration::from_secs(30));
}

#[test]
fn serving_requires_notion_secret() {
    let mut raw = RawSettings::default();
    raw.notion.database_id = Some("db-123".to_string());

    let err = Settings::from_raw(raw, true).expect_err("missing secret");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "notion.secret",
            ..
        }
    ));
}

#[test]
fn serving_requires_notion_database_id() {
    let mut raw = RawSettings::default();
    raw.notion.secret = Some("secret_abc".to_string());
    raw.notion.database_id = Some("   ".to_string());

    let err = Settings::from_raw(raw, true).expect_err("blank database id");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "notion.database_id",
            ..
        }
    ));
}

#[test]
fn compiling_does_not_need_notion() {
    let settings = Settings::from_raw(RawSettings::default(), false).expect("valid settings");
    assert!(settings.notion.is_none());
}

#[test]
fn zero_compiler_timeout_is_rejected() {
    let mut raw = raw_with_notion();
    raw.apply_compiler_overrides(&CompilerOverrides {
        timeout_seconds: Some(0),
        ..Default::default()
    });

    let err = Settings::from_raw(raw, true).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "compiler.timeout_seconds",
            ..
        }
    ));
}

#[test]
fn non_http_api_base_is_rejected() {
    let mut raw = raw_with_notion();
    raw.notion.api_base = Some("ftp://api.notion.com".to_string());

    assert!(Settings::from_raw(raw, true).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = raw_with_notion();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw, true).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["jobdesk"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_notion_flags_after_subcommand() {
    let args = CliArgs::parse_from([
        "jobdesk",
        "serve",
        "--notion-secret",
        "secret_cli",
        "--notion-database-id",
        "db-cli",
        "--server-port",
        "9000",
    ]);

    assert_eq!(args.notion.secret.as_deref(), Some("secret_cli"));
    assert_eq!(args.notion.database_id.as_deref(), Some("db-cli"));
    match args.command.expect("serve command") {
        Command::Serve(serve) => assert_eq!(serve.overrides.server_port, Some(9000)),
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_compile_arguments() {
    let args = CliArgs::parse_from([
        "jobdesk",
        "compile",
        "--compiler-program",
        "/usr/bin/lualatex",
        "resume.tex",
        "-o",
        "resume.pdf",
    ]);

    match args.command.expect("compile command") {
        Command::Compile(compile) => {
            assert_eq!(
                compile.compiler.program.as_deref(),
                Some(std::path::Path::new("/usr/bin/lualatex"))
            );
            assert_eq!(compile.input, std::path::Path::new("resume.tex"));
            assert_eq!(compile.output, std::path::Path::new("resume.pdf"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn notion_flags_feed_raw_settings() {
    let mut raw = RawSettings::default();
    raw.apply_notion_overrides(&NotionOverrides {
        secret: Some("  secret_padded  ".to_string()),
        database_id: Some("db-9".to_string()),
    });

    let notion = Settings::from_raw(raw, true)
        .expect("valid settings")
        .notion
        .expect("notion settings");
    assert_eq!(notion.secret, "secret_padded");
    assert_eq!(notion.database_id, "db-9");
}

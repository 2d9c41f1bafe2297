use super::*;
use crate::config::Config;
use crate::diagnostics::error_codes::ALL;
use crate::interpreter::{MValue, Session};
use crate::parser::SourceFile;
use clap::Parser as _;
use pretty_assertions::assert_eq;

#[test]
fn test_parse_run_arguments() {
    let cli = Cli::try_parse_from([
        "mlang", "run", "game.m", "--frames", "3", "--delta", "0.5", "--json",
    ])
    .unwrap();
    assert!(cli.json);
    match cli.command {
        Command::Run {
            file,
            entry,
            frames,
            delta,
        } => {
            assert_eq!(file, PathBuf::from("game.m"));
            assert_eq!(entry, None);
            assert_eq!(frames, Some(3));
            assert_eq!(delta, Some(0.5));
        }
        other => panic!("expected run, got {:?}", other),
    }
}

#[test]
fn test_check_defaults_to_current_directory() {
    let cli = Cli::try_parse_from(["mlang", "check"]).unwrap();
    match cli.command {
        Command::Check { paths } => assert_eq!(paths, vec![PathBuf::from(".")]),
        other => panic!("expected check, got {:?}", other),
    }
}

#[test]
fn test_run_options_override_config() {
    let mut config = Config::parse("[run]\nframes = 9\nentry = \"start\"\n").unwrap();
    let options = RunOptions {
        entry: None,
        frames: Some(2),
        delta: Some(1.0),
    };
    options.apply(&mut config);
    assert_eq!(config.run.entry, "start");
    assert_eq!(config.run.frames, 2);
    assert_eq!(config.run.frame_delta, 1.0);
}

#[test]
fn test_invocations_run_entry_then_frames() {
    let source = "main s t=0 w \"start\"\n q\nframe(dt) s t=t+dt w \"|\",t\n q\n";
    let mut session = Session::load(source, host_externs()).unwrap();
    let mut config = Config::default();
    config.run.frames = 2;
    config.run.frame_delta = 0.25;

    let outputs: Vec<String> = run_cmd::run_invocations(&mut session, &config, false)
        .map(|evaluation| evaluation.output)
        .collect();
    assert_eq!(outputs, vec!["start", "|0.25", "|0.5"]);
}

#[test]
fn test_invocations_without_main_start_at_first_command() {
    let mut session = Session::load(" w 3+4-3", host_externs()).unwrap();
    let evaluations: Vec<_> =
        run_cmd::run_invocations(&mut session, &Config::default(), false).collect();
    assert_eq!(evaluations.len(), 1);
    assert_eq!(evaluations[0].output, "4");
}

#[test]
fn test_explicit_missing_entry_is_reported() {
    let mut session = Session::load("main q\n", host_externs()).unwrap();
    let mut config = Config::default();
    config.run.entry = "start".to_string();
    let evaluation = run_cmd::run_invocations(&mut session, &config, true)
        .next()
        .unwrap();
    assert_eq!(evaluation.errors[0].code, "E4006");
}

#[test]
fn test_host_math_externs() {
    let mut session = Session::load(
        "main w $$sqrt(16),\"|\",$$abs(-2),\"|\",$$floor(2.7),\"|\",$$pow(2,10),\"|\",$$cos(0)\n",
        host_externs(),
    )
    .unwrap();
    assert_eq!(session.run_main().output, "4|2|2|1024|1");
}

#[test]
fn test_random_stays_in_range() {
    let rand = host::XorShift::new(42);
    for _ in 0..100 {
        let n = rand.sample(&[MValue::Num(6.0)]);
        assert!((0.0..6.0).contains(&n));
        assert_eq!(n, n.trunc());

        let f = rand.sample(&[]);
        assert!((0.0..1.0).contains(&f));
    }
}

#[test]
fn test_check_source_reports_parse_errors() {
    assert!(check_cmd::check_source("main w 1\n").is_empty());

    let diagnostics = check_cmd::check_source("main zz 1\n");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, "E1002");
}

#[test]
fn test_collect_sources_filters_extension() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("lib")).unwrap();
    std::fs::write(dir.path().join("b.m"), " w 1").unwrap();
    std::fs::write(dir.path().join("lib").join("a.m"), " w 2").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "").unwrap();

    let files = check_cmd::collect_sources(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(
        files,
        vec![dir.path().join("b.m"), dir.path().join("lib").join("a.m")]
    );
}

#[test]
fn test_format_variable_lists_every_defined_node() {
    let mut session = Session::load("main q\n", host_externs()).unwrap();
    session.execute_line(r#"s a=1,a(1)="x",a("k",2)="say ""hi""""#);

    let variables = session.variables();
    let (name, array) = variables[0];
    assert_eq!(
        repl_cmd::format_variable(name, array),
        vec![
            "a=1".to_string(),
            "a(1)=\"x\"".to_string(),
            "a(\"k\",2)=\"say \"\"hi\"\"\"".to_string(),
        ]
    );
}

#[test]
fn test_explain_every_error_code() {
    for code in ALL {
        let text = explain_cmd::get_error_explanation(code)
            .unwrap_or_else(|| panic!("Missing explanation for {}", code));
        assert!(text.starts_with(code));
    }
}

#[test]
fn test_explain_is_case_insensitive_and_rejects_unknown() {
    assert!(explain_cmd::get_error_explanation("e4001").is_some());
    assert!(explain_cmd::get_error_explanation("E9999").is_none());
}

#[test]
fn test_report_rendering() {
    let source = "main w 1\n zz 1\n";
    let file = SourceFile::new(PathBuf::from("demo.m"), source.to_string());
    let diagnostics = check_cmd::check_source(source);

    let rendered = report::render(
        &file,
        &diagnostics,
        miette::GraphicalTheme::unicode_nocolor(),
    );
    assert!(rendered.contains("E1002"));
    assert!(rendered.contains("demo.m"));
    assert!(rendered.contains("zz 1"));
}

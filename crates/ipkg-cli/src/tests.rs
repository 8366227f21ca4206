use super::*;
use std::path::Path;

use clap::error::ErrorKind;
use ipkg_core::{Dependencies, DependencyKind};
use ipkg_installer::{InstallOutcome, InstallReason, RegistryRecord, SiblingFailure};

use crate::render::{
    format_doctor_lines, format_empty_list_lines, format_info_lines, format_install_lines,
    format_list_line, format_mark_lines, render_status_line, resolve_output_style, Status,
};

fn id(raw: &str) -> PackageId {
    PackageId::parse(raw).expect("valid package id")
}

fn sample_record() -> RegistryRecord {
    let mut dependencies = Dependencies::new();
    dependencies.insert(id("zlib@1.2.13"), DependencyKind::Required);
    dependencies.insert(id("docs@1.0"), DependencyKind::Optional);
    RegistryRecord {
        id: 7,
        package: id("tool@2.1"),
        dependencies,
        installed_by_user: false,
        used_by: 2,
    }
}

#[test]
fn cli_parses_install_with_dependency_flag() {
    let cli = Cli::try_parse_from(["ipkg", "--root", "/tmp/r", "install", "pkg.ipkg", "--dependency"])
        .expect("must parse");
    assert_eq!(cli.root.as_deref(), Some(Path::new("/tmp/r")));
    match cli.command {
        Commands::Install { path, dependency } => {
            assert_eq!(path, Path::new("pkg.ipkg"));
            assert!(dependency);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_parses_package_ids() {
    let cli = Cli::try_parse_from(["ipkg", "remove", "tool@1.0", "--no-cascade"]).expect("must parse");
    match cli.command {
        Commands::Remove {
            package,
            no_cascade,
        } => {
            assert_eq!(package, id("tool@1.0"));
            assert!(no_cascade);
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let err = Cli::try_parse_from(["ipkg", "activate", "tool"]).expect_err("must reject");
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
}

#[test]
fn cli_list_sort_defaults_to_name() {
    let cli = Cli::try_parse_from(["ipkg", "list"]).expect("must parse");
    match cli.command {
        Commands::List { sort, reverse, .. } => {
            assert_eq!(sort, SortMethod::ByName);
            assert!(!reverse);
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let err = Cli::try_parse_from(["ipkg", "list", "--sort", "size"]).expect_err("must reject");
    assert_eq!(err.kind(), ErrorKind::ValueValidation);
}

#[test]
fn cli_mark_requires_exactly_one_reason() {
    let err = Cli::try_parse_from(["ipkg", "mark", "tool@1.0"]).expect_err("must reject");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

    let err = Cli::try_parse_from(["ipkg", "mark", "tool@1.0", "--user", "--dependency"])
        .expect_err("must reject");
    assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

    Cli::try_parse_from(["ipkg", "mark", "tool@1.0", "--dependency"]).expect("must parse");
}

#[test]
fn parse_sort_method_names_the_accepted_values() {
    assert_eq!(parse_sort_method("version"), Ok(SortMethod::ByVersion));
    let err = parse_sort_method("date").expect_err("must reject");
    assert!(err.contains("'date'"));
}

#[test]
fn resolve_output_style_prefers_plain_when_forced_or_piped() {
    assert_eq!(resolve_output_style(false, true), OutputStyle::Rich);
    assert_eq!(resolve_output_style(true, true), OutputStyle::Plain);
    assert_eq!(resolve_output_style(false, false), OutputStyle::Plain);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, Status::Ok, "installed tool@1.0"),
        "installed tool@1.0"
    );
    assert_eq!(
        render_status_line(OutputStyle::Plain, Status::Warn, "link failed"),
        "warning: link failed"
    );
}

#[test]
fn render_status_line_rich_colors_success() {
    let line = render_status_line(OutputStyle::Rich, Status::Ok, "installed tool@1.0");
    assert!(line.starts_with("\u{1b}["));
    assert!(line.contains("installed tool@1.0"));
    assert_eq!(
        render_status_line(OutputStyle::Rich, Status::Info, "deactivated tool@0.9"),
        "deactivated tool@0.9"
    );
}

#[test]
fn format_list_line_shows_state_reason_and_usage() {
    assert_eq!(
        format_list_line(&sample_record(), false),
        "tool@2.1 inactive dependency used-by=2"
    );
}

#[test]
fn format_info_lines_lists_dependencies_in_order() {
    let lines = format_info_lines(&sample_record(), true, Path::new("/roots/a/tool@2.1"));
    assert_eq!(lines[0], "Package: tool@2.1");
    assert_eq!(lines[2], "State: active");
    assert_eq!(lines[5], "Dependencies:");
    assert_eq!(lines[6], "- docs@1.0 (optional)");
    assert_eq!(lines[7], "- zlib@1.2.13 (required)");
}

#[test]
fn format_doctor_lines_reports_clean_root() {
    let lines = format_doctor_lines(Path::new("/roots/a"), &[], false);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], (Status::Ok, "no orphaned install dirs".to_string()));
}

#[test]
fn format_mark_lines_words_each_reason() {
    let package = id("tool@2.1");
    assert_eq!(
        format_mark_lines(&package, InstallReason::User),
        vec![(Status::Ok, "marked tool@2.1 as user-installed".to_string())]
    );
    assert_eq!(
        format_mark_lines(&package, InstallReason::Dependency),
        vec![(Status::Ok, "marked tool@2.1 as a dependency".to_string())]
    );
}

#[test]
fn format_empty_list_lines_is_an_info_status() {
    let lines = format_empty_list_lines();
    assert_eq!(lines, vec![(Status::Info, "No packages installed".to_string())]);
    assert_eq!(
        render_status_line(OutputStyle::Plain, lines[0].0, &lines[0].1),
        "No packages installed"
    );
}

#[test]
fn format_install_lines_warns_about_siblings_left_active() {
    let outcome = InstallOutcome {
        package: id("tool@2.0"),
        install_dir: "/roots/a/tool@2.0".into(),
        reason: InstallReason::User,
        deactivated_siblings: Vec::new(),
        sibling_failures: vec![SiblingFailure {
            package: id("tool@1.0"),
            reason: "none of its 1 activation link(s) applied".to_string(),
        }],
    };
    let lines = format_install_lines(&outcome);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].0, Status::Warn);
    assert!(lines[1].1.starts_with("could not deactivate tool@1.0"));
}

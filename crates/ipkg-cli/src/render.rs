use std::path::Path;

use anstyle::{AnsiColor, Effects, Style};
use ipkg_core::PackageId;
use ipkg_installer::{
    ActivationOutcome, InstallOutcome, InstallReason, Orphan, RegistryRecord, RemoveOutcome,
    ReplayReport,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn resolve_output_style(force_plain: bool, stdout_is_terminal: bool) -> OutputStyle {
    if force_plain || !stdout_is_terminal {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Status {
    Ok,
    Warn,
    Info,
}

pub(crate) fn print_lines(lines: &[(Status, String)], style: OutputStyle) {
    for (status, message) in lines {
        let line = render_status_line(style, *status, message);
        match status {
            Status::Warn => eprintln!("{line}"),
            Status::Ok | Status::Info => println!("{line}"),
        }
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: Status, message: &str) -> String {
    match (style, status) {
        (OutputStyle::Plain, Status::Warn) => format!("warning: {message}"),
        (OutputStyle::Plain, _) | (OutputStyle::Rich, Status::Info) => message.to_string(),
        (OutputStyle::Rich, Status::Ok) => colorize(success_style(), message),
        (OutputStyle::Rich, Status::Warn) => {
            format!("{} {message}", colorize(warning_style(), "warning:"))
        }
    }
}

fn success_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Green.into()))
}

fn warning_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::Yellow.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub(crate) fn format_root_lines(path: &Path, created: bool) -> Vec<(Status, String)> {
    let verb = if created { "created" } else { "opened" };
    vec![(Status::Ok, format!("{verb} package root {}", path.display()))]
}

pub(crate) fn format_install_lines(outcome: &InstallOutcome) -> Vec<(Status, String)> {
    let mut lines = vec![(
        Status::Ok,
        format!(
            "installed {} ({}) to {}",
            outcome.package,
            outcome.reason.as_str(),
            outcome.install_dir.display()
        ),
    )];
    for sibling in &outcome.deactivated_siblings {
        lines.push((Status::Info, format!("deactivated {sibling}")));
    }
    for failure in &outcome.sibling_failures {
        lines.push((
            Status::Warn,
            format!("could not deactivate {}: {}", failure.package, failure.reason),
        ));
    }
    lines
}

pub(crate) fn format_mark_lines(
    package: &PackageId,
    reason: InstallReason,
) -> Vec<(Status, String)> {
    let role = match reason {
        InstallReason::User => "user-installed",
        InstallReason::Dependency => "a dependency",
    };
    vec![(Status::Ok, format!("marked {package} as {role}"))]
}

pub(crate) fn format_remove_lines(outcome: &RemoveOutcome) -> Vec<(Status, String)> {
    let mut lines = vec![(Status::Ok, format!("removed {}", outcome.package))];
    for dependency in &outcome.removed_dependencies {
        lines.push((Status::Info, format!("removed unused dependency {dependency}")));
    }
    lines
}

pub(crate) fn format_activation_lines(
    outcome: &ActivationOutcome,
    verb: &str,
) -> Vec<(Status, String)> {
    let mut lines = Vec::new();
    if outcome.changed {
        lines.push((Status::Ok, format!("{verb} {}", outcome.package)));
    } else {
        lines.push((Status::Info, format!("{} is already {verb}", outcome.package)));
    }
    lines.extend(format_replay_failures(&outcome.report));
    for sibling in &outcome.deactivated_siblings {
        lines.push((Status::Info, format!("deactivated {sibling}")));
    }
    lines
}

fn format_replay_failures(report: &ReplayReport) -> Vec<(Status, String)> {
    report
        .failures
        .iter()
        .map(|failure| (Status::Warn, format!("{}: {}", failure.entry, failure.reason)))
        .collect()
}

pub(crate) fn format_empty_list_lines() -> Vec<(Status, String)> {
    vec![(Status::Info, "No packages installed".to_string())]
}

pub(crate) fn format_list_line(record: &RegistryRecord, active: bool) -> String {
    format!(
        "{} {} {} used-by={}",
        record.package,
        if active { "active" } else { "inactive" },
        record.install_reason().as_str(),
        record.used_by
    )
}

pub(crate) fn format_info_lines(
    record: &RegistryRecord,
    active: bool,
    install_dir: &Path,
) -> Vec<String> {
    let mut lines = vec![
        format!("Package: {}", record.package),
        format!("Installed by: {}", record.install_reason().as_str()),
        format!("State: {}", if active { "active" } else { "inactive" }),
        format!("Used by: {}", record.used_by),
        format!("Location: {}", install_dir.display()),
    ];
    if record.dependencies.is_empty() {
        lines.push("Dependencies: none".to_string());
    } else {
        lines.push("Dependencies:".to_string());
        for (dependency, kind) in &record.dependencies {
            lines.push(format!("- {dependency} ({})", kind.as_str()));
        }
    }
    lines
}

pub(crate) fn format_doctor_lines(
    root: &Path,
    orphans: &[Orphan],
    reclaimed: bool,
) -> Vec<(Status, String)> {
    let mut lines = vec![(Status::Info, format!("root: {}", root.display()))];
    if orphans.is_empty() {
        lines.push((Status::Ok, "no orphaned install dirs".to_string()));
        return lines;
    }
    for orphan in orphans {
        if reclaimed {
            lines.push((
                Status::Ok,
                format!("reclaimed {} ({})", orphan.package, orphan.path.display()),
            ));
        } else {
            lines.push((
                Status::Warn,
                format!("orphaned {} ({})", orphan.package, orphan.path.display()),
            ));
        }
    }
    lines
}

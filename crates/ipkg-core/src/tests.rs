use std::cmp::Ordering;
use std::path::Path;

use super::*;

fn id(raw: &str) -> PackageId {
    PackageId::parse(raw).expect("valid package id")
}

#[test]
fn package_id_round_trips_through_flat_form() {
    let parsed = id("zlib@1.2.13");
    assert_eq!(parsed.name(), "zlib");
    assert_eq!(parsed.version(), "1.2.13");
    assert_eq!(parsed.to_string(), "zlib@1.2.13");
    assert_eq!("zlib@1.2.13".parse::<PackageId>().expect("must parse"), parsed);
}

#[test]
fn package_id_rejects_malformed_input() {
    for raw in [
        "zlib",
        "@1.0",
        "zlib@",
        "../etc@1.0",
        "zlib@..",
        "z lib@1.0",
        "zlib@1.0;evil",
        "zlib@1.0(!)",
        "a/b@1.0",
    ] {
        let err = PackageId::parse(raw).expect_err("must reject malformed id");
        assert!(
            matches!(err, ManifestError::InvalidPackageId { .. }),
            "unexpected error for {raw}: {err}"
        );
    }
}

#[test]
fn package_id_splits_at_last_separator() {
    let err = PackageId::parse("scope@pkg@1.0").expect_err("name must not contain @");
    assert!(matches!(err, ManifestError::InvalidPackageId { .. }));
}

#[test]
fn parse_manifest() {
    let content = r#"{
        "name": "testpkg",
        "version": "1.0",
        "dependencies": {"zlib@1.2.13": true, "docs@1.0": false},
        "supportWindows": false,
        "supportLinux": true,
        "build": true
    }"#;

    let manifest = PackageManifest::from_json_str(content).expect("manifest should parse");
    assert_eq!(manifest.id, id("testpkg@1.0"));
    assert_eq!(manifest.name(), "testpkg");
    assert_eq!(manifest.version(), "1.0");
    assert!(manifest.support_linux);
    assert!(!manifest.support_windows);
    assert!(manifest.build);
    assert_eq!(
        manifest.dependencies.get(&id("zlib@1.2.13")),
        Some(&DependencyKind::Required)
    );
    assert_eq!(
        manifest.dependencies.get(&id("docs@1.0")),
        Some(&DependencyKind::Optional)
    );
    assert_eq!(
        manifest.required_dependencies().collect::<Vec<_>>(),
        vec![&id("zlib@1.2.13")]
    );
}

#[test]
fn parse_manifest_defaults_optional_fields() {
    let manifest = PackageManifest::from_json_str(r#"{"name": "tiny", "version": "0.1"}"#)
        .expect("manifest should parse");
    assert!(manifest.dependencies.is_empty());
    assert!(!manifest.support_linux);
    assert!(!manifest.support_windows);
    assert!(!manifest.build);
}

#[test]
fn parse_manifest_accepts_supports_aliases() {
    let manifest = PackageManifest::from_json_str(
        r#"{"name": "tool", "version": "2.0", "supportsLinux": true, "supportsWindows": true}"#,
    )
    .expect("manifest should parse");
    assert!(manifest.supports(&Platform::Linux));
    assert!(manifest.supports(&Platform::Windows));
    assert!(!manifest.supports(&Platform::Other("macos".to_string())));
}

#[test]
fn parse_manifest_rejects_malformed_dependency_key() {
    let err = PackageManifest::from_json_str(
        r#"{"name": "tool", "version": "2.0", "dependencies": {"zlib-1.2": true}}"#,
    )
    .expect_err("malformed dependency key must fail the parse");
    match err {
        ManifestError::MalformedManifest { reason, .. } => {
            assert!(reason.contains("zlib-1.2"), "reason was: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn parse_manifest_rejects_invalid_identity() {
    let err = PackageManifest::from_json_str(r#"{"name": "", "version": "2.0"}"#)
        .expect_err("empty name must fail");
    assert!(matches!(err, ManifestError::MalformedManifest { .. }));
}

#[test]
fn read_manifest_reports_missing_file() {
    let missing = std::env::temp_dir().join(format!(
        "ipkg-core-missing-manifest-{}",
        std::process::id()
    ));
    let err = PackageManifest::read_from_bundle(&missing).expect_err("no manifest on disk");
    match err {
        ManifestError::NoManifest(path) => assert_eq!(path, manifest_path(&missing)),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn serialize_dependencies_uses_flag_suffixes() {
    let mut dependencies = Dependencies::new();
    dependencies.insert(id("zlib@1.2.13"), DependencyKind::Required);
    dependencies.insert(id("docs@1.0"), DependencyKind::Optional);

    assert_eq!(
        serialize_dependencies(&dependencies),
        "docs@1.0(?);zlib@1.2.13(!)"
    );
}

#[test]
fn serialize_empty_dependencies_is_empty_string() {
    assert_eq!(serialize_dependencies(&Dependencies::new()), "");
    assert!(deserialize_dependencies("")
        .expect("empty string is the empty set")
        .is_empty());
}

#[test]
fn dependency_serialization_round_trips() {
    let mut dependencies = Dependencies::new();
    dependencies.insert(id("openssl@3.0.13"), DependencyKind::Required);
    dependencies.insert(id("ca-certs@2024.1"), DependencyKind::Optional);
    dependencies.insert(id("libz@v1"), DependencyKind::Required);

    let serialized = serialize_dependencies(&dependencies);
    let restored = deserialize_dependencies(&serialized).expect("must deserialize");
    assert_eq!(restored, dependencies);
}

#[test]
fn deserialize_dependencies_rejects_entries_without_flags() {
    for raw in [";", "zlib@1.0", "zlib@1.0(!);", "(!)", "zlib@1.0(x)"] {
        let err = deserialize_dependencies(raw).expect_err("must reject");
        assert!(
            matches!(err, ManifestError::MalformedDependencies { .. }),
            "unexpected error for {raw}: {err}"
        );
    }
}

#[test]
fn deserialize_dependencies_rejects_duplicates() {
    let err = deserialize_dependencies("zlib@1.0(!);zlib@1.0(?)").expect_err("duplicate id");
    assert!(matches!(err, ManifestError::MalformedDependencies { .. }));
}

#[test]
fn for_each_dependency_stops_at_first_error() {
    let manifest = PackageManifest::from_json_str(
        r#"{"name": "app", "version": "1.0", "dependencies": {"a@1": true, "b@1": false, "c@1": true}}"#,
    )
    .expect("manifest should parse");

    let mut seen = Vec::new();
    let result = manifest.for_each_dependency(|dependency, _| {
        seen.push(dependency.to_string());
        if dependency.name() == "b" {
            return Err("stop");
        }
        Ok(())
    });

    assert_eq!(result, Err("stop"));
    assert_eq!(seen, vec!["a@1", "b@1"]);
}

#[test]
fn platform_resolves_build_script_names() {
    let root = Path::new("bundle");
    assert_eq!(
        build_script_path(root, &Platform::Linux),
        Some(root.join(".ira").join("build"))
    );
    assert_eq!(
        build_script_path(root, &Platform::Windows),
        Some(root.join(".ira").join("build.bat"))
    );
    assert_eq!(
        build_script_path(root, &Platform::from_os("freebsd")),
        None
    );
}

#[test]
fn bundle_kind_classification() {
    assert_eq!(
        BundleKind::infer(Path::new("anything"), true),
        Some(BundleKind::Directory)
    );
    assert_eq!(
        BundleKind::infer(Path::new("tool-1.0.ipkg"), false),
        Some(BundleKind::Archive)
    );
    assert_eq!(
        BundleKind::infer(Path::new("TOOL.IPKG"), false),
        Some(BundleKind::Archive)
    );
    assert_eq!(BundleKind::infer(Path::new("tool.zip"), false), None);
    assert_eq!(BundleKind::infer(Path::new("tool"), false), None);
}

#[test]
fn lenient_semver_pads_missing_components() {
    assert_eq!(
        lenient_semver("1.0").expect("must parse").to_string(),
        "1.0.0"
    );
    assert_eq!(
        lenient_semver("v2").expect("must parse").to_string(),
        "2.0.0"
    );
    assert_eq!(
        lenient_semver("1.2-rc.1").expect("must parse").to_string(),
        "1.2.0-rc.1"
    );
    assert!(lenient_semver("latest").is_none());
    assert!(lenient_semver("1..2").is_none());
}

#[test]
fn compare_versions_orders_invalid_first() {
    assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
    assert_eq!(compare_versions("1.0.0-beta", "1.0.0"), Ordering::Less);
    assert_eq!(compare_versions("nightly", "0.0.1"), Ordering::Less);
    assert_eq!(compare_versions("nightly", "stable"), Ordering::Equal);
}

#[test]
fn sort_by_version_supports_reverse() {
    let mut ids = vec![id("tool@1.10"), id("tool@1.2"), id("tool@1.9.1")];

    SortMethod::ByVersion.sort(&mut ids, false);
    assert_eq!(
        ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["tool@1.2", "tool@1.9.1", "tool@1.10"]
    );

    SortMethod::ByVersion.sort(&mut ids, true);
    assert_eq!(
        ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["tool@1.10", "tool@1.9.1", "tool@1.2"]
    );
}

#[test]
fn sort_manifests_by_name() {
    let manifest = |name: &str, version: &str| {
        PackageManifest::from_json_str(&format!(
            r#"{{"name": "{name}", "version": "{version}"}}"#
        ))
        .expect("manifest should parse")
    };
    let mut manifests = vec![
        manifest("zsh", "5.9"),
        manifest("bash", "5.2"),
        manifest("bash", "4.4"),
    ];

    SortMethod::ByName.sort(&mut manifests, false);
    assert_eq!(
        manifests
            .iter()
            .map(|manifest| manifest.id.to_string())
            .collect::<Vec<_>>(),
        vec!["bash@4.4", "bash@5.2", "zsh@5.9"]
    );
    assert_eq!(SortMethod::parse("Version"), Some(SortMethod::ByVersion));
    assert_eq!(SortMethod::parse("size"), None);
}

use std::{
    fs,
    time::{Duration, Instant},
};

use sjl::manifest::{ManifestReport, process_manifest};
use tempfile::tempdir;

#[test]
fn upgrade_manifest_swaps_jars_in_order() {
    let dir = tempdir().unwrap();
    let lib = dir.path().join("lib");
    let staging = dir.path().join("staging");
    fs::create_dir_all(&lib).unwrap();
    fs::create_dir_all(staging.join("plugins")).unwrap();
    fs::write(lib.join("app-1.0.jar"), "old").unwrap();
    fs::create_dir_all(lib.join("plugins")).unwrap();
    fs::write(lib.join("plugins/stale.jar"), "stale").unwrap();
    fs::write(staging.join("app-1.1.jar"), "new").unwrap();
    fs::write(staging.join("plugins/fresh.jar"), "fresh").unwrap();

    // Values quoted the way the application writes them.
    let manifest = dir.path().join("restart.dat");
    fs::write(
        &manifest,
        format!(
            r#"- operation: "delete"
  file: "{old}"
- operation: "sleep"
  duration: "1"
- operation: "move"
  from: "{new}"
  to: "{target}"
- operation: "move"
  from: "{plugins_new}"
  to: "{plugins}"
"#,
            old = lib.join("app-1.0.jar").display(),
            new = staging.join("app-1.1.jar").display(),
            target = lib.join("app-1.1.jar").display(),
            plugins_new = staging.join("plugins").display(),
            plugins = lib.join("plugins").display(),
        ),
    )
    .unwrap();

    let started = Instant::now();
    let report = process_manifest(&manifest);
    assert!(started.elapsed() >= Duration::from_secs(1));

    assert_eq!(
        report,
        ManifestReport {
            applied: 4,
            skipped: 0,
            failed: 0
        }
    );
    assert!(!lib.join("app-1.0.jar").exists());
    assert_eq!(fs::read_to_string(lib.join("app-1.1.jar")).unwrap(), "new");
    assert!(!lib.join("plugins/stale.jar").exists());
    assert_eq!(
        fs::read_to_string(lib.join("plugins/fresh.jar")).unwrap(),
        "fresh"
    );
    assert!(!manifest.exists());
}

#[test]
fn processing_twice_is_a_no_op_the_second_time() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("cache");
    fs::create_dir_all(&target).unwrap();
    let manifest = dir.path().join("restart.dat");
    fs::write(
        &manifest,
        format!("- operation: delete\n  file: {}\n", target.display()),
    )
    .unwrap();

    assert_eq!(process_manifest(&manifest).applied, 1);
    assert_eq!(process_manifest(&manifest), ManifestReport::default());
}

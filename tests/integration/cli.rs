#![cfg(unix)]

#[path = "common/mod.rs"]
mod common;

use std::{fs, process::Command as StdCommand, thread, time::Duration};

use assert_cmd::Command;
use common::{AppDir, is_process_alive, wait_for_path};
use predicates::{boolean::PredicateBooleanExt, str::contains};

fn sjl(app: &AppDir) -> Command {
    let mut command = Command::new(assert_cmd::cargo::cargo_bin!("sjl"));
    command.envs(app.env());
    command
}

#[test]
fn test_action_prints_resolved_commands() {
    let app = AppDir::yaml(
        r#"
sjl:
  jvmOptions:
    Xmx256m: NULL
  arguments:
    start: ["-Dmode=start"]
"#,
    );

    sjl(&app)
        .arg("test")
        .assert()
        .success()
        .stdout(contains("config.yml"))
        .stdout(contains("launcher-1.0.jar"))
        .stdout(contains("-Xmx256m -Dmode=start com.vga.sjl.SjlBoot -background"))
        .stdout(contains("com.vga.sjl.SjlBoot stop"))
        .stdout(contains("com.vga.sjl.SjlBoot status"));

    assert!(app.invocations().is_empty());
}

#[test]
fn test_action_rejects_partial_service_identity() {
    let app = AppDir::yaml("sjl:\n  service:\n    name: demo\n");
    sjl(&app)
        .arg("test")
        .assert()
        .code(1)
        .stderr(contains("service display name is not defined in config"));
}

#[test]
fn missing_config_exits_with_failure() {
    let app = AppDir::yaml("sjl: {}\n");
    fs::remove_file(app.join("config.yml")).unwrap();

    sjl(&app)
        .arg("status")
        .assert()
        .code(1)
        .stderr(contains("Unable to determine config file location"));
    assert!(app.invocations().is_empty());
}

#[test]
fn status_returns_status_command_exit_code() {
    let app = AppDir::yaml("sjl: {}\n");
    sjl(&app).arg("STATUS").assert().code(3);

    let invocations = app.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(invocations[0].ends_with("com.vga.sjl.SjlBoot status"));
}

#[test]
fn stop_without_running_instance_succeeds() {
    let app = AppDir::yaml("sjl:\n  arguments:\n    stop: [\"-Dstop=1\"]\n");
    sjl(&app)
        .arg("stop")
        .assert()
        .success()
        .stdout(contains("Unable to stop application").not());

    let invocations = app.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(invocations[0].contains("-Dstop=1 com.vga.sjl.SjlBoot stop"));
}

#[test]
fn failed_stop_reports_and_returns_its_code() {
    let app = AppDir::yaml("sjl: {}\n");
    app.write("stop.code", "4");
    sjl(&app)
        .arg("restart")
        .assert()
        .code(4)
        .stdout(contains("Unable to stop application"));

    // Restart never reached the start command.
    assert_eq!(app.invocations().len(), 1);
}

#[test]
fn supervise_propagates_terminal_status() {
    let app = AppDir::yaml("sjl: {}\n");
    app.write("start.code", "7");

    sjl(&app).assert().code(7);
    assert!(!app.join("temp/sjl.pid").exists());
}

#[test]
fn unparseable_command_line_supervises() {
    let app = AppDir::yaml("sjl: {}\n");
    app.write("start.code", "6");

    sjl(&app)
        .arg("--bogus")
        .assert()
        .code(6)
        .stderr(contains("Ignoring command line"));
    sjl(&app).args(["stop", "extra"]).assert().code(6);

    let invocations = app.invocations();
    assert_eq!(invocations.len(), 2);
    assert!(invocations.iter().all(|line| line.ends_with("-background")));
}

#[test]
fn supervise_relaunches_after_restart_request() {
    let app = AppDir::new("config.properties", "sjl.arguments.start=-Dfrom=properties\n");
    app.write("restart.once", "");
    app.write("staged.jar", "v2");
    app.write("app.jar", "v1");

    sjl(&app).assert().success();

    let starts: Vec<_> = app
        .invocations()
        .into_iter()
        .filter(|line| line.ends_with("-background"))
        .collect();
    assert_eq!(starts.len(), 2);
    assert!(starts.iter().all(|line| line.contains("-Dfrom=properties")));
    assert_eq!(fs::read_to_string(app.join("app.jar")).unwrap(), "v2");
    assert!(!app.join("staged.jar").exists());
    assert!(!app.join("temp/restart.dat").exists());
    assert!(!app.join("temp/sjl.pid").exists());
}

#[test]
fn sigterm_stops_application_and_exits_with_signal_number() {
    let app = AppDir::yaml("sjl: {}\n");
    app.write("block", "");

    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin!("sjl"))
        .envs(app.env())
        .spawn()
        .expect("failed to spawn sjl");

    let pid_file = app.join("temp/sjl.pid");
    wait_for_path(&pid_file);
    assert_eq!(
        fs::read_to_string(&pid_file).unwrap().trim(),
        child.id().to_string()
    );
    // Give the fake runtime time to start blocking.
    thread::sleep(Duration::from_millis(300));

    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(child.id() as i32),
        nix::sys::signal::Signal::SIGTERM,
    )
    .expect("failed to signal sjl");

    let status = child.wait().expect("failed to wait for sjl");
    assert_eq!(status.code(), Some(15));
    assert!(!pid_file.exists());
    assert!(app.join("stop.flag").exists());
    assert!(!is_process_alive(child.id()));
}

#[test]
fn stop_waits_for_running_supervisor() {
    let app = AppDir::yaml("sjl: {}\n");
    app.write("block", "");

    let mut supervisor = StdCommand::new(assert_cmd::cargo::cargo_bin!("sjl"))
        .envs(app.env())
        .spawn()
        .expect("failed to spawn sjl");
    let pid_file = app.join("temp/sjl.pid");
    wait_for_path(&pid_file);

    let reaper = thread::spawn(move || supervisor.wait().expect("failed to wait for sjl"));

    sjl(&app).arg("stop").assert().success();
    assert!(!pid_file.exists());

    let status = reaper.join().unwrap();
    assert!(status.success());
}

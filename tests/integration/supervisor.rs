#![cfg(unix)]

#[path = "common/mod.rs"]
mod common;

use std::{sync::Arc, thread, time::Duration};

use common::{AppDir, wait_for_path};
use sjl::{
    error::SupervisorError,
    resolver::{Env, Resolver},
    supervisor::{ProcessRunner, Supervisor},
};

fn supervisor(app: &AppDir) -> Supervisor {
    let env = Env::from_pairs(app.env());
    Supervisor::new(Resolver::new(app.path(), env), Arc::new(ProcessRunner))
        .expect("failed to resolve launcher state")
}

#[test]
fn restart_re_resolves_config_replaced_by_the_manifest() {
    let app = AppDir::yaml("sjl:\n  arguments:\n    start: [\"-Dgeneration=1\"]\n");
    app.write(
        "staged.jar",
        "sjl:\n  arguments:\n    start: [\"-Dgeneration=2\"]\n",
    );
    app.write("restart.target", "config.yml");
    app.write("restart.once", "");

    let supervisor = supervisor(&app);
    assert_eq!(supervisor.run().unwrap(), 0);

    let starts: Vec<_> = app
        .invocations()
        .into_iter()
        .filter(|line| line.ends_with("-background"))
        .collect();
    assert_eq!(starts.len(), 2);
    assert!(starts[0].contains("-Dgeneration=1"));
    assert!(starts[1].contains("-Dgeneration=2"));
    assert_eq!(
        supervisor.state().unwrap().config.start_args,
        vec!["-Dgeneration=2"]
    );
    assert!(!app.join("staged.jar").exists());
    assert!(!app.join("temp/restart.dat").exists());
    assert!(!app.join("temp/sjl.pid").exists());
}

#[test]
fn signal_death_maps_to_shell_convention() {
    let app = AppDir::yaml("sjl: {}\n");
    app.write("start.kill", "");

    let supervisor = supervisor(&app);
    assert_eq!(supervisor.run().unwrap(), 128 + 9);
    assert!(!app.join("temp/sjl.pid").exists());
}

#[test]
fn stop_from_another_thread_ends_a_blocked_run() {
    let app = AppDir::yaml("sjl: {}\n");
    app.write("block", "");

    let supervisor = Arc::new(supervisor(&app));
    let running = Arc::clone(&supervisor);
    let handle = thread::spawn(move || running.run());

    wait_for_path(&app.join("temp/sjl.pid"));
    thread::sleep(Duration::from_millis(200));
    supervisor.request_stop();
    supervisor.stop().unwrap();

    assert_eq!(handle.join().unwrap().unwrap(), 0);
    assert!(!app.join("temp/sjl.pid").exists());
}

#[test]
fn stop_command_failure_is_reported() {
    let app = AppDir::yaml("sjl: {}\n");
    app.write("stop.code", "5");
    let supervisor = supervisor(&app);
    assert!(matches!(
        supervisor.stop(),
        Err(SupervisorError::StopFailed(5))
    ));
}

#[test]
fn spawn_failure_names_the_command() {
    let app = AppDir::yaml("sjl: {}\n");
    let env = Env::from_pairs([
        ("sjl.workingDirectory", app.path().display().to_string()),
        ("sjl.javaHome", "no-such-jre".to_string()),
    ]);
    let supervisor =
        Supervisor::new(Resolver::new(app.path(), env), Arc::new(ProcessRunner)).unwrap();

    let err = supervisor.status().unwrap_err();
    assert!(matches!(err, SupervisorError::Spawn { .. }));
    assert!(err.to_string().contains("no-such-jre"));
}

#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use sysinfo::{Pid, ProcessesToUpdate, System};
use tempfile::TempDir;

/// Stand-in for the Java runtime. Records its arguments, then acts on the
/// trailing mode token:
///
/// - start: with `restart.once` present, stages a manifest moving
///   `staged.jar` over `app.jar` (or the file named in `restart.target`) and
///   exits 2; with `start.kill` present, kills itself with SIGKILL; with
///   `block` present, waits until the stop command ran; otherwise exits with
///   `start.code` (default 0).
/// - stop: touches `stop.flag` and exits with `stop.code` (default 0).
/// - status: exits 3.
pub const FAKE_JAVA: &str = r#"#!/bin/sh
wd="$(pwd)"
echo "$@" >> "$wd/invocations.log"
for last; do :; done
case "$last" in
  -background)
    if [ -f "$wd/restart.once" ]; then
      rm -f "$wd/restart.once"
      target="$(cat "$wd/restart.target" 2>/dev/null || echo app.jar)"
      printf -- '- operation: "move"\n  from: "%s"\n  to: "%s"\n' "$wd/staged.jar" "$wd/$target" > "$wd/temp/restart.dat"
      exit 2
    fi
    if [ -f "$wd/start.kill" ]; then
      kill -9 $$
    fi
    if [ -f "$wd/block" ]; then
      while [ ! -f "$wd/stop.flag" ]; do sleep 0.1; done
    fi
    exit "$(cat "$wd/start.code" 2>/dev/null || echo 0)"
    ;;
  stop)
    touch "$wd/stop.flag"
    exit "$(cat "$wd/stop.code" 2>/dev/null || echo 0)"
    ;;
  status)
    exit 3
    ;;
esac
exit 99
"#;

/// A throwaway application directory: `lib/launcher-1.0.jar`, a config file
/// and a `jre/bin/java` script.
pub struct AppDir {
    temp: TempDir,
}

impl AppDir {
    pub fn new(config_name: &str, config: &str) -> Self {
        let temp = tempfile::tempdir().expect("failed to create tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("lib")).expect("failed to create lib dir");
        fs::write(root.join("lib/launcher-1.0.jar"), b"").expect("failed to write jar");

        let config_path = root.join(config_name);
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).expect("failed to create config dir");
        }
        fs::write(config_path, config).expect("failed to write config");

        let app = Self { temp };
        app.install_fake_java();
        app
    }

    pub fn yaml(config: &str) -> Self {
        Self::new("config.yml", config)
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(path, content).expect("failed to write file");
    }

    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.join("invocations.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn install_fake_java(&self) {
        let java = self.join("jre/bin/java");
        fs::create_dir_all(java.parent().expect("java has a parent"))
            .expect("failed to create jre dir");
        fs::write(&java, FAKE_JAVA).expect("failed to write fake java");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&java, fs::Permissions::from_mode(0o755))
                .expect("failed to chmod fake java");
        }
    }

    /// Environment pointing the launcher at this directory and its fake Java.
    pub fn env(&self) -> Vec<(String, String)> {
        vec![
            (
                "sjl.workingDirectory".to_string(),
                self.path().display().to_string(),
            ),
            ("sjl.javaHome".to_string(), "jre".to_string()),
            ("RUST_LOG".to_string(), "debug".to_string()),
        ]
    }
}

pub fn wait_for_path(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if path.exists() {
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    panic!("Timed out waiting for {:?} to exist", path);
}

pub fn is_process_alive(pid: u32) -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    system.process(Pid::from_u32(pid)).is_some()
}

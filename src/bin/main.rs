use std::{
    error::Error,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sjl::{
    cli::{Action, Cli, parse_args},
    constants::LAUNCHER_FAILURE_EXIT_CODE,
    error::{ServiceError, SupervisorError},
    resolver::{Env, Resolver},
    service::{Foreground, ServiceHost, ServiceIdentity},
    supervisor::{ProcessRunner, Supervisor},
};

fn main() {
    let args = parse_args();
    init_logging(&args);
    if let Some(reason) = &args.rejected {
        warn!("Ignoring command line ({reason}); running the application");
    }

    let code = match run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            LAUNCHER_FAILURE_EXIT_CODE
        }
    };
    process::exit(code);
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Directory holding the launcher executable; relative settings start here.
fn base_dir() -> Result<PathBuf, Box<dyn Error>> {
    let exe = std::env::current_exe()?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

fn run(args: &Cli) -> Result<i32, Box<dyn Error>> {
    let resolver = Resolver::new(base_dir()?, Env::from_process());

    match args.action() {
        Action::Test => dry_run(&resolver),
        Action::Install(flags) => install(&resolver, &flags),
        Action::Uninstall => uninstall(&resolver),
        Action::Serve => serve(resolver),
        action => {
            let supervisor = Arc::new(Supervisor::new(resolver, Arc::new(ProcessRunner))?);
            let host = Foreground::new(Arc::clone(&supervisor));

            match action {
                Action::Stop => stop(&host),
                Action::Restart => match stop(&host)? {
                    0 => supervise(&host),
                    code => Ok(code),
                },
                Action::Status => Ok(supervisor.status()?),
                _ => supervise(&host),
            }
        }
    }
}

fn supervise(host: &impl ServiceHost) -> Result<i32, Box<dyn Error>> {
    host.on_start()?;
    Ok(host.wait())
}

fn stop(host: &impl ServiceHost) -> Result<i32, Box<dyn Error>> {
    match host.on_stop() {
        Ok(()) => Ok(0),
        Err(ServiceError::Supervisor(SupervisorError::StopFailed(code))) => {
            println!("Unable to stop application");
            Ok(code)
        }
        Err(err) => Err(err.into()),
    }
}

/// Resolves everything and prints what would run.
fn dry_run(resolver: &Resolver) -> Result<i32, Box<dyn Error>> {
    let state = resolver.resolve()?;
    if !state.config.service_name.is_empty() {
        let identity = ServiceIdentity::from_config(&state.config)?;
        println!("Service:      {} ({})", identity.name, identity.display_name);
    }

    println!("Config file:  {}", state.config_file.display());
    println!("Launcher jar: {}", state.launcher_jar.display());
    println!("Pid file:     {}", state.pid_file.path().display());
    println!("Start:        {}", state.start);
    println!("Stop:         {}", state.stop);
    println!("Status:       {}", state.status);
    Ok(0)
}

#[cfg(windows)]
fn install(resolver: &Resolver, flags: &[String]) -> Result<i32, Box<dyn Error>> {
    use sjl::service::InstallOptions;

    let state = resolver.resolve()?;
    let identity = ServiceIdentity::from_config(&state.config)?;
    match InstallOptions::parse(flags) {
        Ok(options) => {
            sjl::windows::install(&identity, &options)?;
            Ok(0)
        }
        Err(err) => {
            println!("Couldn't install service: {err}");
            Ok(LAUNCHER_FAILURE_EXIT_CODE)
        }
    }
}

#[cfg(windows)]
fn uninstall(resolver: &Resolver) -> Result<i32, Box<dyn Error>> {
    let state = resolver.resolve()?;
    let identity = ServiceIdentity::from_config(&state.config)?;
    sjl::windows::uninstall(&identity.name)?;
    Ok(0)
}

#[cfg(windows)]
fn serve(resolver: Resolver) -> Result<i32, Box<dyn Error>> {
    let state = resolver.resolve()?;
    let identity = ServiceIdentity::from_config(&state.config)?;
    info!("Handing {} to the service dispatcher", identity.name);
    sjl::windows::serve(resolver, &identity.name)?;
    Ok(0)
}

#[cfg(not(windows))]
fn install(_: &Resolver, _: &[String]) -> Result<i32, Box<dyn Error>> {
    Err(ServiceError::Unsupported("install".into()).into())
}

#[cfg(not(windows))]
fn uninstall(_: &Resolver) -> Result<i32, Box<dyn Error>> {
    Err(ServiceError::Unsupported("uninstall".into()).into())
}

#[cfg(not(windows))]
fn serve(_: Resolver) -> Result<i32, Box<dyn Error>> {
    info!("Service dispatch is only available on Windows");
    Err(ServiceError::Unsupported("serve".into()).into())
}

//! Windows service control manager integration.
use std::{
    ffi::OsString,
    sync::{Arc, OnceLock},
    thread,
    time::Duration,
};

use tracing::{error, info};
use windows_service::{
    define_windows_service,
    service::{
        ServiceAccess, ServiceControl, ServiceControlAccept, ServiceErrorControl,
        ServiceExitCode, ServiceInfo, ServiceStartType, ServiceState, ServiceStatus,
        ServiceType,
    },
    service_control_handler::{self, ServiceControlHandlerResult, ServiceStatusHandle},
    service_dispatcher,
    service_manager::{ServiceManager, ServiceManagerAccess},
};

use crate::{
    constants::{LAUNCHER_FAILURE_EXIT_CODE, STOP_WAIT_HINT},
    error::ServiceError,
    resolver::Resolver,
    service::{InstallOptions, ServiceHost, ServiceIdentity, ServiceWorker, StartType},
    supervisor::{ProcessRunner, Supervisor},
};

/// Resolver handed from `serve` to the dispatcher callback.
static HOSTED: OnceLock<Resolver> = OnceLock::new();

define_windows_service!(ffi_service_main, service_main);

impl From<StartType> for ServiceStartType {
    fn from(start_type: StartType) -> Self {
        match start_type {
            StartType::Auto => ServiceStartType::AutoStart,
            StartType::Demand => ServiceStartType::OnDemand,
            StartType::Disabled => ServiceStartType::Disabled,
        }
    }
}

fn status(state: ServiceState, exit_code: i32) -> ServiceStatus {
    let controls_accepted = if state == ServiceState::Running {
        ServiceControlAccept::STOP | ServiceControlAccept::SHUTDOWN
    } else {
        ServiceControlAccept::empty()
    };
    let exit_code = match u32::try_from(exit_code) {
        Ok(0) => ServiceExitCode::Win32(0),
        Ok(code) => ServiceExitCode::ServiceSpecific(code),
        Err(_) => ServiceExitCode::ServiceSpecific(LAUNCHER_FAILURE_EXIT_CODE as u32),
    };
    let (checkpoint, wait_hint) = if state == ServiceState::StopPending {
        (1, STOP_WAIT_HINT)
    } else {
        (0, Duration::default())
    };

    ServiceStatus {
        service_type: ServiceType::OWN_PROCESS,
        current_state: state,
        controls_accepted,
        exit_code,
        checkpoint,
        wait_hint,
        process_id: None,
    }
}

fn service_main(arguments: Vec<OsString>) {
    let name = arguments
        .first()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Err(err) = run_service(&name) {
        error!("Service {name} failed: {err}");
    }
}

fn run_service(name: &str) -> Result<(), ServiceError> {
    let resolver = HOSTED
        .get()
        .cloned()
        .ok_or_else(|| ServiceError::Unsupported("service entry without serve".into()))?;

    let supervisor = Supervisor::new(resolver, Arc::new(ProcessRunner));
    let worker = match supervisor {
        Ok(supervisor) => Arc::new(ServiceWorker::new(Arc::new(supervisor))),
        Err(err) => {
            // Still report to the SCM so the failure is visible there.
            let handle =
                service_control_handler::register(name, |_| ServiceControlHandlerResult::NoError)?;
            handle.set_service_status(status(ServiceState::Stopped, LAUNCHER_FAILURE_EXIT_CODE))?;
            return Err(err.into());
        }
    };

    // Filled once registered; the handler reports StopPending through it.
    let registered: Arc<OnceLock<ServiceStatusHandle>> = Arc::new(OnceLock::new());
    let handler_handle = Arc::clone(&registered);
    let handler_worker = Arc::clone(&worker);
    let handle: ServiceStatusHandle =
        service_control_handler::register(name, move |control| match control {
            ServiceControl::Stop | ServiceControl::Shutdown => {
                if let Some(handle) = handler_handle.get()
                    && let Err(err) = handle.set_service_status(status(ServiceState::StopPending, 0))
                {
                    error!("Unable to report stop pending: {err}");
                }
                let worker = Arc::clone(&handler_worker);
                thread::spawn(move || {
                    if let Err(err) = worker.on_stop() {
                        error!("Unable to stop application: {err}");
                    }
                });
                ServiceControlHandlerResult::NoError
            }
            ServiceControl::Interrogate => ServiceControlHandlerResult::NoError,
            _ => ServiceControlHandlerResult::NotImplemented,
        })?;
    let _ = registered.set(handle);

    handle.set_service_status(status(ServiceState::Running, 0))?;
    info!("Service {name} running");

    let code = match worker.on_start() {
        Ok(()) => worker.wait(),
        Err(err) => {
            error!("Failed to start service worker: {err}");
            LAUNCHER_FAILURE_EXIT_CODE
        }
    };

    handle.set_service_status(status(ServiceState::Stopped, code))?;
    info!("Service {name} stopped with status {code}");
    Ok(())
}

/// Hands the process to the service dispatcher; returns when the service stops.
pub fn serve(resolver: Resolver, name: &str) -> Result<(), ServiceError> {
    HOSTED
        .set(resolver)
        .map_err(|_| ServiceError::Unsupported("serve called twice".into()))?;
    service_dispatcher::start(name, ffi_service_main)?;
    Ok(())
}

/// Registers this executable as a service launched with `serve`.
pub fn install(identity: &ServiceIdentity, options: &InstallOptions) -> Result<(), ServiceError> {
    let manager = ServiceManager::local_computer(
        None::<&str>,
        ServiceManagerAccess::CONNECT | ServiceManagerAccess::CREATE_SERVICE,
    )?;

    let info = ServiceInfo {
        name: OsString::from(&identity.name),
        display_name: OsString::from(&identity.display_name),
        service_type: ServiceType::OWN_PROCESS,
        start_type: options.start_type.into(),
        error_control: ServiceErrorControl::Normal,
        executable_path: std::env::current_exe()?,
        launch_arguments: vec![OsString::from("serve")],
        dependencies: vec![],
        account_name: options.account.as_ref().map(OsString::from),
        account_password: options.password.as_ref().map(OsString::from),
    };

    let service = manager.create_service(&info, ServiceAccess::CHANGE_CONFIG)?;
    service.set_description(&identity.description)?;
    info!("{} is installed", identity.name);
    Ok(())
}

/// Stops the service if needed and removes it from the service database.
pub fn uninstall(name: &str) -> Result<(), ServiceError> {
    let manager = ServiceManager::local_computer(None::<&str>, ServiceManagerAccess::CONNECT)?;
    let service = manager.open_service(
        name,
        ServiceAccess::QUERY_STATUS | ServiceAccess::STOP | ServiceAccess::DELETE,
    )?;

    if service.query_status()?.current_state != ServiceState::Stopped {
        info!("Stopping {name}");
        service.stop()?;
    }
    service.delete()?;
    info!("{name} is removed");
    Ok(())
}

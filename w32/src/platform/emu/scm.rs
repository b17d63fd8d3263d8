//! Emulated service control manager.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::constants::*;
use crate::error::{OsError, OsResult};
use crate::handle::ScHandle;
use crate::platform::{ServiceConfig, ServiceStatus};

use super::fail;

const ACCEPTS_STOP_PAUSE: u32 = 0x1 | 0x2;

struct Service {
    config: ServiceConfig,
    status: ServiceStatus,
    deleted: bool,
}

enum ScObject {
    Manager,
    Service(String),
}

struct ScmState {
    services: BTreeMap<String, Service>,
    handles: HashMap<isize, ScObject>,
    next: isize,
}

impl ScmState {
    fn service(&mut self, handle: ScHandle) -> OsResult<&mut Service> {
        let Some(ScObject::Service(name)) = self.handles.get(&handle.as_raw()) else {
            return Err(OsError(ERROR_INVALID_HANDLE));
        };
        self.services.get_mut(name).ok_or(OsError(ERROR_INVALID_HANDLE))
    }

    fn allocate(&mut self, object: ScObject) -> ScHandle {
        let raw = self.next;
        self.next += 8;
        self.handles.insert(raw, object);
        ScHandle::from_raw(raw)
    }
}

pub(super) struct ServiceManager {
    state: Mutex<ScmState>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self {
            state: Mutex::new(ScmState { services: BTreeMap::new(), handles: HashMap::new(), next: 0x5000 }),
        }
    }
}

impl ServiceManager {
    fn state(&self) -> MutexGuard<'_, ScmState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn with_service<T>(&self, handle: ScHandle, f: impl FnOnce(&mut Service) -> OsResult<T>) -> OsResult<T> {
        let mut st = self.state();
        match st.service(handle).and_then(f) {
            Ok(v) => Ok(v),
            Err(e) => fail(e.code()),
        }
    }

    pub(super) fn install(&self, name: &str, config: ServiceConfig) {
        let status = ServiceStatus {
            service_type: config.service_type,
            current_state: SERVICE_STOPPED,
            ..Default::default()
        };
        self.state().services.insert(name.to_lowercase(), Service { config, status, deleted: false });
    }

    pub(super) fn open_manager(&self) -> ScHandle {
        self.state().allocate(ScObject::Manager)
    }

    pub(super) fn open_service(&self, manager: ScHandle, name: &str) -> OsResult<ScHandle> {
        let mut st = self.state();
        if !matches!(st.handles.get(&manager.as_raw()), Some(ScObject::Manager)) {
            return fail(ERROR_INVALID_HANDLE);
        }
        let key = name.to_lowercase();
        if !st.services.get(&key).is_some_and(|s| !s.deleted) {
            return fail(ERROR_SERVICE_DOES_NOT_EXIST);
        }
        Ok(st.allocate(ScObject::Service(key)))
    }

    pub(super) fn close(&self, handle: ScHandle) -> OsResult<()> {
        let mut st = self.state();
        let Some(object) = st.handles.remove(&handle.as_raw()) else {
            return fail(ERROR_INVALID_HANDLE);
        };
        if let ScObject::Service(name) = object {
            let still_open = st.handles.values().any(|o| matches!(o, ScObject::Service(n) if *n == name));
            if !still_open && st.services.get(&name).is_some_and(|s| s.deleted) {
                st.services.remove(&name);
            }
        }
        Ok(())
    }

    pub(super) fn status(&self, handle: ScHandle) -> OsResult<ServiceStatus> {
        self.with_service(handle, |s| Ok(s.status))
    }

    pub(super) fn config(&self, handle: ScHandle) -> OsResult<ServiceConfig> {
        self.with_service(handle, |s| Ok(s.config.clone()))
    }

    pub(super) fn control(&self, handle: ScHandle, control: u32) -> OsResult<ServiceStatus> {
        self.with_service(handle, |s| {
            let state = s.status.current_state;
            let next = match control {
                SERVICE_CONTROL_STOP | SERVICE_CONTROL_SHUTDOWN if state != SERVICE_STOPPED => SERVICE_STOPPED,
                SERVICE_CONTROL_PAUSE if state == SERVICE_RUNNING => SERVICE_PAUSED,
                SERVICE_CONTROL_CONTINUE if state == SERVICE_PAUSED => SERVICE_RUNNING,
                SERVICE_CONTROL_INTERROGATE if state != SERVICE_STOPPED => state,
                SERVICE_CONTROL_STOP..=SERVICE_CONTROL_SHUTDOWN if state == SERVICE_STOPPED => {
                    return Err(OsError(ERROR_SERVICE_NOT_ACTIVE))
                }
                SERVICE_CONTROL_STOP..=SERVICE_CONTROL_SHUTDOWN => return Err(OsError(ERROR_SERVICE_CANNOT_ACCEPT_CTRL)),
                _ => return Err(OsError(ERROR_INVALID_PARAMETER)),
            };
            s.status.current_state = next;
            s.status.controls_accepted = if next == SERVICE_STOPPED { 0 } else { ACCEPTS_STOP_PAUSE };
            Ok(s.status)
        })
    }

    pub(super) fn start(&self, handle: ScHandle) -> OsResult<()> {
        self.with_service(handle, |s| {
            if s.deleted {
                return Err(OsError(ERROR_SERVICE_MARKED_FOR_DELETE));
            }
            if s.status.current_state != SERVICE_STOPPED {
                return Err(OsError(ERROR_SERVICE_ALREADY_RUNNING));
            }
            s.status.current_state = SERVICE_RUNNING;
            s.status.controls_accepted = ACCEPTS_STOP_PAUSE;
            Ok(())
        })
    }

    pub(super) fn delete(&self, handle: ScHandle) -> OsResult<()> {
        self.with_service(handle, |s| {
            if s.deleted {
                return Err(OsError(ERROR_SERVICE_MARKED_FOR_DELETE));
            }
            s.deleted = true;
            Ok(())
        })
    }
}

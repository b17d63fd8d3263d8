//! Emulated kernel objects and the handle table.
//!
//! All objects live behind one lock; every state change notifies a single
//! condition variable and waiters re-check their objects. Child processes
//! cannot notify, so waits also wake on a short poll slice.

use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{Read, Write};
use std::mem;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::constants::*;
use crate::error::{OsError, OsResult};
use crate::handle::{FindHandle, KernelHandle};
use crate::platform::{io_error_code, FindData, ProcessInfo};

use super::{fail, next_thread_id, set_last_error, thread_id};

const POLL_SLICE: Duration = Duration::from_millis(10);

type ObjectId = u64;

pub(super) struct ProcessState {
    pid: u32,
    child: Option<Child>,
    exit_code: Option<u32>,
}

impl ProcessState {
    /// Exit code once the process is gone.
    fn poll(&mut self) -> Option<u32> {
        if self.exit_code.is_none() {
            if let Some(child) = self.child.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    self.exit_code = Some(status.code().map(|c| c as u32).unwrap_or(1));
                }
            }
        }
        self.exit_code
    }
}

pub(super) struct FileObject {
    file: File,
    path: PathBuf,
    delete_on_close: bool,
}

impl FileObject {
    pub(super) fn new(file: File, path: PathBuf, delete_on_close: bool) -> Self {
        Self { file, path, delete_on_close }
    }
}

enum Body {
    Event { manual_reset: bool, signaled: bool, pulses: u64 },
    Mutex { owner: Option<u32>, recursion: u32 },
    Semaphore { count: i32, maximum: i32 },
    Process(Arc<Mutex<ProcessState>>),
    Thread(Arc<Mutex<ProcessState>>),
    File(FileObject),
    Find(VecDeque<FindData>),
}

struct Object {
    refs: usize,
    name: Option<String>,
    body: Body,
}

struct KernelState {
    next_handle: isize,
    next_object: ObjectId,
    handles: HashMap<isize, ObjectId>,
    objects: HashMap<ObjectId, Object>,
    names: HashMap<String, ObjectId>,
}

impl KernelState {
    fn insert(&mut self, name: Option<String>, body: Body) -> KernelHandle {
        let id = self.next_object;
        self.next_object += 1;
        if let Some(name) = &name {
            self.names.insert(name.clone(), id);
        }
        self.objects.insert(id, Object { refs: 0, name, body });
        self.open(id)
    }

    fn open(&mut self, id: ObjectId) -> KernelHandle {
        let raw = self.next_handle;
        self.next_handle += 4;
        self.handles.insert(raw, id);
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.refs += 1;
        }
        KernelHandle::from_raw(raw)
    }

    fn object_mut(&mut self, handle: KernelHandle) -> OsResult<&mut Object> {
        let id = *self.handles.get(&handle.as_raw()).ok_or(OsError(ERROR_INVALID_HANDLE))?;
        self.objects.get_mut(&id).ok_or(OsError(ERROR_INVALID_HANDLE))
    }

    fn close(&mut self, handle: KernelHandle) -> OsResult<Option<Object>> {
        let id = self.handles.remove(&handle.as_raw()).ok_or(OsError(ERROR_INVALID_HANDLE))?;
        let Some(obj) = self.objects.get_mut(&id) else {
            return Ok(None);
        };
        obj.refs -= 1;
        if obj.refs > 0 {
            return Ok(None);
        }
        let obj = self.objects.remove(&id);
        if let Some(name) = obj.as_ref().and_then(|o| o.name.as_ref()) {
            self.names.remove(name);
        }
        Ok(obj)
    }

    /// Resolve a named object for `Create*`: an existing object of the same
    /// kind is shared, one of another kind is an error.
    fn create_named(&mut self, name: Option<&str>, body: Body) -> OsResult<KernelHandle> {
        let Some(name) = name.filter(|n| !n.is_empty()) else {
            set_last_error(ERROR_SUCCESS);
            return Ok(self.insert(None, body));
        };
        match self.names.get(name).copied() {
            Some(id) => {
                let same_kind = self
                    .objects
                    .get(&id)
                    .is_some_and(|o| mem::discriminant(&o.body) == mem::discriminant(&body));
                if !same_kind {
                    return fail(ERROR_INVALID_HANDLE);
                }
                set_last_error(ERROR_ALREADY_EXISTS);
                Ok(self.open(id))
            }
            None => {
                set_last_error(ERROR_SUCCESS);
                Ok(self.insert(Some(name.to_string()), body))
            }
        }
    }

    fn open_named(&mut self, name: &str, probe: &Body) -> OsResult<KernelHandle> {
        let Some(id) = self.names.get(name).copied() else {
            return fail(ERROR_FILE_NOT_FOUND);
        };
        let same_kind = self
            .objects
            .get(&id)
            .is_some_and(|o| mem::discriminant(&o.body) == mem::discriminant(probe));
        if !same_kind {
            return fail(ERROR_INVALID_HANDLE);
        }
        Ok(self.open(id))
    }

    fn ready(&self, id: ObjectId, tid: u32, pulses_seen: u64) -> bool {
        let Some(obj) = self.objects.get(&id) else {
            return false;
        };
        match &obj.body {
            Body::Event { signaled, pulses, .. } => *signaled || *pulses != pulses_seen,
            Body::Mutex { owner, .. } => owner.map_or(true, |o| o == tid),
            Body::Semaphore { count, .. } => *count > 0,
            Body::Process(p) | Body::Thread(p) => lock(p).poll().is_some(),
            Body::File(_) => true,
            Body::Find(_) => false,
        }
    }

    fn acquire(&mut self, id: ObjectId, tid: u32) {
        let Some(obj) = self.objects.get_mut(&id) else {
            return;
        };
        match &mut obj.body {
            Body::Event { manual_reset: false, signaled, .. } => *signaled = false,
            Body::Mutex { owner, recursion } => {
                *owner = Some(tid);
                *recursion += 1;
            }
            Body::Semaphore { count, .. } => *count -= 1,
            _ => {}
        }
    }

    fn pulses(&self, id: ObjectId) -> u64 {
        match self.objects.get(&id).map(|o| &o.body) {
            Some(Body::Event { pulses, .. }) => *pulses,
            _ => 0,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub(super) struct Kernel {
    state: Mutex<KernelState>,
    signal: Condvar,
}

impl Default for Kernel {
    fn default() -> Self {
        Self {
            state: Mutex::new(KernelState {
                next_handle: 0x100,
                next_object: 1,
                handles: HashMap::new(),
                objects: HashMap::new(),
                names: HashMap::new(),
            }),
            signal: Condvar::new(),
        }
    }
}

impl Kernel {
    fn state(&self) -> MutexGuard<'_, KernelState> {
        lock(&self.state)
    }

    pub(super) fn open_handles(&self) -> usize {
        self.state().handles.len()
    }

    fn with_object<T>(&self, handle: KernelHandle, f: impl FnOnce(&mut Body) -> OsResult<T>) -> OsResult<T> {
        let mut st = self.state();
        let obj = match st.object_mut(handle) {
            Ok(obj) => obj,
            Err(e) => return fail(e.code()),
        };
        let out = f(&mut obj.body);
        drop(st);
        self.signal.notify_all();
        if let Err(e) = &out {
            set_last_error(e.code());
        }
        out
    }

    pub(super) fn close(&self, handle: KernelHandle) -> OsResult<()> {
        let closed = {
            let mut st = self.state();
            match st.close(handle) {
                Ok(obj) => obj,
                Err(e) => return fail(e.code()),
            }
        };
        if let Some(Object { body: Body::File(f), .. }) = closed {
            let FileObject { file, path, delete_on_close } = f;
            drop(file);
            if delete_on_close {
                if let Err(e) = std::fs::remove_file(&path) {
                    log::debug!("delete-on-close of {} failed: {e}", path.display());
                }
            }
        }
        self.signal.notify_all();
        Ok(())
    }

    pub(super) fn create_event(&self, manual_reset: bool, initial: bool, name: Option<&str>) -> OsResult<KernelHandle> {
        self.state().create_named(name, Body::Event { manual_reset, signaled: initial, pulses: 0 })
    }

    pub(super) fn open_event(&self, name: &str) -> OsResult<KernelHandle> {
        self.state().open_named(name, &Body::Event { manual_reset: false, signaled: false, pulses: 0 })
    }

    pub(super) fn set_event(&self, handle: KernelHandle, state: bool) -> OsResult<()> {
        self.with_object(handle, |body| match body {
            Body::Event { signaled, .. } => {
                *signaled = state;
                Ok(())
            }
            _ => Err(OsError(ERROR_INVALID_HANDLE)),
        })
    }

    pub(super) fn pulse_event(&self, handle: KernelHandle) -> OsResult<()> {
        self.with_object(handle, |body| match body {
            Body::Event { signaled, pulses, .. } => {
                *signaled = false;
                *pulses += 1;
                Ok(())
            }
            _ => Err(OsError(ERROR_INVALID_HANDLE)),
        })
    }

    pub(super) fn create_mutex(&self, initial_owner: bool, name: Option<&str>) -> OsResult<KernelHandle> {
        let body = if initial_owner {
            Body::Mutex { owner: Some(thread_id()), recursion: 1 }
        } else {
            Body::Mutex { owner: None, recursion: 0 }
        };
        let mut st = self.state();
        let h = st.create_named(name, body)?;
        Ok(h)
    }

    pub(super) fn open_mutex(&self, name: &str) -> OsResult<KernelHandle> {
        self.state().open_named(name, &Body::Mutex { owner: None, recursion: 0 })
    }

    pub(super) fn release_mutex(&self, handle: KernelHandle) -> OsResult<()> {
        let tid = thread_id();
        self.with_object(handle, |body| match body {
            Body::Mutex { owner, recursion } if *owner == Some(tid) => {
                *recursion -= 1;
                if *recursion == 0 {
                    *owner = None;
                }
                Ok(())
            }
            Body::Mutex { .. } => Err(OsError(ERROR_NOT_OWNER)),
            _ => Err(OsError(ERROR_INVALID_HANDLE)),
        })
    }

    pub(super) fn create_semaphore(&self, initial: i32, maximum: i32, name: Option<&str>) -> OsResult<KernelHandle> {
        if maximum <= 0 || initial < 0 || initial > maximum {
            return fail(ERROR_INVALID_PARAMETER);
        }
        self.state().create_named(name, Body::Semaphore { count: initial, maximum })
    }

    pub(super) fn open_semaphore(&self, name: &str) -> OsResult<KernelHandle> {
        self.state().open_named(name, &Body::Semaphore { count: 0, maximum: 0 })
    }

    pub(super) fn release_semaphore(&self, handle: KernelHandle, release: i32) -> OsResult<i32> {
        self.with_object(handle, |body| match body {
            Body::Semaphore { count, maximum } => {
                if release <= 0 {
                    return Err(OsError(ERROR_INVALID_PARAMETER));
                }
                if *count as i64 + release as i64 > *maximum as i64 {
                    return Err(OsError(ERROR_TOO_MANY_POSTS));
                }
                let previous = *count;
                *count += release;
                Ok(previous)
            }
            _ => Err(OsError(ERROR_INVALID_HANDLE)),
        })
    }

    /// Shared wait loop for single and multiple object waits.
    pub(super) fn wait(&self, handles: &[KernelHandle], wait_all: bool, timeout_ms: u32) -> u32 {
        if handles.is_empty() || handles.len() > MAXIMUM_WAIT_OBJECTS {
            set_last_error(ERROR_INVALID_PARAMETER);
            return WAIT_FAILED;
        }
        let tid = thread_id();
        let deadline = (timeout_ms != INFINITE).then(|| Instant::now() + Duration::from_millis(timeout_ms as u64));

        let mut st = self.state();
        let mut ids = Vec::with_capacity(handles.len());
        for h in handles {
            match st.handles.get(&h.as_raw()).copied() {
                Some(id) if !matches!(st.objects.get(&id).map(|o| &o.body), Some(Body::Find(_))) => ids.push(id),
                _ => {
                    set_last_error(ERROR_INVALID_HANDLE);
                    return WAIT_FAILED;
                }
            }
        }
        if wait_all && ids.iter().enumerate().any(|(i, id)| ids[..i].contains(id)) {
            set_last_error(ERROR_INVALID_PARAMETER);
            return WAIT_FAILED;
        }
        let seen: Vec<u64> = ids.iter().map(|id| st.pulses(*id)).collect();

        loop {
            if wait_all {
                if ids.iter().zip(&seen).all(|(id, p)| st.ready(*id, tid, *p)) {
                    for id in &ids {
                        st.acquire(*id, tid);
                    }
                    drop(st);
                    self.signal.notify_all();
                    return WAIT_OBJECT_0;
                }
            } else if let Some(i) = ids.iter().zip(&seen).position(|(id, p)| st.ready(*id, tid, *p)) {
                st.acquire(ids[i], tid);
                drop(st);
                self.signal.notify_all();
                return WAIT_OBJECT_0 + i as u32;
            }

            let slice = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if now >= d {
                        return WAIT_TIMEOUT;
                    }
                    (d - now).min(POLL_SLICE)
                }
                None => POLL_SLICE,
            };
            st = match self.signal.wait_timeout(st, slice) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub(super) fn spawn(&self, mut command: Command) -> OsResult<ProcessInfo> {
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        let child = match command.spawn() {
            Ok(c) => c,
            Err(e) => return fail(io_error_code(&e).code()),
        };
        let pid = child.id();
        let state = Arc::new(Mutex::new(ProcessState { pid, child: Some(child), exit_code: None }));
        let mut st = self.state();
        let process = st.insert(None, Body::Process(state.clone()));
        let thread = st.insert(None, Body::Thread(state));
        Ok(ProcessInfo { process, thread, process_id: pid, thread_id: next_thread_id() })
    }

    pub(super) fn open_process(&self, pid: u32) -> OsResult<KernelHandle> {
        let mut st = self.state();
        let existing = st.objects.iter().find_map(|(id, o)| match &o.body {
            Body::Process(p) if lock(p).pid == pid => Some(*id),
            _ => None,
        });
        if let Some(id) = existing {
            return Ok(st.open(id));
        }
        if pid == std::process::id() {
            let state = ProcessState { pid, child: None, exit_code: None };
            return Ok(st.insert(None, Body::Process(Arc::new(Mutex::new(state)))));
        }
        drop(st);
        fail(ERROR_INVALID_PARAMETER)
    }

    pub(super) fn terminate_process(&self, handle: KernelHandle, exit_code: u32) -> OsResult<()> {
        self.with_object(handle, |body| {
            let Body::Process(p) = body else {
                return Err(OsError(ERROR_INVALID_HANDLE));
            };
            let mut p = lock(p);
            if p.poll().is_some() {
                return Err(OsError(ERROR_ACCESS_DENIED));
            }
            let Some(child) = p.child.as_mut() else {
                // The emulator never terminates its own host process.
                return Err(OsError(ERROR_ACCESS_DENIED));
            };
            child.kill().map_err(|e| io_error_code(&e))?;
            let _ = child.wait();
            p.exit_code = Some(exit_code);
            Ok(())
        })
    }

    pub(super) fn exit_code_process(&self, handle: KernelHandle) -> OsResult<u32> {
        self.with_object(handle, |body| match body {
            Body::Process(p) => Ok(lock(p).poll().unwrap_or(STILL_ACTIVE)),
            _ => Err(OsError(ERROR_INVALID_HANDLE)),
        })
    }

    pub(super) fn insert_file(&self, file: FileObject) -> KernelHandle {
        self.state().insert(None, Body::File(file))
    }

    pub(super) fn read_file(&self, handle: KernelHandle, len: u32) -> OsResult<Vec<u8>> {
        self.with_object(handle, |body| match body {
            Body::File(f) => {
                let mut buf = Vec::new();
                (&mut f.file).take(len as u64).read_to_end(&mut buf).map_err(|e| io_error_code(&e))?;
                Ok(buf)
            }
            _ => Err(OsError(ERROR_INVALID_HANDLE)),
        })
    }

    pub(super) fn write_file(&self, handle: KernelHandle, data: &[u8]) -> OsResult<u32> {
        self.with_object(handle, |body| match body {
            Body::File(f) => {
                f.file.write_all(data).map_err(|e| io_error_code(&e))?;
                Ok(data.len() as u32)
            }
            _ => Err(OsError(ERROR_INVALID_HANDLE)),
        })
    }

    pub(super) fn insert_find(&self, rest: VecDeque<FindData>) -> FindHandle {
        FindHandle::from_raw(self.state().insert(None, Body::Find(rest)).as_raw())
    }

    pub(super) fn find_next(&self, handle: FindHandle) -> OsResult<FindData> {
        self.with_object(KernelHandle::from_raw(handle.as_raw()), |body| match body {
            Body::Find(rest) => rest.pop_front().ok_or(OsError(ERROR_NO_MORE_FILES)),
            _ => Err(OsError(ERROR_INVALID_HANDLE)),
        })
    }

    pub(super) fn find_close(&self, handle: FindHandle) -> OsResult<()> {
        let handle = KernelHandle::from_raw(handle.as_raw());
        let is_find = matches!(
            self.state().object_mut(handle).map(|o| &o.body),
            Ok(Body::Find(_))
        );
        if !is_find {
            return fail(ERROR_INVALID_HANDLE);
        }
        self.close(handle)
    }
}

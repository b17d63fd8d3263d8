//! In-memory registry hive.
//!
//! Names compare case-insensitively and enumerate in lexical order of their
//! lower-cased form. Registry calls report status codes directly and leave
//! the thread's last-error code alone.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::constants::*;
use crate::error::{OsError, OsResult};
use crate::handle::RegKey;
use crate::platform::RegRead;

const ERROR_KEY_DELETED: u32 = 1018;

#[derive(Default)]
struct Node {
    name: String,
    subkeys: BTreeMap<String, Node>,
    values: BTreeMap<String, Value>,
}

struct Value {
    name: String,
    kind: u32,
    data: Vec<u8>,
}

impl Node {
    fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    fn descend(&self, path: &[String]) -> Option<&Node> {
        path.iter().try_fold(self, |node, part| node.subkeys.get(part))
    }

    fn descend_mut(&mut self, path: &[String]) -> Option<&mut Node> {
        path.iter().try_fold(self, |node, part| node.subkeys.get_mut(part))
    }
}

struct OpenKey {
    root: isize,
    path: Vec<String>,
}

struct HiveState {
    roots: HashMap<isize, Node>,
    open: HashMap<isize, OpenKey>,
    next_key: isize,
    reads: usize,
}

fn split(subkey: &str) -> Vec<(String, String)> {
    subkey
        .split('\\')
        .filter(|p| !p.is_empty())
        .map(|p| (p.to_lowercase(), p.to_string()))
        .collect()
}

impl HiveState {
    /// Root and lower-cased path of an open or predefined key.
    fn locate(&self, key: RegKey) -> OsResult<(isize, Vec<String>)> {
        if key.is_predefined() {
            return Ok((key.as_raw(), Vec::new()));
        }
        match self.open.get(&key.as_raw()) {
            Some(k) => Ok((k.root, k.path.clone())),
            None => Err(OsError(ERROR_INVALID_HANDLE)),
        }
    }

    fn node(&self, key: RegKey) -> OsResult<&Node> {
        let (root, path) = self.locate(key)?;
        self.roots
            .get(&root)
            .and_then(|r| r.descend(&path))
            .ok_or(OsError(ERROR_KEY_DELETED))
    }

    fn node_mut(&mut self, key: RegKey) -> OsResult<&mut Node> {
        let (root, path) = self.locate(key)?;
        self.roots
            .get_mut(&root)
            .and_then(|r| r.descend_mut(&path))
            .ok_or(OsError(ERROR_KEY_DELETED))
    }

    fn allocate(&mut self, root: isize, path: Vec<String>) -> RegKey {
        let raw = self.next_key;
        self.next_key += 4;
        self.open.insert(raw, OpenKey { root, path });
        RegKey::from_raw(raw)
    }
}

pub(super) struct Hive {
    state: Mutex<HiveState>,
}

impl Default for Hive {
    fn default() -> Self {
        let roots = [
            (RegKey::CLASSES_ROOT, "HKEY_CLASSES_ROOT"),
            (RegKey::CURRENT_USER, "HKEY_CURRENT_USER"),
            (RegKey::LOCAL_MACHINE, "HKEY_LOCAL_MACHINE"),
            (RegKey::USERS, "HKEY_USERS"),
            (RegKey::CURRENT_CONFIG, "HKEY_CURRENT_CONFIG"),
        ]
        .into_iter()
        .map(|(k, name)| (k.as_raw(), Node::named(name)))
        .collect();
        Self {
            state: Mutex::new(HiveState { roots, open: HashMap::new(), next_key: 0x2000, reads: 0 }),
        }
    }
}

impl Hive {
    fn state(&self) -> MutexGuard<'_, HiveState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of value reads served so far.
    pub(super) fn reads(&self) -> usize {
        self.state().reads
    }

    pub(super) fn open(&self, root: RegKey, subkey: &str) -> OsResult<RegKey> {
        let mut st = self.state();
        let (base_root, mut path) = st.locate(root)?;
        st.node(root)?;
        path.extend(split(subkey).into_iter().map(|(lower, _)| lower));
        let exists = st.roots.get(&base_root).and_then(|r| r.descend(&path)).is_some();
        if !exists {
            return Err(OsError(ERROR_FILE_NOT_FOUND));
        }
        Ok(st.allocate(base_root, path))
    }

    pub(super) fn create(&self, root: RegKey, subkey: &str) -> OsResult<RegKey> {
        let mut st = self.state();
        let (base_root, mut path) = st.locate(root)?;
        let mut node = st.node_mut(root)?;
        for (lower, display) in split(subkey) {
            node = node.subkeys.entry(lower.clone()).or_insert_with(|| Node::named(&display));
            path.push(lower);
        }
        Ok(st.allocate(base_root, path))
    }

    pub(super) fn close(&self, key: RegKey) -> OsResult<()> {
        if key.is_predefined() {
            return Ok(());
        }
        match self.state().open.remove(&key.as_raw()) {
            Some(_) => Ok(()),
            None => Err(OsError(ERROR_INVALID_HANDLE)),
        }
    }

    pub(super) fn query(&self, key: RegKey, name: &str, buf: &mut [u8]) -> OsResult<RegRead> {
        let mut st = self.state();
        st.reads += 1;
        let node = st.node(key)?;
        let value = node.values.get(&name.to_lowercase()).ok_or(OsError(ERROR_FILE_NOT_FOUND))?;
        if buf.len() < value.data.len() {
            return Ok(RegRead::MoreData { kind: value.kind, needed: value.data.len() });
        }
        buf[..value.data.len()].copy_from_slice(&value.data);
        Ok(RegRead::Complete { kind: value.kind, len: value.data.len() })
    }

    pub(super) fn set(&self, key: RegKey, name: &str, kind: u32, data: &[u8]) -> OsResult<()> {
        let mut st = self.state();
        let node = st.node_mut(key)?;
        node.values.insert(name.to_lowercase(), Value { name: name.to_string(), kind, data: data.to_vec() });
        Ok(())
    }

    pub(super) fn delete_value(&self, key: RegKey, name: &str) -> OsResult<()> {
        let mut st = self.state();
        let node = st.node_mut(key)?;
        match node.values.remove(&name.to_lowercase()) {
            Some(_) => Ok(()),
            None => Err(OsError(ERROR_FILE_NOT_FOUND)),
        }
    }

    pub(super) fn delete_key(&self, root: RegKey, subkey: &str, recursive: bool) -> OsResult<()> {
        let mut parts: Vec<String> = split(subkey).into_iter().map(|(lower, _)| lower).collect();
        let Some(leaf) = parts.pop() else {
            return Err(OsError(ERROR_ACCESS_DENIED));
        };
        let mut st = self.state();
        let parent = st
            .node_mut(root)?
            .descend_mut(&parts)
            .ok_or(OsError(ERROR_FILE_NOT_FOUND))?;
        let has_children = match parent.subkeys.get(&leaf) {
            Some(node) => !node.subkeys.is_empty(),
            None => return Err(OsError(ERROR_FILE_NOT_FOUND)),
        };
        if has_children && !recursive {
            return Err(OsError(ERROR_ACCESS_DENIED));
        }
        parent.subkeys.remove(&leaf);
        Ok(())
    }

    pub(super) fn enum_key(&self, key: RegKey, index: u32) -> OsResult<String> {
        let st = self.state();
        let node = st.node(key)?;
        node.subkeys
            .values()
            .nth(index as usize)
            .map(|n| n.name.clone())
            .ok_or(OsError(ERROR_NO_MORE_ITEMS))
    }

    pub(super) fn enum_value(&self, key: RegKey, index: u32) -> OsResult<String> {
        let st = self.state();
        let node = st.node(key)?;
        node.values
            .values()
            .nth(index as usize)
            .map(|v| v.name.clone())
            .ok_or(OsError(ERROR_NO_MORE_ITEMS))
    }
}

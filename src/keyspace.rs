use crate::skiplist::SkipList;
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use redis_module::Context;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::sync::Mutex;

pub type FastHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;

static KEYSPACE: Lazy<Mutex<FastHashMap<String, SkipList>>> =
    Lazy::new(|| Mutex::new(FastHashMap::default()));

pub fn with_write<F, R>(ctx: Option<&Context>, key: &str, f: F) -> R
where
    F: FnOnce(&mut SkipList) -> R,
{
    let mut map = KEYSPACE.lock().unwrap();
    let existed = map.contains_key(key);
    let list = map.entry(key.to_owned()).or_default();
    let result = f(list);
    if !existed && !list.is_empty() {
        if let Some(c) = ctx {
            let k = c.create_string(key);
            let redis_key = c.open_key_writable(&k);
            let _ = redis_key.set_value(
                &crate::command::SLSET_TYPE,
                crate::memory::SlSetRef {
                    key: key.to_owned(),
                },
            );
        }
    }
    if list.is_empty() {
        map.remove(key);
        if let Some(c) = ctx {
            let k = c.create_string(key);
            let redis_key = c.open_key_writable(&k);
            let _ = redis_key.delete();
        }
    }
    result
}

pub fn with_read<F, R>(key: &str, f: F) -> R
where
    F: FnOnce(&SkipList) -> R,
{
    let map = KEYSPACE.lock().unwrap();
    f(map.get(key).unwrap_or(&SkipList::default()))
}

pub fn contains(key: &str) -> bool {
    KEYSPACE.lock().unwrap().contains_key(key)
}

/// Remove all stored lists, typically in response to FLUSHDB/FLUSHALL events.
pub fn clear_all() {
    KEYSPACE.lock().unwrap().clear();
}

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn note_poisoned(target: &'static str, op: &'static str, kind: &'static str) {
    warn!(
        op,
        target_module = target,
        lock_kind = kind,
        result = "poisoned_recovered",
        hint = "store contents may be stale after a panic in another task",
        "Recovered from poisoned cache lock"
    );
}

pub(crate) fn read_guard<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            note_poisoned(target, op, "rwlock.read");
            poisoned.into_inner()
        }
    }
}

pub(crate) fn write_guard<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            note_poisoned(target, op, "rwlock.write");
            poisoned.into_inner()
        }
    }
}

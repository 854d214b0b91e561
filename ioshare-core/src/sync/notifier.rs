// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! ReleaseNotifier - cross-process "something was released" doorbell.
//!
//! A 32-bit epoch counter in its own shared memory object. Releasers bump
//! the epoch and wake sleepers; waiters sleep until the epoch moves and
//! then re-check their condition. On Linux the sleep is a shared futex
//! wait, elsewhere a short sleep.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::error::ShmError;
use crate::shm::Mapping;
use crate::types::ObjectName;

/// Upper bound on a single sleep. A releaser that dies between bumping the
/// epoch and waking costs a waiter at most this long.
const MAX_SLEEP: Duration = Duration::from_millis(50);

/// Shared epoch counter with blocking wait.
pub struct ReleaseNotifier {
    mapping: Mapping,
}

impl ReleaseNotifier {
    /// Create the backing object or attach to an existing one.
    pub fn open(name: &ObjectName) -> Result<Self, ShmError> {
        let mapping = Mapping::create_or_attach(name, std::mem::size_of::<AtomicU32>())?;
        Ok(Self { mapping })
    }

    /// Remove the backing object name.
    pub fn unlink(name: &ObjectName) -> Result<(), ShmError> {
        Mapping::unlink(name)
    }

    /// Get the name of the backing object.
    pub fn name(&self) -> &ObjectName {
        self.mapping.name()
    }

    fn epoch(&self) -> &AtomicU32 {
        // SAFETY: the mapping is page aligned, at least four bytes long and
        // lives as long as `self`. All access goes through the atomic.
        unsafe { &*(self.mapping.as_ptr() as *const AtomicU32) }
    }

    /// Announce a release to every waiter in every process.
    pub fn notify(&self) {
        self.epoch().fetch_add(1, Ordering::Release);
        wake_all(self.epoch());
    }

    /// Block until `ready` returns true.
    ///
    /// `ready` is evaluated after the epoch is sampled, so a release that
    /// happens between the check and the sleep ends the sleep immediately.
    pub fn wait_until<E>(&self, mut ready: impl FnMut() -> Result<bool, E>) -> Result<(), E> {
        loop {
            let seen = self.epoch().load(Ordering::Acquire);
            if ready()? {
                return Ok(());
            }
            sleep_while_unchanged(self.epoch(), seen, MAX_SLEEP);
        }
    }
}

#[cfg(target_os = "linux")]
fn sleep_while_unchanged(word: &AtomicU32, seen: u32, timeout: Duration) {
    let ts = libc::timespec {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_nsec: timeout.subsec_nanos() as libc::c_long,
    };
    // SAFETY: word points into a live shared mapping. A shared (non-private)
    // futex is required because waiters live in other processes. EAGAIN,
    // ETIMEDOUT and EINTR all mean "re-check", so the result is ignored.
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32 as *const u32,
            libc::FUTEX_WAIT,
            seen,
            &ts as *const libc::timespec,
        );
    }
}

#[cfg(target_os = "linux")]
fn wake_all(word: &AtomicU32) {
    // SAFETY: word points into a live shared mapping.
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            word as *const AtomicU32 as *const u32,
            libc::FUTEX_WAKE,
            i32::MAX,
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn sleep_while_unchanged(word: &AtomicU32, seen: u32, timeout: Duration) {
    let step = Duration::from_micros(200);
    let mut slept = Duration::ZERO;
    while slept < timeout && word.load(Ordering::Acquire) == seen {
        std::thread::sleep(step);
        slept += step;
    }
}

#[cfg(not(target_os = "linux"))]
fn wake_all(_word: &AtomicU32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Instant;

    fn unique(tag: &str) -> ObjectName {
        ObjectName::new(format!("ioshare-notify-{}-{}", tag, std::process::id())).unwrap()
    }

    #[test]
    fn test_ready_condition_returns_immediately() {
        let name = unique("ready");
        let notifier = ReleaseNotifier::open(&name).unwrap();
        let result: Result<(), ()> = notifier.wait_until(|| Ok(true));
        assert!(result.is_ok());
        ReleaseNotifier::unlink(&name).unwrap();
    }

    #[test]
    fn test_notify_wakes_waiter() {
        let name = unique("wake");
        let waiter = ReleaseNotifier::open(&name).unwrap();
        let flag = Arc::new(AtomicBool::new(false));

        let releaser = {
            let name = name.clone();
            let flag = Arc::clone(&flag);
            std::thread::spawn(move || {
                let notifier = ReleaseNotifier::open(&name).unwrap();
                std::thread::sleep(Duration::from_millis(20));
                flag.store(true, Ordering::SeqCst);
                notifier.notify();
            })
        };

        let start = Instant::now();
        let result: Result<(), ()> = waiter.wait_until(|| Ok(flag.load(Ordering::SeqCst)));
        assert!(result.is_ok());
        assert!(start.elapsed() < Duration::from_secs(5));

        releaser.join().unwrap();
        ReleaseNotifier::unlink(&name).unwrap();
    }

    #[test]
    fn test_condition_error_propagates() {
        let name = unique("err");
        let notifier = ReleaseNotifier::open(&name).unwrap();
        let result: Result<(), &str> = notifier.wait_until(|| Err("boom"));
        assert_eq!(result, Err("boom"));
        ReleaseNotifier::unlink(&name).unwrap();
    }
}

//! ESP-IDF runtime symbol providers for third-party crates.
//!
//! `embassy-sync` signals use `CriticalSectionRawMutex`; on the device the
//! `critical-section` 1.x hooks are backed by a process-wide std mutex.
//! Host builds take the implementation from the `critical-section/std`
//! dev-dependency instead.

#[cfg(target_os = "espidf")]
mod critical_section_hooks {
    use core::cell::RefCell;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static SECTION: Mutex<()> = Mutex::new(());

    /// Nesting depth on this thread and the guard taken by the outermost
    /// section.
    struct Held {
        depth: u8,
        guard: Option<MutexGuard<'static, ()>>,
    }

    thread_local! {
        static HELD: RefCell<Held> = const { RefCell::new(Held { depth: 0, guard: None }) };
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
        HELD.with_borrow_mut(|held| {
            if held.depth == 0 {
                held.guard = Some(SECTION.lock().unwrap_or_else(PoisonError::into_inner));
            }
            held.depth = held.depth.saturating_add(1);
            held.depth
        })
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _critical_section_1_0_release(_token: u8) {
        HELD.with_borrow_mut(|held| {
            held.depth = held.depth.saturating_sub(1);
            if held.depth == 0 {
                held.guard = None;
            }
        });
    }
}

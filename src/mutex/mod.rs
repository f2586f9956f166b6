//! Our mutex implementations.
//!
//! [`SpinMutex`] guards the interrupt enable cache for the length of a
//! bus-lock batch. [`CsBusMutex`] lets a [`crate::Channel`] share its I²C bus
//! on firmware that only has critical sections.

use core::cell::RefCell;

use atomic_polyfill::{AtomicBool, Ordering};

/// A simple no-std mutex.
///
/// Uses an atomic bool as the lock flag and spins until it is free. Never
/// take one of these in an interrupt handler that could pre-empt the holder.
pub struct SpinMutex<T> {
	locked: AtomicBool,
	value: core::cell::UnsafeCell<T>,
}

impl<T> SpinMutex<T> {
	/// Create a new Mutex.
	///
	/// Defaults to unlocked.
	pub const fn new(value: T) -> SpinMutex<T> {
		SpinMutex {
			locked: AtomicBool::new(false),
			value: core::cell::UnsafeCell::new(value),
		}
	}

	/// Lock the mutex, spinning until it is free.
	///
	/// Unlock it by dropping the returned object.
	pub fn lock(&self) -> SpinMutexGuard<'_, T> {
		loop {
			if let Some(guard) = self.try_lock() {
				return guard;
			}
			while self.locked.load(Ordering::Relaxed) {
				core::hint::spin_loop();
			}
		}
	}

	fn try_lock(&self) -> Option<SpinMutexGuard<'_, T>> {
		self.locked
			.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
			.ok()
			.map(|_| SpinMutexGuard { parent: self })
	}
}

unsafe impl<T: Send> Sync for SpinMutex<T> {}

/// Represents a locked mutex.
///
/// Is unlocked on drop.
pub struct SpinMutexGuard<'a, T> {
	parent: &'a SpinMutex<T>,
}

impl<'a, T> Drop for SpinMutexGuard<'a, T> {
	fn drop(&mut self) {
		self.parent.locked.store(false, Ordering::Release);
	}
}

impl<'a, T> core::ops::Deref for SpinMutexGuard<'a, T> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		unsafe { &*self.parent.value.get() }
	}
}

impl<'a, T> core::ops::DerefMut for SpinMutexGuard<'a, T> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		unsafe { &mut *self.parent.value.get() }
	}
}

/// A [`shared_bus::BusMutex`] built on `critical-section`.
///
/// Interrupts are masked for the whole I²C transaction (or read-modify-write
/// pair), so keep the bus clock up.
pub struct CsBusMutex<T> {
	bus: critical_section::Mutex<RefCell<T>>,
}

impl<T> shared_bus::BusMutex for CsBusMutex<T> {
	type Bus = T;

	fn create(v: T) -> Self {
		CsBusMutex {
			bus: critical_section::Mutex::new(RefCell::new(v)),
		}
	}

	fn lock<R, F: FnOnce(&mut Self::Bus) -> R>(&self, f: F) -> R {
		critical_section::with(|cs| {
			let mut bus = self.bus.borrow_ref_mut(cs);
			f(&mut bus)
		})
	}
}

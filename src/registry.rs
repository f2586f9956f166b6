//! The table of probed CPLDs.
//!
//! Facets attach independently of their parent chip, in no particular
//! order. The chip publishes its [`Channel`] here once probed, and each facet
//! looks it up by [`ChipId`] when it attaches. A facet that gets there first
//! sees [`Error::NotReady`] and should try again later.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) the Neotron Developers, 2026
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.
// -----------------------------------------------------------------------------

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use core::cell::RefCell;

use crate::{debug, Channel, ChipId, Error};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Maps chip identities to their register channels.
///
/// Holds at most `N` chips. Put one in a `static`:
///
/// ```ignore
/// static REGISTRY: Registry<'static, CsBusMutex<I2c>, 2> = Registry::new();
/// ```
///
/// The registry only borrows each channel. Whoever calls
/// [`Registry::unregister`] must make sure no facet still holds a reference
/// obtained from [`Registry::lookup`].
pub struct Registry<'a, M, const N: usize> {
	entries: critical_section::Mutex<RefCell<heapless::Vec<Entry<'a, M>, N>>>,
}

/// Proof that a chip was registered. Give it back to
/// [`Registry::unregister`] to remove the entry.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq)]
pub struct RegistryHandle {
	id: ChipId,
}

struct Entry<'a, M> {
	id: ChipId,
	channel: &'a Channel<M>,
}

impl<'a, M, const N: usize> Registry<'a, M, N> {
	/// Make an empty registry.
	pub const fn new() -> Registry<'a, M, N> {
		Registry {
			entries: critical_section::Mutex::new(RefCell::new(heapless::Vec::new())),
		}
	}

	/// Publish a chip's channel under `id`.
	///
	/// Each identity can only be registered once.
	pub fn register<E>(
		&self,
		id: ChipId,
		channel: &'a Channel<M>,
	) -> Result<RegistryHandle, Error<E>> {
		critical_section::with(|cs| -> Result<(), Error<E>> {
			let mut entries = self.entries.borrow_ref_mut(cs);
			if entries.iter().any(|e| e.id == id) {
				return Err(Error::AlreadyRegistered);
			}
			entries
				.push(Entry { id, channel })
				.map_err(|_| Error::RegistryFull)?;
			Ok(())
		})?;
		debug!("Registered CPLD {:x}", id.raw());
		Ok(RegistryHandle { id })
	}

	/// Find the channel for a chip.
	///
	/// Gives [`Error::NotReady`] if the chip hasn't been registered (yet).
	pub fn lookup<E>(&self, id: ChipId) -> Result<&'a Channel<M>, Error<E>> {
		critical_section::with(|cs| {
			self.entries
				.borrow_ref(cs)
				.iter()
				.find(|e| e.id == id)
				.map(|e| e.channel)
				.ok_or(Error::NotReady)
		})
	}

	/// Remove a chip from the registry.
	///
	/// Facets that already looked the chip up keep working; new lookups get
	/// [`Error::NotReady`].
	pub fn unregister(&self, handle: RegistryHandle) {
		critical_section::with(|cs| {
			self.entries
				.borrow_ref_mut(cs)
				.retain(|e| e.id != handle.id);
		});
		debug!("Unregistered CPLD {:x}", handle.id.raw());
	}

	/// How many chips are registered.
	pub fn len(&self) -> usize {
		critical_section::with(|cs| self.entries.borrow_ref(cs).len())
	}

	/// Is the registry empty?
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl RegistryHandle {
	/// The chip this handle registered.
	pub fn id(&self) -> ChipId {
		self.id
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------

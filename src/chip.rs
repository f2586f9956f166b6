//! The CPLD as a whole.
//!
//! Probing reads the firmware version, refuses anything too old, and then
//! publishes the chip's [`Channel`] in the [`Registry`] so the facets can
//! find it. The chip also has its own interrupt controller, covering eight
//! board-level interrupt sources.

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

use embedded_hal::blocking::i2c::{Write, WriteRead};
use shared_bus::BusMutex;

use crate::{error, info, Channel, Error, InterruptController, Registry, RegistryHandle};

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Holds the CPLD firmware version.
pub const REG_VERSION: u8 = 0x03;

/// Chip-level interrupt enable register.
pub const REG_INTC_IE: u8 = 0x1C;

/// Chip-level interrupt pending register.
pub const REG_INTC_IP: u8 = 0x1D;

/// Older firmware lacks registers the facets rely on.
pub const MIN_VERSION: u8 = 14;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Identifies one physical CPLD.
///
/// Whatever describes the board (device tree, board support crate) picks
/// these. [`ChipId::from_bus_address`] is the usual choice.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ChipId(u32);

/// A probed and registered CPLD.
pub struct Chip<'a, M> {
	handle: RegistryHandle,
	version: u8,
	irq: InterruptController<'a, M>,
}

impl ChipId {
	/// Make an identity from any number you like.
	pub const fn new(raw: u32) -> ChipId {
		ChipId(raw)
	}

	/// Make an identity from the I²C bus number and the chip's address on it.
	pub const fn from_bus_address(bus: u8, address: u8) -> ChipId {
		ChipId(((bus as u32) << 8) | address as u32)
	}

	/// Get the number back out.
	pub const fn raw(self) -> u32 {
		self.0
	}
}

impl<'a, M, E> Chip<'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	/// Check the chip's firmware version and, if it's new enough, register it.
	///
	/// If this fails, nothing is registered and facets looking for `id` keep
	/// getting [`Error::NotReady`].
	pub fn probe<const N: usize>(
		registry: &Registry<'a, M, N>,
		id: ChipId,
		channel: &'a Channel<M>,
	) -> Result<Chip<'a, M>, Error<E>> {
		let version = channel.read(REG_VERSION)?;
		if version < MIN_VERSION {
			error!(
				"CPLD not compatible, at least version {} needed (found {})",
				MIN_VERSION,
				version
			);
			return Err(Error::VersionTooOld(version));
		}

		let irq = InterruptController::new(channel, REG_INTC_IE, REG_INTC_IP)?;
		let handle = registry.register(id, channel)?;

		info!("CPLD probed at 0x{:02x}, version {}", channel.address(), version);

		Ok(Chip {
			handle,
			version,
			irq,
		})
	}

	/// The identity this chip was registered under.
	pub fn id(&self) -> ChipId {
		self.handle.id()
	}

	/// The firmware version read at probe time.
	pub fn version(&self) -> u8 {
		self.version
	}

	/// The chip-level interrupt controller.
	///
	/// Call [`InterruptController::handle_irq`] on it from whatever services
	/// the CPLD's interrupt output.
	pub fn irq(&self) -> &InterruptController<'a, M> {
		&self.irq
	}

	/// Take the chip out of the registry.
	///
	/// All facets attached to this chip must have been dropped already.
	pub fn remove<const N: usize>(self, registry: &Registry<'a, M, N>) {
		registry.unregister(self.handle);
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------

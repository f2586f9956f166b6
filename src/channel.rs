//! Register access for the CPLD.
//!
//! The CPLD has one file of 32 8-bit registers. Every facet of the chip goes
//! through the same [`Channel`], which owns the I²C bus behind a
//! [`shared_bus::BusMutex`] so that read-modify-write sequences from
//! different facets can never interleave.

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

use crate::Error;

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The highest register address on the CPLD.
pub const MAX_REGISTER: u8 = 0x1F;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Byte-wide register access to one CPLD.
///
/// `M` is the mutex the bus lives in. Use `std::sync::Mutex` on a host,
/// [`crate::CsBusMutex`] on single-core firmware, or
/// [`shared_bus::NullMutex`] if only one context ever touches the chip.
pub struct Channel<M> {
	bus: M,
	address: u8,
}

impl<M, E> Channel<M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	/// Wrap an I²C bus and the CPLD's 7-bit address on it.
	pub fn new(bus: M::Bus, address: u8) -> Channel<M> {
		Channel {
			bus: M::create(bus),
			address,
		}
	}

	/// The chip's 7-bit I²C address.
	pub fn address(&self) -> u8 {
		self.address
	}

	/// Read one register.
	pub fn read(&self, register: u8) -> Result<u8, Error<E>> {
		check_register(register)?;
		self.bus.lock(|bus| read_locked(bus, self.address, register))
	}

	/// Write one register.
	pub fn write(&self, register: u8, value: u8) -> Result<(), Error<E>> {
		check_register(register)?;
		self.bus
			.lock(|bus| write_locked(bus, self.address, register, value))
	}

	/// Change only the bits in `mask`, setting them to the matching bits of
	/// `value`.
	///
	/// The read and the write happen under one hold of the bus lock. If the
	/// register already holds the wanted value, nothing is written.
	pub fn update_bits(&self, register: u8, mask: u8, value: u8) -> Result<(), Error<E>> {
		check_register(register)?;
		self.bus.lock(|bus| {
			let old = read_locked(bus, self.address, register)?;
			let new = (old & !mask) | (value & mask);
			if new != old {
				write_locked(bus, self.address, register, new)?;
			}
			Ok(())
		})
	}
}

impl<M> Channel<M>
where
	M: BusMutex,
	M::Bus: Write,
{
	/// Write one register from somewhere that can't return an error, like a
	/// `Drop` impl. Tells you whether it worked.
	pub(crate) fn write_best_effort(&self, register: u8, value: u8) -> bool {
		register <= MAX_REGISTER
			&& self
				.bus
				.lock(|bus| bus.write(self.address, &[register, value]).is_ok())
	}
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

fn check_register<E>(register: u8) -> Result<(), Error<E>> {
	if register > MAX_REGISTER {
		Err(Error::OutOfRange)
	} else {
		Ok(())
	}
}

fn read_locked<B, E>(bus: &mut B, address: u8, register: u8) -> Result<u8, Error<E>>
where
	B: WriteRead<Error = E>,
{
	let mut buffer = [0u8; 1];
	bus.write_read(address, &[register], &mut buffer)
		.map_err(Error::Transport)?;
	Ok(buffer[0])
}

fn write_locked<B, E>(bus: &mut B, address: u8, register: u8, value: u8) -> Result<(), Error<E>>
where
	B: Write<Error = E>,
{
	bus.write(address, &[register, value])
		.map_err(Error::Transport)
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------

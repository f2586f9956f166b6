//! The CPLD's fan tachometer.
//!
//! One register, already scaled by the hardware. We just read it.

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

use crate::{channel::MAX_REGISTER, info, Channel, ChipId, Error, Registry};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The fan speed sensor on a CPLD.
pub struct Fan<'a, M> {
	channel: &'a Channel<M>,
	offset: u8,
}

// -----------------------------------------------------------------------------
// impls on Public Types
// -----------------------------------------------------------------------------

impl<'a, M, E> Fan<'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	/// Attach to the tachometer at `offset` on the chip `parent`.
	pub fn attach<const N: usize>(
		registry: &Registry<'a, M, N>,
		parent: ChipId,
		offset: u8,
	) -> Result<Fan<'a, M>, Error<E>> {
		let channel = registry.lookup(parent)?;
		Self::new(channel, offset)
	}

	/// Make a fan sensor on a channel you already have.
	pub fn new(channel: &'a Channel<M>, offset: u8) -> Result<Fan<'a, M>, Error<E>> {
		if offset > MAX_REGISTER {
			return Err(Error::OutOfRange);
		}
		info!("CPLD fan at 0x{:02x}", offset);
		Ok(Fan { channel, offset })
	}

	/// The raw fan speed reading.
	pub fn read_input(&self) -> Result<u8, Error<E>> {
		self.channel.read(self.offset)
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use embedded_hal_mock::eh0::i2c::{Mock as I2cMock, Transaction};
	use std::sync::Mutex;

	#[test]
	fn reads_the_counter_as_is() {
		let expectations = [
			Transaction::write_read(0x4A, vec![0x0B], vec![0x9C]),
			Transaction::write_read(0x4A, vec![0x0B], vec![0x00]),
		];
		let mut i2c = I2cMock::new(&expectations);
		let channel = Channel::<Mutex<I2cMock>>::new(i2c.clone(), 0x4A);
		let fan = Fan::new(&channel, 0x0B).unwrap();
		assert_eq!(fan.read_input().unwrap(), 0x9C);
		assert_eq!(fan.read_input().unwrap(), 0);
		i2c.done();
	}

	#[test]
	fn offset_outside_the_chip_is_refused() {
		let mut i2c = I2cMock::new(&[]);
		let channel = Channel::<Mutex<I2cMock>>::new(i2c.clone(), 0x4A);
		assert!(matches!(Fan::new(&channel, 0x20), Err(Error::OutOfRange)));
		i2c.done();
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------

//! GPIO blocks on the CPLD.
//!
//! Each block has eight lines and comes in one of three flavours:
//!
//! * [`GpioKind::Full`] - each line can be an input or an output. Has
//!   direction, output, input, interrupt enable and interrupt pending
//!   registers, at offsets 0 to 4 within its window.
//! * [`GpioKind::InputOnly`] - one input register at offset 0.
//! * [`GpioKind::OutputOnly`] - one output register at offset 0, which reads
//!   back the levels being driven.
//!
//! Every call is one register transaction on one bit, except
//! [`Gpio::direction_output`], which sets the level before flipping the
//! direction so the pin never drives a stale value.

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
use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};
use shared_bus::BusMutex;

use crate::{
	channel::MAX_REGISTER, info, irq::line_mask, Channel, ChipId, Error, InterruptController,
	Registry,
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The Registers in a full GPIO block, relative to its offset.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
enum Register {
	/// Data Direction Register (1 = output)
	Direction = 0,
	/// Output level
	Output = 1,
	/// Input level
	Input = 2,
	/// Interrupt Enable
	InterruptEnable = 3,
	/// Interrupt Pending (write 1 to clear)
	InterruptPending = 4,
}

/// Input-only and output-only blocks have just this one register.
const REG_DATA: u8 = 0;

/// Which flavour of GPIO block this is.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GpioKind {
	/// Bidirectional, with optional interrupts
	Full,
	/// Inputs only, wired that way in hardware
	InputOnly,
	/// Outputs only, wired that way in hardware
	OutputOnly,
}

/// Which way a line is pointing.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
	/// The CPLD reads the pin
	Input,
	/// The CPLD drives the pin
	Output,
}

/// What a GPIO block can do. Ask this rather than matching on [`GpioKind`].
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Capabilities {
	/// Direction can be changed per line
	pub direction_control: bool,
	/// Lines can be read as inputs
	pub input: bool,
	/// Lines can be driven
	pub output: bool,
	/// The block has an interrupt enable/pending pair
	pub interrupts: bool,
}

/// One GPIO block on a CPLD.
pub struct Gpio<'a, M> {
	channel: &'a Channel<M>,
	offset: u8,
	kind: GpioKind,
	irq: Option<InterruptController<'a, M>>,
}

/// One line of a [`Gpio`] block, usable with anything that wants
/// `embedded-hal` digital pins.
pub struct Pin<'g, 'a, M> {
	gpio: &'g Gpio<'a, M>,
	line: u8,
}

// -----------------------------------------------------------------------------
// impls on Public Types
// -----------------------------------------------------------------------------

impl GpioKind {
	/// How many registers this kind of block occupies.
	pub fn window(self) -> u8 {
		match self {
			GpioKind::Full => Register::InterruptPending as u8 + 1,
			GpioKind::InputOnly | GpioKind::OutputOnly => 1,
		}
	}

	/// What this kind of block can do.
	pub fn capabilities(self) -> Capabilities {
		match self {
			GpioKind::Full => Capabilities {
				direction_control: true,
				input: true,
				output: true,
				interrupts: true,
			},
			GpioKind::InputOnly => Capabilities {
				direction_control: false,
				input: true,
				output: false,
				interrupts: false,
			},
			GpioKind::OutputOnly => Capabilities {
				direction_control: false,
				input: false,
				output: true,
				interrupts: false,
			},
		}
	}
}

impl<'a, M, E> Gpio<'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	/// Attach to the GPIO block at `offset` on the chip `parent`.
	///
	/// Gives [`Error::NotReady`] if the chip hasn't been probed yet.
	pub fn attach<const N: usize>(
		registry: &Registry<'a, M, N>,
		parent: ChipId,
		offset: u8,
		kind: GpioKind,
	) -> Result<Gpio<'a, M>, Error<E>> {
		let channel = registry.lookup(parent)?;
		Self::new(channel, offset, kind)
	}

	/// Make a GPIO block on a channel you already have.
	pub fn new(channel: &'a Channel<M>, offset: u8, kind: GpioKind) -> Result<Gpio<'a, M>, Error<E>> {
		let last = offset.checked_add(kind.window() - 1).ok_or(Error::OutOfRange)?;
		if last > MAX_REGISTER {
			return Err(Error::OutOfRange);
		}
		info!("CPLD GPIO block at 0x{:02x}", offset);
		Ok(Gpio {
			channel,
			offset,
			kind,
			irq: None,
		})
	}

	/// Turn on the block's interrupt controller.
	///
	/// Only [`GpioKind::Full`] blocks have one. Nothing is written to the
	/// chip; all lines start disabled in the cache.
	pub fn with_interrupts(mut self) -> Result<Gpio<'a, M>, Error<E>> {
		if !self.capabilities().interrupts {
			return Err(Error::NotSupported);
		}
		self.irq = Some(InterruptController::new(
			self.channel,
			self.offset + Register::InterruptEnable as u8,
			self.offset + Register::InterruptPending as u8,
		)?);
		Ok(self)
	}

	/// The interrupt controller, if [`Gpio::with_interrupts`] was used.
	pub fn irq(&self) -> Option<&InterruptController<'a, M>> {
		self.irq.as_ref()
	}

	/// Which flavour of block this is.
	pub fn kind(&self) -> GpioKind {
		self.kind
	}

	/// Where the block sits in the chip's register file.
	pub fn offset(&self) -> u8 {
		self.offset
	}

	/// What this block can do.
	pub fn capabilities(&self) -> Capabilities {
		self.kind.capabilities()
	}

	/// Get a pin object for one line.
	pub fn pin(&self, line: u8) -> Result<Pin<'_, 'a, M>, Error<E>> {
		line_mask::<E>(line)?;
		Ok(Pin { gpio: self, line })
	}

	/// Which way is this line pointing?
	///
	/// Only a full block reads the hardware; the others are fixed.
	pub fn get_direction(&self, line: u8) -> Result<Direction, Error<E>> {
		let mask = line_mask(line)?;
		match self.kind {
			GpioKind::Full => {
				let reg = self.channel.read(self.reg(Register::Direction))?;
				Ok(if reg & mask != 0 {
					Direction::Output
				} else {
					Direction::Input
				})
			}
			GpioKind::InputOnly => Ok(Direction::Input),
			GpioKind::OutputOnly => Ok(Direction::Output),
		}
	}

	/// Make a line an input.
	pub fn direction_input(&self, line: u8) -> Result<(), Error<E>> {
		let mask = line_mask(line)?;
		match self.kind {
			GpioKind::Full => self
				.channel
				.update_bits(self.reg(Register::Direction), mask, 0),
			GpioKind::InputOnly => Ok(()),
			GpioKind::OutputOnly => Err(Error::NotSupported),
		}
	}

	/// Make a line an output, driving `value`.
	pub fn direction_output(&self, line: u8, value: bool) -> Result<(), Error<E>> {
		let mask = line_mask(line)?;
		match self.kind {
			GpioKind::Full => {
				// Level first, so the pin never drives whatever was left in
				// the output register
				self.write_bit(self.reg(Register::Output), mask, value)?;
				self.channel
					.update_bits(self.reg(Register::Direction), mask, mask)
			}
			GpioKind::OutputOnly => self.write_bit(self.offset + REG_DATA, mask, value),
			GpioKind::InputOnly => Err(Error::NotSupported),
		}
	}

	/// Read a line's level.
	///
	/// On an output-only block this is the level being driven.
	pub fn get(&self, line: u8) -> Result<bool, Error<E>> {
		let mask = line_mask(line)?;
		let register = match self.kind {
			GpioKind::Full => self.reg(Register::Input),
			GpioKind::InputOnly | GpioKind::OutputOnly => self.offset + REG_DATA,
		};
		Ok(self.channel.read(register)? & mask != 0)
	}

	/// Set a line's output level, leaving its direction alone.
	pub fn set(&self, line: u8, value: bool) -> Result<(), Error<E>> {
		let mask = line_mask(line)?;
		match self.kind {
			GpioKind::Full => self.write_bit(self.reg(Register::Output), mask, value),
			GpioKind::OutputOnly => self.write_bit(self.offset + REG_DATA, mask, value),
			GpioKind::InputOnly => Err(Error::NotSupported),
		}
	}

	/// Read back the level a line has been told to drive.
	pub fn get_output(&self, line: u8) -> Result<bool, Error<E>> {
		let mask = line_mask(line)?;
		let register = match self.kind {
			GpioKind::Full => self.reg(Register::Output),
			GpioKind::OutputOnly => self.offset + REG_DATA,
			GpioKind::InputOnly => return Err(Error::NotSupported),
		};
		Ok(self.channel.read(register)? & mask != 0)
	}

	fn reg(&self, register: Register) -> u8 {
		self.offset + register as u8
	}

	fn write_bit(&self, register: u8, mask: u8, value: bool) -> Result<(), Error<E>> {
		self.channel
			.update_bits(register, mask, if value { mask } else { 0 })
	}
}

impl<'g, 'a, M> Pin<'g, 'a, M> {
	/// Which line this is.
	pub fn line(&self) -> u8 {
		self.line
	}
}

impl<'g, 'a, M, E> InputPin for Pin<'g, 'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	type Error = Error<E>;

	fn is_high(&self) -> Result<bool, Self::Error> {
		self.gpio.get(self.line)
	}

	fn is_low(&self) -> Result<bool, Self::Error> {
		self.gpio.get(self.line).map(|level| !level)
	}
}

impl<'g, 'a, M, E> OutputPin for Pin<'g, 'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	type Error = Error<E>;

	fn set_low(&mut self) -> Result<(), Self::Error> {
		self.gpio.set(self.line, false)
	}

	fn set_high(&mut self) -> Result<(), Self::Error> {
		self.gpio.set(self.line, true)
	}
}

impl<'g, 'a, M, E> StatefulOutputPin for Pin<'g, 'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	fn is_set_high(&self) -> Result<bool, Self::Error> {
		self.gpio.get_output(self.line)
	}

	fn is_set_low(&self) -> Result<bool, Self::Error> {
		self.gpio.get_output(self.line).map(|level| !level)
	}
}

impl<'g, 'a, M, E> ToggleableOutputPin for Pin<'g, 'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	type Error = Error<E>;

	fn toggle(&mut self) -> Result<(), Self::Error> {
		let level = self.gpio.get_output(self.line)?;
		self.gpio.set(self.line, !level)
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------

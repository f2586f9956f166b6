//! Nested interrupt demultiplexer.
//!
//! Interrupt-capable blocks on the CPLD have an enable register and a
//! pending register, one bit per line. A line whose input sees an edge
//! latches its pending bit; writing a one back to that bit acknowledges it.
//! All the blocks share one interrupt output from the CPLD.
//!
//! Enable changes are batched. Take the bus lock with
//! [`InterruptController::bus_lock`], enable and disable as many lines as you
//! like, then [`IrqBatch::sync_unlock`] writes the enable register once.
//!
//! When the shared interrupt fires, call [`InterruptController::handle_irq`]
//! from a context that can block on I²C. It reads the pending bits,
//! acknowledges the enabled ones, and then calls your dispatch function for
//! each of those lines, lowest line first. No lock is held during dispatch,
//! so handlers are free to enable and disable lines themselves.

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

use core::num::NonZeroU32;

use atomic_polyfill::{AtomicU32, AtomicU8, Ordering};
use embedded_hal::blocking::i2c::{Write, WriteRead};
use shared_bus::BusMutex;

use crate::{
	channel::MAX_REGISTER,
	debug,
	mutex::{SpinMutex, SpinMutexGuard},
	warn, Channel, Error, NUM_LINES,
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The trigger types an interrupt line could be asked for.
///
/// The CPLD only latches on both edges.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trigger {
	/// Rising edge only
	EdgeRising,
	/// Falling edge only
	EdgeFalling,
	/// Any edge. The only one the hardware does.
	EdgeBoth,
	/// While the line is high
	LevelHigh,
	/// While the line is low
	LevelLow,
}

/// What [`InterruptController::handle_irq`] tells the shared interrupt
/// dispatcher.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IrqReturn {
	/// We couldn't read the pending register, so nothing was done.
	None,
	/// We scanned and acknowledged the pending lines.
	Handled,
}

/// The enable/pending register pair of one interrupt-capable block.
pub struct InterruptController<'a, M> {
	channel: &'a Channel<M>,
	enable_reg: u8,
	pending_reg: u8,
	/// The enable mask, owned by whoever holds the bus lock.
	cache: SpinMutex<u8>,
	/// Copy of `cache`, for the demux worker which must not take the lock.
	enabled: AtomicU8,
	/// Virtual interrupt number per line, zero if unmapped.
	mapping: [AtomicU32; NUM_LINES as usize],
}

/// An open batch of enable mask changes.
///
/// Dropping it without calling [`IrqBatch::sync_unlock`] still commits the
/// mask, but any bus error is only logged.
pub struct IrqBatch<'c, 'a, M>
where
	M: BusMutex,
	M::Bus: Write + WriteRead,
{
	parent: &'c InterruptController<'a, M>,
	cache: SpinMutexGuard<'c, u8>,
	committed: bool,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

#[allow(clippy::declare_interior_mutable_const)]
const UNMAPPED: AtomicU32 = AtomicU32::new(0);

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Turn a line number into its bit in the 8-bit registers.
pub(crate) fn line_mask<E>(line: u8) -> Result<u8, Error<E>> {
	if line < NUM_LINES {
		Ok(1 << line)
	} else {
		Err(Error::OutOfRange)
	}
}

// -----------------------------------------------------------------------------
// impls on Public Types
// -----------------------------------------------------------------------------

impl<'a, M, E> InterruptController<'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	/// Create a controller for the enable/pending pair at the given absolute
	/// register addresses.
	///
	/// Nothing is written to the chip. The cached enable mask starts at zero.
	pub fn new(
		channel: &'a Channel<M>,
		enable_reg: u8,
		pending_reg: u8,
	) -> Result<InterruptController<'a, M>, Error<E>> {
		if enable_reg > MAX_REGISTER || pending_reg > MAX_REGISTER {
			return Err(Error::OutOfRange);
		}
		Ok(InterruptController {
			channel,
			enable_reg,
			pending_reg,
			cache: SpinMutex::new(0),
			enabled: AtomicU8::new(0),
			mapping: [UNMAPPED; NUM_LINES as usize],
		})
	}

	/// Associate a line with a virtual interrupt number.
	pub fn map(&self, line: u8, virq: NonZeroU32) -> Result<(), Error<E>> {
		line_mask::<E>(line)?;
		self.mapping[line as usize].store(virq.get(), Ordering::Release);
		Ok(())
	}

	/// Forget a line's virtual interrupt number. Its pending bits will still be
	/// acknowledged, but nothing is dispatched.
	pub fn unmap(&self, line: u8) -> Result<(), Error<E>> {
		line_mask::<E>(line)?;
		self.mapping[line as usize].store(0, Ordering::Release);
		Ok(())
	}

	/// Get a line's virtual interrupt number, if it has one.
	pub fn find_mapping(&self, line: u8) -> Option<NonZeroU32> {
		if line < NUM_LINES {
			NonZeroU32::new(self.mapping[line as usize].load(Ordering::Acquire))
		} else {
			None
		}
	}

	/// Configure how a line triggers.
	///
	/// Only [`Trigger::EdgeBoth`] is accepted.
	pub fn set_trigger_type(&self, line: u8, trigger: Trigger) -> Result<(), Error<E>> {
		line_mask::<E>(line)?;
		match trigger {
			Trigger::EdgeBoth => Ok(()),
			_ => Err(Error::UnsupportedTriggerType),
		}
	}

	/// Start a batch of enable mask changes.
	///
	/// Blocks until any other batch has finished.
	pub fn bus_lock(&self) -> IrqBatch<'_, 'a, M> {
		IrqBatch {
			parent: self,
			cache: self.cache.lock(),
			committed: false,
		}
	}

	/// The enable mask as currently cached (which may be ahead of the
	/// hardware while a batch is open).
	pub fn enabled_mask(&self) -> u8 {
		self.enabled.load(Ordering::Acquire)
	}

	/// Service the shared interrupt.
	///
	/// Reads the pending register, keeps only the lines we have enabled,
	/// acknowledges exactly those, and then calls `dispatch(line, virq)` for
	/// each mapped line in ascending order. An edge that arrives after the
	/// read stays pending for the next call.
	pub fn handle_irq<F>(&self, mut dispatch: F) -> IrqReturn
	where
		F: FnMut(u8, NonZeroU32),
	{
		let pending = match self.channel.read(self.pending_reg) {
			Ok(value) => value,
			Err(_e) => {
				warn!("Failed to read CPLD pending register 0x{:02x}", self.pending_reg);
				return IrqReturn::None;
			}
		};

		// The hardware latches edges on disabled lines too
		let mut pending = pending & self.enabled_mask();

		if self.channel.write(self.pending_reg, pending).is_err() {
			warn!("Failed to ack CPLD interrupts 0x{:02x}", pending);
		}

		debug!("CPLD IRQ 0x{:02x}: pending 0x{:02x}", self.pending_reg, pending);

		while pending != 0 {
			let line = pending.trailing_zeros() as u8;
			pending &= !(1 << line);
			if let Some(virq) = self.find_mapping(line) {
				dispatch(line, virq);
			}
		}

		IrqReturn::Handled
	}
}

impl<'c, 'a, M, E> IrqBatch<'c, 'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	/// Unmask a line. Takes effect at [`IrqBatch::sync_unlock`].
	pub fn enable(&mut self, line: u8) -> Result<(), Error<E>> {
		let mask = line_mask::<E>(line)?;
		*self.cache |= mask;
		self.parent.enabled.store(*self.cache, Ordering::Release);
		Ok(())
	}

	/// Mask a line. Takes effect at [`IrqBatch::sync_unlock`].
	pub fn disable(&mut self, line: u8) -> Result<(), Error<E>> {
		let mask = line_mask::<E>(line)?;
		*self.cache &= !mask;
		self.parent.enabled.store(*self.cache, Ordering::Release);
		Ok(())
	}

	/// The mask this batch will commit.
	pub fn mask(&self) -> u8 {
		*self.cache
	}

	/// Write the mask to the chip and end the batch.
	pub fn sync_unlock(mut self) -> Result<(), Error<E>> {
		self.commit()
	}

	fn commit(&mut self) -> Result<(), Error<E>> {
		self.committed = true;
		self.parent
			.channel
			.write(self.parent.enable_reg, *self.cache)
	}
}

impl<'c, 'a, M> Drop for IrqBatch<'c, 'a, M>
where
	M: BusMutex,
	M::Bus: Write + WriteRead,
{
	fn drop(&mut self) {
		if !self.committed {
			self.committed = true;
			let mask = *self.cache;
			if !self.parent.channel.write_best_effort(self.parent.enable_reg, mask) {
				warn!("Failed to write CPLD interrupt enables 0x{:02x}", mask);
			}
		}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------

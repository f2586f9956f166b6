//! The CPLD's PWM outputs.
//!
//! Each PWM block is one channel with a control register (mode and enable)
//! and a 7-bit duty cycle register. The hardware only runs at four fixed
//! frequencies, so only four periods are accepted.

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
use fugit::HertzU32;
use shared_bus::BusMutex;

use crate::{channel::MAX_REGISTER, debug, info, Channel, ChipId, Error, Registry};

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

const REG_CTRL: u8 = 0;
const REG_CYCLE: u8 = 1;

const CTRL_MODE_MASK: u8 = 0x03;
const CTRL_ENABLE: u8 = 1 << 7;

/// The largest value the duty cycle register holds.
const CYCLE_MAX: u8 = 0x7F;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The four rates the PWM hardware runs at.
///
/// The discriminant is the mode number in the control register.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PwmMode {
	/// 4 ms period
	Hz250 = 0,
	/// 2 ms period
	Hz500 = 1,
	/// 1 ms period
	Khz1 = 2,
	/// 500 µs period
	Khz2 = 3,
}

/// What a PWM output is doing.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PwmState {
	/// Period in nanoseconds. Must be one of the [`PwmMode`] periods.
	pub period_ns: u32,
	/// High time in nanoseconds, between zero and `period_ns`.
	pub duty_ns: u32,
	/// Is the output running?
	pub enabled: bool,
}

/// One PWM block on a CPLD.
pub struct Pwm<'a, M> {
	channel: &'a Channel<M>,
	offset: u8,
}

// -----------------------------------------------------------------------------
// impls on Public Types
// -----------------------------------------------------------------------------

impl PwmMode {
	/// All the modes, in control register order.
	pub const ALL: [PwmMode; 4] = [PwmMode::Hz250, PwmMode::Hz500, PwmMode::Khz1, PwmMode::Khz2];

	/// Get the mode for a control register value. Only the mode bits are
	/// looked at.
	pub fn from_ctrl(ctrl: u8) -> PwmMode {
		match ctrl & CTRL_MODE_MASK {
			0 => PwmMode::Hz250,
			1 => PwmMode::Hz500,
			2 => PwmMode::Khz1,
			_ => PwmMode::Khz2,
		}
	}

	/// Find the mode with exactly this period.
	pub fn from_period_ns(period_ns: u32) -> Option<PwmMode> {
		Self::ALL.iter().copied().find(|m| m.period_ns() == period_ns)
	}

	/// The period, in nanoseconds.
	pub const fn period_ns(self) -> u32 {
		match self {
			PwmMode::Hz250 => 4_000_000,
			PwmMode::Hz500 => 2_000_000,
			PwmMode::Khz1 => 1_000_000,
			PwmMode::Khz2 => 500_000,
		}
	}

	/// The duty cycle register value that means "high for the whole
	/// period".
	///
	/// For [`PwmMode::Hz250`] this is one more than the register holds.
	pub const fn max_duty(self) -> u8 {
		match self {
			PwmMode::Hz250 => 0x80,
			PwmMode::Hz500 => 0x40,
			PwmMode::Khz1 => 0x20,
			PwmMode::Khz2 => 0x10,
		}
	}

	/// The output frequency.
	pub fn frequency(self) -> HertzU32 {
		HertzU32::from_raw(1_000_000_000 / self.period_ns())
	}
}

impl<'a, M, E> Pwm<'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	/// Attach to the PWM block at `offset` on the chip `parent`.
	pub fn attach<const N: usize>(
		registry: &Registry<'a, M, N>,
		parent: ChipId,
		offset: u8,
	) -> Result<Pwm<'a, M>, Error<E>> {
		let channel = registry.lookup(parent)?;
		Self::new(channel, offset)
	}

	/// Make a PWM block on a channel you already have.
	pub fn new(channel: &'a Channel<M>, offset: u8) -> Result<Pwm<'a, M>, Error<E>> {
		if offset >= MAX_REGISTER {
			return Err(Error::OutOfRange);
		}
		info!("CPLD PWM at 0x{:02x}", offset);
		Ok(Pwm { channel, offset })
	}

	/// Where the block sits in the chip's register file.
	pub fn offset(&self) -> u8 {
		self.offset
	}

	/// Program the output.
	///
	/// The duty cycle is truncated to what the register can hold. Asking for
	/// 100% at 250 Hz gets you 500 Hz at full scale instead, because the
	/// hardware can't hold its output high in the 250 Hz mode.
	///
	/// This is two writes. If the second one fails, the new mode and enable
	/// are in place with the old duty cycle.
	pub fn apply(&self, state: &PwmState) -> Result<(), Error<E>> {
		let mut mode = PwmMode::from_period_ns(state.period_ns).ok_or(Error::UnsupportedPeriod)?;
		if state.duty_ns > state.period_ns {
			return Err(Error::OutOfRange);
		}

		let mut cycle =
			(u64::from(state.duty_ns) * u64::from(mode.max_duty()) / u64::from(state.period_ns)) as u8;

		// 0x80 doesn't fit in the cycle register. The faster modes' full
		// scale does, so they keep their own mode and read back at 100%.
		if mode == PwmMode::Hz250 && cycle == mode.max_duty() {
			mode = PwmMode::Hz500;
			cycle = CYCLE_MAX;
		}

		let mut ctrl = mode as u8;
		if state.enabled {
			ctrl |= CTRL_ENABLE;
		}

		debug!("PWM ctrl 0x{:02x} cycle 0x{:02x}", ctrl, cycle);

		self.channel.write(self.offset + REG_CTRL, ctrl)?;
		self.channel.write(self.offset + REG_CYCLE, cycle)
	}

	/// Read the output's settings back from the chip.
	///
	/// The duty cycle is rounded to the nearest nanosecond and never reported
	/// as longer than the period.
	pub fn get_state(&self) -> Result<PwmState, Error<E>> {
		let ctrl = self.channel.read(self.offset + REG_CTRL)?;
		let mode = PwmMode::from_ctrl(ctrl);
		let cycle = self.channel.read(self.offset + REG_CYCLE)?;

		let period = u64::from(mode.period_ns());
		let max = u64::from(mode.max_duty());
		let duty = (u64::from(cycle) * period + max / 2) / max;

		Ok(PwmState {
			period_ns: mode.period_ns(),
			duty_ns: duty.min(period) as u32,
			enabled: ctrl & CTRL_ENABLE != 0,
		})
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------

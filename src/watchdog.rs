//! The CPLD's watchdog timer.
//!
//! The watchdog counts down from its timeout (in whole seconds) and resets
//! the board when it gets to zero. Writing the magic kick value restarts the
//! count. Setting the lock bit stops anyone turning the watchdog off again
//! until the next hardware reset.

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

use atomic_polyfill::{AtomicU8, Ordering};
use embedded_hal::blocking::i2c::{Write, WriteRead};
use shared_bus::BusMutex;

use crate::{channel::MAX_REGISTER, info, warn, Channel, ChipId, Error, Registry};

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

const REG_CTRL: u8 = 0;
const REG_TIMEOUT: u8 = 1;
const REG_KICK: u8 = 2;
const REG_COUNT: u8 = 3;

const CTRL_EN: u8 = 1 << 0;
const CTRL_LOCK: u8 = 1 << 2;

/// The only value that may be written to the kick register.
const KICK_VALUE: u8 = 0x6B;

/// Shortest timeout, in seconds.
pub const MIN_TIMEOUT: u32 = 1;

/// Longest timeout, in seconds.
pub const MAX_TIMEOUT: u32 = 255;

static INFO: WatchdogInfo = WatchdogInfo {
	identity: "SMARC-sAL28 CPLD watchdog",
	magic_close: true,
	settable_timeout: true,
	keepalive_ping: true,
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// How the watchdog should be set up when it attaches.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct WatchdogConfig {
	/// Initial timeout in seconds. `None` keeps whatever the chip already
	/// has.
	pub timeout: Option<u32>,
	/// Lock the watchdog when it is started, so it can never be stopped.
	pub nowayout: bool,
}

/// What the hardware says the watchdog is doing.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WatchdogStatus {
	/// The timer is counting down.
	pub active: bool,
	/// The lock bit is set. Only a hardware reset clears it.
	pub locked: bool,
}

/// Describes this watchdog to whoever is managing it.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WatchdogInfo {
	/// A human readable name
	pub identity: &'static str,
	/// Stopping requires an explicit close, not just going away
	pub magic_close: bool,
	/// The timeout can be changed
	pub settable_timeout: bool,
	/// The timer is kept alive by pinging
	pub keepalive_ping: bool,
}

/// The watchdog block on a CPLD.
pub struct Watchdog<'a, M> {
	channel: &'a Channel<M>,
	offset: u8,
	timeout: AtomicU8,
	nowayout: bool,
}

// -----------------------------------------------------------------------------
// impls on Public Types
// -----------------------------------------------------------------------------

impl<'a, M, E> Watchdog<'a, M>
where
	M: BusMutex,
	M::Bus: Write<Error = E> + WriteRead<Error = E>,
{
	/// Attach to the watchdog at `offset` on the chip `parent`.
	pub fn attach<const N: usize>(
		registry: &Registry<'a, M, N>,
		parent: ChipId,
		offset: u8,
		config: WatchdogConfig,
	) -> Result<Watchdog<'a, M>, Error<E>> {
		let channel = registry.lookup(parent)?;
		Self::new(channel, offset, config)
	}

	/// Make a watchdog on a channel you already have.
	///
	/// If a previous boot locked the watchdog, we are stuck with no-way-out
	/// whatever `config` says.
	pub fn new(
		channel: &'a Channel<M>,
		offset: u8,
		config: WatchdogConfig,
	) -> Result<Watchdog<'a, M>, Error<E>> {
		if offset > MAX_REGISTER - REG_COUNT {
			return Err(Error::OutOfRange);
		}

		let ctrl = channel.read(offset + REG_CTRL)?;
		let nowayout = config.nowayout || (ctrl & CTRL_LOCK != 0);

		let watchdog = Watchdog {
			channel,
			offset,
			timeout: AtomicU8::new(0),
			nowayout,
		};

		match config.timeout {
			Some(seconds) => watchdog.set_timeout(seconds)?,
			None => {
				let seconds = channel.read(offset + REG_TIMEOUT)?;
				watchdog.timeout.store(seconds, Ordering::Relaxed);
			}
		}

		info!(
			"CPLD watchdog: initial timeout {} sec, nowayout {}",
			watchdog.timeout(),
			nowayout
		);

		Ok(watchdog)
	}

	/// Start the timer. With no-way-out, this also sets the lock bit.
	pub fn start(&self) -> Result<(), Error<E>> {
		let mut bits = CTRL_EN;
		if self.nowayout {
			bits |= CTRL_LOCK;
		}
		self.channel.update_bits(self.offset + REG_CTRL, bits, bits)
	}

	/// Stop the timer.
	///
	/// Gives [`Error::Locked`] and leaves the timer running if the lock bit
	/// is set.
	pub fn stop(&self) -> Result<(), Error<E>> {
		let ctrl = self.channel.read(self.offset + REG_CTRL)?;
		if ctrl & CTRL_LOCK != 0 {
			return Err(Error::Locked);
		}
		self.channel.update_bits(self.offset + REG_CTRL, CTRL_EN, 0)
	}

	/// Restart the countdown.
	pub fn ping(&self) -> Result<(), Error<E>> {
		self.channel.write(self.offset + REG_KICK, KICK_VALUE)
	}

	/// Change the timeout. Must be between [`MIN_TIMEOUT`] and
	/// [`MAX_TIMEOUT`] seconds.
	pub fn set_timeout(&self, seconds: u32) -> Result<(), Error<E>> {
		if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&seconds) {
			return Err(Error::OutOfRange);
		}
		let seconds = seconds as u8;
		self.channel.write(self.offset + REG_TIMEOUT, seconds)?;
		self.timeout.store(seconds, Ordering::Relaxed);
		Ok(())
	}

	/// Seconds until the board resets, read live from the chip.
	pub fn get_time_left(&self) -> Result<u32, Error<E>> {
		Ok(u32::from(self.channel.read(self.offset + REG_COUNT)?))
	}

	/// Is the timer running, and is it locked?
	pub fn status(&self) -> Result<WatchdogStatus, Error<E>> {
		let ctrl = self.channel.read(self.offset + REG_CTRL)?;
		Ok(WatchdogStatus {
			active: ctrl & CTRL_EN != 0,
			locked: ctrl & CTRL_LOCK != 0,
		})
	}

	/// The last timeout we set or read, in seconds.
	pub fn timeout(&self) -> u32 {
		u32::from(self.timeout.load(Ordering::Relaxed))
	}

	/// Will [`Watchdog::start`] lock the watchdog on?
	pub fn nowayout(&self) -> bool {
		self.nowayout
	}

	/// What this watchdog can do.
	pub fn info(&self) -> &'static WatchdogInfo {
		&INFO
	}

	/// Stop the timer because the system is going down.
	///
	/// A locked watchdog is left running, and that isn't an error.
	pub fn shutdown(self) -> Result<(), Error<E>> {
		match self.stop() {
			Err(Error::Locked) => {
				warn!("CPLD watchdog is locked, leaving it running");
				Ok(())
			}
			other => other,
		}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------

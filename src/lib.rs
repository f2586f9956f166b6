//! # SMARC-sAL28 CPLD Driver
//!
//! This is a driver for the board management CPLD found on Kontron
//! SMARC-sAL28 modules. The CPLD sits on I²C and presents one small file of
//! 8-bit registers (`0x00` to `0x1F`), inside which several independent
//! peripheral blocks live at fixed byte offsets:
//!
//! * general purpose I/O blocks (bidirectional, input-only or output-only),
//!   with an optional edge interrupt demultiplexer,
//! * a single-channel PWM with four fixed frequencies,
//! * a watchdog timer with a hardware lock bit, and
//! * a fan tachometer.
//!
//! The chip itself is probed once ([`Chip::probe`]), which checks the
//! firmware version and publishes the chip's [`Channel`] in a [`Registry`].
//! Each peripheral block (a *facet*) then looks the chip up in the registry
//! when it attaches, and performs its register accesses at its own offset
//! within the shared register file.
//!
//! ```ignore
//! static REGISTRY: Registry<'static, Bus, 2> = Registry::new();
//! let chip = Chip::probe(&REGISTRY, ChipId::from_bus_address(0, 0x4A), channel)?;
//! let gpio = Gpio::attach(&REGISTRY, chip.id(), 0x10, GpioKind::Full)?;
//! gpio.set(3, true)?;
//! ```
//!
//! Logging goes through `log` by default, or `defmt` with the `defmt-log`
//! feature.

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

#![cfg_attr(not(test), no_std)]

// -----------------------------------------------------------------------------
// Logging
// -----------------------------------------------------------------------------

#[cfg(all(feature = "defmt-log", feature = "log"))]
compile_error!("Cannot enable both log and defmt-log");

#[cfg(feature = "log")]
use log::{debug, error, info, warn};

#[cfg(feature = "defmt-log")]
use defmt::{debug, error, info, warn};

#[cfg(all(not(feature = "defmt-log"), not(feature = "log")))]
#[macro_export]
/// Like log::debug! but does nothing at all
macro_rules! debug {
	($($arg:tt)+) => {};
}

#[cfg(all(not(feature = "defmt-log"), not(feature = "log")))]
#[macro_export]
/// Like log::info! but does nothing at all
macro_rules! info {
	($($arg:tt)+) => {};
}

#[cfg(all(not(feature = "defmt-log"), not(feature = "log")))]
#[macro_export]
/// Like log::warn! but does nothing at all
macro_rules! warn {
	($($arg:tt)+) => {};
}

#[cfg(all(not(feature = "defmt-log"), not(feature = "log")))]
#[macro_export]
/// Like log::error! but does nothing at all
macro_rules! error {
	($($arg:tt)+) => {};
}

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

pub mod channel;
pub mod chip;
pub mod error;
pub mod fan;
pub mod gpio;
pub mod irq;
pub mod mutex;
pub mod pwm;
pub mod registry;
pub mod watchdog;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

pub use channel::Channel;
pub use chip::{Chip, ChipId};
pub use error::Error;
pub use fan::Fan;
pub use gpio::{Capabilities, Direction, Gpio, GpioKind, Pin};
pub use irq::{InterruptController, IrqBatch, IrqReturn, Trigger};
pub use mutex::CsBusMutex;
pub use pwm::{Pwm, PwmMode, PwmState};
pub use registry::{Registry, RegistryHandle};
pub use watchdog::{Watchdog, WatchdogConfig, WatchdogInfo, WatchdogStatus};

/// Every interrupt-capable block on the CPLD has exactly this many lines.
pub const NUM_LINES: u8 = 8;

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------

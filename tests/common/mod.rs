//! A pretend CPLD on a pretend I²C bus, for the integration tests.
//!
//! Holds all 32 registers. Pending registers are write-one-to-clear, full
//! GPIO blocks loop their driven outputs back into their input register,
//! and reads or writes of chosen registers can be made to fail.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use embedded_hal::blocking::i2c::{Write, WriteRead};
use sl28_cpld::{chip, Channel, ChipId, Registry};

pub const ADDR: u8 = 0x4A;
pub const CHIP: ChipId = ChipId::from_bus_address(0, ADDR);

/// Where the blocks live on our pretend board.
pub const WDT_BASE: u8 = 0x04;
pub const FAN_BASE: u8 = 0x0B;
pub const PWM0_BASE: u8 = 0x0C;
pub const PWM1_BASE: u8 = 0x0E;
pub const GPIO0_BASE: u8 = 0x10;
pub const GPIO1_BASE: u8 = 0x15;
pub const GPI_BASE: u8 = 0x1A;
pub const GPO_BASE: u8 = 0x1B;

pub type FakeChannel = Channel<Mutex<FakeCpld>>;
pub type FakeRegistry<'a> = Registry<'a, Mutex<FakeCpld>, 4>;

/// The CPLD didn't ACK.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Nak;

type ReadHook = Box<dyn FnMut(u8, &mut [u8; 32]) + Send>;

struct State {
	regs: [u8; 32],
	/// Bit `n` set means register `n` is write-one-to-clear
	w1c: u32,
	/// Base offsets of full GPIO blocks
	loopback: Vec<u8>,
	fail_reads: u32,
	fail_writes: u32,
	writes: Vec<(u8, u8)>,
	after_read: Option<ReadHook>,
}

/// Cheap to clone; all clones share the same registers.
#[derive(Clone)]
pub struct FakeCpld {
	state: Arc<Mutex<State>>,
}

impl FakeCpld {
	/// A chip reporting the given firmware version, with the standard block
	/// layout above.
	pub fn new(version: u8) -> FakeCpld {
		let mut regs = [0u8; 32];
		regs[chip::REG_VERSION as usize] = version;
		let fake = FakeCpld {
			state: Arc::new(Mutex::new(State {
				regs,
				w1c: 0,
				loopback: Vec::new(),
				fail_reads: 0,
				fail_writes: 0,
				writes: Vec::new(),
				after_read: None,
			})),
		};
		fake.add_w1c(chip::REG_INTC_IP);
		fake.add_full_gpio(GPIO0_BASE);
		fake.add_full_gpio(GPIO1_BASE);
		fake
	}

	pub fn add_w1c(&self, register: u8) {
		self.state.lock().unwrap().w1c |= 1 << register;
	}

	pub fn add_full_gpio(&self, base: u8) {
		let mut state = self.state.lock().unwrap();
		state.loopback.push(base);
		state.w1c |= 1 << (base + 4);
	}

	/// Poke a register directly, as the hardware would.
	pub fn set_reg(&self, register: u8, value: u8) {
		self.state.lock().unwrap().regs[register as usize] = value;
	}

	/// Peek at a register without going through the bus.
	pub fn reg(&self, register: u8) -> u8 {
		self.state.lock().unwrap().regs[register as usize]
	}

	pub fn fail_reads_of(&self, register: u8, fail: bool) {
		let mut state = self.state.lock().unwrap();
		if fail {
			state.fail_reads |= 1 << register;
		} else {
			state.fail_reads &= !(1 << register);
		}
	}

	pub fn fail_writes_to(&self, register: u8, fail: bool) {
		let mut state = self.state.lock().unwrap();
		if fail {
			state.fail_writes |= 1 << register;
		} else {
			state.fail_writes &= !(1 << register);
		}
	}

	/// Every successful register write so far, oldest first.
	pub fn writes(&self) -> Vec<(u8, u8)> {
		self.state.lock().unwrap().writes.clone()
	}

	/// How many successful writes went to one register.
	pub fn writes_to(&self, register: u8) -> usize {
		self.writes().iter().filter(|(r, _)| *r == register).count()
	}

	pub fn clear_writes(&self) {
		self.state.lock().unwrap().writes.clear();
	}

	/// Run `hook` just after each register read has been answered.
	pub fn after_read<F>(&self, hook: F)
	where
		F: FnMut(u8, &mut [u8; 32]) + Send + 'static,
	{
		self.state.lock().unwrap().after_read = Some(Box::new(hook));
	}
}

impl State {
	fn value_of(&self, register: u8) -> u8 {
		for &base in &self.loopback {
			if register == base + 2 {
				let dir = self.regs[base as usize];
				let out = self.regs[base as usize + 1];
				let pins = self.regs[register as usize];
				return (out & dir) | (pins & !dir);
			}
		}
		self.regs[register as usize]
	}
}

impl Write for FakeCpld {
	type Error = Nak;

	fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Nak> {
		let mut state = self.state.lock().unwrap();
		let (register, value) = match (address, bytes) {
			(ADDR, [register, value]) if *register < 32 => (*register, *value),
			_ => return Err(Nak),
		};
		if state.fail_writes & (1 << register) != 0 {
			return Err(Nak);
		}
		if state.w1c & (1 << register) != 0 {
			state.regs[register as usize] &= !value;
		} else {
			state.regs[register as usize] = value;
		}
		state.writes.push((register, value));
		Ok(())
	}
}

impl WriteRead for FakeCpld {
	type Error = Nak;

	fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Nak> {
		let mut state = self.state.lock().unwrap();
		let register = match (address, bytes, buffer.len()) {
			(ADDR, [register], 1) if *register < 32 => *register,
			_ => return Err(Nak),
		};
		if state.fail_reads & (1 << register) != 0 {
			return Err(Nak);
		}
		buffer[0] = state.value_of(register);
		if let Some(mut hook) = state.after_read.take() {
			hook(register, &mut state.regs);
			state.after_read = Some(hook);
		}
		Ok(())
	}
}

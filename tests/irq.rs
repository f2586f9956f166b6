//! Interrupt batching and demultiplexing against the pretend chip.

mod common;

use std::num::NonZeroU32;

use common::*;
use sl28_cpld::{chip, Chip, Error, Gpio, GpioKind, IrqReturn, NUM_LINES};

const IE: u8 = GPIO0_BASE + 3;
const IP: u8 = GPIO0_BASE + 4;

fn virq(n: u32) -> NonZeroU32 {
	NonZeroU32::new(n).unwrap()
}

#[test]
fn batch_makes_one_enable_write() {
	let fake = FakeCpld::new(14);
	let channel = FakeChannel::new(fake.clone(), ADDR);
	let registry = FakeRegistry::new();
	let _chip = Chip::probe(&registry, CHIP, &channel).unwrap();
	let gpio = Gpio::attach(&registry, CHIP, GPIO0_BASE, GpioKind::Full)
		.unwrap()
		.with_interrupts()
		.unwrap();
	let irq = gpio.irq().unwrap();

	let mut batch = irq.bus_lock();
	for line in 0..NUM_LINES {
		batch.enable(line).unwrap();
	}
	for line in (0..NUM_LINES).step_by(2) {
		batch.disable(line).unwrap();
	}
	batch.enable(4).unwrap();
	// Nothing reaches the chip until the batch ends
	assert_eq!(fake.writes_to(IE), 0);
	batch.sync_unlock().unwrap();

	assert_eq!(fake.writes_to(IE), 1);
	assert_eq!(fake.reg(IE), 0b1011_1010);
}

#[test]
fn demux_acks_and_dispatches_enabled_lines_in_order() {
	let fake = FakeCpld::new(14);
	let channel = FakeChannel::new(fake.clone(), ADDR);
	let gpio = Gpio::new(&channel, GPIO0_BASE, GpioKind::Full)
		.unwrap()
		.with_interrupts()
		.unwrap();
	let irq = gpio.irq().unwrap();
	for line in 0..NUM_LINES {
		irq.map(line, virq(100 + u32::from(line))).unwrap();
	}
	let mut batch = irq.bus_lock();
	for line in [0, 2, 5, 7] {
		batch.enable(line).unwrap();
	}
	batch.sync_unlock().unwrap();

	// Lines 1 and 3 are pending but not enabled
	fake.set_reg(IP, 0b1010_1111);
	let mut seen = Vec::new();
	let result = irq.handle_irq(|line, virq| seen.push((line, virq.get())));

	assert_eq!(result, IrqReturn::Handled);
	assert_eq!(seen, vec![(0, 100), (2, 102), (5, 105), (7, 107)]);
	// Acked bits are gone, the disabled ones stay latched
	assert_eq!(fake.reg(IP), 0b0000_1010);
}

#[test]
fn edge_arriving_during_the_scan_is_not_lost() {
	let fake = FakeCpld::new(14);
	let channel = FakeChannel::new(fake.clone(), ADDR);
	let gpio = Gpio::new(&channel, GPIO0_BASE, GpioKind::Full)
		.unwrap()
		.with_interrupts()
		.unwrap();
	let irq = gpio.irq().unwrap();
	irq.map(1, virq(11)).unwrap();
	irq.map(3, virq(13)).unwrap();
	let mut batch = irq.bus_lock();
	batch.enable(1).unwrap();
	batch.enable(3).unwrap();
	batch.sync_unlock().unwrap();

	// Line 3 fires just after the worker has read the pending register
	let mut fired = false;
	fake.after_read(move |register, regs| {
		if register == IP && !fired {
			fired = true;
			regs[IP as usize] |= 1 << 3;
		}
	});

	fake.set_reg(IP, 0b0000_0010);
	let mut seen = Vec::new();
	irq.handle_irq(|line, _| seen.push(line));
	assert_eq!(seen, vec![1]);
	assert_eq!(fake.reg(IP), 0b0000_1000);

	seen.clear();
	irq.handle_irq(|line, _| seen.push(line));
	assert_eq!(seen, vec![3]);
	assert_eq!(fake.reg(IP), 0);
}

#[test]
fn unreadable_pending_register_is_not_handled() {
	let fake = FakeCpld::new(14);
	let channel = FakeChannel::new(fake.clone(), ADDR);
	let gpio = Gpio::new(&channel, GPIO0_BASE, GpioKind::Full)
		.unwrap()
		.with_interrupts()
		.unwrap();
	let irq = gpio.irq().unwrap();
	irq.map(0, virq(1)).unwrap();
	let mut batch = irq.bus_lock();
	batch.enable(0).unwrap();
	batch.sync_unlock().unwrap();
	fake.clear_writes();

	fake.set_reg(IP, 0b0000_0001);
	fake.fail_reads_of(IP, true);
	let mut calls = 0;
	assert_eq!(irq.handle_irq(|_, _| calls += 1), IrqReturn::None);
	assert_eq!(calls, 0);
	assert!(fake.writes().is_empty());
	assert_eq!(fake.reg(IP), 0b0000_0001);
}

#[test]
fn handler_can_mask_its_own_line() {
	let fake = FakeCpld::new(14);
	let channel = FakeChannel::new(fake.clone(), ADDR);
	let gpio = Gpio::new(&channel, GPIO0_BASE, GpioKind::Full)
		.unwrap()
		.with_interrupts()
		.unwrap();
	let irq = gpio.irq().unwrap();
	irq.map(6, virq(60)).unwrap();
	let mut batch = irq.bus_lock();
	batch.enable(6).unwrap();
	batch.enable(2).unwrap();
	batch.sync_unlock().unwrap();

	fake.set_reg(IP, 0b0100_0000);
	let result = irq.handle_irq(|line, _| {
		let mut batch = irq.bus_lock();
		batch.disable(line).unwrap();
		batch.sync_unlock().unwrap();
		// And the handler can still talk to the chip
		gpio.set(line, true).unwrap();
	});

	assert_eq!(result, IrqReturn::Handled);
	assert_eq!(fake.reg(IE), 0b0000_0100);
	assert_eq!(irq.enabled_mask(), 0b0000_0100);
	assert_eq!(fake.reg(GPIO0_BASE + 1), 0b0100_0000);
}

#[test]
fn chip_level_interrupts_use_the_same_demux() {
	let fake = FakeCpld::new(14);
	let channel = FakeChannel::new(fake.clone(), ADDR);
	let registry = FakeRegistry::new();
	let chip = Chip::probe(&registry, CHIP, &channel).unwrap();
	let irq = chip.irq();

	irq.map(4, virq(40)).unwrap();
	{
		let mut batch = irq.bus_lock();
		batch.enable(4).unwrap();
		// Dropped without sync_unlock, still committed
	}
	assert_eq!(fake.reg(chip::REG_INTC_IE), 0b0001_0000);

	fake.set_reg(chip::REG_INTC_IP, 0b0001_0001);
	let mut seen = Vec::new();
	irq.handle_irq(|_, virq| seen.push(virq.get()));
	assert_eq!(seen, vec![40]);
	assert_eq!(fake.reg(chip::REG_INTC_IP), 0b0000_0001);
}

#[test]
fn worker_and_batches_run_concurrently() {
	let fake = FakeCpld::new(14);
	let channel = FakeChannel::new(fake.clone(), ADDR);
	let gpio = Gpio::new(&channel, GPIO0_BASE, GpioKind::Full)
		.unwrap()
		.with_interrupts()
		.unwrap();
	let irq = gpio.irq().unwrap();
	for line in 0..NUM_LINES {
		irq.map(line, virq(1 + u32::from(line))).unwrap();
	}

	std::thread::scope(|s| {
		s.spawn(|| {
			for i in 0..200u32 {
				let mut batch = irq.bus_lock();
				let line = (i % u32::from(NUM_LINES)) as u8;
				if i % 3 == 0 {
					batch.disable(line).unwrap();
				} else {
					batch.enable(line).unwrap();
				}
				batch.sync_unlock().unwrap();
			}
		});
		s.spawn(|| {
			for _ in 0..200 {
				fake.set_reg(IP, 0xFF);
				irq.handle_irq(|line, _| {
					gpio.get(line).unwrap();
				});
			}
		});
	});

	// The chip agrees with the cache once everything has settled
	assert_eq!(fake.reg(IE), irq.enabled_mask());
}

#[test]
fn failed_ack_still_dispatches_and_leaves_bits_pending() {
	let fake = FakeCpld::new(14);
	let channel = FakeChannel::new(fake.clone(), ADDR);
	let gpio = Gpio::new(&channel, GPIO0_BASE, GpioKind::Full)
		.unwrap()
		.with_interrupts()
		.unwrap();
	let irq = gpio.irq().unwrap();
	irq.map(1, virq(21)).unwrap();
	let mut batch = irq.bus_lock();
	batch.enable(1).unwrap();
	batch.sync_unlock().unwrap();

	fake.set_reg(IP, 0b0000_0010);
	fake.fail_writes_to(IP, true);
	let mut seen = Vec::new();
	assert_eq!(irq.handle_irq(|line, _| seen.push(line)), IrqReturn::Handled);
	assert_eq!(seen, vec![1]);
	assert_eq!(fake.reg(IP), 0b0000_0010);

	// Once the chip takes writes again the same edge is seen and cleared
	fake.fail_writes_to(IP, false);
	seen.clear();
	irq.handle_irq(|line, _| seen.push(line));
	assert_eq!(seen, vec![1]);
	assert_eq!(fake.reg(IP), 0);
}

#[test]
fn failed_commit_on_drop_keeps_the_cache() {
	let fake = FakeCpld::new(14);
	let channel = FakeChannel::new(fake.clone(), ADDR);
	let gpio = Gpio::new(&channel, GPIO0_BASE, GpioKind::Full)
		.unwrap()
		.with_interrupts()
		.unwrap();
	let irq = gpio.irq().unwrap();

	fake.fail_writes_to(IE, true);
	{
		let mut batch = irq.bus_lock();
		batch.enable(2).unwrap();
	}
	assert_eq!(irq.enabled_mask(), 0b0000_0100);
	assert_eq!(fake.reg(IE), 0);

	// An explicit commit reports the failure
	let mut batch = irq.bus_lock();
	batch.enable(5).unwrap();
	assert!(matches!(
		batch.sync_unlock(),
		Err(Error::Transport(Nak))
	));

	// The next successful commit catches the chip up
	fake.fail_writes_to(IE, false);
	let batch = irq.bus_lock();
	batch.sync_unlock().unwrap();
	assert_eq!(fake.reg(IE), 0b0010_0100);
}

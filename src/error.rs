//! Errors reported by the CPLD driver.

/// Everything that can go wrong when talking to the CPLD.
///
/// `E` is the error type of the underlying I²C bus. Nothing in this crate
/// retries; every error goes straight back to the caller.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error<E> {
	/// The I²C transaction failed.
	Transport(E),
	/// The parent chip has not been registered yet. Try attaching again later.
	NotReady,
	/// A chip with this identity is already in the registry.
	AlreadyRegistered,
	/// The registry has no free slots.
	RegistryFull,
	/// The PWM block only runs at four fixed periods, and this wasn't one.
	UnsupportedPeriod,
	/// Interrupt lines only trigger on both edges.
	UnsupportedTriggerType,
	/// A register offset, line number or timeout was outside its valid range.
	OutOfRange,
	/// The CPLD firmware is older than the minimum we support. Holds the
	/// version we found.
	VersionTooOld(u8),
	/// This variant of the block does not offer that operation.
	NotSupported,
	/// The watchdog lock bit is set, so it cannot be stopped.
	Locked,
}

impl<E> Error<E> {
	/// Is this a "come back later" error, rather than a real failure?
	pub fn is_retry_later(&self) -> bool {
		matches!(self, Error::NotReady)
	}
}

impl<E> core::fmt::Display for Error<E>
where
	E: core::fmt::Debug,
{
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		match self {
			Error::Transport(e) => write!(f, "I2C transport error: {:?}", e),
			Error::NotReady => write!(f, "CPLD not registered yet"),
			Error::AlreadyRegistered => write!(f, "CPLD already registered"),
			Error::RegistryFull => write!(f, "CPLD registry full"),
			Error::UnsupportedPeriod => write!(f, "unsupported PWM period"),
			Error::UnsupportedTriggerType => write!(f, "unsupported interrupt trigger type"),
			Error::OutOfRange => write!(f, "value out of range"),
			Error::VersionTooOld(v) => write!(f, "CPLD version {} too old", v),
			Error::NotSupported => write!(f, "operation not supported"),
			Error::Locked => write!(f, "watchdog is locked"),
		}
	}
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the error codes shared by the drivers, the emulator and the
    escalation reset scenario.

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Escalation test error type
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EscError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code, plus a lookup from code to name.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:literal, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: EscError = EscError::new_const($value);
        )*

        /// Returns the constant name for a known error code.
        pub fn name(&self) -> Option<&'static str> {
            match self.0.get() {
                $(
                    $value => Some(stringify!($name)),
                )*
                _ => None,
            }
        }

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl EscError {
    /// Create an error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get an EscError from a u32 is to
    /// use `EscError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("EscError cannot be 0"),
        }
    }

    /// Component identifier held in the upper 16 bits.
    pub const fn component(&self) -> u16 {
        (self.0.get() >> 16) as u16
    }

    define_error_constants![
        (
            DRIVER_CLKMGR_INIT_FAILURE,
            0x0001_0001,
            "Driver Error: clock manager handle could not be initialized"
        ),
        (
            DRIVER_RSTMGR_INIT_FAILURE,
            0x0001_0002,
            "Driver Error: reset manager handle could not be initialized"
        ),
        (
            DRIVER_AON_TIMER_INIT_FAILURE,
            0x0001_0003,
            "Driver Error: always-on timer handle could not be initialized"
        ),
        (
            DRIVER_PLIC_INIT_FAILURE,
            0x0001_0004,
            "Driver Error: interrupt controller handle could not be initialized"
        ),
        (
            DRIVER_ALERT_HANDLER_INIT_FAILURE,
            0x0001_0005,
            "Driver Error: alert handler handle could not be initialized"
        ),
        (
            TIMING_ZERO_FREQUENCY,
            0x0002_0001,
            "Timing Error: clock frequency is zero"
        ),
        (
            TIMING_CYCLE_OVERFLOW,
            0x0002_0002,
            "Timing Error: cycle count does not fit in 32 bits"
        ),
        (
            TIMING_INVALID_PLAN,
            0x0002_0003,
            "Timing Error: watchdog thresholds do not bracket escalation phase 1"
        ),
        (
            DRIVER_ALERT_HANDLER_LOCKED,
            0x0003_0001,
            "Driver Error: alert handler configuration is locked"
        ),
        (
            DRIVER_ALERT_HANDLER_BAD_ALERT,
            0x0003_0002,
            "Driver Error: alert id out of range"
        ),
        (
            DRIVER_ALERT_HANDLER_BAD_CLASS,
            0x0003_0003,
            "Driver Error: alert class out of range"
        ),
        (
            DRIVER_ALERT_HANDLER_BAD_PHASE_ORDER,
            0x0003_0004,
            "Driver Error: escalation phases are not strictly ordered"
        ),
        (
            DRIVER_ALERT_HANDLER_BAD_SIGNAL,
            0x0003_0005,
            "Driver Error: escalation signal out of range or decreasing"
        ),
        (
            DRIVER_ALERT_HANDLER_BAD_CONFIG,
            0x0003_0006,
            "Driver Error: alert handler configuration lists are inconsistent"
        ),
        (
            DRIVER_AON_TIMER_BAD_THRESHOLDS,
            0x0004_0001,
            "Driver Error: watchdog bark threshold must be below bite threshold"
        ),
        (
            DRIVER_AON_TIMER_LOCKED,
            0x0004_0002,
            "Driver Error: watchdog configuration is locked"
        ),
        (
            DRIVER_PLIC_BAD_IRQ_ID,
            0x0005_0001,
            "Driver Error: interrupt id out of range"
        ),
        (
            DRIVER_PLIC_BAD_RANGE,
            0x0005_0002,
            "Driver Error: interrupt range is empty or inverted"
        ),
        (
            DRIVER_PLIC_BAD_TARGET,
            0x0005_0003,
            "Driver Error: interrupt target does not exist"
        ),
        (
            DRIVER_PLIC_NOTHING_PENDING,
            0x0005_0004,
            "Driver Error: claim with no pending interrupt"
        ),
        (
            DRIVER_PLIC_COMPLETE_NOT_CLAIMED,
            0x0005_0005,
            "Driver Error: completed an interrupt id that was not claimed"
        ),
        (
            SCENARIO_INITIALIZATION_FAILURE,
            0x0010_0001,
            "Scenario Error: peripheral initialization failed"
        ),
        (
            SCENARIO_UNEXPECTED_WATCHDOG_INTERRUPT,
            0x0010_0002,
            "Scenario Error: watchdog interrupt observed while escalation should suppress it"
        ),
        (
            SCENARIO_WRONG_ESCALATION_PHASE,
            0x0010_0003,
            "Scenario Error: escalation class was not in phase 0 at interrupt time"
        ),
        (
            SCENARIO_UNEXPECTED_ALERT_CAUSE,
            0x0010_0004,
            "Scenario Error: expected alert is not the recorded escalation cause"
        ),
        (
            SCENARIO_UNEXPECTED_FAULT_CODE,
            0x0010_0005,
            "Scenario Error: clock manager fatal codes differ from the injected fault"
        ),
        (
            SCENARIO_UNEXPECTED_RESET_CAUSE,
            0x0010_0006,
            "Scenario Error: reset info is neither power-on nor escalation"
        ),
        (
            SCENARIO_FAULT_NOT_CLEARED,
            0x0010_0007,
            "Scenario Error: clock manager fatal codes survived the escalation reset"
        ),
        (
            SCENARIO_ALERT_CAUSE_NOT_CLEARED,
            0x0010_0008,
            "Scenario Error: alert cause survived the escalation reset"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::EscError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::EscError(val)
    }
}

impl From<EscError> for core::num::NonZeroU32 {
    fn from(val: EscError) -> Self {
        val.0
    }
}

impl From<EscError> for u32 {
    fn from(val: EscError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for EscError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(EscError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type EscResult<T> = Result<T, EscError>;

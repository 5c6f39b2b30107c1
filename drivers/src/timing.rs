/*++

Licensed under the Apache-2.0 license.

File Name:

    timing.rs

Abstract:

    File contains the conversion of microsecond durations into clock cycles
    and the ordering rules between watchdog thresholds and escalation phases.

--*/

use crate::{EscError, EscResult};

pub const MICROS_PER_SECOND: u64 = 1_000_000;

/// 64-bit division by shift and subtract.
///
/// The target core has no 64-bit divide instruction, so the division is done
/// one quotient bit at a time. Returns `None` if `divisor` is zero.
///
/// # Arguments
///
/// * `dividend` - Dividend
/// * `divisor` - Divisor
/// * `rem_out` - Optional remainder output
pub fn udiv64_slow(dividend: u64, divisor: u64, rem_out: Option<&mut u64>) -> Option<u64> {
    if divisor == 0 {
        return None;
    }
    let mut quotient = 0u64;
    let mut remainder = 0u64;
    for bit in (0..64).rev() {
        remainder = (remainder << 1) | ((dividend >> bit) & 1);
        if remainder >= divisor {
            remainder -= divisor;
            quotient |= 1 << bit;
        }
    }
    if let Some(rem) = rem_out {
        *rem = remainder;
    }
    Some(quotient)
}

/// Convert a duration in microseconds into cycles of a clock running at
/// `freq_hz`, rounding down.
///
/// # Arguments
///
/// * `micros` - Duration in microseconds
/// * `freq_hz` - Clock frequency
///
/// # Returns
///
/// * `u32` - Cycle count; fails rather than truncating if it does not fit
pub fn cycles_from_micros(micros: u64, freq_hz: u64) -> EscResult<u32> {
    if freq_hz == 0 {
        return Err(EscError::TIMING_ZERO_FREQUENCY);
    }
    let product = micros
        .checked_mul(freq_hz)
        .ok_or(EscError::TIMING_CYCLE_OVERFLOW)?;
    let cycles =
        udiv64_slow(product, MICROS_PER_SECOND, None).ok_or(EscError::TIMING_ZERO_FREQUENCY)?;
    u32::try_from(cycles).map_err(|_| EscError::TIMING_CYCLE_OVERFLOW)
}

/// Watchdog thresholds and escalation phase durations, in microseconds.
///
/// The watchdog must bark while escalation sits in phase 1 and must never
/// bite, because the escalation reset at the start of phase 2 comes first.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TimingPlan {
    pub wdog_bark_micros: u64,
    pub wdog_bite_micros: u64,
    pub phase0_micros: u64,
    pub phase1_micros: u64,
    pub phase2_micros: u64,
}

impl TimingPlan {
    /// Time at which escalation leaves phase 1 and requests the reset.
    pub const fn escalation_reset_micros(&self) -> u64 {
        self.phase0_micros.saturating_add(self.phase1_micros)
    }

    /// Usable in const context so a plan can be checked at build time.
    pub const fn is_valid(&self) -> bool {
        let reset_at = self.escalation_reset_micros();
        self.wdog_bark_micros < self.wdog_bite_micros
            && self.wdog_bark_micros > self.phase0_micros
            && self.wdog_bark_micros < reset_at
            && self.wdog_bite_micros > reset_at
    }

    pub fn validate(&self) -> EscResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(EscError::TIMING_INVALID_PLAN)
        }
    }

    /// Escalation phase durations in cycles of `freq_hz`.
    pub fn phase_cycles(&self, freq_hz: u64) -> EscResult<[u32; 3]> {
        Ok([
            cycles_from_micros(self.phase0_micros, freq_hz)?,
            cycles_from_micros(self.phase1_micros, freq_hz)?,
            cycles_from_micros(self.phase2_micros, freq_hz)?,
        ])
    }

    /// Watchdog (bark, bite) thresholds in cycles of `freq_hz`.
    pub fn watchdog_cycles(&self, freq_hz: u64) -> EscResult<(u32, u32)> {
        Ok((
            cycles_from_micros(self.wdog_bark_micros, freq_hz)?,
            cycles_from_micros(self.wdog_bite_micros, freq_hz)?,
        ))
    }
}

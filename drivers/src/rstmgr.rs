/*++

Licensed under the Apache-2.0 license.

File Name:

    rstmgr.rs

Abstract:

    File contains the reset manager capability and reset reason decoding.

--*/

use crate::EscResult;
use bitflags::bitflags;

bitflags! {
    /// Reset info register bits. The register survives resets and
    /// accumulates causes until software clears it.
    #[derive(Default)]
    pub struct ResetInfo: u32 {
        const POR = 1 << 0;
        const LOW_POWER_EXIT = 1 << 1;
        const SW = 1 << 2;
        const SYSRST_CTRL = 1 << 3;
        const WATCHDOG = 1 << 4;
        const POWER_UNSTABLE = 1 << 5;
        const ESCALATION = 1 << 6;
    }
}

/// Reset manager capability
pub trait RstMgr {
    /// Raw reset info bitfield
    fn reset_info(&self) -> EscResult<u32>;

    /// Clear every reset info bit
    fn reset_info_clear(&self) -> EscResult<()>;
}

/// Reset Reason
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ResetReason {
    /// Power-on reset, first boot
    PowerOn,

    /// System reset requested by alert escalation
    Escalation,

    /// Any other combination of reset info bits
    Other(u32),
}

impl From<u32> for ResetReason {
    fn from(raw: u32) -> Self {
        if raw == ResetInfo::POR.bits() {
            ResetReason::PowerOn
        } else if raw == ResetInfo::ESCALATION.bits() {
            ResetReason::Escalation
        } else {
            ResetReason::Other(raw)
        }
    }
}

/// Read the reset reason, then clear the register so that the next reset's
/// cause is unambiguous.
pub fn reason_get_and_clear<R: RstMgr + ?Sized>(rstmgr: &R) -> EscResult<(ResetReason, u32)> {
    let raw = rstmgr.reset_info()?;
    rstmgr.reset_info_clear()?;
    Ok((ResetReason::from(raw), raw))
}

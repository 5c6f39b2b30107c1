/*++

Licensed under the Apache-2.0 license.

File Name:

    rstmgr.rs

Abstract:

    File contains the emulated reset manager. The reset info register lives
    in the always-on domain: system resets OR their cause into it and only a
    power-on reset overwrites it.

--*/

use escrst_drivers::{EscResult, ResetInfo, RstMgr as RstMgrCapability};
use std::cell::RefCell;
use std::rc::Rc;

/// Reset manager
#[derive(Clone)]
pub struct RstMgr {
    regs: Rc<RefCell<RstMgrImpl>>,
}

struct RstMgrImpl {
    reset_info: u32,
}

impl Default for RstMgr {
    fn default() -> Self {
        Self::new()
    }
}

impl RstMgr {
    /// Create a reset manager in its power-on state
    pub fn new() -> Self {
        Self {
            regs: Rc::new(RefCell::new(RstMgrImpl {
                reset_info: ResetInfo::POR.bits(),
            })),
        }
    }

    pub fn power_on_reset(&self) {
        self.regs.borrow_mut().reset_info = ResetInfo::POR.bits();
    }

    /// Record the cause of a system reset
    pub fn record_reset(&self, cause: ResetInfo) {
        self.regs.borrow_mut().reset_info |= cause.bits();
    }

    /// Overwrite the register, e.g. to model a stale value left by an
    /// earlier boot stage.
    pub fn set_reset_info(&self, raw: u32) {
        self.regs.borrow_mut().reset_info = raw;
    }
}

impl RstMgrCapability for RstMgr {
    fn reset_info(&self) -> EscResult<u32> {
        Ok(self.regs.borrow().reset_info)
    }

    fn reset_info_clear(&self) -> EscResult<()> {
        // Write-one-to-clear of every bit
        self.regs.borrow_mut().reset_info = 0;
        Ok(())
    }
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    clkmgr.rs

Abstract:

    File contains the emulated clock manager: the fatal error code register
    and the fatal fault alert it drives.

--*/

use escrst_drivers::{ClkMgr as ClkMgrCapability, EscResult, FatalErrCodes};
use std::cell::RefCell;
use std::rc::Rc;

/// Clock manager
#[derive(Clone, Default)]
pub struct ClkMgr {
    regs: Rc<RefCell<ClkMgrImpl>>,
}

#[derive(Default)]
struct ClkMgrImpl {
    fatal_err_code: FatalErrCodes,
}

impl ClkMgr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch a fatal error. The fatal fault alert stays asserted until reset.
    pub fn inject_fault(&self, codes: FatalErrCodes) {
        self.regs.borrow_mut().fatal_err_code |= codes;
    }

    /// Whether the fatal fault alert is asserted
    pub fn fatal_alert_asserted(&self) -> bool {
        !self.regs.borrow().fatal_err_code.is_empty()
    }

    pub fn reset(&self) {
        *self.regs.borrow_mut() = ClkMgrImpl::default();
    }
}

impl ClkMgrCapability for ClkMgr {
    fn fatal_err_codes(&self) -> EscResult<FatalErrCodes> {
        Ok(self.regs.borrow().fatal_err_code)
    }
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    cpu.rs

Abstract:

    File contains the core-local state of the emulated main core: interrupt
    enables, the fatal firmware error register and the abort request.

--*/

use escrst_drivers::Cpu as CpuCapability;
use std::cell::RefCell;
use std::rc::Rc;

/// Core-local state of the main core
#[derive(Clone, Default)]
pub struct Cpu {
    regs: Rc<RefCell<CpuImpl>>,
}

#[derive(Default)]
struct CpuImpl {
    global_irq_enabled: bool,
    external_irq_enabled: bool,
    fw_error_fatal: u32,
    abort_requested: bool,
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an external interrupt would be taken now
    pub fn irq_deliverable(&self) -> bool {
        let regs = self.regs.borrow();
        regs.global_irq_enabled && regs.external_irq_enabled
    }

    /// First fatal error code reported this boot, zero if none
    pub fn fw_error_fatal(&self) -> u32 {
        self.regs.borrow().fw_error_fatal
    }

    /// Consume a pending abort request.
    pub fn take_abort(&self) -> bool {
        std::mem::take(&mut self.regs.borrow_mut().abort_requested)
    }

    pub fn reset(&self) {
        *self.regs.borrow_mut() = CpuImpl::default();
    }
}

impl CpuCapability for Cpu {
    fn irq_global_ctrl(&self, enable: bool) {
        self.regs.borrow_mut().global_irq_enabled = enable;
    }

    fn irq_external_ctrl(&self, enable: bool) {
        self.regs.borrow_mut().external_irq_enabled = enable;
    }

    fn report_fw_error_fatal(&self, code: u32) {
        let mut regs = self.regs.borrow_mut();
        if regs.fw_error_fatal == 0 {
            regs.fw_error_fatal = code;
        }
    }

    fn abort(&self) {
        self.regs.borrow_mut().abort_requested = true;
    }
}

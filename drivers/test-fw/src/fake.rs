// Licensed under the Apache-2.0 license

//! Register-level stand-in for the platform, for unit tests of the test flow.

use escrst_drivers::alert_handler::{AlertHandlerIrq, ClassConfig, ClassState};
use escrst_drivers::{
    AlertClass, AlertHandler, AlertId, AonTimer, ClkMgr, Cpu, EscError, EscResult,
    FatalErrCodes, IrqId, Platform, Plic, PlicTarget, RstMgr,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Default)]
struct FakeState {
    irq_global: Cell<bool>,
    irq_external: Cell<bool>,
    fatal_error: Cell<u32>,
    aborted: Cell<bool>,
    fatal_err_codes: Cell<FatalErrCodes>,
    reset_info: Cell<u32>,
    watchdog: Cell<Option<(u32, u32)>>,
    plic_pending: RefCell<VecDeque<IrqId>>,
    plic_enabled: RefCell<Vec<IrqId>>,
    plic_completed: RefCell<Vec<IrqId>>,
    class_state: Cell<Option<ClassState>>,
    alert_cause: Cell<bool>,
    class_irq_enabled: Cell<bool>,
    class_irq_disables: Cell<u32>,
    class_irq_acks: RefCell<Vec<AlertHandlerIrq>>,
    alerts_locked: Cell<bool>,
    classes_locked: Cell<bool>,
    ping_locked: Cell<bool>,
}

/// Every peripheral of the fake platform; clones share state.
#[derive(Clone, Default)]
pub struct FakeHw(Rc<FakeState>);

impl FakeHw {
    pub fn set_reset_info(&self, raw: u32) {
        self.0.reset_info.set(raw);
    }

    pub fn reset_info(&self) -> u32 {
        self.0.reset_info.get()
    }

    pub fn set_fatal_err_codes(&self, codes: FatalErrCodes) {
        self.0.fatal_err_codes.set(codes);
    }

    pub fn set_class_state(&self, state: ClassState) {
        self.0.class_state.set(Some(state));
    }

    pub fn set_alert_cause(&self, cause: bool) {
        self.0.alert_cause.set(cause);
    }

    pub fn raise_irq(&self, irq: IrqId) {
        self.0.plic_pending.borrow_mut().push_back(irq);
    }

    pub fn irqs_enabled(&self) -> bool {
        self.0.irq_global.get() && self.0.irq_external.get()
    }

    pub fn fatal_error(&self) -> u32 {
        self.0.fatal_error.get()
    }

    pub fn aborted(&self) -> bool {
        self.0.aborted.get()
    }

    pub fn watchdog(&self) -> Option<(u32, u32)> {
        self.0.watchdog.get()
    }

    pub fn plic_enabled(&self) -> Vec<IrqId> {
        self.0.plic_enabled.borrow().clone()
    }

    pub fn plic_completed(&self) -> Vec<IrqId> {
        self.0.plic_completed.borrow().clone()
    }

    pub fn class_irq_enabled(&self) -> bool {
        self.0.class_irq_enabled.get()
    }

    pub fn class_irq_disables(&self) -> u32 {
        self.0.class_irq_disables.get()
    }

    pub fn class_irq_acks(&self) -> u32 {
        self.0.class_irq_acks.borrow().len() as u32
    }

    pub fn acknowledged_irqs(&self) -> Vec<AlertHandlerIrq> {
        self.0.class_irq_acks.borrow().clone()
    }

    pub fn alert_config_locked(&self) -> bool {
        self.0.alerts_locked.get() && self.0.classes_locked.get() && self.0.ping_locked.get()
    }

    /// Alert handler part of a system reset: configuration locks are released.
    pub fn reset_alert_handler(&self) {
        self.0.alerts_locked.set(false);
        self.0.classes_locked.set(false);
        self.0.ping_locked.set(false);
        self.0.class_irq_enabled.set(false);
    }
}

fn configure_lockable(locked: &Cell<bool>, lock: bool) -> EscResult<()> {
    if locked.get() {
        return Err(EscError::DRIVER_ALERT_HANDLER_LOCKED);
    }
    locked.set(lock);
    Ok(())
}

impl Cpu for FakeHw {
    fn irq_global_ctrl(&self, enable: bool) {
        self.0.irq_global.set(enable);
    }

    fn irq_external_ctrl(&self, enable: bool) {
        self.0.irq_external.set(enable);
    }

    fn report_fw_error_fatal(&self, code: u32) {
        self.0.fatal_error.set(code);
    }

    fn abort(&self) {
        self.0.aborted.set(true);
    }
}

impl ClkMgr for FakeHw {
    fn fatal_err_codes(&self) -> EscResult<FatalErrCodes> {
        Ok(self.0.fatal_err_codes.get())
    }
}

impl RstMgr for FakeHw {
    fn reset_info(&self) -> EscResult<u32> {
        Ok(self.0.reset_info.get())
    }

    fn reset_info_clear(&self) -> EscResult<()> {
        self.0.reset_info.set(0);
        Ok(())
    }
}

impl AonTimer for FakeHw {
    fn watchdog_start(&self, bark: u32, bite: u32, _pause: bool, _lock: bool) -> EscResult<()> {
        self.0.watchdog.set(Some((bark, bite)));
        Ok(())
    }

    fn watchdog_stop(&self) -> EscResult<()> {
        self.0.watchdog.set(None);
        Ok(())
    }

    fn wakeup_stop(&self) -> EscResult<()> {
        Ok(())
    }

    fn irq_acknowledge_all(&self) -> EscResult<()> {
        Ok(())
    }

    fn watchdog_thresholds(&self) -> EscResult<Option<(u32, u32)>> {
        Ok(self.0.watchdog.get())
    }
}

impl Plic for FakeHw {
    fn irq_set_priority(&self, _irq: IrqId, _priority: u32) -> EscResult<()> {
        Ok(())
    }

    fn irq_set_enabled(&self, _target: PlicTarget, irq: IrqId, enabled: bool) -> EscResult<()> {
        if enabled {
            self.0.plic_enabled.borrow_mut().push(irq);
        }
        Ok(())
    }

    fn target_set_threshold(&self, _target: PlicTarget, _threshold: u32) -> EscResult<()> {
        Ok(())
    }

    fn claim(&self, _target: PlicTarget) -> EscResult<IrqId> {
        self.0
            .plic_pending
            .borrow_mut()
            .pop_front()
            .ok_or(EscError::DRIVER_PLIC_NOTHING_PENDING)
    }

    fn complete(&self, _target: PlicTarget, irq: IrqId) -> EscResult<()> {
        self.0.plic_completed.borrow_mut().push(irq);
        Ok(())
    }
}

impl AlertHandler for FakeHw {
    fn configure_alert(
        &self,
        _alert: AlertId,
        _class: AlertClass,
        _enabled: bool,
        lock: bool,
    ) -> EscResult<()> {
        configure_lockable(&self.0.alerts_locked, lock)
    }

    fn configure_class(
        &self,
        _class: AlertClass,
        config: &ClassConfig,
        _enabled: bool,
        lock: bool,
    ) -> EscResult<()> {
        config.validate()?;
        configure_lockable(&self.0.classes_locked, lock)
    }

    fn configure_ping_timer(&self, _timeout: u32, _enabled: bool, lock: bool) -> EscResult<()> {
        configure_lockable(&self.0.ping_locked, lock)
    }

    fn class_state(&self, _class: AlertClass) -> EscResult<ClassState> {
        Ok(self.0.class_state.get().unwrap_or(ClassState::Idle))
    }

    fn alert_is_cause(&self, _alert: AlertId) -> EscResult<bool> {
        Ok(self.0.alert_cause.get())
    }

    fn irq_set_enabled(&self, _irq: AlertHandlerIrq, enabled: bool) -> EscResult<()> {
        if !enabled {
            self.0
                .class_irq_disables
                .set(self.0.class_irq_disables.get() + 1);
        }
        self.0.class_irq_enabled.set(enabled);
        Ok(())
    }

    fn irq_acknowledge(&self, irq: AlertHandlerIrq) -> EscResult<()> {
        self.0.class_irq_acks.borrow_mut().push(irq);
        Ok(())
    }
}

pub struct FakePlatform {
    hw: FakeHw,
    fail_init: bool,
}

impl FakePlatform {
    pub fn new(hw: &FakeHw) -> Self {
        Self {
            hw: hw.clone(),
            fail_init: false,
        }
    }

    /// Platform whose interrupt controller cannot be initialized
    pub fn failing(hw: &FakeHw) -> Self {
        Self {
            hw: hw.clone(),
            fail_init: true,
        }
    }
}

impl Platform for FakePlatform {
    type Cpu = FakeHw;
    type ClkMgr = FakeHw;
    type RstMgr = FakeHw;
    type AonTimer = FakeHw;
    type Plic = FakeHw;
    type AlertHandler = FakeHw;

    fn cpu(&self) -> &FakeHw {
        &self.hw
    }

    fn clkmgr_init(&self) -> EscResult<FakeHw> {
        Ok(self.hw.clone())
    }

    fn rstmgr_init(&self) -> EscResult<FakeHw> {
        Ok(self.hw.clone())
    }

    fn aon_timer_init(&self) -> EscResult<FakeHw> {
        Ok(self.hw.clone())
    }

    fn plic_init(&self) -> EscResult<FakeHw> {
        if self.fail_init {
            return Err(EscError::DRIVER_PLIC_INIT_FAILURE);
        }
        Ok(self.hw.clone())
    }

    fn alert_handler_init(&self) -> EscResult<FakeHw> {
        Ok(self.hw.clone())
    }
}

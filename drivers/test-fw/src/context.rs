/*++

Licensed under the Apache-2.0 license.

File Name:

    context.rs

Abstract:

    File contains the state shared between the main flow and the external
    interrupt handler of one boot.

--*/

use crate::observer::{Observer, ObserverState};
use core::cell::{Cell, OnceCell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};
use escrst_drivers::{log_error, Cpu, EscError, EscResult, Platform};

/// Peripheral handles initialized once per boot
pub struct Peripherals<P: Platform> {
    pub clkmgr: P::ClkMgr,
    pub rstmgr: P::RstMgr,
    pub aon_timer: P::AonTimer,
    pub plic: P::Plic,
    pub alert_handler: P::AlertHandler,
}

impl<P: Platform> Peripherals<P> {
    fn init(platform: &P) -> EscResult<Self> {
        Ok(Self {
            clkmgr: platform.clkmgr_init()?,
            rstmgr: platform.rstmgr_init()?,
            aon_timer: platform.aon_timer_init()?,
            plic: platform.plic_init()?,
            alert_handler: platform.alert_handler_init()?,
        })
    }
}

/// Test context. Peripherals are written once by the main flow before any
/// interrupt source is enabled; the interrupt handler only reads them.
pub struct TestContext<P: Platform> {
    platform: P,
    peripherals: OnceCell<Peripherals<P>>,
    interrupt_seen: AtomicBool,
    observer: RefCell<Observer>,
    failure: Cell<Option<EscError>>,
}

impl<P: Platform> TestContext<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            peripherals: OnceCell::new(),
            interrupt_seen: AtomicBool::new(false),
            observer: RefCell::new(Observer::new()),
            failure: Cell::new(None),
        }
    }

    pub fn cpu(&self) -> &P::Cpu {
        self.platform.cpu()
    }

    /// Acquire every peripheral handle. Any failure is reported as an
    /// initialization failure of the test.
    pub fn init_peripherals(&self) -> EscResult<&Peripherals<P>> {
        if let Some(peripherals) = self.peripherals.get() {
            return Ok(peripherals);
        }
        let peripherals = Peripherals::init(&self.platform).map_err(|err| {
            log_error!("Peripheral init failed: 0x{:X}", u32::from(err));
            EscError::SCENARIO_INITIALIZATION_FAILURE
        })?;
        Ok(self.peripherals.get_or_init(|| peripherals))
    }

    pub fn peripherals(&self) -> EscResult<&Peripherals<P>> {
        self.peripherals
            .get()
            .ok_or(EscError::SCENARIO_INITIALIZATION_FAILURE)
    }

    pub fn mark_interrupt_seen(&self) {
        self.interrupt_seen.store(true, Ordering::Relaxed);
    }

    pub fn interrupt_seen(&self) -> bool {
        self.interrupt_seen.load(Ordering::Relaxed)
    }

    pub fn observer(&self) -> &RefCell<Observer> {
        &self.observer
    }

    pub fn observer_state(&self) -> ObserverState {
        self.observer.borrow().state()
    }

    /// Record a test failure and raise it to the platform. Only the first
    /// failure of a boot is kept.
    pub fn fail(&self, err: EscError) {
        if self.failure.get().is_some() {
            return;
        }
        self.failure.set(Some(err));
        log_error!(
            "{} (0x{:X})",
            err.name().unwrap_or("UNKNOWN_ERROR"),
            u32::from(err)
        );
        self.cpu().report_fw_error_fatal(err.into());
    }

    pub fn failure(&self) -> Option<EscError> {
        self.failure.get()
    }
}

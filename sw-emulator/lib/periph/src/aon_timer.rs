/*++

Licensed under the Apache-2.0 license.

File Name:

    aon_timer.rs

Abstract:

    File contains the emulated always-on timer watchdog. The counter runs in
    the always-on domain: it survives system resets and stops counting while
    escalation holds it frozen.

--*/

use escrst_drivers::{AonTimer as AonTimerCapability, EscError, EscResult};
use escrst_emu_bus::{ActionHandle, Clock, Timer};
use std::cell::RefCell;
use std::rc::Rc;
use tock_registers::{register_bitfields, LocalRegisterCopy};

register_bitfields! [
    u32,

    /// Watchdog Control Register Fields
    WDOG_CTRL [
        ENABLE OFFSET(0) NUMBITS(1) [],
        PAUSE_IN_SLEEP OFFSET(1) NUMBITS(1) [],
    ],

    /// Interrupt State Register Fields
    INTR_STATE [
        WKUP_TIMER_EXPIRED OFFSET(0) NUMBITS(1) [],
        WDOG_TIMER_BARK OFFSET(1) NUMBITS(1) [],
    ],
];

/// Interrupt outputs of the timer
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AonIrq {
    WakeupTimerExpired,
    WatchdogBark,
}

/// Always-on timer
#[derive(Clone)]
pub struct AonTimer {
    regs: Rc<RefCell<AonTimerImpl>>,
}

struct AonTimerImpl {
    timer: Timer,

    /// Peripheral clock cycles per always-on clock tick
    cycles_per_tick: u64,

    wdog_ctrl: LocalRegisterCopy<u32, WDOG_CTRL::Register>,
    wdog_locked: bool,
    bark_thold: u32,
    bite_thold: u32,

    /// Count accumulated up to `resumed_at`
    wdog_count: u32,

    /// Clock time the count last resumed from; `None` while not counting
    resumed_at: Option<u64>,

    escalated: bool,
    sleeping: bool,
    intr_state: LocalRegisterCopy<u32, INTR_STATE::Register>,
    bark_action: Option<ActionHandle>,
    bite_action: Option<ActionHandle>,
    bite_pending: bool,
}

impl AonTimerImpl {
    fn new(clock: &Clock, cycles_per_tick: u64) -> Self {
        Self {
            timer: Timer::new(clock),
            cycles_per_tick: cycles_per_tick.max(1),
            wdog_ctrl: LocalRegisterCopy::new(0),
            wdog_locked: false,
            bark_thold: 0,
            bite_thold: 0,
            wdog_count: 0,
            resumed_at: None,
            escalated: false,
            sleeping: false,
            intr_state: LocalRegisterCopy::new(0),
            bark_action: None,
            bite_action: None,
            bite_pending: false,
        }
    }

    fn counting(&self) -> bool {
        self.wdog_ctrl.is_set(WDOG_CTRL::ENABLE)
            && !self.escalated
            && !(self.sleeping && self.wdog_ctrl.is_set(WDOG_CTRL::PAUSE_IN_SLEEP))
    }

    fn count(&self) -> u32 {
        match self.resumed_at {
            Some(start) => {
                let ticks = (self.timer.now() - start) / self.cycles_per_tick;
                self.wdog_count
                    .saturating_add(u32::try_from(ticks).unwrap_or(u32::MAX))
            }
            None => self.wdog_count,
        }
    }

    /// Fold elapsed ticks into the count and re-derive the scheduled
    /// threshold crossings. Must run after any change to the counting
    /// conditions.
    fn update(&mut self) {
        let now = self.timer.now();
        let mut resume_from = now;
        if let Some(start) = self.resumed_at {
            let elapsed = now - start;
            self.wdog_count = self.count();
            resume_from = now - elapsed % self.cycles_per_tick;
        }
        self.timer.cancel_opt(&mut self.bark_action);
        self.timer.cancel_opt(&mut self.bite_action);

        if !self.counting() {
            self.resumed_at = None;
            return;
        }
        self.resumed_at = Some(resume_from);

        if self.wdog_count >= self.bark_thold {
            self.intr_state.modify(INTR_STATE::WDOG_TIMER_BARK::SET);
        } else {
            let at = resume_from
                + u64::from(self.bark_thold - self.wdog_count) * self.cycles_per_tick;
            self.bark_action = Some(self.timer.schedule_poll_at(at));
        }
        if self.wdog_count >= self.bite_thold {
            self.bite_pending = true;
        } else {
            let at = resume_from
                + u64::from(self.bite_thold - self.wdog_count) * self.cycles_per_tick;
            self.bite_action = Some(self.timer.schedule_poll_at(at));
        }
    }

    fn poll(&mut self) {
        if self.timer.fired(&mut self.bark_action) {
            self.intr_state.modify(INTR_STATE::WDOG_TIMER_BARK::SET);
        }
        if self.timer.fired(&mut self.bite_action) {
            self.bite_pending = true;
        }
    }
}

impl AonTimer {
    /// Create a timer whose ticks are `cycles_per_tick` clock cycles long.
    pub fn new(clock: &Clock, cycles_per_tick: u64) -> Self {
        Self {
            regs: Rc::new(RefCell::new(AonTimerImpl::new(clock, cycles_per_tick))),
        }
    }

    /// Process threshold crossings that became due.
    pub fn poll(&self) {
        self.regs.borrow_mut().poll();
    }

    /// Freeze or release the counter on behalf of escalation.
    pub fn set_escalated(&self, escalated: bool) {
        let mut regs = self.regs.borrow_mut();
        if regs.escalated != escalated {
            regs.escalated = escalated;
            regs.update();
        }
    }

    pub fn set_sleeping(&self, sleeping: bool) {
        let mut regs = self.regs.borrow_mut();
        if regs.sleeping != sleeping {
            regs.sleeping = sleeping;
            regs.update();
        }
    }

    pub fn irq_line(&self, irq: AonIrq) -> bool {
        let regs = self.regs.borrow();
        match irq {
            AonIrq::WakeupTimerExpired => regs.intr_state.is_set(INTR_STATE::WKUP_TIMER_EXPIRED),
            AonIrq::WatchdogBark => regs.intr_state.is_set(INTR_STATE::WDOG_TIMER_BARK),
        }
    }

    /// Consume a pending bite reset request.
    pub fn take_bite(&self) -> bool {
        std::mem::take(&mut self.regs.borrow_mut().bite_pending)
    }

    pub fn count(&self) -> u32 {
        self.regs.borrow().count()
    }

    pub fn is_locked(&self) -> bool {
        self.regs.borrow().wdog_locked
    }

    /// Power-on reset. System resets leave the timer untouched.
    pub fn power_on_reset(&self) {
        let regs = &mut *self.regs.borrow_mut();
        regs.timer.cancel_opt(&mut regs.bark_action);
        regs.timer.cancel_opt(&mut regs.bite_action);
        regs.wdog_ctrl.set(0);
        regs.wdog_locked = false;
        regs.bark_thold = 0;
        regs.bite_thold = 0;
        regs.wdog_count = 0;
        regs.resumed_at = None;
        regs.escalated = false;
        regs.sleeping = false;
        regs.intr_state.set(0);
        regs.bite_pending = false;
    }
}

impl AonTimerCapability for AonTimer {
    fn watchdog_start(
        &self,
        bark_cycles: u32,
        bite_cycles: u32,
        pause_in_sleep: bool,
        lock: bool,
    ) -> EscResult<()> {
        let mut regs = self.regs.borrow_mut();
        if regs.wdog_locked {
            return Err(EscError::DRIVER_AON_TIMER_LOCKED);
        }
        regs.bark_thold = bark_cycles;
        regs.bite_thold = bite_cycles;
        regs.wdog_count = 0;
        regs.resumed_at = None;
        regs.wdog_ctrl.write(
            WDOG_CTRL::ENABLE::SET + WDOG_CTRL::PAUSE_IN_SLEEP.val(u32::from(pause_in_sleep)),
        );
        regs.wdog_locked = lock;
        regs.update();
        Ok(())
    }

    fn watchdog_stop(&self) -> EscResult<()> {
        let mut regs = self.regs.borrow_mut();
        if regs.wdog_locked {
            return Err(EscError::DRIVER_AON_TIMER_LOCKED);
        }
        regs.wdog_ctrl.modify(WDOG_CTRL::ENABLE::CLEAR);
        regs.update();
        regs.wdog_count = 0;
        Ok(())
    }

    fn wakeup_stop(&self) -> EscResult<()> {
        // The wakeup timer is never started in this model
        Ok(())
    }

    fn irq_acknowledge_all(&self) -> EscResult<()> {
        self.regs.borrow_mut().intr_state.set(0);
        Ok(())
    }

    fn watchdog_thresholds(&self) -> EscResult<Option<(u32, u32)>> {
        let regs = self.regs.borrow();
        if regs.wdog_ctrl.is_set(WDOG_CTRL::ENABLE) {
            Ok(Some((regs.bark_thold, regs.bite_thold)))
        } else {
            Ok(None)
        }
    }
}

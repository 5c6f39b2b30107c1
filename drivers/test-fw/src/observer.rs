/*++

Licensed under the Apache-2.0 license.

File Name:

    observer.rs

Abstract:

    File contains the external interrupt handler of the escalation reset test
    and the state machine that tracks whether the escalation interrupt was
    already handled.

--*/

use crate::config::{EXPECTED_FAULT_CODES, FAULT_ALERT, FAULT_CLASS};
use crate::context::TestContext;
use escrst_drivers::alert_handler::{AlertHandlerIrq, ClassState};
use escrst_drivers::top::{peripheral_for_irq, PlicPeripheral, PLIC_TARGET_IBEX0};
use escrst_drivers::{
    log_error, log_info, AlertHandler, ClaimedIrq, ClkMgr, EscError, EscResult, Platform,
};
use smlang::statemachine;

statemachine! {
    transitions: {
        // CurrentState Event = NextState
        *Idle + EscalationArmed = ExpectingEscalation,
        ExpectingEscalation + EscalationObserved = Handled,
        Idle + EscalationObserved = Handled,
    }
}

/// State machine extended variables.
pub struct Context;

impl StateMachineContext for Context {}

/// Observer state, as reported to the main flow and tests
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ObserverState {
    Idle,
    ExpectingEscalation,
    Handled,
}

pub struct Observer {
    machine: StateMachine<Context>,
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer {
    pub fn new() -> Self {
        Self {
            machine: StateMachine::new(Context),
        }
    }

    /// Fault injection is about to happen.
    pub fn arm(&mut self) {
        let _ = self.machine.process_event(Events::EscalationArmed);
    }

    /// The escalation interrupt was validated and disabled.
    pub fn observe(&mut self) {
        let _ = self.machine.process_event(Events::EscalationObserved);
    }

    pub fn state(&self) -> ObserverState {
        match self.machine.state() {
            States::Idle => ObserverState::Idle,
            States::ExpectingEscalation => ObserverState::ExpectingEscalation,
            States::Handled => ObserverState::Handled,
        }
    }
}

/// External interrupt handler. The claimed interrupt is completed whether or
/// not validation succeeds.
pub fn on_external_irq<P: Platform>(ctx: &TestContext<P>) -> EscResult<()> {
    ctx.mark_interrupt_seen();
    let peripherals = ctx.peripherals()?;
    let claimed = ClaimedIrq::claim(&peripherals.plic, PLIC_TARGET_IBEX0)?;

    match peripheral_for_irq(claimed.id()) {
        PlicPeripheral::AonTimerAon => {
            log_error!("Watchdog interrupt during escalation (irq {})", claimed.id().0);
            return Err(EscError::SCENARIO_UNEXPECTED_WATCHDOG_INTERRUPT);
        }
        PlicPeripheral::AlertHandler => {
            if ctx.observer_state() != ObserverState::Handled {
                let irq = AlertHandlerIrq::from_plic_id(claimed.id())?;
                check_escalation(ctx, irq)?;
                ctx.observer().borrow_mut().observe();
            }
        }
        PlicPeripheral::Unknown => {}
    }

    claimed.complete()
}

fn check_escalation<P: Platform>(ctx: &TestContext<P>, irq: AlertHandlerIrq) -> EscResult<()> {
    let peripherals = ctx.peripherals()?;
    let alert_handler = &peripherals.alert_handler;

    let state = alert_handler.class_state(FAULT_CLASS)?;
    if state != ClassState::Phase0 {
        log_error!(
            "Wrong phase {} (expected {})",
            state.code(),
            ClassState::Phase0.code()
        );
        return Err(EscError::SCENARIO_WRONG_ESCALATION_PHASE);
    }

    if !alert_handler.alert_is_cause(FAULT_ALERT)? {
        log_error!("Alert {} is not the escalation cause", FAULT_ALERT.0);
        return Err(EscError::SCENARIO_UNEXPECTED_ALERT_CAUSE);
    }

    let codes = peripherals.clkmgr.fatal_err_codes()?;
    if codes != EXPECTED_FAULT_CODES {
        log_error!(
            "clkmgr fatal codes 0x{:X} (expected 0x{:X})",
            codes.bits(),
            EXPECTED_FAULT_CODES.bits()
        );
        return Err(EscError::SCENARIO_UNEXPECTED_FAULT_CODE);
    }

    // Phase 0 stays asserted until phase 1 begins; keep the line quiet.
    log_info!("Disable IRQ classa");
    alert_handler.irq_set_enabled(FAULT_CLASS.irq(), false)?;
    alert_handler.irq_acknowledge(irq)
}

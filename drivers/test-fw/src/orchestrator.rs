/*++

Licensed under the Apache-2.0 license.

File Name:

    orchestrator.rs

Abstract:

    File contains the main flow of the escalation reset test. The reset info
    read at boot decides which of the two epochs is running: the first boot
    arms the watchdog and injects the fault, the boot after the escalation
    reset checks that the reset cleared the fault.

--*/

use crate::config::{
    class_config, escalation_phases, FAULT_ALERT, FAULT_CLASS, PING_TIMEOUT, TIMING_PLAN,
};
use crate::context::TestContext;
use crate::fault;
use escrst_drivers::alert_handler::{self, AlertHandlerConfig};
use escrst_drivers::top::{
    AON_CLOCK_HZ, PLIC_IRQ_ID_ALERT_HANDLER_CLASSA, PLIC_IRQ_ID_ALERT_HANDLER_CLASSD,
    PLIC_IRQ_ID_AON_TIMER_WDOG_TIMER_BARK, PLIC_IRQ_ID_AON_TIMER_WKUP_TIMER_EXPIRED,
    PLIC_TARGET_IBEX0,
};
use escrst_drivers::{
    aon_timer, log_error, log_info, plic, rstmgr, AlertHandler, ClkMgr, Cpu, EscError,
    EscResult, Platform, ResetReason,
};

/// How a boot of the test ended
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EpochOutcome {
    /// Second epoch verified the reset
    Passed,
    /// Fault injected; the escalation reset finishes this boot
    AwaitingReset,
}

/// Run one boot of the test.
pub fn execute<P: Platform>(ctx: &TestContext<P>) -> EscResult<EpochOutcome> {
    let cpu = ctx.cpu();
    cpu.irq_global_ctrl(true);
    cpu.irq_external_ctrl(true);

    let peripherals = ctx.init_peripherals()?;

    plic::irq_range_enable(
        &peripherals.plic,
        PLIC_TARGET_IBEX0,
        PLIC_IRQ_ID_AON_TIMER_WKUP_TIMER_EXPIRED,
        PLIC_IRQ_ID_AON_TIMER_WDOG_TIMER_BARK,
    )?;
    plic::irq_range_enable(
        &peripherals.plic,
        PLIC_TARGET_IBEX0,
        PLIC_IRQ_ID_ALERT_HANDLER_CLASSA,
        PLIC_IRQ_ID_ALERT_HANDLER_CLASSD,
    )?;

    let phases = escalation_phases(&TIMING_PLAN)?;
    let class_configs = [class_config(&phases)?];
    let config = AlertHandlerConfig {
        alerts: &[FAULT_ALERT],
        alert_classes: &[FAULT_CLASS],
        classes: &[FAULT_CLASS],
        class_configs: &class_configs,
        ping_timeout: PING_TIMEOUT,
    };
    // Routing and escalation stay fixed until the next reset.
    alert_handler::configure_all(&peripherals.alert_handler, &config, true)?;
    peripherals
        .alert_handler
        .irq_set_enabled(FAULT_CLASS.irq(), true)?;

    let (reason, raw) = rstmgr::reason_get_and_clear(&peripherals.rstmgr)?;
    match reason {
        ResetReason::PowerOn => {
            log_info!("Booting for the first time, starting test");
            let (bark_cycles, bite_cycles) = TIMING_PLAN.watchdog_cycles(AON_CLOCK_HZ)?;
            log_info!(
                "Wdog will bark after {}/{} us/cycles and bite after {}/{} us/cycles",
                TIMING_PLAN.wdog_bark_micros,
                bark_cycles,
                TIMING_PLAN.wdog_bite_micros,
                bite_cycles
            );
            aon_timer::watchdog_config(&peripherals.aon_timer, bark_cycles, bite_cycles, false)?;

            ctx.observer().borrow_mut().arm();
            fault::inject(ctx);
            Ok(EpochOutcome::AwaitingReset)
        }
        ResetReason::Escalation => {
            log_info!("Booting for the second time due to escalation reset");

            let codes = peripherals.clkmgr.fatal_err_codes()?;
            if !codes.is_empty() {
                log_error!("clkmgr fatal codes 0x{:X} (expected 0x0)", codes.bits());
                return Err(EscError::SCENARIO_FAULT_NOT_CLEARED);
            }
            if peripherals.alert_handler.alert_is_cause(FAULT_ALERT)? {
                log_error!("Alert {} is still an escalation cause", FAULT_ALERT.0);
                return Err(EscError::SCENARIO_ALERT_CAUSE_NOT_CLEARED);
            }

            aon_timer::shutdown(&peripherals.aon_timer)?;
            Ok(EpochOutcome::Passed)
        }
        ResetReason::Other(_) => {
            log_error!("Unexpected rst_info=0x{:X}", raw);
            Err(EscError::SCENARIO_UNEXPECTED_RESET_CAUSE)
        }
    }
}

/// Run one boot of the test. Returns true only once the second epoch has
/// verified the reset; failures are reported through the context.
pub fn run<P: Platform>(ctx: &TestContext<P>) -> bool {
    match execute(ctx) {
        Ok(EpochOutcome::Passed) => true,
        Ok(EpochOutcome::AwaitingReset) => false,
        Err(err) => {
            ctx.fail(err);
            false
        }
    }
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    config.rs

Abstract:

    File contains the fixed parameters of the escalation reset test and the
    alert handler configuration derived from them.

--*/

use escrst_drivers::alert_handler::{ClassConfig, ClassState, EscalationPhase};
use escrst_drivers::top::{ALERT_ID_CLKMGR_AON_FATAL_FAULT, PERIPHERAL_CLOCK_HZ};
use escrst_drivers::{AlertClass, AlertId, EscResult, FatalErrCodes, TimingPlan};

/// Watchdog and escalation timing. Bark lands inside phase 1 (which freezes
/// the watchdog) and bite lands after the phase 2 reset.
pub const TIMING_PLAN: TimingPlan = TimingPlan {
    wdog_bark_micros: 300,
    wdog_bite_micros: 800,
    phase0_micros: 200,
    phase1_micros: 200,
    phase2_micros: 100,
};

const _: () = assert!(TIMING_PLAN.is_valid());

/// Time the class A interrupt may stay unhandled before escalation starts
pub const IRQ_DEADLINE_MICROS: u64 = 10;

pub const FAULT_ALERT: AlertId = ALERT_ID_CLKMGR_AON_FATAL_FAULT;

pub const FAULT_CLASS: AlertClass = AlertClass::A;

/// Fatal codes the clock manager reports after the injected fault
pub const EXPECTED_FAULT_CODES: FatalErrCodes = FatalErrCodes::IDLE_COUNT;

/// Ping timeout in always-on cycles
pub const PING_TIMEOUT: u32 = 0;

/// Escalation signals: 0 raises the class interrupt, 1 escalates the life
/// cycle controller (freezing the watchdog), 3 requests a chip reset.
pub const PHASE_SIGNALS: [u32; 3] = [0, 1, 3];

pub const CRASHDUMP_PHASE: ClassState = ClassState::Phase3;

pub fn escalation_phases(plan: &TimingPlan) -> EscResult<[EscalationPhase; 3]> {
    plan.validate()?;
    let cycles = plan.phase_cycles(PERIPHERAL_CLOCK_HZ)?;
    let phase = |index: usize| EscalationPhase {
        phase: ClassState::PHASES[index],
        signal: PHASE_SIGNALS[index],
        duration_cycles: cycles[index],
    };
    Ok([phase(0), phase(1), phase(2)])
}

pub fn irq_deadline_cycles() -> EscResult<u32> {
    escrst_drivers::timing::cycles_from_micros(IRQ_DEADLINE_MICROS, PERIPHERAL_CLOCK_HZ)
}

pub fn class_config(phases: &[EscalationPhase]) -> EscResult<ClassConfig<'_>> {
    Ok(ClassConfig {
        auto_lock_accumulation_counter: false,
        accumulator_threshold: 0,
        irq_deadline_cycles: irq_deadline_cycles()?,
        escalation_phases: phases,
        crashdump_escalation_phase: CRASHDUMP_PHASE,
    })
}

// Licensed under the Apache-2.0 license

use escrst_drivers::top::ALERT_ID_CLKMGR_AON_FATAL_FAULT;
use escrst_drivers::{
    AlertClass, AlertHandler as _, AonTimer as _, BootStatus, EscError, ResetInfo,
};
use escrst_hw_model::{
    BootEnd, DefaultHwModel, ExitStatus, HwModel, InitParams, PeripheralId, ResetDefects,
    RunReport,
};
use escrst_test_fw::EscalationResetTest;

fn default_init_params() -> InitParams {
    InitParams {
        // Test output goes through the firmware printer; keep the trace quiet.
        log_writer: Box::new(std::io::sink()),
        ..Default::default()
    }
}

fn start_escalation_test(params: InitParams) -> DefaultHwModel {
    escrst_hw_model::new(params).unwrap()
}

fn run_escalation_test(params: InitParams) -> (DefaultHwModel, RunReport) {
    let mut model = start_escalation_test(params);
    let report = model.run_to_completion(EscalationResetTest::new);
    (model, report)
}

fn run_with_defects(defects: ResetDefects) -> RunReport {
    run_escalation_test(InitParams {
        defects,
        ..default_init_params()
    })
    .1
}

#[test]
fn test_escalation_reset() {
    let mut model = start_escalation_test(default_init_params());
    let report = model
        .run_until_exit_success(EscalationResetTest::new)
        .unwrap();

    assert_eq!(report.boots.len(), 2);
    assert_eq!(report.reset_causes(), vec![ResetInfo::ESCALATION]);

    let first = &report.boots[0];
    assert_eq!(first.status, BootStatus::AwaitingReset);
    assert_eq!(first.end, BootEnd::Reset(ResetInfo::ESCALATION));
    assert_eq!(first.isr_count, 1);
    // Phase 0 and phase 1 are 4800 cycles each, then the reset latency.
    assert_eq!(first.end_cycle, 9608);

    let second = &report.boots[1];
    assert_eq!(second.status, BootStatus::Passed);
    assert_eq!(second.end, BootEnd::Finished);
    assert_eq!(second.isr_count, 0);

    let output = model.output();
    assert_eq!(output.exit_status(), Some(ExitStatus::Passed));
    assert_eq!(output.cycle_of("entered Phase0"), Some(0));
    assert_eq!(output.cycle_of("watchdog frozen by escalation"), Some(4800));
    assert_eq!(output.cycle_of("reset requested cause=ESCALATION"), Some(9600));
    assert_eq!(output.cycle_of("boot 1 started, reset_info=0x40"), Some(9608));
    assert_eq!(output.cycle_of("watchdog bite"), None);
}

#[test]
fn test_watchdog_disarmed_after_pass() {
    let (model, report) = run_escalation_test(default_init_params());
    assert!(report.passed());
    assert_eq!(model.soc().aon_timer.watchdog_thresholds(), Ok(None));
    assert!(!model.soc().aon_timer.is_locked());
}

#[test]
fn test_alert_config_locked_in_first_boot() {
    let mut model = start_escalation_test(InitParams {
        // Stop well before the escalation reset releases the locks
        cycles_per_boot: 100,
        ..default_init_params()
    });
    let fw = EscalationResetTest::new(model.platform());
    let report = model.boot(&fw);
    assert_eq!(report.status, BootStatus::AwaitingReset);
    assert_eq!(report.end, BootEnd::Timeout);
    assert_eq!(report.isr_count, 1);
    assert_eq!(
        model.soc().alert_handler.configure_alert(
            ALERT_ID_CLKMGR_AON_FATAL_FAULT,
            AlertClass::B,
            false,
            false
        ),
        Err(EscError::DRIVER_ALERT_HANDLER_LOCKED)
    );
}

#[test]
fn test_unexpected_reset_cause() {
    let (_, report) = run_escalation_test(InitParams {
        initial_reset_info: Some(ResetInfo::SW.bits()),
        ..default_init_params()
    });
    assert_eq!(report.boots.len(), 1);
    assert_eq!(report.boots[0].status, BootStatus::Failed);
    assert_eq!(
        report.fatal_error(),
        Some(EscError::SCENARIO_UNEXPECTED_RESET_CAUSE)
    );
    assert!(!report.passed());
}

#[test]
fn test_initialization_failure() {
    let (mut model, report) = run_escalation_test(InitParams {
        fail_init: Some(PeripheralId::AlertHandler),
        ..default_init_params()
    });
    assert_eq!(report.boots.len(), 1);
    assert_eq!(
        report.fatal_error(),
        Some(EscError::SCENARIO_INITIALIZATION_FAILURE)
    );
    assert_eq!(model.output().exit_status(), Some(ExitStatus::Failed));
}

#[test]
fn test_fault_survives_reset() {
    let report = run_with_defects(ResetDefects {
        clkmgr_codes_survive_reset: true,
        ..Default::default()
    });
    assert_eq!(report.boots.len(), 2);
    assert_eq!(report.reset_causes(), vec![ResetInfo::ESCALATION]);
    assert_eq!(
        report.fatal_error(),
        Some(EscError::SCENARIO_FAULT_NOT_CLEARED)
    );
}

#[test]
fn test_alert_cause_survives_reset() {
    let report = run_with_defects(ResetDefects {
        alert_cause_survives_reset: true,
        ..Default::default()
    });
    assert_eq!(report.boots.len(), 2);
    assert_eq!(
        report.fatal_error(),
        Some(EscError::SCENARIO_ALERT_CAUSE_NOT_CLEARED)
    );
}

#[test]
fn test_watchdog_not_frozen_by_escalation() {
    let report = run_with_defects(ResetDefects {
        escalation_ignores_watchdog: true,
        ..Default::default()
    });
    assert_eq!(report.boots.len(), 1);
    assert_eq!(
        report.fatal_error(),
        Some(EscError::SCENARIO_UNEXPECTED_WATCHDOG_INTERRUPT)
    );
    assert_eq!(report.boots[0].isr_count, 2);
}

#[test]
fn test_late_interrupt_sees_wrong_phase() {
    let (_, report) = run_escalation_test(InitParams {
        // Past the end of phase 0
        irq_latency_cycles: 5000,
        ..default_init_params()
    });
    assert_eq!(report.boots.len(), 1);
    assert_eq!(
        report.boots[0].end,
        BootEnd::FatalError(EscError::SCENARIO_WRONG_ESCALATION_PHASE.into())
    );
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    alert_handler.rs

Abstract:

    File contains the alert handler capability, its configuration types, and
    the helper that installs a complete configuration.

--*/

use crate::top::{AlertId, ALERT_COUNT, PLIC_IRQ_ID_ALERT_HANDLER_CLASSA};
use crate::IrqId;
use crate::{EscError, EscResult};

/// Number of escalation signals
pub const ESCALATION_SIGNAL_COUNT: u32 = 4;

/// Alert class
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum AlertClass {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
}

impl AlertClass {
    pub const ALL: [AlertClass; 4] = [AlertClass::A, AlertClass::B, AlertClass::C, AlertClass::D];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Class interrupt that reports alerts of this class
    pub fn irq(self) -> AlertHandlerIrq {
        match self {
            AlertClass::A => AlertHandlerIrq::ClassA,
            AlertClass::B => AlertHandlerIrq::ClassB,
            AlertClass::C => AlertHandlerIrq::ClassC,
            AlertClass::D => AlertHandlerIrq::ClassD,
        }
    }
}

/// Alert handler interrupt sources
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AlertHandlerIrq {
    ClassA = 0,
    ClassB = 1,
    ClassC = 2,
    ClassD = 3,
}

impl AlertHandlerIrq {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(AlertHandlerIrq::ClassA),
            1 => Some(AlertHandlerIrq::ClassB),
            2 => Some(AlertHandlerIrq::ClassC),
            3 => Some(AlertHandlerIrq::ClassD),
            _ => None,
        }
    }

    /// Class interrupt behind an interrupt controller source id
    pub fn from_plic_id(id: IrqId) -> EscResult<Self> {
        id.0.checked_sub(PLIC_IRQ_ID_ALERT_HANDLER_CLASSA.0)
            .and_then(Self::from_index)
            .ok_or(EscError::DRIVER_ALERT_HANDLER_BAD_CLASS)
    }
}

/// Escalation state of an alert class
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum ClassState {
    Idle = 0,
    /// Interrupt deadline running; escalation starts if it expires
    Timeout = 1,
    Phase0 = 4,
    Phase1 = 5,
    Phase2 = 6,
    Phase3 = 7,
    /// All phases elapsed; held until reset
    Terminal = 3,
}

impl ClassState {
    pub const PHASES: [ClassState; 4] = [
        ClassState::Phase0,
        ClassState::Phase1,
        ClassState::Phase2,
        ClassState::Phase3,
    ];

    /// Phase number for `Phase0..=Phase3`
    pub fn phase_index(self) -> Option<usize> {
        match self {
            ClassState::Phase0 => Some(0),
            ClassState::Phase1 => Some(1),
            ClassState::Phase2 => Some(2),
            ClassState::Phase3 => Some(3),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// One escalation phase: which signal to assert and for how long.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EscalationPhase {
    pub phase: ClassState,
    pub signal: u32,
    pub duration_cycles: u32,
}

/// Per-class configuration
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ClassConfig<'a> {
    pub auto_lock_accumulation_counter: bool,
    /// Escalation starts once this many alerts have accumulated
    pub accumulator_threshold: u16,
    /// Cycles the class interrupt may stay unhandled before escalation starts
    pub irq_deadline_cycles: u32,
    pub escalation_phases: &'a [EscalationPhase],
    /// Phase at which crash dump information is latched
    pub crashdump_escalation_phase: ClassState,
}

impl ClassConfig<'_> {
    /// Phases must be strictly ordered by severity and the signals they assert
    /// must never step back down.
    pub fn validate(&self) -> EscResult<()> {
        if self.escalation_phases.is_empty()
            || self.crashdump_escalation_phase.phase_index().is_none()
        {
            return Err(EscError::DRIVER_ALERT_HANDLER_BAD_CONFIG);
        }
        let mut last_phase: Option<usize> = None;
        let mut last_signal: Option<u32> = None;
        for phase in self.escalation_phases {
            let index = phase
                .phase
                .phase_index()
                .ok_or(EscError::DRIVER_ALERT_HANDLER_BAD_PHASE_ORDER)?;
            if last_phase.map_or(false, |last| index <= last) {
                return Err(EscError::DRIVER_ALERT_HANDLER_BAD_PHASE_ORDER);
            }
            if phase.signal >= ESCALATION_SIGNAL_COUNT
                || last_signal.map_or(false, |last| phase.signal < last)
            {
                return Err(EscError::DRIVER_ALERT_HANDLER_BAD_SIGNAL);
            }
            last_phase = Some(index);
            last_signal = Some(phase.signal);
        }
        Ok(())
    }
}

/// Complete alert handler configuration. `alerts[i]` is routed to
/// `alert_classes[i]`; `classes[i]` is configured with `class_configs[i]`.
#[derive(Debug, Copy, Clone)]
pub struct AlertHandlerConfig<'a> {
    pub alerts: &'a [AlertId],
    pub alert_classes: &'a [AlertClass],
    pub classes: &'a [AlertClass],
    pub class_configs: &'a [ClassConfig<'a>],
    pub ping_timeout: u32,
}

/// Alert handler capability
pub trait AlertHandler {
    /// Route an alert to a class and enable or disable it.
    fn configure_alert(
        &self,
        alert: AlertId,
        class: AlertClass,
        enabled: bool,
        lock: bool,
    ) -> EscResult<()>;

    /// Install the escalation protocol of one class and enable or disable it
    /// in the same step.
    fn configure_class(
        &self,
        class: AlertClass,
        config: &ClassConfig,
        enabled: bool,
        lock: bool,
    ) -> EscResult<()>;

    fn configure_ping_timer(&self, ping_timeout: u32, enabled: bool, lock: bool)
        -> EscResult<()>;

    /// Current escalation state of a class
    fn class_state(&self, class: AlertClass) -> EscResult<ClassState>;

    /// Whether `alert` is recorded as a cause of escalation
    fn alert_is_cause(&self, alert: AlertId) -> EscResult<bool>;

    fn irq_set_enabled(&self, irq: AlertHandlerIrq, enabled: bool) -> EscResult<()>;

    /// Clear the pending state of a class interrupt. This does not clear the
    /// alert cause.
    fn irq_acknowledge(&self, irq: AlertHandlerIrq) -> EscResult<()>;
}

/// Validate and install `config`, optionally locking it.
pub fn configure_all<A: AlertHandler + ?Sized>(
    handler: &A,
    config: &AlertHandlerConfig,
    lock: bool,
) -> EscResult<()> {
    if config.alerts.len() != config.alert_classes.len()
        || config.classes.len() != config.class_configs.len()
    {
        return Err(EscError::DRIVER_ALERT_HANDLER_BAD_CONFIG);
    }
    for class_config in config.class_configs {
        class_config.validate()?;
    }
    for (alert, class) in config.alerts.iter().zip(config.alert_classes) {
        if alert.0 >= ALERT_COUNT {
            return Err(EscError::DRIVER_ALERT_HANDLER_BAD_ALERT);
        }
        handler.configure_alert(*alert, *class, true, lock)?;
    }
    for (class, class_config) in config.classes.iter().zip(config.class_configs) {
        handler.configure_class(*class, class_config, true, lock)?;
    }
    handler.configure_ping_timer(config.ping_timeout, true, lock)
}

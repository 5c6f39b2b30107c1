/*++

Licensed under the Apache-2.0 license.

File Name:

    alert_handler.rs

Abstract:

    File contains the emulated alert handler: alert-to-class routing, cause
    recording, per-class accumulation, interrupt deadlines and the timed
    escalation protocol.

--*/

use escrst_drivers::alert_handler::ESCALATION_SIGNAL_COUNT;
use escrst_drivers::top::ALERT_COUNT;
use escrst_drivers::{
    AlertClass, AlertHandler as AlertHandlerCapability, AlertHandlerIrq, AlertId, ClassConfig,
    ClassState, EscError, EscResult,
};
use escrst_emu_bus::{ActionHandle, Clock, Timer};
use std::cell::RefCell;
use std::rc::Rc;

const PHASE_COUNT: usize = ClassState::PHASES.len();

/// Observable alert handler activity
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AlertHandlerEvent {
    AlertRaised { alert: AlertId, class: AlertClass },
    EscalationStarted { class: AlertClass },
    PhaseEntered { class: AlertClass, state: ClassState },
    SignalAsserted { class: AlertClass, signal: u32 },
    CrashdumpLatched { class: AlertClass },
}

/// State captured when a class enters its crash dump phase
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Crashdump {
    pub class: AlertClass,
    pub class_states: [ClassState; 4],
    pub accum_counts: [u32; 4],
    pub alert_causes: Vec<AlertId>,
}

/// Alert handler
#[derive(Clone)]
pub struct AlertHandler {
    regs: Rc<RefCell<AlertHandlerImpl>>,
}

#[derive(Copy, Clone, Default)]
struct PhaseRegs {
    enabled: bool,
    signal: u32,
    cycles: u32,
}

struct ClassRegs {
    enabled: bool,
    locked: bool,
    auto_lock_accumulation: bool,
    clear_locked: bool,
    accum_thresh: u16,
    accum_count: u32,
    timeout_cycles: u32,
    phases: [PhaseRegs; PHASE_COUNT],
    crashdump_phase: usize,
    state: ClassState,
    timeout_action: Option<ActionHandle>,
    phase_action: Option<ActionHandle>,
}

impl Default for ClassRegs {
    fn default() -> Self {
        Self {
            enabled: false,
            locked: false,
            auto_lock_accumulation: false,
            clear_locked: false,
            accum_thresh: 0,
            accum_count: 0,
            timeout_cycles: 0,
            phases: [PhaseRegs::default(); PHASE_COUNT],
            crashdump_phase: PHASE_COUNT - 1,
            state: ClassState::Idle,
            timeout_action: None,
            phase_action: None,
        }
    }
}

#[derive(Copy, Clone)]
struct AlertRegs {
    enabled: bool,
    locked: bool,
    class: AlertClass,
    cause: bool,
}

impl Default for AlertRegs {
    fn default() -> Self {
        Self {
            enabled: false,
            locked: false,
            class: AlertClass::A,
            cause: false,
        }
    }
}

struct AlertHandlerImpl {
    timer: Timer,
    alerts: Vec<AlertRegs>,
    classes: [ClassRegs; 4],
    ping_timeout: u32,
    ping_enabled: bool,
    ping_locked: bool,
    intr_enable: u32,
    intr_state: u32,
    crashdump: Option<Crashdump>,
    events: Vec<AlertHandlerEvent>,
}

impl AlertHandlerImpl {
    fn new(timer: Timer) -> Self {
        Self {
            timer,
            alerts: vec![AlertRegs::default(); ALERT_COUNT as usize],
            classes: std::array::from_fn(|_| ClassRegs::default()),
            ping_timeout: 0,
            ping_enabled: false,
            ping_locked: false,
            intr_enable: 0,
            intr_state: 0,
            crashdump: None,
            events: Vec::new(),
        }
    }

    fn raise_alert(&mut self, alert: AlertId) {
        let Some(regs) = self.alerts.get_mut(alert.0 as usize) else {
            return;
        };
        if !regs.enabled {
            return;
        }
        regs.cause = true;
        let class = regs.class;
        self.events.push(AlertHandlerEvent::AlertRaised { alert, class });
        self.intr_state |= 1 << class.index();

        let c = class.index();
        if !self.classes[c].enabled {
            return;
        }
        let regs = &mut self.classes[c];
        regs.accum_count = regs.accum_count.saturating_add(1);
        let threshold_reached = regs.accum_count >= u32::from(regs.accum_thresh);
        match regs.state {
            ClassState::Idle | ClassState::Timeout if threshold_reached => {
                self.start_escalation(c);
            }
            ClassState::Idle if regs.timeout_cycles > 0 => {
                regs.state = ClassState::Timeout;
                let cycles = u64::from(regs.timeout_cycles);
                self.classes[c].timeout_action = Some(self.timer.schedule_poll_in(cycles));
            }
            _ => {}
        }
    }

    fn start_escalation(&mut self, c: usize) {
        let class = AlertClass::ALL[c];
        let regs = &mut self.classes[c];
        self.timer.cancel_opt(&mut regs.timeout_action);
        if regs.auto_lock_accumulation {
            regs.clear_locked = true;
        }
        self.events
            .push(AlertHandlerEvent::EscalationStarted { class });
        self.enter_phase(c, 0);
    }

    /// Enter phase `phase`, passing through zero-length phases. Past the last
    /// phase the class holds in `Terminal`.
    fn enter_phase(&mut self, c: usize, mut phase: usize) {
        let class = AlertClass::ALL[c];
        loop {
            if phase >= PHASE_COUNT {
                self.classes[c].state = ClassState::Terminal;
                self.events.push(AlertHandlerEvent::PhaseEntered {
                    class,
                    state: ClassState::Terminal,
                });
                return;
            }
            let state = ClassState::PHASES[phase];
            self.classes[c].state = state;
            self.events
                .push(AlertHandlerEvent::PhaseEntered { class, state });
            if phase == self.classes[c].crashdump_phase && self.crashdump.is_none() {
                self.latch_crashdump(class);
            }
            let regs = self.classes[c].phases[phase];
            if regs.enabled {
                self.events.push(AlertHandlerEvent::SignalAsserted {
                    class,
                    signal: regs.signal,
                });
            }
            if regs.cycles > 0 {
                self.classes[c].phase_action =
                    Some(self.timer.schedule_poll_in(regs.cycles.into()));
                return;
            }
            phase += 1;
        }
    }

    fn latch_crashdump(&mut self, class: AlertClass) {
        self.crashdump = Some(Crashdump {
            class,
            class_states: std::array::from_fn(|i| self.classes[i].state),
            accum_counts: std::array::from_fn(|i| self.classes[i].accum_count),
            alert_causes: (0..ALERT_COUNT)
                .filter(|a| self.alerts[*a as usize].cause)
                .map(AlertId)
                .collect(),
        });
        self.events
            .push(AlertHandlerEvent::CrashdumpLatched { class });
    }

    fn poll(&mut self) {
        for c in 0..self.classes.len() {
            if self.timer.fired(&mut self.classes[c].timeout_action) {
                self.start_escalation(c);
            }
            if self.timer.fired(&mut self.classes[c].phase_action) {
                let next = self.classes[c]
                    .state
                    .phase_index()
                    .map_or(PHASE_COUNT, |p| p + 1);
                self.enter_phase(c, next);
            }
        }
    }

    fn cancel_actions(&mut self) {
        for regs in self.classes.iter_mut() {
            self.timer.cancel_opt(&mut regs.timeout_action);
            self.timer.cancel_opt(&mut regs.phase_action);
        }
    }
}

impl AlertHandler {
    pub fn new(clock: &Clock) -> Self {
        Self {
            regs: Rc::new(RefCell::new(AlertHandlerImpl::new(Timer::new(clock)))),
        }
    }

    /// Signal an alert from a peripheral.
    pub fn raise_alert(&self, alert: AlertId) {
        self.regs.borrow_mut().raise_alert(alert);
    }

    /// Advance deadlines and escalation phases that became due.
    pub fn poll(&self) {
        self.regs.borrow_mut().poll();
    }

    /// Level of a class interrupt output
    pub fn irq_line(&self, irq: AlertHandlerIrq) -> bool {
        let regs = self.regs.borrow();
        (regs.intr_state & regs.intr_enable) & (1 << irq.index()) != 0
    }

    /// Drain the activity recorded since the last call.
    pub fn take_events(&self) -> Vec<AlertHandlerEvent> {
        std::mem::take(&mut self.regs.borrow_mut().events)
    }

    pub fn crashdump(&self) -> Option<Crashdump> {
        self.regs.borrow().crashdump.clone()
    }

    pub fn accum_count(&self, class: AlertClass) -> u32 {
        self.regs.borrow().classes[class.index()].accum_count
    }

    pub fn ping_timer(&self) -> Option<u32> {
        let regs = self.regs.borrow();
        regs.ping_enabled.then_some(regs.ping_timeout)
    }

    /// Return a class to `Idle`, ending any escalation in progress. Refused
    /// once escalation has auto-locked the class.
    pub fn class_clear(&self, class: AlertClass) -> EscResult<()> {
        let regs = &mut *self.regs.borrow_mut();
        let class_regs = &mut regs.classes[class.index()];
        if class_regs.clear_locked {
            return Err(EscError::DRIVER_ALERT_HANDLER_LOCKED);
        }
        regs.timer.cancel_opt(&mut class_regs.timeout_action);
        regs.timer.cancel_opt(&mut class_regs.phase_action);
        class_regs.accum_count = 0;
        class_regs.state = ClassState::Idle;
        Ok(())
    }

    /// System reset. With `keep_causes` the cause register is carried
    /// across the reset.
    pub fn reset(&self, keep_causes: bool) {
        let mut regs = self.regs.borrow_mut();
        regs.cancel_actions();
        let causes: Vec<bool> = regs.alerts.iter().map(|a| a.cause).collect();
        let timer = regs.timer.clone();
        *regs = AlertHandlerImpl::new(timer);
        if keep_causes {
            for (alert, cause) in regs.alerts.iter_mut().zip(causes) {
                alert.cause = cause;
            }
        }
    }
}

impl AlertHandlerCapability for AlertHandler {
    fn configure_alert(
        &self,
        alert: AlertId,
        class: AlertClass,
        enabled: bool,
        lock: bool,
    ) -> EscResult<()> {
        let mut regs = self.regs.borrow_mut();
        let regs = regs
            .alerts
            .get_mut(alert.0 as usize)
            .ok_or(EscError::DRIVER_ALERT_HANDLER_BAD_ALERT)?;
        if regs.locked {
            return Err(EscError::DRIVER_ALERT_HANDLER_LOCKED);
        }
        regs.class = class;
        regs.enabled = enabled;
        regs.locked = lock;
        Ok(())
    }

    fn configure_class(
        &self,
        class: AlertClass,
        config: &ClassConfig,
        enabled: bool,
        lock: bool,
    ) -> EscResult<()> {
        config.validate()?;
        let crashdump_phase = config
            .crashdump_escalation_phase
            .phase_index()
            .ok_or(EscError::DRIVER_ALERT_HANDLER_BAD_CONFIG)?;
        let mut regs = self.regs.borrow_mut();
        let regs = &mut regs.classes[class.index()];
        if regs.locked {
            return Err(EscError::DRIVER_ALERT_HANDLER_LOCKED);
        }
        let mut phases = [PhaseRegs::default(); PHASE_COUNT];
        for phase in config.escalation_phases {
            let index = phase
                .phase
                .phase_index()
                .ok_or(EscError::DRIVER_ALERT_HANDLER_BAD_PHASE_ORDER)?;
            if phase.signal >= ESCALATION_SIGNAL_COUNT {
                return Err(EscError::DRIVER_ALERT_HANDLER_BAD_SIGNAL);
            }
            phases[index] = PhaseRegs {
                enabled: true,
                signal: phase.signal,
                cycles: phase.duration_cycles,
            };
        }
        regs.phases = phases;
        regs.crashdump_phase = crashdump_phase;
        regs.auto_lock_accumulation = config.auto_lock_accumulation_counter;
        regs.accum_thresh = config.accumulator_threshold;
        regs.timeout_cycles = config.irq_deadline_cycles;
        regs.enabled = enabled;
        regs.locked = lock;
        Ok(())
    }

    fn configure_ping_timer(&self, ping_timeout: u32, enabled: bool, lock: bool) -> EscResult<()> {
        let mut regs = self.regs.borrow_mut();
        if regs.ping_locked {
            return Err(EscError::DRIVER_ALERT_HANDLER_LOCKED);
        }
        regs.ping_timeout = ping_timeout;
        regs.ping_enabled = enabled;
        regs.ping_locked = lock;
        Ok(())
    }

    fn class_state(&self, class: AlertClass) -> EscResult<ClassState> {
        Ok(self.regs.borrow().classes[class.index()].state)
    }

    fn alert_is_cause(&self, alert: AlertId) -> EscResult<bool> {
        self.regs
            .borrow()
            .alerts
            .get(alert.0 as usize)
            .map(|a| a.cause)
            .ok_or(EscError::DRIVER_ALERT_HANDLER_BAD_ALERT)
    }

    fn irq_set_enabled(&self, irq: AlertHandlerIrq, enabled: bool) -> EscResult<()> {
        let mut regs = self.regs.borrow_mut();
        if enabled {
            regs.intr_enable |= 1 << irq.index();
        } else {
            regs.intr_enable &= !(1 << irq.index());
        }
        Ok(())
    }

    fn irq_acknowledge(&self, irq: AlertHandlerIrq) -> EscResult<()> {
        let regs = &mut *self.regs.borrow_mut();
        regs.intr_state &= !(1 << irq.index());
        let class_regs = &mut regs.classes[irq.index()];
        if class_regs.state == ClassState::Timeout {
            regs.timer.cancel_opt(&mut class_regs.timeout_action);
            class_regs.state = ClassState::Idle;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrst_drivers::top::{ALERT_ID_CLKMGR_AON_FATAL_FAULT, ALERT_ID_CLKMGR_AON_RECOV_FAULT};
    use escrst_drivers::EscalationPhase;

    const PHASES: [EscalationPhase; 3] = [
        EscalationPhase {
            phase: ClassState::Phase0,
            signal: 0,
            duration_cycles: 4800,
        },
        EscalationPhase {
            phase: ClassState::Phase1,
            signal: 1,
            duration_cycles: 4800,
        },
        EscalationPhase {
            phase: ClassState::Phase2,
            signal: 3,
            duration_cycles: 2400,
        },
    ];

    fn class_config(threshold: u16) -> ClassConfig<'static> {
        ClassConfig {
            auto_lock_accumulation_counter: false,
            accumulator_threshold: threshold,
            irq_deadline_cycles: 240,
            escalation_phases: &PHASES,
            crashdump_escalation_phase: ClassState::Phase3,
        }
    }

    fn configured(clock: &Clock, config: &ClassConfig) -> AlertHandler {
        let handler = AlertHandler::new(clock);
        handler
            .configure_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT, AlertClass::A, true, false)
            .unwrap();
        handler
            .configure_class(AlertClass::A, config, true, false)
            .unwrap();
        handler
            .irq_set_enabled(AlertHandlerIrq::ClassA, true)
            .unwrap();
        handler
    }

    fn signals(events: &[AlertHandlerEvent]) -> Vec<u32> {
        events
            .iter()
            .filter_map(|e| match e {
                AlertHandlerEvent::SignalAsserted { signal, .. } => Some(*signal),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_escalation_phases() {
        let clock = Clock::new();
        let handler = configured(&clock, &class_config(0));
        handler.raise_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT);

        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Phase0));
        assert_eq!(handler.alert_is_cause(ALERT_ID_CLKMGR_AON_FATAL_FAULT), Ok(true));
        assert!(handler.irq_line(AlertHandlerIrq::ClassA));
        assert_eq!(signals(&handler.take_events()), vec![0]);

        clock.increment(4800);
        handler.poll();
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Phase1));
        assert_eq!(signals(&handler.take_events()), vec![1]);

        clock.increment(4800);
        handler.poll();
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Phase2));
        assert_eq!(signals(&handler.take_events()), vec![3]);

        // Phase 3 is unconfigured and passes through
        clock.increment(2400);
        handler.poll();
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Terminal));
        let events = handler.take_events();
        assert!(events.contains(&AlertHandlerEvent::CrashdumpLatched {
            class: AlertClass::A
        }));
        let dump = handler.crashdump().unwrap();
        assert_eq!(dump.alert_causes, vec![ALERT_ID_CLKMGR_AON_FATAL_FAULT]);
        assert_eq!(dump.class_states[0], ClassState::Phase3);
        assert_eq!(dump.accum_counts[0], 1);
    }

    #[test]
    fn test_ack_keeps_cause() {
        let clock = Clock::new();
        let handler = configured(&clock, &class_config(0));
        handler.raise_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT);

        handler
            .irq_set_enabled(AlertHandlerIrq::ClassA, false)
            .unwrap();
        assert!(!handler.irq_line(AlertHandlerIrq::ClassA));
        handler
            .irq_acknowledge(AlertHandlerIrq::ClassA)
            .unwrap();
        handler
            .irq_set_enabled(AlertHandlerIrq::ClassA, true)
            .unwrap();
        assert!(!handler.irq_line(AlertHandlerIrq::ClassA));
        assert_eq!(handler.alert_is_cause(ALERT_ID_CLKMGR_AON_FATAL_FAULT), Ok(true));
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Phase0));
    }

    #[test]
    fn test_irq_deadline_starts_escalation() {
        let clock = Clock::new();
        let handler = configured(&clock, &class_config(5));
        handler.raise_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT);
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Timeout));

        clock.increment(240);
        handler.poll();
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Phase0));
    }

    #[test]
    fn test_ack_before_deadline() {
        let clock = Clock::new();
        let handler = configured(&clock, &class_config(5));
        handler.raise_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT);
        handler
            .irq_acknowledge(AlertHandlerIrq::ClassA)
            .unwrap();
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Idle));
        clock.increment(10_000);
        handler.poll();
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Idle));
        assert_eq!(handler.accum_count(AlertClass::A), 1);
    }

    #[test]
    fn test_disabled_alert_is_ignored() {
        let clock = Clock::new();
        let handler = configured(&clock, &class_config(0));
        handler.raise_alert(ALERT_ID_CLKMGR_AON_RECOV_FAULT);
        assert_eq!(handler.alert_is_cause(ALERT_ID_CLKMGR_AON_RECOV_FAULT), Ok(false));
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Idle));
        assert!(handler.take_events().is_empty());
    }

    #[test]
    fn test_locks() {
        let clock = Clock::new();
        let handler = AlertHandler::new(&clock);
        handler
            .configure_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT, AlertClass::A, true, true)
            .unwrap();
        assert_eq!(
            handler.configure_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT, AlertClass::B, true, false),
            Err(EscError::DRIVER_ALERT_HANDLER_LOCKED)
        );
        handler
            .configure_class(AlertClass::A, &class_config(0), true, true)
            .unwrap();
        assert_eq!(
            handler.configure_class(AlertClass::A, &class_config(0), false, false),
            Err(EscError::DRIVER_ALERT_HANDLER_LOCKED)
        );
        handler.configure_ping_timer(256, true, true).unwrap();
        assert_eq!(handler.ping_timer(), Some(256));
        assert_eq!(
            handler.configure_ping_timer(0, false, false),
            Err(EscError::DRIVER_ALERT_HANDLER_LOCKED)
        );
        assert_eq!(
            handler.configure_alert(AlertId(ALERT_COUNT), AlertClass::A, true, false),
            Err(EscError::DRIVER_ALERT_HANDLER_BAD_ALERT)
        );
    }

    #[test]
    fn test_auto_lock_refuses_clear() {
        let clock = Clock::new();
        let config = ClassConfig {
            auto_lock_accumulation_counter: true,
            ..class_config(0)
        };
        let handler = configured(&clock, &config);
        handler.raise_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT);
        assert_eq!(
            handler.class_clear(AlertClass::A),
            Err(EscError::DRIVER_ALERT_HANDLER_LOCKED)
        );

        let clock = Clock::new();
        let handler = configured(&clock, &class_config(0));
        handler.raise_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT);
        handler.class_clear(AlertClass::A).unwrap();
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Idle));
        assert_eq!(clock.ticks_until_next_action(), None);
    }

    #[test]
    fn test_reset() {
        let clock = Clock::new();
        let handler = configured(&clock, &class_config(0));
        handler.raise_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT);

        handler.reset(true);
        assert_eq!(handler.class_state(AlertClass::A), Ok(ClassState::Idle));
        assert_eq!(handler.alert_is_cause(ALERT_ID_CLKMGR_AON_FATAL_FAULT), Ok(true));
        assert_eq!(clock.ticks_until_next_action(), None);

        handler.reset(false);
        assert_eq!(handler.alert_is_cause(ALERT_ID_CLKMGR_AON_FATAL_FAULT), Ok(false));
    }
}

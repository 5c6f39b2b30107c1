/*++

Licensed under the Apache-2.0 license.

File Name:

    soc.rs

Abstract:

    File contains the emulated SoC: it owns the clock, wires the peripherals
    together and routes escalation signals and watchdog bites to resets.

--*/

use crate::aon_timer::AonIrq;
use crate::{AlertHandler, AlertHandlerEvent, AonTimer, ClkMgr, Cpu, Plic, RstMgr};
use escrst_drivers::top::{
    ALERT_ID_CLKMGR_AON_FATAL_FAULT, AON_CLOCK_HZ, PERIPHERAL_CLOCK_HZ,
    PLIC_IRQ_ID_ALERT_HANDLER_CLASSA, PLIC_IRQ_ID_ALERT_HANDLER_CLASSB,
    PLIC_IRQ_ID_ALERT_HANDLER_CLASSC, PLIC_IRQ_ID_ALERT_HANDLER_CLASSD,
    PLIC_IRQ_ID_AON_TIMER_WDOG_TIMER_BARK,
    PLIC_IRQ_ID_AON_TIMER_WKUP_TIMER_EXPIRED, PLIC_TARGET_IBEX0,
};
use escrst_drivers::{AlertHandlerIrq, FatalErrCodes, IrqId, ResetInfo};
use escrst_emu_bus::{ActionHandle, Clock, Device, Timer};

/// Life-cycle escalation signal
const SIGNAL_LC_ESCALATE: u32 = 1;

/// Reset request signal
const SIGNAL_RESET_REQUEST: u32 = 3;

/// Interrupt controller sources driven by a peripheral
const IRQ_LINES: [IrqId; 6] = [
    PLIC_IRQ_ID_ALERT_HANDLER_CLASSA,
    PLIC_IRQ_ID_ALERT_HANDLER_CLASSB,
    PLIC_IRQ_ID_ALERT_HANDLER_CLASSC,
    PLIC_IRQ_ID_ALERT_HANDLER_CLASSD,
    PLIC_IRQ_ID_AON_TIMER_WKUP_TIMER_EXPIRED,
    PLIC_IRQ_ID_AON_TIMER_WDOG_TIMER_BARK,
];

/// Current output level of the peripheral behind `irq`
fn line_level(alert_handler: &AlertHandler, aon_timer: &AonTimer, irq: IrqId) -> Option<bool> {
    if irq == PLIC_IRQ_ID_AON_TIMER_WKUP_TIMER_EXPIRED {
        return Some(aon_timer.irq_line(AonIrq::WakeupTimerExpired));
    }
    if irq == PLIC_IRQ_ID_AON_TIMER_WDOG_TIMER_BARK {
        return Some(aon_timer.irq_line(AonIrq::WatchdogBark));
    }
    AlertHandlerIrq::from_plic_id(irq)
        .ok()
        .map(|class| alert_handler.irq_line(class))
}

/// Hardware defects a run can opt into
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct ResetDefects {
    /// Clock manager fatal error codes survive a system reset
    pub clkmgr_codes_survive_reset: bool,

    /// Alert cause bits survive a system reset
    pub alert_cause_survives_reset: bool,

    /// Life-cycle escalation leaves the watchdog running
    pub escalation_ignores_watchdog: bool,
}

#[derive(Debug, Copy, Clone)]
pub struct SocArgs {
    pub peripheral_clock_hz: u64,
    pub aon_clock_hz: u64,

    /// Cycles between a reset request and the reset taking effect
    pub reset_latency_cycles: u64,

    pub defects: ResetDefects,
}

impl Default for SocArgs {
    fn default() -> Self {
        Self {
            peripheral_clock_hz: PERIPHERAL_CLOCK_HZ,
            aon_clock_hz: AON_CLOCK_HZ,
            reset_latency_cycles: 8,
            defects: ResetDefects::default(),
        }
    }
}

/// Observable SoC activity
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SocEvent {
    FaultInjected(FatalErrCodes),
    Alert(AlertHandlerEvent),
    WatchdogFrozen,
    WatchdogBite,
    ResetRequested(ResetInfo),
    Reset(ResetInfo),
}

pub struct Soc {
    clock: Clock,
    timer: Timer,
    args: SocArgs,

    pub cpu: Cpu,
    pub clkmgr: ClkMgr,
    pub rstmgr: RstMgr,
    pub aon_timer: AonTimer,
    pub plic: Plic,
    pub alert_handler: AlertHandler,

    fatal_alert_sent: bool,
    reset_action: Option<ActionHandle>,
    reset_cause: ResetInfo,
    completed_reset: Option<ResetInfo>,
    events: Vec<(u64, SocEvent)>,
}

impl Soc {
    pub fn new(args: SocArgs) -> Self {
        let clock = Clock::new();
        let cycles_per_tick = args.peripheral_clock_hz / args.aon_clock_hz.max(1);
        let aon_timer = AonTimer::new(&clock, cycles_per_tick);
        let alert_handler = AlertHandler::new(&clock);
        let plic = Plic::new();
        {
            let aon_timer = aon_timer.clone();
            let alert_handler = alert_handler.clone();
            plic.connect_lines(move |irq| line_level(&alert_handler, &aon_timer, irq));
        }
        Self {
            timer: Timer::new(&clock),
            cpu: Cpu::new(),
            clkmgr: ClkMgr::new(),
            rstmgr: RstMgr::new(),
            aon_timer,
            plic,
            alert_handler,
            clock,
            args,
            fatal_alert_sent: false,
            reset_action: None,
            reset_cause: ResetInfo::empty(),
            completed_reset: None,
            events: Vec::new(),
        }
    }

    /// Current time in peripheral clock cycles
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Apply outstanding requests without advancing time. Returns the cause
    /// if a system reset took effect.
    pub fn settle(&mut self) -> Option<ResetInfo> {
        self.process();
        self.completed_reset.take()
    }

    /// Run until the next scheduled event or for `max_cycles`, whichever
    /// comes first. Returns the cause if a system reset took effect.
    pub fn step(&mut self, max_cycles: u64) -> Option<ResetInfo> {
        if let Some(cause) = self.settle() {
            return Some(cause);
        }
        let delta = self
            .clock
            .ticks_until_next_action()
            .map_or(max_cycles, |ticks| ticks.min(max_cycles));
        let clock = self.clock.clone();
        clock.increment_and_poll(delta, self);
        self.completed_reset.take()
    }

    /// Whether the main core would take an external interrupt now
    pub fn irq_pending(&self) -> bool {
        self.cpu.irq_deliverable() && self.plic.has_deliverable(PLIC_TARGET_IBEX0)
    }

    /// Propagate peripheral interrupt outputs to the interrupt controller.
    pub fn update_irq_lines(&self) {
        for id in IRQ_LINES {
            if let Some(high) = line_level(&self.alert_handler, &self.aon_timer, id) {
                self.plic.set_level(id, high);
            }
        }
    }

    pub fn set_cpu_sleeping(&self, sleeping: bool) {
        self.aon_timer.set_sleeping(sleeping);
    }

    /// Drain the activity recorded since the last call, stamped with the
    /// cycle it happened at.
    pub fn take_events(&mut self) -> Vec<(u64, SocEvent)> {
        std::mem::take(&mut self.events)
    }

    /// Power-on reset of every domain, always-on included
    pub fn power_on_reset(&mut self) {
        self.timer.cancel_opt(&mut self.reset_action);
        self.clkmgr.reset();
        self.rstmgr.power_on_reset();
        self.aon_timer.power_on_reset();
        self.alert_handler.reset(false);
        self.plic.reset();
        self.cpu.reset();
        self.fatal_alert_sent = false;
        self.completed_reset = None;
    }

    fn record(&mut self, event: SocEvent) {
        self.events.push((self.clock.now(), event));
    }

    fn process(&mut self) {
        if self.cpu.take_abort() {
            self.clkmgr.inject_fault(FatalErrCodes::IDLE_COUNT);
            self.record(SocEvent::FaultInjected(FatalErrCodes::IDLE_COUNT));
        }
        if self.clkmgr.fatal_alert_asserted() && !self.fatal_alert_sent {
            self.fatal_alert_sent = true;
            self.alert_handler
                .raise_alert(ALERT_ID_CLKMGR_AON_FATAL_FAULT);
        }
        self.alert_handler.poll();
        self.aon_timer.poll();

        for event in self.alert_handler.take_events() {
            self.record(SocEvent::Alert(event));
            if let AlertHandlerEvent::SignalAsserted { signal, .. } = event {
                self.escalation_signal(signal);
            }
        }
        if self.aon_timer.take_bite() {
            self.record(SocEvent::WatchdogBite);
            self.request_reset(ResetInfo::WATCHDOG);
        }
        if self.timer.fired(&mut self.reset_action) {
            self.system_reset();
        }
        self.update_irq_lines();
    }

    fn escalation_signal(&mut self, signal: u32) {
        match signal {
            SIGNAL_LC_ESCALATE if !self.args.defects.escalation_ignores_watchdog => {
                self.aon_timer.set_escalated(true);
                self.record(SocEvent::WatchdogFrozen);
            }
            SIGNAL_RESET_REQUEST => self.request_reset(ResetInfo::ESCALATION),
            _ => {}
        }
    }

    fn request_reset(&mut self, cause: ResetInfo) {
        if self.reset_action.is_some() {
            return;
        }
        self.reset_cause = cause;
        self.reset_action = Some(self.timer.schedule_poll_in(self.args.reset_latency_cycles));
        self.record(SocEvent::ResetRequested(cause));
    }

    /// Reset everything outside the always-on domain.
    fn system_reset(&mut self) {
        let cause = self.reset_cause;
        let defects = self.args.defects;
        self.rstmgr.record_reset(cause);
        self.alert_handler
            .reset(defects.alert_cause_survives_reset);
        if !defects.clkmgr_codes_survive_reset {
            self.clkmgr.reset();
        }
        self.plic.reset();
        self.cpu.reset();
        self.aon_timer.set_escalated(false);
        self.aon_timer.set_sleeping(false);
        self.fatal_alert_sent = false;
        self.record(SocEvent::Reset(cause));
        self.completed_reset = Some(cause);
    }
}

impl Device for Soc {
    fn poll(&mut self) {
        self.process();
    }
}

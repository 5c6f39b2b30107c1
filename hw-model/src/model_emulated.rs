// Licensed under the Apache-2.0 license

use std::error::Error;

use escrst_drivers::{BootStatus, Firmware, RstMgr as _};
use escrst_emu_periph::{AlertHandlerEvent, Soc, SocArgs, SocEvent};

use crate::output::Output;
use crate::platform::{EmuPlatform, PeripheralId};
use crate::{BootEnd, BootReport, ExitStatus, HwModel, InitParams};

fn describe(event: &SocEvent) -> String {
    match event {
        SocEvent::FaultInjected(codes) => {
            format!("clkmgr fatal fault injected codes=0x{:x}", codes.bits())
        }
        SocEvent::Alert(AlertHandlerEvent::AlertRaised { alert, class }) => {
            format!("alert {} raised, class {:?}", alert.0, class)
        }
        SocEvent::Alert(AlertHandlerEvent::EscalationStarted { class }) => {
            format!("class {class:?} escalation started")
        }
        SocEvent::Alert(AlertHandlerEvent::PhaseEntered { class, state }) => {
            format!("class {class:?} entered {state:?}")
        }
        SocEvent::Alert(AlertHandlerEvent::SignalAsserted { class, signal }) => {
            format!("class {class:?} asserted escalation signal {signal}")
        }
        SocEvent::Alert(AlertHandlerEvent::CrashdumpLatched { class }) => {
            format!("class {class:?} crash dump latched")
        }
        SocEvent::WatchdogFrozen => "watchdog frozen by escalation".into(),
        SocEvent::WatchdogBite => "watchdog bite".into(),
        SocEvent::ResetRequested(cause) => format!("reset requested cause={cause:?}"),
        SocEvent::Reset(cause) => format!("system reset cause={cause:?}"),
    }
}

pub struct ModelEmulated {
    soc: Soc,
    output: Output,
    irq_latency_cycles: u64,
    cycles_per_boot: u64,
    max_boots: usize,
    max_isr_per_boot: u32,
    fail_init: Option<PeripheralId>,
    boot_count: usize,
}

impl ModelEmulated {
    pub fn soc(&self) -> &Soc {
        &self.soc
    }

    fn trace_events(&mut self) {
        for (cycle, event) in self.soc.take_events() {
            self.output.sink().set_now(cycle);
            self.output.sink().push_line(&describe(&event));
        }
        self.output.sink().set_now(self.soc.now());
    }

    fn fatal_error(&self) -> Option<BootEnd> {
        match self.soc.cpu.fw_error_fatal() {
            0 => None,
            code => Some(BootEnd::FatalError(code)),
        }
    }

    /// Run the interrupt handler for as long as an interrupt is pending.
    fn deliver_irqs<F: Firmware>(&mut self, fw: &F, isr_count: &mut u32) -> Option<BootEnd> {
        while self.soc.irq_pending() {
            if *isr_count >= self.max_isr_per_boot {
                return Some(BootEnd::InterruptStorm);
            }
            let until = self.soc.now() + self.irq_latency_cycles;
            while self.soc.now() < until {
                if let Some(cause) = self.soc.step(until - self.soc.now()) {
                    return Some(BootEnd::Reset(cause));
                }
            }
            self.trace_events();
            if !self.soc.irq_pending() {
                break;
            }
            fw.external_isr();
            *isr_count += 1;
            self.soc.update_irq_lines();
            if let Some(end) = self.fatal_error() {
                return Some(end);
            }
        }
        None
    }

    fn finish_boot<F: Firmware>(
        &mut self,
        fw: &F,
        status: BootStatus,
        start_cycle: u64,
        isr_count: &mut u32,
    ) -> BootEnd {
        loop {
            if let Some(end) = self.fatal_error() {
                return end;
            }
            if let Some(cause) = self.soc.settle() {
                return BootEnd::Reset(cause);
            }
            self.trace_events();
            if let Some(end) = self.deliver_irqs(fw, isr_count) {
                return end;
            }
            if status != BootStatus::AwaitingReset {
                return BootEnd::Finished;
            }
            // Idle with interrupts enabled until the reset arrives
            self.soc.set_cpu_sleeping(true);
            let elapsed = self.soc.now() - start_cycle;
            if elapsed >= self.cycles_per_boot {
                return BootEnd::Timeout;
            }
            if let Some(cause) = self.soc.step(self.cycles_per_boot - elapsed) {
                return BootEnd::Reset(cause);
            }
        }
    }
}

impl HwModel for ModelEmulated {
    fn init(params: InitParams) -> Result<Self, Box<dyn Error>>
    where
        Self: Sized,
    {
        if params.peripheral_clock_hz == 0 || params.aon_clock_hz == 0 {
            return Err("clock frequencies must be non-zero".into());
        }
        if params.aon_clock_hz > params.peripheral_clock_hz {
            return Err(format!(
                "always-on clock ({} Hz) must not be faster than the peripheral clock ({} Hz)",
                params.aon_clock_hz, params.peripheral_clock_hz
            )
            .into());
        }
        if params.max_boots == 0 {
            return Err("at least one boot is required".into());
        }

        let mut soc = Soc::new(SocArgs {
            peripheral_clock_hz: params.peripheral_clock_hz,
            aon_clock_hz: params.aon_clock_hz,
            reset_latency_cycles: params.reset_latency_cycles,
            defects: params.defects,
        });
        soc.power_on_reset();
        if let Some(reset_info) = params.initial_reset_info {
            soc.rstmgr.set_reset_info(reset_info);
        }

        Ok(ModelEmulated {
            soc,
            output: Output::new_internal(params.log_writer),
            irq_latency_cycles: params.irq_latency_cycles,
            cycles_per_boot: params.cycles_per_boot,
            max_boots: params.max_boots,
            max_isr_per_boot: params.max_isr_per_boot,
            fail_init: params.fail_init,
            boot_count: 0,
        })
    }

    fn platform(&self) -> EmuPlatform {
        EmuPlatform::new(&self.soc, self.fail_init)
    }

    fn boot<F: Firmware>(&mut self, fw: &F) -> BootReport {
        let start_cycle = self.soc.now();
        self.trace_events();
        let reset_info = self.soc.rstmgr.reset_info().unwrap_or_default();
        self.output.sink().push_line(&format!(
            "boot {} started, reset_info=0x{:x}",
            self.boot_count, reset_info
        ));
        self.boot_count += 1;

        self.soc.set_cpu_sleeping(false);
        let status = fw.main();
        let mut isr_count = 0;
        let end = self.finish_boot(fw, status, start_cycle, &mut isr_count);

        self.trace_events();
        self.output
            .sink()
            .push_line(&format!("boot ended: {end:?}, main returned {status:?}"));
        match (status, end) {
            (_, BootEnd::Reset(_)) => {}
            (BootStatus::Passed, BootEnd::Finished) => {
                self.output.sink().set_exit_status(ExitStatus::Passed)
            }
            _ => self.output.sink().set_exit_status(ExitStatus::Failed),
        }

        BootReport {
            status,
            end,
            isr_count,
            start_cycle,
            end_cycle: self.soc.now(),
        }
    }

    fn max_boots(&self) -> usize {
        self.max_boots
    }

    fn output(&mut self) -> &mut Output {
        &mut self.output
    }
}

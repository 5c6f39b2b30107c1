// Licensed under the Apache-2.0 license

use std::error::Error;

use escrst_drivers::{EscError, Firmware, ResetInfo};

mod model_emulated;
mod output;
mod platform;

pub use escrst_drivers::BootStatus;
pub use escrst_emu_periph::ResetDefects;
pub use model_emulated::ModelEmulated;
pub use output::{ExitStatus, Output, OutputSink, TraceLine};
pub use platform::{EmuPlatform, PeripheralId};

pub type DefaultHwModel = ModelEmulated;

pub struct InitParams {
    pub peripheral_clock_hz: u64,
    pub aon_clock_hz: u64,

    /// Cycles between a reset request and the reset taking effect
    pub reset_latency_cycles: u64,

    /// Cycles between an interrupt becoming pending and its handler running
    pub irq_latency_cycles: u64,

    /// Cycle budget of a single boot
    pub cycles_per_boot: u64,

    pub max_boots: usize,

    /// Handler invocations per boot before the boot is declared stuck
    pub max_isr_per_boot: u32,

    /// Reset info register value at power-on, overriding the POR bit
    pub initial_reset_info: Option<u32>,

    /// Peripheral whose handle construction fails
    pub fail_init: Option<PeripheralId>,

    pub defects: ResetDefects,

    // Where to write the trace of the run
    pub log_writer: Box<dyn std::io::Write>,
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            peripheral_clock_hz: escrst_drivers::top::PERIPHERAL_CLOCK_HZ,
            aon_clock_hz: escrst_drivers::top::AON_CLOCK_HZ,
            reset_latency_cycles: 8,
            irq_latency_cycles: 24,
            cycles_per_boot: 1_000_000,
            max_boots: 4,
            max_isr_per_boot: 16,
            initial_reset_info: None,
            fail_init: None,
            defects: ResetDefects::default(),
            log_writer: Box::new(std::io::stdout()),
        }
    }
}

/// How a boot ended
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BootEnd {
    /// A system reset took effect
    Reset(ResetInfo),

    /// `main` returned a final status
    Finished,

    /// Firmware reported a fatal error
    FatalError(u32),

    /// The interrupt handler kept being re-entered without the source clearing
    InterruptStorm,

    /// Cycle budget used up while waiting for a reset
    Timeout,
}

#[derive(Debug, Clone)]
pub struct BootReport {
    pub status: BootStatus,
    pub end: BootEnd,
    pub isr_count: u32,
    pub start_cycle: u64,
    pub end_cycle: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub boots: Vec<BootReport>,
}

impl RunReport {
    /// The last boot passed and nothing reported a fatal error.
    pub fn passed(&self) -> bool {
        self.fatal_error().is_none()
            && matches!(
                self.boots.last(),
                Some(BootReport {
                    status: BootStatus::Passed,
                    end: BootEnd::Finished,
                    ..
                })
            )
    }

    /// First fatal error reported by firmware, if any
    pub fn fatal_error(&self) -> Option<EscError> {
        self.boots.iter().find_map(|boot| match boot.end {
            BootEnd::FatalError(code) => EscError::try_from(code).ok(),
            _ => None,
        })
    }

    pub fn reset_causes(&self) -> Vec<ResetInfo> {
        self.boots
            .iter()
            .filter_map(|boot| match boot.end {
                BootEnd::Reset(cause) => Some(cause),
                _ => None,
            })
            .collect()
    }
}

/// Creates a model with the default backend.
pub fn new(params: InitParams) -> Result<DefaultHwModel, Box<dyn Error>> {
    DefaultHwModel::init(params)
}

// Represents an emulator of the SoC, to be called from tests.
pub trait HwModel {
    fn init(params: InitParams) -> Result<Self, Box<dyn Error>>
    where
        Self: Sized;

    /// Handles onto the SoC for the firmware of the next boot
    fn platform(&self) -> EmuPlatform;

    /// Run one boot: `main`, then interrupts while the core idles, until a
    /// reset or a final verdict.
    fn boot<F: Firmware>(&mut self, fw: &F) -> BootReport;

    fn max_boots(&self) -> usize;

    /// The trace of the run is available here.
    fn output(&mut self) -> &mut Output;

    /// Boot repeatedly, building the firmware afresh for every boot, until a
    /// boot ends without a reset or the boot limit is reached.
    fn run_to_completion<F: Firmware>(
        &mut self,
        mut build: impl FnMut(EmuPlatform) -> F,
    ) -> RunReport {
        let mut report = RunReport::default();
        while report.boots.len() < self.max_boots() {
            let fw = build(self.platform());
            let boot = self.boot(&fw);
            let reset = matches!(boot.end, BootEnd::Reset(_));
            report.boots.push(boot);
            if !reset {
                break;
            }
        }
        report
    }

    /// Run to completion and fail unless the run passed.
    fn run_until_exit_success<F: Firmware>(
        &mut self,
        build: impl FnMut(EmuPlatform) -> F,
    ) -> Result<RunReport, Box<dyn Error>> {
        let report = self.run_to_completion(build);
        if !report.passed() {
            return Err(format!("run did not pass: {:?}", report.boots).into());
        }
        Ok(report)
    }
}

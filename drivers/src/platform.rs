/*++

Licensed under the Apache-2.0 license.

File Name:

    platform.rs

Abstract:

    File contains the platform interface a boot is given: the core-local
    capability plus constructors for every peripheral handle, and the entry
    points a firmware image exposes to the platform.

--*/

use crate::{AlertHandler, AonTimer, ClkMgr, Cpu, EscResult, Plic, RstMgr};

/// Peripheral handles available to one boot
pub trait Platform {
    type Cpu: Cpu;
    type ClkMgr: ClkMgr;
    type RstMgr: RstMgr;
    type AonTimer: AonTimer;
    type Plic: Plic;
    type AlertHandler: AlertHandler;

    fn cpu(&self) -> &Self::Cpu;

    fn clkmgr_init(&self) -> EscResult<Self::ClkMgr>;

    fn rstmgr_init(&self) -> EscResult<Self::RstMgr>;

    fn aon_timer_init(&self) -> EscResult<Self::AonTimer>;

    fn plic_init(&self) -> EscResult<Self::Plic>;

    fn alert_handler_init(&self) -> EscResult<Self::AlertHandler>;
}

/// What `Firmware::main` left the platform to do
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BootStatus {
    /// Test finished and passed
    Passed,
    /// Test finished and failed
    Failed,
    /// Test continues after a hardware reset; the core idles until then
    AwaitingReset,
}

/// Entry points of a firmware image
pub trait Firmware {
    /// Main flow, run once per boot
    fn main(&self) -> BootStatus;

    /// External interrupt handler. Runs preempting `main`, is never
    /// re-entered, and must not block.
    fn external_isr(&self);
}

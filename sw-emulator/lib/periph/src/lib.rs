/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulated peripherals of the escalation
    reset SoC.

--*/

mod alert_handler;
mod aon_timer;
mod clkmgr;
mod cpu;
mod plic;
mod rstmgr;
mod soc;

pub use alert_handler::{AlertHandler, AlertHandlerEvent, Crashdump};
pub use aon_timer::{AonIrq, AonTimer};
pub use clkmgr::ClkMgr;
pub use cpu::Cpu;
pub use plic::{LineSampler, Plic};
pub use rstmgr::RstMgr;
pub use soc::{ResetDefects, Soc, SocArgs, SocEvent};

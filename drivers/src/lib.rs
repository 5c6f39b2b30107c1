/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the escalation reset driver library: the
    capability interfaces of the peripherals the scenario touches, the SoC
    description, and the timing model.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

pub mod alert_handler;
pub mod aon_timer;
mod clkmgr;
mod cpu;
mod platform;
pub mod plic;
pub mod printer;
pub mod rstmgr;
pub mod timing;
pub mod top;

pub use alert_handler::{
    AlertClass, AlertHandler, AlertHandlerConfig, AlertHandlerIrq, ClassConfig, ClassState,
    EscalationPhase,
};
pub use aon_timer::AonTimer;
pub use clkmgr::{ClkMgr, FatalErrCodes};
pub use cpu::Cpu;
pub use escrst_error::{EscError, EscResult};
pub use platform::{BootStatus, Firmware, Platform};
pub use plic::{ClaimedIrq, IrqId, Plic, PlicTarget};
pub use rstmgr::{ResetInfo, ResetReason, RstMgr};
pub use timing::TimingPlan;
pub use top::{AlertId, PlicPeripheral};

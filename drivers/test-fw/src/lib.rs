// Licensed under the Apache-2.0 license

//! Escalation reset test firmware.
//!
//! The first boot injects a clock manager fatal fault and waits for the alert
//! handler to escalate into a chip reset before the watchdog bites. The boot
//! after the escalation reset checks that the fault and the alert cause were
//! cleared, then shuts the watchdog down.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod config;
mod context;
mod fault;
mod observer;
mod orchestrator;

#[cfg(test)]
mod fake;

pub use context::{Peripherals, TestContext};
pub use observer::{on_external_irq, Observer, ObserverState};
pub use orchestrator::{execute, run, EpochOutcome};

use escrst_drivers::{BootStatus, Firmware, Platform};

/// Firmware image of the escalation reset test
pub struct EscalationResetTest<P: Platform> {
    ctx: TestContext<P>,
}

impl<P: Platform> EscalationResetTest<P> {
    pub fn new(platform: P) -> Self {
        Self {
            ctx: TestContext::new(platform),
        }
    }

    pub fn context(&self) -> &TestContext<P> {
        &self.ctx
    }
}

impl<P: Platform> Firmware for EscalationResetTest<P> {
    fn main(&self) -> BootStatus {
        if run(&self.ctx) {
            BootStatus::Passed
        } else if self.ctx.failure().is_some() {
            BootStatus::Failed
        } else {
            BootStatus::AwaitingReset
        }
    }

    fn external_isr(&self) {
        if let Err(err) = on_external_irq(&self.ctx) {
            self.ctx.fail(err);
        }
    }
}

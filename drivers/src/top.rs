/*++

Licensed under the Apache-2.0 license.

File Name:

    top.rs

Abstract:

    File contains the description of the SoC top level: clock rates,
    interrupt controller ids, and alert ids.

--*/

use crate::plic::{IrqId, PlicTarget};

/// Peripheral (IO) clock frequency
pub const PERIPHERAL_CLOCK_HZ: u64 = 24_000_000;

/// Always-on clock frequency
pub const AON_CLOCK_HZ: u64 = 200_000;

/// Interrupt controller target of the main core
pub const PLIC_TARGET_IBEX0: PlicTarget = PlicTarget(0);

/// Number of interrupt controller targets
pub const PLIC_TARGET_COUNT: u32 = 1;

/// Reserved "no interrupt" id
pub const PLIC_IRQ_ID_NONE: IrqId = IrqId(0);

pub const PLIC_IRQ_ID_ALERT_HANDLER_CLASSA: IrqId = IrqId(127);
pub const PLIC_IRQ_ID_ALERT_HANDLER_CLASSB: IrqId = IrqId(128);
pub const PLIC_IRQ_ID_ALERT_HANDLER_CLASSC: IrqId = IrqId(129);
pub const PLIC_IRQ_ID_ALERT_HANDLER_CLASSD: IrqId = IrqId(130);

pub const PLIC_IRQ_ID_AON_TIMER_WKUP_TIMER_EXPIRED: IrqId = IrqId(155);
pub const PLIC_IRQ_ID_AON_TIMER_WDOG_TIMER_BARK: IrqId = IrqId(156);

/// Highest valid interrupt id
pub const PLIC_IRQ_ID_LAST: IrqId = IrqId(185);

/// Peripheral that owns an interrupt id
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PlicPeripheral {
    Unknown,
    AlertHandler,
    AonTimerAon,
}

/// Map an interrupt id to the peripheral that raised it.
pub fn peripheral_for_irq(id: IrqId) -> PlicPeripheral {
    if (PLIC_IRQ_ID_ALERT_HANDLER_CLASSA.0..=PLIC_IRQ_ID_ALERT_HANDLER_CLASSD.0).contains(&id.0) {
        PlicPeripheral::AlertHandler
    } else if (PLIC_IRQ_ID_AON_TIMER_WKUP_TIMER_EXPIRED.0
        ..=PLIC_IRQ_ID_AON_TIMER_WDOG_TIMER_BARK.0)
        .contains(&id.0)
    {
        PlicPeripheral::AonTimerAon
    } else {
        PlicPeripheral::Unknown
    }
}

/// Alert source identifier
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct AlertId(pub u32);

pub const ALERT_ID_CLKMGR_AON_RECOV_FAULT: AlertId = AlertId(23);
pub const ALERT_ID_CLKMGR_AON_FATAL_FAULT: AlertId = AlertId(24);

/// Number of alert sources wired to the alert handler
pub const ALERT_COUNT: u32 = 65;

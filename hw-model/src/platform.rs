// Licensed under the Apache-2.0 license

use escrst_drivers::{EscError, EscResult, Platform};
use escrst_emu_periph::{AlertHandler, AonTimer, ClkMgr, Cpu, Plic, RstMgr, Soc};

/// Peripheral whose handle construction can be made to fail
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PeripheralId {
    ClkMgr,
    RstMgr,
    AonTimer,
    Plic,
    AlertHandler,
}

impl PeripheralId {
    fn init_error(self) -> EscError {
        match self {
            PeripheralId::ClkMgr => EscError::DRIVER_CLKMGR_INIT_FAILURE,
            PeripheralId::RstMgr => EscError::DRIVER_RSTMGR_INIT_FAILURE,
            PeripheralId::AonTimer => EscError::DRIVER_AON_TIMER_INIT_FAILURE,
            PeripheralId::Plic => EscError::DRIVER_PLIC_INIT_FAILURE,
            PeripheralId::AlertHandler => EscError::DRIVER_ALERT_HANDLER_INIT_FAILURE,
        }
    }
}

/// Handles onto the emulated SoC, given to the firmware of one boot
#[derive(Clone)]
pub struct EmuPlatform {
    cpu: Cpu,
    clkmgr: ClkMgr,
    rstmgr: RstMgr,
    aon_timer: AonTimer,
    plic: Plic,
    alert_handler: AlertHandler,
    fail_init: Option<PeripheralId>,
}

impl EmuPlatform {
    pub(crate) fn new(soc: &Soc, fail_init: Option<PeripheralId>) -> Self {
        Self {
            cpu: soc.cpu.clone(),
            clkmgr: soc.clkmgr.clone(),
            rstmgr: soc.rstmgr.clone(),
            aon_timer: soc.aon_timer.clone(),
            plic: soc.plic.clone(),
            alert_handler: soc.alert_handler.clone(),
            fail_init,
        }
    }

    fn init<T: Clone>(&self, id: PeripheralId, handle: &T) -> EscResult<T> {
        if self.fail_init == Some(id) {
            return Err(id.init_error());
        }
        Ok(handle.clone())
    }
}

impl Platform for EmuPlatform {
    type Cpu = Cpu;
    type ClkMgr = ClkMgr;
    type RstMgr = RstMgr;
    type AonTimer = AonTimer;
    type Plic = Plic;
    type AlertHandler = AlertHandler;

    fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    fn clkmgr_init(&self) -> EscResult<ClkMgr> {
        self.init(PeripheralId::ClkMgr, &self.clkmgr)
    }

    fn rstmgr_init(&self) -> EscResult<RstMgr> {
        self.init(PeripheralId::RstMgr, &self.rstmgr)
    }

    fn aon_timer_init(&self) -> EscResult<AonTimer> {
        self.init(PeripheralId::AonTimer, &self.aon_timer)
    }

    fn plic_init(&self) -> EscResult<Plic> {
        self.init(PeripheralId::Plic, &self.plic)
    }

    fn alert_handler_init(&self) -> EscResult<AlertHandler> {
        self.init(PeripheralId::AlertHandler, &self.alert_handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrst_drivers::RstMgr as _;
    use escrst_emu_periph::SocArgs;

    #[test]
    fn test_handles_share_state() {
        let soc = Soc::new(SocArgs::default());
        let platform = EmuPlatform::new(&soc, None);
        let rstmgr = platform.rstmgr_init().unwrap();
        rstmgr.reset_info_clear().unwrap();
        assert_eq!(soc.rstmgr.reset_info(), Ok(0));
    }

    #[test]
    fn test_init_failure() {
        let soc = Soc::new(SocArgs::default());
        let platform = EmuPlatform::new(&soc, Some(PeripheralId::Plic));
        assert!(platform.clkmgr_init().is_ok());
        assert_eq!(
            platform.plic_init().err(),
            Some(EscError::DRIVER_PLIC_INIT_FAILURE)
        );
    }
}

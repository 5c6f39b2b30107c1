/*++

Licensed under the Apache-2.0 license.

File Name:

    cpu.rs

Abstract:

    File contains the core-local capability: interrupt enables, fatal error
    reporting, and abnormal termination.

--*/

/// Core-local control
pub trait Cpu {
    /// Enable or disable interrupt delivery globally (mstatus.MIE)
    fn irq_global_ctrl(&self, enable: bool);

    /// Enable or disable external (interrupt controller) interrupts (mie.MEIE)
    fn irq_external_ctrl(&self, enable: bool);

    /// Report a fatal firmware error code to the SoC
    ///
    /// # Arguments
    ///
    /// * `code` - Error code, never zero
    fn report_fw_error_fatal(&self, code: u32);

    /// Abnormal termination. The platform maps this onto the clock manager
    /// fatal fault; on silicon the call does not come back.
    fn abort(&self);
}

/*++

Licensed under the Apache-2.0 license.

File Name:

    clkmgr.rs

Abstract:

    File contains the clock manager capability.

--*/

use crate::EscResult;
use bitflags::bitflags;

bitflags! {
    /// Clock manager fatal error causes. These can only be cleared by reset.
    #[derive(Default)]
    pub struct FatalErrCodes: u32 {
        const REGFILE_INTEGRITY = 1 << 0;
        const IDLE_COUNT = 1 << 1;
        const SHADOW_STORAGE = 1 << 2;
    }
}

/// Clock manager capability
pub trait ClkMgr {
    /// Read the fatal error cause register
    fn fatal_err_codes(&self) -> EscResult<FatalErrCodes>;
}

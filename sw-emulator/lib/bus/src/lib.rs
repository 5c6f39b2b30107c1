/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulator clock library.

--*/
mod clock;
mod device;

pub use crate::clock::{ActionHandle, Clock, Timer};
pub use crate::device::Device;

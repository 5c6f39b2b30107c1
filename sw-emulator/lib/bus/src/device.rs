/*++

Licensed under the Apache-2.0 license.

File Name:

    device.rs

Abstract:

    File contains definition of the Device trait.

--*/

/// A simulated peripheral (or group of peripherals) driven by a [`crate::Clock`].
pub trait Device {
    /// Called when at least one timer action scheduled by this device's
    /// timers has fired. Implementations use [`crate::Timer::fired`] to find
    /// out which.
    fn poll(&mut self);
}

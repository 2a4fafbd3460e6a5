//! Scoped device placement of transitions.
use super::PpoTransition;
use anyhow::Result;
use candle_core::Device;
use log::error;
use std::ops::{Deref, DerefMut};

/// A transition temporarily moved to a compute device.
///
/// The transition goes back to the device it came from when the guard is
/// released or dropped, including early returns with `?`.
pub struct DevicePlacement<'a> {
    transition: &'a mut PpoTransition,
    home: Device,
    released: bool,
}

impl<'a> DevicePlacement<'a> {
    /// Moves `transition` to `device`.
    pub fn acquire(transition: &'a mut PpoTransition, device: &Device) -> Result<Self> {
        let home = transition.device().clone();
        let mut placement = Self {
            transition,
            home,
            released: false,
        };
        placement.transition.move_to(device)?;
        Ok(placement)
    }

    /// Moves the transition back to its original device.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.transition.move_to(&self.home)
    }
}

impl Deref for DevicePlacement<'_> {
    type Target = PpoTransition;

    fn deref(&self) -> &PpoTransition {
        self.transition
    }
}

impl DerefMut for DevicePlacement<'_> {
    fn deref_mut(&mut self) -> &mut PpoTransition {
        self.transition
    }
}

impl Drop for DevicePlacement<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.transition.move_to(&self.home) {
                error!("Failed to restore a transition to {:?}: {}", self.home, e);
            }
        }
    }
}

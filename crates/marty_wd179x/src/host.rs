/*
    MartyPC
    https://github.com/dbalsom/martypc

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    host.rs

    Defines the capabilities the controller needs from the machine hosting it:
    the vectored interrupt lines and a timer for index pulses.
*/

//! The controller never reaches into machine state directly. Interrupt lines and deferred
//! index pulses go through an [FdcHost], which the controller owns.

pub const MAX_VECTORS: usize = 32;

pub trait FdcHost {
    /// Assert the interrupt line for `vector`. Raises from other devices must be preserved.
    fn raise_interrupt(&mut self, vector: u8);
    /// Deassert the interrupt line for `vector` only.
    fn clear_interrupt(&mut self, vector: u8);
    /// Request a single index pulse callback after the given number of scheduler ticks.
    /// A new request replaces any pending one.
    fn schedule_index_pulse(&mut self, after_ticks: u32);
    /// Drop a pending index pulse request, if any.
    fn cancel_index_pulse(&mut self) {}
    /// Advance host time by `ticks`. Returns true if a scheduled index pulse has come due.
    fn index_pulse_due(&mut self, _ticks: u32) -> bool {
        false
    }
}

/// A host with no interrupt controller and no timer.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullHost;

impl FdcHost for NullHost {
    fn raise_interrupt(&mut self, _vector: u8) {}
    fn clear_interrupt(&mut self, _vector: u8) {}
    fn schedule_index_pulse(&mut self, _after_ticks: u32) {}
}

/// A vectored interrupt bus shared between devices: a bitmask of asserted vectors plus the
/// byte each vector places on the data bus during acknowledge. Also keeps the countdown for
/// one pending index pulse.
#[derive(Clone, Debug)]
pub struct VectorBus {
    vector_interrupt: u32,
    data_bus: [u8; MAX_VECTORS],
    pending_pulse: Option<u32>,
}

impl Default for VectorBus {
    fn default() -> Self {
        Self {
            vector_interrupt: 0,
            data_bus: [0; MAX_VECTORS],
            pending_pulse: None,
        }
    }
}

impl VectorBus {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn vector_mask(&self) -> u32 {
        self.vector_interrupt
    }

    pub fn is_raised(&self, vector: u8) -> bool {
        1u32.checked_shl(vector as u32)
            .map_or(false, |bit| self.vector_interrupt & bit != 0)
    }

    pub fn data_bus(&self, vector: u8) -> u8 {
        self.data_bus.get(vector as usize).copied().unwrap_or(0)
    }

    pub fn pending_index_pulse(&self) -> Option<u32> {
        self.pending_pulse
    }
}

impl FdcHost for VectorBus {
    fn raise_interrupt(&mut self, vector: u8) {
        match 1u32.checked_shl(vector as u32) {
            Some(bit) => {
                self.vector_interrupt |= bit;
                self.data_bus[vector as usize] = vector.wrapping_mul(2);
            }
            None => log::warn!("VectorBus: interrupt vector {} out of range", vector),
        }
    }

    fn clear_interrupt(&mut self, vector: u8) {
        if let Some(bit) = 1u32.checked_shl(vector as u32) {
            self.vector_interrupt &= !bit;
        }
    }

    fn schedule_index_pulse(&mut self, after_ticks: u32) {
        self.pending_pulse = Some(after_ticks);
    }

    fn cancel_index_pulse(&mut self) {
        self.pending_pulse = None;
    }

    fn index_pulse_due(&mut self, ticks: u32) -> bool {
        match self.pending_pulse {
            Some(remaining) if remaining <= ticks => {
                self.pending_pulse = None;
                true
            }
            Some(remaining) => {
                self.pending_pulse = Some(remaining - ticks);
                false
            }
            None => false,
        }
    }
}

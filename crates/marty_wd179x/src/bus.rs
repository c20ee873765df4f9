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

    bus.rs

    Defines the port interface a host bus uses to reach the controller.
*/

pub const NO_IO_BYTE: u8 = 0xFF; // This is the byte read from an unconnected IO address.

/// Time elapsed on the host since the device was last accessed.
#[derive(Copy, Clone, Debug)]
pub enum DeviceRunTimeUnit {
    SystemTicks(u32),
    Microseconds(f64),
}

impl DeviceRunTimeUnit {
    /// Convert to scheduler ticks (291 ticks per 100us).
    pub fn to_ticks(&self) -> u32 {
        match *self {
            DeviceRunTimeUnit::SystemTicks(ticks) => ticks,
            DeviceRunTimeUnit::Microseconds(us) => {
                let ticks = us * crate::device_types::fdc::SIM_100US as f64 / 100.0;
                if ticks.is_finite() && ticks > 0.0 {
                    ticks.min(u32::MAX as f64) as u32
                }
                else {
                    0
                }
            }
        }
    }
}

pub trait IoDevice {
    /// Read a byte from the specified port, given a delta time that may be used to 'catch up'
    /// the device state. The default implementation returns NO_IO_BYTE (0xFF).
    fn read_u8(&mut self, _port: u16, _delta: DeviceRunTimeUnit) -> u8 {
        NO_IO_BYTE
    }

    /// Write a byte to the specified port, given a delta time that may be used to 'catch up'
    /// the device state. The default implementation does nothing.
    fn write_u8(&mut self, _port: u16, _data: u8, _delta: DeviceRunTimeUnit) {}

    /// Return a list of ports the device should service, comprised of a vector of tuples of
    /// (port description, port number).
    fn port_list(&self) -> Vec<(String, u16)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_time_unit_to_ticks() {
        assert_eq!(DeviceRunTimeUnit::SystemTicks(42).to_ticks(), 42);
        assert_eq!(DeviceRunTimeUnit::Microseconds(100.0).to_ticks(), 291);
        assert_eq!(DeviceRunTimeUnit::Microseconds(-5.0).to_ticks(), 0);
    }
}

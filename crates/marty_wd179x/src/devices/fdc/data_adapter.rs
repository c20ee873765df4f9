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

    devices::fdc::data_adapter.rs

    The sector transfer buffer between the Data register and a sector store.
*/

//! The DataAdapter holds one sector's worth of data and the cursor the host drains or fills
//! one byte per Data register access. The optional [ExternalFifo] models boards that move whole
//! sectors through a separate buffer instead of byte-stepping the Data register.

use crate::{device_types::fdc::MAX_SECTOR_LEN, error::Wd179xError};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TransferState {
    #[default]
    Idle,
    Reading,
    ReadingAddress,
    Writing,
    WritingTrack,
}

pub struct DataAdapter {
    pub state: TransferState,
    pub multiple: bool,
    pub data: Vec<u8>,
    pub data_cursor: usize,
    pub data_count: usize,
}

impl Default for DataAdapter {
    fn default() -> Self {
        Self {
            state: TransferState::Idle,
            multiple: false,
            data: vec![0; MAX_SECTOR_LEN],
            data_cursor: 0,
            data_count: 0,
        }
    }
}

impl DataAdapter {
    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn is_reading(&self) -> bool {
        matches!(self.state, TransferState::Reading | TransferState::ReadingAddress)
    }

    /// Drop any transfer in progress. The buffer contents are left in place.
    pub fn reset(&mut self) {
        self.state = TransferState::Idle;
        self.data_cursor = 0;
        self.data_count = 0;
    }

    pub fn begin_read(&mut self, count: usize) {
        self.state = TransferState::Reading;
        self.data_count = count.min(MAX_SECTOR_LEN);
        self.data_cursor = 0;
    }

    pub fn begin_read_address(&mut self, id_field: &[u8]) {
        let len = id_field.len().min(MAX_SECTOR_LEN);
        self.data[..len].copy_from_slice(&id_field[..len]);
        self.state = TransferState::ReadingAddress;
        self.data_count = len;
        self.data_cursor = 0;
    }

    pub fn begin_write(&mut self, count: usize) {
        self.state = TransferState::Writing;
        self.data_count = count.min(MAX_SECTOR_LEN);
        self.data_cursor = 0;
    }

    pub fn begin_write_track(&mut self) {
        self.state = TransferState::WritingTrack;
        self.data_count = 0;
        self.data_cursor = 0;
    }

    /// Return the next byte of a read transfer, or None if no read data remains.
    pub fn next_byte(&mut self) -> Option<u8> {
        if !self.is_reading() || self.data_cursor >= self.data_count {
            return None;
        }
        let byte = self.data[self.data_cursor];
        self.data_cursor += 1;
        Some(byte)
    }

    /// Store a byte of a sector write. Returns true when the sector is complete.
    pub fn put_byte(&mut self, byte: u8) -> bool {
        if self.state != TransferState::Writing || self.data_cursor >= self.data_count {
            return false;
        }
        self.data[self.data_cursor] = byte;
        self.data_cursor += 1;
        self.data_cursor == self.data_count
    }

    pub fn is_complete(&self) -> bool {
        self.data_cursor == self.data_count
    }

    /// The active portion of the buffer.
    pub fn buffer(&self) -> &[u8] {
        &self.data[..self.data_count]
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.data_count]
    }
}

/// A power-of-two ring buffer shared with the host board. Each sector transfer advances the
/// index by the sector length, wrapping at the end.
#[derive(Clone, Debug)]
pub struct ExternalFifo {
    data:  Vec<u8>,
    index: usize,
}

impl ExternalFifo {
    pub fn new(len: usize) -> Result<Self, Wd179xError> {
        if !len.is_power_of_two() {
            return Err(Wd179xError::InvalidFifoLength(len));
        }
        Ok(Self {
            data:  vec![0; len],
            index: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copy a sector into the FIFO at the current index.
    pub fn push(&mut self, bytes: &[u8]) {
        let mask = self.data.len() - 1;
        for (i, byte) in bytes.iter().enumerate() {
            self.data[(self.index + i) & mask] = *byte;
        }
        self.index = (self.index + bytes.len()) & mask;
    }

    /// Fill `out` from the FIFO at the current index.
    pub fn pull(&mut self, out: &mut [u8]) {
        let mask = self.data.len() - 1;
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.data[(self.index + i) & mask];
        }
        self.index = (self.index + out.len()) & mask;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_read_drains_in_order() {
        let mut adapter = DataAdapter::default();
        adapter.data[..4].copy_from_slice(&[1, 2, 3, 4]);
        adapter.begin_read(4);
        let bytes: Vec<u8> = std::iter::from_fn(|| adapter.next_byte()).collect();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
        assert!(adapter.is_complete());
        assert_eq!(adapter.next_byte(), None);
    }

    #[test]
    fn adapter_write_reports_completion() {
        let mut adapter = DataAdapter::default();
        adapter.begin_write(3);
        assert!(!adapter.put_byte(0xAA));
        assert!(!adapter.put_byte(0xBB));
        assert!(adapter.put_byte(0xCC));
        assert!(!adapter.put_byte(0xDD));
        assert_eq!(adapter.buffer(), &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn adapter_idle_ignores_traffic() {
        let mut adapter = DataAdapter::default();
        assert_eq!(adapter.next_byte(), None);
        assert!(!adapter.put_byte(1));
        adapter.begin_write_track();
        assert!(!adapter.put_byte(1));
    }

    #[test]
    fn fifo_requires_power_of_two() {
        assert_eq!(ExternalFifo::new(1000).err(), Some(Wd179xError::InvalidFifoLength(1000)));
        assert_eq!(ExternalFifo::new(0).err(), Some(Wd179xError::InvalidFifoLength(0)));
        assert_eq!(ExternalFifo::new(256).unwrap().len(), 256);
    }

    #[test]
    fn fifo_wraps_index() {
        let mut fifo = ExternalFifo::new(256).unwrap();
        fifo.push(&[0x11; 128]);
        assert_eq!(fifo.index(), 128);
        fifo.push(&[0x22; 192]);
        assert_eq!(fifo.index(), 64);
        // The wrapped tail overwrote the start of the buffer.
        assert_eq!(fifo.as_slice()[0], 0x22);
        assert_eq!(fifo.as_slice()[64], 0x11);

        fifo.reset();
        let mut out = [0u8; 4];
        fifo.pull(&mut out);
        assert_eq!(out, [0x22; 4]);
        assert_eq!(fifo.index(), 4);
    }
}

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

    error.rs

    Error types returned by the controller and by sector stores.
*/

use crate::device_types::{chs::DiskChs, fdc::Command};
use thiserror::Error;

/// The outcome of a failed [SectorStore](crate::sector_store::SectorStore) operation.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("Sector not found")]
    NotFound,
    #[error("Image IO error: {0}")]
    Io(String),
    #[error("Image is write protected")]
    WriteProtected,
}

impl StoreError {
    /// Attach the address of the failed operation, producing a controller error.
    pub fn at(self, chs: DiskChs) -> Wd179xError {
        match self {
            StoreError::NotFound => Wd179xError::SectorNotFound(chs),
            StoreError::Io(msg) => Wd179xError::Io(msg),
            StoreError::WriteProtected => Wd179xError::WriteProtected,
        }
    }
}

/// Errors reported by [Wd179x](crate::devices::fdc::Wd179x) operations. The emulated CPU never sees
/// these directly; it observes the corresponding status bits.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Wd179xError {
    #[error("No drive is selected or no image is attached")]
    NotReady,
    #[error("Invalid drive number: {0}")]
    InvalidDrive(usize),
    #[error("Could not determine sector size (code {0:#04X})")]
    InvalidSectorSize(u8),
    #[error("Sector not found at {0}")]
    SectorNotFound(DiskChs),
    #[error("Image IO error: {0}")]
    Io(String),
    #[error("Media is write protected")]
    WriteProtected,
    #[error("Command {0:#04X} rejected while controller is busy")]
    CommandRejectedBusy(u8),
    #[error("Command {0} is not implemented")]
    UnimplementedCommand(Command),
    #[error("External FIFO length {0} is not a power of two")]
    InvalidFifoLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_maps_to_controller_error() {
        let chs = DiskChs::new(2, 0, 7);
        assert_eq!(StoreError::NotFound.at(chs), Wd179xError::SectorNotFound(chs));
        assert_eq!(StoreError::WriteProtected.at(chs), Wd179xError::WriteProtected);
        assert_eq!(
            StoreError::Io("short read".into()).at(chs),
            Wd179xError::Io("short read".into())
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            Wd179xError::CommandRejectedBusy(0x10).to_string(),
            "Command 0x10 rejected while controller is busy"
        );
        assert_eq!(
            Wd179xError::UnimplementedCommand(Command::ReadTrack).to_string(),
            "Command READ_TRACK is not implemented"
        );
    }
}

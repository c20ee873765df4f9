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

    sector_store::mod.rs

    Defines the interface between the controller and whatever holds the
    disk contents.
*/

//! A [SectorStore] serves sectors by cylinder, head and sector id. It knows the sector size and
//! recording density of each track, which the controller needs to emulate ID field matching.
//! Image file formats are out of scope; two in-memory stores are provided.

pub mod flat;
pub mod track_image;

pub use flat::FlatImage;
pub use track_image::{TrackData, TrackImage};

use std::sync::{Arc, RwLock};

use crate::{
    device_types::{chs::DiskChs, fdc::Density},
    error::StoreError,
};

/// Shared handle to an attached store. Drives hold one, the host that created the store keeps
/// another to load, save or inspect it.
pub type SectorStoreHandle = Arc<RwLock<dyn SectorStore>>;

pub trait SectorStore: Send + Sync {
    /// Read the sector at `chs` into `buf`, returning the number of bytes copied.
    fn read_sector(&mut self, chs: DiskChs, buf: &mut [u8]) -> Result<usize, StoreError>;
    /// Write `buf` to the sector at `chs`, returning the number of bytes stored.
    fn write_sector(&mut self, chs: DiskChs, buf: &[u8]) -> Result<usize, StoreError>;
    /// Replace a whole track with the sectors listed in `sector_map`, each filled with `fill`.
    fn write_track(
        &mut self,
        cylinder: u16,
        head: u8,
        fill: u8,
        sector_map: &[u8],
        sector_len_code: u8,
        density: Density,
    ) -> Result<(), StoreError>;
    /// Sector length code of the given track, or None if the track cannot be addressed.
    fn sector_size(&self, cylinder: u16, head: u8) -> Option<u8>;
    /// Whether the track was recorded in a density other than `requested`.
    fn density_mismatch(&self, cylinder: u16, head: u8, requested: Density) -> bool;
    fn heads(&self) -> u8;
    fn cylinders(&self) -> u16;
    /// Size of the stored disk contents in bytes.
    fn capacity(&self) -> usize;
    fn write_protected(&self) -> bool {
        false
    }
}

/// Wrap a store in a shareable handle.
pub fn into_handle<S: SectorStore + 'static>(store: S) -> SectorStoreHandle {
    Arc::new(RwLock::new(store))
}

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

    sector_store::flat.rs

    A raw single-sided, single-density 8" disk: 77 cylinders of 26
    sectors of 128 bytes, stored back to back.
*/

use anyhow::bail;

use crate::{
    device_types::{chs::DiskChs, fdc::Density},
    error::StoreError,
    sector_store::SectorStore,
};

pub const FLAT_CYLINDERS: u16 = 77;
pub const FLAT_SECTORS: u8 = 26;
pub const FLAT_SECTOR_LEN: usize = 128;
pub const FLAT_CAPACITY: usize = FLAT_CYLINDERS as usize * FLAT_SECTORS as usize * FLAT_SECTOR_LEN;

/// Byte used to fill a freshly created image.
pub const FLAT_BLANK_FILL: u8 = 0xE5;

/// A flat image carries no per-track metadata, so every track is reported as 128-byte
/// single density.
#[derive(Clone, Debug)]
pub struct FlatImage {
    data: Vec<u8>,
    write_protected: bool,
}

impl FlatImage {
    pub fn blank() -> Self {
        Self {
            data: vec![FLAT_BLANK_FILL; FLAT_CAPACITY],
            write_protected: false,
        }
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, anyhow::Error> {
        if data.len() != FLAT_CAPACITY {
            bail!(
                "{}-byte images are not supported, expected {} bytes",
                data.len(),
                FLAT_CAPACITY
            );
        }
        Ok(Self {
            data,
            write_protected: false,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn set_write_protected(&mut self, state: bool) {
        self.write_protected = state;
    }

    fn offset(cylinder: u16, slot: usize) -> usize {
        FLAT_SECTORS as usize * FLAT_SECTOR_LEN * cylinder as usize + slot * FLAT_SECTOR_LEN
    }

    fn sector_offset(chs: DiskChs) -> Option<usize> {
        if chs.c() >= FLAT_CYLINDERS || chs.h() != 0 || chs.s() == 0 || chs.s() > FLAT_SECTORS {
            return None;
        }
        Some(Self::offset(chs.c(), chs.s() as usize - 1))
    }
}

impl SectorStore for FlatImage {
    fn read_sector(&mut self, chs: DiskChs, buf: &mut [u8]) -> Result<usize, StoreError> {
        let offset = Self::sector_offset(chs).ok_or(StoreError::NotFound)?;
        let len = buf.len().min(FLAT_SECTOR_LEN);
        buf[..len].copy_from_slice(&self.data[offset..offset + len]);
        Ok(len)
    }

    fn write_sector(&mut self, chs: DiskChs, buf: &[u8]) -> Result<usize, StoreError> {
        if self.write_protected {
            return Err(StoreError::WriteProtected);
        }
        let offset = Self::sector_offset(chs).ok_or(StoreError::NotFound)?;
        let len = buf.len().min(FLAT_SECTOR_LEN);
        self.data[offset..offset + len].copy_from_slice(&buf[..len]);
        Ok(len)
    }

    /// Sectors are laid down in physical order regardless of the ids in `sector_map`.
    fn write_track(
        &mut self,
        cylinder: u16,
        head: u8,
        fill: u8,
        sector_map: &[u8],
        sector_len_code: u8,
        density: Density,
    ) -> Result<(), StoreError> {
        if self.write_protected {
            return Err(StoreError::WriteProtected);
        }
        if density == Density::Double || sector_len_code != 0 {
            return Err(StoreError::Io(String::from(
                "flat images hold 128-byte single density sectors only",
            )));
        }
        if cylinder >= FLAT_CYLINDERS || head != 0 {
            return Err(StoreError::NotFound);
        }
        for slot in 0..sector_map.len().min(FLAT_SECTORS as usize) {
            let offset = Self::offset(cylinder, slot);
            self.data[offset..offset + FLAT_SECTOR_LEN].fill(fill);
        }
        Ok(())
    }

    fn sector_size(&self, cylinder: u16, head: u8) -> Option<u8> {
        if cylinder < FLAT_CYLINDERS && head == 0 {
            Some(0)
        }
        else {
            None
        }
    }

    fn density_mismatch(&self, _cylinder: u16, _head: u8, requested: Density) -> bool {
        requested == Density::Double
    }

    fn heads(&self) -> u8 {
        1
    }

    fn cylinders(&self) -> u16 {
        FLAT_CYLINDERS
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn write_protected(&self) -> bool {
        self.write_protected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_layout() {
        let mut raw = vec![0u8; FLAT_CAPACITY];
        // cylinder 2, sector 3
        raw[26 * 128 * 2 + 2 * 128] = 0x42;
        let mut image = FlatImage::from_bytes(raw).unwrap();

        let mut buf = [0u8; 128];
        assert_eq!(image.read_sector(DiskChs::new(2, 0, 3), &mut buf), Ok(128));
        assert_eq!(buf[0], 0x42);
    }

    #[test]
    fn flat_image_rejects_bad_size() {
        assert!(FlatImage::from_bytes(vec![0; 1000]).is_err());
        assert_eq!(FlatImage::blank().capacity(), 256_256);
    }

    #[test]
    fn flat_image_addressing_limits() {
        let mut image = FlatImage::blank();
        let mut buf = [0u8; 128];
        assert_eq!(image.read_sector(DiskChs::new(0, 0, 0), &mut buf), Err(StoreError::NotFound));
        assert_eq!(image.read_sector(DiskChs::new(0, 0, 27), &mut buf), Err(StoreError::NotFound));
        assert_eq!(image.read_sector(DiskChs::new(77, 0, 1), &mut buf), Err(StoreError::NotFound));
        assert_eq!(image.read_sector(DiskChs::new(0, 1, 1), &mut buf), Err(StoreError::NotFound));
        assert_eq!(image.sector_size(76, 0), Some(0));
        assert_eq!(image.sector_size(77, 0), None);
    }

    #[test]
    fn flat_image_is_single_density() {
        let mut image = FlatImage::blank();
        assert!(image.density_mismatch(0, 0, Density::Double));
        assert!(!image.density_mismatch(0, 0, Density::Single));
        assert!(image.write_track(0, 0, 0, &[1], 0, Density::Double).is_err());
    }

    #[test]
    fn flat_image_write_track_fills_in_order() {
        let mut image = FlatImage::blank();
        image.write_track(1, 0, 0x00, &[5, 4, 3], 0, Density::Single).unwrap();
        let base = 26 * 128;
        assert!(image.as_bytes()[base..base + 3 * 128].iter().all(|&b| b == 0));
        assert_eq!(image.as_bytes()[base + 3 * 128], FLAT_BLANK_FILL);
    }
}

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

    sector_store::track_image.rs

    An in-memory disk made of independently formatted tracks.
*/

use crate::{
    device_types::{
        chs::DiskChs,
        fdc::{sector_len_bytes, Density},
    },
    error::StoreError,
    sector_store::SectorStore,
};

/// One formatted track. Every sector on a track shares the same size and density.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackData {
    pub density: Density,
    pub sector_len_code: u8,
    pub sectors: Vec<(u8, Vec<u8>)>,
}

impl TrackData {
    pub fn new(density: Density, sector_len_code: u8, sector_ids: &[u8], fill: u8) -> Self {
        let len = sector_len_bytes(sector_len_code);
        Self {
            density,
            sector_len_code,
            sectors: sector_ids.iter().map(|&id| (id, vec![fill; len])).collect(),
        }
    }

    pub fn sector_ids(&self) -> Vec<u8> {
        self.sectors.iter().map(|(id, _)| *id).collect()
    }

    fn sector_mut(&mut self, id: u8) -> Option<&mut Vec<u8>> {
        self.sectors.iter_mut().find(|(sid, _)| *sid == id).map(|(_, data)| data)
    }
}

#[derive(Clone, Debug)]
pub struct TrackImage {
    cylinders: u16,
    heads: u8,
    tracks: Vec<Option<TrackData>>,
    write_protected: bool,
}

impl TrackImage {
    /// Create an unformatted image.
    pub fn new(cylinders: u16, heads: u8) -> Self {
        Self {
            cylinders,
            heads,
            tracks: vec![None; cylinders as usize * heads as usize],
            write_protected: false,
        }
    }

    /// Create an image with every track formatted identically, sector ids starting at 1.
    pub fn format_uniform(
        cylinders: u16,
        heads: u8,
        density: Density,
        sector_len_code: u8,
        sectors_per_track: u8,
        fill: u8,
    ) -> Self {
        let ids: Vec<u8> = (1..=sectors_per_track).collect();
        let mut image = Self::new(cylinders, heads);
        for track in image.tracks.iter_mut() {
            *track = Some(TrackData::new(density, sector_len_code, &ids, fill));
        }
        image
    }

    /// Replace a single track. Out-of-range addresses are ignored.
    pub fn with_track(mut self, cylinder: u16, head: u8, track: TrackData) -> Self {
        if let Some(idx) = self.track_index(cylinder, head) {
            self.tracks[idx] = Some(track);
        }
        self
    }

    pub fn set_write_protected(&mut self, state: bool) {
        self.write_protected = state;
    }

    pub fn track(&self, cylinder: u16, head: u8) -> Option<&TrackData> {
        self.track_index(cylinder, head).and_then(|idx| self.tracks[idx].as_ref())
    }

    pub fn sector(&self, chs: DiskChs) -> Option<&[u8]> {
        self.track(chs.c(), chs.h())?
            .sectors
            .iter()
            .find(|(id, _)| *id == chs.s())
            .map(|(_, data)| data.as_slice())
    }

    fn track_index(&self, cylinder: u16, head: u8) -> Option<usize> {
        if cylinder < self.cylinders && head < self.heads {
            Some(cylinder as usize * self.heads as usize + head as usize)
        }
        else {
            None
        }
    }

    fn track_mut(&mut self, cylinder: u16, head: u8) -> Option<&mut TrackData> {
        let idx = self.track_index(cylinder, head)?;
        self.tracks[idx].as_mut()
    }
}

impl SectorStore for TrackImage {
    fn read_sector(&mut self, chs: DiskChs, buf: &mut [u8]) -> Result<usize, StoreError> {
        let data = self.sector(chs).ok_or(StoreError::NotFound)?;
        let len = buf.len().min(data.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write_sector(&mut self, chs: DiskChs, buf: &[u8]) -> Result<usize, StoreError> {
        if self.write_protected {
            return Err(StoreError::WriteProtected);
        }
        let data = self
            .track_mut(chs.c(), chs.h())
            .and_then(|track| track.sector_mut(chs.s()))
            .ok_or(StoreError::NotFound)?;
        let len = buf.len().min(data.len());
        data[..len].copy_from_slice(&buf[..len]);
        Ok(len)
    }

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
        let idx = self.track_index(cylinder, head).ok_or(StoreError::NotFound)?;
        self.tracks[idx] = Some(TrackData::new(density, sector_len_code, sector_map, fill));
        Ok(())
    }

    fn sector_size(&self, cylinder: u16, head: u8) -> Option<u8> {
        self.track(cylinder, head).map(|track| track.sector_len_code)
    }

    fn density_mismatch(&self, cylinder: u16, head: u8, requested: Density) -> bool {
        self.track(cylinder, head)
            .map_or(false, |track| track.density != requested)
    }

    fn heads(&self) -> u8 {
        self.heads
    }

    fn cylinders(&self) -> u16 {
        self.cylinders
    }

    fn capacity(&self) -> usize {
        self.tracks
            .iter()
            .flatten()
            .map(|track| track.sectors.iter().map(|(_, data)| data.len()).sum::<usize>())
            .sum()
    }

    fn write_protected(&self) -> bool {
        self.write_protected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_image_uniform_geometry() {
        let image = TrackImage::format_uniform(40, 2, Density::Double, 1, 16, 0xE5);
        assert_eq!(image.heads(), 2);
        assert_eq!(image.cylinders(), 40);
        assert_eq!(image.sector_size(39, 1), Some(1));
        assert_eq!(image.sector_size(40, 0), None);
        assert_eq!(image.capacity(), 40 * 2 * 16 * 256);
        assert!(image.density_mismatch(0, 0, Density::Single));
        assert!(!image.density_mismatch(0, 0, Density::Double));
    }

    #[test]
    fn track_image_read_write_sector() {
        let mut image = TrackImage::format_uniform(2, 1, Density::Single, 0, 26, 0x00);
        let payload: Vec<u8> = (0..128).map(|i| i as u8).collect();
        assert_eq!(image.write_sector(DiskChs::new(1, 0, 26), &payload), Ok(128));

        let mut buf = vec![0; 128];
        assert_eq!(image.read_sector(DiskChs::new(1, 0, 26), &mut buf), Ok(128));
        assert_eq!(buf, payload);

        assert_eq!(
            image.read_sector(DiskChs::new(1, 0, 27), &mut buf),
            Err(StoreError::NotFound)
        );
    }

    #[test]
    fn track_image_write_protect() {
        let mut image = TrackImage::format_uniform(1, 1, Density::Single, 0, 26, 0x00);
        image.set_write_protected(true);
        assert_eq!(
            image.write_sector(DiskChs::new(0, 0, 1), &[1, 2, 3]),
            Err(StoreError::WriteProtected)
        );
        assert_eq!(
            image.write_track(0, 0, 0xE5, &[1, 2], 0, Density::Single),
            Err(StoreError::WriteProtected)
        );
    }

    #[test]
    fn track_image_write_track_replaces_layout() {
        let mut image = TrackImage::new(2, 1);
        assert_eq!(image.capacity(), 0);
        image.write_track(1, 0, 0xE5, &[1, 3, 5, 2, 4], 3, Density::Double).unwrap();

        let track = image.track(1, 0).unwrap();
        assert_eq!(track.sector_ids(), vec![1, 3, 5, 2, 4]);
        assert_eq!(track.density, Density::Double);
        assert_eq!(image.sector(DiskChs::new(1, 0, 5)).unwrap(), &[0xE5; 1024][..]);
        assert_eq!(image.capacity(), 5 * 1024);
    }
}

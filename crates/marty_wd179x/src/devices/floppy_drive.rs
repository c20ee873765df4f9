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

    devices::floppy_drive.rs

    Implements a floppy drive attached to a WD179x controller
*/

use crate::{
    device_types::{
        chs::DiskChs,
        fdc::{Density, MediaSize, MAX_CYL},
    },
    error::StoreError,
    sector_store::SectorStoreHandle,
};
use anyhow::{anyhow, Error};

macro_rules! read_lock_opt {
    ($arc_lock:expr) => {{
        match $arc_lock.try_read() {
            Ok(guard) => guard,
            Err(_) => return None,
        }
    }};
}

macro_rules! write_lock {
    ($arc_lock:expr) => {{
        match $arc_lock.try_write() {
            Ok(guard) => guard,
            Err(_) => return Err(StoreError::Io(String::from("Failed to acquire write lock"))),
        }
    }};
}

/// One of the four drives a WD179x can select. The drive owns the head position; the disk
/// contents live in a [SectorStore](crate::sector_store::SectorStore) shared with the host.
pub struct FloppyDrive {
    drive_n: usize,
    track: u8,
    ready: bool,
    heads: u8,
    cylinders: u16,
    capacity: usize,
    store: Option<SectorStoreHandle>,
}

impl FloppyDrive {
    pub fn new(drive_n: usize) -> Self {
        Self {
            drive_n,
            track: 0,
            ready: false,
            heads: 0,
            cylinders: 0,
            capacity: 0,
            store: None,
        }
    }

    /// Attach a store and mark the drive ready. Any previously attached store is released.
    pub fn attach(&mut self, store: SectorStoreHandle) -> Result<(), Error> {
        let (heads, cylinders, capacity) = {
            let guard = store
                .try_read()
                .map_err(|_| anyhow!("Drive {}: failed to acquire read lock on image", self.drive_n))?;
            (guard.heads(), guard.cylinders(), guard.capacity())
        };

        log::debug!(
            "Drive {}: attached image, {} heads, {} cylinders, {} bytes",
            self.drive_n,
            heads,
            cylinders,
            capacity
        );
        self.heads = heads;
        self.cylinders = cylinders;
        self.capacity = capacity;
        self.store = Some(store);
        self.ready = true;
        Ok(())
    }

    /// Release the attached store, if any, and mark the drive not ready.
    pub fn detach(&mut self) -> Option<SectorStoreHandle> {
        log::debug!("Drive {}: detached", self.drive_n);
        self.ready = false;
        self.heads = 0;
        self.cylinders = 0;
        self.capacity = 0;
        self.store.take()
    }

    pub fn is_attached(&self) -> bool {
        self.store.is_some()
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn track(&self) -> u8 {
        self.track
    }

    pub fn set_track(&mut self, track: u8) {
        self.track = track;
    }

    pub fn heads(&self) -> u8 {
        self.heads
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn media_size(&self) -> MediaSize {
        MediaSize::from_cylinders(self.cylinders)
    }

    pub fn refresh_capacity(&mut self) {
        if let Some(capacity) = self.store_capacity() {
            self.capacity = capacity;
        }
    }

    fn store_capacity(&self) -> Option<usize> {
        let store = self.store.as_ref()?;
        let guard = read_lock_opt!(store);
        Some(guard.capacity())
    }

    pub fn write_protected(&self) -> bool {
        self.store.as_ref().map_or(false, |store| {
            store.try_read().map_or(false, |guard| guard.write_protected())
        })
    }

    /// Return the raw sector length code of the current track on `head`, or None if it cannot
    /// be determined.
    pub fn sector_size(&self, head: u8) -> Option<u8> {
        if self.track >= MAX_CYL {
            return None;
        }
        let store = self.store.as_ref()?;
        let guard = read_lock_opt!(store);
        guard.sector_size(self.track as u16, head)
    }

    pub fn density_mismatch(&self, head: u8, density: Density) -> bool {
        if self.track >= MAX_CYL {
            return false;
        }
        self.store.as_ref().map_or(false, |store| {
            store
                .try_read()
                .map_or(false, |guard| guard.density_mismatch(self.track as u16, head, density))
        })
    }

    pub fn read_sector(&self, chs: DiskChs, buf: &mut [u8]) -> Result<usize, StoreError> {
        let store = self.store.as_ref().ok_or(StoreError::NotFound)?;
        let mut guard = write_lock!(store);
        guard.read_sector(chs, buf)
    }

    pub fn write_sector(&self, chs: DiskChs, buf: &[u8]) -> Result<usize, StoreError> {
        let store = self.store.as_ref().ok_or(StoreError::NotFound)?;
        let mut guard = write_lock!(store);
        guard.write_sector(chs, buf)
    }

    pub fn write_track(
        &self,
        head: u8,
        fill: u8,
        sector_map: &[u8],
        sector_len_code: u8,
        density: Density,
    ) -> Result<(), StoreError> {
        let store = self.store.as_ref().ok_or(StoreError::NotFound)?;
        let mut guard = write_lock!(store);
        guard.write_track(self.track as u16, head, fill, sector_map, sector_len_code, density)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sector_store::{into_handle, FlatImage, TrackImage};

    #[test]
    fn drive_attach_detach() {
        let mut drive = FloppyDrive::new(0);
        assert!(!drive.ready());
        drive.attach(into_handle(TrackImage::format_uniform(40, 2, Density::Double, 1, 16, 0))).unwrap();
        assert!(drive.ready());
        assert_eq!(drive.heads(), 2);
        assert_eq!(drive.media_size(), MediaSize::FiveQuarterInch);

        assert!(drive.detach().is_some());
        assert!(!drive.ready());
        assert!(!drive.is_attached());
        assert_eq!(drive.sector_size(0), None);
    }

    #[test]
    fn drive_sector_size_limited_by_max_cyl() {
        let mut drive = FloppyDrive::new(1);
        drive.attach(into_handle(TrackImage::format_uniform(90, 1, Density::Single, 0, 26, 0))).unwrap();
        drive.set_track(83);
        assert_eq!(drive.sector_size(0), Some(0));
        drive.set_track(MAX_CYL);
        assert_eq!(drive.sector_size(0), None);
    }

    #[test]
    fn drive_flat_image_is_eight_inch() {
        let mut drive = FloppyDrive::new(0);
        drive.attach(into_handle(FlatImage::blank())).unwrap();
        assert_eq!(drive.media_size(), MediaSize::EightInch);
        assert_eq!(drive.capacity(), 256_256);
    }

    #[test]
    fn drive_lock_contention_is_an_io_error() {
        let store = into_handle(FlatImage::blank());
        let mut drive = FloppyDrive::new(0);
        drive.attach(store.clone()).unwrap();

        let _held = store.write().unwrap();
        let mut buf = [0u8; 128];
        assert!(matches!(
            drive.read_sector(DiskChs::new(0, 0, 1), &mut buf),
            Err(StoreError::Io(_))
        ));
        assert_eq!(drive.sector_size(0), None);
    }
}

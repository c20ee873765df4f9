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

    devices::fdc::format.rs

    Parses the byte stream written to the Data register during a WRITE_TRACK
    command into a sector map.
*/

use crate::device_types::fdc::{sector_code_from_len, MAX_SECTORS_PER_TRACK, MAX_SECTOR_LEN};

pub const INDEX_MARK: u8 = 0xFC;
pub const ID_ADDRESS_MARK: u8 = 0xFE;
pub const DATA_ADDRESS_MARK: u8 = 0xFB;
pub const CRC_MARK: u8 = 0xF7;
pub const HEADER_LEN: usize = 5;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FormatState {
    #[default]
    Idle,
    Gap1,
    Gap2,
    Header,
    Gap3,
    Data,
}

/// What the controller must do in response to a byte fed to the formatter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FormatStep {
    Continue,
    /// ID field byte 0: the drive's track.
    Track(u8),
    /// ID field byte 1: the selected head.
    Head(u8),
    /// ID field byte 2: the sector register.
    Sector(u8),
    /// A sector's data field ended. `sectors` is the number of sectors in the map so far.
    SectorDone { sector_len_code: u8, sectors: usize },
}

#[derive(Clone, Debug, Default)]
pub struct TrackFormatter {
    state: FormatState,
    header_index: usize,
    sector_id: u8,
    data_len: usize,
    gaps: [u16; 3],
    sector_map: Vec<u8>,
}

impl TrackFormatter {
    pub fn new() -> Self {
        Self {
            sector_map: Vec::with_capacity(MAX_SECTORS_PER_TRACK),
            ..Default::default()
        }
    }

    /// Arm for a new track.
    pub fn begin(&mut self) {
        self.state = FormatState::Gap1;
        self.header_index = 0;
        self.data_len = 0;
        self.gaps = [0; 3];
        self.sector_map.clear();
    }

    /// Return to idle. The sector map and gap lengths are kept for inspection.
    pub fn reset(&mut self) {
        self.state = FormatState::Idle;
    }

    pub fn state(&self) -> FormatState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != FormatState::Idle
    }

    pub fn sector_map(&self) -> &[u8] {
        &self.sector_map
    }

    /// Lengths of Gap I, II and III as last counted.
    pub fn gaps(&self) -> [u16; 3] {
        self.gaps
    }

    /// Consume one byte. Data field bytes are collected into `buf` starting at offset 0.
    pub fn feed(&mut self, byte: u8, buf: &mut [u8]) -> FormatStep {
        match self.state {
            FormatState::Idle => FormatStep::Continue,
            FormatState::Gap1 => {
                if byte == INDEX_MARK {
                    log::trace!("FORMAT: Gap I length: {}", self.gaps[0]);
                    self.gaps[1] = 0;
                    self.state = FormatState::Gap2;
                }
                else {
                    self.gaps[0] = self.gaps[0].saturating_add(1);
                }
                FormatStep::Continue
            }
            FormatState::Gap2 => {
                if byte == ID_ADDRESS_MARK {
                    log::trace!("FORMAT: Gap II length: {}", self.gaps[1]);
                    self.gaps[2] = 0;
                    self.header_index = 0;
                    self.state = FormatState::Header;
                }
                else {
                    self.gaps[1] = self.gaps[1].saturating_add(1);
                }
                FormatStep::Continue
            }
            FormatState::Header => {
                let index = self.header_index;
                log::trace!("FORMAT: HEADER[{}]={:02X}", index, byte);
                self.header_index += 1;
                if self.header_index == HEADER_LEN {
                    self.state = FormatState::Gap3;
                }
                match index {
                    0 => FormatStep::Track(byte),
                    1 => FormatStep::Head(byte),
                    2 => {
                        self.sector_id = byte;
                        FormatStep::Sector(byte)
                    }
                    // The length code is taken from the data field; byte 4 is the CRC mark.
                    _ => FormatStep::Continue,
                }
            }
            FormatState::Gap3 => {
                if byte == DATA_ADDRESS_MARK {
                    log::trace!("FORMAT: Gap III length: {}", self.gaps[2]);
                    self.data_len = 0;
                    self.state = FormatState::Data;
                }
                else {
                    self.gaps[2] = self.gaps[2].saturating_add(1);
                }
                FormatStep::Continue
            }
            FormatState::Data => {
                if byte != CRC_MARK {
                    match buf.get_mut(self.data_len) {
                        Some(slot) if self.data_len < MAX_SECTOR_LEN => {
                            *slot = byte;
                            self.data_len += 1;
                        }
                        _ => log::warn!("FORMAT: data field exceeds {} bytes, byte dropped", MAX_SECTOR_LEN),
                    }
                    return FormatStep::Continue;
                }
                self.end_sector()
            }
        }
    }

    fn end_sector(&mut self) -> FormatStep {
        let sector_len_code = match sector_code_from_len(self.data_len) {
            Some(code) => code,
            None => {
                log::error!("FORMAT: invalid sector size: {} bytes", self.data_len);
                0
            }
        };

        if self.sector_map.len() >= MAX_SECTORS_PER_TRACK {
            log::error!("FORMAT: illegal sector count, sector map reset");
            self.sector_map.clear();
        }
        self.sector_map.push(self.sector_id);

        log::trace!(
            "FORMAT: sector {} id {} length {} (N={})",
            self.sector_map.len(),
            self.sector_id,
            self.data_len,
            sector_len_code
        );

        self.gaps[1] = 0;
        self.state = FormatState::Gap2;
        FormatStep::SectorDone {
            sector_len_code,
            sectors: self.sector_map.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(fmt: &mut TrackFormatter, bytes: &[u8], buf: &mut [u8]) -> Vec<FormatStep> {
        bytes
            .iter()
            .map(|&b| fmt.feed(b, buf))
            .filter(|step| *step != FormatStep::Continue)
            .collect()
    }

    fn sector_stream(track: u8, head: u8, id: u8, data: &[u8]) -> Vec<u8> {
        let mut v = vec![0x4E; 11];
        v.push(ID_ADDRESS_MARK);
        v.extend_from_slice(&[track, head, id, 0x00, CRC_MARK]);
        v.extend_from_slice(&[0x4E; 6]);
        v.push(DATA_ADDRESS_MARK);
        v.extend_from_slice(data);
        v.push(CRC_MARK);
        v
    }

    #[test]
    fn formatter_idle_ignores_bytes() {
        let mut fmt = TrackFormatter::new();
        let mut buf = vec![0; MAX_SECTOR_LEN];
        assert_eq!(fmt.feed(INDEX_MARK, &mut buf), FormatStep::Continue);
        assert_eq!(fmt.state(), FormatState::Idle);
    }

    #[test]
    fn formatter_parses_one_sector() {
        let mut fmt = TrackFormatter::new();
        let mut buf = vec![0; MAX_SECTOR_LEN];
        fmt.begin();

        let mut stream = vec![0xFF; 40];
        stream.push(INDEX_MARK);
        stream.extend(sector_stream(7, 1, 3, &[0xE5; 256]));

        let steps = feed_all(&mut fmt, &stream, &mut buf);
        assert_eq!(
            steps,
            vec![
                FormatStep::Track(7),
                FormatStep::Head(1),
                FormatStep::Sector(3),
                FormatStep::SectorDone {
                    sector_len_code: 1,
                    sectors: 1
                },
            ]
        );
        assert_eq!(fmt.sector_map(), &[3]);
        assert_eq!(fmt.gaps(), [40, 0, 6]);
        assert_eq!(fmt.state(), FormatState::Gap2);
        assert_eq!(buf[255], 0xE5);
    }

    #[test]
    fn formatter_bad_length_is_tolerated() {
        let mut fmt = TrackFormatter::new();
        let mut buf = vec![0; MAX_SECTOR_LEN];
        fmt.begin();
        fmt.feed(INDEX_MARK, &mut buf);

        let steps = feed_all(&mut fmt, &sector_stream(0, 0, 1, &[0; 100]), &mut buf);
        assert_eq!(
            steps.last(),
            Some(&FormatStep::SectorDone {
                sector_len_code: 0,
                sectors: 1
            })
        );
        assert_eq!(fmt.state(), FormatState::Gap2);
    }

    #[test]
    fn formatter_sector_map_overflow_resets() {
        let mut fmt = TrackFormatter::new();
        let mut buf = vec![0; MAX_SECTOR_LEN];
        fmt.begin();
        fmt.feed(INDEX_MARK, &mut buf);

        for id in 1..=MAX_SECTORS_PER_TRACK as u8 {
            feed_all(&mut fmt, &sector_stream(0, 0, id, &[0; 128]), &mut buf);
        }
        assert_eq!(fmt.sector_map().len(), MAX_SECTORS_PER_TRACK);

        let steps = feed_all(&mut fmt, &sector_stream(0, 0, 99, &[0; 128]), &mut buf);
        assert_eq!(
            steps.last(),
            Some(&FormatStep::SectorDone {
                sector_len_code: 0,
                sectors: 1
            })
        );
        assert_eq!(fmt.sector_map(), &[99]);
    }

    #[test]
    fn formatter_begin_clears_previous_track() {
        let mut fmt = TrackFormatter::new();
        let mut buf = vec![0; MAX_SECTOR_LEN];
        fmt.begin();
        fmt.feed(INDEX_MARK, &mut buf);
        feed_all(&mut fmt, &sector_stream(0, 0, 1, &[0; 128]), &mut buf);
        fmt.reset();
        assert!(!fmt.is_active());
        assert_eq!(fmt.sector_map(), &[1]);

        fmt.begin();
        assert_eq!(fmt.state(), FormatState::Gap1);
        assert!(fmt.sector_map().is_empty());
    }
}

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

    device_types::fdc.rs

    Defines constants, command encodings and register layouts for the
    Western Digital WD179x family of floppy disk controllers.
*/

use std::fmt::{self, Display};

use modular_bitfield::{bitfield, prelude::*};
use strum_macros::EnumIter;

pub const WD179X_MAX_DRIVES: usize = 4;

/// Highest cylinder count the controller will address. Tracks at or beyond this have no
/// discoverable sector size.
pub const MAX_CYL: u8 = 84;
pub const MAX_SECTOR_CODE: u8 = 6;
pub const MAX_SECTOR_LEN: usize = 128 << MAX_SECTOR_CODE as usize;
/// Capacity of the sector map built while formatting a track.
pub const MAX_SECTORS_PER_TRACK: usize = 26;
/// Sector length code reported when the size of a track's sectors cannot be determined.
pub const SECTOR_SIZE_UNKNOWN: u8 = 0xF8;

pub const READ_ADDR_LEN: usize = 6;
pub const ID_CRC_PLACEHOLDER: [u8; 2] = [0xAA, 0x55];

// Index pulse timing. The host scheduler runs at 291 ticks per 100us.
pub const SIM_100US: u32 = 291;
pub const ROTATION_8IN: u32 = 167 * SIM_100US;
pub const ROTATION_5IN: u32 = 200 * SIM_100US;

// Register offsets, selected by the low two address bits.
pub const WD179X_PORT_MASK: u16 = 0x03;
pub const WD179X_STATUS: u16 = 0x00;
pub const WD179X_TRACK: u16 = 0x01;
pub const WD179X_SECTOR: u16 = 0x02;
pub const WD179X_DATA: u16 = 0x03;

pub const DEFAULT_IO_BASE: u16 = 0x30;

// Command opcodes (high nibble)
pub const CMD_RESTORE: u8 = 0x00;
pub const CMD_SEEK: u8 = 0x10;
pub const CMD_STEP: u8 = 0x20;
pub const CMD_STEP_U: u8 = 0x30;
pub const CMD_STEP_IN: u8 = 0x40;
pub const CMD_STEP_IN_U: u8 = 0x50;
pub const CMD_STEP_OUT: u8 = 0x60;
pub const CMD_STEP_OUT_U: u8 = 0x70;
pub const CMD_READ_REC: u8 = 0x80;
pub const CMD_READ_RECS: u8 = 0x90;
pub const CMD_WRITE_REC: u8 = 0xA0;
pub const CMD_WRITE_RECS: u8 = 0xB0;
pub const CMD_READ_ADDR: u8 = 0xC0;
pub const CMD_FORCE_INTR: u8 = 0xD0;
pub const CMD_READ_TRACK: u8 = 0xE0;
pub const CMD_WRITE_TRACK: u8 = 0xF0;
pub const CMD_OPCODE_MASK: u8 = 0xF0;

// Status Register Bit Definitions
// --------------------------------------------------------------------------------
// Bits 0, 7 and 6 keep their meaning for every command type. The remaining bits are
// reinterpreted depending on whether the last command was Type I/IV or Type II/III.
pub const STAT_BUSY: u8 = 0b0000_0001;
pub const STAT_INDEX: u8 = 0b0000_0010; // Type I
pub const STAT_DRQ: u8 = 0b0000_0010; // Type II/III
pub const STAT_TRACK0: u8 = 0b0000_0100; // Type I
pub const STAT_LOST_DATA: u8 = 0b0000_0100; // Type II/III
pub const STAT_CRC_ERROR: u8 = 0b0000_1000;
pub const STAT_SEEK_ERROR: u8 = 0b0001_0000; // Type I
pub const STAT_NOT_FOUND: u8 = 0b0001_0000; // Type II/III
pub const STAT_HEAD_LOADED: u8 = 0b0010_0000; // Type I
pub const STAT_RECORD_TYPE: u8 = 0b0010_0000; // Type II/III
pub const STAT_WRITE_PROTECT: u8 = 0b0100_0000;
pub const STAT_NOT_READY: u8 = 0b1000_0000;

/// Maximum sectors per track, indexed by [density][sector length code].
pub const SECTORS_PER_TRACK: [[u8; 7]; 2] = [
    // 128, 256, 512, 1024, 2048, 4096, 8192
    [26, 15, 8, 4, 2, 1, 0], // Single density
    [26, 26, 15, 8, 4, 2, 1], // Double density
];

/// Return the size in bytes of a sector with the given length code. Codes above 6 are clamped.
pub fn sector_len_bytes(code: u8) -> usize {
    128 << code.min(MAX_SECTOR_CODE) as usize
}

/// Return the sector length code for a byte count, if the count is exactly one of the
/// sizes the controller can format (128 through 8192 bytes).
pub fn sector_code_from_len(len: usize) -> Option<u8> {
    if len < 128 || len > MAX_SECTOR_LEN || !len.is_power_of_two() {
        return None;
    }
    Some((len.trailing_zeros() - 7) as u8)
}

/// Return the number of sectors a complete track holds for the given density and length code.
pub fn max_sectors_per_track(density: Density, code: u8) -> u8 {
    SECTORS_PER_TRACK[density.table_index()][code.min(MAX_SECTOR_CODE) as usize]
}

/// Recording density. The controller's DDEN input is driven by the host board.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Density {
    #[default]
    Single,
    Double,
}

impl Density {
    pub fn table_index(&self) -> usize {
        match self {
            Density::Single => 0,
            Density::Double => 1,
        }
    }
}

impl From<bool> for Density {
    fn from(double: bool) -> Self {
        if double {
            Density::Double
        }
        else {
            Density::Single
        }
    }
}

impl Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Density::Single => write!(f, "SD"),
            Density::Double => write!(f, "DD"),
        }
    }
}

/// Physical media size. Selects the simulated rotation period used for index pulses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MediaSize {
    #[default]
    EightInch,
    FiveQuarterInch,
}

impl MediaSize {
    /// 8" media is recognized by a cylinder count that is a multiple of 77.
    pub fn from_cylinders(cylinders: u16) -> Self {
        if cylinders % 77 == 0 {
            MediaSize::EightInch
        }
        else {
            MediaSize::FiveQuarterInch
        }
    }

    pub fn rotation_ticks(&self) -> u32 {
        match self {
            MediaSize::EightInch => ROTATION_8IN,
            MediaSize::FiveQuarterInch => ROTATION_5IN,
        }
    }
}

/// The command class of the last accepted command. Determines how the status register is
/// presented and what post-processing a command receives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CommandType {
    #[default]
    None,
    TypeI,
    TypeII,
    TypeIII,
    TypeIV,
}

impl CommandType {
    /// Whether status reads present the Type I view (INDEX/TRACK0/SEEK_ERROR/HLD).
    pub fn is_type_i_view(&self) -> bool {
        matches!(self, CommandType::None | CommandType::TypeI | CommandType::TypeIV)
    }
}

/// Represent the commands the WD179x decodes from the high nibble of a command byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum Command {
    Restore,
    Seek,
    Step,
    StepUpdate,
    StepIn,
    StepInUpdate,
    StepOut,
    StepOutUpdate,
    ReadRecord,
    ReadRecords,
    WriteRecord,
    WriteRecords,
    ReadAddress,
    ForceInterrupt,
    ReadTrack,
    WriteTrack,
}

impl Command {
    pub fn from_byte(byte: u8) -> Command {
        match byte & CMD_OPCODE_MASK {
            CMD_RESTORE => Command::Restore,
            CMD_SEEK => Command::Seek,
            CMD_STEP => Command::Step,
            CMD_STEP_U => Command::StepUpdate,
            CMD_STEP_IN => Command::StepIn,
            CMD_STEP_IN_U => Command::StepInUpdate,
            CMD_STEP_OUT => Command::StepOut,
            CMD_STEP_OUT_U => Command::StepOutUpdate,
            CMD_READ_REC => Command::ReadRecord,
            CMD_READ_RECS => Command::ReadRecords,
            CMD_WRITE_REC => Command::WriteRecord,
            CMD_WRITE_RECS => Command::WriteRecords,
            CMD_READ_ADDR => Command::ReadAddress,
            CMD_FORCE_INTR => Command::ForceInterrupt,
            CMD_READ_TRACK => Command::ReadTrack,
            _ => Command::WriteTrack,
        }
    }

    pub fn opcode(&self) -> u8 {
        match self {
            Command::Restore => CMD_RESTORE,
            Command::Seek => CMD_SEEK,
            Command::Step => CMD_STEP,
            Command::StepUpdate => CMD_STEP_U,
            Command::StepIn => CMD_STEP_IN,
            Command::StepInUpdate => CMD_STEP_IN_U,
            Command::StepOut => CMD_STEP_OUT,
            Command::StepOutUpdate => CMD_STEP_OUT_U,
            Command::ReadRecord => CMD_READ_REC,
            Command::ReadRecords => CMD_READ_RECS,
            Command::WriteRecord => CMD_WRITE_REC,
            Command::WriteRecords => CMD_WRITE_RECS,
            Command::ReadAddress => CMD_READ_ADDR,
            Command::ForceInterrupt => CMD_FORCE_INTR,
            Command::ReadTrack => CMD_READ_TRACK,
            Command::WriteTrack => CMD_WRITE_TRACK,
        }
    }

    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Restore
            | Command::Seek
            | Command::Step
            | Command::StepUpdate
            | Command::StepIn
            | Command::StepInUpdate
            | Command::StepOut
            | Command::StepOutUpdate => CommandType::TypeI,
            Command::ReadRecord | Command::ReadRecords | Command::WriteRecord | Command::WriteRecords => {
                CommandType::TypeII
            }
            Command::ReadAddress | Command::ReadTrack | Command::WriteTrack => CommandType::TypeIII,
            Command::ForceInterrupt => CommandType::TypeIV,
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Restore => "RESTORE",
            Command::Seek => "SEEK",
            Command::Step => "STEP",
            Command::StepUpdate => "STEP_U",
            Command::StepIn => "STEP_IN",
            Command::StepInUpdate => "STEP_IN_U",
            Command::StepOut => "STEP_OUT",
            Command::StepOutUpdate => "STEP_OUT_U",
            Command::ReadRecord => "READ_REC",
            Command::ReadRecords => "READ_RECS",
            Command::WriteRecord => "WRITE_REC",
            Command::WriteRecords => "WRITE_RECS",
            Command::ReadAddress => "READ_ADDR",
            Command::ForceInterrupt => "FORCE_INTR",
            Command::ReadTrack => "READ_TRACK",
            Command::WriteTrack => "WRITE_TRACK",
        };
        write!(f, "{}", name)
    }
}

/// Low nibble of a Type I command byte.
#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct TypeICommandByte {
    pub step_rate: B1,
    pub side:      bool, // 1795/1797 side select output
    pub verify:    bool,
    pub head_load: bool,
    pub opcode:    B4,
}

#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct TypeIICommandByte {
    pub a0:           bool,
    pub side:         bool, // 1795/1797 side select output
    pub delay:        bool,
    pub side_compare: bool,
    pub multiple:     bool,
    pub opcode:       B3,
}

#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct ForceIntrCommandByte {
    pub not_ready_to_ready: bool,
    pub ready_to_not_ready: bool,
    pub index_pulse:        bool,
    pub immediate:          bool,
    pub opcode:             B4,
}

impl ForceIntrCommandByte {
    /// I0-I3 all clear: terminate without interrupt.
    pub fn is_terminate_only(&self) -> bool {
        self.into_bytes()[0] & 0x0F == 0
    }
}

/// The status register as presented after a Type I (or Type IV) command.
#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct TypeIStatus {
    pub busy:          bool,
    pub index:         bool,
    pub track0:        bool,
    pub crc_error:     bool,
    pub seek_error:    bool,
    pub head_loaded:   bool,
    pub write_protect: bool,
    pub not_ready:     bool,
}

/// The status register as presented after a Type II or Type III command.
#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct TypeIIStatus {
    pub busy:          bool,
    pub drq:           bool,
    pub lost_data:     bool,
    pub crc_error:     bool,
    pub not_found:     bool,
    pub record_type:   bool,
    pub write_protect: bool,
    pub not_ready:     bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn command_opcodes_roundtrip() {
        for cmd in Command::iter() {
            assert_eq!(Command::from_byte(cmd.opcode() | 0x0F), cmd);
        }
    }

    #[test]
    fn command_types_classify() {
        assert_eq!(Command::from_byte(0x0B).command_type(), CommandType::TypeI);
        assert_eq!(Command::from_byte(0x9C).command_type(), CommandType::TypeII);
        assert_eq!(Command::from_byte(0xC4).command_type(), CommandType::TypeIII);
        assert_eq!(Command::from_byte(0xF0).command_type(), CommandType::TypeIII);
        assert_eq!(Command::from_byte(0xD8).command_type(), CommandType::TypeIV);
    }

    #[test]
    fn sector_codes() {
        assert_eq!(sector_code_from_len(128), Some(0));
        assert_eq!(sector_code_from_len(1024), Some(3));
        assert_eq!(sector_code_from_len(8192), Some(6));
        assert_eq!(sector_code_from_len(0), None);
        assert_eq!(sector_code_from_len(64), None);
        assert_eq!(sector_code_from_len(300), None);
        assert_eq!(sector_code_from_len(16384), None);
        assert_eq!(sector_len_bytes(2), 512);
    }

    #[test]
    fn sectors_per_track_table() {
        assert_eq!(max_sectors_per_track(Density::Single, 0), 26);
        assert_eq!(max_sectors_per_track(Density::Single, 1), 15);
        assert_eq!(max_sectors_per_track(Density::Double, 1), 26);
        assert_eq!(max_sectors_per_track(Density::Double, 6), 1);
    }

    #[test]
    fn command_byte_fields() {
        let t1 = TypeICommandByte::from_bytes([0x5E]);
        assert!(t1.verify());
        assert!(t1.head_load());
        assert!(t1.side());
        assert_eq!(t1.opcode(), 0x5);

        let t2 = TypeIICommandByte::from_bytes([0x92]);
        assert!(t2.multiple());
        assert!(t2.side());

        assert!(ForceIntrCommandByte::from_bytes([0xD0]).is_terminate_only());
        let fi = ForceIntrCommandByte::from_bytes([0xD4]);
        assert!(!fi.is_terminate_only());
        assert!(fi.index_pulse());
    }

    #[test]
    fn status_views_share_bit_positions() {
        let t1 = TypeIStatus::new().with_busy(true).with_track0(true).with_not_ready(true);
        assert_eq!(t1.into_bytes()[0], STAT_BUSY | STAT_TRACK0 | STAT_NOT_READY);
        let t2 = TypeIIStatus::new().with_drq(true).with_not_found(true);
        assert_eq!(t2.into_bytes()[0], STAT_DRQ | STAT_NOT_FOUND);
    }

    #[test]
    fn media_size_from_cylinders() {
        assert_eq!(MediaSize::from_cylinders(77), MediaSize::EightInch);
        assert_eq!(MediaSize::from_cylinders(40), MediaSize::FiveQuarterInch);
        assert_eq!(MediaSize::EightInch.rotation_ticks(), 167 * 291);
    }
}

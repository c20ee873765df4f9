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

    devices::fdc::controller.rs

    Implements the Western Digital WD1793/1795/1797 Floppy Disk Controller
*/

use crate::{
    bus::{DeviceRunTimeUnit, IoDevice, NO_IO_BYTE},
    config::{FdcVariant, Wd179xConfig},
    device_types::{chs::DiskChs, fdc::*},
    devices::{
        fdc::{
            data_adapter::{DataAdapter, ExternalFifo, TransferState},
            format::{FormatState, FormatStep, TrackFormatter},
        },
        floppy_drive::FloppyDrive,
    },
    error::{StoreError, Wd179xError},
    host::{FdcHost, NullHost},
    sector_store::SectorStoreHandle,
};

use marty_common::types::history_buffer::HistoryBuffer;

pub const FDC_LOG_LEN: usize = 1000;

/// Direction latched by the STEP_IN_U and STEP_OUT_U commands and reused by STEP_U.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum StepDirection {
    #[default]
    Undefined,
    In,
    Out,
}

/// The controller's status conditions. The status register byte is composed from these
/// according to the type of the last command.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub busy: bool,
    pub index: bool,
    pub track0: bool,
    pub drq: bool,
    pub lost_data: bool,
    pub crc_error: bool,
    pub seek_error: bool,
    pub not_found: bool,
    pub record_type: bool,
    pub head_loaded: bool,
    pub write_protect: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Wd179xDebugState {
    pub variant: FdcVariant,
    pub drive_select: usize,
    pub head: u8,
    pub density: Density,
    pub interrupt_enable: bool,
    pub interrupt_vector: u8,
    pub command_type: CommandType,
    pub last_cmd: Option<Command>,
    pub status_register: u8,
    pub track_register: u8,
    pub sector_register: u8,
    pub data_register: u8,
    pub drq: bool,
    pub intrq: bool,
    pub transfer_state: TransferState,
    pub multiple: bool,
    pub data_index: usize,
    pub data_count: usize,
    pub sector_len_code: u8,
    pub step_direction: StepDirection,
    pub index_pulse_wait: bool,
    pub format_state: FormatState,
    pub sector_map: Vec<u8>,
    pub gaps: [u16; 3],
    pub fifo_index: Option<usize>,
    pub cmd_log: Vec<String>,
}

pub struct Wd179x<H: FdcHost = NullHost> {
    host: H,
    variant: FdcVariant,
    io_base: u16,
    drives: [FloppyDrive; WD179X_MAX_DRIVES],
    drive_select: usize,
    head: u8,
    density: Density,
    interrupt_enable: bool,
    interrupt_vector: u8,

    command_type: CommandType,
    last_cmd: Option<Command>,
    status: StatusFlags,
    intrq: bool,
    verify: bool,
    sector_register: u8,
    data_register: u8,
    sector_len_code: u8,
    step_direction: StepDirection,
    index_pulse_wait: bool,

    adapter: DataAdapter,
    formatter: TrackFormatter,
    fifo: Option<ExternalFifo>,

    cmd_log: HistoryBuffer<String>,
}

/// IO Port handlers for the FDC
impl<H: FdcHost> IoDevice for Wd179x<H> {
    fn read_u8(&mut self, port: u16, delta: DeviceRunTimeUnit) -> u8 {
        self.run(delta.to_ticks());
        self.read_register(port)
    }

    fn write_u8(&mut self, port: u16, data: u8, delta: DeviceRunTimeUnit) {
        self.run(delta.to_ticks());
        if let Err(e) = self.write_register(port, data) {
            log::debug!("WD179X: write of {:02X} to port {:04X} had no effect: {}", data, port, e);
        }
    }

    fn port_list(&self) -> Vec<(String, u16)> {
        vec![
            (
                String::from("WD179X Status/Command Register"),
                self.io_base + WD179X_STATUS,
            ),
            (String::from("WD179X Track Register"), self.io_base + WD179X_TRACK),
            (String::from("WD179X Sector Register"), self.io_base + WD179X_SECTOR),
            (String::from("WD179X Data Register"), self.io_base + WD179X_DATA),
        ]
    }
}

impl Default for Wd179x<NullHost> {
    fn default() -> Self {
        Self::new(NullHost)
    }
}

impl<H: FdcHost> Wd179x<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            variant: FdcVariant::default(),
            io_base: DEFAULT_IO_BASE,
            drives: std::array::from_fn(FloppyDrive::new),
            drive_select: 0,
            head: 0,
            density: Density::Single,
            interrupt_enable: false,
            interrupt_vector: 0,

            command_type: CommandType::None,
            last_cmd: None,
            status: StatusFlags::default(),
            intrq: false,
            verify: false,
            sector_register: 0,
            data_register: 0,
            sector_len_code: 0,
            step_direction: StepDirection::Undefined,
            index_pulse_wait: false,

            adapter: DataAdapter::default(),
            formatter: TrackFormatter::new(),
            fifo: None,

            cmd_log: HistoryBuffer::new(FDC_LOG_LEN),
        }
    }

    pub fn from_config(config: &Wd179xConfig, host: H) -> Result<Self, Wd179xError> {
        let mut fdc = Self::new(host);
        fdc.variant = config.variant;
        fdc.io_base = config.io_base;
        fdc.interrupt_enable = config.interrupt_enable;
        fdc.interrupt_vector = config.interrupt_vector;
        fdc.density = Density::from(config.double_density);
        if let Some(len) = config.external_fifo_len {
            fdc.connect_external_fifo(len)?;
        }
        log::debug!(
            "{} created at {:04X}, interrupts {} (vector {})",
            fdc.variant,
            fdc.io_base,
            if fdc.interrupt_enable { "enabled" } else { "disabled" },
            fdc.interrupt_vector
        );
        Ok(fdc)
    }

    /// Return the controller to an idle state. Attached drives keep their images and head
    /// positions.
    pub fn reset(&mut self) {
        self.command_type = CommandType::None;
        self.status.busy = false;
        self.status.drq = false;
        self.adapter.reset();
        self.adapter.multiple = false;
        self.formatter.reset();
        self.cancel_index_wait();
        self.log_str("FDC Reset!");
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn variant(&self) -> FdcVariant {
        self.variant
    }

    pub fn io_base(&self) -> u16 {
        self.io_base
    }

    pub fn drive(&self, drive_n: usize) -> Option<&FloppyDrive> {
        self.drives.get(drive_n)
    }

    /// Attach a sector store to a drive and make it ready. Selects drive 0.
    pub fn attach(&mut self, drive_n: usize, store: SectorStoreHandle) -> Result<(), Wd179xError> {
        let drive = self
            .drives
            .get_mut(drive_n)
            .ok_or(Wd179xError::InvalidDrive(drive_n))?;
        drive.attach(store).map_err(|e| Wd179xError::Io(e.to_string()))?;
        self.drive_select = 0;
        self.log_str(&format!("Drive {}: image attached", drive_n));
        Ok(())
    }

    /// Detach the store from a drive, returning it.
    pub fn detach(&mut self, drive_n: usize) -> Result<Option<SectorStoreHandle>, Wd179xError> {
        let drive = self
            .drives
            .get_mut(drive_n)
            .ok_or(Wd179xError::InvalidDrive(drive_n))?;
        let store = drive.detach();
        self.log_str(&format!("Drive {}: image detached", drive_n));
        Ok(store)
    }

    // Board-level latches. These inputs are driven by the host board rather than through
    // the controller's registers.

    /// Select a drive. Numbers of 4 and above are accepted and leave the controller
    /// unreachable until a valid drive is selected again.
    pub fn select_drive(&mut self, drive_n: usize) {
        self.drive_select = drive_n;
    }

    pub fn set_head(&mut self, head: u8) {
        self.head = head;
    }

    pub fn set_double_density(&mut self, state: bool) {
        self.density = Density::from(state);
    }

    pub fn set_interrupt_enable(&mut self, state: bool) {
        self.interrupt_enable = state;
    }

    pub fn set_interrupt_vector(&mut self, vector: u8) {
        self.interrupt_vector = vector;
    }

    /// Drive the restore line: move the selected drive's head to track 0.
    pub fn external_restore(&mut self) {
        match self.drives.get_mut(self.drive_select) {
            Some(drive) if drive.is_attached() => {
                log::debug!("Drive {}: external restore to track 0", self.drive_select);
                drive.set_track(0);
            }
            Some(_) => log::error!("Drive {}: no image attached, cannot restore", self.drive_select),
            None => log::error!("Illegal drive {} selected, cannot restore", self.drive_select),
        }
    }

    /// Return the number of heads of the selected drive's media, or 0 if none.
    pub fn head_count(&self) -> u8 {
        match self.selected() {
            Some(drive) if drive.is_attached() => drive.heads(),
            _ => 0,
        }
    }

    pub fn connect_external_fifo(&mut self, len: usize) -> Result<(), Wd179xError> {
        self.fifo = Some(ExternalFifo::new(len)?);
        Ok(())
    }

    pub fn reset_external_fifo(&mut self) {
        if let Some(fifo) = self.fifo.as_mut() {
            fifo.reset();
        }
    }

    pub fn external_fifo(&self) -> Option<&ExternalFifo> {
        self.fifo.as_ref()
    }

    pub fn external_fifo_mut(&mut self) -> Option<&mut ExternalFifo> {
        self.fifo.as_mut()
    }

    pub fn status_flags(&self) -> StatusFlags {
        self.status
    }

    pub fn busy(&self) -> bool {
        self.status.busy
    }

    pub fn drq(&self) -> bool {
        self.status.drq
    }

    pub fn intrq(&self) -> bool {
        self.intrq
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    pub fn track(&self) -> u8 {
        self.selected().map_or(0, |drive| drive.track())
    }

    pub fn sector_register(&self) -> u8 {
        self.sector_register
    }

    pub fn data_register(&self) -> u8 {
        self.data_register
    }

    pub fn head(&self) -> u8 {
        self.head
    }

    pub fn step_direction(&self) -> StepDirection {
        self.step_direction
    }

    pub fn index_pulse_wait(&self) -> bool {
        self.index_pulse_wait
    }

    /// Advance the controller by `ticks` scheduler ticks, delivering a due index pulse.
    pub fn run(&mut self, ticks: u32) {
        if self.host.index_pulse_due(ticks) {
            self.service_index_pulse();
        }
    }

    /// Deliver a scheduled index pulse. Only has an effect if a FORCE_INTR is waiting on one.
    pub fn service_index_pulse(&mut self) {
        if self.index_pulse_wait {
            self.index_pulse_wait = false;
            self.log_str("Index pulse interrupt");
            self.signal_completion();
        }
    }

    /// Read one of the four registers, selected by the low two bits of `port`.
    pub fn read_register(&mut self, port: u16) -> u8 {
        if self.drive_select >= WD179X_MAX_DRIVES {
            return NO_IO_BYTE;
        }

        match port & WD179X_PORT_MASK {
            WD179X_STATUS => self.handle_status_register_read(),
            WD179X_TRACK => {
                let track = self.track();
                log::trace!("RD TRACK = {:02X}", track);
                track
            }
            WD179X_SECTOR => {
                log::trace!("RD SECT  = {:02X}", self.sector_register);
                self.sector_register
            }
            _ => self.handle_data_register_read(),
        }
    }

    /// Write one of the four registers, selected by the low two bits of `port`. Writes are
    /// ignored unless the selected drive has an image attached.
    pub fn write_register(&mut self, port: u16, byte: u8) -> Result<(), Wd179xError> {
        let drive_n = self.check_selected()?;

        match port & WD179X_PORT_MASK {
            WD179X_STATUS => self.command(byte),
            WD179X_TRACK => {
                log::trace!("WR TRACK = {:02X}", byte);
                self.drives[drive_n].set_track(byte);
                Ok(())
            }
            WD179X_SECTOR => {
                log::trace!("WR SECT  = {:02X}", byte);
                self.sector_register = byte;
                Ok(())
            }
            _ => self.handle_data_register_write(byte),
        }
    }

    /// Compose the status register without side effects.
    pub fn status_byte(&self) -> u8 {
        let drive = self.selected();
        let not_ready = !drive.map_or(false, |d| d.ready());

        if self.command_type.is_type_i_view() {
            TypeIStatus::new()
                .with_busy(self.status.busy)
                .with_index(self.status.index)
                .with_track0(self.status.track0)
                .with_crc_error(self.status.crc_error)
                .with_seek_error(self.status.seek_error)
                .with_head_loaded(self.status.head_loaded)
                .with_write_protect(drive.map_or(false, |d| d.write_protected()))
                .with_not_ready(not_ready)
                .into_bytes()[0]
        }
        else {
            TypeIIStatus::new()
                .with_busy(self.status.busy)
                .with_drq(self.status.drq)
                .with_lost_data(self.status.lost_data)
                .with_crc_error(self.status.crc_error)
                .with_not_found(self.status.not_found)
                .with_record_type(self.status.record_type)
                .with_write_protect(self.status.write_protect)
                .with_not_ready(not_ready)
                .into_bytes()[0]
        }
    }

    fn handle_status_register_read(&mut self) -> u8 {
        if self.command_type.is_type_i_view() {
            // No spinning media to watch, so alternate INDEX on every read.
            self.status.index = !self.status.index;
            self.status.track0 = self.track() == 0;
        }

        let byte = self.status_byte();
        log::trace!("RD STATUS = {:02X}, {:?}", byte, self.command_type);

        self.intrq = false;
        if self.interrupt_enable {
            self.host.clear_interrupt(self.interrupt_vector);
        }
        byte
    }

    fn handle_data_register_read(&mut self) -> u8 {
        let byte = match self.adapter.next_byte() {
            Some(byte) => byte,
            None => return NO_IO_BYTE,
        };
        self.status.busy = false;

        if self.adapter.state() == TransferState::ReadingAddress {
            log::trace!(
                "Drive {}: READ_ADDR[{}/{}] = {:02X}",
                self.drive_select,
                self.adapter.data_cursor - 1,
                self.adapter.data_count,
                byte
            );
        }

        if self.adapter.is_complete() {
            if self.adapter.multiple && self.adapter.state() == TransferState::Reading {
                self.advance_multiple_read();
            }
            else {
                self.adapter.reset();
                self.status.drq = false;
                self.signal_completion();
            }
        }
        byte
    }

    fn handle_data_register_write(&mut self, byte: u8) -> Result<(), Wd179xError> {
        let result = match self.adapter.state() {
            TransferState::Writing => {
                if self.adapter.put_byte(byte) {
                    let result = self.commit_sector_write();
                    self.signal_completion();
                    result
                }
                else {
                    Ok(())
                }
            }
            TransferState::WritingTrack => self.format_byte(byte),
            _ => Ok(()),
        };
        self.data_register = byte;
        result
    }

    /// Decode and execute a command byte, as if written to the command register.
    pub fn command(&mut self, byte: u8) -> Result<(), Wd179xError> {
        let drive_n = self.check_selected()?;
        let cmd = Command::from_byte(byte);

        if self.status.busy && cmd != Command::ForceInterrupt {
            log::warn!(
                "Drive {}: command {:02X} ({}) ignored because controller is BUSY",
                drive_n,
                byte,
                cmd
            );
            return Err(Wd179xError::CommandRejectedBusy(byte));
        }

        if matches!(cmd, Command::WriteRecords | Command::ReadTrack) {
            log::warn!("Drive {}: {} not implemented", drive_n, cmd);
            return Err(Wd179xError::UnimplementedCommand(cmd));
        }

        // A command write abandons any transfer and any pending index pulse interrupt.
        self.adapter.reset();
        self.formatter.reset();
        self.cancel_index_wait();
        self.raise_if_enabled();

        self.log_cmd(
            cmd,
            "command",
            &format!(
                "{:02X} T:{} H:{} S:{} D:{:02X} {}",
                byte,
                self.drives[drive_n].track(),
                self.head,
                self.sector_register,
                self.data_register,
                self.density
            ),
        );
        self.last_cmd = Some(cmd);
        self.command_type = cmd.command_type();

        match self.command_type {
            CommandType::TypeI => self.setup_type_i(byte),
            CommandType::TypeII => self.setup_type_ii(byte),
            CommandType::TypeIII => self.setup_type_iii(),
            _ => {}
        }

        let result = match cmd {
            Command::Restore => self.command_restore(),
            Command::Seek => self.command_seek(),
            Command::Step
            | Command::StepUpdate
            | Command::StepIn
            | Command::StepInUpdate
            | Command::StepOut
            | Command::StepOutUpdate => self.command_step(cmd),
            Command::ReadRecord | Command::ReadRecords => self.command_read_record(byte),
            Command::WriteRecord => self.command_write_record(),
            Command::ReadAddress => self.command_read_address(),
            Command::WriteTrack => self.command_write_track(),
            Command::ForceInterrupt => self.command_force_interrupt(byte),
            Command::WriteRecords | Command::ReadTrack => Err(Wd179xError::UnimplementedCommand(cmd)),
        };

        match self.command_type {
            CommandType::TypeI => self.finish_type_i(),
            CommandType::TypeII | CommandType::TypeIII => self.finish_type_ii_iii(),
            _ => {}
        }

        result
    }

    fn setup_type_i(&mut self, byte: u8) {
        let flags = TypeICommandByte::from_bytes([byte]);
        self.status.busy = true;
        self.status.crc_error = false;
        self.status.seek_error = false;
        self.status.drq = false;
        self.status.head_loaded = flags.head_load();
        self.verify = flags.verify();
        self.intrq = false;
        if self.variant.has_side_select() {
            self.head = flags.side() as u8;
        }
    }

    fn setup_type_ii(&mut self, byte: u8) {
        let flags = TypeIICommandByte::from_bytes([byte]);
        self.status = StatusFlags {
            busy: true,
            head_loaded: true,
            ..Default::default()
        };
        self.intrq = false;
        if self.variant.has_side_select() {
            self.head = flags.side() as u8;
        }
    }

    fn setup_type_iii(&mut self) {
        self.status = StatusFlags {
            busy: true,
            head_loaded: self.status.head_loaded,
            ..Default::default()
        };
        self.intrq = false;
    }

    fn finish_type_i(&mut self) {
        if self.verify {
            let verified = match self.selected() {
                Some(drive) => {
                    drive.sector_size(self.head).is_some() && !drive.density_mismatch(self.head, self.density)
                }
                None => false,
            };
            if !verified {
                log::debug!(
                    "Drive {}: verify failed at track {} head {}",
                    self.drive_select,
                    self.track(),
                    self.head
                );
                self.status.seek_error = true;
            }
        }

        self.status.track0 = self.track() == 0;
        self.status.busy = false;
        self.signal_completion();
    }

    /// Commands that are still transferring keep BUSY; everything else is finished here.
    fn finish_type_ii_iii(&mut self) {
        if !self.status.busy {
            self.signal_completion();
        }
    }

    fn command_restore(&mut self) -> Result<(), Wd179xError> {
        log::debug!(
            "Drive {}: RESTORE {}",
            self.drive_select,
            if self.verify { "[VERIFY]" } else { "" }
        );
        self.set_track(0);
        Ok(())
    }

    fn command_seek(&mut self) -> Result<(), Wd179xError> {
        log::debug!(
            "Drive {}: SEEK from track {} to {}",
            self.drive_select,
            self.track(),
            self.data_register
        );
        self.set_track(self.data_register);
        Ok(())
    }

    /// Only the updating step variants move the head.
    fn command_step(&mut self, cmd: Command) -> Result<(), Wd179xError> {
        match cmd {
            Command::StepUpdate => match self.step_direction {
                StepDirection::In => self.step_in(),
                StepDirection::Out => self.step_out(),
                StepDirection::Undefined => {
                    log::error!("Drive {}: undefined direction for STEP", self.drive_select);
                }
            },
            Command::StepInUpdate => {
                self.step_in();
                self.step_direction = StepDirection::In;
            }
            Command::StepOutUpdate => {
                self.step_out();
                self.step_direction = StepDirection::Out;
            }
            _ => {}
        }
        log::debug!("Drive {}: {} track={}", self.drive_select, cmd, self.track());
        Ok(())
    }

    fn step_in(&mut self) {
        let track = self.track();
        if track < MAX_CYL - 1 {
            self.set_track(track + 1);
        }
    }

    fn step_out(&mut self) {
        let track = self.track();
        if track > 0 {
            self.set_track(track - 1);
        }
    }

    fn command_read_record(&mut self, byte: u8) -> Result<(), Wd179xError> {
        let code = match self.lookup_sector_size() {
            Ok(code) => code,
            Err(e) => {
                log::error!("Drive {}: {}", self.drive_select, e);
                self.sector_len_code = 0;
                self.terminate_not_found();
                return Err(e);
            }
        };
        self.sector_len_code = code;
        self.adapter.multiple = TypeIICommandByte::from_bytes([byte]).multiple();

        log::debug!(
            "Drive {}: READ_REC {} N:{} {} {} len={}",
            self.drive_select,
            self.current_chs(),
            code,
            if self.adapter.multiple { "Multiple" } else { "Single" },
            self.density,
            sector_len_bytes(code)
        );

        if self.density_mismatch() {
            let chs = self.current_chs();
            self.terminate_not_found();
            return Err(Wd179xError::SectorNotFound(chs));
        }
        self.read_sector_into_buffer()
    }

    fn command_write_record(&mut self) -> Result<(), Wd179xError> {
        if self.write_protected() {
            log::warn!("Drive {}: WRITE_REC on write protected media", self.drive_select);
            self.status.write_protect = true;
            self.status.busy = false;
            return Err(Wd179xError::WriteProtected);
        }

        let code = match self.lookup_sector_size() {
            Ok(code) => code,
            Err(e) => {
                log::error!("Drive {}: {}", self.drive_select, e);
                self.sector_len_code = 0;
                self.terminate_not_found();
                return Err(e);
            }
        };
        self.sector_len_code = code;

        if self.density_mismatch() {
            let chs = self.current_chs();
            self.terminate_not_found();
            return Err(Wd179xError::SectorNotFound(chs));
        }

        let len = sector_len_bytes(code);
        log::debug!(
            "Drive {}: WRITE_REC {} N:{} len={}",
            self.drive_select,
            self.current_chs(),
            code,
            len
        );
        self.adapter.begin_write(len);
        self.status.drq = true;

        if let Some(fifo) = self.fifo.as_mut() {
            // The board has already filled its FIFO; take the whole sector at once.
            fifo.pull(self.adapter.buffer_mut());
            return self.commit_sector_write();
        }
        Ok(())
    }

    fn command_read_address(&mut self) -> Result<(), Wd179xError> {
        if self.track() == 0xFF {
            self.set_track(0);
        }
        self.adapter.multiple = false;

        let code = match self.lookup_sector_size() {
            Ok(code) => code,
            Err(e) => {
                log::error!("Drive {}: {}", self.drive_select, e);
                self.sector_len_code = 0;
                self.terminate_not_found();
                return Err(e);
            }
        };
        self.sector_len_code = code;

        if self.density_mismatch() {
            let chs = self.current_chs();
            self.terminate_not_found();
            return Err(Wd179xError::SectorNotFound(chs));
        }

        let track = self.track();
        log::debug!(
            "Drive {}: READ_ADDR T:{} H:{} {}",
            self.drive_select,
            track,
            self.head,
            self.density
        );
        let id_field = [
            track,
            self.head,
            self.sector_register,
            code,
            ID_CRC_PLACEHOLDER[0],
            ID_CRC_PLACEHOLDER[1],
        ];
        self.adapter.begin_read_address(&id_field);
        self.status.drq = true;
        self.sector_register = track;
        self.status.busy = false;
        Ok(())
    }

    fn command_write_track(&mut self) -> Result<(), Wd179xError> {
        if self.write_protected() {
            log::warn!("Drive {}: WRITE_TRACK on write protected media", self.drive_select);
            self.status.write_protect = true;
            self.status.busy = false;
            return Err(Wd179xError::WriteProtected);
        }

        log::debug!(
            "Drive {}: WRITE_TRACK T:{} H:{} {}",
            self.drive_select,
            self.track(),
            self.head,
            self.density
        );
        self.adapter.begin_write_track();
        self.formatter.begin();
        self.status.drq = true;
        Ok(())
    }

    fn command_force_interrupt(&mut self, byte: u8) -> Result<(), Wd179xError> {
        let flags = ForceIntrCommandByte::from_bytes([byte]);

        if flags.is_terminate_only() {
            log::debug!("Drive {}: FORCE_INTR, terminate", self.drive_select);
            self.status.drq = false;
            self.status.busy = false;
            return Ok(());
        }

        if !self.status.busy {
            self.status = StatusFlags::default();
        }

        if flags.index_pulse() {
            let ticks = self
                .selected()
                .map_or(ROTATION_8IN, |drive| drive.media_size().rotation_ticks());
            log::debug!("Drive {}: FORCE_INTR, on index pulse in {} ticks", self.drive_select, ticks);
            self.index_pulse_wait = true;
            self.host.schedule_index_pulse(ticks);
        }
        else {
            log::debug!("Drive {}: FORCE_INTR, immediate", self.drive_select);
            self.signal_completion();
        }

        self.status.busy = false;
        Ok(())
    }

    /// Load the sector addressed by the track, head and sector registers and arm a read.
    fn read_sector_into_buffer(&mut self) -> Result<(), Wd179xError> {
        let chs = self.current_chs();
        let len = sector_len_bytes(self.sector_len_code);
        let result = match self.drives.get(self.drive_select) {
            Some(drive) => drive.read_sector(chs, &mut self.adapter.data[..len]),
            None => Err(StoreError::NotFound),
        };

        match result {
            Ok(_) => {
                // BUSY stays as set by the command; an auto-advanced sector leaves it clear.
                self.adapter.begin_read(len);
                self.status = StatusFlags {
                    busy: self.status.busy,
                    drq: true,
                    head_loaded: self.status.head_loaded,
                    ..Default::default()
                };
                self.intrq = false;
                if let Some(fifo) = self.fifo.as_mut() {
                    fifo.push(&self.adapter.data[..len]);
                }
                Ok(())
            }
            Err(e) => {
                log::debug!("Drive {}: read of {} failed: {}", self.drive_select, chs, e);
                self.status = StatusFlags {
                    not_found: true,
                    head_loaded: self.status.head_loaded,
                    ..Default::default()
                };
                self.adapter.reset();
                Err(e.at(chs))
            }
        }
    }

    /// Continue a READ_RECS transfer with the next sector id.
    fn advance_multiple_read(&mut self) {
        let code = match self.lookup_sector_size() {
            Ok(code) => code,
            Err(e) => {
                log::error!("Drive {}: multi-sector read aborted: {}", self.drive_select, e);
                self.sector_len_code = 0;
                self.terminate_not_found();
                self.signal_completion();
                return;
            }
        };
        self.sector_len_code = code;
        self.sector_register = self.sector_register.wrapping_add(1);

        log::debug!(
            "Drive {}: MULTI_READ_REC {} N:{} {}",
            self.drive_select,
            self.current_chs(),
            code,
            self.density
        );
        if let Err(e) = self.read_sector_into_buffer() {
            log::debug!("Drive {}: multi-sector read ended: {}", self.drive_select, e);
            self.signal_completion();
        }
    }

    /// Write the buffered sector out. The caller signals completion.
    fn commit_sector_write(&mut self) -> Result<(), Wd179xError> {
        let chs = self.current_chs();
        let result = match self.drives.get(self.drive_select) {
            Some(drive) => drive.write_sector(chs, self.adapter.buffer()),
            None => Err(StoreError::NotFound),
        };

        self.adapter.reset();
        self.status.drq = false;
        self.status.busy = false;

        let result = match result {
            Ok(written) => {
                log::debug!("Drive {}: wrote sector {}, {} bytes", self.drive_select, chs, written);
                Ok(())
            }
            Err(e) => {
                log::error!("Drive {}: write of {} failed: {}", self.drive_select, chs, e);
                self.flag_store_error(&e);
                Err(e.at(chs))
            }
        };
        result
    }

    fn format_byte(&mut self, byte: u8) -> Result<(), Wd179xError> {
        match self.formatter.feed(byte, &mut self.adapter.data) {
            FormatStep::Continue => Ok(()),
            FormatStep::Track(track) => {
                self.set_track(track);
                Ok(())
            }
            FormatStep::Head(head) => {
                self.head = head;
                Ok(())
            }
            FormatStep::Sector(sector) => {
                self.sector_register = sector;
                Ok(())
            }
            FormatStep::SectorDone {
                sector_len_code,
                sectors,
            } => {
                self.sector_len_code = sector_len_code;
                if sectors == max_sectors_per_track(self.density, sector_len_code) as usize {
                    self.commit_track()
                }
                else {
                    Ok(())
                }
            }
        }
    }

    fn commit_track(&mut self) -> Result<(), Wd179xError> {
        let fill = self.adapter.data[0];
        let chs = self.current_chs();
        let result = match self.drives.get(self.drive_select) {
            Some(drive) => drive.write_track(
                self.head,
                fill,
                self.formatter.sector_map(),
                self.sector_len_code,
                self.density,
            ),
            None => Err(StoreError::NotFound),
        };

        log::debug!(
            "Drive {}: FORMAT T:{} H:{} {} sectors N:{} fill={:02X}",
            self.drive_select,
            chs.c(),
            chs.h(),
            self.formatter.sector_map().len(),
            self.sector_len_code,
            fill
        );

        self.formatter.reset();
        self.adapter.reset();
        self.status.busy = false;
        self.status.lost_data = false;
        self.status.drq = false;

        let result = match result {
            Ok(()) => {
                if let Some(drive) = self.drives.get_mut(self.drive_select) {
                    drive.refresh_capacity();
                }
                Ok(())
            }
            Err(e) => {
                log::error!("Drive {}: format of track {} failed: {}", self.drive_select, chs.c(), e);
                self.flag_store_error(&e);
                Err(e.at(chs))
            }
        };
        self.signal_completion();
        result
    }

    /// End the current transfer with NOT_FOUND. The caller signals completion.
    fn terminate_not_found(&mut self) {
        self.status.not_found = true;
        self.status.busy = false;
        self.status.drq = false;
        self.adapter.reset();
    }

    fn flag_store_error(&mut self, e: &StoreError) {
        match e {
            StoreError::WriteProtected => self.status.write_protect = true,
            _ => self.status.not_found = true,
        }
    }

    fn signal_completion(&mut self) {
        self.intrq = true;
        self.raise_if_enabled();
    }

    fn raise_if_enabled(&mut self) {
        if self.interrupt_enable {
            self.host.raise_interrupt(self.interrupt_vector);
        }
    }

    fn cancel_index_wait(&mut self) {
        if self.index_pulse_wait {
            self.index_pulse_wait = false;
            self.host.cancel_index_pulse();
        }
    }

    fn check_selected(&self) -> Result<usize, Wd179xError> {
        match self.drives.get(self.drive_select) {
            None => Err(Wd179xError::InvalidDrive(self.drive_select)),
            Some(drive) if !drive.is_attached() => Err(Wd179xError::NotReady),
            Some(_) => Ok(self.drive_select),
        }
    }

    fn selected(&self) -> Option<&FloppyDrive> {
        self.drives.get(self.drive_select)
    }

    fn set_track(&mut self, track: u8) {
        if let Some(drive) = self.drives.get_mut(self.drive_select) {
            drive.set_track(track);
        }
    }

    fn current_chs(&self) -> DiskChs {
        DiskChs::new(self.track() as u16, self.head, self.sector_register)
    }

    fn write_protected(&self) -> bool {
        self.selected().map_or(false, |drive| drive.write_protected())
    }

    fn density_mismatch(&self) -> bool {
        self.selected()
            .map_or(false, |drive| drive.density_mismatch(self.head, self.density))
    }

    /// Determine the sector length code of the current track.
    fn lookup_sector_size(&self) -> Result<u8, Wd179xError> {
        match self.selected().and_then(|drive| drive.sector_size(self.head)) {
            Some(code) if code <= MAX_SECTOR_CODE => Ok(code),
            Some(code) => Err(Wd179xError::InvalidSectorSize(code)),
            None => Err(Wd179xError::InvalidSectorSize(SECTOR_SIZE_UNKNOWN)),
        }
    }

    pub fn log_cmd(&mut self, cmd: Command, func: &str, s: &str) {
        self.cmd_log.push(format!("{}: {}", cmd, s));
        log::trace!("{}(): {}", func, s);
    }

    pub fn log_str(&mut self, s: &str) {
        self.cmd_log.push(s.to_string());
        log::trace!("{}", s);
    }

    pub fn get_debug_state(&self) -> Wd179xDebugState {
        Wd179xDebugState {
            variant: self.variant,
            drive_select: self.drive_select,
            head: self.head,
            density: self.density,
            interrupt_enable: self.interrupt_enable,
            interrupt_vector: self.interrupt_vector,
            command_type: self.command_type,
            last_cmd: self.last_cmd,
            status_register: self.status_byte(),
            track_register: self.track(),
            sector_register: self.sector_register,
            data_register: self.data_register,
            drq: self.status.drq,
            intrq: self.intrq,
            transfer_state: self.adapter.state(),
            multiple: self.adapter.multiple,
            data_index: self.adapter.data_cursor,
            data_count: self.adapter.data_count,
            sector_len_code: self.sector_len_code,
            step_direction: self.step_direction,
            index_pulse_wait: self.index_pulse_wait,
            format_state: self.formatter.state(),
            sector_map: self.formatter.sector_map().to_vec(),
            gaps: self.formatter.gaps(),
            fifo_index: self.fifo.as_ref().map(|fifo| fifo.index()),
            cmd_log: self.cmd_log.as_vec(),
        }
    }
}

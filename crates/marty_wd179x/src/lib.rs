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

    lib.rs

    Register-level emulation core for the Western Digital WD1793/1795/1797
    floppy disk controller.
*/

pub mod bus;
pub mod config;
pub mod device_types;
pub mod devices;
pub mod error;
pub mod host;
pub mod sector_store;

pub use crate::{
    bus::{DeviceRunTimeUnit, IoDevice},
    config::{FdcVariant, Wd179xConfig},
    device_types::{chs::DiskChs, fdc::Density},
    devices::fdc::Wd179x,
    error::{StoreError, Wd179xError},
    host::{FdcHost, NullHost, VectorBus},
    sector_store::{FlatImage, SectorStore, SectorStoreHandle, TrackImage},
};

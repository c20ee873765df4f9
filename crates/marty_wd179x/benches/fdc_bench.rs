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

    benches::fdc_bench.rs

    Benchmarks for the WD179x controller.
*/

use std::sync::{Arc, RwLock};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use marty_wd179x::{
    device_types::fdc::{CMD_READ_REC, CMD_WRITE_REC, WD179X_DATA, WD179X_SECTOR, WD179X_STATUS},
    Density,
    TrackImage,
    Wd179x,
};

fn new_fdc() -> Wd179x {
    let mut fdc = Wd179x::default();
    let image = TrackImage::format_uniform(77, 1, Density::Single, 0, 26, 0xE5);
    if let Err(e) = fdc.attach(0, Arc::new(RwLock::new(image))) {
        panic!("attach failed: {}", e);
    }
    fdc
}

pub fn fdc_sector_bench(c: &mut Criterion) {
    c.bench_function("fdc_bench_read_sector_by_port", |b| {
        let mut fdc = new_fdc();

        b.iter(|| {
            let _ = fdc.write_register(WD179X_SECTOR, 1);
            let _ = fdc.command(CMD_READ_REC);
            for _ in 0..128 {
                black_box(fdc.read_register(WD179X_DATA));
            }
            black_box(fdc.read_register(WD179X_STATUS));
        });
    });

    c.bench_function("fdc_bench_write_sector_by_port", |b| {
        let mut fdc = new_fdc();

        b.iter(|| {
            let _ = fdc.write_register(WD179X_SECTOR, 2);
            let _ = fdc.command(CMD_WRITE_REC);
            for i in 0..128u8 {
                let _ = fdc.write_register(WD179X_DATA, black_box(i));
            }
            black_box(fdc.read_register(WD179X_STATUS));
        });
    });
}

criterion_group!(benches, fdc_sector_bench);
criterion_main!(benches);

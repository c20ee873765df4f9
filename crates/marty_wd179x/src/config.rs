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

    config.rs

    Controller configuration, loaded from the [fdc] table of a TOML file.
*/

use std::{
    fmt::{self, Display},
    path::Path,
    str::FromStr,
};

use crate::{device_types::fdc::DEFAULT_IO_BASE, host::MAX_VECTORS};

use anyhow::{anyhow, Context};
use serde::Deserializer;
use serde_derive::Deserialize;

/// Which member of the WD179x family is being emulated. The 1795 and 1797 take the
/// side select from bit 1 of Type I and Type II command bytes.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
pub enum FdcVariant {
    #[default]
    Wd1793,
    Wd1795,
    Wd1797,
}

impl FdcVariant {
    pub fn has_side_select(&self) -> bool {
        !matches!(self, FdcVariant::Wd1793)
    }

    pub fn part_number(&self) -> u16 {
        match self {
            FdcVariant::Wd1793 => 1793,
            FdcVariant::Wd1795 => 1795,
            FdcVariant::Wd1797 => 1797,
        }
    }
}

impl Display for FdcVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "WD{}", self.part_number())
    }
}

impl FromStr for FdcVariant {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String>
    where
        Self: Sized,
    {
        match s.to_lowercase().trim_start_matches("wd") {
            "1793" => Ok(FdcVariant::Wd1793),
            "1795" => Ok(FdcVariant::Wd1795),
            "1797" => Ok(FdcVariant::Wd1797),
            _ => Err(format!("Bad value for FDC variant: {}", s)),
        }
    }
}

// Accept either a string ("1797", "wd1797") or a bare part number.
impl<'de> serde::Deserialize<'de> for FdcVariant {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FdcVariantVisitor;

        impl serde::de::Visitor<'_> for FdcVariantVisitor {
            type Value = FdcVariant;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("`1793`, `1795` or `1797`")
            }

            fn visit_str<E>(self, value: &str) -> Result<FdcVariant, E>
            where
                E: serde::de::Error,
            {
                FdcVariant::from_str(value).map_err(E::custom)
            }

            fn visit_i64<E>(self, value: i64) -> Result<FdcVariant, E>
            where
                E: serde::de::Error,
            {
                FdcVariant::from_str(&value.to_string()).map_err(E::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<FdcVariant, E>
            where
                E: serde::de::Error,
            {
                FdcVariant::from_str(&value.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(FdcVariantVisitor)
    }
}

fn _default_io_base() -> u16 {
    DEFAULT_IO_BASE
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Wd179xConfig {
    #[serde(default)]
    pub variant: FdcVariant,
    #[serde(default = "_default_io_base")]
    pub io_base: u16,
    #[serde(default)]
    pub interrupt_enable: bool,
    #[serde(default)]
    pub interrupt_vector: u8,
    #[serde(default)]
    pub double_density: bool,
    #[serde(default)]
    pub external_fifo_len: Option<usize>,
}

impl Default for Wd179xConfig {
    fn default() -> Self {
        Self {
            variant: FdcVariant::default(),
            io_base: DEFAULT_IO_BASE,
            interrupt_enable: false,
            interrupt_vector: 0,
            double_density: false,
            external_fifo_len: None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    fdc: Wd179xConfig,
}

impl Wd179xConfig {
    /// Parse a configuration from TOML text containing an `[fdc]` table.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, anyhow::Error> {
        let file: ConfigFile = toml::from_str(toml_str)?;
        file.fdc.validate()?;
        Ok(file.fdc)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let toml_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::from_toml_str(&toml_str).with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.interrupt_vector as usize >= MAX_VECTORS {
            return Err(anyhow!(
                "interrupt_vector {} out of range (0-{})",
                self.interrupt_vector,
                MAX_VECTORS - 1
            ));
        }
        if let Some(len) = self.external_fifo_len {
            if !len.is_power_of_two() {
                return Err(anyhow!("external_fifo_len {} is not a power of two", len));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Wd179xConfig::from_toml_str("[fdc]\n").unwrap();
        assert_eq!(config, Wd179xConfig::default());
        assert_eq!(config.io_base, 0x30);
        assert_eq!(config.variant, FdcVariant::Wd1793);
    }

    #[test]
    fn config_full() {
        let config = Wd179xConfig::from_toml_str(
            r#"
            [fdc]
            variant = "wd1797"
            io_base = 0x40
            interrupt_enable = true
            interrupt_vector = 4
            double_density = true
            external_fifo_len = 4096
            "#,
        )
        .unwrap();
        assert_eq!(config.variant, FdcVariant::Wd1797);
        assert_eq!(config.io_base, 0x40);
        assert!(config.interrupt_enable);
        assert_eq!(config.interrupt_vector, 4);
        assert!(config.double_density);
        assert_eq!(config.external_fifo_len, Some(4096));
    }

    #[test]
    fn config_variant_as_integer() {
        let config = Wd179xConfig::from_toml_str("[fdc]\nvariant = 1795\n").unwrap();
        assert_eq!(config.variant, FdcVariant::Wd1795);
        assert!(config.variant.has_side_select());
    }

    #[test]
    fn config_rejects_bad_values() {
        assert!(Wd179xConfig::from_toml_str("[fdc]\nvariant = \"1791\"\n").is_err());
        assert!(Wd179xConfig::from_toml_str("[fdc]\nexternal_fifo_len = 1000\n").is_err());
        assert!(Wd179xConfig::from_toml_str("[fdc]\ninterrupt_vector = 32\n").is_err());
    }

    #[test]
    fn variant_from_str_and_display() {
        assert_eq!("WD1797".parse::<FdcVariant>(), Ok(FdcVariant::Wd1797));
        assert_eq!("1793".parse::<FdcVariant>(), Ok(FdcVariant::Wd1793));
        assert_eq!(FdcVariant::Wd1795.to_string(), "WD1795");
        assert!(!FdcVariant::Wd1793.has_side_select());
    }
}

//! I2C driver for the NAU7802 averaging front-end.
//!
//! Unlike the bit-banged ADC, this part carries its own PGA and offset
//! machinery: it is configured once (gain, sample rate, channel), runs an
//! internal AFE self-calibration, discards a handful of post-power-up
//! conversions while the analog chain settles, and then serves averaged
//! readings. `read_raw` reports milli-units so the calibration layer above
//! can run with a fixed 1e-3 scale factor.

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::decode24;
use crate::error::{HwError, Result};

const REG_PU_CTRL: u8 = 0x00;
const REG_CTRL1: u8 = 0x01;
const REG_CTRL2: u8 = 0x02;
const REG_ADCO_B2: u8 = 0x12;

// PU_CTRL bits
const PU_RR: u8 = 1 << 0;
const PU_PUD: u8 = 1 << 1;
const PU_PUA: u8 = 1 << 2;
const PU_PUR: u8 = 1 << 3;
const PU_CS: u8 = 1 << 4;
const PU_CR: u8 = 1 << 5;
// CTRL2 bits
const C2_CALS: u8 = 1 << 2;
const C2_CAL_ERR: u8 = 1 << 3;

/// Conversions thrown away after power-up while the AFE settles.
const SETTLE_DISCARD: u32 = 6;

#[derive(Debug, Clone, Copy)]
pub struct Nau7802Cfg {
    pub addr: u16,
    /// PGA gain code (0x07 = x128).
    pub gain: u8,
    /// Sample-rate code (0x00 = 10 SPS).
    pub rate: u8,
    /// Readings averaged per `read_raw` call.
    pub avg_samples: u8,
    /// Counts per physical unit, applied internally before reporting
    /// milli-units.
    pub counts_per_unit: f64,
}

impl Default for Nau7802Cfg {
    fn default() -> Self {
        Self {
            addr: 0x2A,
            gain: 0x07,
            rate: 0x00, // 10 SPS for stability
            avg_samples: 8,
            counts_per_unit: 1000.0,
        }
    }
}

pub struct Nau7802 {
    i2c: rppal::i2c::I2c,
    cfg: Nau7802Cfg,
}

impl Nau7802 {
    /// Open the default I2C bus and bring the part up.
    pub fn open(cfg: Nau7802Cfg) -> Result<Self> {
        let i2c = rppal::i2c::I2c::new().map_err(|e| HwError::I2c(e.to_string()))?;
        Self::new(i2c, cfg)
    }

    pub fn new(mut i2c: rppal::i2c::I2c, cfg: Nau7802Cfg) -> Result<Self> {
        i2c.set_slave_address(cfg.addr)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let mut dev = Self { i2c, cfg };
        dev.init()?;
        Ok(dev)
    }

    fn write_reg(&mut self, reg: u8, val: u8) -> Result<()> {
        self.i2c
            .write(&[reg, val])
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(())
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(&[reg], &mut buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(buf[0])
    }

    fn init(&mut self) -> Result<()> {
        // Register reset, then power up digital + analog.
        self.write_reg(REG_PU_CTRL, PU_RR)?;
        self.write_reg(REG_PU_CTRL, 0)?;
        self.write_reg(REG_PU_CTRL, PU_PUD | PU_PUA)?;
        let deadline = Instant::now() + Duration::from_millis(200);
        while self.read_reg(REG_PU_CTRL)? & PU_PUR == 0 {
            if Instant::now() >= deadline {
                return Err(HwError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        self.write_reg(REG_CTRL1, self.cfg.gain & 0x07)?;
        // Sample rate in CTRL2[6:4]; channel select in CTRL2[7] (channel 1 = 0).
        self.write_reg(REG_CTRL2, (self.cfg.rate & 0x07) << 4)?;
        self.self_calibrate()?;
        self.write_reg(REG_PU_CTRL, PU_PUD | PU_PUA | PU_CS)?;

        // Early conversions after power-up are unusable; discard them.
        for _ in 0..SETTLE_DISCARD {
            let _ = self.read_conversion(Duration::from_millis(500));
        }
        debug!(addr = self.cfg.addr, "nau7802 initialized");
        Ok(())
    }

    fn self_calibrate(&mut self) -> Result<()> {
        let ctrl2 = self.read_reg(REG_CTRL2)?;
        self.write_reg(REG_CTRL2, ctrl2 | C2_CALS)?;
        let deadline = Instant::now() + Duration::from_millis(1000);
        loop {
            let v = self.read_reg(REG_CTRL2)?;
            if v & C2_CALS == 0 {
                if v & C2_CAL_ERR != 0 {
                    return Err(HwError::SelfCalFailed);
                }
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(HwError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn read_conversion(&mut self, timeout: Duration) -> Result<i32> {
        let deadline = Instant::now() + timeout;
        while self.read_reg(REG_PU_CTRL)? & PU_CR == 0 {
            if Instant::now() >= deadline {
                return Err(HwError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        let mut buf = [0u8; 3];
        self.i2c
            .write_read(&[REG_ADCO_B2], &mut buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let bits = (u32::from(buf[0]) << 16) | (u32::from(buf[1]) << 8) | u32::from(buf[2]);
        Ok(decode24(bits))
    }

    /// Averaged reading in milli-units.
    pub fn read_averaged(&mut self, timeout: Duration) -> Result<i32> {
        let n = self.cfg.avg_samples.max(1);
        let mut sum: i64 = 0;
        for _ in 0..n {
            sum += i64::from(self.read_conversion(timeout)?);
        }
        let counts = sum as f64 / f64::from(n);
        let milli = (counts / self.cfg.counts_per_unit * 1000.0).round() as i32;
        trace!(milli, "nau7802 averaged read");
        Ok(milli)
    }
}

impl scale_traits::FrontEnd for Nau7802 {
    fn read_raw(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        self.read_averaged(timeout).map_err(Into::into)
    }
}

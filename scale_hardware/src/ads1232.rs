//! Bit-banged driver for the ADS1232 24-bit bridge ADC.
//!
//! DOUT doubles as the data-ready line: it goes low when a conversion is
//! available. Data is then clocked out MSB-first over 24 SCLK cycles, and
//! one extra pulse starts the next conversion.

use std::time::{Duration, Instant};
use tracing::trace;

use crate::decode24;
use crate::error::{HwError, Result};

pub struct Ads1232 {
    dout: rppal::gpio::InputPin,
    sclk: rppal::gpio::OutputPin,
}

impl Ads1232 {
    /// Claim the GPIO lines by BCM pin number.
    pub fn open(dout_pin: u8, sclk_pin: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let dout = gpio
            .get(dout_pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_input();
        let sclk = gpio
            .get(sclk_pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_output();
        Self::new(dout, sclk)
    }

    pub fn new(dout: rppal::gpio::InputPin, mut sclk: rppal::gpio::OutputPin) -> Result<Self> {
        sclk.set_low(); // clock idle low
        Ok(Self { dout, sclk })
    }

    /// Wait for data-ready (DOUT low) up to `timeout`.
    pub fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while self.dout.is_high() {
            if Instant::now() >= deadline {
                return Err(HwError::Timeout);
            }
            std::thread::sleep(Duration::from_micros(200));
        }
        Ok(())
    }

    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<i32> {
        self.wait_ready(timeout)?;

        // Clock out 24 bits. DOUT is valid immediately after the SCLK
        // falling edge; the sample-after-falling-edge ordering is part of
        // the datasheet contract and must not be reordered.
        let mut bits: u32 = 0;
        for _ in 0..24 {
            self.sclk.set_high();
            bit_delay();
            self.sclk.set_low();
            bit_delay();
            bits = (bits << 1) | u32::from(self.dout.is_high());
        }

        // One extra pulse finishes the frame and starts the next conversion.
        self.sclk.set_high();
        bit_delay();
        self.sclk.set_low();
        bit_delay();

        let value = decode24(bits);
        trace!(raw = value, "ads1232 raw read");
        Ok(value)
    }
}

impl scale_traits::FrontEnd for Ads1232 {
    fn read_raw(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<i32, Box<dyn std::error::Error + Send + Sync>> {
        self.read_with_timeout(timeout).map_err(Into::into)
    }
}

#[inline(always)]
fn bit_delay() {
    // >= 100ns SCLK high/low time per datasheet; a spin hint suffices at
    // GPIO toggle speeds.
    std::hint::spin_loop();
}

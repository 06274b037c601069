use embassy_time::{Duration, Instant};
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, GPIO34};
use esp_hal::Blocking;
use relay_core::{Reading, Sampler};

use super::config::SAMPLES_PER_READING;

/// Upper bound on one conversion; a full batch holds the executor for at
/// most `SAMPLES_PER_READING` times this.
const ADC_CONVERSION_BUDGET: Duration = Duration::from_micros(200);

type SensorAdc = Adc<'static, ADC1<'static>, Blocking>;
type SensorPin = AdcPin<GPIO34<'static>, ADC1<'static>>;

#[derive(Debug)]
pub(crate) enum SampleError {
    ConversionTimeout,
    Batch(relay_core::PayloadError),
}

/// Analog input on GPIO34 (ADC1 channel 6), 11 dB attenuation.
pub(crate) struct AdcSampler {
    adc: SensorAdc,
    pin: SensorPin,
}

impl AdcSampler {
    pub(crate) fn new(adc1: ADC1<'static>, gpio: GPIO34<'static>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(gpio, Attenuation::_11dB);
        Self {
            adc: Adc::new(adc1, config),
            pin,
        }
    }

    fn read_one(&mut self) -> Result<u16, SampleError> {
        let deadline = Instant::now() + ADC_CONVERSION_BUDGET;
        loop {
            if let Ok(raw) = self.adc.read_oneshot(&mut self.pin) {
                return Ok(raw);
            }
            if Instant::now() >= deadline {
                return Err(SampleError::ConversionTimeout);
            }
        }
    }
}

impl Sampler for AdcSampler {
    type Error = SampleError;

    fn sample(&mut self) -> Result<Reading, SampleError> {
        let mut samples = [0u16; SAMPLES_PER_READING];
        for slot in samples.iter_mut() {
            *slot = self.read_one()?;
        }
        Reading::from_samples(&samples).map_err(SampleError::Batch)
    }
}

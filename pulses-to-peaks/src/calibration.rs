//! Conversion of ADC counts above baseline into photoelectrons.
use crate::{Real, parameters::DigitizerSettings};
use dsp_common::Channel;

/// Elementary charge, in C.
pub const ELECTRON_CHARGE: Real = 1.602_176_57e-19;

/// Seconds per ns.
pub const NS: Real = 1.0e-9;

/// Which gain to divide by when converting a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GainChoice {
    /// The channel's calibrated gain. Dead or unknown channels convert to zero.
    #[default]
    Calibrated,
    /// The calibrated gain, or the reference gain if that is zero or unknown.
    ReferenceIfZero,
    /// Always the reference gain.
    Reference,
}

/// Electrons at the photosensor anode per ADC count per sample, before dividing by gain.
pub fn adc_to_electrons(digitizer: &DigitizerSettings) -> Real {
    digitizer.sample_duration * NS * digitizer.voltage_range
        / ((2.0 as Real).powi(digitizer.bits as i32)
            * digitizer.load_resistor
            * digitizer.external_amplification
            * ELECTRON_CHARGE)
}

/// Gives the factor from ADC counts above baseline to photoelectrons per sample.
/// Use as `w_pe = adc_to_pe(..) * w_adc`.
pub fn adc_to_pe(digitizer: &DigitizerSettings, channel: Channel, choice: GainChoice) -> Real {
    let gain = match (choice, digitizer.gain(channel)) {
        (GainChoice::Reference, _) => digitizer.reference_gain,
        (GainChoice::ReferenceIfZero, None) => digitizer.reference_gain,
        (GainChoice::ReferenceIfZero, Some(gain)) if gain == 0.0 => digitizer.reference_gain,
        (_, Some(gain)) => gain,
        (GainChoice::Calibrated, None) => 0.0,
    };
    if gain == 0.0 {
        0.0
    } else {
        adc_to_electrons(digitizer) / gain
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    pub(crate) fn digitizer(gains: Vec<Real>) -> DigitizerSettings {
        DigitizerSettings {
            n_channels: gains.len(),
            sample_duration: 10.0,
            voltage_range: 2.25,
            bits: 14,
            reference_baseline: 16000.0,
            load_resistor: 50.0,
            external_amplification: 10.0,
            reference_gain: 2.0e6,
            gains,
        }
    }

    #[test]
    fn electrons_per_count() {
        // 10 ns * 2.25 V / (16384 * 50 Ohm * 10 * e)
        let expected = 10.0e-9 * 2.25 / (16384.0 * 50.0 * 10.0 * 1.602_176_57e-19);
        assert_approx_eq!(adc_to_electrons(&digitizer(vec![1.0])), expected, 1e-6);
    }

    #[test]
    fn gain_choices() {
        let settings = digitizer(vec![1.0e6, 0.0]);
        let electrons = adc_to_electrons(&settings);

        assert_approx_eq!(adc_to_pe(&settings, 0, GainChoice::Calibrated), electrons / 1.0e6);
        assert_approx_eq!(adc_to_pe(&settings, 0, GainChoice::Reference), electrons / 2.0e6);
        assert_eq!(adc_to_pe(&settings, 1, GainChoice::Calibrated), 0.0);
        assert_approx_eq!(
            adc_to_pe(&settings, 1, GainChoice::ReferenceIfZero),
            electrons / 2.0e6
        );
        assert_eq!(adc_to_pe(&settings, 5, GainChoice::Calibrated), 0.0);
        assert_approx_eq!(
            adc_to_pe(&settings, 5, GainChoice::ReferenceIfZero),
            electrons / 2.0e6
        );
    }
}

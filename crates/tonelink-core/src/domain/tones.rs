//! Byte → note tables and the PCM tone synthesizer.
//!
//! Received payload bytes name notes: lowercase `c`–`b` plus `C` cover one
//! piano octave, `w`–`z` address the drum samples, and digits `1`–`8` the
//! xylophone bank. The connection core treats payloads as opaque; these
//! tables exist for the downstream sound collaborator and for anything else
//! that wants to interpret traffic (tests, a headless logger, a real player).
//!
//! Synthesis is deliberately tiny: a quarter-second full-scale sine at 8 kHz,
//! mono, 16-bit. It exists so a player needs no sample assets for the piano
//! voice.

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 8_000;

/// Number of samples per synthesized tone (250 ms at [`SAMPLE_RATE`]).
pub const TONE_SAMPLES: usize = 2_000;

/// Returns the piano-voice frequency for a payload byte, if it names a note.
///
/// Equal-temperament C4–C5, matching the original sample set.
pub fn tone_frequency(byte: u8) -> Option<f64> {
    let hz = match byte {
        b'c' => 261.30,
        b'd' => 293.66,
        b'e' => 329.63,
        b'f' => 349.23,
        b'g' => 392.00,
        b'a' => 440.00,
        b'b' => 493.88,
        b'C' => 523.25,
        _ => return None,
    };
    Some(hz)
}

/// Returns the sample-bank slot for a payload byte, if it names one.
///
/// | Slots  | Voice     | Bytes        |
/// |--------|-----------|--------------|
/// | 0–7    | piano     | `c`–`b`, `C` |
/// | 8–11   | drums     | `w`–`z`      |
/// | 12–19  | xylophone | `1`–`8`      |
pub fn sample_index(byte: u8) -> Option<u8> {
    let index = match byte {
        b'c' => 0,
        b'd' => 1,
        b'e' => 2,
        b'f' => 3,
        b'g' => 4,
        b'a' => 5,
        b'b' => 6,
        b'C' => 7,
        b'w' => 8,
        b'x' => 9,
        b'y' => 10,
        b'z' => 11,
        b'1'..=b'8' => 12 + (byte - b'1'),
        _ => return None,
    };
    Some(index)
}

/// Synthesizes one tone: [`TONE_SAMPLES`] mono PCM samples at [`SAMPLE_RATE`].
///
/// The output is a full-scale sine; callers that mix several tones must
/// attenuate before summing.
pub fn synthesize(frequency_hz: f64) -> Vec<i16> {
    let step = 2.0 * std::f64::consts::PI * frequency_hz / f64::from(SAMPLE_RATE);
    (0..TONE_SAMPLES)
        .map(|i| {
            let sample = (step * i as f64).sin();
            (sample * f64::from(i16::MAX)) as i16
        })
        .collect()
}

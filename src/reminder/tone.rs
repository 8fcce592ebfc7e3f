use std::time::Duration;

use anyhow::Result;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: u32,
    pub duration: Duration,
}

/// A short series of beeps separated by silence. Playing it blocks the calling thread until the
/// last tone ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneSequence {
    tones: Vec<Tone>,
    gap: Duration,
}

impl Default for ToneSequence {
    fn default() -> Self {
        let duration = Duration::from_millis(90);
        Self::new(
            [660, 880, 1100]
                .into_iter()
                .map(|frequency| Tone {
                    frequency,
                    duration,
                })
                .collect(),
            Duration::from_millis(20),
        )
    }
}

impl ToneSequence {
    pub fn new(tones: Vec<Tone>, gap: Duration) -> Self {
        Self { tones, gap }
    }

    pub fn total_duration(&self) -> Duration {
        let gaps = self.gap * self.tones.len().saturating_sub(1) as u32;
        self.tones.iter().map(|tone| tone.duration).sum::<Duration>() + gaps
    }

    pub fn play(&self) -> Result<()> {
        debug!(
            "Playing {} tones over {:?}",
            self.tones.len(),
            self.total_duration()
        );
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                self.play_beeps()
            } else if #[cfg(feature = "audio")] {
                self.play_sine_waves()
            } else {
                self.ring_bell()
            }
        }
    }

    #[cfg(feature = "win")]
    fn play_beeps(&self) -> Result<()> {
        use windows::Win32::System::Diagnostics::Debug::Beep;

        for (index, tone) in self.tones.iter().enumerate() {
            if index > 0 {
                std::thread::sleep(self.gap);
            }
            unsafe { Beep(tone.frequency, tone.duration.as_millis() as u32) }?;
        }
        Ok(())
    }

    #[cfg(all(feature = "audio", not(feature = "win")))]
    fn play_sine_waves(&self) -> Result<()> {
        use rodio::{
            source::{SineWave, Source, Zero},
            OutputStream, Sink,
        };

        let (_stream, handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&handle)?;
        for (index, tone) in self.tones.iter().enumerate() {
            if index > 0 {
                sink.append(Zero::<f32>::new(1, 48_000).take_duration(self.gap));
            }
            sink.append(
                SineWave::new(tone.frequency as f32)
                    .take_duration(tone.duration)
                    .amplify(0.2),
            );
        }
        sink.sleep_until_end();
        Ok(())
    }

    /// Without an audio backend the terminal bell is the closest thing to a tone.
    #[cfg(not(any(feature = "audio", feature = "win")))]
    fn ring_bell(&self) -> Result<()> {
        use std::io::Write;

        let mut stdout = std::io::stdout().lock();
        for (index, _) in self.tones.iter().enumerate() {
            if index > 0 {
                std::thread::sleep(self.gap);
            }
            stdout.write_all(b"\x07")?;
            stdout.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Tone, ToneSequence};

    #[test]
    fn test_default_sequence_ascends() {
        let sequence = ToneSequence::default();
        assert_eq!(sequence.tones.len(), 3);
        assert!(sequence
            .tones
            .windows(2)
            .all(|pair| pair[0].frequency < pair[1].frequency));
        assert_eq!(sequence.total_duration(), Duration::from_millis(310));
    }

    #[test]
    fn test_total_duration_without_tones() {
        let sequence = ToneSequence::new(vec![], Duration::from_millis(20));
        assert_eq!(sequence.total_duration(), Duration::ZERO);

        let single = ToneSequence::new(
            vec![Tone {
                frequency: 440,
                duration: Duration::from_millis(200),
            }],
            Duration::from_millis(20),
        );
        assert_eq!(single.total_duration(), Duration::from_millis(200));
    }

    #[cfg(any(feature = "win", not(feature = "audio")))]
    #[test]
    fn test_empty_sequence_plays_nothing() {
        ToneSequence::new(vec![], Duration::from_millis(20))
            .play()
            .unwrap();
    }
}

//! Ambient sound scheduling
//!
//! While the game screen is open, a creepy chord plays at random intervals
//! to keep players on edge. This module decides *when* a cue plays and
//! *what* it sounds like; turning a [`Cue`] into audio is left to a
//! [`CuePlayer`] supplied by the front end.

use serde::{Deserialize, Serialize};
use tracing::debug;
use web_time::{Duration, Instant};

use crate::{
    config::SoundSettings,
    constants::{
        sound::{
            CUE_SPREAD_SECS, FADE_IN_SECS, GAIN_SCALE, MAX_VOLUME, MIN_CUE_SECS, MIN_INTERVAL_SECS,
            PREVIEW_CUE_SECS, TAIL_SECS,
        },
        timing::COUNTDOWN_INTERVAL,
    },
};

/// Alarm messages of the sound scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// The random delay elapsed, play a cue
    PlayCue {
        /// Epoch the cue was scheduled under
        epoch: u64,
    },
    /// Refresh the countdown display
    Countdown {
        /// Epoch the tick was scheduled under
        epoch: u64,
    },
}

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
    /// Pure tone
    Sine,
    /// Soft, hollow tone
    Triangle,
    /// Harsh, buzzing tone
    Sawtooth,
}

impl Waveform {
    const LEAD: [Self; 3] = [Self::Sine, Self::Triangle, Self::Sawtooth];
    const BASS: [Self; 2] = [Self::Sine, Self::Triangle];
}

/// Frequencies in Hz of a three-note chord
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Chord {
    /// Main note
    pub lead: f32,
    /// Note a semitone above the lead
    pub dissonant: f32,
    /// Note an octave below the lead
    pub bass: f32,
}

/// The chords a cue picks from, each built around a minor second
pub const CHORDS: [Chord; 5] = [
    Chord {
        lead: 220.0,
        dissonant: 233.0,
        bass: 110.0,
    },
    Chord {
        lead: 174.0,
        dissonant: 185.0,
        bass: 87.0,
    },
    Chord {
        lead: 261.0,
        dissonant: 277.0,
        bass: 130.0,
    },
    Chord {
        lead: 196.0,
        dissonant: 207.0,
        bass: 98.0,
    },
    Chord {
        lead: 146.0,
        dissonant: 155.0,
        bass: 73.0,
    },
];

/// A single oscillator of a cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Voice {
    /// Frequency in Hz
    pub frequency: f32,
    /// Oscillator shape
    pub waveform: Waveform,
}

/// Everything needed to synthesize one cue
///
/// The envelope ramps from silence to `gain` over `fade_in_secs`, back down
/// to silence at `duration_secs`, and the oscillators stop `tail_secs`
/// later.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cue {
    /// Main voice
    pub lead: Voice,
    /// Dissonant middle voice
    pub dissonant: Voice,
    /// Low voice
    pub bass: Voice,
    /// Peak gain between 0 and 0.3
    pub gain: f32,
    /// Time until the envelope is back to silence
    pub duration_secs: f32,
    /// Attack time
    pub fade_in_secs: f32,
    /// Silence after the envelope before the oscillators stop
    pub tail_secs: f32,
}

fn gain(volume: u32) -> f32 {
    volume.min(MAX_VOLUME) as f32 / 100.0 * GAIN_SCALE
}

impl Cue {
    fn with(chord: Chord, lead: Waveform, bass: Waveform, volume: u32, duration_secs: f32) -> Self {
        Self {
            lead: Voice {
                frequency: chord.lead,
                waveform: lead,
            },
            dissonant: Voice {
                frequency: chord.dissonant,
                waveform: Waveform::Sine,
            },
            bass: Voice {
                frequency: chord.bass,
                waveform: bass,
            },
            gain: gain(volume),
            duration_secs,
            fade_in_secs: FADE_IN_SECS,
            tail_secs: TAIL_SECS,
        }
    }

    /// A random chord with random lead and bass shapes, 2 to 3.5 seconds long
    pub fn random(volume: u32) -> Self {
        let chord = CHORDS[fastrand::usize(..CHORDS.len())];
        let lead = Waveform::LEAD[fastrand::usize(..Waveform::LEAD.len())];
        let bass = Waveform::BASS[fastrand::usize(..Waveform::BASS.len())];
        let duration = MIN_CUE_SECS + fastrand::f32() * CUE_SPREAD_SECS;
        Self::with(chord, lead, bass, volume, duration)
    }

    /// The fixed cue played from the setup screen to try out the volume
    pub fn preview(volume: u32) -> Self {
        Self::with(
            CHORDS[0],
            Waveform::Sine,
            Waveform::Triangle,
            volume,
            PREVIEW_CUE_SECS,
        )
    }

    /// Time from start until the oscillators stop
    pub fn total_secs(&self) -> f32 {
        self.duration_secs + self.tail_secs
    }
}

/// Synthesizes cues
pub trait CuePlayer {
    /// Starts playing a cue without waiting for it to finish
    fn play(&mut self, cue: &Cue);
}

/// Something the front end should react to after an alarm
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Event {
    /// A cue started playing
    CuePlayed(Cue),
    /// Whole seconds until the next cue
    Countdown(u64),
}

/// Picks a delay in `[interval_min, interval_max]` seconds, to the millisecond
///
/// The delay is never shorter than one second, even for settings that
/// skipped validation, such as those read from a share link.
pub fn random_delay(settings: &SoundSettings) -> Duration {
    let floor = u64::from(MIN_INTERVAL_SECS) * 1000;
    let min = (u64::from(settings.interval_min) * 1000).max(floor);
    let max = (u64::from(settings.interval_max) * 1000).max(floor);
    Duration::from_millis(fastrand::u64(min.min(max)..=max.max(min)))
}

/// Plays cues at random intervals and counts down to the next one
#[derive(Debug, Default)]
pub struct SoundScheduler {
    epoch: u64,
    settings: Option<SoundSettings>,
    next_cue_at: Option<Instant>,
}

impl SoundScheduler {
    /// Creates a stopped scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cues are being scheduled
    pub fn is_running(&self) -> bool {
        self.settings.is_some()
    }

    /// Starts scheduling cues, discarding any alarm of an earlier run
    pub fn start<F>(&mut self, settings: SoundSettings, now: Instant, mut schedule_message: F)
    where
        F: FnMut(crate::AlarmMessage, Duration),
    {
        self.epoch += 1;
        self.settings = Some(settings);
        self.schedule_cue(now, &mut schedule_message);
        schedule_message(
            AlarmMessage::Countdown { epoch: self.epoch }.into(),
            COUNTDOWN_INTERVAL,
        );
    }

    /// Stops scheduling; pending cues and countdown ticks become no-ops
    pub fn stop(&mut self) {
        self.epoch += 1;
        self.settings = None;
        self.next_cue_at = None;
    }

    /// Whole seconds until the next cue, rounded up
    pub fn remaining_secs(&self, now: Instant) -> Option<u64> {
        let remaining = self.next_cue_at?.saturating_duration_since(now);
        Some(remaining.as_millis().div_ceil(1000) as u64)
    }

    fn schedule_cue<F>(&mut self, now: Instant, schedule_message: &mut F)
    where
        F: FnMut(crate::AlarmMessage, Duration),
    {
        let Some(settings) = &self.settings else {
            return;
        };
        let delay = random_delay(settings);
        self.next_cue_at = Some(now + delay);
        debug!(delay_ms = delay.as_millis() as u64, "next cue scheduled");
        schedule_message(AlarmMessage::PlayCue { epoch: self.epoch }.into(), delay);
    }

    /// Handles a sound alarm
    ///
    /// Returns `None` for alarms of a stopped or restarted scheduler.
    pub fn receive_alarm<F, P>(
        &mut self,
        player: &mut P,
        schedule_message: &mut F,
        message: &AlarmMessage,
        now: Instant,
    ) -> Option<Event>
    where
        F: FnMut(crate::AlarmMessage, Duration),
        P: CuePlayer + ?Sized,
    {
        let settings = self.settings?;

        match *message {
            AlarmMessage::PlayCue { epoch } if epoch == self.epoch => {
                let cue = Cue::random(settings.volume);
                player.play(&cue);
                self.schedule_cue(now, schedule_message);
                Some(Event::CuePlayed(cue))
            }
            AlarmMessage::Countdown { epoch } if epoch == self.epoch => {
                schedule_message(
                    AlarmMessage::Countdown { epoch }.into(),
                    COUNTDOWN_INTERVAL,
                );
                self.remaining_secs(now).map(Event::Countdown)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[derive(Default)]
    struct RecordingPlayer {
        played: Vec<Cue>,
    }

    impl CuePlayer for RecordingPlayer {
        fn play(&mut self, cue: &Cue) {
            self.played.push(*cue);
        }
    }

    type Scheduled = Rc<RefCell<Vec<(crate::AlarmMessage, Duration)>>>;

    fn recorder() -> (Scheduled, impl FnMut(crate::AlarmMessage, Duration)) {
        let scheduled: Scheduled = Rc::default();
        let sink = scheduled.clone();
        (scheduled, move |message, duration| {
            sink.borrow_mut().push((message, duration));
        })
    }

    fn settings(min: u32, max: u32) -> SoundSettings {
        SoundSettings {
            interval_min: min,
            interval_max: max,
            volume: 50,
        }
    }

    fn find(scheduled: &Scheduled, cue: bool) -> (AlarmMessage, Duration) {
        scheduled
            .borrow()
            .iter()
            .rev()
            .find_map(|(message, duration)| match message {
                crate::AlarmMessage::Sound(m @ AlarmMessage::PlayCue { .. }) if cue => {
                    Some((*m, *duration))
                }
                crate::AlarmMessage::Sound(m @ AlarmMessage::Countdown { .. }) if !cue => {
                    Some((*m, *duration))
                }
                _ => None,
            })
            .expect("alarm scheduled")
    }

    #[test]
    fn test_random_delay_in_range() {
        let settings = settings(2, 5);
        for _ in 0..1000 {
            let delay = random_delay(&settings);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay <= Duration::from_secs(5));
        }
        assert_eq!(random_delay(&self::settings(4, 4)), Duration::from_secs(4));
    }

    #[test]
    fn test_random_delay_never_zero() {
        assert_eq!(random_delay(&settings(0, 0)), Duration::from_secs(1));
        for _ in 0..1000 {
            let delay = random_delay(&settings(0, 3));
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(3));
        }
    }

    #[test]
    fn test_random_cue_shape() {
        for _ in 0..200 {
            let cue = Cue::random(100);
            assert!(CHORDS.iter().any(|chord| chord.lead == cue.lead.frequency
                && chord.dissonant == cue.dissonant.frequency
                && chord.bass == cue.bass.frequency));
            assert_eq!(cue.dissonant.waveform, Waveform::Sine);
            assert_ne!(cue.bass.waveform, Waveform::Sawtooth);
            assert!((2.0..=3.5).contains(&cue.duration_secs));
            assert!((cue.gain - 0.3).abs() < f32::EPSILON);
            assert!((cue.total_secs() - cue.duration_secs - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_preview_cue() {
        let cue = Cue::preview(50);
        assert_eq!(cue.lead.frequency, 220.0);
        assert_eq!(cue.dissonant.frequency, 233.0);
        assert_eq!(cue.bass.frequency, 110.0);
        assert_eq!(cue.lead.waveform, Waveform::Sine);
        assert_eq!(cue.bass.waveform, Waveform::Triangle);
        assert!((cue.duration_secs - 2.5).abs() < f32::EPSILON);
        assert!((cue.gain - 0.15).abs() < 1e-6);
        assert!((Cue::preview(0).gain).abs() < f32::EPSILON);
    }

    #[test]
    fn test_start_schedules_cue_and_countdown() {
        let (scheduled, schedule) = recorder();
        let mut scheduler = SoundScheduler::new();
        let now = Instant::now();
        scheduler.start(settings(10, 20), now, schedule);

        assert!(scheduler.is_running());
        let (_, delay) = find(&scheduled, true);
        assert!((Duration::from_secs(10)..=Duration::from_secs(20)).contains(&delay));
        assert_eq!(find(&scheduled, false).1, Duration::from_secs(1));

        let remaining = scheduler.remaining_secs(now).unwrap();
        assert!((10..=20).contains(&remaining));
    }

    #[test]
    fn test_cue_alarm_plays_and_reschedules() {
        let (scheduled, mut schedule) = recorder();
        let mut player = RecordingPlayer::default();
        let mut scheduler = SoundScheduler::new();
        let now = Instant::now();
        scheduler.start(settings(1, 1), now, &mut schedule);

        let (cue, _) = find(&scheduled, true);
        let later = now + Duration::from_secs(1);
        let event = scheduler.receive_alarm(&mut player, &mut schedule, &cue, later);

        assert!(matches!(event, Some(Event::CuePlayed(_))));
        assert_eq!(player.played.len(), 1);
        assert_eq!(scheduled.borrow().len(), 3);
        assert_eq!(scheduler.remaining_secs(later), Some(1));
    }

    #[test]
    fn test_countdown_rounds_up() {
        let (scheduled, mut schedule) = recorder();
        let mut player = RecordingPlayer::default();
        let mut scheduler = SoundScheduler::new();
        let now = Instant::now();
        scheduler.start(settings(5, 5), now, &mut schedule);

        let (tick, _) = find(&scheduled, false);
        let event = scheduler.receive_alarm(
            &mut player,
            &mut schedule,
            &tick,
            now + Duration::from_millis(1500),
        );
        assert_eq!(event, Some(Event::Countdown(4)));

        let event = scheduler.receive_alarm(
            &mut player,
            &mut schedule,
            &tick,
            now + Duration::from_secs(9),
        );
        assert_eq!(event, Some(Event::Countdown(0)));
        assert!(player.played.is_empty());
    }

    #[test]
    fn test_stop_cancels_everything() {
        let (scheduled, mut schedule) = recorder();
        let mut player = RecordingPlayer::default();
        let mut scheduler = SoundScheduler::new();
        let now = Instant::now();
        scheduler.start(settings(1, 2), now, &mut schedule);
        let (cue, _) = find(&scheduled, true);
        let (tick, _) = find(&scheduled, false);

        scheduler.stop();
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.remaining_secs(now), None);
        assert_eq!(
            scheduler.receive_alarm(&mut player, &mut schedule, &cue, now),
            None
        );
        assert_eq!(
            scheduler.receive_alarm(&mut player, &mut schedule, &tick, now),
            None
        );

        scheduler.start(settings(1, 2), now, &mut schedule);
        assert_eq!(
            scheduler.receive_alarm(&mut player, &mut schedule, &cue, now),
            None
        );
        assert!(player.played.is_empty());
        assert_eq!(scheduled.borrow().len(), 4);
    }
}

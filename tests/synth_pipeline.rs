mod common;

use std::collections::VecDeque;

use common::{smf, track, PPQ};
use saavy_midi::dsp::{envelope::Adsr, oscillator::Waveform};
use saavy_midi::engine::{EventSink, ManualClock, Player, PlayerConfig};
use saavy_midi::io::MidiEvent;
use saavy_midi::synth::instruments::{InstrumentDefinition, ProgramEntry};
use saavy_midi::synth::{
    BankResolver, PolySynth, SynthConfig, SynthController, SynthMessage, VoicePhase,
};

type Queue = VecDeque<SynthMessage>;

fn synth(config: SynthConfig) -> PolySynth<Queue> {
    PolySynth::new(config, VecDeque::new())
}

fn pump(controller: &mut SynthController<Queue>, synth: &mut PolySynth<Queue>) {
    synth
        .receiver_mut()
        .extend(controller.sender_mut().drain(..));
}

fn render(synth: &mut PolySynth<Queue>, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0; frames];
    let mut right = vec![0.0; frames];
    synth.render(&mut left, &mut right);
    (left, right)
}

fn peak(buffers: &(Vec<f32>, Vec<f32>)) -> f32 {
    buffers
        .0
        .iter()
        .chain(buffers.1.iter())
        .fold(0.0f32, |acc, s| acc.max(s.abs()))
}

fn note_on(channel: u8, key: u8) -> MidiEvent {
    MidiEvent::NoteOn {
        channel,
        key,
        velocity: 100,
    }
}

fn note_off(channel: u8, key: u8) -> MidiEvent {
    MidiEvent::NoteOff {
        channel,
        key,
        velocity: 0,
    }
}

fn sustain(channel: u8, down: bool) -> MidiEvent {
    MidiEvent::ControlChange {
        channel,
        controller: 64,
        value: if down { 127 } else { 0 },
    }
}

#[test]
fn player_drives_synth_through_release() {
    // Note-off at 1000 ms, file runs until 2000 ms
    let bytes = smf(
        0,
        PPQ,
        &[track(&[
            (0, &[0x90, 60, 100]),
            (960, &[0x80, 60, 0]),
            (960, &[0xFF, 0x01, 0x01, b'x']),
        ])],
    );
    let clock = ManualClock::new();
    let mut player = Player::new(
        SynthController::new(VecDeque::new()),
        clock.clone(),
        PlayerConfig::default(),
    );
    let mut synth = synth(SynthConfig::default());

    player.load(&bytes).unwrap();
    player.set_master_volume(1.0);
    player.play();
    pump(player.sink_mut(), &mut synth);

    let audio = render(&mut synth, 1024);
    assert_eq!(synth.active_voices(), 1);
    assert!(peak(&audio) > 0.0);
    assert!(peak(&audio) <= 1.0);
    assert_ne!(synth.voice_phase(0, 60), Some(VoicePhase::Releasing));

    clock.set(1_000.0);
    player.tick();
    assert!(player.is_playing());
    pump(player.sink_mut(), &mut synth);
    render(&mut synth, 64);
    assert_eq!(synth.voice_phase(0, 60), Some(VoicePhase::Releasing));

    // Piano release plus margin is well under half a second
    render(&mut synth, 24_000);
    assert_eq!(synth.active_voices(), 0);
    assert_eq!(peak(&render(&mut synth, 256)), 0.0);
}

#[test]
fn retriggering_a_key_keeps_one_voice() {
    let mut controller = SynthController::new(VecDeque::new());
    let mut synth = synth(SynthConfig::default());

    for _ in 0..20 {
        controller.channel_event(note_on(3, 64));
        pump(&mut controller, &mut synth);
        render(&mut synth, 32);
        assert_eq!(synth.voice_count(3, 64), 1);
    }
    assert_eq!(synth.active_voices(), 1);
    assert_eq!(synth.stolen_voices(), 0);
}

#[test]
fn voice_limit_steals_oldest() {
    let mut controller = SynthController::new(VecDeque::new());
    let mut synth = synth(SynthConfig::default().max_voices(8));

    for key in 0..100 {
        controller.channel_event(note_on(0, key));
    }
    pump(&mut controller, &mut synth);
    let audio = render(&mut synth, 512);

    assert_eq!(synth.active_voices(), 8);
    assert_eq!(synth.stolen_voices(), 92);
    assert_eq!(synth.voice_count(0, 99), 1);
    assert_eq!(synth.voice_count(0, 0), 0);
    assert!(peak(&audio) <= 1.0);
}

#[test]
fn sustain_pedal_defers_release() {
    let mut controller = SynthController::new(VecDeque::new());
    let mut synth = synth(SynthConfig::default());

    controller.channel_event(sustain(5, true));
    controller.channel_event(note_on(5, 72));
    controller.channel_event(note_off(5, 72));
    pump(&mut controller, &mut synth);
    render(&mut synth, 4_800);
    assert_ne!(synth.voice_phase(5, 72), Some(VoicePhase::Releasing));
    assert!(controller.channel(5).sustain);

    controller.channel_event(sustain(5, false));
    pump(&mut controller, &mut synth);
    render(&mut synth, 32);
    assert_eq!(synth.voice_phase(5, 72), Some(VoicePhase::Releasing));
}

static SPARSE: &[ProgramEntry] = &[
    ProgramEntry {
        program: 0,
        instrument: InstrumentDefinition::new(
            "Zero",
            Waveform::Sine,
            &[],
            Adsr::new(0.01, 0.1, 0.8, 0.2),
        ),
    },
    ProgramEntry {
        program: 88,
        instrument: InstrumentDefinition::new(
            "Eighty-Eight",
            Waveform::Saw,
            &[],
            Adsr::new(0.2, 0.5, 0.6, 1.0),
        ),
    },
];

#[test]
fn missing_program_falls_back_to_nearest_below() {
    let mut controller =
        SynthController::with_resolver(VecDeque::new(), BankResolver::new().with_gm(SPARSE));
    controller.channel_event(MidiEvent::ProgramChange {
        channel: 0,
        program: 91,
    });
    controller.channel_event(note_on(0, 60));

    let name = controller.sender_mut().drain(..).find_map(|m| match m {
        SynthMessage::NoteOn { instrument, .. } => Some(instrument.name),
        _ => None,
    });
    assert_eq!(name, Some("Eighty-Eight"));
}

#[test]
fn master_volume_scales_output_gain() {
    let clock = ManualClock::new();
    let mut player = Player::new(
        SynthController::new(VecDeque::new()),
        clock,
        PlayerConfig::default(),
    );
    let mut synth = synth(SynthConfig::default().master_gain(0.5));

    player.set_master_volume(0.5);
    pump(player.sink_mut(), &mut synth);
    render(&mut synth, 16);
    approx::assert_relative_eq!(synth.master_gain(), 0.25);
}

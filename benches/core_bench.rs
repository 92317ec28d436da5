//! Benchmarks for the tick handler and its building blocks.
//!
//! Run with: cargo bench
//!
//! The tick handler must finish well inside one timer period. At a 2 kHz
//! control rate that is a 500 µs deadline; the full-pool tick below is the
//! worst case the hardware can present (every voice gated, every envelope
//! in a timed stage).

use std::collections::VecDeque;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use polycv::dsp::envelope::{EnvParams, Envelope};
use polycv::dsp::tables::EnvTables;
use polycv::engine::Engine;
use polycv::io::{EqualTuning, RecordingBus};
use polycv::patch::Settings;
use polycv::synth::message::EngineMessage;
use polycv::VOICE_COUNT;

const TICK_HZ: u32 = 2_000;

fn bench_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/tick");

    let mut engine = Engine::new(TICK_HZ, EqualTuning::default());
    let mut bus = RecordingBus::new();
    let mut rx: VecDeque<EngineMessage> = VecDeque::new();
    Settings::default().apply_to(&mut engine, &mut bus);

    // worst case: every voice sounding
    for note in 0..VOICE_COUNT as u8 {
        engine.handle(
            EngineMessage::NoteOn {
                note: 48 + note,
                velocity: u16::MAX,
                internal: true,
            },
            &mut bus,
        );
    }

    group.bench_function("all_voices_gated", |b| {
        b.iter(|| {
            engine.tick(black_box(&mut rx), black_box(&mut bus));
        })
    });

    group.finish();
}

fn bench_note_storm(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/messages");

    group.bench_function("steal_heavy_note_on", |b| {
        let mut engine = Engine::new(TICK_HZ, EqualTuning::default());
        let mut bus = RecordingBus::new();
        Settings::default().apply_to(&mut engine, &mut bus);
        let mut note = 0u8;
        b.iter(|| {
            // pool saturates after the first few; every later call steals
            engine.handle(
                EngineMessage::NoteOn {
                    note: black_box(36 + (note % 32)),
                    velocity: u16::MAX,
                    internal: true,
                },
                &mut bus,
            );
            engine.handle(EngineMessage::NoteOff { note: 36 + (note % 32) }, &mut bus);
            note = note.wrapping_add(1);
        })
    });

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");
    let tables = EnvTables::new(TICK_HZ);

    for (name, exponential) in [("linear", false), ("exponential", true)] {
        let mut env = Envelope::new(&tables);
        env.set_cvs(
            &EnvParams {
                attack: 0xc000,
                decay: 0xc000,
                sustain: 0x8000,
                release: 0xc000,
                level: u16::MAX,
            },
            &tables,
        );
        env.set_shape(exponential);
        env.gate(true);

        group.bench_function(name, |b| {
            b.iter(|| {
                env.update(black_box(&tables));
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_full_tick, bench_note_storm, bench_envelope);
criterion_main!(benches);

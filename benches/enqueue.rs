use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use console_debugger::alert::NoAlert;
use console_debugger::audio::testing::RecordingOutput;
use console_debugger::audio::{SignalGenerator, Waveform};
use console_debugger::console::{render_event, ConsoleSink, RenderedLine};
use console_debugger::queue::WorkQueue;
use console_debugger::sink::format_event;
use console_debugger::{Diagnostics, LogEvent, LoggerConfig, Severity};

struct NullConsole;

impl ConsoleSink for NullConsole {
    fn write_line(&mut self, line: &RenderedLine) -> std::io::Result<()> {
        black_box(line);
        Ok(())
    }
}

/// Producer-side cost; this is what the host pays per call
fn bench_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue");
    group.throughput(Throughput::Elements(1));

    let queue = WorkQueue::new();
    group.bench_function("work_queue_push_pop", |b| {
        b.iter(|| {
            queue.push(black_box(42u64));
            black_box(queue.pop())
        })
    });

    let diagnostics = Diagnostics::builder()
        .console(NullConsole)
        .alert(NoAlert)
        .audio_output(RecordingOutput::instant())
        .build()
        .unwrap();
    group.bench_function("diagnostics_message", |b| {
        b.iter(|| diagnostics.message(black_box("frame rendered")))
    });
    group.bench_function("diagnostics_with_severity_in", |b| {
        b.iter(|| diagnostics.with_severity_in(black_box("packet lost"), Severity::Warning, "Net"))
    });

    group.finish();
    diagnostics.shutdown();
}

/// Consumer-side formatting
fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    let config = LoggerConfig::default();
    let event = LogEvent::new("value out of range, clamping")
        .with_severity(Severity::Critical)
        .in_category("Physics");

    group.bench_function("render_console", |b| {
        b.iter(|| black_box(render_event(&event, &config)))
    });
    group.bench_function("format_csv", |b| {
        b.iter(|| black_box(format_event(&event, &config)))
    });

    group.finish();
}

fn bench_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesis");

    for samples in [2_205usize, 44_100].iter() {
        group.throughput(Throughput::Elements(*samples as u64));
        group.bench_with_input(BenchmarkId::new("sine_burst", samples), samples, |b, &n| {
            let mut generator = SignalGenerator::new(Waveform::Sine, 700.0, 0.9, 44_100);
            b.iter(|| black_box(generator.burst(n, 0.5)))
        });
        group.bench_with_input(BenchmarkId::new("sawtooth_burst", samples), samples, |b, &n| {
            let mut generator = SignalGenerator::new(Waveform::Sawtooth, 440.0, 1.0, 44_100);
            b.iter(|| black_box(generator.burst(n, 1.0)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_enqueue, bench_formatting, bench_synthesis);
criterion_main!(benches);

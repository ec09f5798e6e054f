use barscan::barcode::{Barcode, DecodeOutcome};
use barscan::bitmap::ImageBuffer;
use barscan::job::Job;
use barscan::options::{BarcodeFormat, ReaderOptions};
use barscan::scheduler::{EventLoop, Scheduler};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokio::runtime::Builder;

fn instant_engine(image: &ImageBuffer, _: &ReaderOptions) -> DecodeOutcome {
    Ok(vec![Barcode::new(
        BarcodeFormat::QrCode,
        image.width().to_string(),
    )])
}

fn bench_round_trip(c: &mut Criterion) {
    let rt = Builder::new_current_thread().enable_all().build().unwrap();
    let mut events = EventLoop::new();
    let scheduler = Scheduler::new(instant_engine, events.handle());
    scheduler.start().unwrap();

    let image = ImageBuffer::from_raw(64, 64, 1, vec![0; 64 * 64]).unwrap();

    c.bench_function("submit_and_dispatch", |b| {
        b.iter(|| {
            let job = Job::new(image.clone(), ReaderOptions::default());
            scheduler
                .submit(job, |elapsed_ms, outcome| {
                    black_box((elapsed_ms, outcome));
                    Ok(())
                })
                .unwrap();
            rt.block_on(events.dispatch_next()).unwrap();
        })
    });

    scheduler.stop();
}

fn bench_busy_rejection(c: &mut Criterion) {
    let rt = Builder::new_current_thread().enable_all().build().unwrap();
    let mut events = EventLoop::new();
    let scheduler = Scheduler::new(instant_engine, events.handle());
    scheduler.start().unwrap();

    let image = ImageBuffer::from_raw(8, 8, 1, vec![0; 64]).unwrap();
    scheduler
        .submit(Job::new(image.clone(), ReaderOptions::default()), |_, _| Ok(()))
        .unwrap();

    c.bench_function("submit_while_busy", |b| {
        b.iter(|| {
            let job = Job::new(image.clone(), ReaderOptions::default());
            black_box(scheduler.submit(job, |_, _| Ok(())).is_err())
        })
    });

    rt.block_on(events.dispatch_next());
    scheduler.stop();
}

criterion_group!(benches, bench_round_trip, bench_busy_rejection);
criterion_main!(benches);

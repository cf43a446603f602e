use std::sync::{Arc, Mutex};

use criterion::{criterion_group, criterion_main, Criterion};
use mm_engine::{DeltaQueue, Engine};
use mm_ir::{Delta, Frame, ParamTag, Sysclock, BLOCK_SIZE, OSC_COUNT};

fn busy_engine() -> Engine {
    let queue = Arc::new(Mutex::new(DeltaQueue::new()));
    let mut engine = Engine::new(queue, Sysclock::new());
    for i in 0..OSC_COUNT as u8 {
        engine.apply_now(Delta::new(0, i, ParamTag::Wave, (i % 6) as f32));
        engine.apply_now(Delta::new(0, i, ParamTag::Freq, 110.0 * (i as f32 + 1.0)));
        engine.apply_now(Delta::new(0, i, ParamTag::Trigger, 1.0));
    }
    engine
}

fn bench_render_block(c: &mut Criterion) {
    let mut engine = busy_engine();
    let mut block = [Frame::silence(); BLOCK_SIZE];
    c.bench_function("render_block_full_bank", |b| {
        b.iter(|| engine.render_block(&mut block));
    });
}

fn bench_enqueue_drain(c: &mut Criterion) {
    c.bench_function("queue_enqueue_drain_64", |b| {
        let mut queue = DeltaQueue::new();
        b.iter(|| {
            for i in 0..64u64 {
                queue.enqueue(Delta::new(i, 0, ParamTag::Freq, i as f32));
            }
            let mut out: heapless::Vec<Delta, 64> = heapless::Vec::new();
            queue.drain_due(64, &mut out);
            out.len()
        });
    });
}

criterion_group!(benches, bench_render_block, bench_enqueue_drain);
criterion_main!(benches);

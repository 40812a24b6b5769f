//! Benchmark for message dispatch through the component pipeline.
//!
//! TARGET: 1,000,000 messages per second through three components
//!
//! Run with: cargo bench --package chronicle --bench dispatch_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use chronicle::model::types;
use chronicle::{
    ActorType, Component, ComponentError, ComponentPriority, Kernel, KernelContext, Message, MessageType,
    Ownership,
};

const PING: MessageType = MessageType::new(types::USER_DEFINED_START, "Ping", "Bench");

struct Counter(u64);

impl Component for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn process_message(&mut self, _ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
        if message.is(PING) {
            self.0 += 1;
        }
        Ok(())
    }
}

struct Reader;

impl Component for Reader {
    fn name(&self) -> &str {
        "reader"
    }

    fn process_message(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
        if let Some(id) = message.about_actor {
            black_box(ctx.find_actor(id).is_ok());
        }
        Ok(())
    }
}

fn create_kernel() -> (Kernel, chronicle::ActorId) {
    let mut kernel = Kernel::new();
    kernel.register_message_type(PING).unwrap();
    kernel
        .add_component(chronicle::kernel::DefaultMessageProcessor::new(), ComponentPriority::Highest)
        .unwrap();
    kernel.add_component(Counter(0), ComponentPriority::Normal).unwrap();
    kernel.add_component(Reader, ComponentPriority::Lowest).unwrap();
    let actor = kernel
        .create_actor(ActorType::new("Vehicle", "Tank"), Ownership::Local)
        .unwrap();
    kernel.tick(0.0, 0.0);
    (kernel, actor)
}

fn benchmark_single_tick(c: &mut Criterion) {
    let (mut kernel, actor) = create_kernel();

    c.bench_function("tick_with_one_message", |b| {
        b.iter(|| {
            let msg = kernel.create_message(PING).about(actor).with("n", 1);
            kernel.send_message(msg);
            black_box(kernel.tick(black_box(0.016), 0.016))
        });
    });
}

fn benchmark_batch(c: &mut Criterion) {
    let (mut kernel, actor) = create_kernel();

    let mut group = c.benchmark_group("dispatch_batch");
    group.throughput(Throughput::Elements(10_000));
    group.sample_size(20);

    group.bench_function("10k_messages_one_tick", |b| {
        b.iter(|| {
            for n in 0..10_000 {
                let msg = kernel.create_message(PING).about(actor).with("n", n);
                kernel.send_message(msg);
            }
            black_box(kernel.tick(0.016, 0.016))
        });
    });

    group.finish();
}

fn benchmark_empty_tick(c: &mut Criterion) {
    let (mut kernel, _) = create_kernel();

    c.bench_function("empty_tick", |b| {
        b.iter(|| black_box(kernel.tick(black_box(0.016), 0.016)));
    });
}

criterion_group!(benches, benchmark_single_tick, benchmark_batch, benchmark_empty_tick);
criterion_main!(benches);

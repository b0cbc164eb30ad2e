use std::{hint::black_box, sync::Arc};

use chancaster::{rendezvous, ChanCaster, Scope};
use chancaster_error::StackError;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

/// Брокер с одним потребителем под ключом `chan`, который просто читает.
fn caster_with_consumer(rt: &Runtime) -> Arc<ChanCaster<&'static str, u64>> {
    let _guard = rt.enter();
    let caster = Arc::new(ChanCaster::new(&Scope::root()));
    let task_caster = Arc::clone(&caster);
    caster
        .add("chan", async move {
            if let Some(rx) = task_caster.get(&"chan")? {
                while rx.recv().await.is_some() {}
            }
            Ok::<(), StackError>(())
        })
        .unwrap();
    caster
}

fn bench_rendezvous_handoff(c: &mut Criterion) {
    let rt = runtime();
    let (tx, rx) = rendezvous::<u64>();
    rt.spawn(async move { while rx.recv().await.is_some() {} });

    let tx = &tx;
    c.bench_function("rendezvous_handoff", |b| {
        b.to_async(&rt)
            .iter(|| async move { tx.send(black_box(42)).await.unwrap() })
    });
}

fn bench_publish_roundtrip(c: &mut Criterion) {
    let rt = runtime();
    let caster = caster_with_consumer(&rt);
    let caster = &caster;

    c.bench_function("publish_roundtrip", |b| {
        b.to_async(&rt)
            .iter(|| async move { caster.publish(&"chan", black_box(7)).await.unwrap() })
    });
}

fn bench_publish_unknown_key(c: &mut Criterion) {
    let rt = runtime();
    let caster = caster_with_consumer(&rt);
    let caster = &caster;

    c.bench_function("publish_unknown_key", |b| {
        b.to_async(&rt)
            .iter(|| async move { black_box(caster.publish(&"missing", 7).await.is_err()) })
    });
}

fn bench_add_close(c: &mut Criterion) {
    let rt = runtime();
    let _guard = rt.enter();
    let caster: ChanCaster<u64, u64> = ChanCaster::new(&Scope::root());
    let mut next = 0u64;

    c.bench_function("add_close", |b| {
        b.iter_batched(
            || {
                next += 1;
                next
            },
            |key| {
                caster
                    .add(key, async { Ok::<(), StackError>(()) })
                    .unwrap();
                caster.close(&key).unwrap();
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get(c: &mut Criterion) {
    let rt = runtime();
    let caster = caster_with_consumer(&rt);

    c.bench_function("get_receiver", |b| {
        b.iter(|| black_box(caster.get(&"chan").unwrap()))
    });
}

criterion_group!(
    benches,
    bench_rendezvous_handoff,
    bench_publish_roundtrip,
    bench_publish_unknown_key,
    bench_add_close,
    bench_get,
);
criterion_main!(benches);

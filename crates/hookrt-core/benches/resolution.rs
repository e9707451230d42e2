use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hookrt_core::{use_state, ComponentInstance, DefaultRenderer, HookError, Runtime};

fn resolve_queued_updates(c: &mut Criterion) {
    let runtime = Runtime::new(Arc::new(DefaultRenderer));
    let instance = ComponentInstance::new(&runtime.handle());
    let (_, set) = instance.invoke(|| use_state(0u64)).expect("mount");

    c.bench_function("resolve_64_queued_updates", |b| {
        b.iter(|| {
            for _ in 0..64 {
                set.update(|n| n + 1);
            }
            let (value, _) = instance.invoke(|| use_state(0u64)).expect("update");
            black_box(value);
        });
    });
}

fn eager_bail_out(c: &mut Criterion) {
    let runtime = Runtime::new(Arc::new(DefaultRenderer));
    let instance = ComponentInstance::new(&runtime.handle());
    let (_, set) = instance.invoke(|| use_state(7u64)).expect("mount");

    c.bench_function("eager_bail_out_same_value", |b| {
        b.iter(|| {
            set.set(black_box(7));
            instance.invoke(|| use_state(7u64)).expect("update");
        });
    });
}

fn wide_instance_pass(c: &mut Criterion) {
    let runtime = Runtime::new(Arc::new(DefaultRenderer));
    let instance = ComponentInstance::new(&runtime.handle());
    let body = || -> Result<u64, HookError> {
        let mut total = 0u64;
        for _ in 0..32 {
            total += use_state(1u64)?.0;
        }
        Ok(total)
    };
    instance.invoke(body).expect("mount");

    c.bench_function("update_pass_32_hooks", |b| {
        b.iter(|| black_box(instance.invoke(body).expect("update")));
    });
}

criterion_group!(
    benches,
    resolve_queued_updates,
    eager_bail_out,
    wide_instance_pass
);
criterion_main!(benches);

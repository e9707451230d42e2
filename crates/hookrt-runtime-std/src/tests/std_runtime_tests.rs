use super::{StdRenderer, StdRuntime};
use hookrt_core::{use_state, ComponentInstance, Renderer, RuntimeConfig, Setter};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn std_runtime_requests_frame_and_reinvokes_on_state_change() {
    let runtime = StdRuntime::new();
    let instance = ComponentInstance::new(&runtime.runtime_handle());

    let passes = Rc::new(Cell::new(0u32));
    let setter_slot: Rc<RefCell<Option<Setter<i32>>>> = Rc::new(RefCell::new(None));
    let last_value = Rc::new(Cell::new(-1));

    instance
        .set_content({
            let passes = passes.clone();
            let setter_slot = setter_slot.clone();
            let last_value = last_value.clone();
            move || {
                passes.set(passes.get() + 1);
                let (value, set) = use_state(0)?;
                setter_slot.borrow_mut().replace(set);
                last_value.set(value);
                Ok(())
            }
        })
        .expect("initial pass");
    assert_eq!(passes.get(), 1);
    assert!(!runtime.take_frame_request());

    let set = setter_slot
        .borrow()
        .as_ref()
        .cloned()
        .expect("setter captured during the pass");

    set.set(1);

    assert!(
        runtime.take_frame_request(),
        "set should request a frame"
    );
    assert_eq!(runtime.renderer().take_requested_instances(), vec![instance.id()]);

    assert_eq!(runtime.run_pending_passes().expect("run passes"), 1);
    assert_eq!(passes.get(), 2, "state change should trigger a pass");
    assert_eq!(last_value.get(), 1);
}

#[test]
fn unchanged_state_does_not_request_a_frame() {
    let runtime = StdRuntime::new();
    let instance = ComponentInstance::new(&runtime.runtime_handle());
    let (_, set) = instance.invoke(|| use_state(3)).expect("mount");

    set.set(3);

    assert!(!runtime.take_frame_request());
    assert!(runtime.renderer().take_requested_instances().is_empty());
}

#[test]
fn frame_waker_runs_once_per_batch() {
    let runtime = StdRuntime::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    runtime.set_frame_waker({
        let wakes = Arc::clone(&wakes);
        move || {
            wakes.fetch_add(1, Ordering::SeqCst);
        }
    });

    let instance = ComponentInstance::new(&runtime.runtime_handle());
    let (_, set) = instance.invoke(|| use_state(0)).expect("mount");
    set.update(|n| n + 1);
    set.update(|n| n + 1);
    assert_eq!(wakes.load(Ordering::SeqCst), 1);

    runtime.run_pending_passes().expect("run passes");
    set.update(|n| n + 1);
    assert_eq!(wakes.load(Ordering::SeqCst), 2);

    runtime.clear_frame_waker();
    runtime.run_pending_passes().expect("run passes");
    set.update(|n| n + 1);
    assert_eq!(wakes.load(Ordering::SeqCst), 2);
}

#[test]
fn renderer_can_be_driven_from_another_thread() {
    let renderer = Arc::new(StdRenderer::new());
    let remote = Arc::clone(&renderer);
    let handle = std::thread::spawn(move || remote.take_frame_request());
    assert!(!handle.join().expect("join"));

    let instance = {
        let runtime = StdRuntime::new();
        let instance = ComponentInstance::new(&runtime.runtime_handle());
        instance.id()
    };
    renderer.request_reinvocation(instance);
    let remote = Arc::clone(&renderer);
    let handle = std::thread::spawn(move || remote.take_frame_request());
    assert!(handle.join().expect("join"));
}

#[test]
fn configured_runtime_applies_its_limits() {
    let runtime = StdRuntime::with_config(RuntimeConfig::new().with_eager_bailout(false));
    let instance = ComponentInstance::new(&runtime.runtime_handle());
    let (_, set) = instance.invoke(|| use_state(0)).expect("mount");

    set.set(0);

    assert!(runtime.take_frame_request());
    assert_eq!(runtime.run_pending_passes(), Ok(1));
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use vz_handle::{ForeignHandle, ForeignRuntime, HandleError, RawObject};

#[derive(Default)]
struct Counting {
    releases: AtomicUsize,
}

impl ForeignRuntime for Counting {
    unsafe fn release(&self, _object: RawObject) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn acquire(rt: &Arc<Counting>, token: usize) -> ForeignHandle<Arc<Counting>> {
    ForeignHandle::acquire(Arc::clone(rt), |_| {
        RawObject::from_token(token).ok_or("null object")
    })
    .unwrap()
}

#[test]
fn explicit_release_then_drop_releases_once() {
    let rt = Arc::new(Counting::default());
    let mut h = acquire(&rt, 1);

    h.release();
    assert_eq!(rt.releases.load(Ordering::SeqCst), 1);

    drop(h);
    assert_eq!(rt.releases.load(Ordering::SeqCst), 1);
}

#[test]
fn null_constructor_result_is_an_error() {
    let rt = Arc::new(Counting::default());
    let res = ForeignHandle::acquire(Arc::clone(&rt), |_| {
        RawObject::from_ptr(core::ptr::null_mut()).ok_or("null object")
    });
    assert!(res.is_err());
    assert_eq!(rt.releases.load(Ordering::SeqCst), 0);
}

#[test]
fn released_handle_refuses_access() {
    let rt = Arc::new(Counting::default());
    let mut h = acquire(&rt, 2);
    h.release();
    assert_eq!(h.access(), Err(HandleError::Released));
}

#[test]
fn concurrent_readers_see_the_same_object() {
    let threads = 4;
    let rt = Arc::new(Counting::default());
    let handle = Arc::new(acquire(&rt, 0x1000));
    let start = Arc::new(Barrier::new(threads));

    let mut joins = Vec::with_capacity(threads);
    for _ in 0..threads {
        let handle = Arc::clone(&handle);
        let start = Arc::clone(&start);
        joins.push(thread::spawn(move || {
            start.wait();
            handle.access().map(RawObject::addr)
        }));
    }

    for j in joins {
        assert_eq!(j.join().unwrap(), Ok(0x1000));
    }

    drop(handle);
    assert_eq!(rt.releases.load(Ordering::SeqCst), 1);
}

/// `ForeignHandle<R>` is `Send + Sync` when the runtime is.
#[test]
fn handle_is_send_and_sync_for_thread_safe_runtimes() {
    fn takes_send_sync<S: Send + Sync>(_s: &S) {}
    let rt = Arc::new(Counting::default());
    let h = acquire(&rt, 5);
    takes_send_sync(&h);
}

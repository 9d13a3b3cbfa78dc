use std::cell::{OnceCell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use web_time::Instant;

use crate::FilamentError;

type Task = Box<dyn FnOnce()>;

/// Processed tasks after which the unprocessed tail is moved to the front.
const COMPACT_AFTER: usize = 1024;

/// Something that can schedule a call to [`process_updates`], typically on the
/// next animation frame of the embedding event loop.
pub trait FrameHost {
    fn request_frame(&self);
}

thread_local! {
    static QUEUE: RefCell<Vec<Option<Task>>> = const { RefCell::new(Vec::new()) };
    static FRAME_HOST: OnceCell<Rc<dyn FrameHost>> = const { OnceCell::new() };
}

/// Install the frame host for this thread. Only one install is allowed.
pub fn set_frame_host(host: Rc<dyn FrameHost>) -> Result<(), FilamentError> {
    FRAME_HOST.with(|slot| {
        slot.set(host)
            .map_err(|_| FilamentError::AlreadyConfigured("frame host"))
    })
}

fn request_frame() {
    let host = FRAME_HOST.with(|slot| slot.get().cloned());
    match host {
        Some(host) => host.request_frame(),
        None => log::trace!("update queued with no frame host installed"),
    }
}

/// Append `task` to the update queue. The first task queued after a flush
/// requests a frame from the installed [`FrameHost`].
pub fn queue_update(task: impl FnOnce() + 'static) {
    let was_empty = QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        let was_empty = q.is_empty();
        q.push(Some(Box::new(task)));
        was_empty
    });
    if was_empty {
        request_frame();
    }
}

pub fn has_pending_updates() -> bool {
    QUEUE.with(|q| !q.borrow().is_empty())
}

/// Ends a flush. A normal end clears the queue. When a task panics, only the
/// tasks already taken are dropped: the unprocessed tail stays queued and a
/// frame is requested for it.
struct FlushGuard {
    index: usize,
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let remaining = QUEUE.with(|q| {
                let mut q = q.borrow_mut();
                let end = self.index.min(q.len());
                q.drain(..end);
                q.len()
            });
            if remaining > 0 {
                log::warn!("update pass aborted, {remaining} queued tasks kept for the next pass");
                request_frame();
            }
            return;
        }
        let leftover = QUEUE.with(|q| std::mem::take(&mut *q.borrow_mut()));
        drop(leftover);
    }
}

/// Run every queued task in FIFO order, including tasks queued while the pass
/// is running. A panicking task aborts the pass; tasks after it run on the
/// next one.
pub fn process_updates() {
    let started = Instant::now();
    let mut guard = FlushGuard { index: 0 };
    let mut processed = 0usize;

    loop {
        let index = guard.index;
        let next = QUEUE.with(|q| q.borrow_mut().get_mut(index).map(Option::take));
        let Some(slot) = next else {
            break;
        };
        guard.index += 1;
        if let Some(task) = slot {
            task();
            processed += 1;
        }

        if guard.index > COMPACT_AFTER {
            QUEUE.with(|q| {
                q.borrow_mut().drain(..guard.index);
            });
            guard.index = 0;
        }
    }

    if processed > 0 {
        log::trace!(
            "processed {processed} updates in {:?}",
            started.elapsed()
        );
    }
}

#[derive(Default)]
struct NextUpdateState {
    done: bool,
    waker: Option<Waker>,
}

/// Future returned by [`next_update`].
pub struct NextUpdate {
    state: Rc<RefCell<NextUpdateState>>,
}

impl Future for NextUpdate {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.state.borrow_mut();
        if state.done {
            Poll::Ready(())
        } else {
            state.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

/// Resolves once the next update pass has run everything queued before this call.
pub fn next_update() -> NextUpdate {
    let state = Rc::new(RefCell::new(NextUpdateState::default()));
    let shared = state.clone();
    queue_update(move || {
        let waker = {
            let mut state = shared.borrow_mut();
            state.done = true;
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    });
    NextUpdate { state }
}

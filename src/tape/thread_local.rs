use std::cell::Cell;

use self::sealed::ActiveSlot;
use super::Tape;

thread_local! {
    static TAPE_F32: Cell<*mut Tape<f32>> = const { Cell::new(std::ptr::null_mut()) };
    static TAPE_F64: Cell<*mut Tape<f64>> = const { Cell::new(std::ptr::null_mut()) };
}

mod sealed {
    use std::cell::Cell;
    use std::thread::LocalKey;

    use super::Tape;
    use crate::float::Float;

    /// Access to the raw recording slot stays inside the crate.
    pub trait ActiveSlot: Float {
        fn tape_cell() -> &'static LocalKey<Cell<*mut Tape<Self>>>;
    }

    impl ActiveSlot for f32 {
        fn tape_cell() -> &'static LocalKey<Cell<*mut Tape<Self>>> {
            &super::TAPE_F32
        }
    }

    impl ActiveSlot for f64 {
        fn tape_cell() -> &'static LocalKey<Cell<*mut Tape<Self>>> {
            &super::TAPE_F64
        }
    }
}

/// Float types that can be recorded through [`Traced<F>`](crate::Traced).
///
/// Implemented for `f32` and `f64`, each with its own thread-local
/// recording slot. Sealed: the slot is only ever set by
/// [`crate::record`], so a guard cannot outlive its tape.
///
/// ```compile_fail
/// use adtape::tape::TapeGuard;
/// ```
pub trait TapeThreadLocal: sealed::ActiveSlot {}

impl TapeThreadLocal for f32 {}
impl TapeThreadLocal for f64 {}

/// Access the tape currently recording on this thread.
/// Panics if no tape is active.
#[inline]
pub(crate) fn with_active_tape<F: TapeThreadLocal, R>(f: impl FnOnce(&mut Tape<F>) -> R) -> R {
    F::tape_cell().with(|cell| {
        let ptr = cell.get();
        assert!(
            !ptr.is_null(),
            "No active tape. Use adtape::record() to record a function."
        );
        // SAFETY: TapeGuard keeps the pointee alive and exclusively borrowed
        // for the recording scope; the slot is thread-local.
        let tape = unsafe { &mut *ptr };
        f(tape)
    })
}

/// RAII guard that makes a tape the thread-local recording target.
///
/// Guards nest: dropping one restores whichever tape was active before it.
pub(crate) struct TapeGuard<'a, F: TapeThreadLocal> {
    prev: *mut Tape<F>,
    _tape: std::marker::PhantomData<&'a mut Tape<F>>,
}

impl<'a, F: TapeThreadLocal> TapeGuard<'a, F> {
    /// Activate `tape` for recording.
    pub(crate) fn new(tape: &'a mut Tape<F>) -> Self {
        let prev = F::tape_cell().with(|cell| {
            let prev = cell.get();
            cell.set(tape as *mut Tape<F>);
            prev
        });
        TapeGuard {
            prev,
            _tape: std::marker::PhantomData,
        }
    }
}

impl<F: TapeThreadLocal> Drop for TapeGuard<'_, F> {
    fn drop(&mut self) {
        F::tape_cell().with(|cell| {
            cell.set(self.prev);
        });
    }
}

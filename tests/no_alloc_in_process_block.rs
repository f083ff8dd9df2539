//! Guards the resource-model invariant that `process_block` never
//! allocates (spec §5): "prepare and setValue may allocate ...
//! processBlock must not allocate and must not resize ring buffers".
//!
//! Grounded in the allocation-counting pattern `nih_plug`'s own
//! `assert_process_allocs` feature uses (the mechanism the teacher's
//! `Cargo.toml` already depends on for its plugin binary) — re-derived
//! here with a small counting global allocator, since this crate is a
//! library rather than an `nih_plug` plugin and cannot pull that feature
//! in directly.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use sox_dsp_core::registry::ALL_EFFECT_KINDS;

struct CountingAllocator;

static ALLOC_COUNT: AtomicUsize = AtomicUsize::new(0);
static COUNTING_ENABLED: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if COUNTING_ENABLED.load(Ordering::SeqCst) != 0 {
            ALLOC_COUNT.fetch_add(1, Ordering::SeqCst);
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

#[test]
fn process_block_allocates_nothing_once_prepared() {
    for kind in ALL_EFFECT_KINDS {
        let mut effect = kind.construct();
        effect.prepare(48_000.0);

        let mut buffer = vec![vec![0.0_f64; 256], vec![0.0_f64; 256]];
        // Warm up: the first block after `prepare` may still trigger a
        // lazy settings rebuild in some effects (playhead-moved detection).
        effect.process_block(0.0, &mut buffer);

        ALLOC_COUNT.store(0, Ordering::SeqCst);
        COUNTING_ENABLED.store(1, Ordering::SeqCst);
        effect.process_block(256.0 / 48_000.0, &mut buffer);
        COUNTING_ENABLED.store(0, Ordering::SeqCst);

        let allocations = ALLOC_COUNT.load(Ordering::SeqCst);
        assert_eq!(allocations, 0, "{} allocated {allocations} times inside process_block", kind.name());
    }
}

//! The audio path must not touch the allocator once the graph is
//! scheduled: `run` works entirely out of the preallocated bus pool and
//! scratch buffers.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hexdsp::units::{Gain, HexBlep, Hexwave, HexwaveParams, Output, Phasor};
use hexdsp::{AudioGraph, GraphConfig};

struct CountingAllocator;

static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCATIONS.fetch_add(1, Ordering::SeqCst);
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOCATIONS.fetch_add(1, Ordering::SeqCst);
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

#[test]
fn run_does_not_allocate_after_scheduling() {
    let table = Arc::new(HexBlep::new(32, 32));
    let mut graph = AudioGraph::new(GraphConfig::new(44_100.0, 128));

    let phasor = graph.add(Box::new(Phasor::new(220.0)));
    let voice = graph.add(Box::new(Hexwave::new(
        110.0,
        HexwaveParams::default(),
        table,
    )));
    let gain = graph.add(Box::new(Gain::new(0.25)));
    let output = graph.add(Box::new(Output::new()));
    graph.connect(phasor, gain, 0).unwrap();
    graph.connect(voice, gain, 0).unwrap();
    graph.connect(gain, output, 0).unwrap();
    graph.connect(gain, output, 1).unwrap();
    graph.reschedule().unwrap();

    let mut left = vec![0.0f32; 512];
    let mut right = vec![0.0f32; 512];

    // Warm one call so any lazy one-time setup is out of the picture.
    let mut time = graph.run(0, &[], &mut [&mut left[..], &mut right[..]]);

    let before = ALLOCATIONS.load(Ordering::SeqCst);
    for _ in 0..1_000 {
        time = graph.run(time, &[], &mut [&mut left[..], &mut right[..]]);
    }
    let after = ALLOCATIONS.load(Ordering::SeqCst);

    assert_eq!(before, after, "run allocated on the audio path");
    assert!(left.iter().any(|&x| x != 0.0), "patch produced silence");
}

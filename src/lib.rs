//! An embeddable audio-graph synthesis engine.
//!
//! Units (oscillators, envelopes, gain stages, file players, sinks) are
//! wired into a directed graph; once per host callback the engine
//! serialises the graph, ferries samples between units over a shared
//! bus pool, and fills the host's planar float buffers. The audio path
//! performs no allocation and no I/O after the graph is built.
//!
//! ```no_run
//! use hexdsp::{AudioGraph, GraphConfig};
//! use hexdsp::units::{Output, Phasor};
//!
//! let mut graph = AudioGraph::new(GraphConfig::new(44_100.0, 128));
//! let phasor = graph.add(Box::new(Phasor::new(220.0)));
//! let output = graph.add(Box::new(Output::new()));
//! graph.connect(phasor, output, 0).unwrap();
//! graph.connect(phasor, output, 1).unwrap();
//! graph.reschedule().unwrap();
//!
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! let time = graph.run(0, &[], &mut [&mut left[..], &mut right[..]]);
//! assert_eq!(time, 512);
//! ```
//!
//! Graph mutation and `run` must not overlap; the host arranges that
//! (pause the stream, or drain a command queue at block boundaries).

mod audio;
mod error;
mod graph;
mod pool;
mod traits;
pub mod units;

pub use audio::wav::{SampleData, WavFile, WavFormat};
pub use error::{EngineError, WavError};
pub use graph::{AudioGraph, Connection, GraphConfig, UnitId};
pub use pool::Pool;
pub use traits::{AudioUnit, MAX_UNIT_CHANNELS};

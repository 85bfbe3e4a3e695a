//! Control thread to audio thread parameter handoff
//!
//! Gameplay code produces `AberrationParams` on a control thread; the audio
//! thread must pick them up without locking or allocating. A single-producer
//! single-consumer ring buffer carries whole records, and the audio thread
//! only ever keeps the newest one. Step changes are absorbed by the voice's
//! parameter smoothers.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::params::AberrationParams;
use crate::voice::MidLodKernel;

/// Default number of in-flight parameter records
pub const DEFAULT_HANDOFF_CAPACITY: usize = 8;

/// Create a connected sender/receiver pair
///
/// Allocates the ring once; neither side allocates afterwards.
pub fn param_channel(capacity: usize) -> (ParamSender, ParamReceiver) {
    let ring = HeapRb::<AberrationParams>::new(capacity.max(1));
    let (producer, consumer) = ring.split();
    (ParamSender { producer }, ParamReceiver { consumer })
}

/// Control-thread side
pub struct ParamSender {
    producer: HeapProd<AberrationParams>,
}

impl ParamSender {
    /// Queue a parameter record
    ///
    /// Returns the record back if the ring is full, meaning the audio thread
    /// has not drained it yet. Callers usually just send again next tick.
    pub fn send(&mut self, params: AberrationParams) -> Result<(), AberrationParams> {
        self.producer.try_push(params)
    }

    /// Whether the audio thread still holds the receiver
    pub fn is_connected(&self) -> bool {
        self.producer.read_is_held()
    }
}

/// Audio-thread side
pub struct ParamReceiver {
    consumer: HeapCons<AberrationParams>,
}

impl ParamReceiver {
    /// Drain the ring and return the newest record, if any arrived
    #[inline]
    pub fn latest(&mut self) -> Option<AberrationParams> {
        let mut newest = None;
        while let Some(params) = self.consumer.try_pop() {
            newest = Some(params);
        }
        newest
    }

    /// Number of records waiting
    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }
}

/// A voice wired to a parameter receiver
///
/// Pulls the newest parameters at the top of every block and keeps using the
/// last ones it saw when nothing new arrived.
pub struct LiveVoice {
    kernel: MidLodKernel,
    receiver: ParamReceiver,
    params: AberrationParams,
}

impl LiveVoice {
    pub fn new(kernel: MidLodKernel, receiver: ParamReceiver, initial: AberrationParams) -> Self {
        Self {
            kernel,
            receiver,
            params: initial,
        }
    }

    /// Process one block with the newest available parameters
    #[inline]
    pub fn process(&mut self, output: &mut [f32], input: &[f32]) {
        if let Some(params) = self.receiver.latest() {
            self.params = params;
        }
        self.kernel.process(output, input, &self.params);
    }

    /// Parameters used for the most recent block
    pub fn params(&self) -> &AberrationParams {
        &self.params
    }

    pub fn kernel(&self) -> &MidLodKernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut MidLodKernel {
        &mut self.kernel
    }

    pub fn reset(&mut self) {
        self.kernel.reset();
    }
}

//! The host-side fallback device.
//!
//! Executes the two reduction kernels with the same block/thread structure a
//! GPU would use: every block covers [`ITEMS_PER_BLOCK`] items, every thread
//! folds [`ITEMS_PER_THREAD`] items sequentially, and the per-thread partials
//! fold in thread order. Blocks run on rayon's thread pool, whose work
//! stealing stands in for the persistent-thread launch scheme a GPU driver
//! would use for very large grids. The queue is synchronous: enqueue runs the
//! kernel to completion, so events are plain tokens and dependency ordering
//! holds trivially.

use std::sync::{Arc, PoisonError, RwLock};

use rayon::prelude::*;

use crate::device::{
    Arg, Device, DeviceError, BLOCK_SIZE, ITEMS_PER_BLOCK, ITEMS_PER_THREAD,
    KERNEL_REDUCE_INITIAL, KERNEL_REDUCE_MERGE, REJECT_BYTE,
};

#[derive(Debug, Default)]
pub struct CpuDevice {
    _private: (),
}

impl CpuDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A byte buffer. Cloning the handle shares the storage; the storage is
/// freed when the last handle drops.
#[derive(Clone, Debug)]
pub struct CpuBuffer(Arc<RwLock<Vec<u8>>>);

/// Completion token. The queue is synchronous, so the work is already done
/// by the time one exists.
#[derive(Clone, Copy, Debug)]
pub struct CpuEvent;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CpuKernel {
    ReduceInitial,
    ReduceMerge,
}

impl Device for CpuDevice {
    type Buffer = CpuBuffer;
    type Kernel = CpuKernel;
    type Event = CpuEvent;

    fn name(&self) -> &str {
        "cpu"
    }

    fn create_buffer(&self, size: usize) -> Result<CpuBuffer, DeviceError> {
        Ok(CpuBuffer(Arc::new(RwLock::new(vec![0; size]))))
    }

    fn create_buffer_with_data(&self, data: &[u8]) -> Result<CpuBuffer, DeviceError> {
        Ok(CpuBuffer(Arc::new(RwLock::new(data.to_vec()))))
    }

    fn kernel(&self, name: &str) -> Result<CpuKernel, DeviceError> {
        match name {
            KERNEL_REDUCE_INITIAL => Ok(CpuKernel::ReduceInitial),
            KERNEL_REDUCE_MERGE => Ok(CpuKernel::ReduceMerge),
            _ => Err(DeviceError::UnknownKernel(name.to_owned())),
        }
    }

    fn enqueue(
        &self,
        kernel: &CpuKernel,
        grid: u32,
        block: u32,
        args: &[Arg<'_, Self>],
        _deps: &[CpuEvent],
    ) -> Result<CpuEvent, DeviceError> {
        if block != BLOCK_SIZE {
            return Err(DeviceError::Queue(format!(
                "kernels are compiled for {BLOCK_SIZE}-thread blocks, got {block}"
            )));
        }
        let [Arg::Buffer(input), Arg::U64(size), Arg::Buffer(tables), Arg::U32(merge_size), Arg::Buffer(output)] =
            args
        else {
            return Err(DeviceError::Queue("unexpected kernel arguments".into()));
        };
        let size = *size as usize;
        let n = *merge_size as usize;

        let results = {
            let input = input.0.read().map_err(poisoned)?;
            let tables = tables.0.read().map_err(poisoned)?;
            if tables.len() != 256 + n * n {
                return Err(DeviceError::Queue(format!(
                    "tables buffer is {} bytes, expected {}",
                    tables.len(),
                    256 + n * n
                )));
            }
            if size > input.len() {
                return Err(DeviceError::Queue(format!(
                    "input size {size} exceeds buffer of {} bytes",
                    input.len()
                )));
            }
            let (initial, merge) = tables.split_at(256);
            let initial = match kernel {
                CpuKernel::ReduceInitial => Some(initial),
                CpuKernel::ReduceMerge => None,
            };
            reduce_blocks(&input, size, initial, merge, n, grid as usize)
        };

        let mut output = output.0.write().map_err(poisoned)?;
        if results.len() > output.len() {
            return Err(DeviceError::Queue(format!(
                "output buffer holds {} states, kernel produced {}",
                output.len(),
                results.len()
            )));
        }
        output[..results.len()].copy_from_slice(&results);
        Ok(CpuEvent)
    }

    fn read_buffer(
        &self,
        buffer: &CpuBuffer,
        offset: usize,
        out: &mut [u8],
        _deps: &[CpuEvent],
    ) -> Result<(), DeviceError> {
        let data = buffer.0.read().map_err(poisoned)?;
        match data.get(offset..offset + out.len()) {
            Some(bytes) => {
                out.copy_from_slice(bytes);
                Ok(())
            }
            None => Err(DeviceError::Queue(format!(
                "read of {} bytes at offset {offset} exceeds buffer of {} bytes",
                out.len(),
                data.len()
            ))),
        }
    }
}

fn poisoned<G>(_: PoisonError<G>) -> DeviceError {
    DeviceError::Queue("buffer lock poisoned".into())
}

/// Runs one grid: every block reduces its item window to a single parallel
/// state. `initial` is the byte→state table for the first pass and `None`
/// for the tree passes, whose items already are states.
fn reduce_blocks(
    input: &[u8],
    size: usize,
    initial: Option<&[u8]>,
    merge: &[u8],
    n: usize,
    grid: usize,
) -> Vec<u8> {
    (0..grid)
        .into_par_iter()
        .map(|block| {
            let base = block * ITEMS_PER_BLOCK as usize;
            let mut block_acc: Option<u8> = None;
            for thread in 0..BLOCK_SIZE as usize {
                let from = base + thread * ITEMS_PER_THREAD as usize;
                if from >= size {
                    break;
                }
                // Threads past the input tail contribute nothing; inside a
                // thread the tail truncates the item run.
                let to = (from + ITEMS_PER_THREAD as usize).min(size);
                let mut acc: Option<u8> = None;
                for &item in &input[from..to] {
                    let state = match initial {
                        Some(table) => table[item as usize],
                        None => item,
                    };
                    acc = Some(match acc {
                        None => state,
                        Some(prev) => merge_state(prev, state, merge, n),
                    });
                }
                if let Some(partial) = acc {
                    block_acc = Some(match block_acc {
                        None => partial,
                        Some(prev) => merge_state(prev, partial, merge, n),
                    });
                }
            }
            // The host sizes the grid so every block has at least one item.
            debug_assert!(block_acc.is_some());
            block_acc.unwrap_or(REJECT_BYTE)
        })
        .collect()
}

/// `merge[a][b]`, with the reject byte absorbing from either side.
fn merge_state(a: u8, b: u8, merge: &[u8], n: usize) -> u8 {
    if a == REJECT_BYTE || b == REJECT_BYTE {
        REJECT_BYTE
    } else {
        debug_assert!((a as usize) < n && (b as usize) < n);
        merge[a as usize * n + b as usize]
    }
}

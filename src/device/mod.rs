/*!
The device abstraction the reduction engine drives.

The engine only needs byte buffers, named kernels, event-chained enqueue
and a final readback, so that is the whole contract. A conforming GPU
implementation maps these onto its driver's context/queue/program objects;
[`CpuDevice`](cpu::CpuDevice) is the built-in fallback that executes the
same kernels block-parallel on the host.

## Kernel ABI

Both kernels see parallel states as plain bytes: a state index in
`0 .. merge_size`, or [`REJECT_BYTE`] (`0xFF`) for the absorbing reject
state. The tables buffer is the 256-byte `initial_states` array followed by
the row-major `merge_size × merge_size` merge table. Launch geometry is
`grid` blocks of [`BLOCK_SIZE`] threads; each thread reduces
[`ITEMS_PER_THREAD`] items, so one block covers [`ITEMS_PER_BLOCK`] items
and writes exactly one output byte at `output[block_id]`. The last block
masks items beyond the input size.

Argument layouts:

| index | [`KERNEL_REDUCE_INITIAL`] | [`KERNEL_REDUCE_MERGE`] |
|---|---|---|
| 0 | input bytes | input parallel states |
| 1 | `U64` input size | `U64` input size |
| 2 | tables buffer | tables buffer |
| 3 | `U32` merge size | `U32` merge size |
| 4 | output states | output states |
*/

pub mod cpu;

pub use cpu::CpuDevice;

/// Selects the fallback device, honoring an optional name-substring filter.
///
/// GPU-backed builds enumerate their platform's devices here; this build
/// only knows the CPU fallback, so a filter that does not match its name
/// fails with [`DeviceError::NoDevice`].
pub fn select(filter: Option<&str>) -> Result<CpuDevice, DeviceError> {
    let device = CpuDevice::new();
    match filter {
        Some(name) if !device.name().contains(name) => Err(DeviceError::NoDevice),
        _ => Ok(device),
    }
}

/// Threads per block, shared by host size arithmetic and kernels.
pub const BLOCK_SIZE: u32 = 256;

/// Items reduced sequentially per thread.
pub const ITEMS_PER_THREAD: u32 = 16;

/// Items covered by one block: `BLOCK_SIZE * ITEMS_PER_THREAD`.
pub const ITEMS_PER_BLOCK: u32 = BLOCK_SIZE * ITEMS_PER_THREAD;

/// The reserved parallel-state byte for the absorbing reject state.
pub const REJECT_BYTE: u8 = 0xff;

/// Maps input bytes to per-byte parallel states and reduces each block to
/// one state.
pub const KERNEL_REDUCE_INITIAL: &str = "reduce_initial";

/// Reduces a buffer of parallel states one tree level further.
pub const KERNEL_REDUCE_MERGE: &str = "reduce_merge";

/// An error surfaced by a device.
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("no usable device")]
    NoDevice,
    #[error("no platform available")]
    NoPlatform,
    #[error("out of host memory")]
    OutOfHostMemory,
    #[error("out of device memory")]
    OutOfDeviceMemory,
    #[error("out of device resources")]
    OutOfDeviceResources,
    #[error("kernel build failed: {0}")]
    KernelBuild(String),
    #[error("device compiler not available")]
    CompilerNotAvailable,
    #[error("unknown kernel {0:?}")]
    UnknownKernel(String),
    #[error("queue error: {0}")]
    Queue(String),
}

/// A kernel argument. Passed at enqueue time; an implementation backed by a
/// C-style driver forwards these to its per-index argument setters.
pub enum Arg<'a, D: Device + ?Sized> {
    Buffer(&'a D::Buffer),
    U32(u32),
    U64(u64),
}

/// A compute device: buffers, named kernels, an ordered queue.
///
/// Enqueues are non-blocking and return a completion [`Event`](Device::Event)
/// usable as a dependency of later enqueues; the engine blocks only in
/// [`read_buffer`](Device::read_buffer). Buffers release their device
/// resources on drop, on every exit path.
pub trait Device {
    type Buffer;
    type Kernel;
    type Event: Clone;

    fn name(&self) -> &str;

    fn create_buffer(&self, size: usize) -> Result<Self::Buffer, DeviceError>;

    fn create_buffer_with_data(&self, data: &[u8]) -> Result<Self::Buffer, DeviceError>;

    /// Looks up a built kernel by entry-point name.
    fn kernel(&self, name: &str) -> Result<Self::Kernel, DeviceError>;

    /// Launches `grid` blocks of `block` threads after `deps` complete.
    fn enqueue(
        &self,
        kernel: &Self::Kernel,
        grid: u32,
        block: u32,
        args: &[Arg<'_, Self>],
        deps: &[Self::Event],
    ) -> Result<Self::Event, DeviceError>;

    /// Blocking readback of `out.len()` bytes at `offset` after `deps`
    /// complete.
    fn read_buffer(
        &self,
        buffer: &Self::Buffer,
        offset: usize,
        out: &mut [u8],
        deps: &[Self::Event],
    ) -> Result<(), DeviceError>;
}

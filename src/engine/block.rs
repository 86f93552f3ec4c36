//! The block-parallel reduction engine.
//!
//! The host side of the two-kernel scheme: the initial kernel turns every
//! input block into one parallel state, then reduce passes fold the state
//! array by a factor of [`ITEMS_PER_BLOCK`] per launch until a single state
//! remains. Launches chain through completion events; the host blocks only
//! at the final one-byte readback.

use crate::{
    automata::{subset, thompson},
    device::{
        Arg, Device, DeviceError, BLOCK_SIZE, ITEMS_PER_BLOCK, KERNEL_REDUCE_INITIAL,
        KERNEL_REDUCE_MERGE, REJECT_BYTE,
    },
    engine::MatchError,
    pdfa::{self, BuildError, ParaRef, ParallelDfa, ParallelizeConfig},
    syntax::Pattern,
};

/// A reduction engine on top of a [`Device`].
///
/// `compile` and `matches` are reentrant across engine instances; a single
/// instance serves one match at a time.
pub struct Engine<D: Device> {
    device: D,
    reduce_initial: D::Kernel,
    reduce_merge: D::Kernel,
}

/// A pattern compiled for a particular engine: the host-side [`ParallelDfa`]
/// plus the device-resident tables. Dropping it releases the device
/// resources.
pub struct CompiledPattern<D: Device> {
    pdfa: ParallelDfa,
    tables: D::Buffer,
}

impl<D: Device> CompiledPattern<D> {
    pub fn pdfa(&self) -> &ParallelDfa {
        &self.pdfa
    }
}

impl<D: Device> Engine<D> {
    pub fn new(device: D) -> Result<Self, DeviceError> {
        let reduce_initial = device.kernel(KERNEL_REDUCE_INITIAL)?;
        let reduce_merge = device.kernel(KERNEL_REDUCE_MERGE)?;
        Ok(Self {
            device,
            reduce_initial,
            reduce_merge,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn compile(&self, pattern: &Pattern) -> Result<CompiledPattern<D>, BuildError> {
        self.compile_with(pattern, &ParallelizeConfig::default())
    }

    /// Runs the full pipeline and uploads the tables: 256 bytes of
    /// `initial_states` followed by the row-major merge table, the layout
    /// both kernels expect.
    pub fn compile_with(
        &self,
        pattern: &Pattern,
        config: &ParallelizeConfig,
    ) -> Result<CompiledPattern<D>, BuildError> {
        let nfa = thompson::compile(pattern);
        let dfa = subset::determinize(&nfa);
        let pdfa = pdfa::parallelize_with(&dfa, config)?;

        let n = pdfa.state_count();
        let mut tables = Vec::with_capacity(256 + n * n);
        tables.extend_from_slice(&pdfa.initial_bytes());
        tables.extend_from_slice(&pdfa.merge_bytes());
        let tables = self.device.create_buffer_with_data(&tables)?;

        tracing::debug!(
            device = self.device.name(),
            parallel_states = n,
            table_bytes = 256 + n * n,
            "pattern compiled"
        );
        Ok(CompiledPattern { pdfa, tables })
    }

    /// Decides whole-string acceptance of `haystack`.
    ///
    /// Empty input is decided on the host without touching the device.
    pub fn matches(
        &self,
        pattern: &CompiledPattern<D>,
        haystack: &[u8],
    ) -> Result<bool, MatchError> {
        if haystack.is_empty() {
            return Ok(pattern.pdfa.empty_is_accepting());
        }

        let n = pattern.pdfa.state_count() as u32;
        let input = self.device.create_buffer_with_data(haystack)?;
        let grid = haystack.len().div_ceil(ITEMS_PER_BLOCK as usize);
        let ping = self.device.create_buffer(grid)?;
        let pong = self.device.create_buffer(grid)?;

        tracing::trace!(bytes = haystack.len(), grid, "launching initial kernel");
        let mut event = self.device.enqueue(
            &self.reduce_initial,
            grid as u32,
            BLOCK_SIZE,
            &[
                Arg::Buffer(&input),
                Arg::U64(haystack.len() as u64),
                Arg::Buffer(&pattern.tables),
                Arg::U32(n),
                Arg::Buffer(&ping),
            ],
            &[],
        )?;

        let (mut cur, mut next) = (&ping, &pong);
        let mut size = grid;
        while size > 1 {
            let level_grid = size.div_ceil(ITEMS_PER_BLOCK as usize);
            tracing::trace!(size, grid = level_grid, "launching reduce kernel");
            event = self.device.enqueue(
                &self.reduce_merge,
                level_grid as u32,
                BLOCK_SIZE,
                &[
                    Arg::Buffer(cur),
                    Arg::U64(size as u64),
                    Arg::Buffer(&pattern.tables),
                    Arg::U32(n),
                    Arg::Buffer(next),
                ],
                std::slice::from_ref(&event),
            )?;
            std::mem::swap(&mut cur, &mut next);
            size = level_grid;
        }

        let mut out = [REJECT_BYTE];
        self.device
            .read_buffer(cur, 0, &mut out, std::slice::from_ref(&event))?;
        let state = ParaRef::from_byte(out[0]);
        if !state.is_reject() && state.to_byte() as usize >= pattern.pdfa.state_count() {
            return Err(MatchError::Device(DeviceError::Queue(format!(
                "device returned invalid parallel state {}",
                out[0]
            ))));
        }
        Ok(pattern.pdfa.is_accepting(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{device::CpuDevice, syntax::parse};

    fn engine() -> Engine<CpuDevice> {
        Engine::new(CpuDevice::new()).unwrap()
    }

    fn compile(engine: &Engine<CpuDevice>, pattern: &str) -> CompiledPattern<CpuDevice> {
        engine.compile(&parse(pattern).unwrap()).unwrap()
    }

    #[test]
    fn empty_input_stays_on_host() {
        let engine = engine();
        assert!(engine.matches(&compile(&engine, "a*"), b"").unwrap());
        assert!(!engine.matches(&compile(&engine, "a+"), b"").unwrap());
    }

    #[test]
    fn single_block() {
        let engine = engine();
        let pattern = compile(&engine, "a*b");
        assert!(engine.matches(&pattern, b"b").unwrap());
        assert!(engine.matches(&pattern, b"aaaab").unwrap());
        assert!(!engine.matches(&pattern, b"ba").unwrap());
    }

    #[test]
    fn inputs_across_block_boundaries() {
        let engine = engine();
        let pattern = compile(&engine, "a*b");
        let ipb = ITEMS_PER_BLOCK as usize;
        for len in [ipb - 1, ipb, ipb + 1, 3 * ipb + 7] {
            let mut input = vec![b'a'; len];
            *input.last_mut().unwrap() = b'b';
            assert!(engine.matches(&pattern, &input).unwrap(), "len {len}");
            input[0] = b'b';
            assert!(!engine.matches(&pattern, &input).unwrap(), "len {len}");
        }
    }

    #[test]
    fn two_reduce_levels() {
        // More than ITEMS_PER_BLOCK² bytes forces a second reduce pass.
        let engine = engine();
        let pattern = compile(&engine, "a*");
        let len = (ITEMS_PER_BLOCK as usize).pow(2) + 3;
        let mut input = vec![b'a'; len];
        assert!(engine.matches(&pattern, &input).unwrap());
        input[len / 2] = b'\n';
        assert!(!engine.matches(&pattern, &input).unwrap());
    }

    #[test]
    fn compiled_pattern_survives_many_matches() {
        let engine = engine();
        let pattern = compile(&engine, "(ab)+");
        for repeats in 1..50 {
            let input = b"ab".repeat(repeats);
            assert!(engine.matches(&pattern, &input).unwrap());
            assert!(!engine.matches(&pattern, &input[..input.len() - 1]).unwrap());
        }
    }
}

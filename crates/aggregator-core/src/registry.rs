//! Bidirectional batch root/index map and per-batch response log.
//!
//! Keeping independent locks per map makes it possible to unlock the wrong
//! one on an early-return path, so both maps, the response log, and
//! `next_index` live behind a single lock instead: every `add` is one
//! critical section.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::RegistryError;
use crate::types::{BatchRoot, SignedTaskResponse};

struct BatchRecord {
    root: BatchRoot,
    created_block: u32,
    responses: Vec<SignedTaskResponse>,
    submitted: bool,
}

struct Inner {
    root_to_index: HashMap<BatchRoot, u32>,
    records: Vec<BatchRecord>,
}

impl Inner {
    fn new() -> Self {
        Self {
            root_to_index: HashMap::new(),
            records: Vec::new(),
        }
    }
}

/// Concurrent registry owning the root↔index bijection and response logs.
///
/// Cheap to clone; clones share the same underlying map.
#[derive(Clone)]
pub struct BatchRegistry {
    inner: std::sync::Arc<RwLock<Inner>>,
}

impl Default for BatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(RwLock::new(Inner::new())),
        }
    }

    /// Registers a new batch, assigning it the next dense index.
    ///
    /// # Errors
    /// Returns [`RegistryError::AlreadyExists`] if `root` is already known;
    /// neither map is mutated in that case.
    pub fn add(&self, root: BatchRoot, created_block: u32) -> Result<u32, RegistryError> {
        let mut inner = self.inner.write();

        if inner.root_to_index.contains_key(&root) {
            return Err(RegistryError::AlreadyExists);
        }

        let index = u32::try_from(inner.records.len()).expect("batch index overflowed u32");
        inner.root_to_index.insert(root, index);
        inner.records.push(BatchRecord {
            root,
            created_block,
            responses: Vec::new(),
            submitted: false,
        });

        Ok(index)
    }

    #[must_use]
    pub fn index_of(&self, root: BatchRoot) -> Option<u32> {
        self.inner.read().root_to_index.get(&root).copied()
    }

    #[must_use]
    pub fn root_of(&self, index: u32) -> Option<BatchRoot> {
        self.inner
            .read()
            .records
            .get(index as usize)
            .map(|r| r.root)
    }

    #[must_use]
    pub fn created_block_of(&self, root: BatchRoot) -> Option<u32> {
        let inner = self.inner.read();
        let index = *inner.root_to_index.get(&root)?;
        inner.records.get(index as usize).map(|r| r.created_block)
    }

    /// Appends an operator response to the batch's log.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownBatch`] if `root` has not been registered.
    pub fn append_response(
        &self,
        root: BatchRoot,
        signed: SignedTaskResponse,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        let index = *inner
            .root_to_index
            .get(&root)
            .ok_or(RegistryError::UnknownBatch)?;
        inner.records[index as usize].responses.push(signed);
        Ok(())
    }

    /// Marks a batch's aggregated response as submitted on-chain. Idempotent.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownBatch`] if `root` has not been registered.
    pub fn mark_submitted(&self, root: BatchRoot) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        let index = *inner
            .root_to_index
            .get(&root)
            .ok_or(RegistryError::UnknownBatch)?;
        inner.records[index as usize].submitted = true;
        Ok(())
    }

    #[must_use]
    pub fn is_submitted(&self, root: BatchRoot) -> Option<bool> {
        let inner = self.inner.read();
        let index = *inner.root_to_index.get(&root)?;
        inner.records.get(index as usize).map(|r| r.submitted)
    }

    /// Returns the first response logged for `root` (see design notes on
    /// representative-response selection: first-wins, kept intentionally
    /// arbitrary).
    #[must_use]
    pub fn pick_representative_response(&self, root: BatchRoot) -> Option<SignedTaskResponse> {
        let inner = self.inner.read();
        let index = *inner.root_to_index.get(&root)?;
        inner.records[index as usize].responses.first().cloned()
    }

    #[must_use]
    pub fn response_count(&self, root: BatchRoot) -> usize {
        let inner = self.inner.read();
        inner
            .root_to_index
            .get(&root)
            .map(|&index| inner.records[index as usize].responses.len())
            .unwrap_or(0)
    }

    #[must_use]
    pub fn next_index(&self) -> u32 {
        u32::try_from(self.inner.read().records.len()).expect("batch index overflowed u32")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn root(byte: u8) -> BatchRoot {
        BatchRoot::repeat_byte(byte)
    }

    fn response(r: BatchRoot) -> SignedTaskResponse {
        SignedTaskResponse {
            root: r,
            proof_verified: true,
            metadata: Vec::new(),
            operator_id: BatchRoot::ZERO,
            signature_g1: Vec::new(),
            public_key_g2: Vec::new(),
        }
    }

    #[test]
    fn add_assigns_contiguous_indices() {
        let registry = BatchRegistry::new();
        let r0 = root(0x11);
        let r1 = root(0x22);

        assert_eq!(registry.add(r0, 100).unwrap(), 0);
        assert_eq!(registry.add(r1, 101).unwrap(), 1);
        assert_eq!(registry.next_index(), 2);

        assert_eq!(registry.index_of(r0), Some(0));
        assert_eq!(registry.index_of(r1), Some(1));
        assert_eq!(registry.root_of(0), Some(r0));
        assert_eq!(registry.root_of(1), Some(r1));
    }

    #[test]
    fn duplicate_add_is_rejected_without_mutation() {
        let registry = BatchRegistry::new();
        let r0 = root(0x11);

        assert_eq!(registry.add(r0, 100).unwrap(), 0);
        assert_eq!(registry.add(r0, 999), Err(RegistryError::AlreadyExists));
        assert_eq!(registry.next_index(), 1);
        assert_eq!(registry.created_block_of(r0), Some(100));
    }

    #[test]
    fn append_response_preserves_order() {
        let registry = BatchRegistry::new();
        let r0 = root(0x11);
        registry.add(r0, 100).unwrap();

        for _ in 0..3 {
            registry.append_response(r0, response(r0)).unwrap();
        }

        assert_eq!(registry.response_count(r0), 3);
    }

    #[test]
    fn append_response_unknown_batch_fails() {
        let registry = BatchRegistry::new();
        let result = registry.append_response(root(0xAB), response(root(0xAB)));
        assert_eq!(result, Err(RegistryError::UnknownBatch));
    }

    #[test]
    fn mark_submitted_is_idempotent() {
        let registry = BatchRegistry::new();
        let r0 = root(0x11);
        registry.add(r0, 100).unwrap();

        registry.mark_submitted(r0).unwrap();
        registry.mark_submitted(r0).unwrap();
        assert_eq!(registry.is_submitted(r0), Some(true));
    }

    #[test]
    fn round_trip_root_and_index() {
        let registry = BatchRegistry::new();
        let roots: Vec<_> = (0..10).map(root).collect();
        for (i, &r) in roots.iter().enumerate() {
            assert_eq!(registry.add(r, i as u32).unwrap(), i as u32);
        }

        for (i, &r) in roots.iter().enumerate() {
            let i = i as u32;
            assert_eq!(registry.root_of(registry.index_of(r).unwrap()), Some(r));
            assert_eq!(registry.index_of(registry.root_of(i).unwrap()).unwrap(), i);
        }
    }

    #[test]
    fn concurrent_add_keeps_bijection_consistent() {
        let registry = BatchRegistry::new();
        let threads = 8;
        let per_thread = 50;

        thread::scope(|scope| {
            for t in 0..threads {
                let registry = registry.clone();
                scope.spawn(move || {
                    for i in 0..per_thread {
                        let mut bytes = [0u8; 32];
                        bytes[0] = t as u8;
                        bytes[1..5].copy_from_slice(&(i as u32).to_be_bytes());
                        let r = BatchRoot::from(bytes);
                        registry.add(r, 0).unwrap();
                    }
                });
            }
        });

        let total = threads * per_thread;
        assert_eq!(registry.next_index(), total as u32);

        for index in 0..registry.next_index() {
            let r = registry.root_of(index).unwrap();
            assert_eq!(registry.index_of(r), Some(index));
        }
    }

    #[test]
    fn pick_representative_response_is_first_wins() {
        let registry = BatchRegistry::new();
        let r0 = root(0x11);
        registry.add(r0, 100).unwrap();

        let mut first = response(r0);
        first.metadata = vec![1];
        let mut second = response(r0);
        second.metadata = vec![2];

        registry.append_response(r0, first).unwrap();
        registry.append_response(r0, second).unwrap();

        assert_eq!(
            registry.pick_representative_response(r0).unwrap().metadata,
            vec![1]
        );
    }
}

//! Arena allocator for parse-lifetime strings
//!
//! Every parse owns a single arena. Interior strings (interned tag and
//! attribute names) are bump-allocated into fixed-size pages and released
//! all at once when the owning [`Document`](crate::ast::Document) is
//! dropped. Callers may also supply an external arena to share interned
//! data across multiple parses; the crate never frees an arena it did not
//! create.

use hashbrown::HashMap;
use std::mem;

/// Default size of a freshly mapped page (512 KiB)
pub const DEFAULT_PAGE_SIZE: usize = 512 * 1024;

/// Per-page bookkeeping overhead accounted for when sizing oversized pages
const PAGE_HEADER: usize = 16;

/// Bump allocations are aligned to 8 bytes
const ALIGNMENT: usize = 8;

/// Handle to an arena-allocated string
///
/// Handles are plain indices and stay valid until the arena is reset or
/// dropped. Two handles compare equal iff they reference the same
/// allocation, which for interned strings means the same contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrHandle {
    page: u32,
    offset: u32,
    length: u32,
}

/// The arena allocator
#[derive(Debug)]
pub struct Arena {
    pages: Vec<Vec<u8>>,
    page_size: usize,
    /// Hash map for O(1) interned string lookup (hash -> handle)
    intern_table: HashMap<u64, StrHandle>,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    /// Create a new arena with the default page size
    #[inline]
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a new arena with a specific page size
    pub fn with_page_size(page_size: usize) -> Self {
        let page_size = page_size.max(ALIGNMENT);
        Self {
            pages: vec![Vec::with_capacity(page_size)],
            page_size,
            intern_table: HashMap::new(),
        }
    }

    /// Create an arena sized for a given input length
    ///
    /// Small inputs get a single small page instead of the default
    /// 512 KiB mapping; large inputs keep the default page size so page
    /// turnover stays low.
    pub fn for_input(input_len: usize) -> Self {
        let page_size = input_len.clamp(4096, DEFAULT_PAGE_SIZE);
        Self::with_page_size(page_size)
    }

    /// Number of pages currently mapped
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total bytes handed out so far
    pub fn allocated_bytes(&self) -> usize {
        self.pages.iter().map(|page| page.len()).sum()
    }

    /// Check if nothing has been allocated yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.allocated_bytes() == 0
    }

    /// Reset the arena for reuse
    ///
    /// Drops all pages but the first, clears the first page, and forgets
    /// every interned string. Existing handles become invalid. Allocated
    /// capacity of the first page is retained.
    pub fn reset(&mut self) {
        self.pages.truncate(1);
        self.pages[0].clear();
        self.intern_table.clear();
    }

    /// Allocate a copy of `bytes` and return its handle
    ///
    /// The slot is 8-byte aligned. When the current page cannot fit the
    /// request, a new page of `max(page_size, len + header)` is mapped and
    /// linked.
    pub fn alloc(&mut self, bytes: &[u8]) -> StrHandle {
        let aligned_start = {
            let page = self.pages.last().map(|p| p.len()).unwrap_or(0);
            (page + ALIGNMENT - 1) & !(ALIGNMENT - 1)
        };

        let fits = {
            let page = &self.pages[self.pages.len() - 1];
            aligned_start + bytes.len() <= page.capacity()
        };

        if !fits {
            let new_size = self.page_size.max(bytes.len() + PAGE_HEADER);
            self.pages.push(Vec::with_capacity(new_size));
        }

        let page_index = self.pages.len() - 1;
        let page = &mut self.pages[page_index];
        let start = (page.len() + ALIGNMENT - 1) & !(ALIGNMENT - 1);
        page.resize(start, 0);
        page.extend_from_slice(bytes);

        StrHandle {
            page: page_index as u32,
            offset: start as u32,
            length: bytes.len() as u32,
        }
    }

    /// Intern a string, returning a handle to a single shared copy
    ///
    /// Interning the same string twice returns the same handle.
    pub fn intern(&mut self, s: &str) -> StrHandle {
        let hash = self.hash_str(s);

        if let Some(&handle) = self.intern_table.get(&hash) {
            // Verify it is actually the same string (hash collisions)
            if self.get_bytes(handle) == s.as_bytes() {
                return handle;
            }
        }

        let handle = self.alloc(s.as_bytes());
        self.intern_table.insert(hash, handle);
        handle
    }

    /// Get the bytes behind a handle
    #[inline]
    pub fn get_bytes(&self, handle: StrHandle) -> &[u8] {
        let page = &self.pages[handle.page as usize];
        &page[handle.offset as usize..(handle.offset + handle.length) as usize]
    }

    /// Get the string behind a handle produced by [`Arena::intern`]
    #[inline]
    pub fn get_str(&self, handle: StrHandle) -> &str {
        // Interned data comes from `&str` arguments and is stored unchanged.
        std::str::from_utf8(self.get_bytes(handle)).unwrap_or("")
    }

    /// Get a memory usage estimate
    pub fn memory_usage(&self) -> usize {
        self.pages.iter().map(|page| page.capacity()).sum::<usize>()
            + self.intern_table.capacity() * mem::size_of::<(u64, StrHandle)>()
    }

    #[inline]
    fn hash_str(&self, s: &str) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = ahash::AHasher::default();
        s.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_round_trip() {
        let mut arena = Arena::new();
        let handle = arena.alloc(b"hello");
        assert_eq!(arena.get_bytes(handle), b"hello");
    }

    #[test]
    fn test_alloc_alignment() {
        let mut arena = Arena::new();
        let a = arena.alloc(b"abc");
        let b = arena.alloc(b"def");
        assert_eq!(a.offset % ALIGNMENT as u32, 0);
        assert_eq!(b.offset % ALIGNMENT as u32, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_intern_dedupes() {
        let mut arena = Arena::new();
        let first = arena.intern("div");
        let second = arena.intern("div");
        let other = arena.intern("span");

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(arena.get_str(first), "div");
        assert_eq!(arena.get_str(other), "span");
    }

    #[test]
    fn test_page_growth() {
        let mut arena = Arena::with_page_size(32);
        for i in 0..16 {
            let value = format!("string-number-{i}");
            let handle = arena.alloc(value.as_bytes());
            assert_eq!(arena.get_bytes(handle), value.as_bytes());
        }
        assert!(arena.page_count() > 1);
    }

    #[test]
    fn test_oversized_allocation_gets_own_page() {
        let mut arena = Arena::with_page_size(16);
        let big = vec![b'x'; 1024];
        let handle = arena.alloc(&big);
        assert_eq!(arena.get_bytes(handle), big.as_slice());
    }

    #[test]
    fn test_reset() {
        let mut arena = Arena::new();
        arena.intern("hello");
        arena.intern("world");
        assert!(!arena.is_empty());

        arena.reset();
        assert!(arena.is_empty());
        assert_eq!(arena.page_count(), 1);

        // Interning after reset allocates fresh
        let handle = arena.intern("hello");
        assert_eq!(arena.get_str(handle), "hello");
    }

    #[test]
    fn test_memory_usage() {
        let arena = Arena::new();
        assert!(arena.memory_usage() >= DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_for_input_small() {
        let arena = Arena::for_input(100);
        assert!(arena.memory_usage() < DEFAULT_PAGE_SIZE);
    }
}

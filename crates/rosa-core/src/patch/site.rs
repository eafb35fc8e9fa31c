//! Redirect back-ends
//!
//! A patch site knows how to make calls to one host function land somewhere
//! else and how to undo that. Two kinds exist: rewriting the first bytes of
//! the function with a jump, and swapping a function pointer the host calls
//! through.

use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::error::{Error, Result};

/// `jmp rel32`
const JMP_REL32_LEN: usize = 5;
/// `jmp [rip+0]` followed by the absolute target
const JMP_ABS64_LEN: usize = 14;

pub trait PatchSite {
    /// Route calls to the replacement
    fn apply(&self) -> Result<()>;

    /// Route calls to the original code again
    fn restore(&self) -> Result<()>;

    /// Address that reaches the original code while the site is restored
    fn entry(&self) -> usize;
}

/// Encode a jump located at `from` that lands on `to`
pub fn encode_jump(from: usize, to: usize) -> Vec<u8> {
    let next_ip = from.wrapping_add(JMP_REL32_LEN) as i64;
    let delta = (to as i64).wrapping_sub(next_ip);
    if let Ok(rel) = i32::try_from(delta) {
        let mut code = Vec::with_capacity(JMP_REL32_LEN);
        code.push(0xE9);
        code.extend_from_slice(&rel.to_le_bytes());
        code
    } else {
        let mut code = Vec::with_capacity(JMP_ABS64_LEN);
        code.extend_from_slice(&[0xFF, 0x25, 0x00, 0x00, 0x00, 0x00]);
        code.extend_from_slice(&(to as u64).to_le_bytes());
        code
    }
}

/// Copy `bytes` over code at `address`, lifting page protection for the write
///
/// # Safety
/// `address..address + bytes.len()` must be mapped and must not be executing
/// on another thread.
unsafe fn write_code(address: usize, bytes: &[u8]) -> Result<()> {
    let _guard = region::protect_with_handle(
        address as *const u8,
        bytes.len(),
        region::Protection::READ_WRITE_EXECUTE,
    )
    .map_err(|e| Error::PatchFailed {
        address,
        message: e.to_string(),
    })?;
    unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), address as *mut u8, bytes.len()) };
    Ok(())
}

/// Jump written over the entry of a host function
#[derive(Debug)]
pub struct InlineJump {
    target: usize,
    jump: Vec<u8>,
    original: Vec<u8>,
}

impl InlineJump {
    /// Prepare a jump from `target` to `replacement`, saving the bytes it covers
    ///
    /// # Safety
    /// `target` must be the entry of a function at least as long as the jump
    /// (5 or 14 bytes), mapped readable for that length.
    pub unsafe fn new(target: usize, replacement: usize) -> Result<Self> {
        if target == 0 || replacement == 0 {
            return Err(Error::PatchFailed {
                address: target,
                message: "null address".to_string(),
            });
        }
        let jump = encode_jump(target, replacement);
        let mut original = vec![0u8; jump.len()];
        unsafe { ptr::copy_nonoverlapping(target as *const u8, original.as_mut_ptr(), jump.len()) };
        Ok(Self {
            target,
            jump,
            original,
        })
    }

    pub fn len(&self) -> usize {
        self.jump.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jump.is_empty()
    }
}

impl PatchSite for InlineJump {
    fn apply(&self) -> Result<()> {
        debug!("Writing {} byte jump at {:#x}", self.jump.len(), self.target);
        // SAFETY: the constructor contract covers the patched range.
        unsafe { write_code(self.target, &self.jump) }
    }

    fn restore(&self) -> Result<()> {
        debug!("Restoring original bytes at {:#x}", self.target);
        // SAFETY: as above.
        unsafe { write_code(self.target, &self.original) }
    }

    fn entry(&self) -> usize {
        self.target
    }
}

/// Function-pointer slot the host calls through
#[derive(Debug)]
pub struct DispatchSlot {
    slot: Arc<AtomicUsize>,
    original: usize,
    replacement: usize,
}

impl DispatchSlot {
    pub fn new(slot: Arc<AtomicUsize>, replacement: usize) -> Self {
        let original = slot.load(Ordering::Acquire);
        Self {
            slot,
            original,
            replacement,
        }
    }
}

impl PatchSite for DispatchSlot {
    fn apply(&self) -> Result<()> {
        self.slot.store(self.replacement, Ordering::Release);
        Ok(())
    }

    fn restore(&self) -> Result<()> {
        self.slot.store(self.original, Ordering::Release);
        Ok(())
    }

    fn entry(&self) -> usize {
        self.original
    }
}

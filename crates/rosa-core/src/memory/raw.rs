//! Unchecked typed access to arbitrary process addresses.
//!
//! Nothing here validates that an address is mapped. The only check is
//! against null, which is rejected so a script typo does not fault the host
//! on the most obvious mistake.

use std::ptr;

use bytemuck::Pod;

use crate::error::{Error, Result};

fn non_null(address: usize) -> Result<usize> {
    if address == 0 {
        return Err(Error::InvalidArgument("null address".to_string()));
    }
    Ok(address)
}

/// Read a `T` from `address` without alignment requirements
///
/// # Safety
/// `address..address + size_of::<T>()` must be mapped and readable.
pub unsafe fn read<T: Pod>(address: usize) -> Result<T> {
    let address = non_null(address)?;
    Ok(unsafe { ptr::read_unaligned(address as *const T) })
}

/// Write a `T` to `address` without alignment requirements
///
/// # Safety
/// `address..address + size_of::<T>()` must be mapped and writable.
pub unsafe fn write<T: Pod>(address: usize, value: T) -> Result<()> {
    let address = non_null(address)?;
    unsafe { ptr::write_unaligned(address as *mut T, value) };
    Ok(())
}

/// Copy `len` bytes starting at `address`
///
/// # Safety
/// The whole range must be mapped and readable.
pub unsafe fn read_bytes(address: usize, len: usize) -> Result<Vec<u8>> {
    let address = non_null(address)?;
    let mut buf = vec![0u8; len];
    unsafe { ptr::copy_nonoverlapping(address as *const u8, buf.as_mut_ptr(), len) };
    Ok(buf)
}

/// Overwrite memory at `address` with `bytes`
///
/// # Safety
/// The whole range must be mapped and writable.
pub unsafe fn write_bytes(address: usize, bytes: &[u8]) -> Result<()> {
    let address = non_null(address)?;
    unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), address as *mut u8, bytes.len()) };
    Ok(())
}

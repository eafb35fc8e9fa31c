//! # rosa-shim
//!
//! Shared library loaded into the host server process. Loading it attaches
//! the runtime on the loading thread; `LD_PRELOAD` on Linux and a
//! `DllMain` attach on Windows both run there before the first logic tick.

pub mod attach;

use std::panic;

#[cfg_attr(test, allow(dead_code))]
fn on_load() {
    // Unwinding into the host's loader is undefined behaviour.
    let outcome = panic::catch_unwind(|| {
        if let Err(e) = attach::attach() {
            tracing::error!("Rosa failed to attach: {:#}", e);
        }
    });
    if outcome.is_err() {
        eprintln!("rosa: panic during attach");
    }
}

#[cfg_attr(test, allow(dead_code))]
fn on_unload() {
    let _ = panic::catch_unwind(attach::detach);
}

#[cfg(all(target_os = "linux", not(test)))]
mod init {
    extern "C" fn load() {
        super::on_load();
    }

    extern "C" fn unload() {
        super::on_unload();
    }

    #[used]
    #[unsafe(link_section = ".init_array")]
    static INIT: extern "C" fn() = load;

    #[used]
    #[unsafe(link_section = ".fini_array")]
    static FINI: extern "C" fn() = unload;
}

#[cfg(all(target_os = "windows", not(test)))]
#[unsafe(no_mangle)]
extern "system" fn DllMain(
    _module: windows::Win32::Foundation::HINSTANCE,
    reason: u32,
    _reserved: *mut std::ffi::c_void,
) -> windows::Win32::Foundation::BOOL {
    use windows::Win32::System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH};

    match reason {
        DLL_PROCESS_ATTACH => on_load(),
        DLL_PROCESS_DETACH => on_unload(),
        _ => {}
    }
    windows::Win32::Foundation::TRUE
}

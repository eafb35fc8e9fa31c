//! Location of the host executable's image in the current process

use crate::error::{Error, Result};

/// Base address and mapped length of the host executable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessImage {
    pub base: usize,
    pub len: usize,
    /// Image-relative start of the executable code
    pub code_offset: usize,
    pub code_len: usize,
}

impl ProcessImage {
    /// Locate the main executable image of the current process
    #[cfg(target_os = "linux")]
    pub fn current() -> Result<Self> {
        let exe = std::fs::read_link("/proc/self/exe")?;
        let maps = std::fs::read_to_string("/proc/self/maps")?;
        let exe = exe.to_string_lossy();
        parse_maps(&maps, &exe).ok_or_else(|| Error::ImageNotFound(exe.into_owned()))
    }

    #[cfg(target_os = "windows")]
    pub fn current() -> Result<Self> {
        use windows::Win32::System::LibraryLoader::GetModuleHandleW;
        use windows::Win32::System::ProcessStatus::{GetModuleInformation, MODULEINFO};
        use windows::Win32::System::Threading::GetCurrentProcess;
        use windows::core::PCWSTR;

        let module = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|e| Error::ImageNotFound(e.to_string()))?;
        let mut info = MODULEINFO::default();
        unsafe {
            GetModuleInformation(
                GetCurrentProcess(),
                module,
                &mut info,
                std::mem::size_of::<MODULEINFO>() as u32,
            )
        }
        .map_err(|e| Error::ImageNotFound(e.to_string()))?;

        let len = info.SizeOfImage as usize;
        Ok(Self {
            base: info.lpBaseOfDll as usize,
            len,
            code_offset: 0,
            code_len: len,
        })
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    pub fn current() -> Result<Self> {
        Err(Error::ImageNotFound("unsupported platform".to_string()))
    }

    pub fn end(&self) -> usize {
        self.base + self.len
    }

    pub fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.end()
    }

    /// Absolute address of an image-relative offset.
    ///
    /// Not bounded by `len`: zero-initialised data can be mapped anonymously
    /// just past the file-backed segments.
    pub fn address(&self, offset: usize) -> usize {
        self.base + offset
    }

    /// Executable code of the image, the range signatures are scanned over.
    ///
    /// # Safety
    /// The code range must be mapped and readable, as it is for an image
    /// returned by [`ProcessImage::current`].
    pub unsafe fn code(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts((self.base + self.code_offset) as *const u8, self.code_len)
        }
    }
}

/// Find the span covered by every mapping of `path` in a `/proc/<pid>/maps` listing
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_maps(maps: &str, path: &str) -> Option<ProcessImage> {
    let mut span: Option<(usize, usize)> = None;
    let mut code: Option<(usize, usize)> = None;
    for line in maps.lines() {
        let mut fields = line.split_whitespace();
        let (Some(range), Some(perms)) = (fields.next(), fields.next()) else {
            continue;
        };
        // offset, dev, inode, then the path
        let Some(mapped) = fields.nth(3) else {
            continue;
        };
        if mapped != path {
            continue;
        }
        let Some((start, end)) = range.split_once('-') else {
            continue;
        };
        let (Ok(start), Ok(end)) = (
            usize::from_str_radix(start, 16),
            usize::from_str_radix(end, 16),
        ) else {
            continue;
        };
        span = Some(match span {
            Some((lo, hi)) => (lo.min(start), hi.max(end)),
            None => (start, end),
        });
        if code.is_none() && perms.contains('x') {
            code = Some((start, end));
        }
    }
    let (base, end) = span?;
    let (code_start, code_end) = code.unwrap_or((base, end));
    Some(ProcessImage {
        base,
        len: end - base,
        code_offset: code_start - base,
        code_len: code_end - code_start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
00400000-00452000 r-xp 00000000 08:02 173521      /srv/subrosa/subrosa.x64
00651000-00652000 r--p 00051000 08:02 173521      /srv/subrosa/subrosa.x64
00652000-00655000 rw-p 00052000 08:02 173521      /srv/subrosa/subrosa.x64
00e03000-00e24000 rw-p 00000000 00:00 0           [heap]
7f1c2a000000-7f1c2a021000 r-xp 00000000 08:02 135   /usr/lib/libc.so.6
";

    #[test]
    fn test_parse_maps_spans_all_segments() {
        let image = parse_maps(MAPS, "/srv/subrosa/subrosa.x64").unwrap();
        assert_eq!(image.base, 0x400000);
        assert_eq!(image.end(), 0x655000);
        assert_eq!(image.code_offset, 0);
        assert_eq!(image.code_len, 0x52000);
    }

    #[test]
    fn test_parse_maps_unknown_path() {
        assert!(parse_maps(MAPS, "/srv/other").is_none());
    }

    #[test]
    fn test_address_and_contains() {
        let image = ProcessImage {
            base: 0x1000,
            len: 0x100,
            code_offset: 0,
            code_len: 0x100,
        };
        assert_eq!(image.address(0x10), 0x1010);
        assert!(image.contains(0x10ff));
        assert!(!image.contains(0x1100));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_current_image_contains_own_code() {
        let image = ProcessImage::current().unwrap();
        let here = test_current_image_contains_own_code as usize;
        assert!(image.contains(here));
    }
}

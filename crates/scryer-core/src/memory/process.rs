//! Process handles and the OS process/window boundary.
//!
//! Everything the core needs from the OS goes through [`ProcessProvider`]
//! so tests can substitute a scripted double. [`WindowsProvider`] is the
//! production implementation.

use crate::error::{Error, Result};

/// OS window identifier. Zero or negative means "no usable window".
pub type WindowId = isize;

/// A process visible to enumeration, before attach.
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub window_title: String,
    pub window: WindowId,
}

/// An open, readable handle to a target process.
///
/// Owned exclusively by the process monitor. Dropping it releases the OS
/// handle; reads through a dead handle fail with a typed error.
#[derive(Debug)]
pub struct ProcessHandle {
    pub pid: u32,
    pub base_address: u64,
    pub module_size: u64,
    pub window: WindowId,
    #[cfg(target_os = "windows")]
    raw: windows::Win32::Foundation::HANDLE,
}

impl ProcessHandle {
    #[cfg(test)]
    pub(crate) fn stub(pid: u32, base_address: u64, module_size: u64, window: WindowId) -> Self {
        Self {
            pid,
            base_address,
            module_size,
            window,
            #[cfg(target_os = "windows")]
            raw: Default::default(),
        }
    }
}

#[cfg(target_os = "windows")]
impl Drop for ProcessHandle {
    fn drop(&mut self) {
        use windows::Win32::Foundation::CloseHandle;

        if !self.raw.is_invalid() {
            // SAFETY: the handle was opened by OpenProcess and is closed
            // exactly once here.
            unsafe {
                let _ = CloseHandle(self.raw);
            }
        }
    }
}

/// The OS primitives the core depends on.
pub trait ProcessProvider {
    /// Enumerate processes that own a visible top-level window.
    fn processes(&self) -> Vec<ProcessInfo>;

    /// Open a read handle and locate the main module.
    fn open(&self, info: &ProcessInfo) -> Result<ProcessHandle>;

    /// Whether the process behind the handle has exited.
    fn has_exited(&self, handle: &ProcessHandle) -> bool;

    /// Copy `len` bytes out of the target's address space.
    fn read_bytes(&self, handle: &ProcessHandle, address: u64, len: usize) -> Result<Vec<u8>>;

    /// The window that currently has input focus.
    fn foreground_window(&self) -> WindowId;

    /// Client-area size of a window.
    fn client_rect(&self, window: WindowId) -> Result<(i32, i32)>;

    /// Screen coordinates of a window's client-area origin.
    fn client_origin(&self, window: WindowId) -> Result<(i32, i32)>;
}

/// `ProcessProvider` backed by the Win32 API.
///
/// On other platforms every operation reports [`Error::Unsupported`] and
/// enumeration returns nothing, so attach polling idles harmlessly.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsProvider;

impl ProcessProvider for WindowsProvider {
    fn processes(&self) -> Vec<ProcessInfo> {
        enumerate_processes()
    }

    fn open(&self, info: &ProcessInfo) -> Result<ProcessHandle> {
        open_process(info)
    }

    fn has_exited(&self, handle: &ProcessHandle) -> bool {
        process_has_exited(handle)
    }

    fn read_bytes(&self, handle: &ProcessHandle, address: u64, len: usize) -> Result<Vec<u8>> {
        read_process_memory(handle, address, len)
    }

    fn foreground_window(&self) -> WindowId {
        foreground_window()
    }

    fn client_rect(&self, window: WindowId) -> Result<(i32, i32)> {
        client_rect(window)
    }

    fn client_origin(&self, window: WindowId) -> Result<(i32, i32)> {
        client_origin(window)
    }
}

/// Enumerate processes that own a visible top-level window.
///
/// One `EnumWindows` pass collects (pid, window, title) for every visible
/// window, then a toolhelp snapshot supplies the executable names.
#[cfg(target_os = "windows")]
fn enumerate_processes() -> Vec<ProcessInfo> {
    use std::collections::HashMap;
    use windows::Win32::Foundation::LPARAM;
    use windows::Win32::System::Diagnostics::ToolHelp::{
        CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
        TH32CS_SNAPPROCESS,
    };
    use windows::Win32::UI::WindowsAndMessaging::EnumWindows;

    WINDOW_LIST.with(|cell| cell.borrow_mut().clear());

    // SAFETY: EnumWindows calls collect_windows for each top-level window;
    // the callback only touches the thread-local list.
    unsafe {
        let _ = EnumWindows(Some(collect_windows), LPARAM(0));
    }

    let windows_by_pid: HashMap<u32, (isize, String)> = WINDOW_LIST.with(|cell| {
        cell.borrow()
            .iter()
            .map(|(pid, hwnd, title)| (*pid, (*hwnd, title.clone())))
            .collect()
    });

    let mut result = Vec::new();

    // SAFETY: snapshot handles from CreateToolhelp32Snapshot are iterated
    // with Process32FirstW/Process32NextW and closed below.
    unsafe {
        let Ok(snapshot) = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) else {
            return result;
        };

        let mut entry = PROCESSENTRY32W {
            dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                if let Some((window, title)) = windows_by_pid.get(&entry.th32ProcessID) {
                    let len = entry
                        .szExeFile
                        .iter()
                        .position(|&c| c == 0)
                        .unwrap_or(entry.szExeFile.len());
                    let name = String::from_utf16_lossy(&entry.szExeFile[..len]);
                    result.push(ProcessInfo {
                        pid: entry.th32ProcessID,
                        name,
                        window_title: title.clone(),
                        window: *window,
                    });
                }
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }

        let _ = windows::Win32::Foundation::CloseHandle(snapshot);
    }

    result
}

#[cfg(target_os = "windows")]
thread_local! {
    static WINDOW_LIST: std::cell::RefCell<Vec<(u32, isize, String)>> =
        const { std::cell::RefCell::new(Vec::new()) };
}

#[cfg(target_os = "windows")]
unsafe extern "system" fn collect_windows(
    hwnd: windows::Win32::Foundation::HWND,
    _lparam: windows::Win32::Foundation::LPARAM,
) -> windows::Win32::Foundation::BOOL {
    use windows::Win32::Foundation::BOOL;
    use windows::Win32::UI::WindowsAndMessaging::{
        GetWindowTextW, GetWindowThreadProcessId, IsWindowVisible,
    };

    // SAFETY: all three calls accept any HWND delivered by EnumWindows.
    unsafe {
        if !IsWindowVisible(hwnd).as_bool() {
            return BOOL(1);
        }

        let mut pid: u32 = 0;
        GetWindowThreadProcessId(hwnd, Some(&mut pid));
        if pid == 0 {
            return BOOL(1);
        }

        let mut buffer = [0u16; 256];
        let len = GetWindowTextW(hwnd, &mut buffer) as usize;
        if len == 0 {
            return BOOL(1);
        }
        let title = String::from_utf16_lossy(&buffer[..len]);

        WINDOW_LIST.with(|cell| {
            cell.borrow_mut().push((pid, hwnd.0 as isize, title));
        });
    }

    windows::Win32::Foundation::BOOL(1)
}

/// Open a read handle to the process and locate its main module.
#[cfg(target_os = "windows")]
fn open_process(info: &ProcessInfo) -> Result<ProcessHandle> {
    use windows::Win32::System::ProcessStatus::{
        K32EnumProcessModules, K32GetModuleInformation, MODULEINFO,
    };
    use windows::Win32::System::Threading::{
        OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
    };

    // SAFETY: OpenProcess returns an owned handle; it is stored in the
    // ProcessHandle and closed on drop.
    let raw = unsafe {
        OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, info.pid)
    }
    .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", info.pid, e)))?;

    let mut module = windows::Win32::Foundation::HMODULE::default();
    let mut needed = 0u32;

    // SAFETY: the first module returned by K32EnumProcessModules is the
    // main executable image.
    let ok = unsafe {
        K32EnumProcessModules(
            raw,
            &mut module,
            std::mem::size_of::<windows::Win32::Foundation::HMODULE>() as u32,
            &mut needed,
        )
    };
    if !ok.as_bool() {
        // SAFETY: close the handle we just opened before bailing.
        unsafe {
            let _ = windows::Win32::Foundation::CloseHandle(raw);
        }
        return Err(Error::ProcessOpenFailed(format!(
            "pid {}: cannot enumerate modules",
            info.pid
        )));
    }

    let mut module_info = MODULEINFO::default();
    // SAFETY: module came from K32EnumProcessModules on the same handle.
    let ok = unsafe {
        K32GetModuleInformation(
            raw,
            module,
            &mut module_info,
            std::mem::size_of::<MODULEINFO>() as u32,
        )
    };
    if !ok.as_bool() {
        // SAFETY: as above.
        unsafe {
            let _ = windows::Win32::Foundation::CloseHandle(raw);
        }
        return Err(Error::ProcessOpenFailed(format!(
            "pid {}: cannot query main module",
            info.pid
        )));
    }

    Ok(ProcessHandle {
        pid: info.pid,
        base_address: module_info.lpBaseOfDll as u64,
        module_size: module_info.SizeOfImage as u64,
        window: info.window,
        raw,
    })
}

#[cfg(target_os = "windows")]
fn process_has_exited(handle: &ProcessHandle) -> bool {
    use windows::Win32::Foundation::WAIT_OBJECT_0;
    use windows::Win32::System::Threading::WaitForSingleObject;

    // SAFETY: a zero timeout makes this a non-blocking liveness probe.
    unsafe { WaitForSingleObject(handle.raw, 0) == WAIT_OBJECT_0 }
}

#[cfg(target_os = "windows")]
fn read_process_memory(handle: &ProcessHandle, address: u64, len: usize) -> Result<Vec<u8>> {
    use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;

    let mut buffer = vec![0u8; len];
    let mut read = 0usize;

    // SAFETY: the destination buffer is exactly `len` bytes; a failed or
    // short read is surfaced as an error below.
    let result = unsafe {
        ReadProcessMemory(
            handle.raw,
            address as *const core::ffi::c_void,
            buffer.as_mut_ptr() as *mut core::ffi::c_void,
            len,
            Some(&mut read),
        )
    };

    match result {
        Ok(()) if read == len => Ok(buffer),
        Ok(()) => Err(Error::MemoryReadFailed {
            address,
            message: format!("short read: {} of {} bytes", read, len),
        }),
        Err(e) => Err(Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        }),
    }
}

#[cfg(target_os = "windows")]
fn foreground_window() -> WindowId {
    use windows::Win32::UI::WindowsAndMessaging::GetForegroundWindow;

    // SAFETY: GetForegroundWindow is always safe to call.
    let hwnd = unsafe { GetForegroundWindow() };
    hwnd.0 as isize
}

#[cfg(target_os = "windows")]
fn client_rect(window: WindowId) -> Result<(i32, i32)> {
    use windows::Win32::Foundation::{HWND, RECT};
    use windows::Win32::UI::WindowsAndMessaging::GetClientRect;

    let hwnd = HWND(window as *mut core::ffi::c_void);
    let mut rect = RECT::default();

    // SAFETY: GetClientRect fills the RECT for any window handle; failure
    // means the window is gone.
    unsafe {
        GetClientRect(hwnd, &mut rect).map_err(|e| Error::ProcessNotFound(e.to_string()))?;
    }

    Ok((rect.right - rect.left, rect.bottom - rect.top))
}

#[cfg(target_os = "windows")]
fn client_origin(window: WindowId) -> Result<(i32, i32)> {
    use windows::Win32::Foundation::{HWND, POINT};
    use windows::Win32::Graphics::Gdi::ClientToScreen;

    let hwnd = HWND(window as *mut core::ffi::c_void);
    let mut point = POINT::default();

    // SAFETY: ClientToScreen maps the client origin for any window handle.
    let ok = unsafe { ClientToScreen(hwnd, &mut point) };
    if !ok.as_bool() {
        return Err(Error::ProcessNotFound("window client origin lost".to_string()));
    }

    Ok((point.x, point.y))
}

// --- Non-Windows stubs ---

#[cfg(not(target_os = "windows"))]
fn enumerate_processes() -> Vec<ProcessInfo> {
    Vec::new()
}

#[cfg(not(target_os = "windows"))]
fn open_process(_info: &ProcessInfo) -> Result<ProcessHandle> {
    Err(Error::Unsupported("process attach"))
}

#[cfg(not(target_os = "windows"))]
fn process_has_exited(_handle: &ProcessHandle) -> bool {
    true
}

#[cfg(not(target_os = "windows"))]
fn read_process_memory(_handle: &ProcessHandle, address: u64, _len: usize) -> Result<Vec<u8>> {
    Err(Error::MemoryReadFailed {
        address,
        message: "not supported on this platform".to_string(),
    })
}

#[cfg(not(target_os = "windows"))]
fn foreground_window() -> WindowId {
    0
}

#[cfg(not(target_os = "windows"))]
fn client_rect(_window: WindowId) -> Result<(i32, i32)> {
    Err(Error::Unsupported("window geometry"))
}

#[cfg(not(target_os = "windows"))]
fn client_origin(_window: WindowId) -> Result<(i32, i32)> {
    Err(Error::Unsupported("window geometry"))
}

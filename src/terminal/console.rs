//! Windows console input with console-mode echo control

use std::io::{self, Write};
use std::ptr;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{
    CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows_sys::Win32::System::Console::{
    CONSOLE_MODE, ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT, ENABLE_PROCESSED_INPUT, GetConsoleMode,
    ReadConsoleW, SetConsoleMode,
};
use zeroize::Zeroize;

use super::Terminal;
use crate::error::{ErrorKind, PassphraseError, Result};

/// Ctrl-C arrives as a plain unit once processed input is off; it ends the entry.
const CTRL_C: u16 = 0x03;

/// Moves a freshly read unit out of the read buffer, wiping the buffer.
fn take_unit(unit: &mut u16, read: u32) -> Option<u16> {
    let value = *unit;
    unit.zeroize();
    if read == 0 || value == CTRL_C {
        return None;
    }
    Some(value)
}

/// The console input buffer (`CONIN$`), even when stdin is redirected.
///
/// Disabling echo also turns off line and processed input so units arrive
/// one at a time. Prompts go to standard error.
pub struct ConsoleTerminal {
    handle: HANDLE,
    saved: CONSOLE_MODE,
    echo_switched: bool,
}

impl ConsoleTerminal {
    pub fn open() -> Result<Self> {
        let name: Vec<u16> = "CONIN$".encode_utf16().chain(Some(0)).collect();
        // SAFETY: name is NUL-terminated and outlives the call.
        let handle = unsafe {
            CreateFileW(
                name.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                ptr::null(),
                OPEN_EXISTING,
                0,
                ptr::null_mut(),
            )
        };
        if handle == INVALID_HANDLE_VALUE {
            let e = io::Error::last_os_error();
            return Err(PassphraseError::with_source(
                ErrorKind::TerminalUnavailable,
                format!("cannot open CONIN$: {}", e),
                e,
            ));
        }

        let mut saved: CONSOLE_MODE = 0;
        // SAFETY: handle was just opened and saved is a valid out pointer.
        if unsafe { GetConsoleMode(handle, &mut saved) } == 0 {
            let e = io::Error::last_os_error();
            // SAFETY: handle is open and not used afterwards.
            unsafe { CloseHandle(handle) };
            return Err(PassphraseError::with_source(
                ErrorKind::TerminalState,
                format!("GetConsoleMode() failed: {}", e),
                e,
            ));
        }

        debug!("console opened");
        Ok(Self {
            handle,
            saved,
            echo_switched: false,
        })
    }

    fn is_open(&self) -> bool {
        !self.handle.is_null()
    }

    fn set_mode(&mut self, mode: CONSOLE_MODE) -> Result<()> {
        if !self.is_open() {
            return Err(PassphraseError::new(
                ErrorKind::TerminalUnavailable,
                "console already closed",
            ));
        }
        // SAFETY: handle is an open console input handle.
        if unsafe { SetConsoleMode(self.handle, mode) } == 0 {
            let e = io::Error::last_os_error();
            return Err(PassphraseError::with_source(
                ErrorKind::TerminalState,
                format!("SetConsoleMode() failed: {}", e),
                e,
            ));
        }
        Ok(())
    }
}

impl Terminal for ConsoleTerminal {
    type Unit = u16;

    const LINE_END: u16 = b'\r' as u16;

    fn write_prompt(&mut self, text: &str) -> Result<()> {
        let mut stderr = io::stderr().lock();
        stderr
            .write_all(text.as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(|e| {
                PassphraseError::with_source(
                    ErrorKind::TerminalState,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })
    }

    fn disable_echo(&mut self) -> Result<()> {
        let raw = self.saved & !(ENABLE_ECHO_INPUT | ENABLE_LINE_INPUT | ENABLE_PROCESSED_INPUT);
        self.set_mode(raw)?;
        self.echo_switched = true;
        debug!("console echo disabled");
        Ok(())
    }

    fn restore_echo(&mut self) -> Result<()> {
        if !self.echo_switched {
            return Ok(());
        }
        self.set_mode(self.saved)?;
        self.echo_switched = false;
        debug!("console echo restored");
        Ok(())
    }

    fn read_char(&mut self) -> Result<Option<u16>> {
        if !self.is_open() {
            return Ok(None);
        }
        let mut unit: u16 = 0;
        let mut read: u32 = 0;
        // SAFETY: the buffer holds exactly the one unit requested.
        let ok = unsafe {
            ReadConsoleW(
                self.handle,
                (&mut unit as *mut u16).cast(),
                1,
                &mut read,
                ptr::null(),
            )
        };
        if ok == 0 {
            let e = io::Error::last_os_error();
            return Err(PassphraseError::with_source(
                ErrorKind::UnexpectedEndOfInput,
                format!("ReadConsoleW() failed: {}", e),
                e,
            ));
        }
        Ok(take_unit(&mut unit, read))
    }

    fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Err(err) = self.restore_echo() {
            warn!(error = %err, "could not restore console mode while closing");
        }
        // SAFETY: handle is open and is cleared right after.
        unsafe { CloseHandle(self.handle) };
        self.handle = ptr::null_mut();
        debug!("console closed");
    }
}

impl Drop for ConsoleTerminal {
    fn drop(&mut self) {
        self.close();
    }
}

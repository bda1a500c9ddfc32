use std::ffi::{CString, OsStr};
use std::os::raw::{c_char, c_int};
use std::ptr;

use libloading::Library;
use log::{debug, trace};

use super::api::{append_script_args, DebugApi};
use crate::error_handling::types::BindingError;

type ConfigFn = unsafe extern "C" fn(*const c_char, *const c_char);
type InitFn = unsafe extern "C" fn() -> c_int;
type AttachFn = unsafe extern "C" fn(c_int) -> c_int;
type ExitFn = unsafe extern "C" fn() -> c_int;
type CmdFn = unsafe extern "C" fn(*const c_char) -> c_int;
type ScriptFn = unsafe extern "C" fn(*const c_char, *const *const c_char) -> c_int;

/// The vendor remote-API library loaded with `libloading`.
///
/// Symbols are resolved once at load time and stored as plain function
/// pointers. They stay valid as long as `_library` is alive, which is the
/// lifetime of this struct.
pub struct NativeLibrary {
    t32_config: ConfigFn,
    t32_init: InitFn,
    t32_attach: AttachFn,
    t32_exit: ExitFn,
    t32_cmd: CmdFn,
    t32_execute_script: Option<ScriptFn>,
    _library: Library,
}

impl NativeLibrary {
    /// Loads `name` (a path, or a bare file name resolved through the
    /// platform's library search) and resolves the required entry points.
    ///
    /// A library missing any required symbol is rejected; only
    /// `T32_ExecuteScript` is optional.
    pub fn load(name: &OsStr) -> Result<Self, BindingError> {
        debug!("Loading T32 API library {:?}", name);

        // SAFETY: loading runs the library's initialisers; the vendor library
        // is trusted to the extent the operator configured it.
        let library = unsafe { Library::new(name) }
            .map_err(|e| BindingError::LoadFailed(e.to_string()))?;

        // SAFETY: the function types match the vendor's published prototypes.
        unsafe {
            let t32_config = *required::<ConfigFn>(&library, b"T32_Config\0")?;
            let t32_init = *required::<InitFn>(&library, b"T32_Init\0")?;
            let t32_attach = *required::<AttachFn>(&library, b"T32_Attach\0")?;
            let t32_exit = *required::<ExitFn>(&library, b"T32_Exit\0")?;
            let t32_cmd = *required::<CmdFn>(&library, b"T32_Cmd\0")?;
            let t32_execute_script = library
                .get::<ScriptFn>(b"T32_ExecuteScript\0")
                .ok()
                .map(|symbol| *symbol);

            if t32_execute_script.is_none() {
                debug!("T32_ExecuteScript not exported, scripts will run through T32_Cmd");
            }

            Ok(Self {
                t32_config,
                t32_init,
                t32_attach,
                t32_exit,
                t32_cmd,
                t32_execute_script,
                _library: library,
            })
        }
    }
}

unsafe fn required<'lib, T>(
    library: &'lib Library,
    symbol: &[u8],
) -> Result<libloading::Symbol<'lib, T>, BindingError> {
    library.get::<T>(symbol).map_err(|e| {
        let name = String::from_utf8_lossy(&symbol[..symbol.len() - 1]).into_owned();
        BindingError::MissingSymbol(format!("{}: {}", name, e))
    })
}

impl DebugApi for NativeLibrary {
    fn config(&mut self, key: &str, value: &str) -> Result<(), BindingError> {
        let key = CString::new(key)?;
        let value = CString::new(value)?;
        trace!("T32_Config({:?}, {:?})", key, value);
        // SAFETY: both pointers are valid NUL-terminated strings for the call.
        unsafe { (self.t32_config)(key.as_ptr(), value.as_ptr()) };
        Ok(())
    }

    fn init(&mut self) -> i32 {
        // SAFETY: no arguments.
        unsafe { (self.t32_init)() }
    }

    fn attach(&mut self, device: i32) -> i32 {
        // SAFETY: plain integer argument.
        unsafe { (self.t32_attach)(device) }
    }

    fn exit(&mut self) -> i32 {
        // SAFETY: no arguments.
        unsafe { (self.t32_exit)() }
    }

    fn cmd(&mut self, command: &str) -> Result<i32, BindingError> {
        let command = CString::new(command)?;
        trace!("T32_Cmd({:?})", command);
        // SAFETY: valid NUL-terminated string for the duration of the call.
        Ok(unsafe { (self.t32_cmd)(command.as_ptr()) })
    }

    fn execute_script(&mut self, command: &str, args: &[String]) -> Result<i32, BindingError> {
        let Some(execute) = self.t32_execute_script else {
            return self.cmd(&append_script_args(command, args));
        };

        let command = CString::new(command)?;
        let owned = args
            .iter()
            .map(|a| CString::new(a.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut argv: Vec<*const c_char> = owned.iter().map(|a| a.as_ptr()).collect();
        argv.push(ptr::null());

        trace!("T32_ExecuteScript({:?}, {} arg(s))", command, owned.len());
        // SAFETY: `owned` and `argv` outlive the call, argv is NULL-terminated.
        Ok(unsafe { execute(command.as_ptr(), argv.as_ptr()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_library_fails() {
        let result = NativeLibrary::load(OsStr::new("/nonexistent/dir/t32api-missing.so"));
        assert!(matches!(result, Err(BindingError::LoadFailed(_))));
    }
}

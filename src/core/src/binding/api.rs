use crate::error_handling::types::BindingError;

/// Packet length sent with every `PACKLEN=` configuration call.
pub const PACKET_LENGTH: &str = "1024";

/// Device selector for `T32_Attach`, the ICD/API device.
pub const ATTACH_DEVICE_API: i32 = 1;

/// Narrow view of the vendor remote-API library.
///
/// Each method maps to exactly one native entry point. Implementations convert
/// strings into C strings themselves; a string that cannot be converted (it
/// contains a NUL byte) is reported as [`BindingError::InvalidString`] and the
/// native function is not called.
pub trait DebugApi: Send {
    /// `T32_Config(key, value)`; the key carries its trailing `=` (e.g. `NODE=`).
    fn config(&mut self, key: &str, value: &str) -> Result<(), BindingError>;

    /// `T32_Init()`
    fn init(&mut self) -> i32;

    /// `T32_Attach(device)`
    fn attach(&mut self, device: i32) -> i32;

    /// `T32_Exit()`
    fn exit(&mut self) -> i32;

    /// `T32_Cmd(command)`
    fn cmd(&mut self, command: &str) -> Result<i32, BindingError>;

    /// Runs a `DO` command line with an additional argument vector.
    fn execute_script(&mut self, command: &str, args: &[String]) -> Result<i32, BindingError>;
}

/// Appends script arguments to a `DO` command line, quoting arguments that
/// contain whitespace or quotes. Used when the library has no dedicated script
/// entry point.
pub fn append_script_args(command: &str, args: &[String]) -> String {
    let mut line = command.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"') {
            line.push_str(&quote(arg));
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// Wraps `value` in double quotes, doubling embedded quotes the way PRACTICE
/// string literals expect.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

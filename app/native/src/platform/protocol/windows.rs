//! Windows registration through per-user registry keys.
//!
//! Everything lives under `HKEY_CURRENT_USER\Software\Classes\<scheme>`, so no
//! elevation is needed:
//!
//! ```text
//! <scheme>                     (default) = "URL:<scheme> Protocol", "URL Protocol" = ""
//! <scheme>\DefaultIcon         (default) = "<exe>",0
//! <scheme>\shell\open\command  (default) = "<exe>" --url "%1"
//! ```

use std::io;
use std::path::PathBuf;

use windows_registry::CURRENT_USER;

use super::RegistrationBackend;
use crate::core::constants::URL_FLAG;

/// `HRESULT_FROM_WIN32(ERROR_FILE_NOT_FOUND)`.
#[allow(clippy::cast_possible_wrap)]
const NOT_FOUND: i32 = 0x8007_0002_u32 as i32;

/// Registry-backed scheme registration.
#[derive(Debug, Clone)]
pub struct WindowsRegistryBackend {
    scheme: String,
    exe: PathBuf,
}

impl WindowsRegistryBackend {
    /// Creates a backend mapping `scheme` to `exe`.
    pub fn new(scheme: impl Into<String>, exe: impl Into<PathBuf>) -> Self {
        Self {
            scheme: scheme.into(),
            exe: exe.into(),
        }
    }

    fn root(&self) -> String { format!(r"Software\Classes\{}", self.scheme) }

    /// Subkeys in creation order.
    fn subkeys(&self) -> [String; 4] {
        let root = self.root();
        [
            format!(r"{root}\DefaultIcon"),
            format!(r"{root}\shell"),
            format!(r"{root}\shell\open"),
            format!(r"{root}\shell\open\command"),
        ]
    }

    fn open_command(&self) -> String {
        format!("\"{}\" {URL_FLAG} \"%1\"", self.exe.display())
    }
}

impl RegistrationBackend for WindowsRegistryBackend {
    fn register(&self) -> io::Result<()> {
        let description = format!("URL:{} Protocol", self.scheme);
        let icon = format!("\"{}\",0", self.exe.display());
        let command = self.open_command();

        let root = CURRENT_USER.create(self.root()).map_err(io::Error::other)?;
        root.set_string("", description.as_str()).map_err(io::Error::other)?;
        root.set_string("URL Protocol", "").map_err(io::Error::other)?;

        CURRENT_USER
            .create(format!(r"{}\DefaultIcon", self.root()))
            .and_then(|key| key.set_string("", icon.as_str()))
            .map_err(io::Error::other)?;

        CURRENT_USER
            .create(format!(r"{}\shell\open\command", self.root()))
            .and_then(|key| key.set_string("", command.as_str()))
            .map_err(io::Error::other)?;

        Ok(())
    }

    fn unregister(&self) -> io::Result<()> {
        let mut keys = self.subkeys().to_vec();
        keys.insert(0, self.root());

        for key in keys.iter().rev() {
            match CURRENT_USER.remove_tree(key) {
                Ok(()) => {}
                Err(err) if err.code().0 == NOT_FOUND => {}
                Err(err) => return Err(io::Error::other(err)),
            }
        }
        Ok(())
    }

    fn is_registered(&self) -> io::Result<bool> {
        let root = match CURRENT_USER.open(self.root()) {
            Ok(root) => root,
            Err(err) if err.code().0 == NOT_FOUND => return Ok(false),
            Err(err) => return Err(io::Error::other(err)),
        };
        if root.get_string("URL Protocol").is_err() {
            return Ok(false);
        }

        let command = CURRENT_USER
            .open(format!(r"{}\shell\open\command", self.root()))
            .and_then(|key| key.get_string(""));
        Ok(command.is_ok_and(|command| command == self.open_command()))
    }
}

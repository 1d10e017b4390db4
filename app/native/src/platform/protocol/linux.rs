//! Linux registration through the freedesktop.org conventions.
//!
//! Registering writes `<applications_dir>/<scheme>-url-handler.desktop` and
//! makes it the default handler for `x-scheme-handler/<scheme>`, preferring
//! `xdg-mime` and editing `mimeapps.list` directly when the tool is missing.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::RegistrationBackend;
use crate::core::constants::{APP_NAME, URL_FLAG};
use crate::platform::ipc::transport::remove_if_exists;

const DEFAULT_APPLICATIONS: &str = "[Default Applications]";
const MIMEAPPS_FILE: &str = "mimeapps.list";

/// `.desktop` entry plus MIME association for one scheme.
#[derive(Debug, Clone)]
pub struct LinuxDesktopBackend {
    scheme: String,
    exe: PathBuf,
    applications_dir: PathBuf,
    config_dir: PathBuf,
    use_desktop_tools: bool,
}

impl LinuxDesktopBackend {
    /// Creates a backend writing into explicit directories.
    pub fn new(
        scheme: impl Into<String>,
        exe: impl Into<PathBuf>,
        applications_dir: impl Into<PathBuf>,
        config_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            exe: exe.into(),
            applications_dir: applications_dir.into(),
            config_dir: config_dir.into(),
            use_desktop_tools: true,
        }
    }

    /// Creates a backend for the current user's XDG directories.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the data or config directory cannot be determined.
    pub fn for_user(scheme: &str, exe: PathBuf) -> io::Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no user data directory"))?;
        let config_dir = dirs::config_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no user config directory"))?;

        Ok(Self::new(scheme, exe, data_dir.join("applications"), config_dir))
    }

    /// Skips `xdg-mime` and `update-desktop-database`, editing files only.
    #[must_use]
    pub const fn without_desktop_tools(mut self) -> Self {
        self.use_desktop_tools = false;
        self
    }

    /// File name of the generated desktop entry.
    #[must_use]
    pub fn desktop_file_name(&self) -> String { format!("{}-url-handler.desktop", self.scheme) }

    /// Full path of the generated desktop entry.
    #[must_use]
    pub fn desktop_file_path(&self) -> PathBuf { self.applications_dir.join(self.desktop_file_name()) }

    fn mime_type(&self) -> String { format!("x-scheme-handler/{}", self.scheme) }

    fn mimeapps_path(&self) -> PathBuf { self.config_dir.join(MIMEAPPS_FILE) }

    fn exec_line(&self) -> String {
        format!("Exec={} {URL_FLAG} %u", quote_exec_arg(&self.exe.to_string_lossy()))
    }

    fn desktop_entry(&self) -> String {
        format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name={APP_NAME}\n\
             Comment=Open {scheme}:// links with {APP_NAME}\n\
             {exec}\n\
             Terminal=false\n\
             NoDisplay=true\n\
             MimeType={mime};\n",
            scheme = self.scheme,
            exec = self.exec_line(),
            mime = self.mime_type(),
        )
    }

    fn associate(&self) -> io::Result<()> {
        let file_name = self.desktop_file_name();
        let mime = self.mime_type();

        if self.use_desktop_tools {
            match run_tool("xdg-mime", &["default", &file_name, &mime]) {
                Ok(_) => return Ok(()),
                Err(err) => {
                    tracing::debug!(error = %err, "xdg-mime unavailable; editing mimeapps.list");
                }
            }
        }

        let path = self.mimeapps_path();
        let contents = read_optional(&path)?;
        fs::create_dir_all(&self.config_dir)?;
        fs::write(&path, set_default(&contents, &mime, &file_name))
    }

    fn current_default(&self) -> io::Result<Option<String>> {
        let mime = self.mime_type();
        if let Some(default) = lookup_default(&read_optional(&self.mimeapps_path())?, &mime) {
            return Ok(Some(default));
        }

        if !self.use_desktop_tools {
            return Ok(None);
        }

        Ok(run_tool("xdg-mime", &["query", "default", &mime])
            .ok()
            .map(|output| output.trim().to_string())
            .filter(|default| !default.is_empty()))
    }

    fn refresh_database(&self) {
        if !self.use_desktop_tools {
            return;
        }

        let dir = self.applications_dir.to_string_lossy();
        if let Err(err) = run_tool("update-desktop-database", &[&dir]) {
            tracing::debug!(error = %err, "desktop database refresh skipped");
        }
    }
}

impl RegistrationBackend for LinuxDesktopBackend {
    fn register(&self) -> io::Result<()> {
        fs::create_dir_all(&self.applications_dir)?;

        let path = self.desktop_file_path();
        fs::write(&path, self.desktop_entry())?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;

        self.associate()?;
        self.refresh_database();

        tracing::debug!(path = %path.display(), "wrote desktop entry");
        Ok(())
    }

    fn unregister(&self) -> io::Result<()> {
        remove_if_exists(&self.desktop_file_path())?;

        let path = self.mimeapps_path();
        let contents = read_optional(&path)?;
        let updated = remove_default(&contents, &self.mime_type(), &self.desktop_file_name());
        if updated != contents {
            fs::write(&path, updated)?;
        }

        self.refresh_database();
        Ok(())
    }

    fn is_registered(&self) -> io::Result<bool> {
        let entry = match fs::read_to_string(self.desktop_file_path()) {
            Ok(entry) => entry,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err),
        };

        let exec = self.exec_line();
        let mime = format!("MimeType={};", self.mime_type());
        if !entry.lines().any(|line| line == exec) || !entry.lines().any(|line| line == mime) {
            return Ok(false);
        }

        Ok(self.current_default()?.as_deref() == Some(self.desktop_file_name().as_str()))
    }
}

/// Quotes a path for an `Exec` key: reserved characters are backslash-escaped
/// inside double quotes, then backslashes are doubled for the string value.
fn quote_exec_arg(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        match c {
            '"' | '`' | '$' | '\\' => {
                quoted.push_str("\\\\");
                quoted.push(c);
            }
            '%' => quoted.push_str("%%"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn run_tool(program: &str, args: &[&str]) -> io::Result<String> {
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn read_optional(path: &Path) -> io::Result<String> {
    match fs::read_to_string(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        result => result,
    }
}

fn is_section_header(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('[') && line.ends_with(']')
}

/// Line range of the `[Default Applications]` section: the header index and
/// the exclusive end.
fn default_section(lines: &[&str]) -> Option<(usize, usize)> {
    let start = lines.iter().position(|line| line.trim() == DEFAULT_APPLICATIONS)?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| is_section_header(line))
        .map_or(lines.len(), |offset| start + 1 + offset);
    Some((start, end))
}

fn entry_value<'a>(line: &'a str, mime: &str) -> Option<&'a str> {
    let (key, value) = line.split_once('=')?;
    (key.trim() == mime).then(|| value.trim())
}

fn join_lines(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Sets the default handler for `mime` in `mimeapps.list` contents.
fn set_default(contents: &str, mime: &str, desktop: &str) -> String {
    let lines: Vec<&str> = contents.lines().collect();
    let entry = format!("{mime}={desktop};");

    let Some((start, end)) = default_section(&lines) else {
        let mut out: Vec<String> = lines.iter().map(|line| (*line).to_string()).collect();
        if out.last().is_some_and(|line| !line.trim().is_empty()) {
            out.push(String::new());
        }
        out.push(DEFAULT_APPLICATIONS.to_string());
        out.push(entry);
        return join_lines(&out);
    };

    let has_entry = lines[start + 1..end].iter().any(|line| entry_value(line, mime).is_some());
    let mut out = Vec::with_capacity(lines.len() + 1);
    let mut written = false;
    for (index, line) in lines.iter().enumerate() {
        if index > start && index < end && entry_value(line, mime).is_some() {
            if !written {
                out.push(entry.clone());
                written = true;
            }
            continue;
        }
        out.push((*line).to_string());
        if index == start && !has_entry {
            out.push(entry.clone());
        }
    }
    join_lines(&out)
}

/// Removes the default handler for `mime` if it is `desktop`.
fn remove_default(contents: &str, mime: &str, desktop: &str) -> String {
    let lines: Vec<&str> = contents.lines().collect();
    let Some((start, end)) = default_section(&lines) else {
        return contents.to_string();
    };

    let ours = |line: &str| {
        entry_value(line, mime)
            .and_then(|value| value.split(';').next())
            .is_some_and(|first| first.trim() == desktop)
    };

    if !lines[start + 1..end].iter().any(|line| ours(line)) {
        return contents.to_string();
    }

    let out: Vec<String> = lines
        .iter()
        .enumerate()
        .filter(|(index, line)| !(*index > start && *index < end && ours(line)))
        .map(|(_, line)| (*line).to_string())
        .collect();
    join_lines(&out)
}

/// Returns the default handler recorded for `mime`.
fn lookup_default(contents: &str, mime: &str) -> Option<String> {
    let lines: Vec<&str> = contents.lines().collect();
    let (start, end) = default_section(&lines)?;

    lines[start + 1..end]
        .iter()
        .find_map(|line| entry_value(line, mime))
        .and_then(|value| value.split(';').map(str::trim).find(|item| !item.is_empty()))
        .map(str::to_string)
}

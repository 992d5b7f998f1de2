//! Launch options and flag construction.
//!
//! Provides a type-safe interface for configuring how the browser process
//! is started. The defaults reproduce the fixed flag set this driver
//! relies on: headless, a known remote-debugging port, GPU disabled.
//!
//! # Example
//!
//! ```ignore
//! use chrome_devtools::ChromeOptions;
//!
//! let options = ChromeOptions::new("/usr/bin/chromium")
//!     .with_window_size(1920, 1080);
//!
//! let args = options.to_args("https://example.com");
//! // ["--headless", "--remote-debugging-port=9222", "--disable-gpu",
//! //  "--window-size=1920,1080", "https://example.com"]
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Remote-debugging port used unless overridden.
pub const DEFAULT_DEBUGGING_PORT: u16 = 9222;

// ============================================================================
// ChromeOptions
// ============================================================================

/// Browser process configuration.
///
/// The binary path must already be resolved for the running OS; this
/// layer does not search for executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromeOptions {
    /// Resolved path to the browser binary.
    pub binary: PathBuf,

    /// Run without a visible window. On by default.
    pub headless: bool,

    /// Remote-debugging port passed to the process and polled for targets.
    pub debugging_port: u16,

    /// Disable GPU acceleration. On by default.
    pub disable_gpu: bool,

    /// Window dimensions in pixels (width, height).
    pub window_size: Option<(u32, u32)>,

    /// Additional custom command-line arguments.
    pub extra_args: Vec<String>,
}

// ============================================================================
// Constructors
// ============================================================================

impl ChromeOptions {
    /// Creates options for the given binary with the driver's fixed
    /// defaults: headless, port 9222, GPU disabled.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            headless: true,
            debugging_port: DEFAULT_DEBUGGING_PORT,
            disable_gpu: true,
            window_size: None,
            extra_args: Vec::new(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ChromeOptions {
    /// Runs the browser with a visible window.
    #[inline]
    #[must_use]
    pub fn with_headful(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Overrides the remote-debugging port.
    #[inline]
    #[must_use]
    pub fn with_debugging_port(mut self, port: u16) -> Self {
        self.debugging_port = port;
        self
    }

    /// Sets window size in pixels.
    #[inline]
    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = Some((width, height));
        self
    }

    /// Adds a custom command-line argument.
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Adds multiple custom command-line arguments.
    #[inline]
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl ChromeOptions {
    /// Converts options to command-line arguments.
    ///
    /// The navigation target is always the final argument.
    #[must_use]
    pub fn to_args(&self, target_url: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(5 + self.extra_args.len());

        if self.headless {
            args.push("--headless".to_string());
        }

        args.push(format!("--remote-debugging-port={}", self.debugging_port));

        if self.disable_gpu {
            args.push("--disable-gpu".to_string());
        }

        if let Some((width, height)) = self.window_size {
            args.push(format!("--window-size={width},{height}"));
        }

        args.extend(self.extra_args.clone());
        args.push(target_url.to_string());
        args
    }

    /// Validates the options configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if validation fails.
    pub fn validate(&self) -> Result<()> {
        if self.binary.as_os_str().is_empty() {
            return Err(Error::config("binary path must not be empty"));
        }

        if self.debugging_port == 0 {
            return Err(Error::config("debugging port must be non-zero"));
        }

        if let Some((width, height)) = self.window_size
            && (width == 0 || height == 0)
        {
            return Err(Error::config("window dimensions must be greater than zero"));
        }

        Ok(())
    }

    /// Returns `true` if headless mode is enabled.
    #[inline]
    #[must_use]
    pub const fn is_headless(&self) -> bool {
        self.headless
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_applies_fixed_defaults() {
        let options = ChromeOptions::new("/usr/bin/chromium");
        assert!(options.headless);
        assert_eq!(options.debugging_port, 9222);
        assert!(options.disable_gpu);
        assert!(options.window_size.is_none());
        assert!(options.extra_args.is_empty());
    }

    #[test]
    fn test_to_args_default_flag_set() {
        let options = ChromeOptions::new("/usr/bin/chromium");
        let args = options.to_args("https://example.com");

        assert_eq!(
            args,
            vec![
                "--headless",
                "--remote-debugging-port=9222",
                "--disable-gpu",
                "https://example.com",
            ]
        );
    }

    #[test]
    fn test_target_url_is_always_last() {
        let options = ChromeOptions::new("/usr/bin/chromium")
            .with_window_size(800, 600)
            .with_arg("--mute-audio");
        let args = options.to_args("about:blank");

        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
        assert!(args.contains(&"--window-size=800,600".to_string()));
        assert!(args.contains(&"--mute-audio".to_string()));
    }

    #[test]
    fn test_with_headful_drops_headless_flag() {
        let options = ChromeOptions::new("/usr/bin/chromium").with_headful();
        let args = options.to_args("about:blank");
        assert!(!args.contains(&"--headless".to_string()));
    }

    #[test]
    fn test_with_debugging_port() {
        let options = ChromeOptions::new("/usr/bin/chromium").with_debugging_port(9333);
        let args = options.to_args("about:blank");
        assert!(args.contains(&"--remote-debugging-port=9333".to_string()));
    }

    #[test]
    fn test_validate_valid() {
        let options = ChromeOptions::new("/usr/bin/chromium").with_window_size(800, 600);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_binary() {
        let options = ChromeOptions::new("");
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_zero_port() {
        let options = ChromeOptions::new("/usr/bin/chromium").with_debugging_port(0);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_validate_zero_window_dimension() {
        let options = ChromeOptions::new("/usr/bin/chromium").with_window_size(0, 600);
        assert!(options.validate().is_err());
    }
}

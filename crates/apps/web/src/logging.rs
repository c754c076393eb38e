//! `tracing` output for the browser console.

use std::io;
use std::sync::OnceLock;

use tracing::{Level, Metadata};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Registry, reload};

static LEVEL_HANDLE: OnceLock<reload::Handle<LevelFilter, Registry>> = OnceLock::new();

/// Buffers one formatted event and hands it to the console on drop.
pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let text = text.trim_end();
        if text.is_empty() {
            return;
        }
        emit(self.level, text);
    }
}

#[cfg(target_arch = "wasm32")]
fn emit(level: Level, text: &str) {
    let msg = wasm_bindgen::JsValue::from_str(text);
    match level {
        Level::ERROR => web_sys::console::error_1(&msg),
        Level::WARN => web_sys::console::warn_1(&msg),
        Level::INFO => web_sys::console::info_1(&msg),
        _ => web_sys::console::log_1(&msg),
    }
}

// Native builds (tests) have no console binding.
#[cfg(not(target_arch = "wasm32"))]
fn emit(_level: Level, text: &str) {
    eprintln!("{text}");
}

pub struct ConsoleMakeWriter;

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buf: Vec::new(),
        }
    }
}

/// Installs the console subscriber on first call; later calls only change
/// the maximum level. The browser has no clock the formatter can use, so
/// timestamps are off.
pub fn init(max_level: Level) -> Result<(), String> {
    let filter = LevelFilter::from_level(max_level);
    if let Some(handle) = LEVEL_HANDLE.get() {
        return handle.modify(|f| *f = filter).map_err(|e| e.to_string());
    }

    let (filter_layer, handle) = reload::Layer::new(filter);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(true)
        .with_writer(ConsoleMakeWriter);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| e.to_string())?;
    let _ = LEVEL_HANDLE.set(handle);
    Ok(())
}

pub fn parse_level(raw: &str) -> Option<Level> {
    raw.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::{init, parse_level};
    use tracing::Level;

    #[test]
    fn level_can_be_raised_after_install() {
        init(Level::WARN).unwrap();
        assert!(!tracing::enabled!(Level::DEBUG));

        init(parse_level("debug").unwrap()).unwrap();
        assert!(tracing::enabled!(Level::DEBUG));

        init(Level::WARN).unwrap();
        assert!(!tracing::enabled!(Level::INFO));
    }

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level(" WARN "), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }
}

//! Chart text needs a font registered with the plotting backend. Nothing is
//! bundled: either the caller points at a font file or a few common system
//! locations are tried. Without a font, charts are drawn without text.

use std::{
    io,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use miette::Diagnostic;
use plotters::style::{register_font, FontStyle};
use thiserror::Error;
use tracing::{debug, info};

/// Family name charts ask the backend for.
pub const FAMILY: &str = "sans-serif";

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static REGISTERED: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Error, Diagnostic)]
pub enum FontError {
    #[error("Could not read font `{}`", path.display())]
    #[diagnostic(code(climate::font::read))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("`{}` is not a usable TrueType/OpenType font", path.display())]
    #[diagnostic(code(climate::font::invalid))]
    Invalid { path: PathBuf },
}

/// Registers `path`, or the first system font found when `None`.
///
/// Returns whether a font is now available. A missing system font is not an
/// error, an unusable explicit one is. Fonts live as long as the process, so
/// only the first successful registration loads anything; later calls return
/// `Ok(true)` straight away.
pub fn register(path: Option<&Path>) -> Result<bool, FontError> {
    if let Some(registered) = registered() {
        debug!(path = %registered.display(), "chart font already registered");
        return Ok(true);
    }

    if let Some(path) = path {
        load(path)?;
        return Ok(true);
    }

    for candidate in SYSTEM_FONTS.iter().map(Path::new) {
        if !candidate.is_file() {
            continue;
        }
        match load(candidate) {
            Ok(()) => return Ok(true),
            Err(e) => debug!(error = %e, "skipping system font"),
        }
    }
    info!("no font found, charts will be drawn without text");
    Ok(available())
}

/// Whether [`register`] succeeded at least once.
pub fn available() -> bool {
    REGISTERED.get().is_some()
}

/// The font file charts are drawn with.
pub fn registered() -> Option<&'static Path> {
    REGISTERED.get().map(PathBuf::as_path)
}

fn load(path: &Path) -> Result<(), FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    // The backend keeps fonts for the whole process.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FAMILY, FontStyle::Normal, bytes).map_err(|_| FontError::Invalid {
        path: path.to_path_buf(),
    })?;

    debug!(path = %path.display(), "registered chart font");
    // A concurrent registration may have won the race, either font is fine.
    let _ = REGISTERED.set(path.to_path_buf());
    Ok(())
}

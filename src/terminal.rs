//! Terminal stand-ins for the browser collaborators: dialogs on stdin/stderr,
//! a map that only logs, and a fixed "current position".

use crate::app::Prompt;
use crate::map::{Geolocator, MapWidget, MarkerHandle, Popup, ViewOptions};
use crate::types::Coords;
use anyhow::{Result, bail};
use std::io::{self, BufRead, Write};

pub struct TerminalPrompt {
    assume_yes: bool,
}

impl TerminalPrompt {
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompt for TerminalPrompt {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        ask(&mut io::stdin().lock(), &mut io::stderr(), message)
    }

    fn alert(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// Write the question and read one answer line. Anything but a yes, or a
/// broken terminal, counts as no.
fn ask(input: &mut impl BufRead, out: &mut impl Write, message: &str) -> bool {
    if write!(out, "{message} [y/N] ").and_then(|()| out.flush()).is_err() {
        return false;
    }
    let mut line = String::new();
    if input.read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim(), "y" | "Y" | "yes" | "YES" | "Yes")
}

/// Map widget that reports what it would draw.
#[derive(Default)]
pub struct LogMap {
    next: u64,
}

impl MapWidget for LogMap {
    fn set_view(&mut self, center: Coords, zoom: u8, opts: ViewOptions) {
        tracing::info!(
            lat = center.lat,
            lng = center.lng,
            zoom,
            animate = opts.animate,
            "map view"
        );
    }

    fn add_tile_layer(&mut self, url: &str, _attribution: &str) {
        tracing::debug!(url, "tile layer");
    }

    fn add_marker(&mut self, coords: Coords, popup: &Popup) -> MarkerHandle {
        self.next += 1;
        tracing::debug!(
            marker = self.next,
            lat = coords.lat,
            lng = coords.lng,
            class = %popup.class_name,
            "{}",
            popup.content
        );
        MarkerHandle(self.next)
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        tracing::trace!(marker = handle.0, "marker removed");
    }
}

/// Position supplied up front (flag or env); absent means the lookup fails.
pub struct FixedLocation(pub Option<Coords>);

impl Geolocator for FixedLocation {
    fn current_position(&mut self) -> Result<Coords> {
        match self.0 {
            Some(c) => Ok(c),
            None => bail!("no location given (use --location or MAPTY_LOCATION)"),
        }
    }
}

use ratatui::style::Color;

/// A selectable color layout. Layouts come in light/dark families; the
/// dark-mode toggle switches to the counterpart of the current family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub id: &'static str,
    pub name: &'static str,
    pub family: &'static str,
    pub dark: bool,
    pub palette: Palette,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: Color,
    pub dim: Color,
    pub accent: Color,
    pub border: Color,
    pub heading: Color,
    pub code: Color,
    pub quote: Color,
    pub bar_bg: Color,
    pub bar_fg: Color,
}

const LAYOUTS: [Layout; 4] = [
    Layout {
        id: "paper-light",
        name: "Paper",
        family: "paper",
        dark: false,
        palette: Palette {
            text: Color::Black,
            dim: Color::DarkGray,
            accent: Color::Blue,
            border: Color::Gray,
            heading: Color::Blue,
            code: Color::Magenta,
            quote: Color::DarkGray,
            bar_bg: Color::Blue,
            bar_fg: Color::White,
        },
    },
    Layout {
        id: "paper-dark",
        name: "Paper Dark",
        family: "paper",
        dark: true,
        palette: Palette {
            text: Color::White,
            dim: Color::DarkGray,
            accent: Color::Yellow,
            border: Color::DarkGray,
            heading: Color::Yellow,
            code: Color::LightMagenta,
            quote: Color::Gray,
            bar_bg: Color::Rgb(0, 95, 135),
            bar_fg: Color::White,
        },
    },
    Layout {
        id: "ocean-light",
        name: "Ocean",
        family: "ocean",
        dark: false,
        palette: Palette {
            text: Color::Black,
            dim: Color::DarkGray,
            accent: Color::Cyan,
            border: Color::Gray,
            heading: Color::Cyan,
            code: Color::Blue,
            quote: Color::DarkGray,
            bar_bg: Color::Cyan,
            bar_fg: Color::Black,
        },
    },
    Layout {
        id: "ocean-dark",
        name: "Ocean Dark",
        family: "ocean",
        dark: true,
        palette: Palette {
            text: Color::Rgb(216, 222, 233),
            dim: Color::DarkGray,
            accent: Color::Cyan,
            border: Color::DarkGray,
            heading: Color::Cyan,
            code: Color::LightBlue,
            quote: Color::Gray,
            bar_bg: Color::Rgb(0, 60, 80),
            bar_fg: Color::White,
        },
    },
];

pub fn layouts() -> &'static [Layout] {
    &LAYOUTS
}

pub fn default_layout_id() -> &'static str {
    LAYOUTS[0].id
}

pub fn layout_by_id(id: &str) -> Option<&'static Layout> {
    LAYOUTS.iter().find(|l| l.id == id)
}

/// Resolve a possibly-stale persisted id to a valid one.
pub fn initial_layout_id(saved: Option<&str>) -> &'static str {
    saved
        .and_then(layout_by_id)
        .map(|l| l.id)
        .unwrap_or_else(default_layout_id)
}

pub fn selectable_by_mode(dark: bool) -> Vec<&'static Layout> {
    LAYOUTS.iter().filter(|l| l.dark == dark).collect()
}

/// The layout to switch to when toggling between light and dark: the same
/// family's counterpart when it exists, otherwise the first layout of the
/// target mode.
pub fn counterpart_for_mode(current_id: &str, dark: bool) -> &'static str {
    let family = layout_by_id(current_id).map(|l| l.family);
    LAYOUTS
        .iter()
        .find(|l| l.dark == dark && Some(l.family) == family)
        .or_else(|| LAYOUTS.iter().find(|l| l.dark == dark))
        .map(|l| l.id)
        .unwrap_or_else(default_layout_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_lookup() {
        assert!(layout_by_id("paper-light").is_some());
        assert!(layout_by_id("missing").is_none());
    }

    #[test]
    fn test_initial_layout_falls_back() {
        assert_eq!(initial_layout_id(None), default_layout_id());
        assert_eq!(initial_layout_id(Some("garbage")), default_layout_id());
        assert_eq!(initial_layout_id(Some("ocean-dark")), "ocean-dark");
    }

    #[test]
    fn test_counterpart_keeps_family() {
        assert_eq!(counterpart_for_mode("paper-light", true), "paper-dark");
        assert_eq!(counterpart_for_mode("ocean-dark", false), "ocean-light");
    }

    #[test]
    fn test_counterpart_for_unknown_id() {
        let id = counterpart_for_mode("missing", true);
        assert!(layout_by_id(id).unwrap().dark);
    }

    #[test]
    fn test_selectable_by_mode() {
        assert!(selectable_by_mode(true).iter().all(|l| l.dark));
        assert!(selectable_by_mode(false).iter().all(|l| !l.dark));
        assert!(!selectable_by_mode(true).is_empty());
    }
}

/// Responsive step width - how many steps of each row are in play
/// Narrow viewports show half a bar, everything else shows the full row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    Narrow,
    #[default]
    Wide,
}

/// Widest viewport (in px) that still counts as narrow.
pub const NARROW_VIEWPORT_MAX_PX: u32 = 768;

pub const NARROW_STEPS_PER_ROW: usize = 4;
pub const MAX_STEPS_PER_ROW: usize = 8;

impl LayoutMode {
    pub fn from_viewport_width(viewport_width_px: u32) -> Self {
        if viewport_width_px <= NARROW_VIEWPORT_MAX_PX {
            LayoutMode::Narrow
        } else {
            LayoutMode::Wide
        }
    }

    pub fn steps_per_row(self) -> usize {
        match self {
            LayoutMode::Narrow => NARROW_STEPS_PER_ROW,
            LayoutMode::Wide => MAX_STEPS_PER_ROW,
        }
    }
}

pub fn steps_per_row(viewport_width_px: u32) -> usize {
    LayoutMode::from_viewport_width(viewport_width_px).steps_per_row()
}

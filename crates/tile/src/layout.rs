//! Flex row-wrap layout: the constraints a tile submits for its blocks and
//! houses, and the solver that turns them into `(left, top)` offsets.

/// Main-axis distribution of free space within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    FlexStart,
    SpaceBetween,
}

/// Cross-axis distribution of free space between lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignContent {
    FlexStart,
    SpaceBetween,
}

/// A fixed-size leaf with a uniform margin on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlexItem {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl FlexItem {
    fn outer_width(&self) -> f64 {
        self.width + 2.0 * self.margin
    }

    fn outer_height(&self) -> f64 {
        self.height + 2.0 * self.margin
    }
}

/// A row-direction container.
#[derive(Debug, Clone, PartialEq)]
pub struct FlexContainer {
    pub justify: Justify,
    pub align_content: AlignContent,
    pub wrap: bool,
    pub children: Vec<FlexItem>,
}

impl FlexContainer {
    /// Row, wrap, space-between on both axes.
    pub fn space_between(children: Vec<FlexItem>) -> Self {
        Self {
            justify: Justify::SpaceBetween,
            align_content: AlignContent::SpaceBetween,
            wrap: true,
            children,
        }
    }
}

/// Border-box position of a child relative to its container's origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputedLayout {
    pub left: f64,
    pub top: f64,
}

/// Computes child positions for a container of the given size.
pub trait LayoutSolver {
    /// One entry per child, in child order.
    fn calculate(&self, container: &FlexContainer, width: f64, height: f64) -> Vec<ComputedLayout>;
}

/// Tolerance when deciding whether an item still fits on the current line.
const FIT_EPSILON: f64 = 1e-9;

struct Line {
    start: usize,
    end: usize,
    main: f64,
    cross: f64,
}

/// Row-wrap flexbox with fixed-size children.
///
/// Negative free space is never distributed: an overflowing line or column
/// packs from the start.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlexRowWrap;

impl FlexRowWrap {
    fn break_lines(container: &FlexContainer, width: f64) -> Vec<Line> {
        let mut lines: Vec<Line> = Vec::new();
        for (index, child) in container.children.iter().enumerate() {
            let outer = child.outer_width();
            let starts_new_line = match lines.last() {
                None => true,
                Some(line) => container.wrap && line.main + outer > width + FIT_EPSILON,
            };
            if starts_new_line {
                lines.push(Line {
                    start: index,
                    end: index,
                    main: 0.0,
                    cross: 0.0,
                });
            }
            if let Some(line) = lines.last_mut() {
                line.end = index + 1;
                line.main += outer;
                line.cross = line.cross.max(child.outer_height());
            }
        }
        lines
    }
}

fn gap(free: f64, slots: usize) -> f64 {
    if slots > 1 && free > 0.0 {
        free / (slots - 1) as f64
    } else {
        0.0
    }
}

impl LayoutSolver for FlexRowWrap {
    fn calculate(&self, container: &FlexContainer, width: f64, height: f64) -> Vec<ComputedLayout> {
        let lines = Self::break_lines(container, width);

        let total_cross: f64 = lines.iter().map(|l| l.cross).sum();
        let line_gap = match container.align_content {
            AlignContent::FlexStart => 0.0,
            AlignContent::SpaceBetween => gap(height - total_cross, lines.len()),
        };

        let mut out = Vec::with_capacity(container.children.len());
        let mut y = 0.0;
        for line in &lines {
            let items = &container.children[line.start..line.end];
            let item_gap = match container.justify {
                Justify::FlexStart => 0.0,
                Justify::SpaceBetween => gap(width - line.main, items.len()),
            };
            let mut x = 0.0;
            for item in items {
                out.push(ComputedLayout {
                    left: x + item.margin,
                    top: y + item.margin,
                });
                x += item.outer_width() + item_gap;
            }
            y += line.cross + line_gap;
        }
        out
    }
}

//! Shape anchors.
//!
//! A top-level shape is anchored to cells ([`ClientAnchor`]); a shape nested
//! in a group is anchored in the group's own coordinate space
//! ([`ChildAnchor`]). Both store their corners normalized (first corner
//! top-left) and remember whether the caller gave them flipped.

use crate::ole::escher::{EscherClientAnchor, EscherRect};

/// Cell anchor: column/row of both corners plus offsets inside those cells.
///
/// Offsets are in the sheet's native units (1/1024 of a column width and
/// 1/256 of a row height); no conversion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientAnchor {
    pub col1: u16,
    pub dx1: u16,
    pub row1: u16,
    pub dy1: u16,
    pub col2: u16,
    pub dx2: u16,
    pub row2: u16,
    pub dy2: u16,
    /// Move/size behaviour flag stored with the anchor
    pub anchor_type: u16,
    flip_h: bool,
    flip_v: bool,
}

impl ClientAnchor {
    /// Build an anchor from two corners given in any order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dx1: u16,
        dy1: u16,
        dx2: u16,
        dy2: u16,
        col1: u16,
        row1: u16,
        col2: u16,
        row2: u16,
    ) -> Self {
        let flip_h = col1 > col2 || (col1 == col2 && dx1 > dx2);
        let flip_v = row1 > row2 || (row1 == row2 && dy1 > dy2);

        let ((col1, dx1), (col2, dx2)) = if flip_h {
            ((col2, dx2), (col1, dx1))
        } else {
            ((col1, dx1), (col2, dx2))
        };
        let ((row1, dy1), (row2, dy2)) = if flip_v {
            ((row2, dy2), (row1, dy1))
        } else {
            ((row1, dy1), (row2, dy2))
        };

        Self {
            col1,
            dx1,
            row1,
            dy1,
            col2,
            dx2,
            row2,
            dy2,
            anchor_type: 0,
            flip_h,
            flip_v,
        }
    }

    #[inline]
    pub fn is_horizontally_flipped(&self) -> bool {
        self.flip_h
    }

    #[inline]
    pub fn is_vertically_flipped(&self) -> bool {
        self.flip_v
    }

    pub(crate) fn with_flips(mut self, flip_h: bool, flip_v: bool) -> Self {
        self.flip_h = flip_h;
        self.flip_v = flip_v;
        self
    }

    pub fn to_record(&self) -> EscherClientAnchor {
        EscherClientAnchor {
            flag: self.anchor_type,
            col1: self.col1,
            dx1: self.dx1,
            row1: self.row1,
            dy1: self.dy1,
            col2: self.col2,
            dx2: self.dx2,
            row2: self.row2,
            dy2: self.dy2,
        }
    }

    pub fn from_record(record: &EscherClientAnchor) -> Self {
        Self {
            col1: record.col1,
            dx1: record.dx1,
            row1: record.row1,
            dy1: record.dy1,
            col2: record.col2,
            dx2: record.dx2,
            row2: record.row2,
            dy2: record.dy2,
            anchor_type: record.flag,
            flip_h: false,
            flip_v: false,
        }
    }
}

/// Absolute anchor inside the parent group's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildAnchor {
    pub dx1: i32,
    pub dy1: i32,
    pub dx2: i32,
    pub dy2: i32,
    flip_h: bool,
    flip_v: bool,
}

impl ChildAnchor {
    pub fn new(dx1: i32, dy1: i32, dx2: i32, dy2: i32) -> Self {
        Self {
            dx1: dx1.min(dx2),
            dy1: dy1.min(dy2),
            dx2: dx1.max(dx2),
            dy2: dy1.max(dy2),
            flip_h: dx1 > dx2,
            flip_v: dy1 > dy2,
        }
    }

    #[inline]
    pub fn is_horizontally_flipped(&self) -> bool {
        self.flip_h
    }

    #[inline]
    pub fn is_vertically_flipped(&self) -> bool {
        self.flip_v
    }

    pub(crate) fn with_flips(mut self, flip_h: bool, flip_v: bool) -> Self {
        self.flip_h = flip_h;
        self.flip_v = flip_v;
        self
    }

    pub fn to_record(&self) -> EscherRect {
        EscherRect::new(self.dx1, self.dy1, self.dx2, self.dy2)
    }

    pub fn from_record(record: &EscherRect) -> Self {
        Self {
            dx1: record.x1,
            dy1: record.y1,
            dx2: record.x2,
            dy2: record.y2,
            flip_h: false,
            flip_v: false,
        }
    }
}

/// Position of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Client(ClientAnchor),
    Child(ChildAnchor),
}

impl Anchor {
    pub fn is_horizontally_flipped(&self) -> bool {
        match self {
            Anchor::Client(anchor) => anchor.is_horizontally_flipped(),
            Anchor::Child(anchor) => anchor.is_horizontally_flipped(),
        }
    }

    pub fn is_vertically_flipped(&self) -> bool {
        match self {
            Anchor::Client(anchor) => anchor.is_vertically_flipped(),
            Anchor::Child(anchor) => anchor.is_vertically_flipped(),
        }
    }

    pub(crate) fn with_flips(self, flip_h: bool, flip_v: bool) -> Self {
        match self {
            Anchor::Client(anchor) => Anchor::Client(anchor.with_flips(flip_h, flip_v)),
            Anchor::Child(anchor) => Anchor::Child(anchor.with_flips(flip_h, flip_v)),
        }
    }
}

impl From<ClientAnchor> for Anchor {
    fn from(anchor: ClientAnchor) -> Self {
        Anchor::Client(anchor)
    }
}

impl From<ChildAnchor> for Anchor {
    fn from(anchor: ChildAnchor) -> Self {
        Anchor::Child(anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_anchor_normalizes_flipped_corners() {
        let anchor = ClientAnchor::new(10, 20, 30, 40, 5, 2, 1, 3);
        assert!(anchor.is_horizontally_flipped());
        assert!(!anchor.is_vertically_flipped());
        assert_eq!((anchor.col1, anchor.dx1), (1, 30));
        assert_eq!((anchor.col2, anchor.dx2), (5, 10));
        assert_eq!((anchor.row1, anchor.row2), (2, 3));
    }

    #[test]
    fn test_same_cell_flip_uses_offsets() {
        let anchor = ClientAnchor::new(500, 100, 100, 50, 2, 2, 2, 2);
        assert!(anchor.is_horizontally_flipped());
        assert!(anchor.is_vertically_flipped());
        assert_eq!((anchor.dx1, anchor.dx2), (100, 500));
        assert_eq!((anchor.dy1, anchor.dy2), (50, 100));
    }

    #[test]
    fn test_default_anchor_is_not_flipped() {
        let anchor = ClientAnchor::default();
        assert!(!anchor.is_horizontally_flipped());
        assert_eq!(ClientAnchor::from_record(&anchor.to_record()), anchor);
    }

    #[test]
    fn test_child_anchor() {
        let anchor = ChildAnchor::new(100, 0, 10, 50);
        assert!(anchor.is_horizontally_flipped());
        assert!(!anchor.is_vertically_flipped());
        assert_eq!(anchor.to_record(), EscherRect::new(10, 0, 100, 50));

        let restored = Anchor::from(ChildAnchor::from_record(&anchor.to_record())).with_flips(true, false);
        assert_eq!(restored, Anchor::Child(anchor));
    }
}

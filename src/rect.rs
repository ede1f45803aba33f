//! Rectangles and transforms.

use cgmath::{Matrix3, Point2, SquareMatrix, Vector2, Vector3, Zero};

/// A rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Rectangle origin.
    pub origin: Point2<f64>,

    /// Rectangle size.
    pub size: Vector2<f64>,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(origin: Point2<f64>, size: Vector2<f64>) -> Rect {
        Rect { origin, size }
    }

    /// Creates a new rectangle from its components.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect {
            origin: Point2::new(x, y),
            size: Vector2::new(width, height),
        }
    }

    /// Creates the rectangle spanning two corners.
    pub fn from_corners(min: Point2<f64>, max: Point2<f64>) -> Rect {
        Rect {
            origin: min,
            size: max - min,
        }
    }

    /// Returns a zero-sized rectangle at the origin.
    pub fn zero() -> Rect {
        Rect {
            origin: Point2::new(0., 0.),
            size: Vector2::zero(),
        }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.x
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.y
    }

    /// Returns true if the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.size.x <= 0. || self.size.y <= 0.
    }

    /// Returns the center point.
    pub fn center(&self) -> Point2<f64> {
        self.origin + self.size / 2.
    }

    /// Returns true if the point is inside the rectangle.
    pub fn contains(&self, point: Point2<f64>) -> bool {
        point.x >= self.origin.x
            && point.y >= self.origin.y
            && point.x < self.origin.x + self.size.x
            && point.y < self.origin.y + self.size.y
    }

    /// Returns true if the two rectangles intersect.
    pub fn intersects(&self, rect: Rect) -> bool {
        let own_opposite = self.origin + self.size;
        let rect_opposite = rect.origin + rect.size;

        self.origin.x < rect_opposite.x
            && self.origin.y < rect_opposite.y
            && rect.origin.x < own_opposite.x
            && rect.origin.y < own_opposite.y
    }

    /// Returns the intersection rectangle.
    pub fn intersect(&self, rect: Rect) -> Option<Rect> {
        if !self.intersects(rect) {
            return None;
        }

        let min_x = self.origin.x.max(rect.origin.x);
        let min_y = self.origin.y.max(rect.origin.y);
        let max_x = self.max_x().min(rect.max_x());
        let max_y = self.max_y().min(rect.max_y());

        Some(Rect {
            origin: (min_x, min_y).into(),
            size: (max_x - min_x, max_y - min_y).into(),
        })
    }

    /// Returns the parts of this rectangle not covered by `rect`.
    ///
    /// The result has at most four rectangles: full-width bands above and below `rect`, and the
    /// left and right pieces in between.
    pub fn subtract(&self, rect: Rect) -> Vec<Rect> {
        let overlap = match self.intersect(rect) {
            Some(overlap) => overlap,
            None => return vec![*self],
        };

        let mut pieces = Vec::with_capacity(4);
        if overlap.min_y() > self.min_y() {
            pieces.push(Rect::from_xywh(
                self.min_x(),
                self.min_y(),
                self.size.x,
                overlap.min_y() - self.min_y(),
            ));
        }
        if overlap.max_y() < self.max_y() {
            pieces.push(Rect::from_xywh(
                self.min_x(),
                overlap.max_y(),
                self.size.x,
                self.max_y() - overlap.max_y(),
            ));
        }
        if overlap.min_x() > self.min_x() {
            pieces.push(Rect::from_xywh(
                self.min_x(),
                overlap.min_y(),
                overlap.min_x() - self.min_x(),
                overlap.size.y,
            ));
        }
        if overlap.max_x() < self.max_x() {
            pieces.push(Rect::from_xywh(
                overlap.max_x(),
                overlap.min_y(),
                self.max_x() - overlap.max_x(),
                overlap.size.y,
            ));
        }
        pieces
    }

    /// Returns a new rectangle with the given origin.
    pub fn with_origin(&self, origin: Point2<f64>) -> Rect {
        Rect {
            origin,
            size: self.size,
        }
    }
}

/// An integer rectangle in render-target pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IntRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> IntRect {
        IntRect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn max_y(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Returns true if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Returns the overlapping area; zero-sized if the rectangles don’t overlap.
    pub fn intersection(&self, other: IntRect) -> IntRect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        if max_x <= x || max_y <= y {
            return IntRect::new(x, y, 0, 0);
        }
        IntRect::new(x, y, max_x.saturating_sub(x), max_y.saturating_sub(y))
    }

    /// Converts from a top-left origin to the bottom-left origin used by the backend, given the
    /// height of the render target.
    pub fn flipped(&self, target_height: u32) -> IntRect {
        IntRect::new(
            self.x,
            (target_height as i32).saturating_sub(self.max_y()),
            self.width,
            self.height,
        )
    }
}

/// A 2D affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub matrix: Matrix3<f64>,
}

impl Transform {
    /// The identity transform.
    pub fn identity() -> Transform {
        Transform {
            matrix: Matrix3::identity(),
        }
    }

    /// Creates a transform mapping `p` to `(p + pre) * scale + translation`.
    pub fn new(
        translation: Vector2<f64>,
        pre_translation: Vector2<f64>,
        scale: Vector2<f64>,
    ) -> Transform {
        let translate = |v: Vector2<f64>| {
            Matrix3::new(1., 0., 0., 0., 1., 0., v.x, v.y, 1.)
        };
        let scale = Matrix3::new(scale.x, 0., 0., 0., scale.y, 0., 0., 0., 1.);
        Transform {
            matrix: translate(translation) * scale * translate(pre_translation),
        }
    }

    /// Applies the transform to a point.
    pub fn apply(&self, point: Point2<f64>) -> Point2<f64> {
        let v = self.matrix * Vector3::new(point.x, point.y, 1.);
        Point2::new(v.x, v.y)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

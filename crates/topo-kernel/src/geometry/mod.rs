pub mod point;
pub mod vector;
pub mod envelope;
pub mod segment;
pub mod curve;
pub mod multicurve;
pub mod ring_group;
pub mod multipoint;
pub mod shape;
pub mod plane;

pub use curve::{Curve, Orientation, PointLocation};
pub use envelope::Envelope;
pub use multicurve::MultiCurve;
pub use multipoint::MultiPoint;
pub use plane::Plane3d;
pub use point::Point3d;
pub use ring_group::RingGroup;
pub use segment::Segment;
pub use shape::{Linear, Shape};
pub use vector::Vec3;

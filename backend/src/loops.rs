use crate::{config::LOOP_CLOSURE_TOLERANCE_M, geometry::distance_m, models::Coordinate};

/// Turn a chained path into a walk that ends where it starts.
///
/// Paths whose ends are already within [`LOOP_CLOSURE_TOLERANCE_M`] are
/// returned untouched. Anything else becomes an out-and-back: the path
/// followed by its reverse, without repeating the turnaround vertex.
pub fn close_loop(coordinates: Vec<Coordinate>) -> Vec<Coordinate> {
    close_loop_within(coordinates, LOOP_CLOSURE_TOLERANCE_M)
}

pub fn close_loop_within(mut coordinates: Vec<Coordinate>, tolerance_m: f64) -> Vec<Coordinate> {
    let (Some(&first), Some(&last)) = (coordinates.first(), coordinates.last()) else {
        return coordinates;
    };
    if coordinates.len() < 2 || distance_m(first, last) < tolerance_m {
        return coordinates;
    }

    let return_leg: Vec<Coordinate> = coordinates.iter().rev().skip(1).copied().collect();
    coordinates.extend(return_leg);
    coordinates
}

pub fn is_closed(path: &[Coordinate], tolerance_m: f64) -> bool {
    match (path.first(), path.last()) {
        (Some(&first), Some(&last)) => distance_m(first, last) < tolerance_m,
        _ => false,
    }
}

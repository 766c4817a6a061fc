use nalgebra::{Matrix3, Point3, Rotation3, Vector3};

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Plain RMSD between corresponding points, without any alignment.
pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

/// Rigid transform that best-fits a mobile point set onto a reference.
///
/// Computed with the Kabsch algorithm: both sets are centred, the rotation
/// comes from the SVD of their covariance matrix, and a determinant sign
/// correction prevents the fit from turning into a reflection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Superposition {
    pub rotation: Rotation3<f64>,
    mobile_centroid: Point3<f64>,
    reference_centroid: Point3<f64>,
}

impl Superposition {
    pub fn fit(reference: &[Point3<f64>], mobile: &[Point3<f64>]) -> Option<Self> {
        if reference.len() != mobile.len() {
            return None;
        }
        let reference_centroid = centroid(reference)?;
        let mobile_centroid = centroid(mobile)?;

        let covariance = mobile
            .iter()
            .zip(reference.iter())
            .fold(Matrix3::zeros(), |acc, (m, r)| {
                acc + (m - mobile_centroid) * (r - reference_centroid).transpose()
            });

        let svd = covariance.svd(true, true);
        let u = svd.u?;
        let v_t = svd.v_t?;
        let v = v_t.transpose();

        let d = (v * u.transpose()).determinant().signum();
        let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
        let rotation = Rotation3::from_matrix_unchecked(v * correction * u.transpose());

        Some(Self {
            rotation,
            mobile_centroid,
            reference_centroid,
        })
    }

    #[inline]
    pub fn transform(&self, point: &Point3<f64>) -> Point3<f64> {
        self.reference_centroid + self.rotation * (point - self.mobile_centroid)
    }

    pub fn apply(&self, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|p| self.transform(p)).collect()
    }

    pub fn apply_in_place(&self, points: &mut [Point3<f64>]) {
        for p in points.iter_mut() {
            *p = self.transform(p);
        }
    }
}

/// RMSD between two point sets after best-fit superposition of the second
/// onto the first.
pub fn superposed_rmsd(reference: &[Point3<f64>], mobile: &[Point3<f64>]) -> Option<f64> {
    let fit = Superposition::fit(reference, mobile)?;
    calculate_rmsd(reference, &fit.apply(mobile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, Unit};

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn asymmetric_points() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.5, 0.0, 0.0),
            Point3::new(2.0, 1.4, 0.0),
            Point3::new(3.4, 1.6, 0.7),
            Point3::new(-0.6, -0.9, 1.1),
        ]
    }

    fn rigidly_moved(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        let rotation = Rotation3::from_axis_angle(
            &Unit::new_normalize(Vector3::new(0.3, -1.0, 0.5)),
            1.1,
        );
        let translation = Translation3::new(4.0, -2.0, 7.5);
        points
            .iter()
            .map(|p| translation.transform_point(&(rotation * p)))
            .collect()
    }

    #[test]
    fn centroid_of_empty_slice_is_none() {
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn centroid_is_the_mean_position() {
        let c = centroid(&[Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, -6.0)]).unwrap();
        assert_eq!(c, Point3::new(1.0, 2.0, -3.0));
    }

    #[test]
    fn calculate_rmsd_rejects_mismatched_or_empty_input() {
        let a = asymmetric_points();
        assert!(calculate_rmsd(&a, &a[..2]).is_none());
        assert!(calculate_rmsd(&[], &[]).is_none());
    }

    #[test]
    fn calculate_rmsd_of_uniform_shift_equals_shift_length() {
        let a = asymmetric_points();
        let b: Vec<_> = a.iter().map(|p| p + Vector3::new(0.0, 3.0, 4.0)).collect();
        assert!(f64_approx_equal(calculate_rmsd(&a, &b).unwrap(), 5.0));
    }

    #[test]
    fn superposition_recovers_a_rigid_motion() {
        let reference = asymmetric_points();
        let mobile = rigidly_moved(&reference);
        assert!(calculate_rmsd(&reference, &mobile).unwrap() > 1.0);

        let fit = Superposition::fit(&reference, &mobile).unwrap();
        let aligned = fit.apply(&mobile);
        for (r, a) in reference.iter().zip(aligned.iter()) {
            assert!((r - a).norm() < 1e-8);
        }
        assert!(superposed_rmsd(&reference, &mobile).unwrap() < 1e-8);
    }

    #[test]
    fn superposition_never_returns_a_reflection() {
        let reference = asymmetric_points();
        let mirrored: Vec<_> = reference
            .iter()
            .map(|p| Point3::new(-p.x, p.y, p.z))
            .collect();
        let fit = Superposition::fit(&reference, &mirrored).unwrap();
        assert!(f64_approx_equal(fit.rotation.matrix().determinant(), 1.0));
        assert!(superposed_rmsd(&reference, &mirrored).unwrap() > 0.1);
    }

    #[test]
    fn superposed_rmsd_is_symmetric() {
        let a = asymmetric_points();
        let mut b = rigidly_moved(&a);
        b[3] += Vector3::new(0.4, -0.2, 0.3);
        let ab = superposed_rmsd(&a, &b).unwrap();
        let ba = superposed_rmsd(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-8);
        assert!(ab > 0.0);
    }

    #[test]
    fn apply_in_place_matches_apply() {
        let reference = asymmetric_points();
        let mobile = rigidly_moved(&reference);
        let fit = Superposition::fit(&reference, &mobile).unwrap();
        let mut in_place = mobile.clone();
        fit.apply_in_place(&mut in_place);
        assert_eq!(in_place, fit.apply(&mobile));
    }
}

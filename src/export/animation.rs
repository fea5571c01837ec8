//! Turning per-component curves into glTF sampler data.

use crate::gltf::Interpolation;
use crate::scene::AnimationCurve;

/// Sample rate used when curves have to be baked.
pub const BAKE_FRAME_RATE: f32 = 30.0;

const TIME_EPSILON: f32 = 1e-4;

/// What a value handed to the track builder represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    InTangent,
    Value,
    OutTangent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampledTrack<T> {
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    /// For cubic splines three entries per key: in-tangent, value, out-tangent.
    pub values: Vec<T>,
}

/// Whether the curves of one property can be written as a cubic spline
/// without resampling: same key count, matching key times, finite tangents.
pub fn can_export_as_spline(curves: &[&AnimationCurve]) -> bool {
    let Some(first) = curves.first() else {
        return false;
    };
    if first.keys.is_empty() {
        return false;
    }

    curves.iter().all(|curve| {
        curve.keys.len() == first.keys.len()
            && curve
                .keys
                .iter()
                .zip(&first.keys)
                .all(|(key, reference)| (key.time - reference.time).abs() <= TIME_EPSILON)
            && curve
                .keys
                .iter()
                .all(|key| key.in_tangent.is_finite() && key.out_tangent.is_finite())
    })
}

/// Samples the component curves of one property.
///
/// `build` combines one scalar per curve, in curve order, into an output
/// element. Curves are written as cubic splines when possible and unless
/// `bake` is set, otherwise they are sampled at [`BAKE_FRAME_RATE`] with the
/// end time of the longest curve as the final sample.
pub fn sample_track<T>(
    curves: &[&AnimationCurve],
    bake: bool,
    build: impl Fn(Slot, &[f32]) -> T,
) -> SampledTrack<T> {
    let mut components = vec![0.0; curves.len()];

    if !bake && can_export_as_spline(curves) {
        let key_count = curves[0].keys.len();
        let times = curves[0].keys.iter().map(|key| key.time).collect();
        let mut values = Vec::with_capacity(key_count * 3);

        for index in 0..key_count {
            for slot in [Slot::InTangent, Slot::Value, Slot::OutTangent] {
                for (component, curve) in components.iter_mut().zip(curves) {
                    let key = &curve.keys[index];
                    *component = match slot {
                        Slot::InTangent => key.in_tangent,
                        Slot::Value => key.value,
                        Slot::OutTangent => key.out_tangent,
                    };
                }
                values.push(build(slot, &components));
            }
        }

        return SampledTrack {
            interpolation: Interpolation::CubicSpline,
            times,
            values,
        };
    }

    let times = bake_times(curves);
    let values = times
        .iter()
        .map(|time| {
            for (component, curve) in components.iter_mut().zip(curves) {
                *component = curve.evaluate(*time);
            }
            build(Slot::Value, &components)
        })
        .collect();

    SampledTrack {
        interpolation: Interpolation::Linear,
        times,
        values,
    }
}

fn bake_times(curves: &[&AnimationCurve]) -> Vec<f32> {
    let end = curves
        .iter()
        .map(|curve| curve.end_time())
        .fold(0.0f32, f32::max);
    let frames = (end * BAKE_FRAME_RATE).floor() as usize;

    let mut times: Vec<f32> = (0..=frames).map(|frame| frame as f32 / BAKE_FRAME_RATE).collect();
    if times.last().is_some_and(|last| end - last > TIME_EPSILON) {
        times.push(end);
    }
    times
}

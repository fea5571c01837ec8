/// One key of an [`AnimationCurve`].
///
/// Tangents are slopes in value per second. A non-finite tangent makes the
/// adjoining segment stepped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    pub in_tangent: f32,
    pub out_tangent: f32,
}

impl Keyframe {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
        }
    }

    pub fn with_tangents(mut self, in_tangent: f32, out_tangent: f32) -> Self {
        self.in_tangent = in_tangent;
        self.out_tangent = out_tangent;
        self
    }
}

/// A scalar curve made of cubic Hermite segments. Keys are sorted by time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationCurve {
    pub keys: Vec<Keyframe>,
}

impl AnimationCurve {
    pub fn new(keys: Vec<Keyframe>) -> Self {
        Self { keys }
    }

    /// Two keys holding `value` from 0 to `length`.
    pub fn constant(length: f32, value: f32) -> Self {
        Self::new(vec![Keyframe::new(0.0, value), Keyframe::new(length, value)])
    }

    /// Time of the last key, 0 for an empty curve.
    pub fn end_time(&self) -> f32 {
        self.keys.last().map_or(0.0, |key| key.time)
    }

    /// Samples the curve, holding the first and last value outside its range.
    pub fn evaluate(&self, time: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        let next = self.keys.partition_point(|key| key.time <= time);
        let start = &self.keys[next - 1];
        let end = &self.keys[next];
        let dt = end.time - start.time;
        if dt <= 0.0 {
            return end.value;
        }
        if !start.out_tangent.is_finite() || !end.in_tangent.is_finite() {
            return start.value;
        }

        let s = (time - start.time) / dt;
        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        h00 * start.value
            + h10 * dt * start.out_tangent
            + h01 * end.value
            + h11 * dt * end.in_tangent
    }
}

/// The node property a curve animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnimatedProperty {
    LocalPosition,
    LocalRotation,
    LocalScale,
    /// Blend shape weights in percent, member is the blend shape name.
    BlendShape,
}

/// Binds a curve to one component of a property of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveBinding {
    /// `/`-separated child path relative to the animated node.
    pub path: String,
    pub property: AnimatedProperty,
    /// `x`, `y`, `z`, `w`, or a blend shape name.
    pub member: String,
    pub curve: AnimationCurve,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub length: f32,
    pub bindings: Vec<CurveBinding>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            length,
            bindings: Vec::new(),
        }
    }

    pub fn with_curve(
        mut self,
        path: impl Into<String>,
        property: AnimatedProperty,
        member: impl Into<String>,
        curve: AnimationCurve,
    ) -> Self {
        self.bindings.push(CurveBinding {
            path: path.into(),
            property,
            member: member.into(),
            curve,
        });
        self
    }
}

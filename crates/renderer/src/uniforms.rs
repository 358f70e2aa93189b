use std::fmt;

/// Name of the elapsed-time uniform every distortion shader reads.
pub const TIME_UNIFORM: &str = "uTime";

/// Scalars are packed into a std140 block of `vec4` slots; this caps how many fit.
pub const MAX_SCALAR_UNIFORMS: usize = 16;

/// Index into the renderer's texture table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSlot(pub u32);

/// Value currently held by a named uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Texture(TextureSlot),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Scalar(_) => UniformKind::Scalar,
            UniformValue::Texture(_) => UniformKind::Texture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Scalar,
    Texture,
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniformKind::Scalar => f.write_str("scalar"),
            UniformKind::Texture => f.write_str("texture"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniformError {
    #[error("uniform '{0}' is already registered")]
    Duplicate(String),
    #[error("uniform '{0}' is not registered")]
    Unknown(String),
    #[error("uniform '{name}' holds a {actual}, not a {expected}")]
    KindMismatch {
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },
    #[error("'{0}' is not a valid GLSL identifier")]
    InvalidName(String),
    #[error("scalar uniform block is full ({MAX_SCALAR_UNIFORMS} slots)")]
    BlockFull,
}

/// Named shader inputs shared by every mesh in a scene.
///
/// Names are fixed once registered: there is no removal or rename. Iteration
/// follows registration order, which is also the order scalars occupy in the
/// GPU uniform block and textures occupy in the texture bind group.
#[derive(Debug, Clone)]
pub struct UniformSet {
    entries: Vec<(String, UniformValue)>,
    revision: u64,
}

impl UniformSet {
    /// Creates a set holding only `uTime = 0.0`.
    pub fn new() -> Self {
        Self {
            entries: vec![(TIME_UNIFORM.to_string(), UniformValue::Scalar(0.0))],
            revision: 0,
        }
    }

    pub fn register_scalar(&mut self, name: &str, value: f32) -> Result<(), UniformError> {
        self.check_new_name(name)?;
        if self.scalar_count() >= MAX_SCALAR_UNIFORMS {
            return Err(UniformError::BlockFull);
        }
        self.entries
            .push((name.to_string(), UniformValue::Scalar(value)));
        self.revision += 1;
        Ok(())
    }

    pub fn register_texture(&mut self, name: &str, slot: TextureSlot) -> Result<(), UniformError> {
        self.check_new_name(name)?;
        self.entries
            .push((name.to_string(), UniformValue::Texture(slot)));
        self.revision += 1;
        Ok(())
    }

    /// Overwrites a registered scalar.
    pub fn set_scalar(&mut self, name: &str, value: f32) -> Result<(), UniformError> {
        let slot = self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .ok_or_else(|| UniformError::Unknown(name.to_string()))?;
        match &mut slot.1 {
            UniformValue::Scalar(current) => {
                *current = value;
                self.revision += 1;
                Ok(())
            }
            other => Err(UniformError::KindMismatch {
                name: name.to_string(),
                expected: UniformKind::Scalar,
                actual: other.kind(),
            }),
        }
    }

    pub fn set_time(&mut self, seconds: f32) {
        // uTime is registered by `new` and can never be removed.
        if let Some((_, UniformValue::Scalar(current))) = self.entries.first_mut() {
            *current = seconds;
            self.revision += 1;
        }
    }

    pub fn time(&self) -> f32 {
        self.scalar(TIME_UNIFORM).unwrap_or(0.0)
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| *value)
    }

    pub fn scalar(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            UniformValue::Scalar(value) => Some(value),
            UniformValue::Texture(_) => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<TextureSlot> {
        match self.get(name)? {
            UniformValue::Texture(slot) => Some(slot),
            UniformValue::Scalar(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, UniformValue)> + '_ {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    pub fn scalars(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.iter().filter_map(|(name, value)| match value {
            UniformValue::Scalar(v) => Some((name, v)),
            UniformValue::Texture(_) => None,
        })
    }

    pub fn textures(&self) -> impl Iterator<Item = (&str, TextureSlot)> + '_ {
        self.iter().filter_map(|(name, value)| match value {
            UniformValue::Texture(slot) => Some((name, slot)),
            UniformValue::Scalar(_) => None,
        })
    }

    pub fn scalar_count(&self) -> usize {
        self.scalars().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bumped on every write; the GPU backend compares it to skip redundant uploads.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn check_new_name(&self, name: &str) -> Result<(), UniformError> {
        if !is_glsl_identifier(name) {
            return Err(UniformError::InvalidName(name.to_string()));
        }
        if self.contains(name) {
            return Err(UniformError::Duplicate(name.to_string()));
        }
        Ok(())
    }
}

impl Default for UniformSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Position of the `index`-th scalar inside the `vec4` slot array.
pub fn scalar_slot(index: usize) -> (usize, usize) {
    (index / 4, index % 4)
}

pub fn is_glsl_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if name.starts_with("gl_") {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_set_registers_time_at_zero() {
        let set = UniformSet::new();
        assert_eq!(set.scalar(TIME_UNIFORM), Some(0.0));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut set = UniformSet::new();
        set.register_scalar("uSpeed", 0.5).unwrap();
        let err = set.register_scalar("uSpeed", 1.0).unwrap_err();
        assert_eq!(err, UniformError::Duplicate("uSpeed".into()));
        let err = set.register_texture(TIME_UNIFORM, TextureSlot(0)).unwrap_err();
        assert_eq!(err, UniformError::Duplicate(TIME_UNIFORM.into()));
        assert_eq!(set.scalar("uSpeed"), Some(0.5));
    }

    #[test]
    fn setting_unknown_or_texture_uniform_fails() {
        let mut set = UniformSet::new();
        set.register_texture("uTexture", TextureSlot(0)).unwrap();
        assert_eq!(
            set.set_scalar("uMissing", 1.0),
            Err(UniformError::Unknown("uMissing".into()))
        );
        assert!(matches!(
            set.set_scalar("uTexture", 1.0),
            Err(UniformError::KindMismatch {
                expected: UniformKind::Scalar,
                actual: UniformKind::Texture,
                ..
            })
        ));
        assert_eq!(set.texture("uTexture"), Some(TextureSlot(0)));
    }

    #[test]
    fn rejects_names_that_cannot_appear_in_glsl() {
        let mut set = UniformSet::new();
        for bad in ["", "1abc", "u-speed", "gl_Position", "u speed"] {
            assert!(matches!(
                set.register_scalar(bad, 0.0),
                Err(UniformError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn block_capacity_is_enforced() {
        let mut set = UniformSet::new();
        for index in 1..MAX_SCALAR_UNIFORMS {
            set.register_scalar(&format!("u{index}"), 0.0).unwrap();
        }
        assert_eq!(set.register_scalar("uOverflow", 0.0), Err(UniformError::BlockFull));
        // textures live outside the scalar block
        set.register_texture("uTexture", TextureSlot(0)).unwrap();
    }

    #[test]
    fn iteration_preserves_registration_order() {
        let mut set = UniformSet::new();
        set.register_scalar("uSpeed", 0.5).unwrap();
        set.register_texture("uTexture", TextureSlot(0)).unwrap();
        set.register_scalar("uStrength", 1.0).unwrap();
        let scalars: Vec<_> = set.scalars().map(|(name, _)| name).collect();
        assert_eq!(scalars, vec![TIME_UNIFORM, "uSpeed", "uStrength"]);
        let textures: Vec<_> = set.textures().collect();
        assert_eq!(textures, vec![("uTexture", TextureSlot(0))]);
    }

    #[test]
    fn writes_bump_revision() {
        let mut set = UniformSet::new();
        let before = set.revision();
        set.set_time(1.25);
        assert!(set.revision() > before);
        assert_eq!(set.time(), 1.25);
    }

    #[test]
    fn scalar_slots_fill_vec4_components_in_order() {
        assert_eq!(scalar_slot(0), (0, 0));
        assert_eq!(scalar_slot(3), (0, 3));
        assert_eq!(scalar_slot(4), (1, 0));
        assert_eq!(scalar_slot(15), (3, 3));
    }
}

use bevy::prelude::*;

/// Index of the body record an entity renders.
#[derive(Component, Deref, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyIndex(pub usize);

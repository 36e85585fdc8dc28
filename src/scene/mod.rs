pub mod bar;
pub mod draw;
pub mod grid;
pub mod tier;

pub use bar::{Bar, BarParameters, BarTraversal};
pub use draw::{BarInstance, DrawInstruction};
pub use grid::{GridLayout, Row, SceneGrid};
pub use tier::{tier_for, Tier, MAX_CHILDREN, SILENCE_THRESHOLD, TIERS};

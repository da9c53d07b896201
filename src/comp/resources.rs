use serde::{Deserialize, Serialize};

/// A resource that stores the tick (i.e: physics) time.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Time(pub f64);

/// A resource that stores the time since the previous tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct DeltaTime(pub f32);

#[derive(Copy, Clone, Default)]
pub struct Tick(pub u64);
